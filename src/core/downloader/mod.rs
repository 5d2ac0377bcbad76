pub mod client;

pub use client::{DownloadProgress, DownloadResult, Downloader, ProgressSink};
