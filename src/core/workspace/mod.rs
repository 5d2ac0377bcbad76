pub mod disk;
pub mod paths;

pub use disk::{dir_size, ensure_min_disk_space, format_bytes};
pub use paths::WorkspacePaths;
