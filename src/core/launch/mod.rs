pub mod task;

pub use task::{launch, LaunchHandle};
