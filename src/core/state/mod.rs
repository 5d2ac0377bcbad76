pub mod settings;

pub use settings::BootstrapSettings;
