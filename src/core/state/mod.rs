pub mod settings;

pub use settings::{FileSettings, Settings, SettingsOverrides};
