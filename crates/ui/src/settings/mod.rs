pub mod state;

pub use state::{LecternSettings, SettingsError, SettingsStore};
