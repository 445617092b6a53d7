use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Format, Json, Serialized},
};
use lectern_storage::IdError;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::chat::message::TranslationMode;
use crate::chat::paths::{DEFAULT_CONVERSATIONS_ROOT, DEFAULT_TESTCASES_COLLECTION, RemoteLayout};

pub const SETTINGS_DIRECTORY_NAME: &str = "lectern";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const DATABASE_FILE_NAME: &str = "lectern.db";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LecternSettings {
    #[serde(default = "default_database_location")]
    pub database_location: String,
    #[serde(default = "default_conversations_root")]
    pub conversations_root: String,
    #[serde(default = "default_testcases_collection")]
    pub testcases_collection: String,
    #[serde(default)]
    pub show_translations: bool,
}

impl Default for LecternSettings {
    fn default() -> Self {
        Self {
            database_location: default_database_location(),
            conversations_root: default_conversations_root(),
            testcases_collection: default_testcases_collection(),
            show_translations: false,
        }
    }
}

impl LecternSettings {
    pub fn normalized(mut self) -> Self {
        self.database_location = non_blank_or(self.database_location, default_database_location);
        // Collection names are single path segments; stray slashes would nest them.
        self.conversations_root = non_blank_or(
            self.conversations_root.trim().trim_matches('/').to_string(),
            default_conversations_root,
        );
        self.testcases_collection = non_blank_or(
            self.testcases_collection.trim().trim_matches('/').to_string(),
            default_testcases_collection,
        );
        self
    }

    pub fn remote_layout(&self) -> Result<RemoteLayout, SettingsError> {
        RemoteLayout::new(&self.conversations_root, &self.testcases_collection).context(
            InvalidLayoutSnafu {
                stage: "settings-remote-layout",
            },
        )
    }

    pub fn translation_mode(&self) -> TranslationMode {
        if self.show_translations {
            TranslationMode::Translated
        } else {
            TranslationMode::Original
        }
    }
}

pub struct SettingsStore {
    settings: Arc<ArcSwap<LecternSettings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".lectern"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = Self::load_from_disk(&config_path);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> Arc<LecternSettings> {
        self.settings.load_full()
    }

    pub fn update(&self, settings: LecternSettings) -> Result<(), SettingsError> {
        let normalized_settings = settings.normalized();
        self.persist(&normalized_settings)?;
        self.settings.store(Arc::new(normalized_settings));
        Ok(())
    }

    fn load_from_disk(path: &Path) -> LecternSettings {
        if !path.exists() {
            tracing::info!("settings file not found at {:?}, using defaults", path);
            return LecternSettings::default();
        }

        let figment = Figment::from(Serialized::defaults(LecternSettings::default()))
            .merge(Json::file(path));

        match figment.extract::<LecternSettings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(
                    "failed to parse settings from {:?}: {}. using defaults",
                    path,
                    error
                );
                LecternSettings::default()
            }
        }
    }

    fn persist(&self, settings: &LecternSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                stage: "create-settings-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(settings).context(SerializeConfigSnafu {
            stage: "serialize-settings-json",
        })?;

        let temp_path = self.config_path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-settings-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, &self.config_path).context(RenameTempFileSnafu {
            stage: "rename-temporary-settings-file",
            from: temp_path,
            to: self.config_path.clone(),
        })?;

        tracing::info!("saved settings to {:?}", self.config_path);
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to create settings directory at {path:?} on `{stage}`: {source}"))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to serialize settings on `{stage}`: {source}"))]
    SerializeConfig {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write settings file at {path:?} on `{stage}`: {source}"))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "failed to replace settings file from {from:?} to {to:?} on `{stage}`: {source}"
    ))]
    RenameTempFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("configured collection names are invalid on `{stage}`: {source}"))]
    InvalidLayout { stage: &'static str, source: IdError },
}

fn default_database_location() -> String {
    dirs::data_dir()
        .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
        .unwrap_or_else(|| PathBuf::from(".lectern"))
        .join(DATABASE_FILE_NAME)
        .display()
        .to_string()
}

fn default_conversations_root() -> String {
    DEFAULT_CONVERSATIONS_ROOT.to_string()
}

fn default_testcases_collection() -> String {
    DEFAULT_TESTCASES_COLLECTION.to_string()
}

fn non_blank_or(value: String, fallback: fn() -> String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback()
    } else {
        trimmed.to_string()
    }
}
