//! Runtime settings for MedQuiz

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::QuizResult;

/// Settings file looked up next to the working directory
pub const SETTINGS_FILE: &str = "medquiz";

/// Prefix of environment overrides, e.g. `MEDQUIZ__DATABASE_PATH`
pub const ENV_PREFIX: &str = "MEDQUIZ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_path: PathBuf,
    pub source_root: PathBuf,
    /// JSON topic table; the bundled table is used when unset
    pub topics_file: Option<PathBuf>,
    /// Source base names that are never imported
    pub excluded_sources: Vec<String>,
    pub default_difficulty: String,
    pub trial_days: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("quiz_app.db"),
            source_root: PathBuf::from("csv_files"),
            topics_file: None,
            excluded_sources: vec![
                "PROCESSING_COMPLETE".to_string(),
                "Nephrology_ENG_Examen_de_Stat".to_string(),
            ],
            default_difficulty: "Advanced".to_string(),
            trial_days: 3,
        }
    }
}

impl Settings {
    /// Defaults, then `medquiz.toml` if present, then `.env` and `MEDQUIZ__*`
    pub fn load() -> QuizResult<Self> {
        dotenvy::dotenv().ok();
        Self::load_from(Path::new(SETTINGS_FILE))
    }

    /// Same layering as [`Settings::load`] with an explicit settings file stem
    pub fn load_from(file: &Path) -> QuizResult<Self> {
        let mut builder = config::Config::builder().add_source(
            config::File::from(file)
                .format(config::FileFormat::Toml)
                .required(false),
        );
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("excluded_sources")
                .try_parsing(true),
        );

        let settings = builder.build()?.try_deserialize::<Settings>()?;
        Ok(settings)
    }
}
