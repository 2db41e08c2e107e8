//! Bulk import of question sources into the quiz catalog
//!
//! Every source file is matched to a catalog entry through the topic table
//! and its question set is replaced inside a single transaction. A failing
//! file is rolled back and reported; the run always carries on with the next
//! one.

#[cfg(feature = "python")]
use pyo3::prelude::*;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::config::Settings;
use crate::db::{self, NewQuiz};
use crate::error::{QuizError, QuizResult};
use crate::source::{is_source_file, read_rows};
use crate::topics::{TopicInfo, TopicTable};

/// Successfully imported quiz
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDetail {
    pub title: String,
    pub question_count: usize,
    pub category: Option<String>,
}

/// Source that could not be imported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportFailure {
    /// Quiz title attempted, or the source key when no mapping exists
    pub identifier: String,
    pub reason: String,
}

/// Outcome of a whole import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub success_count: usize,
    pub failure_count: usize,
    pub total_questions_imported: usize,
    pub details: Vec<ImportDetail>,
    pub failures: Vec<ImportFailure>,
    /// Excluded sources, by base name
    #[serde(default)]
    pub skipped: Vec<String>,
}

impl ImportReport {
    fn record_success(&mut self, detail: ImportDetail) {
        self.success_count += 1;
        self.total_questions_imported += detail.question_count;
        self.details.push(detail);
    }

    fn record_failure(&mut self, identifier: impl Into<String>, reason: impl Into<String>) {
        self.failure_count += 1;
        self.failures.push(ImportFailure {
            identifier: identifier.into(),
            reason: reason.into(),
        });
    }

    /// Details grouped by category in first-seen order
    pub fn by_category(&self) -> Vec<(String, Vec<&ImportDetail>)> {
        let mut groups: Vec<(String, Vec<&ImportDetail>)> = Vec::new();
        for detail in &self.details {
            let category = detail.category.clone().unwrap_or_else(|| "Uncategorized".to_string());
            match groups.iter_mut().find(|(name, _)| *name == category) {
                Some((_, entries)) => entries.push(detail),
                None => groups.push((category, vec![detail])),
            }
        }
        groups
    }

    pub fn to_json(&self) -> QuizResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the summary to the log, grouped by category
    pub fn log_summary(&self) {
        info!(
            succeeded = self.success_count,
            failed = self.failure_count,
            questions = self.total_questions_imported,
            "import finished"
        );
        for (category, quizzes) in self.by_category() {
            for quiz in quizzes {
                info!(category = %category, title = %quiz.title, questions = quiz.question_count, "imported quiz");
            }
        }
        for failure in &self.failures {
            warn!(identifier = %failure.identifier, reason = %failure.reason, "import failure");
        }
    }
}

/// Reconciles a directory of sources against the quiz catalog
#[derive(Debug, Clone)]
pub struct Importer {
    topics: TopicTable,
    excluded: HashSet<String>,
    default_difficulty: String,
}

impl Importer {
    pub fn new(topics: TopicTable) -> Self {
        let defaults = Settings::default();
        Self {
            topics,
            excluded: defaults.excluded_sources.into_iter().collect(),
            default_difficulty: defaults.default_difficulty,
        }
    }

    /// Build an importer from settings, loading the topic table they name
    pub fn from_settings(settings: &Settings) -> QuizResult<Self> {
        let topics = match &settings.topics_file {
            Some(path) => TopicTable::from_json_file(path)?,
            None => TopicTable::bundled()?,
        };
        Ok(Self::new(topics)
            .with_exclusions(settings.excluded_sources.iter().cloned())
            .with_default_difficulty(settings.default_difficulty.clone()))
    }

    /// Replace the exclusion list
    pub fn with_exclusions(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.excluded = names.into_iter().collect();
        self
    }

    pub fn with_default_difficulty(mut self, difficulty: impl Into<String>) -> Self {
        self.default_difficulty = difficulty.into();
        self
    }

    pub fn topics(&self) -> &TopicTable {
        &self.topics
    }

    /// Every source file below `root`, sorted by path
    pub fn discover(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(root)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("walk error under {} (skipped): {}", root.display(), e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && is_source_file(entry.path()))
            .map(|entry| entry.into_path())
            .collect();
        files.sort();
        files
    }

    /// Import every source below `root` and report per-file outcomes
    pub fn run(&self, conn: &mut Connection, root: &Path) -> ImportReport {
        let files = self.discover(root);
        info!("found {} source files under {}", files.len(), root.display());

        let mut report = ImportReport::default();
        for path in files {
            let key = source_key(&path);

            if self.excluded.contains(&key) {
                debug!("skipping excluded source {}", path.display());
                report.skipped.push(key);
                continue;
            }

            let Some(topic) = self.topics.resolve(&key) else {
                let reason = match self.topics.suggest(&key) {
                    Some(hint) => format!("{} (closest mapping: '{hint}')", QuizError::MappingMissing(key.clone())),
                    None => QuizError::MappingMissing(key.clone()).to_string(),
                };
                warn!("skipping {} - no mapping found", key);
                report.record_failure(key, reason);
                continue;
            };

            match self.import_file(conn, &path, topic) {
                Ok(question_count) => {
                    info!(title = %topic.title, questions = question_count, "imported source");
                    report.record_success(ImportDetail {
                        title: topic.title.clone(),
                        question_count,
                        category: topic.category.clone(),
                    });
                }
                Err(e) => {
                    error!(title = %topic.title, file = %path.display(), "import failed: {}", e);
                    report.record_failure(topic.title.clone(), e.to_string());
                }
            }
        }

        report
    }

    /// Replace the question set of one quiz from one source.
    ///
    /// Dropping the transaction on any early return rolls the file back, so
    /// the quiz keeps either its old questions or the complete new set.
    pub fn import_file(&self, conn: &mut Connection, path: &Path, topic: &TopicInfo) -> QuizResult<usize> {
        let tx = conn.transaction()?;

        let quiz_id = match db::find_quiz_by_title(&tx, &topic.title)? {
            Some(quiz) => {
                let removed = db::delete_questions(&tx, quiz.id)?;
                info!("UPDATING: {} (replacing {} questions)", topic.title, removed);
                quiz.id
            }
            None => {
                let id = db::create_quiz(
                    &tx,
                    &NewQuiz {
                        title: topic.title.clone(),
                        description: topic.description.clone(),
                        category: topic.category.clone(),
                        difficulty: Some(self.default_difficulty.clone()),
                    },
                )?;
                info!("CREATING: {}", topic.title);
                id
            }
        };

        let mut imported = 0;
        for (index, row) in read_rows(path)?.enumerate() {
            let draft = row?.into_draft(index)?;
            db::insert_question(&tx, quiz_id, &draft)?;
            imported += 1;
        }

        tx.commit()?;
        Ok(imported)
    }
}

/// Topic lookup key of a source: its base name without extension
pub fn source_key(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Import with settings-driven defaults
pub fn run_import(conn: &mut Connection, root: &Path, settings: &Settings) -> QuizResult<ImportReport> {
    let importer = Importer::from_settings(settings)?;
    let report = importer.run(conn, root);
    report.log_summary();
    Ok(report)
}

// ============= Python Binding =============

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "run_import")]
pub fn py_run_import(db_path: &str, root_dir: &str, topics_file: Option<&str>) -> PyResult<String> {
    let mut conn = db::init_database(db_path)?;
    let settings = Settings {
        topics_file: topics_file.map(PathBuf::from),
        ..Settings::default()
    };
    let report = run_import(&mut conn, Path::new(root_dir), &settings)?;
    Ok(report.to_json()?)
}
