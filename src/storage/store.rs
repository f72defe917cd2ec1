//! A filesystem backed memory bank
//!
//! The [`MemoryBank`] owns the in-memory [`Document`] for one project root and
//! keeps it in step with a JSON file under that root. Every mutating
//! operation persists the whole document immediately.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde_json::{Map, Value};

use crate::{
    domain::{Config, DependencyTable, Document, SectionName},
    storage::markdown,
    workflow::{ActReport, PlanReport, ReviewReport},
};

/// Name of the persisted state document.
pub const STATE_FILE: &str = "memory_state.json";

/// Name of the single-generation backup of the state document.
pub const BACKUP_FILE: &str = "memory_state.backup.json";

/// Errors that can occur when writing memory bank files.
///
/// Missing or corrupt state, unknown sections and malformed sections are not
/// errors; they are absorbed by the operations themselves.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The memory bank directory could not be created.
    #[error("failed to create directory {}", path.display())]
    CreateDirectory {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
    /// The document could not be rendered as JSON.
    #[error("failed to serialize memory bank state")]
    Serialize(#[from] serde_json::Error),
    /// A file could not be written.
    #[error("failed to write {}", path.display())]
    Write {
        /// The file that could not be written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
}

/// Errors that can occur when reading the persisted document.
#[derive(Debug, thiserror::Error)]
enum LoadError {
    #[error("failed to read state file")]
    Io(#[from] io::Error),
    #[error("failed to parse state file")]
    Json(#[from] serde_json::Error),
}

/// The memory bank of one project.
///
/// Each handle is independent: several may be open on different roots at
/// once. There is no locking between handles on the same root; the last
/// writer wins.
#[derive(Debug)]
pub struct MemoryBank {
    /// The project root.
    root: PathBuf,
    /// The directory holding the state document and markdown files.
    directory: PathBuf,
    document: Document,
    dependencies: DependencyTable,
}

impl MemoryBank {
    /// Opens the memory bank under `root`, using the configuration file found
    /// there (or the defaults).
    ///
    /// # Errors
    ///
    /// See [`MemoryBank::open_with_config`].
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        let config = Config::load_or_default(&root);
        Self::open_with_config(root, &config)
    }

    /// Opens the memory bank under `root`.
    ///
    /// If no state document exists yet, a default one is created and persisted
    /// immediately. A corrupt document is replaced with the default one.
    ///
    /// # Errors
    ///
    /// Returns an error if the memory bank directory cannot be created, or if
    /// a new default document cannot be written.
    pub fn open_with_config(root: impl Into<PathBuf>, config: &Config) -> Result<Self, StoreError> {
        let root = root.into();
        let directory = root.join(config.directory());
        fs::create_dir_all(&directory).map_err(|source| StoreError::CreateDirectory {
            path: directory.clone(),
            source,
        })?;

        let document = Document::initial(&project_name(&root), Utc::now());
        let mut bank = Self {
            root,
            directory,
            document,
            dependencies: DependencyTable::default(),
        };

        if !bank.state_path().exists() {
            tracing::info!("Initialising memory bank in {}", bank.directory.display());
            bank.persist()?;
        }
        bank.reload();

        Ok(bank)
    }

    /// The project root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The directory holding the state document and markdown files.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The path of the persisted state document.
    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.directory.join(STATE_FILE)
    }

    /// The path of the backup written before each save.
    #[must_use]
    pub fn backup_path(&self) -> PathBuf {
        self.directory.join(BACKUP_FILE)
    }

    /// The in-memory document.
    #[must_use]
    pub const fn document(&self) -> &Document {
        &self.document
    }

    /// The section dependency table.
    #[must_use]
    pub const fn dependencies(&self) -> &DependencyTable {
        &self.dependencies
    }

    /// Re-reads the persisted document.
    ///
    /// If the file is missing or cannot be parsed, the default document is
    /// restored and persisted instead. This never fails; a failure to persist
    /// the restored default is logged.
    pub fn reload(&mut self) {
        match read_document(&self.state_path()) {
            Ok(document) => self.document = document,
            Err(e) => {
                tracing::debug!("Resetting memory bank state: {e}");
                self.document = Document::initial(&project_name(&self.root), Utc::now());
                if let Err(e) = self.persist() {
                    tracing::warn!("Failed to persist reset memory bank state: {e}");
                }
            }
        }
    }

    /// Writes the document to disk.
    ///
    /// `metadata.lastUpdated` is stamped first. The previous state file, if
    /// any, is copied to the backup location before being overwritten; a
    /// failed backup is logged and does not stop the write.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be serialized or written.
    pub fn persist(&mut self) -> Result<(), StoreError> {
        self.document.touch(Utc::now());

        let state = self.state_path();
        if state.exists() {
            let backup = self.backup_path();
            if let Err(e) = fs::copy(&state, &backup) {
                tracing::warn!("Failed to back up {}: {e}", state.display());
            }
        }

        let json = serde_json::to_string_pretty(&self.document)?;
        fs::write(&state, json).map_err(|source| StoreError::Write {
            path: state,
            source,
        })
    }

    /// The raw value of the section called `name`, or `None` if the document
    /// has no such key.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.document.get(name)
    }

    /// Updates the section called `name` and persists the document.
    ///
    /// See [`Document::update`] for what is written to each section. Returns
    /// `Ok(false)` without persisting if `name` is not a key of the document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be persisted.
    pub fn update(
        &mut self,
        name: &str,
        content: &str,
        metadata: &Map<String, Value>,
    ) -> Result<bool, StoreError> {
        if !self.document.update(name, content, metadata, Utc::now()) {
            tracing::debug!("Section '{name}' not found, nothing updated");
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Appends an entry to the change log and persists the document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be persisted.
    pub fn log_change(
        &mut self,
        description: &str,
        details: Option<Map<String, Value>>,
    ) -> Result<(), StoreError> {
        self.document.log_change(description, details, Utc::now());
        self.persist()
    }

    /// Whether every prerequisite of the section called `name` is complete.
    ///
    /// Returns `false` for names outside the dependency table.
    #[must_use]
    pub fn dependencies_satisfied(&self, name: &str) -> bool {
        name.parse::<SectionName>().is_ok_and(|section| {
            self.dependencies
                .dependencies_satisfied(&self.document, section)
        })
    }

    /// The sections that can be worked on now, in table order.
    #[must_use]
    pub fn ready_sections(&self) -> Vec<SectionName> {
        self.dependencies.ready_sections(&self.document)
    }

    /// What still needs planning.
    #[must_use]
    pub fn plan(&self) -> PlanReport {
        PlanReport::new(&self.document, &self.dependencies)
    }

    /// Whether the project is ready for work.
    #[must_use]
    pub fn act(&self) -> ActReport {
        ActReport::new(&self.document)
    }

    /// A snapshot of every reviewed section.
    #[must_use]
    pub fn review(&self) -> ReviewReport {
        ReviewReport::new(&self.document)
    }

    /// Writes markdown projections into the memory bank directory.
    ///
    /// With a section name, only that section's file(s) are written and the
    /// path of the last file written is returned (`progress.md`, for `tasks`).
    /// Returns `Ok(None)` when the named section is absent, not a mapping, or
    /// has no markdown file. Without a name, every mapped section is written
    /// and the directory is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be written.
    pub fn export_markdown(&self, name: Option<&str>) -> Result<Option<PathBuf>, StoreError> {
        let projections = match name {
            Some(name) => markdown::render_section(&self.document, name),
            None => markdown::render_all(&self.document),
        };
        let mut written = projections
            .iter()
            .map(|projection| projection.save(&self.directory))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!("Exported {} markdown file(s)", written.len());

        Ok(match name {
            Some(_) => written.pop(),
            None => Some(self.directory.clone()),
        })
    }

    /// Reads a markdown file back into the document and persists it.
    ///
    /// The file defaults to the one `name` is exported to. Returns `Ok(false)`
    /// if there is no such file, it cannot be read, or the document has
    /// nowhere to put it.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be persisted.
    pub fn import_markdown(&mut self, name: &str, path: Option<&Path>) -> Result<bool, StoreError> {
        let imported = match path {
            Some(path) => markdown::import(&mut self.document, path),
            None => markdown::MarkdownFile::for_section(name).is_some_and(|file| {
                markdown::import(&mut self.document, &self.directory.join(file.file_name()))
            }),
        };

        if imported {
            self.persist()?;
        }
        Ok(imported)
    }
}

fn read_document(path: &Path) -> Result<Document, LoadError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// The default project name: the last component of the absolute root.
fn project_name(root: &Path) -> String {
    std::path::absolute(root)
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .or_else(|| root.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::domain::Status;

    fn meta(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("metadata must be an object"),
        }
    }

    fn read_state(bank: &MemoryBank) -> Value {
        serde_json::from_str(&fs::read_to_string(bank.state_path()).unwrap()).unwrap()
    }

    #[test]
    fn open_creates_default_state() {
        let tmp = TempDir::new().unwrap();
        let bank = MemoryBank::open(tmp.path()).unwrap();

        assert!(bank.state_path().exists());
        assert!(!bank.backup_path().exists());
        assert_eq!(bank.directory(), tmp.path().join("memory-bank"));

        let state = read_state(&bank);
        assert_eq!(state["metadata"]["version"], "1.0.0");
        assert_eq!(
            state["projectInfo"]["name"],
            tmp.path().file_name().unwrap().to_str().unwrap()
        );
        assert_eq!(bank.get("changeHistory"), Some(json!([])));
    }

    #[test]
    fn open_respects_config_directory() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.set_directory(PathBuf::from(".state"));
        config.save(&tmp.path().join(Config::FILE_NAME)).unwrap();

        let bank = MemoryBank::open(tmp.path()).unwrap();
        assert!(tmp.path().join(".state").join(STATE_FILE).exists());
        assert_eq!(bank.root(), tmp.path());
    }

    #[test]
    fn open_loads_existing_state() {
        let tmp = TempDir::new().unwrap();
        {
            let mut bank = MemoryBank::open(tmp.path()).unwrap();
            bank.update("productContext", "why", &Map::new()).unwrap();
        }

        let bank = MemoryBank::open(tmp.path()).unwrap();
        assert_eq!(bank.get("productContext").unwrap()["content"], "why");
    }

    #[test]
    fn corrupt_state_is_reset_and_kept_as_backup() {
        let tmp = TempDir::new().unwrap();
        let directory = tmp.path().join("memory-bank");
        fs::create_dir_all(&directory).unwrap();
        fs::write(directory.join(STATE_FILE), "{ not json").unwrap();

        let bank = MemoryBank::open(tmp.path()).unwrap();

        assert_eq!(
            bank.document().status_view(SectionName::ProjectInfo),
            crate::StatusView::Status(&Status::NotStarted)
        );
        assert_eq!(
            fs::read_to_string(bank.backup_path()).unwrap(),
            "{ not json"
        );
        assert_eq!(read_state(&bank)["metadata"]["version"], "1.0.0");
    }

    #[test]
    fn reload_recovers_from_deleted_state() {
        let tmp = TempDir::new().unwrap();
        let mut bank = MemoryBank::open(tmp.path()).unwrap();
        bank.update("systemPatterns", "layers", &Map::new()).unwrap();

        fs::remove_file(bank.state_path()).unwrap();
        bank.reload();

        assert_eq!(bank.get("systemPatterns").unwrap()["content"], "");
        assert!(bank.state_path().exists());
    }

    #[test]
    fn reload_picks_up_external_edits() {
        let tmp = TempDir::new().unwrap();
        let mut bank = MemoryBank::open(tmp.path()).unwrap();

        let mut state = read_state(&bank);
        state["standards"]["content"] = json!("edited by hand");
        fs::write(bank.state_path(), state.to_string()).unwrap();

        bank.reload();
        assert_eq!(bank.get("standards").unwrap()["content"], "edited by hand");
    }

    #[test]
    fn persist_backs_up_previous_state() {
        let tmp = TempDir::new().unwrap();
        let mut bank = MemoryBank::open(tmp.path()).unwrap();
        let before = fs::read_to_string(bank.state_path()).unwrap();

        bank.update("projectInfo", "brief", &Map::new()).unwrap();

        assert_eq!(fs::read_to_string(bank.backup_path()).unwrap(), before);
        assert_eq!(read_state(&bank)["projectInfo"]["content"], "brief");
    }

    #[test]
    fn failed_backup_does_not_stop_the_write() {
        let tmp = TempDir::new().unwrap();
        let mut bank = MemoryBank::open(tmp.path()).unwrap();
        fs::create_dir(bank.backup_path()).unwrap();
        fs::write(bank.backup_path().join("occupied"), "x").unwrap();

        assert!(bank.update("projectInfo", "after", &Map::new()).unwrap());

        assert!(bank.backup_path().is_dir());
        assert_eq!(read_state(&bank)["projectInfo"]["content"], "after");
        assert_eq!(read_state(&bank)["projectInfo"]["status"], "Complete");
    }

    #[test]
    fn naive_created_stamp_survives_a_save() {
        let tmp = TempDir::new().unwrap();
        let bank = MemoryBank::open(tmp.path()).unwrap();
        let mut state = read_state(&bank);
        state["metadata"]["created"] = json!("2025-07-14T07:15:00.123456");
        fs::write(bank.state_path(), state.to_string()).unwrap();

        let mut bank = MemoryBank::open(tmp.path()).unwrap();
        bank.log_change("edited", None).unwrap();

        let state = read_state(&bank);
        assert_eq!(state["metadata"]["created"], "2025-07-14T07:15:00.123456");
        assert_eq!(state["metadata"]["version"], "1.0.0");
        let _: chrono::DateTime<Utc> =
            serde_json::from_value(state["metadata"]["lastUpdated"].clone()).unwrap();
    }

    #[test]
    fn persist_stamps_last_updated() {
        let tmp = TempDir::new().unwrap();
        let mut bank = MemoryBank::open(tmp.path()).unwrap();
        let created = read_state(&bank)["metadata"]["created"].clone();

        bank.persist().unwrap();

        let state = read_state(&bank);
        assert_eq!(state["metadata"]["created"], created);
        let created: chrono::DateTime<Utc> =
            serde_json::from_value(created).unwrap();
        let updated: chrono::DateTime<Utc> =
            serde_json::from_value(state["metadata"]["lastUpdated"].clone()).unwrap();
        assert!(updated >= created);
    }

    #[test]
    fn unknown_update_is_not_persisted() {
        let tmp = TempDir::new().unwrap();
        let mut bank = MemoryBank::open(tmp.path()).unwrap();
        let before = fs::read_to_string(bank.state_path()).unwrap();
        let document = bank.document().clone();

        assert!(!bank.update("doesNotExist", "x", &meta(json!({"a": 1}))).unwrap());

        assert_eq!(bank.document(), &document);
        assert_eq!(fs::read_to_string(bank.state_path()).unwrap(), before);
        assert!(!bank.backup_path().exists());
    }

    #[test]
    fn log_change_persists() {
        let tmp = TempDir::new().unwrap();
        let mut bank = MemoryBank::open(tmp.path()).unwrap();
        bank.log_change("Started", Some(meta(json!({"phase": "Analysis"}))))
            .unwrap();

        let state = read_state(&bank);
        assert_eq!(state["changeHistory"][0]["description"], "Started");
        assert_eq!(state["changeHistory"][0]["details"]["phase"], "Analysis");
    }

    #[test]
    fn dependencies_satisfied_by_name() {
        let tmp = TempDir::new().unwrap();
        let mut bank = MemoryBank::open(tmp.path()).unwrap();

        assert!(bank.dependencies_satisfied("projectInfo"));
        assert!(!bank.dependencies_satisfied("productContext"));
        assert!(!bank.dependencies_satisfied("doesNotExist"));
        assert!(!bank.dependencies_satisfied("metadata"));

        bank.update("projectInfo", "brief", &Map::new()).unwrap();
        assert!(bank.dependencies_satisfied("productContext"));
    }

    #[test]
    fn handles_are_independent() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let mut a = MemoryBank::open(first.path()).unwrap();
        let b = MemoryBank::open(second.path()).unwrap();

        a.update("projectInfo", "only here", &Map::new()).unwrap();

        assert_eq!(a.ready_sections().len(), 3);
        assert_eq!(b.ready_sections(), [SectionName::ProjectInfo]);
    }

    #[test]
    fn export_single_section_returns_its_file() {
        let tmp = TempDir::new().unwrap();
        let mut bank = MemoryBank::open(tmp.path()).unwrap();
        bank.update("projectInfo", "# Brief", &Map::new()).unwrap();

        let path = bank.export_markdown(Some("projectInfo")).unwrap().unwrap();
        assert_eq!(path, bank.directory().join("projectbrief.md"));
        assert_eq!(fs::read_to_string(path).unwrap(), "# Brief");
        assert!(!bank.directory().join("productContext.md").exists());
    }

    #[test]
    fn export_tasks_writes_both_files() {
        let tmp = TempDir::new().unwrap();
        let bank = MemoryBank::open(tmp.path()).unwrap();

        let path = bank.export_markdown(Some("tasks")).unwrap().unwrap();
        assert_eq!(path, bank.directory().join("progress.md"));
        assert!(bank.directory().join("activeContext.md").exists());
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "# Project Progress\n\n"
        );
    }

    #[test]
    fn export_unmapped_section_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let bank = MemoryBank::open(tmp.path()).unwrap();

        assert_eq!(bank.export_markdown(Some("standards")).unwrap(), None);
        assert_eq!(bank.export_markdown(Some("doesNotExist")).unwrap(), None);
        assert_eq!(fs::read_dir(bank.directory()).unwrap().count(), 1);
    }

    #[test]
    fn export_all_returns_directory() {
        let tmp = TempDir::new().unwrap();
        let bank = MemoryBank::open(tmp.path()).unwrap();

        let path = bank.export_markdown(None).unwrap().unwrap();
        assert_eq!(path, bank.directory());
        for file in markdown::MarkdownFile::ALL {
            assert!(path.join(file.file_name()).exists(), "{file} missing");
        }
    }

    #[test]
    fn import_persists_and_completes() {
        let tmp = TempDir::new().unwrap();
        let mut bank = MemoryBank::open(tmp.path()).unwrap();
        fs::write(bank.directory().join("systemPatterns.md"), "Hexagonal").unwrap();

        assert!(bank.import_markdown("systemPatterns", None).unwrap());

        let state = read_state(&bank);
        assert_eq!(state["systemPatterns"]["content"], "Hexagonal");
        assert_eq!(state["systemPatterns"]["status"], "Complete");
    }

    #[test]
    fn import_missing_file_fails() {
        let tmp = TempDir::new().unwrap();
        let mut bank = MemoryBank::open(tmp.path()).unwrap();
        let before = fs::read_to_string(bank.state_path()).unwrap();

        assert!(!bank.import_markdown("projectInfo", None).unwrap());
        assert!(!bank.import_markdown("standards", None).unwrap());
        assert!(
            !bank
                .import_markdown("projectInfo", Some(&tmp.path().join("missing.md")))
                .unwrap()
        );
        assert_eq!(fs::read_to_string(bank.state_path()).unwrap(), before);
    }

    #[test]
    fn import_explicit_path_targets_by_file_name() {
        let tmp = TempDir::new().unwrap();
        let mut bank = MemoryBank::open(tmp.path()).unwrap();
        let elsewhere = tmp.path().join("drafts");
        fs::create_dir_all(&elsewhere).unwrap();
        fs::write(elsewhere.join("activeContext.md"), "drafting").unwrap();

        assert!(
            bank.import_markdown("tasks", Some(&elsewhere.join("activeContext.md")))
                .unwrap()
        );
        assert_eq!(
            bank.get("tasks").unwrap()["current"]["activeContext"],
            "drafting"
        );
    }

    #[test]
    fn project_name_uses_last_component() {
        assert_eq!(project_name(Path::new("/work/my-project")), "my-project");
        assert_eq!(project_name(Path::new("/work/my-project/.")), "my-project");
    }
}
