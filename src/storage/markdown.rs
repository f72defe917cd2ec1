use std::{
    fmt,
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::domain::{Document, Field, Section, SectionName, Status, Tracked};

/// A markdown file that a section is projected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkdownFile {
    /// `projectbrief.md`, from `projectInfo`.
    ProjectBrief,
    /// `productContext.md`, from `productContext`.
    ProductContext,
    /// `systemPatterns.md`, from `systemPatterns`.
    SystemPatterns,
    /// `techContext.md`, from `technologies`.
    TechContext,
    /// `activeContext.md`, from `tasks.current.activeContext`.
    ActiveContext,
    /// `progress.md`, composed from `tasks.history`.
    ///
    /// Importing it writes the raw text to `tasks.current.progress`, which is
    /// not what exporting reads, so the round trip is lossy.
    Progress,
}

impl MarkdownFile {
    /// Every projected file, in export order.
    pub const ALL: [Self; 6] = [
        Self::ProjectBrief,
        Self::ProductContext,
        Self::SystemPatterns,
        Self::TechContext,
        Self::ActiveContext,
        Self::Progress,
    ];

    /// The file name within the memory bank directory.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::ProjectBrief => "projectbrief.md",
            Self::ProductContext => "productContext.md",
            Self::SystemPatterns => "systemPatterns.md",
            Self::TechContext => "techContext.md",
            Self::ActiveContext => "activeContext.md",
            Self::Progress => "progress.md",
        }
    }

    /// The file with the given name, if it is one of the projected files.
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|file| file.file_name() == name)
    }

    /// The section the file is projected from.
    #[must_use]
    pub const fn section(self) -> SectionName {
        match self {
            Self::ProjectBrief => SectionName::ProjectInfo,
            Self::ProductContext => SectionName::ProductContext,
            Self::SystemPatterns => SectionName::SystemPatterns,
            Self::TechContext => SectionName::Technologies,
            Self::ActiveContext | Self::Progress => SectionName::Tasks,
        }
    }

    /// The file a section is imported from by default.
    ///
    /// `tasks` maps to `activeContext.md`. Sections without a projection map
    /// to `None`.
    #[must_use]
    pub fn for_section(name: &str) -> Option<Self> {
        let section = name.parse::<SectionName>().ok()?;
        Self::ALL.into_iter().find(|file| file.section() == section)
    }
}

impl fmt::Display for MarkdownFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// The rendered contents of one markdown file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    /// The file to write.
    pub file: MarkdownFile,
    /// The full file contents.
    pub contents: String,
}

impl Projection {
    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(self.contents.as_bytes())?;
        writer.flush()
    }

    /// Writes the projection into `directory`, returning the path written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn save(&self, directory: &Path) -> Result<PathBuf, super::StoreError> {
        let path = directory.join(self.file.file_name());
        self.save_to_path(&path)
            .map_err(|source| super::StoreError::Write {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }

    fn save_to_path(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write(&mut writer)
    }
}

/// Renders the projections of the section called `name`.
///
/// `tasks` renders to `activeContext.md` and then `progress.md`. Sections that
/// are absent, not mappings, or have no projection render to nothing.
#[must_use]
pub fn render_section(document: &Document, name: &str) -> Vec<Projection> {
    name.parse::<SectionName>()
        .map(|section| render(document, section))
        .unwrap_or_default()
}

/// Renders the projections of every mapped section present in the document.
#[must_use]
pub fn render_all(document: &Document) -> Vec<Projection> {
    [
        SectionName::ProjectInfo,
        SectionName::ProductContext,
        SectionName::SystemPatterns,
        SectionName::Technologies,
        SectionName::Tasks,
    ]
    .into_iter()
    .flat_map(|section| render(document, section))
    .collect()
}

fn render(document: &Document, section: SectionName) -> Vec<Projection> {
    let content = match section {
        SectionName::ProjectInfo => content_of(document.project_info.as_ref(), |s| &s.content),
        SectionName::ProductContext => {
            content_of(document.product_context.as_ref(), |s| &s.content)
        }
        SectionName::SystemPatterns => {
            content_of(document.system_patterns.as_ref(), |s| &s.content)
        }
        SectionName::Technologies => content_of(document.technologies.as_ref(), |s| &s.content),
        SectionName::Tasks => return render_tasks(document),
        SectionName::Metadata | SectionName::Standards | SectionName::ChangeHistory => {
            return Vec::new();
        }
    };

    let Some(content) = content else {
        return Vec::new();
    };
    let Some(file) = MarkdownFile::ALL
        .into_iter()
        .find(|file| file.section() == section)
    else {
        return Vec::new();
    };

    let contents = content.unwrap_or_else(|| placeholder(section));
    vec![Projection { file, contents }]
}

/// `None` if the section is absent or not a mapping, otherwise the text of its
/// content (which may itself be missing).
fn content_of<T>(
    section: Option<&Section<T>>,
    content: impl FnOnce(&T) -> &Option<Field<String>>,
) -> Option<Option<String>> {
    section
        .and_then(Section::well_formed)
        .map(|inner| content(inner).as_ref().map(Field::to_text))
}

fn placeholder(section: SectionName) -> String {
    format!("# {section}\n\n*No content yet*")
}

fn render_tasks(document: &Document) -> Vec<Projection> {
    if document.tasks.as_ref().and_then(Section::well_formed).is_none() {
        return Vec::new();
    }

    let active_context = document
        .current_task()
        .and_then(|current| current.active_context.as_ref())
        .map(Field::to_text)
        .unwrap_or_default();

    let mut progress = String::from("# Project Progress\n\n");
    for record in document.task_history() {
        if let Some(text) = record.progress.as_ref().map(Field::to_text) {
            let heading = record
                .description
                .as_ref()
                .map_or_else(|| "Task".to_owned(), Field::to_text);
            progress.push_str(&format!("## {heading}\n{text}\n\n"));
        }
    }

    vec![
        Projection {
            file: MarkdownFile::ActiveContext,
            contents: active_context,
        },
        Projection {
            file: MarkdownFile::Progress,
            contents: progress,
        },
    ]
}

/// Reads the markdown file at `path` into the document.
///
/// The target is chosen by the file's name, not by the section it was asked
/// for. Returns `false` if the file is missing or unreadable, its name is not
/// a projected file, or the target is absent or malformed.
pub fn import(document: &mut Document, path: &Path) -> bool {
    let Some(file) = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(MarkdownFile::from_file_name)
    else {
        tracing::debug!("{} is not a memory bank file", path.display());
        return false;
    };

    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!("Failed to read {}: {e}", path.display());
            return false;
        }
    };

    let imported = match file {
        MarkdownFile::ActiveContext => current_task(document).is_some_and(|current| {
            current.active_context = Some(text.into());
            true
        }),
        MarkdownFile::Progress => current_task(document).is_some_and(|current| {
            current.progress = Some(text.into());
            true
        }),
        MarkdownFile::ProjectBrief => {
            complete_with(document.project_info.as_mut(), |s| s.content = Some(text.into()))
        }
        MarkdownFile::ProductContext => {
            complete_with(document.product_context.as_mut(), |s| s.content = Some(text.into()))
        }
        MarkdownFile::SystemPatterns => {
            complete_with(document.system_patterns.as_mut(), |s| s.content = Some(text.into()))
        }
        MarkdownFile::TechContext => {
            complete_with(document.technologies.as_mut(), |s| s.content = Some(text.into()))
        }
    };

    if !imported {
        tracing::debug!("No well-formed {} section to import {file} into", file.section());
    }
    imported
}

fn current_task(document: &mut Document) -> Option<&mut crate::domain::CurrentTask> {
    document
        .tasks
        .as_mut()
        .and_then(Section::well_formed_mut)
        .and_then(|tasks| tasks.current.as_mut())
        .and_then(Section::well_formed_mut)
}

/// Applies `write` to a well-formed section and marks it complete, whether or
/// not it had a status before.
fn complete_with<T: Tracked>(section: Option<&mut Section<T>>, write: impl FnOnce(&mut T)) -> bool {
    let Some(inner) = section.and_then(Section::well_formed_mut) else {
        return false;
    };
    write(inner);
    *inner.status_slot() = Some(Status::Complete);
    true
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::{Map, json};
    use tempfile::TempDir;
    use test_case::test_case;

    use super::*;

    fn document() -> Document {
        Document::initial("demo", Utc.with_ymd_and_hms(2025, 7, 14, 7, 15, 0).unwrap())
    }

    fn contents(projections: &[Projection], file: MarkdownFile) -> &str {
        &projections
            .iter()
            .find(|p| p.file == file)
            .unwrap()
            .contents
    }

    #[test_case("projectInfo", Some(MarkdownFile::ProjectBrief))]
    #[test_case("technologies", Some(MarkdownFile::TechContext))]
    #[test_case("tasks", Some(MarkdownFile::ActiveContext))]
    #[test_case("standards", None)]
    #[test_case("doesNotExist", None)]
    fn default_import_file(name: &str, expected: Option<MarkdownFile>) {
        assert_eq!(MarkdownFile::for_section(name), expected);
    }

    #[test]
    fn file_names_round_trip() {
        for file in MarkdownFile::ALL {
            assert_eq!(MarkdownFile::from_file_name(file.file_name()), Some(file));
        }
        assert_eq!(MarkdownFile::from_file_name("notes.md"), None);
    }

    #[test]
    fn render_writes_content_verbatim() {
        let mut document = document();
        document.update("productContext", "# Why\n\nBecause.", &Map::new(), Utc::now());

        let projections = render_section(&document, "productContext");
        assert_eq!(
            projections,
            [Projection {
                file: MarkdownFile::ProductContext,
                contents: "# Why\n\nBecause.".to_owned(),
            }]
        );
    }

    #[test]
    fn render_placeholder_when_content_missing() {
        let document: Document = serde_json::from_value(json!({
            "systemPatterns": {"status": "Pending"}
        }))
        .unwrap();

        let projections = render_section(&document, "systemPatterns");
        assert_eq!(
            contents(&projections, MarkdownFile::SystemPatterns),
            "# systemPatterns\n\n*No content yet*"
        );
    }

    #[test_case("standards"; "unmapped")]
    #[test_case("doesNotExist"; "unknown")]
    #[test_case("productContext"; "malformed")]
    #[test_case("technologies"; "absent")]
    fn render_nothing(name: &str) {
        let document: Document = serde_json::from_value(json!({
            "productContext": ["not", "a", "mapping"],
            "standards": {"content": "s", "status": "Pending"}
        }))
        .unwrap();
        assert!(render_section(&document, name).is_empty());
    }

    #[test]
    fn render_tasks_composes_progress_from_history() {
        let mut document = document();
        let now = Utc::now();
        let meta = |value: serde_json::Value| value.as_object().unwrap().clone();
        document.update(
            "tasks",
            "",
            &meta(json!({"activeContext": "Refactoring the store"})),
            now,
        );
        document.update(
            "tasks",
            "",
            &meta(json!({"description": "Set up", "progress": "Scaffolded"})),
            now,
        );
        document.update("tasks", "", &meta(json!({"progress": "Wired tests"})), now);

        let projections = render_section(&document, "tasks");
        assert_eq!(projections.len(), 2);
        assert_eq!(
            contents(&projections, MarkdownFile::ActiveContext),
            "Refactoring the store"
        );
        assert_eq!(
            contents(&projections, MarkdownFile::Progress),
            "# Project Progress\n\n## Set up\nScaffolded\n\n## Task completed\nWired tests\n\n"
        );
    }

    #[test]
    fn render_tasks_skips_records_without_progress() {
        let document: Document = serde_json::from_value(json!({
            "tasks": {
                "history": [
                    {"description": "no progress"},
                    {"progress": "untitled"},
                    "garbage"
                ]
            }
        }))
        .unwrap();

        let projections = render_section(&document, "tasks");
        assert_eq!(contents(&projections, MarkdownFile::ActiveContext), "");
        assert_eq!(
            contents(&projections, MarkdownFile::Progress),
            "# Project Progress\n\n## Task\nuntitled\n\n"
        );
    }

    #[test]
    fn render_mistyped_fields_as_json_text() {
        let document: Document = serde_json::from_value(json!({
            "systemPatterns": {"content": 42, "status": "Pending"},
            "tasks": {
                "history": [
                    {"timestamp": "2025-07-14T07:20:00.5", "description": 3, "progress": "kept"}
                ]
            }
        }))
        .unwrap();

        let projections = render_section(&document, "systemPatterns");
        assert_eq!(contents(&projections, MarkdownFile::SystemPatterns), "42");

        let projections = render_section(&document, "tasks");
        assert_eq!(
            contents(&projections, MarkdownFile::Progress),
            "# Project Progress\n\n## 3\nkept\n\n"
        );
    }

    #[test]
    fn render_all_covers_every_mapped_file() {
        let projections = render_all(&document());
        let files: Vec<_> = projections.iter().map(|p| p.file).collect();
        assert_eq!(files, MarkdownFile::ALL);
    }

    #[test]
    fn import_regular_file_completes_section() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("techContext.md");
        fs::write(&path, "Rust 2024").unwrap();

        let mut document = document();
        assert!(import(&mut document, &path));

        let technologies = document.technologies.unwrap();
        let technologies = technologies.well_formed().unwrap();
        assert_eq!(technologies.content, Some(Section::WellFormed("Rust 2024".to_owned())));
        assert_eq!(technologies.status, Some(Status::Complete));
    }

    #[test]
    fn import_adds_status_when_missing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("productContext.md");
        fs::write(&path, "why").unwrap();

        let mut document: Document =
            serde_json::from_value(json!({"productContext": {}})).unwrap();
        assert!(import(&mut document, &path));
        assert_eq!(
            document.get("productContext"),
            Some(json!({"content": "why", "status": "Complete"}))
        );
    }

    #[test]
    fn import_into_mapping_with_mistyped_fields() {
        let tmp = TempDir::new().unwrap();
        let brief = tmp.path().join("projectbrief.md");
        let active = tmp.path().join("activeContext.md");
        fs::write(&brief, "brief").unwrap();
        fs::write(&active, "ctx").unwrap();

        let mut document: Document = serde_json::from_value(json!({
            "projectInfo": {"name": 7, "content": 42, "status": 0},
            "tasks": {"current": {"steps": "none", "activeContext": false}}
        }))
        .unwrap();
        assert!(import(&mut document, &brief));
        assert!(import(&mut document, &active));

        assert_eq!(
            document.get("projectInfo"),
            Some(json!({"name": 7, "content": "brief", "status": "Complete"}))
        );
        assert_eq!(
            document.get("tasks"),
            Some(json!({"current": {"steps": "none", "activeContext": "ctx"}}))
        );
    }

    #[test]
    fn import_active_context_and_progress() {
        let tmp = TempDir::new().unwrap();
        let active = tmp.path().join("activeContext.md");
        let progress = tmp.path().join("progress.md");
        fs::write(&active, "now").unwrap();
        fs::write(&progress, "# Project Progress\n").unwrap();

        let mut document = document();
        assert!(import(&mut document, &active));
        assert!(import(&mut document, &progress));

        let current = document.current_task().unwrap();
        assert_eq!(current.active_context, Some(Section::WellFormed("now".to_owned())));
        assert_eq!(
            current.progress,
            Some(Section::WellFormed("# Project Progress\n".to_owned()))
        );
        assert_eq!(document.task_history().count(), 0);
    }

    #[test]
    fn import_fails_without_target() {
        let tmp = TempDir::new().unwrap();
        let active = tmp.path().join("activeContext.md");
        let brief = tmp.path().join("projectbrief.md");
        let other = tmp.path().join("notes.md");
        for path in [&active, &brief, &other] {
            fs::write(path, "text").unwrap();
        }

        let mut document: Document = serde_json::from_value(json!({
            "tasks": {"current": "not a mapping"},
            "projectInfo": 7
        }))
        .unwrap();
        let before = document.clone();

        assert!(!import(&mut document, &active));
        assert!(!import(&mut document, &brief));
        assert!(!import(&mut document, &other));
        assert!(!import(&mut document, &tmp.path().join("progress.md")));
        assert_eq!(document, before);
    }

    #[test]
    fn save_creates_directory() {
        let tmp = TempDir::new().unwrap();
        let directory = tmp.path().join("nested").join("bank");
        let projection = Projection {
            file: MarkdownFile::ProjectBrief,
            contents: "brief".to_owned(),
        };

        let path = projection.save(&directory).unwrap();
        assert_eq!(path, directory.join("projectbrief.md"));
        assert_eq!(fs::read_to_string(path).unwrap(), "brief");
    }
}
