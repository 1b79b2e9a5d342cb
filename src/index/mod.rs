//! On-disk JSON index of workflow metadata, incrementally maintained by
//! modification time and searchable by substring/tag/identity with a fuzzy
//! fallback.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflow;

pub const INDEX_VERSION: u32 = 1;
const DEFAULT_SEARCH_LIMIT: usize = 50;

#[derive(Debug)]
pub enum IndexError {
    Io(std::io::Error),
    Corrupt(String),
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::Io(e) => write!(f, "{e}"),
            IndexError::Corrupt(msg) => write!(f, "index corrupt: {msg}"),
        }
    }
}

impl std::error::Error for IndexError {}

impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        IndexError::Io(e)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub path: String,
    pub identity_path: String,
    pub tags: Vec<String>,
    pub updated_at: DateTime<Utc>,
    pub search_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexDocument {
    version: u32,
    updated_at: DateTime<Utc>,
    workflows: Vec<IndexEntry>,
}

pub struct Index {
    repo_root: PathBuf,
    index_path: PathBuf,
    roots: Vec<String>,
    document: IndexDocument,
}

impl Index {
    /// `index_path` defaults to `<repo_root>/.svf/index.json` when `None`.
    pub fn new(repo_root: impl Into<PathBuf>, index_path: Option<PathBuf>) -> Self {
        let repo_root = repo_root.into();
        let index_path = index_path.unwrap_or_else(|| repo_root.join(".svf").join("index.json"));
        Index {
            repo_root,
            index_path,
            roots: vec!["workflows".to_string(), "shared".to_string(), "drafts".to_string()],
            document: IndexDocument {
                version: INDEX_VERSION,
                updated_at: Utc::now(),
                workflows: Vec::new(),
            },
        }
    }

    /// Load from disk, falling back to an empty index if the file is
    /// missing, corrupt, or from an incompatible schema version.
    pub fn load(repo_root: impl Into<PathBuf>, index_path: Option<PathBuf>) -> Self {
        let mut index = Index::new(repo_root, index_path);
        if let Ok(contents) = std::fs::read_to_string(&index.index_path) {
            if let Ok(doc) = serde_json::from_str::<IndexDocument>(&contents) {
                if doc.version == INDEX_VERSION {
                    index.document = doc;
                }
            }
        }
        index
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.document.workflows
    }

    fn workflow_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for root in &self.roots {
            let root_path = self.repo_root.join(root);
            if !root_path.exists() {
                continue;
            }
            files.extend(
                ignore::WalkBuilder::new(&root_path)
                    .hidden(false)
                    .git_ignore(false)
                    .build()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_name() == "workflow.yaml")
                    .map(|e| e.path().to_path_buf()),
            );
        }
        files
    }

    fn entry_for(&self, file: &Path) -> Option<IndexEntry> {
        let contents = std::fs::read_to_string(file).ok()?;
        let workflow = workflow::codec::parse(&contents).ok()?;
        let slug = file
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let relative = file
            .strip_prefix(&self.repo_root)
            .unwrap_or(file)
            .to_string_lossy()
            .replace('\\', "/");
        let identity_path = file
            .parent()
            .and_then(|slug_dir| slug_dir.parent())
            .and_then(|identity_dir| {
                self.roots.iter().find_map(|root| {
                    identity_dir
                        .strip_prefix(self.repo_root.join(root))
                        .ok()
                        .map(|p| p.to_string_lossy().replace('\\', "/"))
                })
            })
            .unwrap_or_default();

        let updated_at = mtime_of(file).unwrap_or_else(Utc::now);
        let search_text = build_search_text(&workflow);

        Some(IndexEntry {
            id: workflow.id,
            slug,
            title: workflow.title,
            path: relative,
            identity_path,
            tags: workflow.tags,
            updated_at,
            search_text,
        })
    }

    /// Walk the three roots, load each `workflow.yaml`, and materialize an
    /// entry, discarding the previous contents.
    pub fn build(&mut self) -> Result<(), IndexError> {
        let mut entries = Vec::new();
        for file in self.workflow_files() {
            if let Some(entry) = self.entry_for(&file) {
                entries.push(entry);
            }
        }
        self.document.workflows = entries;
        self.document.version = INDEX_VERSION;
        self.document.updated_at = latest_entry_update(&self.document.workflows);
        self.save()
    }

    /// For each current `workflow.yaml`: new if absent from the existing
    /// index, changed if its mtime postdates the stored entry's
    /// `updated_at`. Deleted entries (paths no longer on disk) are dropped.
    /// Only changed entries are recomputed; the rest are preserved as-is.
    pub fn update_incremental(&mut self) -> Result<(), IndexError> {
        let current_files = self.workflow_files();
        let current_paths: BTreeMap<String, PathBuf> = current_files
            .iter()
            .map(|f| {
                let relative = f
                    .strip_prefix(&self.repo_root)
                    .unwrap_or(f)
                    .to_string_lossy()
                    .replace('\\', "/");
                (relative, f.clone())
            })
            .collect();

        let mut by_path: BTreeMap<String, IndexEntry> = self
            .document
            .workflows
            .drain(..)
            .map(|e| (e.path.clone(), e))
            .collect();

        for (path, file) in &current_paths {
            let file_mtime = mtime_of(file).unwrap_or_else(Utc::now);
            let needs_rebuild = match by_path.get(path) {
                None => true,
                Some(existing) => file_mtime > existing.updated_at,
            };
            if needs_rebuild {
                if let Some(entry) = self.entry_for(file) {
                    by_path.insert(path.clone(), entry);
                }
            }
        }

        by_path.retain(|path, _| current_paths.contains_key(path));

        self.document.workflows = by_path.into_values().collect();
        self.document.version = INDEX_VERSION;
        self.document.updated_at = latest_entry_update(&self.document.workflows);
        self.save()
    }

    /// True iff any workflow file's mtime is newer than the index file's
    /// mtime, or the index file does not exist yet.
    pub fn is_stale(&self) -> bool {
        let Some(index_mtime) = mtime_of(&self.index_path) else {
            return true;
        };
        self.workflow_files()
            .iter()
            .any(|f| mtime_of(f).map(|m| m > index_mtime).unwrap_or(true))
    }

    /// A corrupt or version-mismatched index is replaced by a full rebuild.
    pub fn rebuild(&mut self) -> Result<(), IndexError> {
        self.build()
    }

    pub fn save(&self) -> Result<(), IndexError> {
        let dir = self.index_path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;
        let json = serde_json::to_string_pretty(&self.document)
            .map_err(|e| IndexError::Corrupt(e.to_string()))?;
        atomic_write(&self.index_path, &json)?;
        Ok(())
    }

    /// Case-insensitive search across `query` (substring against title,
    /// slug, search_text), `tags` (intersection), and `identity_path`
    /// (exact match). Bounded to `limit` results (default 50). `fuzzy`
    /// additionally matches subsequences of `query` within `search_text`,
    /// sorted by a score privileging prefix and word-boundary matches.
    pub fn search(&self, params: &SearchParams) -> Vec<&IndexEntry> {
        let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
        let query_lower = params.query.as_deref().map(|q| q.to_lowercase());

        let mut matches: Vec<(&IndexEntry, i64)> = self
            .document
            .workflows
            .iter()
            .filter(|e| {
                params
                    .identity_path
                    .as_deref()
                    .map(|p| e.identity_path == p)
                    .unwrap_or(true)
            })
            .filter(|e| {
                params
                    .tags
                    .iter()
                    .all(|t| e.tags.iter().any(|et| et.eq_ignore_ascii_case(t)))
            })
            .filter_map(|e| match &query_lower {
                None => Some((e, 0i64)),
                Some(q) => score_match(e, q, params.fuzzy).map(|score| (e, score)),
            })
            .collect();

        matches.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.updated_at.cmp(&a.0.updated_at)));
        matches.into_iter().take(limit).map(|(e, _)| e).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub query: Option<String>,
    pub tags: Vec<String>,
    pub identity_path: Option<String>,
    pub fuzzy: bool,
    pub limit: Option<usize>,
}

fn score_match(entry: &IndexEntry, query_lower: &str, fuzzy: bool) -> Option<i64> {
    let title_lower = entry.title.to_lowercase();
    let slug_lower = entry.slug.to_lowercase();
    let haystack = format!("{title_lower} {slug_lower} {}", entry.search_text);

    if haystack.contains(query_lower) {
        let mut score = 100;
        if title_lower.starts_with(query_lower) {
            score += 50;
        }
        if title_lower
            .split_whitespace()
            .any(|word| word == query_lower)
        {
            score += 25;
        }
        return Some(score);
    }

    if fuzzy && is_subsequence(query_lower, &entry.search_text) {
        let similarity = strsim::jaro_winkler(query_lower, &title_lower).max(
            strsim::jaro_winkler(query_lower, &entry.search_text),
        );
        return Some((similarity * 10.0) as i64);
    }

    None
}

fn is_subsequence(needle: &str, haystack: &str) -> bool {
    let mut haystack_chars = haystack.chars();
    needle
        .chars()
        .all(|c| haystack_chars.any(|h| h == c))
}

fn build_search_text(workflow: &workflow::Workflow) -> String {
    let commands = workflow
        .steps
        .iter()
        .map(|s| s.command.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "{} {} {} {}",
        workflow.title.to_lowercase(),
        workflow.description.to_lowercase(),
        workflow.tags.join(" ").to_lowercase(),
        commands.to_lowercase()
    )
}

/// The document-level `updated_at` is derived from the entries' own mtimes
/// rather than wall-clock time, so two consecutive builds over an unchanged
/// working tree produce byte-identical index files. Empty sets fall back to
/// the epoch.
fn latest_entry_update(entries: &[IndexEntry]) -> DateTime<Utc> {
    entries
        .iter()
        .map(|e| e.updated_at)
        .max()
        .unwrap_or_else(|| DateTime::<Utc>::from(SystemTime::UNIX_EPOCH))
}

fn mtime_of(path: &Path) -> Option<DateTime<Utc>> {
    let metadata = std::fs::metadata(path).ok()?;
    let modified: SystemTime = metadata.modified().ok()?;
    Some(DateTime::<Utc>::from(modified))
}

fn atomic_write(final_path: &Path, contents: &str) -> std::io::Result<()> {
    let dir = final_path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(final_path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{SaveOptions, WorkflowStore};
    use crate::workflow::model::Step;
    use std::process::Command;
    use tempfile::TempDir;

    fn init_repo() -> (TempDir, WorkflowStore) {
        let dir = TempDir::new().unwrap();
        let git = crate::git::GitGateway::new(dir.path());
        git.init(false, Some("main")).unwrap();
        Command::new("git")
            .current_dir(dir.path())
            .args(["config", "user.email", "test@example.com"])
            .status()
            .unwrap();
        Command::new("git")
            .current_dir(dir.path())
            .args(["config", "user.name", "Test"])
            .status()
            .unwrap();
        (dir, WorkflowStore::new(dir.path()))
    }

    #[test]
    fn build_is_deterministic() {
        let (dir, store) = init_repo();
        store
            .save(
                crate::workflow::Workflow {
                    steps: vec![Step {
                        command: "echo hi".into(),
                        ..Default::default()
                    }],
                    ..crate::workflow::Workflow::new("Deploy")
                },
                &SaveOptions::authored("me"),
            )
            .unwrap();

        let mut index = Index::new(dir.path(), None);
        index.build().unwrap();
        let first = std::fs::read_to_string(dir.path().join(".svf/index.json")).unwrap();

        let mut index2 = Index::new(dir.path(), None);
        index2.build().unwrap();
        let second = std::fs::read_to_string(dir.path().join(".svf/index.json")).unwrap();

        // The document's updated_at is derived from entry mtimes, not
        // wall-clock time, so rebuilding over an unchanged tree is
        // byte-for-byte identical.
        assert_eq!(first, second);
    }

    #[test]
    fn incremental_update_only_touches_changed_entry() {
        let (dir, store) = init_repo();
        let saved = store
            .save(
                crate::workflow::Workflow {
                    steps: vec![Step {
                        command: "echo hi".into(),
                        ..Default::default()
                    }],
                    ..crate::workflow::Workflow::new("Deploy")
                },
                &SaveOptions::authored("me"),
            )
            .unwrap();
        store
            .save(
                crate::workflow::Workflow {
                    steps: vec![Step {
                        command: "echo bye".into(),
                        ..Default::default()
                    }],
                    ..crate::workflow::Workflow::new("Cleanup")
                },
                &SaveOptions::authored("me"),
            )
            .unwrap();

        let mut index = Index::new(dir.path(), None);
        index.build().unwrap();
        let cleanup_before = index
            .entries()
            .iter()
            .find(|e| e.slug == "cleanup")
            .unwrap()
            .clone();

        std::thread::sleep(std::time::Duration::from_millis(1100));
        let mut reloaded = store.load(&crate::store::LoadRef::by_path(&saved.path)).unwrap();
        reloaded.description = "now with a description".into();
        store
            .save(reloaded, &SaveOptions {
                root: crate::store::Root::Workflows,
                identity_path: "me".into(),
                commit: false,
                message: None,
            })
            .unwrap();

        index.update_incremental().unwrap();
        let cleanup_after = index
            .entries()
            .iter()
            .find(|e| e.slug == "cleanup")
            .unwrap();
        assert_eq!(&cleanup_before, cleanup_after);

        let deploy_after = index
            .entries()
            .iter()
            .find(|e| e.slug == "deploy")
            .unwrap();
        assert!(deploy_after.search_text.contains("now with a description"));
    }

    #[test]
    fn search_filters_by_substring_and_tag() {
        let (dir, store) = init_repo();
        let mut tagged = crate::workflow::Workflow::new("Deploy Api");
        tagged.tags = vec!["prod".into()];
        tagged.steps.push(Step {
            command: "echo hi".into(),
            ..Default::default()
        });
        store.save(tagged, &SaveOptions::authored("me")).unwrap();

        let mut index = Index::new(dir.path(), None);
        index.build().unwrap();

        let results = index.search(&SearchParams {
            query: Some("deploy".into()),
            tags: vec!["prod".into()],
            ..Default::default()
        });
        assert_eq!(results.len(), 1);

        let no_match = index.search(&SearchParams {
            tags: vec!["staging".into()],
            ..Default::default()
        });
        assert!(no_match.is_empty());
    }
}
