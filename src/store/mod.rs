//! Maps slugs and identity paths to on-disk locations.
//!
//! Workflows live at `<root>/<identity>/<slug>/workflow.yaml` inside a Git
//! working tree the caller already owns. Saves are atomic (temp file,
//! fsync, rename) and optionally staged and committed in the same call.

pub mod error;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};

pub use error::StoreError;

use crate::git::GitGateway;
use crate::workflow::{self, Workflow, WorkflowRef, validate};

/// One of the three locations a workflow can live under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Root {
    /// Identity-scoped, the default for authored workflows.
    Workflows,
    /// Cross-identity reads; not written to by default.
    Shared,
    /// No commit by default; scratch space for in-progress edits.
    Drafts,
}

impl Root {
    fn all() -> [Root; 3] {
        [Root::Workflows, Root::Shared, Root::Drafts]
    }
}

/// Resolves a [`Root`] to the repo-relative directory name it lives under.
/// Configurable via the ambient config (`workflows.root`/`shared_root`/`draft_root`);
/// this store carries sensible defaults so it's usable standalone.
#[derive(Debug, Clone)]
pub struct RootLayout {
    pub workflows: String,
    pub shared: String,
    pub drafts: String,
}

impl Default for RootLayout {
    fn default() -> Self {
        RootLayout {
            workflows: "workflows".to_string(),
            shared: "shared".to_string(),
            drafts: "drafts".to_string(),
        }
    }
}

impl RootLayout {
    fn dir_name(&self, root: Root) -> &str {
        match root {
            Root::Workflows => &self.workflows,
            Root::Shared => &self.shared,
            Root::Drafts => &self.drafts,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub identity_path: Option<String>,
    pub tags: Vec<String>,
}

/// Locates a workflow to load: by path, by id/slug, or both.
#[derive(Debug, Clone, Default)]
pub struct LoadRef {
    pub path: Option<String>,
    pub id: Option<String>,
    pub slug: Option<String>,
}

impl LoadRef {
    pub fn by_path(path: impl Into<String>) -> Self {
        LoadRef {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn by_slug(slug: impl Into<String>) -> Self {
        LoadRef {
            slug: Some(slug.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct SaveOptions {
    pub root: Root,
    pub identity_path: String,
    pub commit: bool,
    pub message: Option<String>,
}

impl SaveOptions {
    pub fn drafts(identity_path: impl Into<String>) -> Self {
        SaveOptions {
            root: Root::Drafts,
            identity_path: identity_path.into(),
            commit: false,
            message: None,
        }
    }

    pub fn authored(identity_path: impl Into<String>) -> Self {
        SaveOptions {
            root: Root::Workflows,
            identity_path: identity_path.into(),
            commit: true,
            message: None,
        }
    }
}

pub struct WorkflowStore {
    repo_root: PathBuf,
    git: GitGateway,
    layout: RootLayout,
}

impl WorkflowStore {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        let repo_root = repo_root.into();
        WorkflowStore {
            git: GitGateway::new(&repo_root),
            repo_root,
            layout: RootLayout::default(),
        }
    }

    pub fn with_layout(mut self, layout: RootLayout) -> Self {
        self.layout = layout;
        self
    }

    fn root_path(&self, root: Root) -> PathBuf {
        self.repo_root.join(self.layout.dir_name(root))
    }

    /// Discover `workflow.yaml` under all three roots, returning refs sorted
    /// by `updated_at` descending.
    pub fn list(&self, filter: &ListFilter) -> Result<Vec<WorkflowRef>, StoreError> {
        let mut refs = Vec::new();

        for root in Root::all() {
            let root_path = self.root_path(root);
            if !root_path.exists() {
                continue;
            }
            for entry in walk_workflow_files(&root_path) {
                let relative = entry
                    .strip_prefix(&self.repo_root)
                    .unwrap_or(&entry)
                    .to_string_lossy()
                    .replace('\\', "/");

                let identity_path = identity_path_of(&root_path, &entry);

                if let Some(ref wanted) = filter.identity_path {
                    if !identity_path.starts_with(wanted.as_str()) {
                        continue;
                    }
                }

                let contents = match std::fs::read_to_string(&entry) {
                    Ok(c) => c,
                    Err(_) => continue, // soft failure: skip, listing still succeeds
                };
                let workflow = match workflow::codec::parse(&contents) {
                    Ok(w) => w,
                    Err(_) => continue,
                };

                if !filter.tags.is_empty()
                    && !filter
                        .tags
                        .iter()
                        .all(|t| workflow.tags.iter().any(|wt| wt.eq_ignore_ascii_case(t)))
                {
                    continue;
                }

                let slug = entry
                    .parent()
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();

                let updated_at = mtime_of(&entry).unwrap_or_else(Utc::now);

                refs.push(WorkflowRef {
                    id: workflow.id,
                    slug,
                    path: relative,
                    updated_at,
                });
            }
        }

        refs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(refs)
    }

    /// Load and validate a workflow. A `reference` may carry only a path
    /// (used by external lookups), only an id/slug (resolved via `list`),
    /// or both.
    pub fn load(&self, reference: &LoadRef) -> Result<Workflow, StoreError> {
        let path = if let Some(path) = &reference.path {
            if !crate::path::is_safe_repo_relative(path) {
                return Err(StoreError::UnsafePath(path.clone()));
            }
            self.repo_root.join(path)
        } else {
            let matched = self
                .list(&ListFilter::default())?
                .into_iter()
                .find(|r| {
                    reference.id.as_deref().map(|id| id == r.id).unwrap_or(true)
                        && reference
                            .slug
                            .as_deref()
                            .map(|slug| slug == r.slug)
                            .unwrap_or(true)
                })
                .ok_or_else(|| StoreError::NotFound(format!("{reference:?}")))?;
            self.repo_root.join(&matched.path)
        };

        let contents = std::fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        let workflow = workflow::codec::parse(&contents).map_err(|source| StoreError::Codec {
            path: path.clone(),
            source,
        })?;

        let errors = validate(&workflow);
        if !errors.is_empty() {
            return Err(StoreError::ValidationFailed { path, errors });
        }

        Ok(workflow)
    }

    /// Canonical path is `<root>/<identity>/<slug>/workflow.yaml`. Mints an
    /// id if `workflow.id` is empty, suffixes the slug on collision with a
    /// different id under the same identity, and writes atomically
    /// (temp file in the target directory, fsync, rename over
    /// `workflow.yaml`). Optionally stages and commits.
    pub fn save(&self, mut workflow: Workflow, options: &SaveOptions) -> Result<WorkflowRef, StoreError> {
        if !crate::path::is_safe_repo_relative(&options.identity_path) {
            return Err(StoreError::UnsafePath(options.identity_path.clone()));
        }

        let errors = validate(&workflow);
        if !errors.is_empty() {
            return Err(StoreError::ValidationFailed {
                path: PathBuf::new(),
                errors,
            });
        }

        if workflow.id.is_empty() {
            workflow.id = crate::slug::id();
        }

        let identity_dir = self
            .root_path(options.root)
            .join(&options.identity_path);
        let existing_slugs = sibling_slugs(&identity_dir, &workflow.id);
        let slug = crate::slug::generate_unique_slug(&workflow.title, &existing_slugs);

        let dir = identity_dir.join(&slug);
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;

        let final_path = dir.join("workflow.yaml");
        let yaml = workflow::codec::serialize(&workflow).map_err(|source| StoreError::Codec {
            path: final_path.clone(),
            source,
        })?;
        atomic_write(&final_path, &yaml).map_err(|source| StoreError::Io {
            path: final_path.clone(),
            source,
        })?;

        if options.commit {
            let relative = final_path
                .strip_prefix(&self.repo_root)
                .unwrap_or(&final_path)
                .to_string_lossy()
                .replace('\\', "/");
            self.git.add(&relative)?;
            let message = options
                .message
                .clone()
                .unwrap_or_else(|| format!("Save workflow: {}", workflow.title));
            match self.git.commit_all(&message) {
                Ok(_) | Err(crate::git::GitError::NothingToCommit) => {}
                Err(e) => return Err(e.into()),
            }
        }

        let updated_at = mtime_of(&final_path).unwrap_or_else(Utc::now);
        let relative = final_path
            .strip_prefix(&self.repo_root)
            .unwrap_or(&final_path)
            .to_string_lossy()
            .replace('\\', "/");

        Ok(WorkflowRef {
            id: workflow.id,
            slug,
            path: relative,
            updated_at,
        })
    }
}

fn sibling_slugs(identity_dir: &Path, current_id: &str) -> Vec<String> {
    let Ok(read_dir) = std::fs::read_dir(identity_dir) else {
        return Vec::new();
    };

    read_dir
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| {
            let slug = e.file_name().to_string_lossy().to_string();
            let workflow_path = e.path().join("workflow.yaml");
            let contents = std::fs::read_to_string(&workflow_path).ok()?;
            let workflow = workflow::codec::parse(&contents).ok()?;
            if workflow.id == current_id {
                None
            } else {
                Some(slug)
            }
        })
        .collect()
}

fn atomic_write(final_path: &Path, contents: &str) -> std::io::Result<()> {
    let dir = final_path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(final_path).map_err(|e| e.error)?;
    Ok(())
}

fn mtime_of(path: &Path) -> Option<DateTime<Utc>> {
    let metadata = std::fs::metadata(path).ok()?;
    let modified: SystemTime = metadata.modified().ok()?;
    Some(DateTime::<Utc>::from(modified))
}

fn identity_path_of(root_path: &Path, workflow_file: &Path) -> String {
    workflow_file
        .parent()
        .and_then(|slug_dir| slug_dir.parent())
        .and_then(|identity_dir| identity_dir.strip_prefix(root_path).ok())
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default()
}

fn walk_workflow_files(root: &Path) -> Vec<PathBuf> {
    ignore::WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(false)
        .build()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name() == "workflow.yaml")
        .map(|e| e.path().to_path_buf())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::model::Step;
    use std::process::Command;
    use tempfile::TempDir;

    fn init_repo() -> (TempDir, WorkflowStore) {
        let dir = TempDir::new().unwrap();
        let git = GitGateway::new(dir.path());
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

    fn sample_workflow(title: &str) -> Workflow {
        Workflow {
            steps: vec![Step {
                name: "Ping".into(),
                command: "echo hi".into(),
                ..Default::default()
            }],
            ..Workflow::new(title)
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let (_dir, store) = init_repo();
        let options = SaveOptions::authored("platform/chaz");
        let saved = store
            .save(sample_workflow("Restart Service Safely"), &options)
            .unwrap();
        assert_eq!(
            saved.path,
            "workflows/platform/chaz/restart-service-safely/workflow.yaml"
        );

        let loaded = store.load(&LoadRef::by_path(&saved.path)).unwrap();
        assert_eq!(loaded.id, saved.id);
        assert_eq!(loaded.title, "Restart Service Safely");
        assert_eq!(loaded.steps.len(), 1);
    }

    #[test]
    fn slug_collision_gets_numeric_suffix() {
        let (_dir, store) = init_repo();
        let options = SaveOptions::authored("platform/chaz");
        let first = store.save(sample_workflow("Deploy!"), &options).unwrap();
        let second = store.save(sample_workflow("Deploy!"), &options).unwrap();
        assert_eq!(first.slug, "deploy");
        assert_eq!(second.slug, "deploy-1");
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn resaving_same_id_keeps_slug() {
        let (_dir, store) = init_repo();
        let options = SaveOptions::authored("platform/chaz");
        let saved = store.save(sample_workflow("Deploy!"), &options).unwrap();

        let mut reloaded = store.load(&LoadRef::by_path(&saved.path)).unwrap();
        reloaded.description = "updated".into();
        let resaved = store.save(reloaded, &options).unwrap();
        assert_eq!(resaved.slug, "deploy");
        assert_eq!(resaved.id, saved.id);
    }

    #[test]
    fn drafts_default_to_no_commit() {
        let (dir, store) = init_repo();
        let options = SaveOptions::drafts("me");
        store.save(sample_workflow("Scratch"), &options).unwrap();
        let status = GitGateway::new(dir.path()).status().unwrap();
        assert!(status.dirty);
    }

    #[test]
    fn list_filters_by_tag_intersection() {
        let (_dir, store) = init_repo();
        let mut tagged = sample_workflow("Tagged");
        tagged.tags = vec!["ops".into(), "prod".into()];
        store.save(tagged, &SaveOptions::authored("me")).unwrap();
        store
            .save(sample_workflow("Untagged"), &SaveOptions::authored("me"))
            .unwrap();

        let filter = ListFilter {
            identity_path: None,
            tags: vec!["ops".into()],
        };
        let refs = store.list(&filter).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].slug, "tagged");
    }

    #[test]
    fn save_rejects_identity_path_that_escapes_the_repo() {
        let (_dir, store) = init_repo();
        let options = SaveOptions::authored("../../escape");
        let err = store.save(sample_workflow("Deploy"), &options).unwrap_err();
        assert!(matches!(err, StoreError::UnsafePath(_)));
    }

    #[test]
    fn load_rejects_absolute_path() {
        let (_dir, store) = init_repo();
        let err = store
            .load(&LoadRef::by_path("/etc/passwd"))
            .unwrap_err();
        assert!(matches!(err, StoreError::UnsafePath(_)));
    }
}
