//! Project storage.
//!
//! [`FileProjectRepository`] keeps one pretty-printed `<id>.json` per project
//! in a flat directory. Every `put` rewrites the record wholesale through a
//! temp file and a rename, so readers never observe a half-written record.

use super::Project;
use crate::RepositoryError;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Storage for [`Project`] records.
pub trait ProjectRepository: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<Project>, RepositoryError>;

    /// Insert or replace.
    fn put(&self, project: &Project) -> Result<(), RepositoryError>;

    /// Returns whether a record was removed.
    fn delete(&self, id: &str) -> Result<bool, RepositoryError>;

    /// Projects newest first; only `owner`'s when given.
    fn list(&self, owner: Option<&str>) -> Result<Vec<Project>, RepositoryError>;
}

/// Flat directory of JSON records.
#[derive(Debug, Clone)]
pub struct FileProjectRepository {
    dir: PathBuf,
}

impl FileProjectRepository {
    /// Open (creating if needed) the store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &str) -> Result<PathBuf, RepositoryError> {
        validate_id(id)?;
        Ok(self.dir.join(format!("{id}.json")))
    }
}

/// Ids become file names, so only `[A-Za-z0-9_-]{1,64}` is accepted.
fn validate_id(id: &str) -> Result<(), RepositoryError> {
    let ok = !id.is_empty()
        && id.len() <= 64
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if ok {
        Ok(())
    } else {
        Err(RepositoryError::InvalidId(id.to_string()))
    }
}

impl ProjectRepository for FileProjectRepository {
    fn get(&self, id: &str) -> Result<Option<Project>, RepositoryError> {
        let path = self.record_path(id)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, project: &Project) -> Result<(), RepositoryError> {
        let path = self.record_path(&project.id)?;
        let json = serde_json::to_string_pretty(project)?;
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", project.id, Uuid::new_v4().simple()));
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        debug!("Saved project {} ({} bytes)", project.id, json.len());
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let path = self.record_path(id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, owner: Option<&str>) -> Result<Vec<Project>, RepositoryError> {
        let mut projects = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_record = path.extension().is_some_and(|ext| ext == "json")
                && !path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with('.'));
            if !is_record {
                continue;
            }
            let project: Project = match fs::read_to_string(&path)
                .map_err(RepositoryError::from)
                .and_then(|text| serde_json::from_str(&text).map_err(RepositoryError::from))
            {
                Ok(p) => p,
                Err(e) => {
                    warn!("Skipping unreadable project record {}: {e}", path.display());
                    continue;
                }
            };
            if owner.is_none_or(|o| project.is_owned_by(o)) {
                projects.push(project);
            }
        }
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn repo() -> (tempfile::TempDir, FileProjectRepository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileProjectRepository::open(dir.path().join("projects")).unwrap();
        (dir, repo)
    }

    #[test]
    fn round_trips_a_project() {
        let (_dir, repo) = repo();
        let mut project = Project::new("alice", None, "a countdown timer");
        project.files.insert("index.html", "<p>hi</p>");
        repo.put(&project).unwrap();

        let loaded = repo.get(&project.id).unwrap().unwrap();
        assert_eq!(loaded, project);

        let on_disk = fs::read_to_string(repo.dir().join(format!("{}.json", project.id))).unwrap();
        assert!(on_disk.contains("\n  \"id\""), "record is pretty-printed");
    }

    #[test]
    fn missing_project_is_none() {
        let (_dir, repo) = repo();
        assert!(repo.get("does-not-exist").unwrap().is_none());
        assert!(!repo.delete("does-not-exist").unwrap());
    }

    #[test]
    fn put_overwrites_wholesale() {
        let (_dir, repo) = repo();
        let mut project = Project::new("alice", None, "x");
        project.files.insert("a.html", "1");
        repo.put(&project).unwrap();
        project.files = crate::FileSet::new();
        project.files.insert("b.html", "2");
        repo.put(&project).unwrap();

        let loaded = repo.get(&project.id).unwrap().unwrap();
        assert!(!loaded.files.contains("a.html"));
        assert_eq!(loaded.files.get("b.html"), Some("2"));
        // No temp files left behind.
        let leftovers = fs::read_dir(repo.dir())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .ends_with(".tmp")
            })
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn lists_by_owner_newest_first() {
        let (_dir, repo) = repo();
        let mut older = Project::new("alice", None, "older");
        older.created_at -= Duration::minutes(5);
        let newer = Project::new("alice", None, "newer");
        let other = Project::new("bob", None, "bob's");
        for p in [&older, &newer, &other] {
            repo.put(p).unwrap();
        }

        let names: Vec<String> = repo
            .list(Some("alice"))
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["newer", "older"]);
        assert_eq!(repo.list(None).unwrap().len(), 3);
    }

    #[test]
    fn delete_removes_record() {
        let (_dir, repo) = repo();
        let project = Project::new("alice", None, "x");
        repo.put(&project).unwrap();
        assert!(repo.delete(&project.id).unwrap());
        assert!(repo.get(&project.id).unwrap().is_none());
    }

    #[test]
    fn corrupt_records_are_skipped_in_listing() {
        let (_dir, repo) = repo();
        repo.put(&Project::new("alice", None, "ok")).unwrap();
        fs::write(repo.dir().join("garbage.json"), "{not json").unwrap();
        assert_eq!(repo.list(Some("alice")).unwrap().len(), 1);
        assert!(matches!(
            repo.get("garbage"),
            Err(RepositoryError::Serialization(_))
        ));
    }

    #[test]
    fn path_like_ids_are_rejected() {
        let (_dir, repo) = repo();
        let long = "x".repeat(65);
        for bad in ["", "../x", "a/b", "a.json", long.as_str()] {
            assert!(
                matches!(repo.get(bad), Err(RepositoryError::InvalidId(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
