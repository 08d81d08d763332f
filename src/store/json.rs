//! JSON registry store
//!
//! Keeps the whole registry in memory behind a mutex and, when backed by a
//! file, rewrites it after every mutation.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use super::{Store, StoreError, StoreResult};
use crate::models::{Project, RunAggregate, TestCase};

/// Serialized registry contents
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct Registry {
    #[serde(default)]
    tests: Vec<TestCase>,
    #[serde(default)]
    projects: Vec<Project>,
    #[serde(default)]
    runs: Vec<RunAggregate>,
}

/// Store over a JSON document
pub struct JsonStore {
    state: Mutex<Registry>,
    path: Option<PathBuf>,
}

impl JsonStore {
    /// Store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(Registry::default()),
            path: None,
        }
    }

    /// Open a file-backed store, starting empty if the file does not exist
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let registry = if path.exists() {
            let file = File::open(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            let registry: Registry = serde_json::from_reader(BufReader::new(file))?;
            debug!(
                "Loaded registry from {} ({} tests, {} projects, {} runs)",
                path.display(),
                registry.tests.len(),
                registry.projects.len(),
                registry.runs.len()
            );
            registry
        } else {
            info!("Creating new registry at {}", path.display());
            Registry::default()
        };

        Ok(Self {
            state: Mutex::new(registry),
            path: Some(path),
        })
    }

    /// Default registry location under the data directory
    pub fn default_path(data_dir: Option<&str>) -> PathBuf {
        let base = match data_dir {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("risk-orchestrator"),
        };
        base.join("registry.json")
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Registry>> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }

    fn read<T>(&self, f: impl FnOnce(&Registry) -> T) -> StoreResult<T> {
        let guard = self.lock()?;
        Ok(f(&guard))
    }

    /// Apply a mutation and flush while still holding the lock
    fn write<T>(&self, f: impl FnOnce(&mut Registry) -> T) -> StoreResult<T> {
        let mut guard = self.lock()?;
        let out = f(&mut guard);
        self.flush(&guard)?;
        Ok(out)
    }

    fn flush(&self, registry: &Registry) -> StoreResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let tmp = path.with_extension("json.tmp");
        let file = File::create(&tmp).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, registry)?;
        writer.flush().map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;
        Ok(())
    }
}

impl Store for JsonStore {
    fn list_tests(&self) -> StoreResult<Vec<TestCase>> {
        self.read(|r| r.tests.clone())
    }

    fn get_test(&self, id: &str) -> StoreResult<Option<TestCase>> {
        self.read(|r| r.tests.iter().find(|t| t.id == id).cloned())
    }

    fn insert_test(&self, test: TestCase) -> StoreResult<TestCase> {
        self.write(|r| {
            r.tests.push(test.clone());
            test
        })
    }

    fn find_or_create_test(&self, draft: TestCase) -> StoreResult<(TestCase, bool)> {
        {
            let guard = self.lock()?;
            let existing = guard
                .tests
                .iter()
                .find(|t| t.project_id == draft.project_id && t.test_name == draft.test_name);
            if let Some(test) = existing {
                return Ok((test.clone(), false));
            }
        }

        // Re-check under the write lock so two discoveries cannot both insert
        self.write(|r| {
            if let Some(test) = r
                .tests
                .iter()
                .find(|t| t.project_id == draft.project_id && t.test_name == draft.test_name)
            {
                return (test.clone(), false);
            }
            r.tests.push(draft.clone());
            (draft, true)
        })
    }

    fn update_test(
        &self,
        id: &str,
        apply: &mut dyn FnMut(&mut TestCase),
    ) -> StoreResult<Option<TestCase>> {
        let mut guard = self.lock()?;
        let Some(test) = guard.tests.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        apply(test);
        let updated = test.clone();
        self.flush(&guard)?;
        Ok(Some(updated))
    }

    fn list_projects(&self) -> StoreResult<Vec<Project>> {
        self.read(|r| r.projects.clone())
    }

    fn get_project(&self, id: &str) -> StoreResult<Option<Project>> {
        self.read(|r| r.projects.iter().find(|p| p.id == id).cloned())
    }

    fn insert_project(&self, project: Project) -> StoreResult<Project> {
        self.write(|r| {
            r.projects.push(project.clone());
            project
        })
    }

    fn update_project(
        &self,
        id: &str,
        apply: &mut dyn FnMut(&mut Project),
    ) -> StoreResult<Option<Project>> {
        let mut guard = self.lock()?;
        let Some(project) = guard.projects.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        apply(project);
        let updated = project.clone();
        self.flush(&guard)?;
        Ok(Some(updated))
    }

    fn delete_project(&self, id: &str) -> StoreResult<bool> {
        self.write(|r| {
            let before = r.projects.len();
            r.projects.retain(|p| p.id != id);
            if r.projects.len() == before {
                return false;
            }
            r.tests.retain(|t| !t.belongs_to(id));
            true
        })
    }

    fn insert_run(&self, run: RunAggregate) -> StoreResult<()> {
        self.write(|r| r.runs.push(run))
    }

    fn list_runs(&self) -> StoreResult<Vec<RunAggregate>> {
        self.read(|r| r.runs.clone())
    }

    fn get_run(&self, id: &str) -> StoreResult<Option<RunAggregate>> {
        self.read(|r| r.runs.iter().find(|run| run.id == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learning::{self, Observation};
    use crate::models::TestStatus;
    use tempfile::tempdir;

    #[test]
    fn test_in_memory_roundtrip() {
        let store = JsonStore::in_memory();
        let test = store
            .insert_test(TestCase::new("Login Authentication", "tests/login.js", 8.5))
            .unwrap();

        assert_eq!(store.list_tests().unwrap().len(), 1);
        assert_eq!(store.get_test(&test.id).unwrap(), Some(test));
        assert!(store.get_test("missing").unwrap().is_none());
        assert!(store.path().is_none());
    }

    #[test]
    fn test_file_store_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("registry.json");

        let store = JsonStore::open(&path).unwrap();
        let project = store.insert_project(Project::new("shop")).unwrap();
        store
            .insert_test(TestCase::new("Checkout Flow", "tests/checkout.js", 7.8))
            .unwrap();
        drop(store);

        let reopened = JsonStore::open(&path).unwrap();
        assert_eq!(reopened.list_tests().unwrap().len(), 1);
        assert_eq!(reopened.get_project(&project.id).unwrap().unwrap().name, "shop");
    }

    #[test]
    fn test_find_or_create_is_idempotent() {
        let store = JsonStore::in_memory();
        let draft = || TestCase::new("API Security Scans", "tests/security.js", 8.5).in_project("proj_1");

        let (first, created) = store.find_or_create_test(draft()).unwrap();
        assert!(created);
        let (second, created) = store.find_or_create_test(draft()).unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);

        // Same name in another project is a distinct test
        let other = TestCase::new("API Security Scans", "tests/security.js", 8.5).in_project("proj_2");
        let (_, created) = store.find_or_create_test(other).unwrap();
        assert!(created);
        assert_eq!(store.list_tests().unwrap().len(), 2);
    }

    #[test]
    fn test_update_missing_test() {
        let store = JsonStore::in_memory();
        let updated = store.update_test("nope", &mut |_| {}).unwrap();
        assert!(updated.is_none());
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let store = JsonStore::in_memory();
        let test = store
            .insert_test(TestCase::new("Payment Gateway", "tests/payment.js", 9.2))
            .unwrap();

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let store = &store;
                let id = test.id.clone();
                scope.spawn(move || {
                    for i in 0..50 {
                        let status = TestStatus::from_outcome((worker + i) % 4 != 0);
                        store
                            .update_test(&id, &mut |t| {
                                learning::update(t, Observation::new(status, 10, 9.2))
                            })
                            .unwrap();
                    }
                });
            }
        });

        let test = store.get_test(&test.id).unwrap().unwrap();
        assert_eq!(test.learning.total_runs(), 400);
        assert_eq!(test.learning.total_failures(), 100);
    }

    #[test]
    fn test_delete_project_cascades() {
        let store = JsonStore::in_memory();
        let project = store.insert_project(Project::new("shop")).unwrap();
        store
            .insert_test(TestCase::new("Scoped", "a.js", 1.0).in_project(&project.id))
            .unwrap();
        store.insert_test(TestCase::new("Global", "b.js", 1.0)).unwrap();

        assert!(store.delete_project(&project.id).unwrap());
        assert!(!store.delete_project(&project.id).unwrap());

        let remaining = store.list_tests().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].test_name, "Global");
    }

    #[test]
    fn test_default_path() {
        let path = JsonStore::default_path(Some("/tmp/orch"));
        assert_eq!(path, PathBuf::from("/tmp/orch/registry.json"));
    }
}
