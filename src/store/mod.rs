//! Persistence capability
//!
//! The orchestrator reads and updates tests, projects and runs through the
//! [`Store`] trait. Record updates take a mutation closure that runs under
//! the store's lock, so concurrent updates to one record never interleave.

mod json;

pub use json::JsonStore;

use std::path::PathBuf;
use thiserror::Error;

use crate::models::{Project, RunAggregate, TestCase};

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Entity persistence used by the orchestration engine
pub trait Store: Send + Sync {
    /// All registered tests, in registration order
    fn list_tests(&self) -> StoreResult<Vec<TestCase>>;

    fn get_test(&self, id: &str) -> StoreResult<Option<TestCase>>;

    fn insert_test(&self, test: TestCase) -> StoreResult<TestCase>;

    /// Look up a test by (project, name), inserting `draft` when absent
    ///
    /// Returns the stored record and whether it was created.
    fn find_or_create_test(&self, draft: TestCase) -> StoreResult<(TestCase, bool)>;

    /// Atomically apply `apply` to a test and return the updated record
    fn update_test(
        &self,
        id: &str,
        apply: &mut dyn FnMut(&mut TestCase),
    ) -> StoreResult<Option<TestCase>>;

    fn list_projects(&self) -> StoreResult<Vec<Project>>;

    fn get_project(&self, id: &str) -> StoreResult<Option<Project>>;

    fn insert_project(&self, project: Project) -> StoreResult<Project>;

    /// Atomically apply `apply` to a project and return the updated record
    fn update_project(
        &self,
        id: &str,
        apply: &mut dyn FnMut(&mut Project),
    ) -> StoreResult<Option<Project>>;

    /// Remove a project and its scoped tests
    fn delete_project(&self, id: &str) -> StoreResult<bool>;

    fn insert_run(&self, run: RunAggregate) -> StoreResult<()>;

    fn list_runs(&self) -> StoreResult<Vec<RunAggregate>>;

    fn get_run(&self, id: &str) -> StoreResult<Option<RunAggregate>>;
}
