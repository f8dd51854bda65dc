use std::io;
use std::path::PathBuf;

use teenet_registry::RegistryError;
use teenet_types::hex32;
use teenet_types::NodePk;
use teenet_types::TaskId;
use thiserror::Error;

use crate::cache::CacheError;

/// Failure of a task command.
///
/// Validation and local state variants are raised before anything is sent to
/// the registry; [`TaskError::Registry`] is what the registry answered.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Invalid task id\nid={0}")]
    InvalidId(String),

    #[error("Invalid tee public key\npk={0}")]
    InvalidPk(String),

    #[error("No TEE nodes to reward")]
    EmptyPkList,

    #[error("Failed to read {path}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse {path}")]
    ParseFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Local task info not found. Run \"teenet task update\" to update")]
    CacheNotFound,

    #[error(transparent)]
    Cache(CacheError),

    #[error("Task not found locally. Run \"teenet task update\" to update\nid={}", hex32(.0))]
    TaskNotFound(TaskId),

    #[error("Task is full\nid={}", hex32(.0))]
    TaskFull(TaskId),

    #[error("Public key not found in node list\npk={}", hex32(.0))]
    PkNotInNodeList(NodePk),

    #[error("No task found locally. Run \"teenet task update\" to update")]
    EmptyTaskList,

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl From<CacheError> for TaskError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::NotFound(_) => Self::CacheNotFound,
            CacheError::Registry(e) => Self::Registry(e),
            other => Self::Cache(other),
        }
    }
}
