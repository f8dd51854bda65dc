//! Local mirror of the task registry.
//!
//! The cache has no authority: it is replaced wholesale by [`TaskCache::resync`]
//! and only patched additively after a confirmed `add` or `join`. Anything it
//! says may be stale until the next `task update`.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use serde_derive::Deserialize;
use serde_derive::Serialize;
use teenet_registry::RegistryError;
use teenet_registry::TaskRegistry;
use teenet_types::hex32;
use teenet_types::NodePk;
use teenet_types::Task;
use teenet_types::TaskId;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;
use tracing::info;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Local task info not found at {0}. Run \"teenet task update\" to update")]
    NotFound(PathBuf),

    #[error("Failed to parse task info at {path}. Run \"teenet task update\" to update")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to access task info at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to update local task info: {0}")]
    Registry(#[from] RegistryError),
}

/// On-disk shape of the cache.
///
/// Maps are ordered by id so that the same registry state always serialises to
/// the same bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheDocument {
    #[serde(default)]
    pub tasks: BTreeMap<TaskId, Task>,
    #[serde(default)]
    pub node_lists: BTreeMap<TaskId, Vec<NodePk>>,
}

impl CacheDocument {
    /// Enrolled nodes of `id`, empty when none are cached.
    pub fn node_list(
        &self,
        id: &TaskId,
    ) -> &[NodePk] {
        self.node_lists
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// The task cache file.
#[derive(Clone, Debug)]
pub struct TaskCache {
    path: PathBuf,
}

impl TaskCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path
            .is_file()
    }

    pub fn load(&self) -> Result<CacheDocument, CacheError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CacheError::NotFound(
                    self.path
                        .clone(),
                ))
            },
            Err(source) => {
                return Err(CacheError::Io {
                    path: self
                        .path
                        .clone(),
                    source,
                })
            },
        };
        serde_json::from_str(&content).map_err(|source| CacheError::Malformed {
            path: self
                .path
                .clone(),
            source,
        })
    }

    /// Replaces the file atomically: the document goes to a sibling temporary
    /// file which is then renamed over the cache.
    pub fn save(
        &self,
        doc: &CacheDocument,
    ) -> Result<(), CacheError> {
        let io_err = |source| CacheError::Io {
            path: self
                .path
                .clone(),
            source,
        };

        let dir = match self
            .path
            .parent()
        {
            Some(dir) if !dir
                .as_os_str()
                .is_empty() =>
            {
                dir
            },
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(io_err)?;

        let mut bytes = serde_json::to_vec_pretty(doc).map_err(|e| io_err(e.into()))?;
        bytes.push(b'\n');

        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(&bytes)
            .map_err(io_err)?;
        tmp.as_file()
            .sync_all()
            .map_err(io_err)?;
        tmp.persist(&self.path)
            .map_err(|e| io_err(e.error))?;

        debug!("saved {} tasks to {}", doc.tasks.len(), self.path.display());
        Ok(())
    }

    /// Rebuilds the whole cache from the registry. Tasks the registry no longer
    /// reports are dropped.
    pub async fn resync<R: TaskRegistry + ?Sized>(
        &self,
        registry: &R,
    ) -> Result<CacheDocument, CacheError> {
        let mut doc = CacheDocument::default();
        for id in registry
            .get_task_ids()
            .await?
        {
            let task = registry
                .get_task(id)
                .await?;
            let nodes = registry
                .get_node_list(id)
                .await?
                .unwrap_or_default();
            doc.node_lists
                .insert(task.id, nodes);
            doc.tasks
                .insert(task.id, task);
        }
        self.save(&doc)?;
        info!("resynced {} tasks", doc.tasks.len());
        Ok(doc)
    }

    /// Records a freshly created task. A missing cache starts empty.
    pub fn patch_after_add(
        &self,
        task: Task,
    ) -> Result<(), CacheError> {
        let mut doc = match self.load() {
            Ok(doc) => doc,
            Err(CacheError::NotFound(_)) => CacheDocument::default(),
            Err(e) => return Err(e),
        };
        doc.node_lists
            .entry(task.id)
            .or_default();
        doc.tasks
            .insert(task.id, task);
        self.save(&doc)
    }

    /// Appends `pk` to the cached node list of `id`.
    pub fn patch_after_join(
        &self,
        id: TaskId,
        pk: NodePk,
    ) -> Result<(), CacheError> {
        let mut doc = self.load()?;
        doc.node_lists
            .entry(id)
            .or_default()
            .push(pk);
        debug!("cached join of {} to {}", hex32(&pk), hex32(&id));
        self.save(&doc)
    }
}
