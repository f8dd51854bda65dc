//! Task lifecycle commands.
//!
//! Every command validates its input and the cached view of the registry
//! before submitting anything. The registry stays authoritative: the local
//! checks only spare a doomed transaction, and after a confirmed mutation a
//! failure to patch the cache is reported as a warning, never as a failure.

use std::fs;
use std::path::Path;

use clap::ValueEnum;
use ethers::signers::Signer;
use ethers::types::Address;
use ethers::types::U256;
use serde::de::DeserializeOwned;
use teenet_registry::LocalWallet;
use teenet_registry::TaskRegistry;
use teenet_types::hex32;
use teenet_types::parse_bytes32;
use teenet_types::NodePk;
use teenet_types::RewardRequest;
use teenet_types::Task;
use teenet_types::TaskFile;
use teenet_types::TaskId;
use tracing::debug;
use tracing::warn;

use crate::cache::CacheDocument;
use crate::cache::TaskCache;
use crate::error::TaskError;
use crate::output::Output;

const UPDATE_HINT: &str = "Failed to update local task info. Run \"teenet task update\" to update";

/// Which cached tasks `task list` shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Expired,
}

impl StatusFilter {
    fn accepts(
        self,
        task: &Task,
        now: u64,
    ) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => !task.is_expired(now),
            StatusFilter::Expired => task.is_expired(now),
        }
    }
}

/// Coordinates the task registry and the task cache for one command.
pub struct TaskLifecycle<'a, R: ?Sized> {
    registry: &'a R,
    cache: &'a TaskCache,
    out: &'a dyn Output,
}

impl<'a, R: TaskRegistry + ?Sized> TaskLifecycle<'a, R> {
    pub fn new(
        registry: &'a R,
        cache: &'a TaskCache,
        out: &'a dyn Output,
    ) -> Self {
        Self {
            registry,
            cache,
            out,
        }
    }

    /// `task update`: replaces the cache with the registry's current state.
    pub async fn update(&self) -> Result<CacheDocument, TaskError> {
        let doc = self
            .cache
            .resync(self.registry)
            .await?;
        self.out
            .log("Updated local task info");
        Ok(doc)
    }

    /// `task add`: creates the task described in `file`.
    ///
    /// Returns the task as stored by the registry when it could be read back.
    pub async fn add(
        &self,
        signer: &LocalWallet,
        file: &Path,
    ) -> Result<Task, TaskError> {
        let input: TaskFile = read_json(file)?;
        let id = parse_id(&input.id)?;
        let task = input.into_task(id);

        self.registry
            .add_task(signer, &task)
            .await?;
        self.out
            .log("Added task info");

        // the registry assigns `start` and resolves a zero owner
        let canonical = match self
            .registry
            .get_task(id)
            .await
        {
            Ok(canonical) => canonical,
            Err(e) => {
                self.warn(&e);
                self.print_task(&task);
                return Ok(task);
            },
        };
        self.print_task(&canonical);

        if let Err(e) = self
            .cache
            .patch_after_add(canonical.clone())
        {
            self.warn(&e);
        }
        Ok(canonical)
    }

    /// `task join`: enrolls node `pk` in task `id`.
    pub async fn join(
        &self,
        signer: &LocalWallet,
        id: &str,
        pk: &str,
    ) -> Result<(), TaskError> {
        let id = parse_id(id)?;
        let pk = parse_pk(pk)?;

        let doc = self
            .cache
            .load()?;
        let task = doc
            .tasks
            .get(&id)
            .ok_or(TaskError::TaskNotFound(id))?;
        let joined = doc
            .node_list(&id)
            .len();
        if task.is_full(joined) {
            return Err(TaskError::TaskFull(id));
        }
        debug!("{} out of {} nodes joined", joined, task.max_node_num);

        self.registry
            .join_task(signer, id, pk)
            .await?;
        self.out
            .log(&format!("Joined task\nid={}\npk={}", hex32(&id), hex32(&pk)));

        if let Err(e) = self
            .cache
            .patch_after_join(id, pk)
        {
            self.warn(&e);
        }
        Ok(())
    }

    /// `task reward` with the request read from `file`.
    pub async fn reward(
        &self,
        signer: &LocalWallet,
        file: &Path,
    ) -> Result<(), TaskError> {
        let request: RewardRequest = read_json(file)?;
        self.reward_request(signer, &request)
            .await
    }

    /// Rewards the nodes of `request` once each has been found in the cached
    /// node list of the task.
    pub async fn reward_request(
        &self,
        signer: &LocalWallet,
        request: &RewardRequest,
    ) -> Result<(), TaskError> {
        let id = parse_id(&request.id)?;
        if request
            .pks
            .is_empty()
        {
            return Err(TaskError::EmptyPkList);
        }
        let pks = request
            .pks
            .iter()
            .map(|pk| parse_pk(pk))
            .collect::<Result<Vec<_>, _>>()?;

        let doc = self
            .cache
            .load()?;
        if !doc
            .tasks
            .contains_key(&id)
        {
            return Err(TaskError::TaskNotFound(id));
        }
        let enrolled = doc.node_list(&id);
        if let Some(missing) = pks
            .iter()
            .find(|pk| !enrolled.contains(*pk))
        {
            return Err(TaskError::PkNotInNodeList(*missing));
        }

        self.registry
            .reward(signer, id, &pks)
            .await?;
        let pks = pks
            .iter()
            .map(hex32)
            .collect::<Vec<_>>();
        self.out
            .log(&format!(
                "Reward distributed\nid={}\npks={}",
                hex32(&id),
                pks.join(",")
            ));
        Ok(())
    }

    /// `task balance`
    pub async fn balance(
        &self,
        addr: Address,
    ) -> Result<U256, TaskError> {
        let balance = self
            .registry
            .balance(addr)
            .await?;
        self.out
            .log(&format!("Withdraw balance\nAddress: {addr:?}\nBalance: {balance}"));
        Ok(balance)
    }

    /// `task withdraw`
    pub async fn withdraw(
        &self,
        signer: &LocalWallet,
    ) -> Result<(), TaskError> {
        self.registry
            .withdraw(signer)
            .await?;
        self.out
            .log(&format!("Withdraw done\nAddress: {:?}", signer.address()));
        Ok(())
    }

    /// `task deposit`: reads the deposit locked for `id` from the registry.
    pub async fn deposit(
        &self,
        id: &str,
    ) -> Result<U256, TaskError> {
        let id = parse_id(id)?;
        let deposit = self
            .registry
            .deposit(id)
            .await?;
        self.out
            .log(&format!("Deposit\nid={}\nValue: {deposit}", hex32(&id)));
        Ok(deposit)
    }

    /// `task list`: one line per cached task accepted by `filter` at `now`.
    pub fn list(
        &self,
        filter: StatusFilter,
        now: u64,
    ) -> Result<usize, TaskError> {
        let doc = self
            .cache
            .load()?;
        if doc
            .tasks
            .is_empty()
        {
            return Err(TaskError::EmptyTaskList);
        }

        let mut count = 0;
        for (id, task) in doc
            .tasks
            .iter()
            .filter(|(_, task)| filter.accepts(task, now))
        {
            self.out
                .log(&format!(
                    "[{count}]: {}, {}, {}, {} out of {}",
                    hex32(id),
                    task.reward_per_node,
                    expiry(task),
                    doc.node_list(id)
                        .len(),
                    task.max_node_num
                ));
            count += 1;
        }
        Ok(count)
    }

    /// `task get`: details and node list of a cached task.
    pub fn get(
        &self,
        id: &str,
    ) -> Result<Task, TaskError> {
        let id = parse_id(id)?;
        let doc = self
            .cache
            .load()?;
        let task = doc
            .tasks
            .get(&id)
            .ok_or(TaskError::TaskNotFound(id))?;

        self.print_task(task);
        self.out
            .log(&node_list(doc.node_list(&id)));
        Ok(task.clone())
    }

    fn print_task(
        &self,
        task: &Task,
    ) {
        self.out
            .log(&format!(
                "ID: {}\nOwned by: {:?}\nReward per node: {}\nStart time: {}\nNumber of days: {}\nMaximum number of TEE nodes: {}\nCode hash: {}\nExpires at: {}",
                hex32(&task.id),
                task.owner,
                task.reward_per_node,
                task.start,
                task.num_days,
                task.max_node_num,
                hex32(&task.code_hash),
                expiry(task),
            ));
    }

    fn warn(
        &self,
        err: &dyn std::error::Error,
    ) {
        warn!("cache left behind the registry: {err}");
        self.out
            .err(&format!("{UPDATE_HINT}\n{err}"));
    }
}

/// Reads a JSON input file given on the command line.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, TaskError> {
    let content = fs::read_to_string(path).map_err(|source| TaskError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| TaskError::ParseFile {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_id(id: &str) -> Result<TaskId, TaskError> {
    parse_bytes32(id).ok_or_else(|| TaskError::InvalidId(id.to_string()))
}

fn parse_pk(pk: &str) -> Result<NodePk, TaskError> {
    parse_bytes32(pk).ok_or_else(|| TaskError::InvalidPk(pk.to_string()))
}

/// Expiry date of `task`, or `out of range` when it is not a calendar date.
fn expiry(task: &Task) -> String {
    task.expiry_date()
        .map(|date| {
            date.format("%Y-%m-%d %H:%M:%S UTC")
                .to_string()
        })
        .unwrap_or_else(|| "out of range".to_string())
}

fn node_list(pks: &[NodePk]) -> String {
    if pks.is_empty() {
        return "Node list: []".to_string();
    }
    let mut msg = "Node list:".to_string();
    for (idx, pk) in pks
        .iter()
        .enumerate()
    {
        msg.push_str(&format!("\n  [{idx}]: {}", hex32(pk)));
    }
    msg
}
