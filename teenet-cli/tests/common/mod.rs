#![allow(dead_code)]

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Mutex;

use async_trait::async_trait;
use ethers::signers::Signer;
use ethers::types::Address;
use ethers::types::H256;
use ethers::types::U256;
use teenet_registry::task::required_deposit;
use teenet_registry::LocalWallet;
use teenet_registry::RegistryError;
use teenet_registry::TaskRegistry;
use teenet_types::NodePk;
use teenet_types::Task;
use teenet_types::TaskId;

pub const KEYS: [&str; 3] = [
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
    "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
    "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a",
];

pub const BLOCK_TIME: u64 = 1_700_000_000;

pub fn wallet(idx: usize) -> LocalWallet {
    KEYS[idx]
        .parse()
        .unwrap()
}

pub fn bytes32(byte: u8) -> H256 {
    H256([byte; 32])
}

pub fn hex(byte: u8) -> String {
    format!("0x{}", format!("{byte:02x}").repeat(32))
}

pub fn write_json(
    dir: &Path,
    name: &str,
    value: &serde_json::Value,
) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
    path
}

#[derive(Default)]
struct Ledger {
    ids: Vec<TaskId>,
    tasks: BTreeMap<TaskId, Task>,
    node_lists: BTreeMap<TaskId, Vec<NodePk>>,
    node_owners: BTreeMap<NodePk, Address>,
    rewarded: BTreeSet<(TaskId, NodePk)>,
    deposits: BTreeMap<TaskId, U256>,
    native: BTreeMap<Address, U256>,
    rewards: BTreeMap<Address, U256>,
    block_time: u64,
}

/// In-memory task registry enforcing the rules of the `TaskMgr` contract.
pub struct FakeTaskRegistry {
    ledger: Mutex<Ledger>,
    calls: AtomicUsize,
    submitted: AtomicUsize,
}

impl Default for FakeTaskRegistry {
    fn default() -> Self {
        Self {
            ledger: Mutex::new(Ledger {
                block_time: BLOCK_TIME,
                ..Default::default()
            }),
            calls: AtomicUsize::new(0),
            submitted: AtomicUsize::new(0),
        }
    }
}

fn revert(reason: &str) -> RegistryError {
    RegistryError::Revert(reason.to_string())
}

impl FakeTaskRegistry {
    /// Registry calls of any kind.
    pub fn calls(&self) -> usize {
        self.calls
            .load(Ordering::SeqCst)
    }

    /// Transactions that reached the ledger.
    pub fn submitted(&self) -> usize {
        self.submitted
            .load(Ordering::SeqCst)
    }

    pub fn fund(
        &self,
        addr: Address,
        amount: U256,
    ) {
        self.ledger
            .lock()
            .unwrap()
            .native
            .insert(addr, amount);
    }

    pub fn native_balance(
        &self,
        addr: Address,
    ) -> U256 {
        self.ledger
            .lock()
            .unwrap()
            .native
            .get(&addr)
            .copied()
            .unwrap_or_default()
    }

    pub fn set_block_time(
        &self,
        time: u64,
    ) {
        self.ledger
            .lock()
            .unwrap()
            .block_time = time;
    }

    /// Stores `task` as if another client had created it.
    pub fn insert_task(
        &self,
        task: Task,
    ) {
        let mut ledger = self
            .ledger
            .lock()
            .unwrap();
        ledger
            .ids
            .push(task.id);
        ledger
            .node_lists
            .insert(task.id, Vec::new());
        ledger
            .deposits
            .insert(task.id, task.deposit().unwrap());
        ledger
            .tasks
            .insert(task.id, task);
    }

    /// Enrolls `pk` as if another client had joined.
    pub fn insert_join(
        &self,
        id: TaskId,
        pk: NodePk,
    ) {
        self.ledger
            .lock()
            .unwrap()
            .node_lists
            .entry(id)
            .or_default()
            .push(pk);
    }

    pub fn node_list(
        &self,
        id: TaskId,
    ) -> Vec<NodePk> {
        self.ledger
            .lock()
            .unwrap()
            .node_lists
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    fn call(&self) {
        self.calls
            .fetch_add(1, Ordering::SeqCst);
    }

    fn submit(&self) {
        self.submitted
            .fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TaskRegistry for FakeTaskRegistry {
    async fn task_exists(
        &self,
        id: TaskId,
    ) -> Result<bool, RegistryError> {
        self.call();
        Ok(self
            .ledger
            .lock()
            .unwrap()
            .tasks
            .contains_key(&id))
    }

    async fn get_task_ids(&self) -> Result<Vec<TaskId>, RegistryError> {
        self.call();
        Ok(self
            .ledger
            .lock()
            .unwrap()
            .ids
            .clone())
    }

    async fn get_task(
        &self,
        id: TaskId,
    ) -> Result<Task, RegistryError> {
        self.call();
        self.ledger
            .lock()
            .unwrap()
            .tasks
            .get(&id)
            .cloned()
            .ok_or_else(|| revert("Task does not exist"))
    }

    async fn get_node_list(
        &self,
        id: TaskId,
    ) -> Result<Option<Vec<NodePk>>, RegistryError> {
        self.call();
        Ok(self
            .ledger
            .lock()
            .unwrap()
            .node_lists
            .get(&id)
            .cloned())
    }

    async fn add_task(
        &self,
        signer: &LocalWallet,
        task: &Task,
    ) -> Result<(), RegistryError> {
        self.call();
        let sender = signer.address();
        let mut ledger = self
            .ledger
            .lock()
            .unwrap();
        let available = ledger
            .native
            .get(&sender)
            .copied()
            .unwrap_or_default();
        let deposit = required_deposit(task, available)?;

        self.submit();
        if task.id.is_zero() {
            return Err(revert("Invalid task id"));
        }
        if ledger
            .tasks
            .contains_key(&task.id)
        {
            return Err(revert("Task already exists"));
        }

        let mut stored = task.clone();
        if stored
            .owner
            .is_zero()
        {
            stored.owner = sender;
        }
        stored.start = U256::from(ledger.block_time);

        ledger
            .native
            .insert(sender, available - deposit);
        ledger
            .ids
            .push(stored.id);
        ledger
            .deposits
            .insert(stored.id, deposit);
        ledger
            .node_lists
            .insert(stored.id, Vec::new());
        ledger
            .tasks
            .insert(stored.id, stored);
        Ok(())
    }

    async fn join_task(
        &self,
        signer: &LocalWallet,
        id: TaskId,
        pk: NodePk,
    ) -> Result<(), RegistryError> {
        self.call();
        self.submit();
        let mut ledger = self
            .ledger
            .lock()
            .unwrap();
        let now = ledger.block_time;
        let task = ledger
            .tasks
            .get(&id)
            .cloned()
            .ok_or_else(|| revert("Task does not exist"))?;
        if task.is_expired(now) {
            return Err(revert("Task expired"));
        }
        let list = ledger
            .node_lists
            .entry(id)
            .or_default();
        if task.is_full(list.len()) {
            return Err(revert("Task is full"));
        }
        if list.contains(&pk) {
            return Err(revert("Node already joined"));
        }
        list.push(pk);
        ledger
            .node_owners
            .insert(pk, signer.address());
        Ok(())
    }

    async fn reward(
        &self,
        signer: &LocalWallet,
        id: TaskId,
        pks: &[NodePk],
    ) -> Result<(), RegistryError> {
        self.call();
        self.submit();
        let mut ledger = self
            .ledger
            .lock()
            .unwrap();
        let task = ledger
            .tasks
            .get(&id)
            .cloned()
            .ok_or_else(|| revert("Task does not exist"))?;
        if task.owner != signer.address() {
            return Err(revert("Only task owner"));
        }
        if !task.is_expired(ledger.block_time) {
            return Err(revert("Task not expired"));
        }
        for pk in pks {
            if !ledger
                .node_lists
                .get(&id)
                .is_some_and(|list| list.contains(pk))
            {
                return Err(revert("Node not in task"));
            }
            if ledger
                .rewarded
                .contains(&(id, *pk))
            {
                return Err(revert("Node already rewarded"));
            }
        }
        for pk in pks {
            ledger
                .rewarded
                .insert((id, *pk));
            let owner = ledger
                .node_owners
                .get(pk)
                .copied()
                .unwrap_or_default();
            *ledger
                .rewards
                .entry(owner)
                .or_default() += task.reward_per_node;
        }
        Ok(())
    }

    async fn balance(
        &self,
        addr: Address,
    ) -> Result<U256, RegistryError> {
        self.call();
        Ok(self
            .ledger
            .lock()
            .unwrap()
            .rewards
            .get(&addr)
            .copied()
            .unwrap_or_default())
    }

    async fn withdraw(
        &self,
        signer: &LocalWallet,
    ) -> Result<(), RegistryError> {
        self.call();
        self.submit();
        let mut ledger = self
            .ledger
            .lock()
            .unwrap();
        let amount = ledger
            .rewards
            .remove(&signer.address())
            .unwrap_or_default();
        if amount.is_zero() {
            return Err(revert("Nothing to withdraw"));
        }
        *ledger
            .native
            .entry(signer.address())
            .or_default() += amount;
        Ok(())
    }

    async fn deposit(
        &self,
        id: TaskId,
    ) -> Result<U256, RegistryError> {
        self.call();
        Ok(self
            .ledger
            .lock()
            .unwrap()
            .deposits
            .get(&id)
            .copied()
            .unwrap_or_default())
    }
}
