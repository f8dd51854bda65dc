use async_trait::async_trait;
use ethers::abi::Token;
use ethers::prelude::abigen;
use ethers::providers::Http;
use ethers::providers::Provider;
use ethers::signers::Signer;
use ethers::types::Address;
use ethers::types::U256;
use teenet_types::hex32;
use teenet_types::NodePk;
use teenet_types::Task;
use teenet_types::TaskId;
use tracing::debug;
use tracing::info;
use tracing::instrument;

use crate::contract::confirm;
use crate::contract::Client;
use crate::contract::Connection;
use crate::contract::LocalWallet;
use crate::decode::decode_bytes32_list;
use crate::decode::decode_task;
use crate::decode::encode_task;
use crate::error::RegistryError;

abigen!(TaskMgr, "$CARGO_MANIFEST_DIR/abis/TaskMgrABI.json");

/// Operations of the task registry.
///
/// Implementations perform no retries and keep no state: every call is one
/// read or one confirmed transaction.
#[async_trait]
pub trait TaskRegistry: Send + Sync {
    async fn task_exists(
        &self,
        id: TaskId,
    ) -> Result<bool, RegistryError>;

    /// All task ids, in registry insertion order.
    async fn get_task_ids(&self) -> Result<Vec<TaskId>, RegistryError>;

    async fn get_task(
        &self,
        id: TaskId,
    ) -> Result<Task, RegistryError>;

    /// Enrolled nodes in join order, `None` if the task does not exist.
    async fn get_node_list(
        &self,
        id: TaskId,
    ) -> Result<Option<Vec<NodePk>>, RegistryError>;

    /// Creates `task`, attaching `rewardPerNode * maxNodeNum` as deposit.
    async fn add_task(
        &self,
        signer: &LocalWallet,
        task: &Task,
    ) -> Result<(), RegistryError>;

    async fn join_task(
        &self,
        signer: &LocalWallet,
        id: TaskId,
        pk: NodePk,
    ) -> Result<(), RegistryError>;

    async fn reward(
        &self,
        signer: &LocalWallet,
        id: TaskId,
        pks: &[NodePk],
    ) -> Result<(), RegistryError>;

    /// Withdrawable reward balance of `addr`.
    async fn balance(
        &self,
        addr: Address,
    ) -> Result<U256, RegistryError>;

    async fn withdraw(
        &self,
        signer: &LocalWallet,
    ) -> Result<(), RegistryError>;

    /// Deposit locked for task `id`.
    async fn deposit(
        &self,
        id: TaskId,
    ) -> Result<U256, RegistryError>;
}

/// Deposit to attach to `task`, provided `available` covers it.
pub fn required_deposit(
    task: &Task,
    available: U256,
) -> Result<U256, RegistryError> {
    let required = task
        .deposit()
        .ok_or(RegistryError::DepositOverflow)?;
    if available < required {
        return Err(RegistryError::InsufficientBalance {
            required,
            available,
        });
    }
    Ok(required)
}

/// [`TaskRegistry`] backed by the `TaskMgr` contract.
#[derive(Clone, Debug)]
pub struct EthTaskRegistry {
    connection: Connection,
    address: Address,
}

impl EthTaskRegistry {
    pub fn new(
        connection: Connection,
        address: Address,
    ) -> Self {
        Self {
            connection,
            address,
        }
    }

    fn reader(&self) -> TaskMgr<Provider<Http>> {
        TaskMgr::new(self.address, self.connection.provider())
    }

    fn writer(
        &self,
        signer: &LocalWallet,
    ) -> TaskMgr<Client> {
        TaskMgr::new(self.address, self.connection.client(signer))
    }
}

#[async_trait]
impl TaskRegistry for EthTaskRegistry {
    async fn task_exists(
        &self,
        id: TaskId,
    ) -> Result<bool, RegistryError> {
        Ok(self
            .reader()
            .task_exists(id.0)
            .call()
            .await?)
    }

    async fn get_task_ids(&self) -> Result<Vec<TaskId>, RegistryError> {
        let ids = self
            .reader()
            .get_task_ids()
            .call()
            .await?;
        Ok(decode_bytes32_list(ids))
    }

    async fn get_task(
        &self,
        id: TaskId,
    ) -> Result<Task, RegistryError> {
        let token: Token = self
            .reader()
            .method::<_, Token>("getTask", id.0)
            .map_err(|e| RegistryError::Ledger(e.to_string()))?
            .call()
            .await?;
        Ok(decode_task(token)?)
    }

    async fn get_node_list(
        &self,
        id: TaskId,
    ) -> Result<Option<Vec<NodePk>>, RegistryError> {
        let contract = self.reader();
        if !contract
            .task_exists(id.0)
            .call()
            .await?
        {
            return Ok(None);
        }
        let pks = contract
            .get_node_list(id.0)
            .call()
            .await?;
        Ok(Some(decode_bytes32_list(pks)))
    }

    #[instrument(skip_all, fields(id = %hex32(&task.id)))]
    async fn add_task(
        &self,
        signer: &LocalWallet,
        task: &Task,
    ) -> Result<(), RegistryError> {
        let available = self
            .connection
            .native_balance(signer.address())
            .await?;
        let deposit = required_deposit(task, available)?;
        debug!("deposit = {}, balance = {}", deposit, available);

        let call = self
            .writer(signer)
            .method::<_, ()>("add", (encode_task(task),))
            .map_err(|e| RegistryError::Ledger(e.to_string()))?
            .value(deposit);
        let receipt = confirm(call).await?;
        info!("task added in tx {:#x}", receipt.transaction_hash);

        Ok(())
    }

    #[instrument(skip_all, fields(id = %hex32(&id), pk = %hex32(&pk)))]
    async fn join_task(
        &self,
        signer: &LocalWallet,
        id: TaskId,
        pk: NodePk,
    ) -> Result<(), RegistryError> {
        let receipt = confirm(self.writer(signer).join(id.0, pk.0)).await?;
        info!("joined in tx {:#x}", receipt.transaction_hash);
        Ok(())
    }

    #[instrument(skip_all, fields(id = %hex32(&id), nodes = pks.len()))]
    async fn reward(
        &self,
        signer: &LocalWallet,
        id: TaskId,
        pks: &[NodePk],
    ) -> Result<(), RegistryError> {
        let pks = pks
            .iter()
            .map(|pk| pk.0)
            .collect();
        let receipt = confirm(self.writer(signer).reward(id.0, pks)).await?;
        info!("rewarded in tx {:#x}", receipt.transaction_hash);
        Ok(())
    }

    async fn balance(
        &self,
        addr: Address,
    ) -> Result<U256, RegistryError> {
        Ok(self
            .reader()
            .balance(addr)
            .call()
            .await?)
    }

    #[instrument(skip_all, fields(signer = ?signer.address()))]
    async fn withdraw(
        &self,
        signer: &LocalWallet,
    ) -> Result<(), RegistryError> {
        let receipt = confirm(self.writer(signer).withdraw()).await?;
        info!("withdrawn in tx {:#x}", receipt.transaction_hash);
        Ok(())
    }

    async fn deposit(
        &self,
        id: TaskId,
    ) -> Result<U256, RegistryError> {
        Ok(self
            .reader()
            .deposit(id.0)
            .call()
            .await?)
    }
}
