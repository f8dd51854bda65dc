use async_trait::async_trait;
use ethers::abi::Token;
use ethers::prelude::abigen;
use ethers::types::Address;
use teenet_types::Node;
use teenet_types::NodePk;
use tracing::info;

use crate::contract::confirm;
use crate::contract::Connection;
use crate::contract::LocalWallet;
use crate::decode::decode_node;
use crate::decode::encode_node;
use crate::error::RegistryError;

abigen!(NodeInfo, "$CARGO_MANIFEST_DIR/abis/NodeInfoABI.json");

/// Operations of the TEE node registry.
#[async_trait]
pub trait NodeRegistry: Send + Sync {
    async fn node_exists(
        &self,
        pk: NodePk,
    ) -> Result<bool, RegistryError>;

    /// `None` if no node is registered under `pk`.
    async fn get_node(
        &self,
        pk: NodePk,
    ) -> Result<Option<Node>, RegistryError>;

    async fn add_or_update(
        &self,
        signer: &LocalWallet,
        node: &Node,
    ) -> Result<(), RegistryError>;

    /// Fails with [`RegistryError::NotFound`] without submitting if the node
    /// is unknown.
    async fn remove(
        &self,
        signer: &LocalWallet,
        pk: NodePk,
    ) -> Result<(), RegistryError>;
}

/// [`NodeRegistry`] backed by the `NodeInfo` contract.
#[derive(Clone, Debug)]
pub struct EthNodeRegistry {
    connection: Connection,
    address: Address,
}

impl EthNodeRegistry {
    pub fn new(
        connection: Connection,
        address: Address,
    ) -> Self {
        Self {
            connection,
            address,
        }
    }
}

#[async_trait]
impl NodeRegistry for EthNodeRegistry {
    async fn node_exists(
        &self,
        pk: NodePk,
    ) -> Result<bool, RegistryError> {
        let contract = NodeInfo::new(self.address, self.connection.provider());
        Ok(contract
            .node_exists(pk.0)
            .call()
            .await?)
    }

    async fn get_node(
        &self,
        pk: NodePk,
    ) -> Result<Option<Node>, RegistryError> {
        if !self
            .node_exists(pk)
            .await?
        {
            return Ok(None);
        }
        let contract = NodeInfo::new(self.address, self.connection.provider());
        let token: Token = contract
            .method::<_, Token>("getNodeInfo", pk.0)
            .map_err(|e| RegistryError::Ledger(e.to_string()))?
            .call()
            .await?;
        Ok(Some(decode_node(token)?))
    }

    async fn add_or_update(
        &self,
        signer: &LocalWallet,
        node: &Node,
    ) -> Result<(), RegistryError> {
        let contract = NodeInfo::new(self.address, self.connection.client(signer));
        let call = contract
            .method::<_, ()>("addOrUpdate", (encode_node(node),))
            .map_err(|e| RegistryError::Ledger(e.to_string()))?;
        let receipt = confirm(call).await?;
        info!("node stored in tx {:#x}", receipt.transaction_hash);
        Ok(())
    }

    async fn remove(
        &self,
        signer: &LocalWallet,
        pk: NodePk,
    ) -> Result<(), RegistryError> {
        if !self
            .node_exists(pk)
            .await?
        {
            return Err(RegistryError::NotFound("Node"));
        }
        let contract = NodeInfo::new(self.address, self.connection.client(signer));
        let receipt = confirm(contract.remove(pk.0)).await?;
        info!("node removed in tx {:#x}", receipt.transaction_hash);
        Ok(())
    }
}
