use async_trait::async_trait;
use ethers::abi::Token;
use ethers::prelude::abigen;
use ethers::types::Address;
use teenet_types::Code;
use teenet_types::CodeHash;
use tracing::info;

use crate::contract::confirm;
use crate::contract::Connection;
use crate::contract::LocalWallet;
use crate::decode::decode_code;
use crate::decode::encode_code;
use crate::error::RegistryError;

abigen!(CodeInfo, "$CARGO_MANIFEST_DIR/abis/CodeInfoABI.json");

/// Operations of the code registry. Tasks reference its entries by hash.
#[async_trait]
pub trait CodeRegistry: Send + Sync {
    async fn code_exists(
        &self,
        hash: CodeHash,
    ) -> Result<bool, RegistryError>;

    async fn get_code(
        &self,
        hash: CodeHash,
    ) -> Result<Option<Code>, RegistryError>;

    async fn add_or_update(
        &self,
        signer: &LocalWallet,
        code: &Code,
    ) -> Result<(), RegistryError>;

    async fn remove(
        &self,
        signer: &LocalWallet,
        hash: CodeHash,
    ) -> Result<(), RegistryError>;
}

/// [`CodeRegistry`] backed by the `CodeInfo` contract.
#[derive(Clone, Debug)]
pub struct EthCodeRegistry {
    connection: Connection,
    address: Address,
}

impl EthCodeRegistry {
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
impl CodeRegistry for EthCodeRegistry {
    async fn code_exists(
        &self,
        hash: CodeHash,
    ) -> Result<bool, RegistryError> {
        let contract = CodeInfo::new(self.address, self.connection.provider());
        Ok(contract
            .code_exists(hash.0)
            .call()
            .await?)
    }

    async fn get_code(
        &self,
        hash: CodeHash,
    ) -> Result<Option<Code>, RegistryError> {
        if !self
            .code_exists(hash)
            .await?
        {
            return Ok(None);
        }
        let contract = CodeInfo::new(self.address, self.connection.provider());
        let token: Token = contract
            .method::<_, Token>("getCode", hash.0)
            .map_err(|e| RegistryError::Ledger(e.to_string()))?
            .call()
            .await?;
        Ok(Some(decode_code(token)?))
    }

    async fn add_or_update(
        &self,
        signer: &LocalWallet,
        code: &Code,
    ) -> Result<(), RegistryError> {
        let contract = CodeInfo::new(self.address, self.connection.client(signer));
        let call = contract
            .method::<_, ()>("addOrUpdate", (encode_code(code),))
            .map_err(|e| RegistryError::Ledger(e.to_string()))?;
        let receipt = confirm(call).await?;
        info!("code stored in tx {:#x}", receipt.transaction_hash);
        Ok(())
    }

    async fn remove(
        &self,
        signer: &LocalWallet,
        hash: CodeHash,
    ) -> Result<(), RegistryError> {
        if !self
            .code_exists(hash)
            .await?
        {
            return Err(RegistryError::NotFound("Code"));
        }
        let contract = CodeInfo::new(self.address, self.connection.client(signer));
        let receipt = confirm(contract.remove(hash.0)).await?;
        info!("code removed in tx {:#x}", receipt.transaction_hash);
        Ok(())
    }
}
