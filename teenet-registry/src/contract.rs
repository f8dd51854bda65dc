use std::sync::Arc;

use ethers::abi::Detokenize;
use ethers::contract::ContractCall;
use ethers::middleware::SignerMiddleware;
use ethers::providers::Http;
use ethers::providers::Middleware;
use ethers::providers::Provider;
use ethers::signers::Signer;
use ethers::signers::Wallet;
use ethers::types::Address;
use ethers::types::TransactionReceipt;
use ethers::types::U256;
use ethers::types::U64;
use k256::ecdsa::SigningKey;
use tracing::debug;

use crate::error::RegistryError;

/// A signer backed by a private key held in memory.
pub type LocalWallet = Wallet<SigningKey>;

/// Provider able to sign and send transactions for one wallet.
pub type Client = SignerMiddleware<Arc<Provider<Http>>, LocalWallet>;

/// Shared access to the chain for every registry adapter.
#[derive(Clone, Debug)]
pub struct Connection {
    provider: Arc<Provider<Http>>,
    chain_id: u64,
}

impl Connection {
    pub fn new(
        rpc_url: &str,
        chain_id: u64,
    ) -> Result<Self, RegistryError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| RegistryError::Ledger(format!("invalid rpc url `{rpc_url}`: {e}")))?;
        Ok(Self {
            provider: Arc::new(provider),
            chain_id,
        })
    }

    pub fn provider(&self) -> Arc<Provider<Http>> {
        self.provider
            .clone()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Binds `signer` to the configured chain.
    pub fn client(
        &self,
        signer: &LocalWallet,
    ) -> Arc<Client> {
        let signer = signer
            .clone()
            .with_chain_id(self.chain_id);
        Arc::new(SignerMiddleware::new(self.provider(), signer))
    }

    /// Native currency balance of `address` at the latest block.
    pub async fn native_balance(
        &self,
        address: Address,
    ) -> Result<U256, RegistryError> {
        Ok(self
            .provider
            .get_balance(address, None)
            .await?)
    }
}

/// Sends `call` and waits until it is mined.
///
/// Success means a receipt with a non-failure status; a submitted but
/// unconfirmed transaction is never reported as done.
pub(crate) async fn confirm<M, D>(call: ContractCall<M, D>) -> Result<TransactionReceipt, RegistryError>
where
    M: Middleware + 'static,
    D: Detokenize,
{
    let pending = call
        .send()
        .await?;
    let tx_hash = pending.tx_hash();
    debug!("waiting for confirmation of {:#x}", tx_hash);

    let receipt = pending
        .await?
        .ok_or(RegistryError::Dropped(tx_hash))?;
    if receipt.status == Some(U64::zero()) {
        return Err(RegistryError::TxReverted(receipt.transaction_hash));
    }
    debug!(
        "{:#x} confirmed in block {:?}",
        receipt.transaction_hash, receipt.block_number
    );

    Ok(receipt)
}
