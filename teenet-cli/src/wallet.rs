use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use anyhow::anyhow;
use anyhow::Context;
use ethers::signers::Signer;
use ethers::signers::Wallet;
use ethers::types::Address;
use k256::ecdsa::SigningKey;
use redact::Secret;
use teenet_registry::LocalWallet;
use thiserror::Error;
use tracing::debug;

use crate::config::WalletConfig;
use crate::output::Output;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Wallet not found: {0}")]
    NotFound(String),

    #[error("Invalid private key at index {index}: {reason}")]
    InvalidKey { index: usize, reason: String },

    #[error("Failed to read private keys from {path}")]
    ReadKeys {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse private keys from {path}")]
    ParseKeys {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Signers available to the commands, addressable by index or address.
#[derive(Debug, Default)]
pub struct Wallets {
    wallets: Vec<LocalWallet>,
}

impl Wallets {
    /// Loads the private keys file, then appends the keystore wallet if one is
    /// configured.
    pub fn load(config: &WalletConfig) -> anyhow::Result<Self> {
        let path = Path::new(&config.private_keys_file);
        let mut wallets = if !config
            .private_keys_file
            .is_empty()
            && path.exists()
        {
            Self::from_keys_file(path)?
        } else {
            debug!("no private keys file at {}", path.display());
            Self::default()
        };

        if let Some(keystore) = &config.keystore {
            let password = read_password(
                config
                    .keystore_pwd
                    .as_ref(),
                "Input password for keystore: ",
            )?;
            let wallet = read_keystore(keystore, password.expose_secret())?;
            wallets
                .wallets
                .push(wallet);
        }

        if wallets
            .wallets
            .is_empty()
        {
            return Err(anyhow!(
                "no wallet configured, set wallet.private_keys_file or wallet.keystore"
            ));
        }
        Ok(wallets)
    }

    pub fn from_keys_file(path: &Path) -> Result<Self, WalletError> {
        let content = fs::read_to_string(path).map_err(|source| WalletError::ReadKeys {
            path: path.to_path_buf(),
            source,
        })?;
        let keys: Vec<String> =
            serde_json::from_str(&content).map_err(|source| WalletError::ParseKeys {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_keys(&keys)
    }

    pub fn from_keys(keys: &[String]) -> Result<Self, WalletError> {
        let wallets = keys
            .iter()
            .enumerate()
            .map(|(index, key)| {
                key.trim()
                    .parse::<LocalWallet>()
                    .map_err(|e| WalletError::InvalidKey {
                        index,
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { wallets })
    }

    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.wallets
            .iter()
            .map(|w| w.address())
    }

    /// Finds a wallet by position or by address, ignoring the address case.
    pub fn resolve(
        &self,
        addr_or_idx: &str,
    ) -> Result<&LocalWallet, WalletError> {
        let found = if let Ok(index) = addr_or_idx.parse::<usize>() {
            self.wallets
                .get(index)
        } else {
            addr_or_idx
                .parse::<Address>()
                .ok()
                .and_then(|addr| {
                    self.wallets
                        .iter()
                        .find(|w| w.address() == addr)
                })
        };
        found.ok_or_else(|| WalletError::NotFound(addr_or_idx.to_string()))
    }

    /// `wallet list`
    pub fn print(
        &self,
        out: &dyn Output,
    ) {
        for (idx, addr) in self
            .addresses()
            .enumerate()
        {
            out.log(&format!("[{idx}]: {addr:?}"));
        }
    }
}

/// Returns the configured password, or prompts for it.
pub fn read_password(
    configured: Option<&Secret<String>>,
    prompt_msg: &str,
) -> anyhow::Result<Secret<String>> {
    match configured {
        Some(password) if !password.expose_secret().is_empty() => Ok(password.clone()),
        _ => Ok(Secret::new(rpassword::prompt_password(prompt_msg)?)),
    }
}

/// Read the key-store from a file path with the specified password.
pub fn read_keystore<P: AsRef<Path>, S: AsRef<[u8]>>(
    key_path: P,
    password: S,
) -> anyhow::Result<LocalWallet> {
    let wallet = Wallet::<SigningKey>::decrypt_keystore(&key_path, password).with_context(|| {
        anyhow!(
            "trying to open `{}`",
            key_path
                .as_ref()
                .display()
        )
    })?;

    Ok(wallet)
}
