use std::path::PathBuf;

use anyhow::bail;
use anyhow::Context;
use config::FileFormat;
use ethers::types::Address;
use lazy_static_include::*;
use redact::Secret;
use serde_derive::Deserialize;
use tracing::debug;
use url::Url;

lazy_static_include_str! {
    DEFAULT_CONFIG => "src/config/default.toml",
}

/// Prefix of the environment variables overriding the configuration, e.g.
/// `TEENET__CHAIN__RPC_URL`.
pub const ENV_PREFIX: &str = "TEENET";

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub chain: ChainConfig,
    pub contracts: ContractsConfig,
    pub data: DataConfig,
    pub wallet: WalletConfig,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ChainConfig {
    pub rpc_url: String,
    /// Signers are bound to this chain.
    pub chain_id: u64,
}

/// Deployed registry addresses. Empty when not deployed on the chain.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ContractsConfig {
    pub task: String,
    pub node: String,
    pub code: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub dir: String,
    /// File name of the task cache under `dir`.
    pub task_cache: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct WalletConfig {
    /// JSON array of hex encoded private keys.
    pub private_keys_file: String,
    pub keystore: Option<String>,
    pub keystore_pwd: Option<Secret<String>>,
}

impl ContractsConfig {
    pub fn task_address(&self) -> anyhow::Result<Address> {
        parse_address("task", &self.task)
    }

    pub fn node_address(&self) -> anyhow::Result<Address> {
        parse_address("node", &self.node)
    }

    pub fn code_address(&self) -> anyhow::Result<Address> {
        parse_address("code", &self.code)
    }

    fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [("task", &self.task), ("node", &self.node), ("code", &self.code)] {
            if !value.is_empty() {
                parse_address(name, value)?;
            }
        }
        Ok(())
    }
}

impl DataConfig {
    pub fn task_cache_path(&self) -> PathBuf {
        PathBuf::from(&self.dir).join(&self.task_cache)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self
            .task_cache
            .is_empty()
        {
            bail!("data.task_cache is required");
        }
        Ok(())
    }
}

impl Config {
    /// Layers the embedded defaults, the optional `local_file` and the
    /// environment, in that order.
    pub fn load(local_file: Option<String>) -> anyhow::Result<Config> {
        let mut config_builder = config::Config::builder();
        config_builder = config_builder.add_source(config::File::from_str(
            &DEFAULT_CONFIG,
            FileFormat::Toml,
        ));

        if let Some(local_file) = local_file {
            debug!("Loading local configuration from {}", local_file);
            config_builder = config_builder.add_source(config::File::with_name(&local_file));
        }

        let config_builder = config_builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .ignore_empty(true),
            )
            .build()
            .context("Could not load configuration")?;

        config_builder
            .try_deserialize()
            .context("Could not deserialize configuration")
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        Url::parse(&self.chain.rpc_url)
            .with_context(|| format!("invalid chain.rpc_url `{}`", self.chain.rpc_url))?;
        self.contracts
            .validate()?;
        self.data
            .validate()?;
        if self
            .wallet
            .private_keys_file
            .is_empty()
            && self
                .wallet
                .keystore
                .is_none()
        {
            bail!("Either wallet.private_keys_file or wallet.keystore is required");
        }
        Ok(())
    }
}

fn parse_address(
    name: &str,
    value: &str,
) -> anyhow::Result<Address> {
    if value.is_empty() {
        bail!("contracts.{name} is not configured");
    }
    value
        .parse::<Address>()
        .with_context(|| format!("invalid contracts.{name} address `{value}`"))
}
