//! Command line client of the code, node and task registries.

pub mod cache;
pub mod code;
pub mod config;
pub mod error;
pub mod node;
pub mod output;
pub mod task;
pub mod wallet;

pub use cache::CacheDocument;
pub use cache::CacheError;
pub use cache::TaskCache;
pub use error::TaskError;
pub use output::Console;
pub use output::Output;
pub use output::Recorder;
pub use task::StatusFilter;
pub use task::TaskLifecycle;
pub use wallet::WalletError;
pub use wallet::Wallets;
