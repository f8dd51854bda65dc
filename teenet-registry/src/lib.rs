//! Adapters over the code, node and task registries.
//!
//! Each adapter translates one registry operation into one contract read or one
//! confirmed transaction. Business rules stay in the registries; the adapters
//! only marshal values and classify failures.

pub mod code;
pub mod contract;
pub mod decode;
pub mod error;
pub mod node;
pub mod task;

pub use code::CodeRegistry;
pub use code::EthCodeRegistry;
pub use contract::Connection;
pub use contract::LocalWallet;
pub use decode::DecodeError;
pub use error::RegistryError;
pub use node::EthNodeRegistry;
pub use node::NodeRegistry;
pub use task::EthTaskRegistry;
pub use task::TaskRegistry;
