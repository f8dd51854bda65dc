//! Records shared by the registry adapters and the command line client.

pub mod code;
pub mod node;
pub mod num;
pub mod task;

pub use code::Code;
pub use code::CodeFile;
pub use node::Node;
pub use node::NodeFile;
pub use task::RewardRequest;
pub use task::Task;
pub use task::TaskFile;

use ethers::types::H256;

/// Identifier of a task in the task registry.
pub type TaskId = H256;

/// Public key of a TEE node, as registered in the node registry.
pub type NodePk = H256;

/// Hash of a code entry in the code registry.
pub type CodeHash = H256;

/// Number of seconds in the unit used by `numDays`.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Parses a `0x`-prefixed, 64 hex digit identifier.
///
/// The registries address tasks, nodes and code by `bytes32`. Anything else,
/// including an unprefixed or short value, is rejected.
pub fn parse_bytes32(s: &str) -> Option<H256> {
    let digits = s.strip_prefix("0x")?;
    if digits.len() != 64 {
        return None;
    }
    let mut out = [0u8; 32];
    hex::decode_to_slice(digits, &mut out).ok()?;
    Some(H256(out))
}

/// Full `0x` hex rendering of a `bytes32`.
///
/// `H256`'s `Display` abbreviates the value, which is useless on a command line.
pub fn hex32(value: &H256) -> String {
    format!("{value:#x}")
}
