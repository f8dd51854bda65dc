use ethers::types::Address;
use ethers::types::Bytes;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use crate::NodePk;

/// A TEE node identity held by the node registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub pk: NodePk,
    /// Account allowed to enroll this node into tasks and paid its rewards.
    pub owner: Address,
    pub tee_type: Bytes,
    pub tee_ver: Bytes,
    pub attestation: Bytes,
}

/// Node description read from a JSON file for `node add-or-update`.
pub type NodeFile = Node;
