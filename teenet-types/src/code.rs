use serde_derive::Deserialize;
use serde_derive::Serialize;

use crate::CodeHash;

/// An entry of the code registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
    pub hash: CodeHash,
    pub url: String,
}

/// Code description read from a JSON file for `code add-or-update`.
pub type CodeFile = Code;
