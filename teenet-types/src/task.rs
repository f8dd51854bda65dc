use chrono::DateTime;
use chrono::Utc;
use ethers::types::Address;
use ethers::types::U256;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use crate::num::decimal;
use crate::CodeHash;
use crate::TaskId;
use crate::SECONDS_PER_DAY;

/// A unit of compute work funded by a deposit, as stored by the task registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Caller supplied, non-zero and immutable.
    pub id: TaskId,

    /// Zero on submission means "the sender"; the registry stores the resolved
    /// address.
    pub owner: Address,

    /// Paid to the owner of every rewarded node.
    #[serde(with = "decimal")]
    pub reward_per_node: U256,

    /// Block time of the creating transaction, assigned by the registry.
    #[serde(with = "decimal")]
    pub start: U256,

    /// Lifetime of the task, counted from `start`.
    #[serde(with = "decimal")]
    pub num_days: U256,

    /// Upper bound on the number of enrolled nodes.
    #[serde(with = "decimal")]
    pub max_node_num: U256,

    /// Entry of the code registry the nodes are expected to run.
    pub code_hash: CodeHash,
}

impl Task {
    /// Value locked at creation: `rewardPerNode * maxNodeNum`.
    ///
    /// Returns `None` when the product does not fit in 256 bits.
    pub fn deposit(&self) -> Option<U256> {
        self.reward_per_node
            .checked_mul(self.max_node_num)
    }

    /// Expiry instant in seconds since the epoch: `start + numDays * 86400`.
    pub fn expires_at(&self) -> Option<U256> {
        self.num_days
            .checked_mul(U256::from(SECONDS_PER_DAY))
            .and_then(|lifetime| lifetime.checked_add(self.start))
    }

    /// Calendar date of [`Task::expires_at`], if it is representable.
    pub fn expiry_date(&self) -> Option<DateTime<Utc>> {
        let secs = self.expires_at()?;
        if secs > U256::from(i64::MAX as u64) {
            return None;
        }
        DateTime::from_timestamp(secs.as_u64() as i64, 0)
    }

    /// Whether the task has expired at `now` (seconds since the epoch).
    ///
    /// A task whose expiry overflows never expires.
    pub fn is_expired(
        &self,
        now: u64,
    ) -> bool {
        self.expires_at()
            .is_some_and(|at| at < U256::from(now))
    }

    /// Whether `joined` enrolled nodes exhaust the task's capacity.
    pub fn is_full(
        &self,
        joined: usize,
    ) -> bool {
        U256::from(joined) >= self.max_node_num
    }
}

/// Task description as written by a user in a JSON file for `task add`.
///
/// The id is kept as text so a malformed one can be reported as such instead
/// of as a generic parse failure.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFile {
    pub id: String,

    #[serde(default)]
    pub owner: Address,

    #[serde(with = "decimal")]
    pub reward_per_node: U256,

    /// Ignored by the registry, which stamps the block time.
    #[serde(default, with = "decimal")]
    pub start: U256,

    #[serde(with = "decimal")]
    pub num_days: U256,

    #[serde(with = "decimal")]
    pub max_node_num: U256,

    pub code_hash: CodeHash,
}

impl TaskFile {
    /// Builds the task to submit, using the already validated `id`.
    pub fn into_task(
        self,
        id: TaskId,
    ) -> Task {
        Task {
            id,
            owner: self.owner,
            reward_per_node: self.reward_per_node,
            start: self.start,
            num_days: self.num_days,
            max_node_num: self.max_node_num,
            code_hash: self.code_hash,
        }
    }
}

/// Input of `task reward`: the nodes of task `id` to reward.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RewardRequest {
    pub id: String,
    pub pks: Vec<String>,
}
