//! Fixed-schema conversion between registry tuples and records.
//!
//! Every registry struct is read by name and position. A tuple with the wrong
//! number of fields or a field of the wrong ABI type is a [`DecodeError`],
//! never a silently defaulted value.

use std::vec::IntoIter;

use ethers::abi::Token;
use ethers::types::Address;
use ethers::types::Bytes;
use ethers::types::H256;
use ethers::types::U256;
use teenet_types::Code;
use teenet_types::Node;
use teenet_types::Task;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{record}: expected a tuple")]
    NotATuple { record: &'static str },

    #[error("{record}: expected {expected} fields, found {found}")]
    Arity {
        record: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{record}: field `{field}` is not a {expected}")]
    Field {
        record: &'static str,
        field: &'static str,
        expected: &'static str,
    },

    #[error("{0}")]
    Abi(String),
}

const TASK_FIELDS: usize = 7;
const NODE_FIELDS: usize = 5;
const CODE_FIELDS: usize = 2;

/// Reads the fields of one tuple in declaration order.
struct TupleReader {
    record: &'static str,
    fields: IntoIter<Token>,
}

impl TupleReader {
    fn new(
        record: &'static str,
        token: Token,
        expected: usize,
    ) -> Result<Self, DecodeError> {
        let Token::Tuple(fields) = token else {
            return Err(DecodeError::NotATuple { record });
        };
        if fields.len() != expected {
            return Err(DecodeError::Arity {
                record,
                expected,
                found: fields.len(),
            });
        }
        Ok(Self {
            record,
            fields: fields.into_iter(),
        })
    }

    fn next(
        &mut self,
        field: &'static str,
        expected: &'static str,
    ) -> Result<Token, DecodeError> {
        self.fields
            .next()
            .ok_or(DecodeError::Field {
                record: self.record,
                field,
                expected,
            })
    }

    fn mismatch(
        &self,
        field: &'static str,
        expected: &'static str,
    ) -> DecodeError {
        DecodeError::Field {
            record: self.record,
            field,
            expected,
        }
    }

    fn bytes32(
        &mut self,
        field: &'static str,
    ) -> Result<H256, DecodeError> {
        match self.next(field, "bytes32")? {
            Token::FixedBytes(bytes) if bytes.len() == 32 => Ok(H256::from_slice(&bytes)),
            _ => Err(self.mismatch(field, "bytes32")),
        }
    }

    fn address(
        &mut self,
        field: &'static str,
    ) -> Result<Address, DecodeError> {
        match self.next(field, "address")? {
            Token::Address(address) => Ok(address),
            _ => Err(self.mismatch(field, "address")),
        }
    }

    fn uint(
        &mut self,
        field: &'static str,
    ) -> Result<U256, DecodeError> {
        match self.next(field, "uint256")? {
            Token::Uint(value) => Ok(value),
            _ => Err(self.mismatch(field, "uint256")),
        }
    }

    fn bytes(
        &mut self,
        field: &'static str,
    ) -> Result<Bytes, DecodeError> {
        match self.next(field, "bytes")? {
            Token::Bytes(bytes) => Ok(bytes.into()),
            _ => Err(self.mismatch(field, "bytes")),
        }
    }

    fn string(
        &mut self,
        field: &'static str,
    ) -> Result<String, DecodeError> {
        match self.next(field, "string")? {
            Token::String(s) => Ok(s),
            _ => Err(self.mismatch(field, "string")),
        }
    }
}

/// `TaskMgr.Task`: `(id, owner, rewardPerNode, start, numDays, maxNodeNum, codeHash)`.
pub fn decode_task(token: Token) -> Result<Task, DecodeError> {
    let mut r = TupleReader::new("Task", token, TASK_FIELDS)?;
    Ok(Task {
        id: r.bytes32("id")?,
        owner: r.address("owner")?,
        reward_per_node: r.uint("rewardPerNode")?,
        start: r.uint("start")?,
        num_days: r.uint("numDays")?,
        max_node_num: r.uint("maxNodeNum")?,
        code_hash: r.bytes32("codeHash")?,
    })
}

pub fn encode_task(task: &Task) -> Token {
    Token::Tuple(vec![
        Token::FixedBytes(task.id.as_bytes().to_vec()),
        Token::Address(task.owner),
        Token::Uint(task.reward_per_node),
        Token::Uint(task.start),
        Token::Uint(task.num_days),
        Token::Uint(task.max_node_num),
        Token::FixedBytes(task.code_hash.as_bytes().to_vec()),
    ])
}

/// `NodeInfo.Node`: `(pk, owner, teeType, teeVer, attestation)`.
pub fn decode_node(token: Token) -> Result<Node, DecodeError> {
    let mut r = TupleReader::new("Node", token, NODE_FIELDS)?;
    Ok(Node {
        pk: r.bytes32("pk")?,
        owner: r.address("owner")?,
        tee_type: r.bytes("teeType")?,
        tee_ver: r.bytes("teeVer")?,
        attestation: r.bytes("attestation")?,
    })
}

pub fn encode_node(node: &Node) -> Token {
    Token::Tuple(vec![
        Token::FixedBytes(node.pk.as_bytes().to_vec()),
        Token::Address(node.owner),
        Token::Bytes(node.tee_type.to_vec()),
        Token::Bytes(node.tee_ver.to_vec()),
        Token::Bytes(node.attestation.to_vec()),
    ])
}

/// `CodeInfo.Code`: `(hash, url)`.
pub fn decode_code(token: Token) -> Result<Code, DecodeError> {
    let mut r = TupleReader::new("Code", token, CODE_FIELDS)?;
    Ok(Code {
        hash: r.bytes32("hash")?,
        url: r.string("url")?,
    })
}

pub fn encode_code(code: &Code) -> Token {
    Token::Tuple(vec![
        Token::FixedBytes(code.hash.as_bytes().to_vec()),
        Token::String(code.url.clone()),
    ])
}

/// Converts a `bytes32[]` result into hashes.
pub fn decode_bytes32_list(list: Vec<[u8; 32]>) -> Vec<H256> {
    list.into_iter()
        .map(H256)
        .collect()
}
