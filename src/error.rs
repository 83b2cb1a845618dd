//! Error taxonomy
//!
//! Not profitable is NOT an error: the estimator returns it as an ordinary
//! `ProfitabilityResult`. Everything here is a real fault.

use alloy_primitives::{Bytes, U256};
use alloy_sol_types::{Panic, Revert, SolError};
use std::fmt;
use thiserror::Error;

use crate::contracts::IFlashArbExecutor;

#[derive(Error, Debug)]
pub enum ArbError {
    /// Address/network mismatch or unverifiable contract. Fatal to the run.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed estimator input. Skip the route and try the next one.
    #[error("Validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    /// RPC or transaction failure. The revert, when there is one, is decoded.
    #[error("External call failed ({context}): {message}{}", revert_suffix(.revert))]
    ExternalCall {
        context: String,
        message: String,
        revert: Option<RevertReason>,
    },
}

fn revert_suffix(revert: &Option<RevertReason>) -> String {
    match revert {
        Some(reason) => format!(" [revert: {}]", reason),
        None => String::new(),
    }
}

impl ArbError {
    pub fn config(message: impl Into<String>) -> Self {
        ArbError::Configuration(message.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ArbError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn external(context: impl Into<String>, message: impl fmt::Display) -> Self {
        ArbError::ExternalCall {
            context: context.into(),
            message: message.to_string(),
            revert: None,
        }
    }

    /// Wrap a transport error, keeping any revert payload the node returned.
    pub fn from_transport(context: impl Into<String>, err: alloy_transport::TransportError) -> Self {
        let revert = err
            .as_error_resp()
            .and_then(|payload| payload.as_revert_data())
            .map(|data| RevertReason::decode(&data));

        ArbError::ExternalCall {
            context: context.into(),
            message: err.to_string(),
            revert,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, ArbError::Configuration(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ArbError::Validation { .. })
    }

    pub fn revert_reason(&self) -> Option<&RevertReason> {
        match self {
            ArbError::ExternalCall { revert, .. } => revert.as_ref(),
            _ => None,
        }
    }
}

/// Structured revert payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertReason {
    /// `Error(string)` from `require`/`revert("...")`
    Message(String),

    /// `Panic(uint256)` from the compiler's checks
    Panic(u64),

    /// The executor's own `InsufficientProfit(uint256,uint256)`
    InsufficientProfit { realized: U256, required: U256 },

    /// Any other custom error, kept raw
    Custom { selector: [u8; 4], data: Bytes },

    /// Bare `revert()`
    Empty,
}

impl RevertReason {
    pub fn decode(data: &[u8]) -> Self {
        if data.len() < 4 {
            return RevertReason::Empty;
        }

        let selector = [data[0], data[1], data[2], data[3]];

        if selector == Revert::SELECTOR {
            if let Ok(revert) = Revert::abi_decode(data) {
                return RevertReason::Message(revert.reason);
            }
        }

        if selector == Panic::SELECTOR {
            if let Ok(panic) = Panic::abi_decode(data) {
                return RevertReason::Panic(panic.code.saturating_to::<u64>());
            }
        }

        if selector == IFlashArbExecutor::InsufficientProfit::SELECTOR {
            if let Ok(err) = IFlashArbExecutor::InsufficientProfit::abi_decode(data) {
                return RevertReason::InsufficientProfit {
                    realized: err.realized,
                    required: err.required,
                };
            }
        }

        RevertReason::Custom {
            selector,
            data: Bytes::copy_from_slice(&data[4..]),
        }
    }

    fn panic_description(code: u64) -> &'static str {
        match code {
            0x01 => "assertion failed",
            0x11 => "arithmetic overflow or underflow",
            0x12 => "division or modulo by zero",
            0x21 => "invalid enum value",
            0x31 => "pop on empty array",
            0x32 => "array index out of bounds",
            0x41 => "out of memory",
            0x51 => "call to uninitialized function",
            _ => "generic panic",
        }
    }
}

impl fmt::Display for RevertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevertReason::Message(msg) => write!(f, "{}", msg),
            RevertReason::Panic(code) => {
                write!(f, "panic 0x{:02x} ({})", code, Self::panic_description(*code))
            }
            RevertReason::InsufficientProfit { realized, required } => {
                write!(f, "insufficient profit: realized {} < required {}", realized, required)
            }
            RevertReason::Custom { selector, data } => {
                write!(f, "custom error 0x{} ({} bytes)", hex::encode(selector), data.len())
            }
            RevertReason::Empty => write!(f, "empty revert"),
        }
    }
}
