//! # Error taxonomy for the stack VM
//!
//! This module defines the single [`Error`] enum shared by parsing,
//! validation, and interpretation. Each variant carries a human-readable,
//! situated message so a host can report useful diagnostics without this
//! crate reaching for an external error-formatting dependency.
//!
//! ## Design
//! - Five variants, matching the taxonomy the VM is specified against:
//!   parse-time, validation-time, and three runtime fault kinds.
//! - [`fmt::Display`] produces short, prefixed messages (`"InvalidBytecode:
//!   ..."`). [`std::error::Error`] is implemented so `Error` composes with
//!   the rest of the ecosystem.

use std::fmt;

/// Errors produced while loading, validating, or executing a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The byte stream ended early, or the magic number did not match.
    ParseError(String),
    /// Static validation rejected an out-of-range reference or bad tag.
    InvalidBytecode(String),
    /// A pop would violate the logical contents of the current frame, or
    /// popped an empty operand stack.
    StackUnderflow(String),
    /// A runtime indirect-call, field-access, pointer dereference, or ADT
    /// handle turned out to be out of range (including a dangling handle).
    IndexOutOfBounds(String),
    /// Division or remainder by zero.
    Arithmetic(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ParseError(msg) => write!(f, "ParseError: {}", msg),
            Error::InvalidBytecode(msg) => write!(f, "InvalidBytecode: {}", msg),
            Error::StackUnderflow(msg) => write!(f, "StackUnderflow: {}", msg),
            Error::IndexOutOfBounds(msg) => write!(f, "IndexOutOfBounds: {}", msg),
            Error::Arithmetic(msg) => write!(f, "Arithmetic: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
