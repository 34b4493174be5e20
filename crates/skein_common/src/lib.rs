//! Shared foundational types used across the Skein workspace.
//!
//! This crate provides content hashing, the explicit execution context that is
//! threaded through every pipeline stage, and the common internal error type.

#![warn(missing_docs)]

pub mod context;
pub mod hash;
pub mod result;

pub use context::ExecutionContext;
pub use hash::{ContentHash, DigestBuilder};
pub use result::{InternalError, SkeinResult};
