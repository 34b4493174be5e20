//! Deterministic content hashing of targets over the dependency graph.
//!
//! A target's hash covers its own files, product kind, settings, and the
//! hashes of everything it depends on, so a change anywhere below a target
//! changes the target's hash too. Hashes are recomputed every invocation and
//! memoized for its duration.

#![warn(missing_docs)]

pub mod error;
pub mod hasher;
pub mod settings;

pub use error::HashError;
pub use hasher::ContentHasher;
pub use settings::settings_digest;
