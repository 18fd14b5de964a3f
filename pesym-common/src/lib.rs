//! Common functionality for `pesym`.
//!
//! This crate exposes a set of key types:
//!
//!  - [`Arch`]: The CPU architecture a PE image was linked for.
//!  - [`BuildId`]: The identity key derived from a PDB signature and age.
//!
//! # Features
//!
//! - `serde` (optional): Implements `serde::Deserialize` and `serde::Serialize` for all data types.
//!
//! This module is part of the `pesym` crate.
//!
//! [`Arch`]: enum.Arch.html
//! [`BuildId`]: struct.BuildId.html

#![warn(missing_docs)]

mod types;

pub use crate::types::*;

pub use debugid::*;
pub use uuid::Uuid;
