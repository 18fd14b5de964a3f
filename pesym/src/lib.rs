//! `pesym` identifies the PDB that belongs to a Windows binary.
//!
//! Windows executables and libraries reference their debug information through a CodeView record
//! in the PE debug directory. This crate reads that record without loading the image, derives the
//! build id a symbol server files the PDB under, and reduces batches of binaries to one file per
//! build id.
//!
//! # Usage
//!
//! Add `pesym` as a dependency to your `Cargo.toml`. The following features are available:
//!
//! - **`debuginfo`** (default): Decoding of PE headers and CodeView records, and build id
//!   deduplication.
//! - **`breakpad`**: Reading PDB identifiers from the `MODULE` header of Breakpad symbol files.
//! - **`mapping`**: The JSON events sent along with uploaded PDBs.
//!
//! **`common-serde`** and **`debuginfo-serde`** additionally implement
//! `serde::{Deserialize, Serialize}` on suitable types.

#![warn(missing_docs)]

#[doc(inline)]
pub use pesym_common as common;
#[doc(inline)]
#[cfg(feature = "debuginfo")]
pub use pesym_debuginfo as debuginfo;
