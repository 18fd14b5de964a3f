//! Extraction of PDB identifiers from Windows binaries.
//!
//! Every Windows executable or library built with debug information carries a CodeView record that
//! names the PDB it was linked with. The record consists of a GUID signature, an age counter and the
//! path of the PDB on the build machine. Signature and age together uniquely identify the PDB, and
//! form the [`BuildId`](pesym_common::BuildId) under which symbols are stored.
//!
//! The main entry point is [`PeFileMetadata::from_path`], which decodes a single file. Decoding never
//! fails for malformed input; structural errors are recorded on the returned metadata. A batch of
//! decoded files is reduced to one file per build id with [`remove_build_id_duplicates`].
//!
//! ```no_run
//! use pesym_debuginfo::{remove_build_id_duplicates, PeFileMetadata};
//!
//! let files = ["app.exe", "app.dll"]
//!     .iter()
//!     .map(PeFileMetadata::from_path)
//!     .collect::<Result<Vec<_>, _>>()?;
//!
//! for file in remove_build_id_duplicates(files).files {
//!     println!("{} {}", file.path.display(), file.build_id());
//! }
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! # Modules
//!
//!  - [`pe`] contains the low-level decoder for PE headers and the debug directory.
//!  - [`reader`] provides the bounds-checked reads the decoder is built on.
//!  - `breakpad` reads the equivalent information from Breakpad symbol files.
//!  - `mapping` builds the events sent along with uploaded PDBs.

#![warn(missing_docs)]

mod dedup;
mod metadata;

pub mod pe;
pub mod reader;

#[cfg(feature = "breakpad")]
pub mod breakpad;
#[cfg(feature = "mapping")]
pub mod mapping;

pub use crate::dedup::*;
pub use crate::metadata::*;
pub use crate::pe::{PeError, PeErrorKind};
