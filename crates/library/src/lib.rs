//! Function library for Tasksmith.
//!
//! Every generated unit that passes validation is published here as two
//! co-located files sharing a stem: `<stem>.<ext>` (source) and
//! `<stem>.json` (`{"function_name": .., "args_doc": [..]}`). An entry
//! exists only while both files exist and the metadata parses.

pub mod stem;
pub mod store;

pub use stem::normalize_stem;
pub use store::{LibraryIndex, LibraryStore, RemoveOutcome};
