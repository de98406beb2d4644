//! Dataset model
//!
//! Types describing what the remote API serves for one Bible version:
//!
//! - `DatasetIndex`: the books → chapters → verses tree the crawler walks
//! - `DatasetMeta`: version-level metadata consumed by the importer
//! - `Label`: chapter/verse labels that are either numeric or literal

mod index;
mod label;
mod meta;

pub use index::{DatasetIndex, IndexBook, IndexChapter, IndexError, IndexVerse};
pub use label::Label;
pub use meta::DatasetMeta;
