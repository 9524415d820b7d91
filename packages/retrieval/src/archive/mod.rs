//! Random access into a compressed archive dump.
//!
//! The dump is a byte stream of independently decompressible bzip2 chunks,
//! each holding a batch of page records as export XML. A manifest of
//! `offset:id:title` lines says which chunk a title lives in.
//!
//! [`ArchiveIndex`] turns the manifest into a title to byte-range mapping;
//! [`ArchiveReader`] decompresses one range and extracts one page's raw
//! source text.

pub mod index;
pub mod reader;

pub use index::ArchiveIndex;
pub use reader::ArchiveReader;
