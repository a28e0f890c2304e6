//! Binary file I/O for .bidx files.

pub mod compression;
pub mod layout;
pub mod mmap;
pub mod reader;
pub mod writer;

pub use mmap::MmapReader;
pub use reader::IndexReader;
pub use writer::IndexWriter;
