//! A streaming ZIP64 archive writer
//!
//! Feeds named entries of arbitrary length through an embedded fixed-Huffman
//! DEFLATE compressor straight into any [`std::io::Write`] sink. The writer
//! never seeks and never buffers a whole entry, which makes it suitable for
//! pipes, sockets and other append-only outputs, and the produced archives
//! use ZIP64 records throughout so entries and archives beyond 4 GiB work.

#![warn(missing_docs)]

mod deflate;
pub mod result;
mod spec;
mod types;
pub mod write;

pub use crate::types::DateTime;
pub use crate::write::ZipWriter;
