//! On-disk formats: the fixed-size page codec and the row (tuple) codec.
//!
//! Everything here is little-endian and byte-exact; the file written by one
//! build must deserialize identically in the next.

mod page;
mod tuple;

#[cfg(test)]
mod tests;

pub use common::PAGE_SIZE;
pub use page::{Page, PageType, RecordIter, PAGE_HEADER_SIZE, PAGE_PAYLOAD_SIZE};
pub use tuple::{decode_row, encode_row, encode_value, row_id_key, value_key};
