
mod static_tables;
mod primitive;
mod dynamic_table;
mod header_field;
mod decoder;
mod encoder;
mod indexing_tables;

pub use header_field::{HeaderField, HeaderFieldRef};
pub use decoder::{Decoder, DecoderIterator};
pub use encoder::Encoder;