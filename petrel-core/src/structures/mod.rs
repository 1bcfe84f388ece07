//! On-disk data structures: varbyte codec, posting records, compressed blocks

mod block;
mod record;
mod varbyte;

pub use block::{compress_block, Block, BlockMetadata, BLOCK_SIZE};
pub use record::{read_record, write_record, PostingRecord};
pub use varbyte::{varbyte_decode, varbyte_encode};
