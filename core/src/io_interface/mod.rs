pub mod header;
pub mod sink;

pub use header::FilterbankHeader;
pub use sink::{check_block, BlockSink, MemorySink};
