//! Reading the `[u32 length][bytes]` chunk runs bundles store their payload in

mod reader;
mod reader_async;
mod stream;

pub use reader::ChunkReader;
pub(crate) use reader_async::check_cancelled;
pub use stream::{ChunkStream, DEFAULT_READ_AHEAD};
