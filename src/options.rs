use bytes::Bytes;

use crate::chunk::DEFAULT_READ_AHEAD;

/// Knobs for opening a bundle
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Chunks decompressed per refill of the stream buffer
    pub read_ahead: usize,
    /// Needed by versions whose codec uses a shared dictionary
    pub codec_dictionary: Option<Bytes>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            read_ahead: DEFAULT_READ_AHEAD,
            codec_dictionary: None,
        }
    }
}

impl ReaderOptions {
    /// Clamped to at least 1
    pub fn with_read_ahead(mut self, read_ahead: usize) -> Self {
        self.read_ahead = read_ahead.max(1);
        self
    }

    pub fn with_codec_dictionary(mut self, dictionary: impl Into<Bytes>) -> Self {
        self.codec_dictionary = Some(dictionary.into());
        self
    }
}
