//! Processor implementations
//!
//! Contains WriterProcessor, MirrorProcessor, and MediaDownloadProcessor.

mod media;
mod mirror;
mod writer;

pub use self::media::{download_media, MediaDownloadProcessor, DEFAULT_MEDIA_FORMAT};
pub use self::mirror::{mirror, MirrorProcessor};
pub use self::writer::{read_status_file, WriterProcessor, DEFAULT_STATUS_FORMAT};
