use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Item yielded by a frame source.
pub type FrameResult = Result<Frame, Box<dyn std::error::Error>>;

/// Produces frames from a camera, video file, or still image.
///
/// Implementations handle device and codec details while the pipeline works
/// with the abstract `Frame`. The frame iterator ending, or yielding an
/// error, means no further frames are available.
pub trait VideoReader: Send {
    /// Opens a device, file, or image and returns its metadata.
    fn open(&mut self, source: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Returns an iterator over frames in capture order.
    fn frames(&mut self) -> Box<dyn Iterator<Item = FrameResult> + '_>;

    /// Releases any resources held by the reader.
    fn close(&mut self);
}
