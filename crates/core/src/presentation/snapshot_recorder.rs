use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::notification::domain::recognition_event::unix_seconds;
use crate::pipeline::recognition::Recognition;
use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

use super::overlay;

/// Saves an annotated copy of frames that produced notifications.
pub struct SnapshotRecorder {
    dir: PathBuf,
    writer: Box<dyn ImageWriter>,
}

impl SnapshotRecorder {
    pub fn new(dir: impl Into<PathBuf>, writer: Box<dyn ImageWriter>) -> Self {
        Self {
            dir: dir.into(),
            writer,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `frame` with overlays as `<unix-seconds>_<frame-index>.png`.
    pub fn record(
        &self,
        frame: &Frame,
        recognitions: &[Recognition],
        now: SystemTime,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let mut annotated = frame.clone();
        overlay::draw_recognitions(&mut annotated, recognitions);

        let path = self
            .dir
            .join(format!("{}_{:06}.png", unix_seconds(now), frame.index()));
        self.writer.write(&path, &annotated)?;
        Ok(path)
    }
}
