use std::path::PathBuf;

/// Stream properties reported by a frame source when it is opened.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// Zero for still images and sources that do not report a rate.
    pub fps: f64,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    pub fn describe(&self) -> String {
        let source = self
            .source_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        let mut text = format!("{source}: {}x{}", self.width, self.height);
        if self.fps > 0.0 {
            text.push_str(&format!(" @ {:.1} fps", self.fps));
        }
        if !self.codec.is_empty() {
            text.push_str(&format!(" ({})", self.codec));
        }
        text
    }
}
