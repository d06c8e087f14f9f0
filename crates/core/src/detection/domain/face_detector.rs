use crate::shared::frame::Frame;

use super::face_detection::FaceDetection;

/// Domain interface for the external face detection + embedding model.
///
/// An empty result is a normal outcome. Implementations may hold
/// inference sessions that need exclusive access, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceDetection>, Box<dyn std::error::Error>>;
}
