use crate::shared::bounding_box::BoundingBox;

/// One face found in a frame, with the embedding the model computed for it.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceDetection {
    pub bbox: BoundingBox,
    pub confidence: f64,
    pub embedding: Vec<f32>,
}

impl FaceDetection {
    /// The face with the largest box area; the first one wins ties.
    ///
    /// Used to pick the operator's face for enrollment, on the assumption
    /// that they are the person closest to the camera.
    pub fn largest(detections: &[FaceDetection]) -> Option<&FaceDetection> {
        detections.iter().fold(None, |best, d| match best {
            Some(b) if b.bbox.area() >= d.bbox.area() => Some(b),
            _ => Some(d),
        })
    }
}
