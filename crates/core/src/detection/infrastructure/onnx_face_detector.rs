use std::path::Path;

use crate::detection::domain::face_detection::FaceDetection;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::constants::MIN_FACE_SIZE;
use crate::shared::frame::Frame;

use super::arcface_embedder::ArcFaceEmbedder;
use super::onnx_yolo_detector::OnnxYoloDetector;

/// Context kept around the face box when cropping for the embedder.
const CROP_MARGIN: f64 = 0.1;

/// Two-stage detector: YOLO finds face boxes, ArcFace embeds each one.
///
/// Crops are squared around the box rather than landmark-aligned.
/// Faces too small to embed reliably are dropped.
pub struct OnnxFaceDetector {
    locator: OnnxYoloDetector,
    embedder: ArcFaceEmbedder,
}

impl OnnxFaceDetector {
    pub fn new(
        detection_model: &Path,
        embedding_model: &Path,
        confidence: f64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            locator: OnnxYoloDetector::new(detection_model, confidence)?,
            embedder: ArcFaceEmbedder::new(embedding_model)?,
        })
    }
}

impl FaceDetector for OnnxFaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceDetection>, Box<dyn std::error::Error>> {
        let located = self.locator.locate(frame)?;
        let mut detections = Vec::with_capacity(located.len());
        for face in located {
            if face.bbox.width < MIN_FACE_SIZE || face.bbox.height < MIN_FACE_SIZE {
                log::debug!("Skipping {}x{} face", face.bbox.width, face.bbox.height);
                continue;
            }
            let Some(crop) = frame.crop(&face.bbox.expand_to_square(CROP_MARGIN)) else {
                continue;
            };
            detections.push(FaceDetection {
                bbox: face.bbox,
                confidence: face.confidence,
                embedding: self.embedder.embed(&crop)?,
            });
        }
        Ok(detections)
    }
}
