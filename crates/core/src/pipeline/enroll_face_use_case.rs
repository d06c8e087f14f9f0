use std::path::Path;

use thiserror::Error;

use crate::detection::domain::face_detection::FaceDetection;
use crate::detection::domain::face_detector::FaceDetector;
use crate::identity::domain::embedding_store::{EmbeddingStore, StoreError};
use crate::identity::domain::identity_record::{IdentityError, IdentityRecord};
use crate::video::domain::video_reader::VideoReader;

#[derive(Error, Debug)]
pub enum EnrollError {
    #[error("could not read {path}: {message}")]
    Source { path: String, message: String },
    #[error("face detection failed: {0}")]
    Detection(String),
    #[error("no face detected in {0}")]
    NoFaceDetected(String),
    #[error("invalid enrollment: {0}")]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Offline enrollment: read one image → detect → append the largest face.
pub struct EnrollFaceUseCase {
    reader: Box<dyn VideoReader>,
    detector: Box<dyn FaceDetector>,
    store: Box<dyn EmbeddingStore>,
}

impl EnrollFaceUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        detector: Box<dyn FaceDetector>,
        store: Box<dyn EmbeddingStore>,
    ) -> Self {
        Self {
            reader,
            detector,
            store,
        }
    }

    pub fn execute(&mut self, image_path: &Path, name: &str) -> Result<IdentityRecord, EnrollError> {
        let source_error = |message: String| EnrollError::Source {
            path: image_path.display().to_string(),
            message,
        };

        self.reader
            .open(image_path)
            .map_err(|e| source_error(e.to_string()))?;
        let frame = self.reader.frames().next();
        self.reader.close();
        let frame = frame
            .ok_or_else(|| source_error("no frames".into()))?
            .map_err(|e| source_error(e.to_string()))?;

        let detections = self
            .detector
            .detect(&frame)
            .map_err(|e| EnrollError::Detection(e.to_string()))?;
        if detections.len() > 1 {
            log::info!(
                "{} faces in {}; enrolling the largest",
                detections.len(),
                image_path.display()
            );
        }
        let face = FaceDetection::largest(&detections)
            .ok_or_else(|| EnrollError::NoFaceDetected(image_path.display().to_string()))?;

        let record = IdentityRecord::new(name, face.embedding.clone())?;
        self.store.append(record.clone())?;
        log::info!("Enrolled {} from {}", record.name(), image_path.display());
        Ok(record)
    }
}
