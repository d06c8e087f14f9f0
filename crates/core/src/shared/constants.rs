pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/w600k_r50.onnx";

/// Application directory name under the platform data/config/cache dirs.
pub const APP_DIR_NAME: &str = "FaceWatch";

pub const STORE_FILENAME: &str = "faces_db.json";
pub const SETTINGS_FILENAME: &str = "settings.json";

/// Wire name for faces that matched no enrolled identity.
pub const UNKNOWN_IDENTITY: &str = "unknown";

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.5;
pub const DEFAULT_COOLDOWN_SECS: u64 = 5;
pub const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 3;
pub const DEFAULT_DETECTION_CONFIDENCE: f64 = 0.5;

/// Faces smaller than this on either side are not embedded.
pub const MIN_FACE_SIZE: i32 = 16;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
