pub mod arcface_embedder;
pub mod onnx_face_detector;
pub mod onnx_session;
pub mod onnx_yolo_detector;
