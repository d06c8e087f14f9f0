pub mod enroll_face_use_case;
pub mod operator_command;
pub mod pipeline_logger;
pub mod recognition;
pub mod watch_faces_use_case;
