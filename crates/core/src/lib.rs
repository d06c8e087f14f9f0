pub mod detection;
pub mod identity;
pub mod notification;
pub mod pipeline;
pub mod presentation;
pub mod shared;
pub mod video;
