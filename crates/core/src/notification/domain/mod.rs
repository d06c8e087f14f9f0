pub mod identity;
pub mod notification_sink;
pub mod notification_throttler;
pub mod recognition_event;
