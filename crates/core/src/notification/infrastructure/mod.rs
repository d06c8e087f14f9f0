pub mod console_notification_sink;
pub mod http_notification_sink;
