use super::recognition_event::RecognitionEvent;

/// Downstream consumer of recognition events (console, HTTP endpoint, ...).
///
/// Failures are reported but never retried by the caller.
pub trait NotificationSink: Send {
    fn notify(&mut self, event: &RecognitionEvent) -> Result<(), Box<dyn std::error::Error>>;

    /// Short label used in log messages.
    fn name(&self) -> &str;
}
