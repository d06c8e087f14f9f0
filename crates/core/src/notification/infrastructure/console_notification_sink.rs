use crate::notification::domain::identity::Identity;
use crate::notification::domain::notification_sink::NotificationSink;
use crate::notification::domain::recognition_event::RecognitionEvent;

/// Reports emitted events through the `log` facade.
pub struct ConsoleNotificationSink;

impl ConsoleNotificationSink {
    pub fn new() -> Self {
        Self
    }

    pub fn format(event: &RecognitionEvent) -> String {
        match &event.identity {
            Identity::Known(name) => format!("Recognized {name} ({:.2})", event.score),
            Identity::Unknown => format!("Unknown face ({:.2})", event.score),
        }
    }
}

impl Default for ConsoleNotificationSink {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSink for ConsoleNotificationSink {
    fn notify(&mut self, event: &RecognitionEvent) -> Result<(), Box<dyn std::error::Error>> {
        log::info!("{}", Self::format(event));
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}
