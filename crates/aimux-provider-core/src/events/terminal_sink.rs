use std::future::Future;
use std::io::Write;
use std::pin::Pin;

use super::{Event, EventSink};

/// Writes each event as one JSON line on stderr, keeping stdout for results.
#[derive(Debug, Default)]
pub struct TerminalEventSink;

impl TerminalEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for TerminalEventSink {
    fn write<'a>(&'a self, event: &'a Event) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            let mut line = match serde_json::to_vec(event) {
                Ok(line) => line,
                Err(err) => {
                    tracing::warn!(error = %err, "event dropped: not serializable");
                    return;
                }
            };
            line.push(b'\n');
            let _ = std::io::stderr().lock().write_all(&line);
        })
    }
}
