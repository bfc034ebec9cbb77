use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};

use super::types::Event;

pub trait EventSink: Send + Sync {
    fn write<'a>(&'a self, event: &'a Event) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// Fan-out for cooldown, attempt and reset events.
///
/// Subscribers read a bounded broadcast channel and lag (dropping the oldest
/// events) when slow. Sinks are awaited in registration order, so once `emit`
/// returns every sink has seen the event.
#[derive(Clone)]
pub struct EventHub {
    tx: broadcast::Sender<Event>,
    sinks: Arc<RwLock<Vec<Arc<dyn EventSink>>>>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            sinks: Arc::default(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    pub async fn add_sink(&self, sink: Arc<dyn EventSink>) {
        self.sinks.write().await.push(sink);
    }

    pub async fn emit(&self, event: Event) {
        if self.tx.receiver_count() > 0 {
            // Only fails when the last receiver went away in between.
            let _ = self.tx.send(event.clone());
        }
        let sinks = self.sinks.read().await.clone();
        for sink in sinks {
            sink.write(&event).await;
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(64)
    }
}
