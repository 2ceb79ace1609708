//! Callbacks into the host integration
//!
//! The gateway never touches entities, UI, or storage itself; it reports
//! through these traits and the host does the rest. Every callback is
//! optional, and all of them may be registered or swapped while the
//! gateway is running.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use tis_core::{DeviceDescriptor, DeviceId, Feedback, FeedbackEvent};

/// Receiver of entity-facing state changes
#[async_trait]
pub trait EntityStateSink: Send + Sync {
    /// A channel's boolean state was reported
    async fn channel_changed(&self, device: DeviceId, channel: u8, on: bool);

    /// The device missed an acknowledgement deadline
    async fn device_offline(&self, device: DeviceId);
}

/// Receiver of named feedback events for the host event bus
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish one event; `event_type` is the feedback kind name
    async fn publish_event(&self, event_type: &str, payload: serde_json::Value);
}

/// Receiver of discovery scan results
#[async_trait]
pub trait DiscoverySink: Send + Sync {
    /// Handle the batch of devices a scan produced
    async fn devices_discovered(&self, devices: Vec<DeviceDescriptor>);
}

/// The currently registered host callbacks
#[derive(Clone, Default)]
pub(crate) struct HostCallbacks {
    pub(crate) state_sink: Option<Arc<dyn EntityStateSink>>,
    pub(crate) event_publisher: Option<Arc<dyn EventPublisher>>,
    pub(crate) discovery_sink: Option<Arc<dyn DiscoverySink>>,
}

/// Drains the match-all feedback stream into the host callbacks
///
/// Runs as its own task so slow host work never backs up the receive
/// loop; the broadcast channel absorbs bursts and drops oldest on lag.
pub(crate) async fn forward_events(
    mut events: broadcast::Receiver<FeedbackEvent>,
    callbacks: Arc<RwLock<HostCallbacks>>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            received = events.recv() => match received {
                Ok(event) => {
                    let snapshot = callbacks.read().unwrap().clone();
                    dispatch(&snapshot, event).await;
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "Host forwarder lagged; feedback events dropped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    debug!("Host forwarder stopped");
}

async fn dispatch(callbacks: &HostCallbacks, event: FeedbackEvent) {
    if let Some(sink) = &callbacks.state_sink {
        match &event.feedback {
            Feedback::ControlResponse { channel, on } => {
                sink.channel_changed(event.device, *channel, *on).await;
            }
            Feedback::BinaryFeedback { channels } => {
                for (index, on) in channels.iter().enumerate() {
                    sink.channel_changed(event.device, index as u8 + 1, *on).await;
                }
            }
            Feedback::UpdateResponse { levels } => {
                for (index, level) in levels.iter().enumerate() {
                    sink.channel_changed(event.device, index as u8 + 1, *level > 0)
                        .await;
                }
            }
            Feedback::OfflineDevice => {
                sink.device_offline(event.device).await;
            }
        }
    }

    if let Some(publisher) = &callbacks.event_publisher {
        let event_type = event.kind().as_str();
        match serde_json::to_value(&event) {
            Ok(payload) => publisher.publish_event(event_type, payload).await,
            Err(err) => warn!(error = %err, "Feedback event not serializable"),
        }
    }
}
