//! Composition root for the TIS protocol stack
//!
//! [`TisGateway`] owns one UDP transport and wires the full receive path
//! behind it: frames are decoded, matched against pending
//! acknowledgements, folded into the channel-state cache, and fanned out
//! on the per-device feedback bus. Host integrations talk to it through
//! [`DeviceControl`] handles and the [`EntityStateSink`], [`EventPublisher`]
//! and [`DiscoverySink`] callback traits.
//!
//! ```no_run
//! # async fn demo() -> tis_gateway::GatewayResult<()> {
//! use tis_config::GatewayConfig;
//! use tis_core::DeviceId;
//! use tis_gateway::TisGateway;
//!
//! let gateway = TisGateway::new(GatewayConfig::default());
//! gateway.start().await?;
//!
//! let devices = gateway.scan_devices().await?;
//! println!("found {} devices", devices.len());
//!
//! let relay = gateway.device_control(DeviceId::new(1, 10), 3);
//! if !relay.turn_on().await? {
//!     println!("{} did not answer", relay.device());
//! }
//! gateway.stop().await;
//! # Ok(())
//! # }
//! ```

mod device;
mod error;
mod host;
mod pipeline;
mod sender;
mod states;

pub use device::DeviceControl;
pub use error::{GatewayError, GatewayResult};
pub use host::{DiscoverySink, EntityStateSink, EventPublisher};
pub use sender::{AckExpectation, AckOutcome, PacketSender};
pub use states::ChannelStateCache;

use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, instrument};

use tis_config::GatewayConfig;
use tis_core::{DeviceDescriptor, DeviceId};
use tis_event_bus::{FeedbackBus, SharedFeedbackBus};
use tis_protocol::commands;
use tis_registry::{DeviceRegistry, SharedDeviceRegistry};
use tis_transport::{SharedTransport, UdpTransport};

use crate::host::HostCallbacks;
use crate::pipeline::{DiscoveryObserver, FeedbackPipeline};

/// The assembled TIS protocol stack
pub struct TisGateway {
    config: GatewayConfig,
    transport: SharedTransport,
    bus: SharedFeedbackBus,
    registry: SharedDeviceRegistry,
    states: Arc<ChannelStateCache>,
    sender: Arc<PacketSender>,
    callbacks: Arc<RwLock<HostCallbacks>>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl TisGateway {
    /// Assemble a gateway from a configuration
    ///
    /// The configuration is taken as given; [`GatewayConfig::load`] is the
    /// place where files get validated. Nothing touches the network until
    /// [`start`](Self::start).
    pub fn new(config: GatewayConfig) -> Self {
        let transport = Arc::new(UdpTransport::new(config.listen_port));
        let bus = Arc::new(FeedbackBus::new());
        let registry = Arc::new(DeviceRegistry::new(config.device_types.clone()));
        let states = Arc::new(ChannelStateCache::new());
        let sender = Arc::new(PacketSender::new(
            transport.clone(),
            bus.clone(),
            states.clone(),
        ));

        transport.subscribe(Arc::new(FeedbackPipeline::new(
            sender.clone(),
            states.clone(),
            bus.clone(),
        )));
        transport.subscribe(Arc::new(DiscoveryObserver::new(registry.clone())));

        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            transport,
            bus,
            registry,
            states,
            sender,
            callbacks: Arc::new(RwLock::new(HostCallbacks::default())),
            forwarder: Mutex::new(None),
            shutdown_tx,
        }
    }

    /// Load a configuration file and assemble a gateway from it
    pub fn from_config_file(path: impl AsRef<Path>) -> GatewayResult<Self> {
        Ok(Self::new(GatewayConfig::load(path)?))
    }

    /// Register the sink receiving per-channel state updates
    pub fn set_state_sink(&self, sink: Arc<dyn EntityStateSink>) {
        self.callbacks.write().unwrap().state_sink = Some(sink);
    }

    /// Register the publisher receiving named feedback events
    pub fn set_event_publisher(&self, publisher: Arc<dyn EventPublisher>) {
        self.callbacks.write().unwrap().event_publisher = Some(publisher);
    }

    /// Register the sink receiving discovery scan results
    pub fn set_discovery_sink(&self, sink: Arc<dyn DiscoverySink>) {
        self.callbacks.write().unwrap().discovery_sink = Some(sink);
    }

    /// Bind the socket, start the receive loop and the host forwarder
    #[instrument(skip(self))]
    pub async fn start(&self) -> GatewayResult<()> {
        self.transport.start().await?;

        let events = self.bus.subscribe_all();
        let callbacks = self.callbacks.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();
        let task = tokio::spawn(host::forward_events(events, callbacks, shutdown_rx));
        *self.forwarder.lock().unwrap() = Some(task);

        info!(port = self.config.listen_port, "Gateway started");
        Ok(())
    }

    /// Stop the transport and the host forwarder
    ///
    /// Both tasks have exited when this returns. Idempotent.
    pub async fn stop(&self) {
        self.transport.stop().await;

        let task = self.forwarder.lock().unwrap().take();
        if let Some(task) = task {
            let _ = self.shutdown_tx.send(());
            let _ = task.await;
            info!("Gateway stopped");
        }
    }

    /// Probe the bus for devices and collect their answers
    ///
    /// Sends one discovery frame to the configured target, waits out the
    /// configured discovery window, then returns everything the registry
    /// holds, handing the same batch to the discovery sink if one is
    /// registered. No answers is an empty batch, not an error.
    #[instrument(skip(self))]
    pub async fn scan_devices(&self) -> GatewayResult<Vec<DeviceDescriptor>> {
        let probe = commands::discovery_request(self.config.source_id);
        self.transport.send(&probe, self.config.target()).await?;
        tokio::time::sleep(self.config.discovery_window()).await;

        let devices = self.registry.devices();
        info!(count = devices.len(), "Discovery scan finished");

        let sink = self.callbacks.read().unwrap().discovery_sink.clone();
        if let Some(sink) = sink {
            sink.devices_discovered(devices.clone()).await;
        }
        Ok(devices)
    }

    /// Build a control handle for one channel of one device
    pub fn device_control(&self, device: DeviceId, channel: u8) -> DeviceControl {
        DeviceControl::new(
            device,
            channel,
            self.config.source_id,
            self.config.target(),
            self.config.ack_timeout(),
            self.sender.clone(),
            self.bus.clone(),
            self.states.clone(),
        )
    }

    /// The configuration this gateway was assembled from
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The underlying transport
    pub fn transport(&self) -> &SharedTransport {
        &self.transport
    }

    /// The per-device feedback bus
    pub fn bus(&self) -> &SharedFeedbackBus {
        &self.bus
    }

    /// The device registry populated by discovery
    pub fn registry(&self) -> &SharedDeviceRegistry {
        &self.registry
    }

    /// The channel-state cache
    pub fn states(&self) -> &Arc<ChannelStateCache> {
        &self.states
    }

    /// The acknowledgement correlator
    pub fn sender(&self) -> &Arc<PacketSender> {
        &self.sender
    }

    /// Whether the receive loop is running
    pub fn is_running(&self) -> bool {
        self.transport.is_running()
    }
}
