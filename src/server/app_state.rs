use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{
    configs::Config,
    ledger::{ScoreLedger, ScoreStore},
    listening::ListeningRegistry,
    transport::bridge::BridgeDriver,
    voice::{Controller, GatewayEvent},
};

/// Top-level application state.
pub struct AppState {
    pub config: Config,
    pub ledger: Arc<ScoreLedger>,
    pub registry: Arc<ListeningRegistry>,
    pub controller: Arc<Controller>,
    /// Voice driver and chat sink for the connected gateway bridge.
    pub bridge: Arc<BridgeDriver>,
    /// Feeds the single event loop; see [`crate::server::run_event_loop`].
    pub events: mpsc::UnboundedSender<GatewayEvent>,
}

impl AppState {
    /// Wires the ledger, registry, bridge and controller together. The
    /// returned receiver belongs to the event loop.
    pub fn new(
        config: Config,
        store: Arc<dyn ScoreStore>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<GatewayEvent>) {
        let ledger = Arc::new(ScoreLedger::new(store));
        let registry = Arc::new(ListeningRegistry::new());
        let bridge = Arc::new(BridgeDriver::new(config.bot.gateway_timeout()));
        let controller = Arc::new(Controller::new(
            &config.bot,
            registry.clone(),
            ledger.clone(),
            bridge.clone(),
        ));
        let (events, rx) = mpsc::unbounded_channel();

        let state = Arc::new(Self {
            config,
            ledger,
            registry,
            controller,
            bridge,
            events,
        });
        (state, rx)
    }
}
