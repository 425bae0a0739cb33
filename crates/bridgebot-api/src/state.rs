//! Application state wiring the session core to its infrastructure.
//!
//! AppState holds the controller and the handles used by both the CLI and the
//! REST API. The controller is generic over its ports only through boxed
//! wrappers, so AppState pins it to the loopback transport and whatever
//! provider the `[llm]` section describes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bridgebot_core::chat::buffer::HistoryLimits;
use bridgebot_core::chat::completion::PhraseCompletionDetector;
use bridgebot_core::config::ConfigStore;
use bridgebot_core::llm::box_provider::BoxLlmProvider;
use bridgebot_core::llm::responder::ResponderGateway;
use bridgebot_core::session::{ControllerSettings, Dispatcher, SessionController, SessionRegistry};
use bridgebot_core::transport::BoxTransport;
use bridgebot_infra::llm::{create_provider, responder_options};
use bridgebot_infra::transport::LoopbackTransport;
use bridgebot_types::config::BridgeConfig;

/// Shared application state.
///
/// Cloning is cheap: every field is a shared handle.
#[derive(Clone)]
pub struct AppState {
    pub controller: SessionController,
    pub config_store: ConfigStore,
    /// Driver side of the transport, used by the development endpoints.
    pub loopback: LoopbackTransport,
    pub config: Arc<BridgeConfig>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Build the state from a loaded config: provider, responder, dispatcher, controller.
    pub fn init(data_dir: PathBuf, config: BridgeConfig, auto_pair: bool) -> anyhow::Result<Self> {
        let provider = create_provider(&config.llm)?;
        let loopback = LoopbackTransport::new().with_auto_pair(auto_pair);
        Ok(Self::build(data_dir, config, provider, loopback))
    }

    /// Wire the state around an already constructed provider and transport.
    pub fn build(
        data_dir: PathBuf,
        config: BridgeConfig,
        provider: BoxLlmProvider,
        loopback: LoopbackTransport,
    ) -> Self {
        let responder = ResponderGateway::new(provider, responder_options(&config.llm));
        let config_store = ConfigStore::new(config.assistant.clone());

        let mut dispatcher = Dispatcher::new(Arc::new(responder), config_store.clone());
        if let Some(detector) = PhraseCompletionDetector::from_phrases(&config.sessions.completion_phrases) {
            dispatcher = dispatcher.with_completion_detector(
                Arc::new(detector),
                Duration::from_secs(config.sessions.release_delay_secs),
            );
        }

        let controller = SessionController::new(
            SessionRegistry::new(HistoryLimits::from(&config.sessions)),
            BoxTransport::new(loopback.clone()),
            dispatcher,
            ControllerSettings::from(&config.sessions),
        );

        Self {
            controller,
            config_store,
            loopback,
            config: Arc::new(config),
            data_dir,
        }
    }
}
