//! End-to-end session lifecycle over the loopback transport.

use std::sync::Arc;
use std::time::Duration;

use bridgebot_core::chat::buffer::HistoryLimits;
use bridgebot_core::config::ConfigStore;
use bridgebot_core::llm::box_provider::BoxLlmProvider;
use bridgebot_core::llm::provider::LlmProvider;
use bridgebot_core::llm::responder::{ResponderGateway, ResponderOptions, SETUP_INCOMPLETE_NOTICE};
use bridgebot_core::session::{ControllerSettings, Dispatcher, Session, SessionController, SessionRegistry};
use bridgebot_core::transport::BoxTransport;
use bridgebot_infra::transport::LoopbackTransport;
use bridgebot_types::config::AiConfig;
use bridgebot_types::error::SessionError;
use bridgebot_types::llm::{CompletionRequest, CompletionResponse, LlmError, Usage};
use bridgebot_types::session::SessionStatus;

struct EchoProvider;

impl LlmProvider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
        Ok(CompletionResponse {
            content: format!("echo: {last}"),
            model: request.model.clone(),
            usage: Usage::default(),
        })
    }
}

fn bakery() -> AiConfig {
    AiConfig {
        business_name: "Sunrise Bakery".to_string(),
        industry: "food".to_string(),
        instructions: String::new(),
    }
}

fn setup(transport: &LoopbackTransport, config: AiConfig) -> SessionController {
    let responder = ResponderGateway::new(
        BoxLlmProvider::new(EchoProvider),
        ResponderOptions {
            model: "deepseek-chat".to_string(),
            temperature: Some(0.7),
            max_tokens: None,
        },
    );
    SessionController::new(
        SessionRegistry::new(HistoryLimits::default()),
        BoxTransport::new(transport.clone()),
        Dispatcher::new(Arc::new(responder), ConfigStore::new(config)),
        ControllerSettings::default(),
    )
}

async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !check().await {
        assert!(tokio::time::Instant::now() < deadline, "condition not reached within two seconds");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn wait_for_status(session: &Session, status: SessionStatus) {
    eventually(|| async { session.status().await.0 == status }).await;
}

async fn connected(controller: &SessionController, transport: &LoopbackTransport, id: &str) -> Arc<Session> {
    let (session, _) = controller.start_session(id);
    wait_for_status(&session, SessionStatus::QrReady).await;
    transport.pair(id).unwrap();
    wait_for_status(&session, SessionStatus::Connected).await;
    session
}

#[tokio::test]
async fn pairing_exposes_artifact_until_connected() {
    let transport = LoopbackTransport::new();
    let controller = setup(&transport, bakery());

    let (session, created) = controller.start_session("shop-1");
    assert!(created);
    wait_for_status(&session, SessionStatus::QrReady).await;

    let artifact = controller.pairing_artifact("shop-1").await.unwrap();
    assert!(artifact.as_bytes().starts_with(b"bridgebot-pair:shop-1:"));
    assert!(session.summary().await.has_qr_code);

    transport.pair("shop-1").unwrap();
    wait_for_status(&session, SessionStatus::Connected).await;

    assert!(session.has_connection().await);
    assert!(matches!(
        controller.pairing_artifact("shop-1").await,
        Err(SessionError::NotAvailable(_))
    ));
}

#[tokio::test]
async fn rejected_pairing_ends_in_error() {
    let transport = LoopbackTransport::new();
    let controller = setup(&transport, bakery());

    let (session, _) = controller.start_session("shop-1");
    wait_for_status(&session, SessionStatus::QrReady).await;
    transport.reject("shop-1", "qr code expired").unwrap();
    wait_for_status(&session, SessionStatus::Error).await;

    let summary = session.summary().await;
    assert!(summary.error.unwrap().contains("qr code expired"));
    assert!(!session.has_connection().await);
}

#[tokio::test]
async fn inbound_message_is_answered_over_the_transport() {
    let transport = LoopbackTransport::new();
    let controller = setup(&transport, bakery());
    let session = connected(&controller, &transport, "shop-1").await;

    transport.inject_message("shop-1", "alice", "  any rye bread?  ").await.unwrap();
    eventually(|| async { transport.outbox("shop-1").unwrap().len() == 1 }).await;

    let outbox = transport.outbox("shop-1").unwrap();
    assert_eq!(outbox[0].peer, "alice");
    assert_eq!(outbox[0].text, "echo: any rye bread?");
    assert_eq!(session.history("alice").unwrap().len(), 2);
    assert_eq!(session.summary().await.connected_chats, 1);
}

#[tokio::test]
async fn unconfigured_assistant_asks_for_setup() {
    let transport = LoopbackTransport::new();
    let controller = setup(&transport, AiConfig::default());
    let session = connected(&controller, &transport, "shop-1").await;

    transport.inject_message("shop-1", "alice", "hello").await.unwrap();
    eventually(|| async { transport.outbox("shop-1").unwrap().len() == 1 }).await;

    assert_eq!(transport.outbox("shop-1").unwrap()[0].text, SETUP_INCOMPLETE_NOTICE);
    let history = session.history("alice").unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content, "hello");
    assert_eq!(history[1].content, SETUP_INCOMPLETE_NOTICE);
}

#[tokio::test]
async fn conflict_triggers_reclaim_and_keeps_connection() {
    let transport = LoopbackTransport::new();
    let controller = setup(&transport, bakery());
    let session = connected(&controller, &transport, "shop-1").await;

    transport.inject_state("shop-1", "CONFLICT").await.unwrap();
    eventually(|| async { transport.reclaim_count("shop-1").unwrap() == 1 }).await;
    assert!(session.has_connection().await);

    // The loopback line reports CONNECTED once reclaimed.
    wait_for_status(&session, SessionStatus::Connected).await;
    assert!(session.has_connection().await);
    assert_eq!(session.summary().await.transport_state.as_deref(), Some("connected"));

    transport.inject_message("shop-1", "alice", "still there?").await.unwrap();
    eventually(|| async { transport.outbox("shop-1").unwrap().len() == 1 }).await;
}

#[tokio::test]
async fn adverse_states_are_case_insensitive() {
    let transport = LoopbackTransport::new();
    let controller = setup(&transport, bakery());
    connected(&controller, &transport, "shop-1").await;

    transport.inject_state("shop-1", "unPaired").await.unwrap();
    eventually(|| async { transport.reclaim_count("shop-1").unwrap() == 1 }).await;
    transport.inject_state("shop-1", "UNLAUNCHED").await.unwrap();
    eventually(|| async { transport.reclaim_count("shop-1").unwrap() == 2 }).await;
}

#[tokio::test]
async fn remove_closes_connection_before_lookup_fails() {
    let transport = LoopbackTransport::new();
    let controller = setup(&transport, bakery());
    let session = connected(&controller, &transport, "shop-1").await;
    transport.inject_message("shop-1", "alice", "hi").await.unwrap();
    eventually(|| async { transport.outbox("shop-1").unwrap().len() == 1 }).await;

    controller.close_session("shop-1").await.unwrap();

    assert!(!transport.is_open("shop-1"));
    assert_eq!(transport.line_count(), 0);
    assert_eq!(session.status().await.0, SessionStatus::Closed);
    assert_eq!(session.conversation_count(), 0);
    assert!(matches!(controller.get_session("shop-1"), Err(SessionError::NotFound(_))));
}

#[tokio::test]
async fn sessions_are_independent() {
    let transport = LoopbackTransport::new().with_auto_pair(true);
    let controller = setup(&transport, bakery());

    let (a, _) = controller.start_session("a");
    let (b, _) = controller.start_session("b");
    wait_for_status(&a, SessionStatus::Connected).await;
    wait_for_status(&b, SessionStatus::Connected).await;

    transport.inject_state("a", "CONFLICT").await.unwrap();
    transport.inject_message("b", "bob", "hi").await.unwrap();
    eventually(|| async { transport.outbox("b").unwrap().len() == 1 }).await;

    controller.close_session("a").await.unwrap();
    assert_eq!(b.status().await.0, SessionStatus::Connected);
    assert!(!transport.is_open("a"));
    assert!(transport.is_open("b"));

    let summaries = controller.list_sessions().await;
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].session_id, "b");
}
