use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    api::{ChatApi, PostMessageRequest},
    events::{default_dispatcher, EventContext, EventDispatcher, HandlerResult, SlackEnvelope},
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Source of Socket Mode envelopes. The production implementation wraps the
/// platform WebSocket; tests script one in memory.
#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopSocketTransport;

#[async_trait]
impl SocketTransport for NoopSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
        Ok(None)
    }

    async fn acknowledge(&self, _envelope_id: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

pub struct SocketModeRunner {
    transport: Arc<dyn SocketTransport>,
    dispatcher: EventDispatcher,
    reconnect_policy: ReconnectPolicy,
    /// Posts handler responses; absent in preview mode, where responses are
    /// only logged.
    responder: Option<Arc<dyn ChatApi>>,
    noop_transport: bool,
}

impl Default for SocketModeRunner {
    fn default() -> Self {
        Self {
            transport: Arc::new(NoopSocketTransport),
            dispatcher: default_dispatcher(),
            reconnect_policy: ReconnectPolicy::default(),
            responder: None,
            noop_transport: true,
        }
    }
}

impl SocketModeRunner {
    pub fn new(
        transport: Arc<dyn SocketTransport>,
        dispatcher: EventDispatcher,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher, reconnect_policy, responder: None, noop_transport: false }
    }

    /// Runner with the given handlers but no real transport; events only
    /// arrive once a transport is wired in.
    pub fn with_noop_transport(dispatcher: EventDispatcher) -> Self {
        Self { dispatcher, ..Self::default() }
    }

    pub fn with_responder(mut self, responder: Arc<dyn ChatApi>) -> Self {
        self.responder = Some(responder);
        self
    }

    pub fn is_noop_transport(&self) -> bool {
        self.noop_transport
    }

    pub async fn start(&self) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "socket mode transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "socket mode retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), TransportError> {
        info!(attempt, "opening socket mode transport connection");
        self.transport.connect().await?;
        info!(attempt, "socket mode transport connected");

        loop {
            let Some(envelope) = self.transport.next_envelope().await? else {
                info!(attempt, "socket mode transport stream closed");
                self.transport.disconnect().await?;
                return Ok(());
            };

            debug!(
                envelope_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                "received slack envelope"
            );

            if let Err(error) = self.transport.acknowledge(&envelope.envelope_id).await {
                warn!(
                    envelope_id = %envelope.envelope_id,
                    error = %error,
                    "failed to acknowledge slack envelope"
                );
            }

            let context = EventContext { correlation_id: envelope.envelope_id.clone() };
            match self.dispatcher.dispatch(&envelope, &context).await {
                Ok(HandlerResult::Responded { target, message }) => {
                    let Some(responder) = &self.responder else {
                        info!(
                            envelope_id = %envelope.envelope_id,
                            channel_id = %target.channel_id,
                            fallback = %message.fallback_text,
                            "handler response suppressed (no responder configured)"
                        );
                        continue;
                    };

                    let request = PostMessageRequest {
                        channel: target.channel_id.clone(),
                        text: message.fallback_text.clone(),
                        blocks: Some(message.blocks),
                        thread_ts: target.thread_ts,
                    };
                    if let Err(error) = responder.post_message(request).await {
                        warn!(
                            envelope_id = %envelope.envelope_id,
                            channel_id = %target.channel_id,
                            error = %error,
                            "failed to post handler response"
                        );
                    }
                }
                Ok(HandlerResult::Processed | HandlerResult::Ignored) => {}
                Err(error) => {
                    warn!(
                        envelope_id = %envelope.envelope_id,
                        error = %error,
                        "event dispatch failed; continuing socket loop"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::{ReconnectPolicy, SocketModeRunner, SocketTransport, TransportError};
    use crate::api::{
        ChatApi, ChatApiError, ChannelInfo, HistoryMessage, PostMessageRequest, PostedMessage,
    };
    use crate::commands::SlashCommandPayload;
    use crate::events::{EventDispatcher, SlackEnvelope, SlackEvent};

    #[derive(Default)]
    struct ScriptedTransport {
        state: Mutex<ScriptedState>,
    }

    #[derive(Default)]
    struct ScriptedState {
        connect_results: VecDeque<Result<(), TransportError>>,
        envelopes: VecDeque<Result<Option<SlackEnvelope>, TransportError>>,
        connect_attempts: usize,
        acknowledgements: Vec<String>,
    }

    impl ScriptedTransport {
        fn with_script(
            connect_results: Vec<Result<(), TransportError>>,
            envelopes: Vec<Result<Option<SlackEnvelope>, TransportError>>,
        ) -> Self {
            Self {
                state: Mutex::new(ScriptedState {
                    connect_results: connect_results.into(),
                    envelopes: envelopes.into(),
                    connect_attempts: 0,
                    acknowledgements: Vec::new(),
                }),
            }
        }

        async fn connect_attempts(&self) -> usize {
            self.state.lock().await.connect_attempts
        }

        async fn acknowledgements(&self) -> Vec<String> {
            self.state.lock().await.acknowledgements.clone()
        }
    }

    #[async_trait]
    impl SocketTransport for ScriptedTransport {
        async fn connect(&self) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.connect_attempts += 1;
            state.connect_results.pop_front().unwrap_or(Ok(()))
        }

        async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
            let mut state = self.state.lock().await;
            state.envelopes.pop_front().unwrap_or(Ok(None))
        }

        async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.acknowledgements.push(envelope_id.to_owned());
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct CapturingApi {
        posts: Mutex<Vec<PostMessageRequest>>,
    }

    #[async_trait]
    impl ChatApi for CapturingApi {
        async fn list_channels(
            &self,
            _types: &str,
            _page_limit: u32,
        ) -> Result<Vec<ChannelInfo>, ChatApiError> {
            Ok(Vec::new())
        }

        async fn post_message(
            &self,
            request: PostMessageRequest,
        ) -> Result<PostedMessage, ChatApiError> {
            let channel = request.channel.clone();
            self.posts.lock().await.push(request);
            Ok(PostedMessage { channel, ts: "1.0".to_owned() })
        }

        async fn read_history(
            &self,
            _channel: &str,
            _limit: u32,
        ) -> Result<Vec<HistoryMessage>, ChatApiError> {
            Ok(Vec::new())
        }
    }

    fn help_envelope(envelope_id: &str) -> SlackEnvelope {
        SlackEnvelope {
            envelope_id: envelope_id.to_owned(),
            event: SlackEvent::SlashCommand(SlashCommandPayload {
                command: "/confetti".to_owned(),
                text: "help".to_owned(),
                channel_id: "C1".to_owned(),
                user_id: "U1".to_owned(),
                trigger_ts: "1".to_owned(),
                request_id: "req-1".to_owned(),
            }),
        }
    }

    #[tokio::test]
    async fn reconnects_after_initial_connect_failure() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Err(TransportError::Connect("network down".to_owned())), Ok(())],
            vec![
                Ok(Some(SlackEnvelope {
                    envelope_id: "env-1".to_owned(),
                    event: SlackEvent::Unsupported { event_type: "test".to_owned() },
                })),
                Ok(None),
            ],
        ));

        let runner = SocketModeRunner::new(
            transport.clone(),
            EventDispatcher::default(),
            ReconnectPolicy { max_retries: 2, base_delay_ms: 0, max_delay_ms: 0 },
        );

        runner.start().await.expect("runner should not fail");

        assert_eq!(transport.connect_attempts().await, 2);
        assert_eq!(transport.acknowledgements().await, vec!["env-1"]);
    }

    #[tokio::test]
    async fn exhausts_retries_without_crashing() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![
                Err(TransportError::Connect("fail-1".to_owned())),
                Err(TransportError::Connect("fail-2".to_owned())),
                Err(TransportError::Connect("fail-3".to_owned())),
            ],
            vec![],
        ));

        let runner = SocketModeRunner::new(
            transport.clone(),
            EventDispatcher::default(),
            ReconnectPolicy { max_retries: 2, base_delay_ms: 0, max_delay_ms: 0 },
        );

        runner.start().await.expect("runner should degrade gracefully");
        assert_eq!(transport.connect_attempts().await, 3);
    }

    #[tokio::test]
    async fn handler_responses_are_posted_through_the_responder() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(())],
            vec![Ok(Some(help_envelope("env-2"))), Ok(None)],
        ));
        let api = Arc::new(CapturingApi::default());

        let runner = SocketModeRunner::new(
            transport,
            crate::events::default_dispatcher(),
            ReconnectPolicy { max_retries: 0, base_delay_ms: 0, max_delay_ms: 0 },
        )
        .with_responder(api.clone());

        runner.start().await.expect("runner");

        let posts = api.posts.lock().await;
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].channel, "C1");
        assert_eq!(posts[0].text, "Confetti commands");
    }

    #[tokio::test]
    async fn responses_are_suppressed_without_a_responder() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(())],
            vec![Ok(Some(help_envelope("env-3"))), Ok(None)],
        ));

        let runner = SocketModeRunner::new(
            transport.clone(),
            crate::events::default_dispatcher(),
            ReconnectPolicy { max_retries: 0, base_delay_ms: 0, max_delay_ms: 0 },
        );

        runner.start().await.expect("runner completes without posting anywhere");
        assert_eq!(transport.acknowledgements().await, vec!["env-3"]);
    }
}
