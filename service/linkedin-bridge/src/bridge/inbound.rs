//! Realtime events to host events.

use super::convert::{chat_info, convert_message, event_sender};
use super::host::{BridgeState, EventSender, HostBridge, RemoteEvent};
use crate::attributed::HtmlConverter;
use crate::client::Client;
use crate::error::{LinkedInError, Result};
use crate::model::{Message, ReactionSummary, RenderFormat, SeenReceipt, TypingIndicator};
use crate::realtime::{DecoratedEvent, RealtimeEvent, RealtimeHandler};
use crate::urn::Urn;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const TYPING_TIMEOUT: Duration = Duration::from_secs(10);

/// What the realtime handler hands to the dispatcher task.
#[derive(Debug)]
pub(crate) enum Inbound {
    Event(DecoratedEvent),
    State(BridgeState),
}

/// Realtime callbacks run on the read task, so they only enqueue.
pub(crate) struct ForwardingHandler {
    tx: mpsc::UnboundedSender<Inbound>,
}

impl ForwardingHandler {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Inbound>) -> Self {
        Self { tx }
    }

    fn forward(&self, inbound: Inbound) {
        if self.tx.send(inbound).is_err() {
            debug!("dispatcher gone; dropping realtime callback");
        }
    }
}

impl RealtimeHandler for ForwardingHandler {
    fn on_client_connection(&self, _id: &str) {
        self.forward(Inbound::State(BridgeState::Connected));
    }

    fn on_decorated_event(&self, event: DecoratedEvent) {
        self.forward(Inbound::Event(event));
    }

    fn on_transient_disconnect(&self, error: &LinkedInError) {
        self.forward(Inbound::State(BridgeState::TransientDisconnect(
            error.to_string(),
        )));
    }

    fn on_bad_credentials(&self, error: &LinkedInError) {
        self.forward(Inbound::State(BridgeState::BadCredentials(error.to_string())));
    }

    fn on_unknown_error(&self, error: &LinkedInError) {
        self.forward(Inbound::State(BridgeState::UnknownError(error.to_string())));
    }
}

pub(crate) struct Dispatcher {
    client: Client,
    host: Arc<dyn HostBridge>,
    converter: Arc<dyn HtmlConverter>,
    own: Urn,
}

impl Dispatcher {
    pub(crate) fn new(
        client: Client,
        host: Arc<dyn HostBridge>,
        converter: Arc<dyn HtmlConverter>,
        own: Urn,
    ) -> Self {
        Self {
            client,
            host,
            converter,
            own,
        }
    }

    pub(crate) async fn run(self, mut rx: mpsc::UnboundedReceiver<Inbound>, cancel: CancellationToken) {
        loop {
            let inbound = tokio::select! {
                _ = cancel.cancelled() => break,
                inbound = rx.recv() => match inbound {
                    Some(inbound) => inbound,
                    None => break,
                },
            };
            match inbound {
                Inbound::State(state) => self.handle_state(state).await,
                Inbound::Event(event) => {
                    let id = event.id.clone();
                    if let Err(err) = self.handle_event(event).await {
                        warn!(event = %id, error = %err, "failed to handle realtime event");
                    }
                }
            }
        }
        debug!("inbound dispatcher stopped");
    }

    async fn handle_state(&self, state: BridgeState) {
        if let BridgeState::BadCredentials(reason) = &state {
            info!(%reason, "session invalidated; persisting cleared login");
            self.host.save_login(&self.client.session().metadata()).await;
        }
        self.host.update_state(state).await;
    }

    pub(crate) async fn handle_event(&self, event: DecoratedEvent) -> Result<()> {
        match event.event {
            RealtimeEvent::Message(message) => self.handle_message(*message).await,
            RealtimeEvent::ConversationsChanged => self.resync_conversations().await?,
            RealtimeEvent::ConversationDeleted(conversation) => {
                self.queue(RemoteEvent::ChatDelete { conversation }).await
            }
            RealtimeEvent::TypingIndicator(typing) => self.handle_typing(typing).await,
            RealtimeEvent::SeenReceipt(receipt) => self.handle_seen_receipt(receipt).await,
            RealtimeEvent::ReactionSummary(reaction) => self.handle_reaction(reaction).await,
            RealtimeEvent::Ignored => debug!(topic = %event.topic, "ignoring realtime event"),
        }
        Ok(())
    }

    async fn queue(&self, event: RemoteEvent) {
        debug!(kind = event.kind(), "queueing remote event");
        self.host.queue_remote_event(event).await;
    }

    fn sender(&self, urn: &Urn) -> EventSender {
        EventSender {
            sender: urn.clone(),
            is_from_me: urn == &self.own,
        }
    }

    async fn handle_message(&self, message: Message) {
        let Some(conversation) = message.conversation_urn().cloned() else {
            warn!(message = %message.entity_urn, "message event without a conversation");
            return;
        };
        let format = &message.message_body_render_format;
        if matches!(format, RenderFormat::System | RenderFormat::Unknown(_)) {
            debug!(message = %message.entity_urn, format = format.as_str(), "dropping message");
            return;
        }

        let event = match format {
            RenderFormat::Recalled => event_sender(&message.sender, &self.own).map(|sender| {
                RemoteEvent::MessageRemove {
                    conversation: conversation.clone(),
                    target: message.entity_urn.clone(),
                    sender,
                }
            }),
            _ => convert_message(&message, &self.own, self.converter.as_ref()).map(|converted| {
                if matches!(format, RenderFormat::Edited) {
                    RemoteEvent::Edit {
                        conversation: conversation.clone(),
                        target: message.entity_urn.clone(),
                        message: converted,
                    }
                } else {
                    RemoteEvent::Message {
                        conversation: conversation.clone(),
                        message: converted,
                    }
                }
            }),
        };
        let Some(event) = event else {
            warn!(message = %message.entity_urn, "message event without a sender");
            return;
        };

        self.queue(RemoteEvent::ChatResync {
            conversation,
            info: None,
        })
        .await;
        self.queue(event).await;
    }

    async fn resync_conversations(&self) -> Result<()> {
        let page = self.client.get_conversations().await?;
        debug!(count = page.conversations.len(), "conversations changed");
        for conversation in page.conversations {
            let event = if conversation.is_spam() || !conversation.has_participant(&self.own) {
                RemoteEvent::ChatDelete {
                    conversation: conversation.entity_urn.clone(),
                }
            } else {
                RemoteEvent::ChatResync {
                    conversation: conversation.entity_urn.clone(),
                    info: Some(chat_info(&conversation, &self.own)),
                }
            };
            self.queue(event).await;
        }
        Ok(())
    }

    async fn handle_typing(&self, typing: TypingIndicator) {
        let Some(typist) = typing.typist() else {
            return;
        };
        if typist == &self.own {
            return;
        }
        self.queue(RemoteEvent::Typing {
            conversation: typing.conversation_urn().clone(),
            sender: self.sender(typist),
            timeout: TYPING_TIMEOUT,
        })
        .await;
    }

    async fn handle_seen_receipt(&self, receipt: SeenReceipt) {
        let Some(seen_by) = receipt.seen_by() else {
            return;
        };
        let Some(stored) = self.host.get_message(receipt.message_urn()).await else {
            debug!(message = %receipt.message_urn(), "seen receipt for unknown message");
            return;
        };
        self.queue(RemoteEvent::ReadReceipt {
            conversation: stored.conversation,
            sender: self.sender(seen_by),
            target: receipt.message_urn().clone(),
            read_at: receipt.seen_at,
        })
        .await;
    }

    async fn handle_reaction(&self, reaction: ReactionSummary) {
        let conversation = self
            .host
            .get_message(&reaction.message_urn)
            .await
            .map(|stored| stored.conversation);
        let sender = self.sender(&reaction.actor_urn);
        let emoji = reaction.emoji().to_string();
        let event = if reaction.reaction_added {
            RemoteEvent::Reaction {
                conversation,
                target: reaction.message_urn,
                sender,
                emoji,
            }
        } else {
            RemoteEvent::ReactionRemove {
                conversation,
                target: reaction.message_urn,
                sender,
                emoji,
            }
        };
        self.queue(event).await;
    }
}
