//! Chat domain - the append-only message stream of a group.
//!
//! Text messages live alongside poll and election messages in the same
//! collection; the engine that resolves those lives in the polls domain.

pub mod models;

use std::collections::BTreeMap;

use tracing::debug;

use crate::common::{Actor, DomainError, DomainResult, GroupId, MessageId};
use crate::kernel::store::paths;
use crate::kernel::CoreDeps;
use models::{Message, TextMessage};

pub struct ChatService {
    deps: CoreDeps,
}

impl ChatService {
    pub fn new(deps: CoreDeps) -> Self {
        Self { deps }
    }

    /// Append a text message. Members only; empty messages are rejected.
    pub async fn send_message(
        &self,
        actor: &Actor,
        group_id: &GroupId,
        text: &str,
    ) -> DomainResult<MessageId> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DomainError::InvalidArgument(
                "message must not be empty".to_string(),
            ));
        }
        self.require_member(group_id, actor).await?;

        let message = Message::Text(TextMessage {
            sender_id: actor.user_id().clone(),
            text: text.to_string(),
            timestamp: self.deps.store.now(),
            read: BTreeMap::new(),
        });
        let key = self
            .deps
            .store
            .append(&paths::messages(group_id), serde_json::to_value(&message)?)
            .await?;
        debug!(group_id = %group_id, message_id = %key, "message sent");
        Ok(MessageId::from_key(key))
    }

    /// The group's message stream, oldest first.
    pub async fn messages(&self, group_id: &GroupId) -> DomainResult<Vec<(MessageId, Message)>> {
        let Some(value) = self.deps.store.read(&paths::messages(group_id)).await? else {
            return Ok(Vec::new());
        };
        let stream: BTreeMap<String, Message> = serde_json::from_value(value)?;
        let mut messages: Vec<(MessageId, Message)> = stream
            .into_iter()
            .map(|(key, message)| (MessageId::from_key(key), message))
            .collect();
        messages.sort_by_key(|(_, message)| message.sent_at());
        Ok(messages)
    }

    /// Flag a message as read by the actor. Re-marking is a no-op.
    pub async fn mark_read(
        &self,
        actor: &Actor,
        group_id: &GroupId,
        message_id: &MessageId,
    ) -> DomainResult<()> {
        self.deps
            .store
            .read(&paths::message(group_id, message_id))
            .await?
            .ok_or(DomainError::NotFound("message"))?;
        self.deps
            .store
            .write(
                &paths::message_read(group_id, message_id, actor.user_id()),
                serde_json::Value::Bool(true),
            )
            .await?;
        Ok(())
    }

    async fn require_member(&self, group_id: &GroupId, actor: &Actor) -> DomainResult<()> {
        let members = self
            .deps
            .store
            .read(&paths::members(group_id))
            .await?
            .ok_or(DomainError::NotFound("group"))?;
        if members.get(actor.user_id().as_str()).is_none() {
            return Err(DomainError::Forbidden("only group members can chat"));
        }
        Ok(())
    }
}
