//! In-memory platform fake used across the crate's tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;

use super::{
    ActionRow, CreateChannelRequest, InteractionResponder, MessageRef, Modal, OutboundMessage,
    Permission, Platform, PlatformError, TranscriptSink, UserRef,
};

#[derive(Default)]
pub struct FakeState {
    pub created_channels: Vec<CreateChannelRequest>,
    pub deleted_channels: Vec<String>,
    pub renamed_channels: Vec<(String, String)>,
    /// (channel id, message, assigned message id)
    pub sent: Vec<(String, OutboundMessage, String)>,
    pub edited_components: Vec<(String, String, Vec<ActionRow>)>,
    pub deleted_messages: Vec<(String, String)>,
    pub dms: Vec<(String, OutboundMessage)>,
    pub granted: Vec<(String, String, Vec<Permission>)>,
    pub revoked: Vec<(String, String)>,
    /// Channel contents returned by `fetch_recent_messages`.
    pub recent: HashMap<String, Vec<MessageRef>>,
    pub users: HashMap<String, UserRef>,
}

/// Scripted platform. Failure toggles make individual calls error so tests
/// can exercise compensation paths.
pub struct FakePlatform {
    pub state: Mutex<FakeState>,
    next_id: AtomicU64,
    pub fail_create_channel: AtomicBool,
    pub fail_send_dm: AtomicBool,
    /// Channels whose deletion reports not-found.
    pub missing_channels: Mutex<HashSet<String>>,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            next_id: AtomicU64::new(1),
            fail_create_channel: AtomicBool::new(false),
            fail_send_dm: AtomicBool::new(false),
            missing_channels: Mutex::new(HashSet::new()),
        }
    }
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn mint_id(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    pub fn add_user(&self, user: UserRef) {
        self.state.lock().unwrap().users.insert(user.id.clone(), user);
    }

    pub fn set_recent(&self, channel_id: &str, messages: Vec<MessageRef>) {
        self.state
            .lock()
            .unwrap()
            .recent
            .insert(channel_id.to_string(), messages);
    }

    /// Messages sent to one channel, in send order.
    pub fn sent_to(&self, channel_id: &str) -> Vec<OutboundMessage> {
        self.state
            .lock()
            .unwrap()
            .sent
            .iter()
            .filter(|(ch, _, _)| ch == channel_id)
            .map(|(_, msg, _)| msg.clone())
            .collect()
    }

    pub fn dms_to(&self, user_id: &str) -> Vec<OutboundMessage> {
        self.state
            .lock()
            .unwrap()
            .dms
            .iter()
            .filter(|(uid, _)| uid == user_id)
            .map(|(_, msg)| msg.clone())
            .collect()
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn create_channel(
        &self,
        request: CreateChannelRequest,
    ) -> Result<String, PlatformError> {
        if self.fail_create_channel.load(Ordering::SeqCst) {
            return Err(PlatformError::Api("channel create failed".to_string()));
        }
        let id = self.mint_id("chan-");
        self.state.lock().unwrap().created_channels.push(request);
        Ok(id)
    }

    async fn delete_channel(&self, channel_id: &str) -> Result<(), PlatformError> {
        if self.missing_channels.lock().unwrap().contains(channel_id) {
            return Err(PlatformError::NotFound(format!("Channel {channel_id}")));
        }
        self.state
            .lock()
            .unwrap()
            .deleted_channels
            .push(channel_id.to_string());
        Ok(())
    }

    async fn rename_channel(&self, channel_id: &str, name: &str) -> Result<(), PlatformError> {
        self.state
            .lock()
            .unwrap()
            .renamed_channels
            .push((channel_id.to_string(), name.to_string()));
        Ok(())
    }

    async fn send_message(
        &self,
        channel_id: &str,
        message: OutboundMessage,
    ) -> Result<String, PlatformError> {
        let id = self.mint_id("msg-");
        self.state
            .lock()
            .unwrap()
            .sent
            .push((channel_id.to_string(), message, id.clone()));
        Ok(id)
    }

    async fn edit_message_components(
        &self,
        channel_id: &str,
        message_id: &str,
        components: Vec<ActionRow>,
    ) -> Result<(), PlatformError> {
        self.state.lock().unwrap().edited_components.push((
            channel_id.to_string(),
            message_id.to_string(),
            components,
        ));
        Ok(())
    }

    async fn delete_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<(), PlatformError> {
        self.state
            .lock()
            .unwrap()
            .deleted_messages
            .push((channel_id.to_string(), message_id.to_string()));
        Ok(())
    }

    async fn fetch_recent_messages(
        &self,
        channel_id: &str,
        limit: u8,
    ) -> Result<Vec<MessageRef>, PlatformError> {
        let state = self.state.lock().unwrap();
        let mut messages = state.recent.get(channel_id).cloned().unwrap_or_default();
        messages.truncate(limit as usize);
        Ok(messages)
    }

    async fn fetch_user(&self, user_id: &str) -> Result<Option<UserRef>, PlatformError> {
        Ok(self.state.lock().unwrap().users.get(user_id).cloned())
    }

    async fn send_dm(
        &self,
        user_id: &str,
        message: OutboundMessage,
    ) -> Result<String, PlatformError> {
        if self.fail_send_dm.load(Ordering::SeqCst) {
            return Err(PlatformError::Forbidden("DMs closed".to_string()));
        }
        let id = self.mint_id("dm-");
        self.state
            .lock()
            .unwrap()
            .dms
            .push((user_id.to_string(), message));
        Ok(id)
    }

    async fn grant_channel_access(
        &self,
        channel_id: &str,
        user_id: &str,
        permissions: Vec<Permission>,
    ) -> Result<(), PlatformError> {
        self.state.lock().unwrap().granted.push((
            channel_id.to_string(),
            user_id.to_string(),
            permissions,
        ));
        Ok(())
    }

    async fn revoke_channel_access(
        &self,
        channel_id: &str,
        user_id: &str,
    ) -> Result<(), PlatformError> {
        self.state
            .lock()
            .unwrap()
            .revoked
            .push((channel_id.to_string(), user_id.to_string()));
        Ok(())
    }

    fn bot_user_id(&self) -> String {
        "bot".to_string()
    }
}

#[derive(Default)]
pub struct ResponderState {
    pub replies: Vec<(OutboundMessage, bool)>,
    pub deferred: Vec<bool>,
    pub edits: Vec<OutboundMessage>,
    pub follow_ups: Vec<(OutboundMessage, bool)>,
    pub modals: Vec<Modal>,
    pub updates: Vec<OutboundMessage>,
}

#[derive(Default)]
pub struct FakeResponder {
    pub state: Mutex<ResponderState>,
    acknowledged: AtomicBool,
}

impl FakeResponder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend an earlier handler already acknowledged the interaction.
    pub fn mark_acknowledged(&self) {
        self.acknowledged.store(true, Ordering::SeqCst);
    }

    pub fn replies(&self) -> Vec<(OutboundMessage, bool)> {
        self.state.lock().unwrap().replies.clone()
    }

    pub fn modals(&self) -> Vec<Modal> {
        self.state.lock().unwrap().modals.clone()
    }
}

#[async_trait]
impl InteractionResponder for FakeResponder {
    async fn reply(&self, message: OutboundMessage, ephemeral: bool) -> Result<(), PlatformError> {
        self.acknowledged.store(true, Ordering::SeqCst);
        self.state.lock().unwrap().replies.push((message, ephemeral));
        Ok(())
    }

    async fn defer(&self, ephemeral: bool) -> Result<(), PlatformError> {
        self.acknowledged.store(true, Ordering::SeqCst);
        self.state.lock().unwrap().deferred.push(ephemeral);
        Ok(())
    }

    async fn edit_reply(&self, message: OutboundMessage) -> Result<(), PlatformError> {
        self.state.lock().unwrap().edits.push(message);
        Ok(())
    }

    async fn follow_up(
        &self,
        message: OutboundMessage,
        ephemeral: bool,
    ) -> Result<(), PlatformError> {
        self.state
            .lock()
            .unwrap()
            .follow_ups
            .push((message, ephemeral));
        Ok(())
    }

    async fn open_modal(&self, modal: Modal) -> Result<(), PlatformError> {
        self.acknowledged.store(true, Ordering::SeqCst);
        self.state.lock().unwrap().modals.push(modal);
        Ok(())
    }

    async fn update_message(&self, message: OutboundMessage) -> Result<(), PlatformError> {
        self.acknowledged.store(true, Ordering::SeqCst);
        self.state.lock().unwrap().updates.push(message);
        Ok(())
    }

    fn acknowledged(&self) -> bool {
        self.acknowledged.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct FakeTranscripts {
    pub delivered: Mutex<Vec<(String, i64)>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl TranscriptSink for FakeTranscripts {
    async fn deliver(&self, channel_id: &str, ticket_number: i64) -> Result<(), PlatformError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PlatformError::Api("transcript failed".to_string()));
        }
        self.delivered
            .lock()
            .unwrap()
            .push((channel_id.to_string(), ticket_number));
        Ok(())
    }
}
