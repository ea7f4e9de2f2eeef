//! In-memory broker and REST store for simulation.
//!
//! `SimBroker` plays the server side of the chat: it accepts client frames,
//! stamps and stores messages, fans them out to subscribed connections and
//! answers the REST queries (history, unread counts, room list).
//!
//! Faults are injected from a seeded RNG so a failing run can be replayed:
//!
//! - **reorder**: a connection's pending frames are shuffled on delivery
//! - **duplicate**: the sender receives its echo twice
//! - **drop**: a send is rejected with an error frame carrying its token
//! - **delayed attachments**: upload confirmations are held until released

use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use parley_client::{ApiError, ChatApi};
use parley_core::{
    AttachmentStatus, AttachmentUpdate, Message, MessageStatus, RoomId, RoomSummary, UniqueId,
    UserId,
};
use parley_proto::{ClientFrame, ServerFrame};
use rand::{Rng, RngCore, SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha8Rng;

use crate::sim_env::EPOCH_MILLIS;

/// Identifier of a simulated connection.
pub type ConnectionId = u64;

/// Fault injection probabilities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaultConfig {
    /// Probability that a delivery batch is shuffled.
    pub reorder: f64,
    /// Probability that an echo reaches its sender twice.
    pub duplicate: f64,
    /// Probability that a send is rejected.
    pub drop: f64,
    /// Hold attachment status updates until [`SimBroker::release_attachments`].
    pub delay_attachments: bool,
}

impl FaultConfig {
    /// Reliable, in-order broker.
    pub fn none() -> Self {
        Self { reorder: 0.0, duplicate: 0.0, drop: 0.0, delay_attachments: false }
    }

    /// Every fault enabled.
    pub fn chaos() -> Self {
        Self { reorder: 0.3, duplicate: 0.2, drop: 0.1, delay_attachments: true }
    }
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self::none()
    }
}

/// Frame addressed to a connection the broker does not know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownConnection(pub ConnectionId);

impl std::fmt::Display for UnknownConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown connection {}", self.0)
    }
}

impl std::error::Error for UnknownConnection {}

struct Connection {
    user_id: UserId,
    subscriptions: BTreeSet<RoomId>,
    inbox: VecDeque<ServerFrame>,
}

/// Simulated chat broker.
pub struct SimBroker {
    rng: ChaCha8Rng,
    faults: FaultConfig,
    /// Last server timestamp handed out. Strictly increasing.
    clock_millis: u64,
    next_connection: ConnectionId,
    connections: BTreeMap<ConnectionId, Connection>,
    history: BTreeMap<RoomId, Vec<Message>>,
    unread: BTreeMap<(UserId, RoomId), u32>,
    delayed: Vec<AttachmentUpdate>,
    rejected: BTreeSet<UniqueId>,
}

impl SimBroker {
    /// Create a broker with the given seed and faults.
    pub fn new(seed: u64, faults: FaultConfig) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            faults,
            clock_millis: EPOCH_MILLIS,
            next_connection: 1,
            connections: BTreeMap::new(),
            history: BTreeMap::new(),
            unread: BTreeMap::new(),
            delayed: Vec::new(),
            rejected: BTreeSet::new(),
        }
    }

    /// Change fault probabilities mid-run.
    pub fn set_faults(&mut self, faults: FaultConfig) {
        self.faults = faults;
    }

    /// Open a connection for `user_id`.
    pub fn connect(&mut self, user_id: impl Into<UserId>) -> ConnectionId {
        let id = self.next_connection;
        self.next_connection += 1;
        self.connections.insert(
            id,
            Connection {
                user_id: user_id.into(),
                subscriptions: BTreeSet::new(),
                inbox: VecDeque::new(),
            },
        );
        id
    }

    /// Close a connection. Undelivered frames are lost.
    pub fn disconnect(&mut self, id: ConnectionId) {
        self.connections.remove(&id);
    }

    /// Whether `id` is an open connection.
    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Handle a frame sent by a connection.
    pub fn receive(&mut self, id: ConnectionId, frame: ClientFrame) -> Result<(), UnknownConnection> {
        let conn = self.connections.get_mut(&id).ok_or(UnknownConnection(id))?;

        match frame {
            ClientFrame::JoinRoom { room_id } => {
                conn.subscriptions.insert(room_id);
            },
            ClientFrame::LeaveRoom { room_id } => {
                conn.subscriptions.remove(&room_id);
            },
            ClientFrame::SendMessage { room_id, content, attachments, unique_id } => {
                let user_id = conn.user_id.clone();

                if let Some(existing) = self.find(&room_id, &unique_id).cloned() {
                    // Retransmission: echo the stored copy to the sender only
                    self.push(id, ServerFrame::Message(existing));
                    return Ok(());
                }

                if self.roll(self.faults.drop) {
                    tracing::debug!(unique_id = %unique_id, "broker dropped send");
                    self.rejected.insert(unique_id.clone());
                    self.push(id, ServerFrame::Error {
                        unique_id: Some(unique_id),
                        message: "message rejected by broker".to_string(),
                    });
                    return Ok(());
                }

                let message = Message {
                    unique_id,
                    room_id,
                    user_id,
                    content,
                    attachments,
                    status: MessageStatus::Sent,
                    created_at: self.tick(),
                };
                self.publish(message, Some(id));
            },
        }
        Ok(())
    }

    /// Post a message as a user with no simulated connection.
    pub fn post_as(
        &mut self,
        user_id: impl Into<UserId>,
        room_id: impl Into<RoomId>,
        content: impl Into<String>,
    ) -> Message {
        let unique_id = UniqueId::new(format!("srv-{:016x}", self.rng.next_u64()));
        let message = Message {
            unique_id,
            room_id: room_id.into(),
            user_id: user_id.into(),
            content: content.into(),
            attachments: Vec::new(),
            status: MessageStatus::Sent,
            created_at: self.tick(),
        };
        self.publish(message.clone(), None);
        message
    }

    /// Queue an arbitrary frame for a connection.
    pub fn push_frame(&mut self, id: ConnectionId, frame: ServerFrame) {
        self.push(id, frame);
    }

    /// Drain the frames waiting for a connection.
    pub fn take_inbox(&mut self, id: ConnectionId) -> Vec<ServerFrame> {
        let Some(conn) = self.connections.get_mut(&id) else {
            return Vec::new();
        };
        let mut frames: Vec<_> = conn.inbox.drain(..).collect();

        let reorder = self.faults.reorder;
        if frames.len() > 1 && reorder > 0.0 && self.rng.gen_bool(reorder.clamp(0.0, 1.0)) {
            frames.shuffle(&mut self.rng);
        }
        frames
    }

    /// Frames waiting for a connection.
    pub fn pending_frames(&self, id: ConnectionId) -> usize {
        self.connections.get(&id).map_or(0, |c| c.inbox.len())
    }

    /// Deliver every held attachment status update.
    pub fn release_attachments(&mut self) {
        for update in std::mem::take(&mut self.delayed) {
            self.deliver_attachment(update);
        }
    }

    /// Attachment updates currently held back.
    pub fn delayed_attachments(&self) -> usize {
        self.delayed.len()
    }

    /// Most recent `limit` messages of a room, oldest first.
    pub fn fetch_history(&self, room_id: &RoomId, limit: u32) -> Vec<Message> {
        let messages = self.room_history(room_id);
        let skip = messages.len().saturating_sub(limit as usize);
        messages[skip..].to_vec()
    }

    /// Every stored message of a room, in broker order.
    pub fn room_history(&self, room_id: &RoomId) -> &[Message] {
        self.history.get(room_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Store a user's unread count for a room.
    pub fn update_unread(&mut self, user_id: &UserId, room_id: &RoomId, unread_count: u32) {
        self.unread.insert((user_id.clone(), room_id.clone()), unread_count);
    }

    /// Server-side unread count.
    pub fn unread_for(&self, user_id: &UserId, room_id: &RoomId) -> u32 {
        self.unread.get(&(user_id.clone(), room_id.clone())).copied().unwrap_or(0)
    }

    /// Room list for a user.
    pub fn summaries(&self, user_id: &UserId) -> Vec<RoomSummary> {
        self.history
            .iter()
            .map(|(room_id, messages)| {
                let mut summary = RoomSummary::new(room_id.clone());
                if let Some(last) = messages.last() {
                    summary.record(last);
                }
                summary.unread_count = self.unread_for(user_id, room_id);
                summary
            })
            .collect()
    }

    /// Whether the broker rejected a send with this token.
    pub fn was_rejected(&self, unique_id: &UniqueId) -> bool {
        self.rejected.contains(unique_id)
    }

    fn roll(&mut self, probability: f64) -> bool {
        probability > 0.0 && self.rng.gen_bool(probability.clamp(0.0, 1.0))
    }

    fn tick(&mut self) -> u64 {
        self.clock_millis += 1;
        self.clock_millis
    }

    fn push(&mut self, id: ConnectionId, frame: ServerFrame) {
        if let Some(conn) = self.connections.get_mut(&id) {
            conn.inbox.push_back(frame);
        }
    }

    fn find(&self, room_id: &RoomId, unique_id: &UniqueId) -> Option<&Message> {
        self.history.get(room_id)?.iter().find(|m| &m.unique_id == unique_id)
    }

    fn publish(&mut self, message: Message, sender: Option<ConnectionId>) {
        let room_id = message.room_id.clone();
        self.history.entry(room_id.clone()).or_default().push(message.clone());

        let readers: BTreeSet<UserId> = self
            .connections
            .values()
            .map(|c| c.user_id.clone())
            .filter(|u| u != &message.user_id)
            .collect();
        for user_id in readers {
            *self.unread.entry((user_id, room_id.clone())).or_insert(0) += 1;
        }

        let recipients: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(id, c)| c.subscriptions.contains(&room_id) || Some(**id) == sender)
            .map(|(id, _)| *id)
            .collect();

        for id in recipients {
            self.push(id, ServerFrame::Message(message.clone()));
            if Some(id) == sender && self.roll(self.faults.duplicate) {
                self.push(id, ServerFrame::Message(message.clone()));
            }
        }

        for attachment in &message.attachments {
            let update = AttachmentUpdate {
                message_unique_id: message.unique_id.clone(),
                attachment_unique_id: attachment.unique_id.clone(),
                status: AttachmentStatus::Uploaded,
                file_path: Some(format!(
                    "/uploads/{room_id}/{}/{}",
                    attachment.unique_id, attachment.file_name
                )),
            };
            if self.faults.delay_attachments {
                self.delayed.push(update);
            } else {
                self.deliver_attachment(update);
            }
        }
    }

    fn deliver_attachment(&mut self, update: AttachmentUpdate) {
        let Some(message) = self
            .history
            .values_mut()
            .flat_map(|messages| messages.iter_mut())
            .find(|m| m.unique_id == update.message_unique_id)
        else {
            return;
        };

        if let Some(attachment) =
            message.attachments.iter_mut().find(|a| a.unique_id == update.attachment_unique_id)
        {
            attachment.apply_update(update.status, update.file_path.as_deref());
        }

        let room_id = message.room_id.clone();
        let author = message.user_id.clone();
        let recipients: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, c)| c.subscriptions.contains(&room_id) || c.user_id == author)
            .map(|(id, _)| *id)
            .collect();

        for id in recipients {
            self.push(id, ServerFrame::AttachmentStatus(update.clone()));
        }
    }
}

/// Broker shared between simulated drivers and REST clients.
pub type SharedSimBroker = Arc<Mutex<SimBroker>>;

/// Create a shared broker.
pub fn create_shared_broker(seed: u64, faults: FaultConfig) -> SharedSimBroker {
    Arc::new(Mutex::new(SimBroker::new(seed, faults)))
}

/// [`ChatApi`] answered by a [`SimBroker`] on behalf of one user.
#[derive(Clone)]
pub struct MemoryApi {
    broker: SharedSimBroker,
    user_id: UserId,
    failing: Arc<AtomicBool>,
}

impl MemoryApi {
    /// REST client for `user_id`.
    pub fn new(broker: SharedSimBroker, user_id: impl Into<UserId>) -> Self {
        Self { broker, user_id: user_id.into(), failing: Arc::new(AtomicBool::new(false)) }
    }

    /// Make every request fail until turned off again.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), ApiError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ApiError::Status { status: 503, reason: "simulated outage".to_string() });
        }
        Ok(())
    }
}

#[async_trait]
impl ChatApi for MemoryApi {
    async fn fetch_history(&self, room_id: &RoomId, limit: u32) -> Result<Vec<Message>, ApiError> {
        self.check()?;
        let broker = self.broker.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(broker.fetch_history(room_id, limit))
    }

    async fn update_unread(&self, room_id: &RoomId, unread_count: u32) -> Result<(), ApiError> {
        self.check()?;
        let mut broker = self.broker.lock().unwrap_or_else(PoisonError::into_inner);
        broker.update_unread(&self.user_id, room_id, unread_count);
        Ok(())
    }

    async fn fetch_summaries(&self) -> Result<Vec<RoomSummary>, ApiError> {
        self.check()?;
        let broker = self.broker.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(broker.summaries(&self.user_id))
    }
}
