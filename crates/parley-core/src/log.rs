//! Per-room message log.
//!
//! The [`MessageLog`] is the reconciliation core: an append-only, ordered
//! list of messages indexed by correlation token. Optimistic entries are
//! inserted with [`MessageLog::push_local`]; when the server pushes a message
//! carrying a known token, [`MessageLog::reconcile`] replaces the entry in
//! place instead of appending a second copy.
//!
//! # Invariants
//!
//! - Every token appears at most once.
//! - `index[token]` is the position of that token in `entries`.
//! - Statuses (message and attachment) never regress.

use std::collections::{HashMap, HashSet};

use crate::{AttachmentUpdate, LogError, Message, MessageStatus, UniqueId};

/// Outcome of merging a server message into the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// Token was known; the entry at `index` was replaced in place.
    Confirmed {
        /// Position of the confirmed entry.
        index: usize,
    },
    /// Token was unknown; the message was appended at `index`.
    Appended {
        /// Position of the new entry.
        index: usize,
    },
}

impl Reconciled {
    /// Position of the affected entry.
    pub fn index(self) -> usize {
        match self {
            Self::Confirmed { index } | Self::Appended { index } => index,
        }
    }
}

/// Outcome of applying an attachment status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentChange {
    /// Status or path moved forward.
    Advanced,
    /// Report was stale or a duplicate.
    Unchanged,
}

/// Ordered message log for a single room.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    entries: Vec<Message>,
    index: HashMap<UniqueId, usize>,
}

impl MessageLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an optimistic local entry.
    ///
    /// Returns the entry's position. Fails if the token is already in use,
    /// since an in-flight message must own exactly one token.
    pub fn push_local(&mut self, message: Message) -> Result<usize, LogError> {
        if self.index.contains_key(&message.unique_id) {
            return Err(LogError::DuplicateUniqueId { unique_id: message.unique_id });
        }
        Ok(self.append(message))
    }

    /// Merge a message pushed by the server.
    pub fn reconcile(&mut self, message: Message) -> Reconciled {
        match self.index.get(&message.unique_id) {
            Some(&index) => {
                tracing::debug!(unique_id = %message.unique_id, index, "confirming local entry");
                self.entries[index].merge_confirmed(message);
                Reconciled::Confirmed { index }
            },
            None => {
                tracing::debug!(unique_id = %message.unique_id, "appending foreign message");
                Reconciled::Appended { index: self.append(message) }
            },
        }
    }

    /// Advance an entry to `Sent` on a bare acknowledgement.
    ///
    /// Returns `true` if the status changed.
    pub fn confirm(&mut self, unique_id: &UniqueId) -> Result<bool, LogError> {
        let &index = self
            .index
            .get(unique_id)
            .ok_or_else(|| LogError::MessageNotFound { unique_id: unique_id.clone() })?;

        let entry = &mut self.entries[index];
        let next = entry.status.advance(MessageStatus::Sent);
        let changed = next != entry.status;
        entry.status = next;
        Ok(changed)
    }

    /// Apply an attachment status report to its parent message.
    pub fn apply_attachment_status(
        &mut self,
        update: &AttachmentUpdate,
    ) -> Result<AttachmentChange, LogError> {
        let &index = self
            .index
            .get(&update.message_unique_id)
            .ok_or_else(|| LogError::MessageNotFound { unique_id: update.message_unique_id.clone() })?;

        let attachment = self.entries[index]
            .attachments
            .iter_mut()
            .find(|a| a.unique_id == update.attachment_unique_id)
            .ok_or_else(|| LogError::AttachmentNotFound {
                message_id: update.message_unique_id.clone(),
                attachment_id: update.attachment_unique_id.clone(),
            })?;

        if attachment.apply_update(update.status, update.file_path.as_deref()) {
            Ok(AttachmentChange::Advanced)
        } else {
            Ok(AttachmentChange::Unchanged)
        }
    }

    /// Drop an entry, e.g. a send the transport rejected.
    pub fn remove(&mut self, unique_id: &UniqueId) -> Option<Message> {
        let index = self.index.remove(unique_id)?;
        let removed = self.entries.remove(index);
        for position in self.index.values_mut() {
            if *position > index {
                *position -= 1;
            }
        }
        Some(removed)
    }

    /// Merge a page of fetched history.
    ///
    /// Unknown messages are placed ahead of the live entries, in the order
    /// they were fetched. Known tokens are reconciled in place. Returns the
    /// number of inserted messages.
    pub fn merge_history(&mut self, history: Vec<Message>) -> usize {
        let mut fresh = Vec::new();
        let mut seen = HashSet::new();

        for message in history {
            if let Some(&index) = self.index.get(&message.unique_id) {
                self.entries[index].merge_confirmed(message);
            } else if seen.insert(message.unique_id.clone()) {
                fresh.push(message);
            }
        }

        let inserted = fresh.len();
        if inserted > 0 {
            fresh.append(&mut self.entries);
            self.entries = fresh;
            self.rebuild_index();
        }
        inserted
    }

    /// Entry with the given token.
    pub fn get(&self, unique_id: &UniqueId) -> Option<&Message> {
        self.index.get(unique_id).map(|&i| &self.entries[i])
    }

    /// Whether an entry with the given token exists.
    pub fn contains(&self, unique_id: &UniqueId) -> bool {
        self.index.contains_key(unique_id)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter()
    }

    /// Entries as a slice.
    pub fn as_slice(&self) -> &[Message] {
        &self.entries
    }

    /// Most recent entry.
    pub fn last(&self) -> Option<&Message> {
        self.entries.last()
    }

    fn append(&mut self, message: Message) -> usize {
        let index = self.entries.len();
        self.index.insert(message.unique_id.clone(), index);
        self.entries.push(message);
        index
    }

    fn rebuild_index(&mut self) {
        self.index =
            self.entries.iter().enumerate().map(|(i, m)| (m.unique_id.clone(), i)).collect();
    }
}
