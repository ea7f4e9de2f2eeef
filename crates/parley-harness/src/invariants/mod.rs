//! Reconciliation invariants checked during simulation.
//!
//! Each simulated client is captured as a [`ClientSnapshot`] after every
//! step. The registered [`Invariant`]s then look at one client at a time:
//! duplicate tokens, the open room's unread badge, and status histories that
//! must only move forward. Snapshots carry those histories across steps, so a
//! regression between two steps is caught even if the final state looks fine.
//!
//! ```ignore
//! let invariants = InvariantRegistry::standard();
//! let snapshot = ClientSnapshot::from_client(0, &client).with_history_from(previous.as_ref());
//! invariants.check_all(&SystemSnapshot::single(snapshot))?;
//! ```

mod checks;
mod snapshot;

pub use checks::{
    ActiveRoomInRooms, ActiveRoomNotUnread, AttachmentMonotonicity, MessageStatusMonotonicity,
    NoDuplicateTokens, UnreadMatchesForeignArrivals,
};
pub use snapshot::{ClientSnapshot, RoomSnapshot, SystemSnapshot};

/// Outcome of checking one invariant against a whole system.
pub type InvariantResult = Result<(), Violation>;

/// A client broke an invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Invariant that failed.
    pub invariant: &'static str,
    /// Snapshot id of the offending client.
    pub client: u64,
    /// What was observed.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] client {}: {}", self.invariant, self.client, self.message)
    }
}

impl std::error::Error for Violation {}

/// A property every client must satisfy after every step.
pub trait Invariant: Send + Sync {
    /// Name used in violation reports.
    fn name(&self) -> &'static str;

    /// Check a single client. `Err` describes what was observed.
    fn check_client(&self, client: &ClientSnapshot) -> Result<(), String>;

    /// Check every client, stopping at the first violation.
    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            self.check_client(client).map_err(|message| Violation {
                invariant: self.name(),
                client: client.id,
                message,
            })?;
        }
        Ok(())
    }
}

/// Set of invariants run together.
#[derive(Default)]
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl InvariantRegistry {
    /// Registry with no invariants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every reconciliation invariant:
    ///
    /// - [`NoDuplicateTokens`]
    /// - [`ActiveRoomInRooms`]
    /// - [`ActiveRoomNotUnread`]
    /// - [`MessageStatusMonotonicity`]
    /// - [`AttachmentMonotonicity`]
    /// - [`UnreadMatchesForeignArrivals`] (only where a model supplied counts)
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(NoDuplicateTokens);
        registry.add(ActiveRoomInRooms);
        registry.add(ActiveRoomNotUnread);
        registry.add(MessageStatusMonotonicity);
        registry.add(AttachmentMonotonicity);
        registry.add(UnreadMatchesForeignArrivals);
        registry
    }

    /// Register an invariant.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Names of the registered invariants, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.invariants.iter().map(|i| i.name()).collect()
    }

    /// Run every invariant. Collects one violation per failing invariant.
    pub fn check_all(&self, state: &SystemSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|i| i.check(state).err()).collect();
        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Run every invariant and panic with all violations and `context`.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, state: &SystemSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let report: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("{context}: {} invariant(s) broken\n  {}", report.len(), report.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
