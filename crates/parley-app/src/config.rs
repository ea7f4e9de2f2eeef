//! App configuration.

use std::time::Duration;

/// How long a toast stays visible.
pub const TOAST_TTL: Duration = Duration::from_secs(4);

/// Toasts kept at once. The oldest is dropped first.
pub const MAX_TOASTS: usize = 5;

/// App configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// How long a toast stays visible.
    pub toast_ttl: Duration,
    /// Toasts kept at once.
    pub max_toasts: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { toast_ttl: TOAST_TTL, max_toasts: MAX_TOASTS }
    }
}
