//! Command-line arguments and their mapping onto runtime configuration.

use std::time::Duration;

use clap::Parser;
use parley_app::AppConfig;
use parley_client::{ClientConfig, transport::TransportConfig};
use parley_core::{RoomId, UserId};
use thiserror::Error;

use crate::TerminalError;

/// Binary errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument rejected after parsing.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Terminal or transport failure.
    #[error(transparent)]
    Terminal(#[from] TerminalError),
}

/// Parley product chat client
#[derive(Parser, Debug, Clone)]
#[command(name = "parley")]
#[command(about = "Line-oriented client for Parley product chat")]
#[command(version)]
pub struct Args {
    /// WebSocket URL of the chat broker
    #[arg(short, long, default_value = "ws://127.0.0.1:8080/ws")]
    pub server: String,

    /// Base URL of the chat REST API
    #[arg(short, long, default_value = "http://127.0.0.1:8080/api/")]
    pub api: String,

    /// User to chat as
    #[arg(short, long)]
    pub user: String,

    /// Room to open once connected
    #[arg(short, long)]
    pub room: Option<String>,

    /// Messages fetched when a room is first opened
    #[arg(long, default_value_t = parley_client::DEFAULT_HISTORY_PAGE_SIZE)]
    pub history: u32,

    /// Seconds a notification stays visible
    #[arg(long, default_value_t = 4)]
    pub toast_secs: u64,

    /// Timeout for REST requests, in seconds
    #[arg(long, default_value_t = 10)]
    pub request_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Args {
    /// Signed-in user. Must not be blank.
    pub fn user_id(&self) -> Result<UserId, CliError> {
        let user = self.user.trim();
        if user.is_empty() {
            return Err(CliError::InvalidArgument("--user must not be empty".to_string()));
        }
        Ok(UserId::from(user))
    }

    /// Room to open on start, if any.
    pub fn initial_room(&self) -> Option<RoomId> {
        self.room.as_deref().map(str::trim).filter(|r| !r.is_empty()).map(RoomId::from)
    }

    /// Client settings.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig { history_page_size: self.history.max(1), ..ClientConfig::default() }
    }

    /// App settings.
    pub fn app_config(&self) -> AppConfig {
        AppConfig { toast_ttl: Duration::from_secs(self.toast_secs), ..AppConfig::default() }
    }

    /// Transport settings.
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..TransportConfig::default()
        }
    }
}
