//! Client configuration.

/// Default number of history messages requested when a room is first opened.
pub const DEFAULT_HISTORY_PAGE_SIZE: u32 = 50;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// History messages requested when a room is first opened.
    pub history_page_size: u32,
    /// Push the cleared unread count to the REST API when a room is opened.
    pub mark_read_on_open: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { history_page_size: DEFAULT_HISTORY_PAGE_SIZE, mark_read_on_open: true }
    }
}
