//! Plain-text rendering of the App view model.
//!
//! Pure: takes the [`App`] and returns the text the terminal driver prints.

use std::fmt::Write;

use parley_app::{App, ConnectionState, RoomView};
use parley_core::{Attachment, AttachmentStatus, Message, MessageStatus};

/// Render the whole view.
pub fn render(app: &App) -> String {
    let mut out = String::new();

    let state = match app.connection_state() {
        ConnectionState::Disconnected => "disconnected",
        ConnectionState::Connecting => "connecting",
        ConnectionState::Connected => "connected",
    };
    let _ = writeln!(
        out,
        "== {} @ {} [{state}] unread: {} ==",
        app.user_id(),
        app.server_url(),
        app.total_unread()
    );

    for room in app.room_list() {
        render_room_entry(&mut out, room, app.active_room() == Some(room.room_id()));
    }

    match app.active_room_view() {
        Some(room) => {
            match room.pending_count() {
                0 => {
                    let _ = writeln!(out, "--- {} ---", room.room_id());
                },
                n => {
                    let _ = writeln!(out, "--- {} ({n} sending) ---", room.room_id());
                },
            }
            for message in &room.messages {
                render_message(&mut out, message);
            }
        },
        None => out.push_str("(no room open: /open <room>)\n"),
    }

    let pending = app.pending_attachments();
    if !pending.is_empty() {
        let names: Vec<_> = pending.iter().map(|a| a.file_name.as_str()).collect();
        let _ = writeln!(out, "attached: {}", names.join(", "));
    }

    for toast in app.toasts() {
        let _ = writeln!(out, "! {}", toast.message);
    }

    out
}

fn render_room_entry(out: &mut String, room: &RoomView, active: bool) {
    let marker = if active { '*' } else { ' ' };
    let _ = write!(out, "{marker} {} ({})", room.room_id(), room.unread_count());
    if let Some(preview) = &room.summary.last_message {
        let _ = write!(out, " {preview}");
    }
    out.push('\n');
}

fn render_message(out: &mut String, message: &Message) {
    let _ = write!(out, "{}: {}", message.user_id, message.content);
    if message.status == MessageStatus::Sending {
        out.push_str(" (sending)");
    }
    out.push('\n');

    for attachment in &message.attachments {
        render_attachment(out, attachment);
    }
}

fn render_attachment(out: &mut String, attachment: &Attachment) {
    let status = match attachment.status {
        AttachmentStatus::Uploading => "uploading",
        AttachmentStatus::Uploaded => "uploaded",
    };
    let _ = write!(out, "    [{}, {} bytes] {status}", attachment.file_name, attachment.file_size);
    if let Some(path) = &attachment.file_path {
        let _ = write!(out, " {path}");
    }
    out.push('\n');
}
