//! Fuzz target for the per-room message log
//!
//! # Strategy
//!
//! - Tokens drawn from a small pool so echoes, duplicates and history pages
//!   collide with optimistic entries
//! - Server echoes, acks, attachment reports and history merges in any order
//!
//! # Invariants
//!
//! - A token appears at most once in the log
//! - Message status never moves back from `Sent`
//! - Attachment status never moves back from `Uploaded`

#![no_main]

use std::collections::{HashMap, HashSet};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use parley_core::{
    Attachment, AttachmentStatus, AttachmentUpdate, Message, MessageLog, MessageStatus, UniqueId,
};

#[derive(Debug, Clone, Arbitrary)]
enum LogOp {
    PushLocal { token: u8, attachments: u8 },
    Echo { token: u8, attachments: u8, uploaded: bool },
    Ack { token: u8 },
    Attachment { token: u8, attachment: u8, uploaded: bool },
    History { tokens: Vec<u8> },
    Remove { token: u8 },
}

fn token(n: u8) -> UniqueId {
    UniqueId::new(format!("t{}", n % 16))
}

fn attachment_id(message: u8, n: u8) -> UniqueId {
    UniqueId::new(format!("t{}-a{}", message % 16, n % 4))
}

fn message(n: u8, attachments: u8, status: MessageStatus, uploaded: bool) -> Message {
    Message {
        unique_id: token(n),
        room_id: "fuzz".into(),
        user_id: "u".into(),
        content: format!("m{n}"),
        attachments: (0..attachments % 4)
            .map(|i| {
                let mut a = Attachment::uploading(attachment_id(n, i), "f", "t", 1);
                if uploaded {
                    a.apply_update(AttachmentStatus::Uploaded, Some("/p"));
                }
                a
            })
            .collect(),
        status,
        created_at: u64::from(n),
    }
}

fuzz_target!(|ops: Vec<LogOp>| {
    let mut log = MessageLog::new();
    let mut sent: HashSet<UniqueId> = HashSet::new();
    let mut uploaded: HashSet<UniqueId> = HashSet::new();

    for op in ops {
        match op {
            LogOp::PushLocal { token: n, attachments } => {
                let _ = log.push_local(message(n, attachments, MessageStatus::Sending, false));
            },
            LogOp::Echo { token: n, attachments, uploaded: up } => {
                log.reconcile(message(n, attachments, MessageStatus::Sent, up));
            },
            LogOp::Ack { token: n } => {
                let _ = log.confirm(&token(n));
            },
            LogOp::Attachment { token: n, attachment, uploaded: up } => {
                let status =
                    if up { AttachmentStatus::Uploaded } else { AttachmentStatus::Uploading };
                let _ = log.apply_attachment_status(&AttachmentUpdate {
                    message_unique_id: token(n),
                    attachment_unique_id: attachment_id(n, attachment),
                    status,
                    file_path: up.then(|| "/p".to_string()),
                });
            },
            LogOp::History { tokens } => {
                let page = tokens.iter().map(|&n| message(n, 1, MessageStatus::Sent, false)).collect();
                log.merge_history(page);
            },
            LogOp::Remove { token: n } => {
                if let Some(removed) = log.remove(&token(n)) {
                    sent.remove(&removed.unique_id);
                    for a in &removed.attachments {
                        uploaded.remove(&a.unique_id);
                    }
                }
            },
        }

        let mut counts: HashMap<&UniqueId, usize> = HashMap::new();
        for entry in log.iter() {
            *counts.entry(&entry.unique_id).or_default() += 1;

            if sent.contains(&entry.unique_id) {
                assert_eq!(entry.status, MessageStatus::Sent, "status regressed");
            }
            for a in &entry.attachments {
                if uploaded.contains(&a.unique_id) {
                    assert_eq!(a.status, AttachmentStatus::Uploaded, "attachment regressed");
                }
            }
        }
        assert!(counts.values().all(|&c| c == 1), "duplicate token in log");

        for entry in log.iter() {
            if entry.status == MessageStatus::Sent {
                sent.insert(entry.unique_id.clone());
            }
            for a in &entry.attachments {
                if a.status == AttachmentStatus::Uploaded {
                    uploaded.insert(a.unique_id.clone());
                }
            }
        }
    }
});
