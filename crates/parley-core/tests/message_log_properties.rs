//! Property-based tests for the message log.
//!
//! Arbitrary interleavings of local sends, server echoes, foreign messages
//! and attachment reports must leave exactly one entry per token, with
//! statuses that never move backwards.

use std::collections::{HashMap, HashSet};

use parley_core::{
    Attachment, AttachmentStatus, AttachmentUpdate, Message, MessageLog, MessageStatus, UniqueId,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    SendLocal(u8),
    Echo(u8),
    Foreign(u8),
    Uploaded(u8),
    StaleUploading(u8),
    Remove(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..16).prop_map(Op::SendLocal),
        3 => (0u8..16).prop_map(Op::Echo),
        2 => (16u8..32).prop_map(Op::Foreign),
        2 => (0u8..16).prop_map(Op::Uploaded),
        1 => (0u8..16).prop_map(Op::StaleUploading),
        1 => (0u8..32).prop_map(Op::Remove),
    ]
}

fn token(n: u8) -> UniqueId {
    UniqueId::new(format!("msg-{n}"))
}

fn attachment_token(n: u8) -> UniqueId {
    UniqueId::new(format!("att-{n}"))
}

fn message(n: u8, status: MessageStatus, user: &str) -> Message {
    Message {
        unique_id: token(n),
        room_id: "room".into(),
        user_id: user.into(),
        content: format!("body {n}"),
        attachments: vec![Attachment::uploading(attachment_token(n), "f.bin", "application/octet-stream", 8)],
        status,
        created_at: u64::from(n),
    }
}

fn update(n: u8, status: AttachmentStatus) -> AttachmentUpdate {
    AttachmentUpdate {
        message_unique_id: token(n),
        attachment_unique_id: attachment_token(n),
        status,
        file_path: (status == AttachmentStatus::Uploaded).then(|| format!("/files/{n}")),
    }
}

proptest! {
    #[test]
    fn prop_one_entry_per_token(ops in prop::collection::vec(op_strategy(), 0..80)) {
        let mut log = MessageLog::new();
        let mut message_status: HashMap<UniqueId, MessageStatus> = HashMap::new();
        let mut attachment_status: HashMap<UniqueId, AttachmentStatus> = HashMap::new();

        for op in ops {
            match op {
                Op::SendLocal(n) => {
                    let _ = log.push_local(message(n, MessageStatus::Sending, "me"));
                },
                Op::Echo(n) => {
                    let before = log.len();
                    let outcome = log.reconcile(message(n, MessageStatus::Sent, "me"));
                    if matches!(outcome, parley_core::Reconciled::Confirmed { .. }) {
                        prop_assert_eq!(log.len(), before);
                    } else {
                        prop_assert_eq!(log.len(), before + 1);
                    }
                },
                Op::Foreign(n) => {
                    log.reconcile(message(n, MessageStatus::Sent, "other"));
                },
                Op::Uploaded(n) => {
                    let _ = log.apply_attachment_status(&update(n, AttachmentStatus::Uploaded));
                },
                Op::StaleUploading(n) => {
                    let _ = log.apply_attachment_status(&update(n, AttachmentStatus::Uploading));
                },
                Op::Remove(n) => {
                    let removed = log.remove(&token(n));
                    if removed.is_some() {
                        message_status.remove(&token(n));
                        attachment_status.remove(&attachment_token(n));
                    }
                },
            }

            let tokens: HashSet<_> = log.iter().map(|m| m.unique_id.clone()).collect();
            prop_assert_eq!(tokens.len(), log.len());

            for entry in log.iter() {
                prop_assert_eq!(log.get(&entry.unique_id), Some(entry));

                let previous = message_status.insert(entry.unique_id.clone(), entry.status);
                prop_assert!(previous.is_none_or(|p| p <= entry.status));

                for attachment in &entry.attachments {
                    let previous =
                        attachment_status.insert(attachment.unique_id.clone(), attachment.status);
                    prop_assert!(previous.is_none_or(|p| p <= attachment.status));
                }
            }
        }
    }

    #[test]
    fn prop_history_never_duplicates(
        live in prop::collection::vec(0u8..20, 0..10),
        history in prop::collection::vec(0u8..20, 0..20),
    ) {
        let mut log = MessageLog::new();
        for n in &live {
            let _ = log.push_local(message(*n, MessageStatus::Sending, "me"));
        }

        let page: Vec<_> = history.iter().map(|n| message(*n, MessageStatus::Sent, "other")).collect();
        log.merge_history(page);

        let expected: HashSet<_> = live.iter().chain(history.iter()).copied().collect();
        prop_assert_eq!(log.len(), expected.len());
    }
}

#[test]
fn echo_after_local_send_leaves_single_sent_entry() {
    let mut log = MessageLog::new();
    assert!(log.push_local(message(1, MessageStatus::Sending, "me")).is_ok());
    log.reconcile(message(1, MessageStatus::Sent, "me"));
    log.reconcile(message(1, MessageStatus::Sent, "me"));

    assert_eq!(log.len(), 1);
    assert_eq!(log.last().map(|m| m.status), Some(MessageStatus::Sent));
}
