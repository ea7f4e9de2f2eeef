//! Property tests for the App view model fed through the Bridge.
//!
//! Operation sequences are generated by proptest and replayed against an
//! `App` + `Bridge` pair wired synchronously to a faulty `SimBroker`. After
//! each operation the App's rooms must mirror the client's logs and the
//! standard invariants must hold with status history carried across steps.

use parley_app::{ApiRequest, ApiResponse, App, AppAction, AppEvent, Bridge};
use parley_core::{AttachmentStatus, MessageStatus, UserId};
use parley_harness::{
    ClientSnapshot, ConnectionId, FaultConfig, InvariantRegistry, SimBroker, SimEnv,
    SystemSnapshot,
};
use proptest::prelude::*;

const ROOMS: [&str; 3] = ["product-1", "product-2", "product-3"];

#[derive(Debug, Clone)]
enum Op {
    Open(usize),
    Close,
    Say(String),
    Attach(String),
    ForeignPost(usize),
    Deliver,
    ReleaseUploads,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => (0..ROOMS.len()).prop_map(Op::Open),
        1 => Just(Op::Close),
        4 => "[a-z]{1,12}".prop_map(Op::Say),
        1 => "[a-z]{1,8}".prop_map(|name| Op::Attach(format!("{name}.png"))),
        2 => (0..ROOMS.len()).prop_map(Op::ForeignPost),
        4 => Just(Op::Deliver),
        1 => Just(Op::ReleaseUploads),
    ]
}

struct Harness {
    app: App,
    bridge: Bridge<SimEnv>,
    broker: SimBroker,
    conn: ConnectionId,
    user_id: UserId,
    previous: Option<ClientSnapshot>,
}

impl Harness {
    fn new(seed: u64) -> Self {
        let mut broker = SimBroker::new(seed, FaultConfig::chaos());
        let conn = broker.connect("alice");
        let mut harness = Self {
            app: App::new("sim://broker", "alice"),
            bridge: Bridge::new(SimEnv::with_seed(seed), "alice"),
            broker,
            conn,
            user_id: "alice".into(),
            previous: None,
        };
        let events = harness.bridge.handle_connected();
        harness.flush(events);
        harness.feed(AppEvent::Connected);
        harness
    }

    fn input(&mut self, line: &str) {
        self.feed(AppEvent::Input(line.to_string()));
    }

    fn feed(&mut self, event: AppEvent) {
        let actions = self.app.handle(event);
        self.run(actions);
    }

    fn run(&mut self, actions: Vec<AppAction>) {
        for action in actions {
            match action {
                AppAction::Render | AppAction::Quit | AppAction::Connect { .. } => {},
                other => {
                    let events = self.bridge.process_app_action(other);
                    self.flush(events);
                },
            }
        }
    }

    /// Send frames, answer requests, and feed resulting events to the App.
    fn flush(&mut self, events: Vec<AppEvent>) {
        for frame in self.bridge.take_outgoing() {
            self.broker.receive(self.conn, frame).unwrap();
        }
        for event in events {
            self.feed(event);
        }
        for request in self.bridge.take_requests() {
            let response = self.answer(request);
            let events = self.bridge.handle_api_response(response);
            self.flush(events);
        }
    }

    fn answer(&mut self, request: ApiRequest) -> ApiResponse {
        match request {
            ApiRequest::FetchHistory { room_id, limit } => {
                let result = Ok(self.broker.fetch_history(&room_id, limit));
                ApiResponse::History { room_id, result }
            },
            ApiRequest::UpdateUnread { room_id, unread_count } => {
                self.broker.update_unread(&self.user_id, &room_id, unread_count);
                ApiResponse::Unread { room_id, result: Ok(()) }
            },
            ApiRequest::FetchSummaries => {
                ApiResponse::Summaries(Ok(self.broker.summaries(&self.user_id)))
            },
        }
    }

    fn deliver(&mut self) {
        for frame in self.broker.take_inbox(self.conn) {
            let events = self.bridge.handle_frame(frame);
            self.flush(events);
        }
    }

    fn apply(&mut self, op: &Op) {
        match op {
            Op::Open(i) => self.input(&format!("/open {}", ROOMS[*i])),
            Op::Close => self.input("/close"),
            Op::Say(text) => self.input(text),
            Op::Attach(name) => self.input(&format!("/attach {name} image/png 512")),
            Op::ForeignPost(i) => {
                self.broker.post_as("bob", ROOMS[*i], "still for sale");
            },
            Op::Deliver => self.deliver(),
            Op::ReleaseUploads => self.broker.release_attachments(),
        }
    }

    fn check(&mut self, context: &str) -> Result<(), TestCaseError> {
        for (room_id, view) in self.app.rooms() {
            prop_assert_eq!(
                &view.messages[..],
                self.bridge.client().messages(room_id),
                "{}: App view diverged from client log for {}",
                context,
                room_id
            );
        }

        let snapshot = ClientSnapshot::from_app(0, &self.app)
            .with_history_from(self.previous.as_ref());
        if let Err(violations) =
            InvariantRegistry::standard().check_all(&SystemSnapshot::single(snapshot.clone()))
        {
            return Err(TestCaseError::fail(format!("{context}: {violations:?}")));
        }
        self.previous = Some(snapshot);
        Ok(())
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn app_mirrors_client_under_faults(
        seed in any::<u64>(),
        ops in prop::collection::vec(op_strategy(), 1..60),
    ) {
        let mut harness = Harness::new(seed);

        for (step, op) in ops.iter().enumerate() {
            harness.apply(op);
            harness.check(&format!("step {step} {op:?}"))?;
        }

        harness.broker.release_attachments();
        while harness.broker.pending_frames(harness.conn) > 0 {
            harness.deliver();
        }
        harness.check("drained")?;

        for view in harness.app.rooms().values() {
            for message in view.messages.iter().filter(|m| m.user_id == harness.user_id) {
                prop_assert_eq!(message.status, MessageStatus::Sent);
                prop_assert!(
                    message.attachments.iter().all(|a| a.status == AttachmentStatus::Uploaded)
                );
            }
            prop_assert_eq!(view.pending_count(), 0);
        }
    }

    #[test]
    fn open_room_is_never_unread(
        seed in any::<u64>(),
        posts in prop::collection::vec(0..ROOMS.len(), 1..20),
    ) {
        let mut harness = Harness::new(seed);
        harness.apply(&Op::Open(0));

        for room in posts {
            harness.apply(&Op::ForeignPost(room));
            harness.apply(&Op::Deliver);
        }

        let active = harness.app.active_room_view().unwrap();
        prop_assert_eq!(active.unread_count(), 0);
        let closed: u64 = harness
            .app
            .rooms()
            .values()
            .filter(|v| Some(v.room_id()) != harness.app.active_room())
            .map(|v| u64::from(v.unread_count()))
            .sum();
        prop_assert_eq!(harness.app.total_unread(), closed);
    }
}
