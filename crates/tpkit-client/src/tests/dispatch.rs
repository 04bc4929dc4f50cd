//! Dispatcher behaviour exercised without a socket.

use rstest::{fixture, rstest};
use serde_json::json;
use tpkit_protocol::ProtocolError;

use super::support::{Recorder, TEST_PLUGIN};
use crate::pool::WorkerPool;
use crate::{Client, ClientError, ClientOptions};

struct Detached {
    client: Client,
    recorder: Recorder,
    pool: WorkerPool,
}

impl Detached {
    fn with_options(options: ClientOptions) -> Self {
        let client = Client::new(options);
        let recorder = Recorder::default();
        recorder.attach_standard(&client);
        client.shared().start_detached();
        Self {
            client,
            recorder,
            pool: WorkerPool::start(1).expect("pool starts"),
        }
    }

    fn feed(&self, frame: &str) -> Result<(), ClientError> {
        self.client
            .shared()
            .process_frame(frame.as_bytes(), &self.pool)
    }

    /// Waits for queued handlers and returns the recorder.
    fn settle(self) -> (Client, Recorder) {
        self.pool.join();
        (self.client, self.recorder)
    }
}

#[fixture]
fn detached() -> Detached {
    Detached::with_options(ClientOptions::new(TEST_PLUGIN))
}

#[rstest]
fn typed_and_wildcard_handlers_each_receive_the_message(detached: Detached) {
    detached
        .feed(r#"{"type":"info","sdkVersion":6}"#)
        .expect("info frame");
    let (_, recorder) = detached.settle();
    assert_eq!(
        recorder.messages("info"),
        vec![json!({"type": "info", "sdkVersion": 6})]
    );
    assert_eq!(recorder.count("any"), 1);
    assert_eq!(recorder.count("action"), 0);
}

#[rstest]
fn foreign_plugin_messages_are_dropped(detached: Detached) {
    detached
        .feed(r#"{"type":"action","pluginId":"other.plugin","actionId":"a"}"#)
        .expect("foreign frame");
    detached
        .feed(r#"{"type":"action","pluginId":"test.plugin","actionId":"b"}"#)
        .expect("own frame");
    let (_, recorder) = detached.settle();
    let actions = recorder.messages("action");
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0]["actionId"], "b");
    assert_eq!(recorder.count("any"), 1);
}

#[test]
fn filtering_can_be_disabled() {
    let detached =
        Detached::with_options(ClientOptions::new(TEST_PLUGIN).with_check_plugin_id(false));
    detached
        .feed(r#"{"type":"action","pluginId":"other.plugin"}"#)
        .expect("frame");
    let (_, recorder) = detached.settle();
    assert_eq!(recorder.count("action"), 1);
}

#[rstest]
fn hold_messages_track_pressed_actions(detached: Detached) {
    let client = detached.client.clone();
    assert!(!client.is_action_being_held("volume"));
    detached
        .feed(r#"{"type":"down","pluginId":"test.plugin","actionId":"volume"}"#)
        .expect("down");
    assert!(client.is_action_being_held("volume"));
    assert!(!client.is_action_being_held("mute"));
    detached
        .feed(r#"{"type":"up","pluginId":"test.plugin","actionId":"volume"}"#)
        .expect("up");
    assert!(!client.is_action_being_held("volume"));
    detached
        .feed(r#"{"type":"up","pluginId":"test.plugin","actionId":"never-pressed"}"#)
        .expect("unmatched up is harmless");
}

#[rstest]
fn untyped_frames_are_ignored(detached: Detached) {
    detached.feed(r#"{"pluginId":"test.plugin"}"#).expect("untyped");
    detached.feed(r#"{"type":7,"pluginId":"test.plugin"}"#).expect("numeric type");
    let (_, recorder) = detached.settle();
    assert_eq!(recorder.count("any"), 0);
}

#[rstest]
#[case::truncated("{not json")]
#[case::blank("")]
#[case::whitespace("  ")]
fn malformed_frames_are_fatal(detached: Detached, #[case] frame: &str) {
    let error = detached.feed(frame).expect_err("decode failure");
    assert!(matches!(
        error,
        ClientError::Protocol(ProtocolError::Decode { .. })
    ));
    assert!(error.is_fatal());
}

#[rstest]
fn close_request_stops_only_with_auto_close(detached: Detached) {
    detached.feed(r#"{"type":"closePlugin","pluginId":"test.plugin"}"#).expect("close");
    assert!(detached.client.is_connected());
    let (_, recorder) = detached.settle();
    assert_eq!(recorder.count("closePlugin"), 1);

    let auto = Detached::with_options(ClientOptions::new(TEST_PLUGIN).with_auto_close(true));
    auto.feed(r#"{"type":"closePlugin"}"#).expect("close");
    assert!(!auto.client.is_connected());
    let (_, recorder) = auto.settle();
    assert_eq!(recorder.count("closePlugin"), 1);
}

#[rstest]
fn broadcast_resends_every_cached_state(detached: Detached) {
    let client = detached.client.clone();
    client.state_update("a", "1").expect("state a");
    client.state_update("b", "2").expect("state b");
    assert_eq!(client.shared().queued_lines().len(), 2);

    detached
        .feed(r#"{"type":"broadcast","event":"pageChange","pageName":"main"}"#)
        .expect("broadcast");
    let mut resent = client.shared().queued_lines();
    resent.sort_by_key(|line| line["id"].as_str().map(str::to_owned));
    assert_eq!(
        resent,
        vec![
            json!({"type": "stateUpdate", "id": "a", "value": "1"}),
            json!({"type": "stateUpdate", "id": "b", "value": "2"}),
        ]
    );
}

#[test]
fn broadcast_resend_can_be_disabled() {
    let detached = Detached::with_options(
        ClientOptions::new(TEST_PLUGIN).with_update_states_on_broadcast(false),
    );
    detached.client.state_update("a", "1").expect("state");
    detached.client.shared().queued_lines();
    detached.feed(r#"{"type":"broadcast"}"#).expect("broadcast");
    assert!(detached.client.shared().queued_lines().is_empty());
}

#[rstest]
fn host_settings_seed_the_settings_cache(detached: Detached) {
    detached
        .feed(r#"{"type":"info","settings":[{"Refresh":"5"}]}"#)
        .expect("info");
    detached
        .feed(r#"{"type":"settings","values":[{"Mode":"fast"}]}"#)
        .expect("settings");
    let client = detached.client.clone();
    assert_eq!(client.current_setting("Refresh"), Some(json!("5")));
    assert_eq!(client.current_setting("Mode"), Some(json!("fast")));

    client.setting_update("Mode", "fast").expect("unchanged");
    assert!(client.shared().queued_lines().is_empty());
}

#[rstest]
fn handler_failures_reach_error_subscribers(detached: Detached) {
    use std::sync::{Arc, Mutex};

    use crate::{HandlerFailure, MessageKind};

    let failures: Arc<Mutex<Vec<HandlerFailure>>> = Arc::default();
    {
        let failures = Arc::clone(&failures);
        detached.client.on_error(move |failure| {
            failures.lock().expect("failures lock").push(failure.clone());
        });
    }
    detached
        .client
        .on(MessageKind::Action, |_message| Err("cannot handle".into()));
    detached
        .feed(r#"{"type":"action","pluginId":"test.plugin"}"#)
        .expect("action");
    let (client, recorder) = detached.settle();

    let failures = failures.lock().expect("failures lock");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].message_kind, MessageKind::Action);
    assert_eq!(failures[0].reason, "cannot handle");
    assert_eq!(recorder.count("any"), 1, "other handlers still run");
    assert!(client.is_connected(), "handler errors never stop the session");
}
