//! Lifecycle observer notifications across real loopback sessions.

use std::net::TcpListener;
use std::sync::Arc;

use mockall::{Sequence, mock};
use tpkit_config::HostEndpoint;

use super::support::{FakeHost, TEST_PLUGIN, spawn_connect, test_options};
use crate::{Client, ClientError, ConnectionObserver};

mock! {
    Observer {}
    impl ConnectionObserver for Observer {
        fn connecting(&self, endpoint: &HostEndpoint);
        fn connected(&self, endpoint: &HostEndpoint, plugin_id: &str);
        fn fatal_error(&self, error: &ClientError);
        fn disconnected(&self, plugin_id: &str);
    }
}

fn expect_session(observer: &mut MockObserver, endpoint: &HostEndpoint, sequence: &mut Sequence) {
    let expected = endpoint.to_string();
    observer
        .expect_connecting()
        .withf(move |endpoint| endpoint.to_string() == expected)
        .times(1)
        .in_sequence(sequence)
        .return_const(());
    observer
        .expect_connected()
        .withf(|_, plugin_id| plugin_id.to_string() == TEST_PLUGIN)
        .times(1)
        .in_sequence(sequence)
        .return_const(());
}

#[test]
fn clean_disconnect_reports_each_transition_once() {
    let mut host = FakeHost::bind();
    let endpoint = host.endpoint();
    let mut observer = MockObserver::new();
    let mut sequence = Sequence::new();
    expect_session(&mut observer, &endpoint, &mut sequence);
    observer
        .expect_disconnected()
        .withf(|plugin_id| plugin_id.to_string() == TEST_PLUGIN)
        .times(1)
        .in_sequence(&mut sequence)
        .return_const(());
    observer.expect_fatal_error().never();

    let client = Client::with_observer(test_options(endpoint), Arc::new(observer));
    let session = spawn_connect(&client);
    host.accept();
    assert_eq!(host.receive()["type"], "pair");

    client.disconnect();
    session
        .join()
        .expect("connect thread")
        .expect("clean disconnect");
    drop(client);
}

#[test]
fn host_closing_the_socket_is_reported_as_fatal() {
    let mut host = FakeHost::bind();
    let endpoint = host.endpoint();
    let mut observer = MockObserver::new();
    let mut sequence = Sequence::new();
    expect_session(&mut observer, &endpoint, &mut sequence);
    observer
        .expect_fatal_error()
        .withf(|error| matches!(error, ClientError::PeerClosed))
        .times(1)
        .in_sequence(&mut sequence)
        .return_const(());
    observer
        .expect_disconnected()
        .times(1)
        .in_sequence(&mut sequence)
        .return_const(());

    let client = Client::with_observer(test_options(endpoint), Arc::new(observer));
    let session = spawn_connect(&client);
    host.accept();
    host.receive_kind("pair");
    host.close();

    let outcome = session.join().expect("connect thread");
    assert!(matches!(outcome, Err(ClientError::PeerClosed)));
    assert!(!client.is_connected());
    drop(client);
}

#[test]
fn refused_connection_never_reports_connected() {
    let port = {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("reserve port");
        listener.local_addr().expect("reserved address").port()
    };
    let endpoint = HostEndpoint::new("127.0.0.1", port);
    let mut observer = MockObserver::new();
    observer.expect_connecting().times(1).return_const(());
    observer.expect_connected().never();
    observer.expect_fatal_error().never();
    observer.expect_disconnected().never();

    let client = Client::with_observer(test_options(endpoint), Arc::new(observer));
    let outcome = client.connect();
    assert!(matches!(outcome, Err(ClientError::Connect { .. })));
    assert!(!client.is_connected());
    drop(client);
}
