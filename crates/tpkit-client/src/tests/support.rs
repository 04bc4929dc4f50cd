//! Shared fixtures: a scripted fake host and recording helpers.

use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde_json::Value;
use tpkit_config::HostEndpoint;

use crate::{Client, ClientError, ClientOptions, Event, Message, MessageKind};

pub(crate) const TEST_PLUGIN: &str = "test.plugin";
const HOST_TIMEOUT: Duration = Duration::from_secs(5);

/// Polls `condition` until it holds or `timeout` elapses.
pub(crate) fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Options tuned for fast tests against `endpoint`.
pub(crate) fn test_options(endpoint: HostEndpoint) -> ClientOptions {
    ClientOptions::new(TEST_PLUGIN)
        .with_endpoint(endpoint)
        .with_socket_event_timeout(Duration::from_millis(50))
        .with_lock_timeout(Duration::from_millis(500))
        .with_workers(1)
}

/// Runs `connect()` on a background thread.
pub(crate) fn spawn_connect(client: &Client) -> JoinHandle<Result<(), ClientError>> {
    let client = client.clone();
    thread::spawn(move || client.connect())
}

/// Loopback server standing in for the host application.
pub(crate) struct FakeHost {
    listener: TcpListener,
    writer: Option<TcpStream>,
    reader: Option<BufReader<TcpStream>>,
}

impl FakeHost {
    pub(crate) fn bind() -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind fake host");
        listener
            .set_nonblocking(true)
            .expect("non-blocking fake host listener");
        Self {
            listener,
            writer: None,
            reader: None,
        }
    }

    pub(crate) fn endpoint(&self) -> HostEndpoint {
        let addr = self.listener.local_addr().expect("fake host address");
        HostEndpoint::new(addr.ip().to_string(), addr.port())
    }

    /// Waits for the client to connect.
    pub(crate) fn accept(&mut self) {
        let deadline = Instant::now() + HOST_TIMEOUT;
        loop {
            match self.listener.accept() {
                Ok((stream, _)) => {
                    stream.set_nonblocking(false).expect("blocking host stream");
                    stream
                        .set_read_timeout(Some(HOST_TIMEOUT))
                        .expect("host read timeout");
                    let reader = stream.try_clone().expect("clone host stream");
                    self.reader = Some(BufReader::new(reader));
                    self.writer = Some(stream);
                    return;
                }
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                    assert!(Instant::now() < deadline, "client never connected");
                    thread::sleep(Duration::from_millis(5));
                }
                Err(error) => panic!("fake host accept failed: {error}"),
            }
        }
    }

    /// Reads the next line the client sent and parses it.
    pub(crate) fn receive(&mut self) -> Value {
        let reader = self.reader.as_mut().expect("host accepted a client");
        let mut line = String::new();
        let read = reader.read_line(&mut line).expect("line from client");
        assert!(read > 0, "client closed the connection");
        assert!(line.ends_with('\n'), "line is newline terminated");
        serde_json::from_str(line.trim_end()).expect("client sent JSON")
    }

    /// Reads lines until one has `type` equal to `kind`.
    pub(crate) fn receive_kind(&mut self, kind: &str) -> Value {
        loop {
            let message = self.receive();
            if message.get("type").and_then(Value::as_str) == Some(kind) {
                return message;
            }
        }
    }

    pub(crate) fn send_raw(&mut self, bytes: &[u8]) {
        let writer = self.writer.as_mut().expect("host accepted a client");
        writer.write_all(bytes).expect("write to client");
        writer.flush().expect("flush to client");
    }

    pub(crate) fn send_line(&mut self, json: &str) {
        let mut line = json.as_bytes().to_vec();
        line.push(b'\n');
        self.send_raw(&line);
    }

    /// Closes the host side of the connection.
    pub(crate) fn close(&mut self) {
        self.reader = None;
        self.writer = None;
    }
}

/// Messages received per subscription, keyed by the subscription's name.
#[derive(Clone, Default)]
pub(crate) struct Recorder {
    seen: Arc<Mutex<HashMap<String, Vec<Value>>>>,
}

impl Recorder {
    pub(crate) fn attach(&self, client: &Client, event: Event) {
        let seen = Arc::clone(&self.seen);
        let name = event.to_string();
        client.on(event, move |message: &Message| {
            seen.lock()
                .expect("recorder lock")
                .entry(name.clone())
                .or_default()
                .push(message.to_value());
            Ok(())
        });
    }

    pub(crate) fn attach_standard(&self, client: &Client) {
        for kind in [
            MessageKind::Info,
            MessageKind::Action,
            MessageKind::ClosePlugin,
            MessageKind::Broadcast,
        ] {
            self.attach(client, Event::Kind(kind));
        }
        self.attach(client, Event::Any);
    }

    pub(crate) fn messages(&self, name: &str) -> Vec<Value> {
        self.seen
            .lock()
            .expect("recorder lock")
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, name: &str) -> usize {
        self.messages(name).len()
    }
}
