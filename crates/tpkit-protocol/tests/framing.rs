//! Behavioural tests for inbound framing and decoding.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use tpkit_protocol::{FrameBuffer, Message, ProtocolError};

#[derive(Default)]
struct FramingWorld {
    buffer: FrameBuffer,
    messages: Vec<Message>,
    error: Option<ProtocolError>,
}

impl FramingWorld {
    fn receive(&mut self, bytes: &[u8]) {
        let frames = match self.buffer.extend(bytes) {
            Ok(frames) => frames,
            Err(error) => {
                self.error = Some(error);
                return;
            }
        };
        for frame in frames {
            match Message::decode(&frame) {
                Ok(Some(message)) => self.messages.push(message),
                Ok(None) => {}
                Err(error) => {
                    self.error = Some(error);
                    return;
                }
            }
        }
    }
}

/// Feature files cannot carry raw newlines inside a quoted step argument.
fn unescape(text: &str) -> Vec<u8> {
    text.replace("\\n", "\n").into_bytes()
}

#[fixture]
fn world() -> RefCell<FramingWorld> {
    RefCell::new(FramingWorld::default())
}

#[given("an empty frame buffer")]
fn given_empty_buffer(world: &RefCell<FramingWorld>) {
    world.borrow_mut().buffer = FrameBuffer::new();
}

#[given("a frame buffer limited to {limit} bytes")]
fn given_limited_buffer(world: &RefCell<FramingWorld>, limit: usize) {
    world.borrow_mut().buffer = FrameBuffer::with_limit(Some(limit));
}

#[when("the bytes '{bytes}' arrive")]
fn when_bytes_arrive(world: &RefCell<FramingWorld>, bytes: String) {
    world.borrow_mut().receive(&unescape(&bytes));
}

#[then("{count} messages are decoded")]
fn then_messages_decoded(world: &RefCell<FramingWorld>, count: usize) {
    let world = world.borrow();
    assert!(world.error.is_none(), "unexpected error: {:?}", world.error);
    assert_eq!(world.messages.len(), count);
}

#[then("message {index} has type \"{kind}\"")]
fn then_message_has_type(world: &RefCell<FramingWorld>, index: usize, kind: String) {
    let world = world.borrow();
    let message = world
        .messages
        .get(index - 1)
        .expect("message index within range");
    assert_eq!(message.kind().as_str(), kind);
}

#[then("{count} bytes remain buffered")]
fn then_bytes_buffered(world: &RefCell<FramingWorld>, count: usize) {
    assert_eq!(world.borrow().buffer.pending().len(), count);
}

#[then("decoding fails")]
fn then_decoding_fails(world: &RefCell<FramingWorld>) {
    assert!(matches!(
        world.borrow().error,
        Some(ProtocolError::Decode { .. })
    ));
}

#[then("framing fails because the frame is too large")]
fn then_frame_too_large(world: &RefCell<FramingWorld>) {
    assert!(matches!(
        world.borrow().error,
        Some(ProtocolError::FrameTooLarge { limit: 16, .. })
    ));
}

#[scenario(path = "tests/features/framing.feature", name = "Messages split across reads are reassembled")]
fn split_reads_are_reassembled(#[from(world)] world: RefCell<FramingWorld>) {
    drop(world);
}

#[scenario(path = "tests/features/framing.feature", name = "Messages without a type are skipped")]
fn untyped_messages_are_skipped(#[from(world)] world: RefCell<FramingWorld>) {
    drop(world);
}

#[scenario(path = "tests/features/framing.feature", name = "Malformed JSON is a decode error")]
fn malformed_json_is_rejected(#[from(world)] world: RefCell<FramingWorld>) {
    drop(world);
}

#[scenario(path = "tests/features/framing.feature", name = "An oversized unterminated frame is rejected")]
fn oversized_frame_is_rejected(#[from(world)] world: RefCell<FramingWorld>) {
    drop(world);
}
