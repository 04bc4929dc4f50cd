//! Test suites for the plugin client.

mod dispatch;
mod observer;
mod support;
