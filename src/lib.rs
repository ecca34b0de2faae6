//! Debug service for an instrumentation runtime.
//!
//! Registering the service subscribes an observer to every runtime lifecycle
//! event. Each event becomes one log line:
//!
//! ```text
//! Registered debug service
//! Event: create_attribute (attr = phase)
//! Event: pre_begin (attr = phase)
//! Event: snapshot (scope = thread:process)
//! Event: process_snapshot: ref=12,attr=7,data=3
//! Event: finish
//! ```
//!
//! The service never captures or buffers events. Lines from concurrent events
//! are written whole, in no particular order across threads.

pub mod config;
pub mod logging;
pub mod record;
pub mod runtime;
pub mod service;

pub use config::Config;
pub use logging::{LogSink, SharedSink, setup_logging};
pub use record::{CsvRecordWriter, RecordWriter};
pub use runtime::{EventBus, EventKind, EventSource, Observer, ScopeMask};
pub use service::debug::{DebugService, register};
pub use service::load_services;
