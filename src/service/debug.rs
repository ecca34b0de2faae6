//! Debug service
//!
//! Subscribes to every runtime event and writes one line per event:
//!
//! ```text
//! Event: pre_begin (attr = phase)
//! Event: snapshot (scope = thread:process)
//! Event: process_snapshot: ref=12,attr=7,data=3
//! ```

use eyre::{Context, Result};
use log::Level;
use std::sync::Arc;

use super::Service;
use crate::config::{Config, DebugConfig};
use crate::logging::{self, LogSink, SharedSink};
use crate::record::{CsvRecordWriter, RecordWriter};
use crate::runtime::{Attribute, EventKind, EventSource, Observer, ScopeMask, Snapshot, SubscriptionId};

/// Service table entry
pub const DEBUG_SERVICE: Service = Service {
    name: "debug",
    register: register_service,
};

/// Register the debug service with the default sink and levels
pub fn register(events: &dyn EventSource) -> Result<()> {
    DebugService::new().register(events)
}

fn register_service(events: &dyn EventSource, config: &Config) -> Result<()> {
    DebugService::new().with_config(&config.debug).register(events)
}

/// Builder for the debug observer
pub struct DebugService {
    sink: Arc<SharedSink>,
    writer: Arc<dyn RecordWriter>,
    event_level: Option<Level>,
    info_level: Option<Level>,
}

impl Default for DebugService {
    fn default() -> Self {
        Self::new()
    }
}

impl DebugService {
    pub fn new() -> Self {
        Self {
            sink: logging::default_sink(),
            writer: Arc::new(CsvRecordWriter),
            event_level: Some(Level::Debug),
            info_level: Some(Level::Info),
        }
    }

    /// Write to `sink` instead of the process-wide default
    pub fn with_sink(self, sink: impl LogSink + 'static) -> Self {
        self.with_shared_sink(Arc::new(SharedSink::new(sink)))
    }

    pub fn with_shared_sink(mut self, sink: Arc<SharedSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_record_writer(mut self, writer: impl RecordWriter + 'static) -> Self {
        self.writer = Arc::new(writer);
        self
    }

    pub fn with_config(mut self, config: &DebugConfig) -> Self {
        self.event_level = config.event_level.as_level();
        self.info_level = config.info_level.as_level();
        self
    }

    /// Subscribe to every event kind.
    ///
    /// If the runtime rejects any subscription, the ones already made are
    /// removed again and the error is returned; the service is then not
    /// registered at all.
    pub fn register(self, events: &dyn EventSource) -> Result<()> {
        let observer: Arc<dyn Observer> = Arc::new(DebugObserver {
            sink: Arc::clone(&self.sink),
            writer: self.writer,
            level: self.event_level,
        });

        let mut subscribed: Vec<(EventKind, SubscriptionId)> = Vec::with_capacity(EventKind::ALL.len());

        for kind in EventKind::ALL {
            match events.subscribe(kind, Arc::clone(&observer)) {
                Ok(id) => subscribed.push((kind, id)),
                Err(e) => {
                    for (done, id) in subscribed.into_iter().rev() {
                        events.unsubscribe(done, id);
                    }
                    return Err(e).with_context(|| format!("Failed to subscribe debug service to {} events", kind));
                }
            }
        }

        if let Some(level) = self.info_level {
            self.sink.emit(level, format_args!("Registered debug service"));
        }
        Ok(())
    }
}

/// Renders events into the shared sink
pub struct DebugObserver {
    sink: Arc<SharedSink>,
    writer: Arc<dyn RecordWriter>,
    level: Option<Level>,
}

impl DebugObserver {
    fn attr_event(&self, kind: EventKind, attr: &Attribute) {
        if let Some(level) = self.level {
            self.sink
                .emit(level, format_args!("Event: {} (attr = {})", kind, attr.name()));
        }
    }

    fn scope_event(&self, kind: EventKind, scope: ScopeMask) {
        if let Some(level) = self.level {
            self.sink.emit(level, format_args!("Event: {} (scope = {})", kind, scope));
        }
    }

    fn plain_event(&self, kind: EventKind) {
        if let Some(level) = self.level {
            self.sink.emit(level, format_args!("Event: {}", kind));
        }
    }
}

impl Observer for DebugObserver {
    fn create_attribute(&self, attr: &Attribute) {
        self.attr_event(EventKind::CreateAttribute, attr);
    }

    fn pre_begin(&self, attr: &Attribute) {
        self.attr_event(EventKind::PreBegin, attr);
    }

    fn pre_end(&self, attr: &Attribute) {
        self.attr_event(EventKind::PreEnd, attr);
    }

    fn pre_set(&self, attr: &Attribute) {
        self.attr_event(EventKind::PreSet, attr);
    }

    fn finish(&self) {
        self.plain_event(EventKind::Finish);
    }

    fn create_context(&self, scope: ScopeMask) {
        self.scope_event(EventKind::CreateContext, scope);
    }

    fn destroy_context(&self) {
        self.plain_event(EventKind::DestroyContext);
    }

    fn snapshot(&self, scope: ScopeMask) {
        self.scope_event(EventKind::Snapshot, scope);
    }

    fn process_snapshot(&self, snapshot: &dyn Snapshot) {
        let Some(level) = self.level else {
            return;
        };

        self.sink.emit_with(level, |line| {
            line.push_str("Event: process_snapshot:");

            let mut written = false;
            snapshot.push_record(&mut |rec, counts, values| {
                let mark = line.len();
                line.push_str(if written { "; " } else { " " });
                let start = line.len();

                // Keep whatever the writer produced before failing.
                let _ = self.writer.write_record(&mut *line, rec, counts, values);

                if line.len() == start {
                    line.truncate(mark);
                } else {
                    written = true;
                }
            });
        });
    }
}
