//! Integration tests for the debug service
//!
//! These drive the service through the public API:
//! - Registration against an event bus
//! - One line per event
//! - Snapshot rendering through a record writer
//! - Whole lines under concurrent events
//! - Registration failure and rollback

use std::fmt;
use std::io;
use std::sync::{Arc, Mutex};
use std::thread;

use event_tap::record::RecordWriter;
use event_tap::runtime::{Attribute, RecordDescriptor, SNAPSHOT_RECORD, Snapshot, SnapshotRecord, ValueType, Variant};
use event_tap::{Config, DebugService, EventBus, EventKind, LogSink, ScopeMask, load_services};
use log::Level;

/// Sink recording every write call with its byte offset in the stream
#[derive(Clone, Default)]
struct RecordingSink {
    writes: Arc<Mutex<Vec<(usize, String)>>>,
    offset: Arc<Mutex<usize>>,
}

impl RecordingSink {
    fn lines(&self) -> Vec<String> {
        self.writes.lock().unwrap().iter().map(|(_, line)| line.clone()).collect()
    }

    fn clear(&self) {
        self.writes.lock().unwrap().clear();
    }
}

impl LogSink for RecordingSink {
    fn write_line(&mut self, _level: Level, line: &str) -> io::Result<()> {
        let mut offset = self.offset.lock().unwrap();
        self.writes.lock().unwrap().push((*offset, line.to_string()));
        *offset += line.len() + 1;
        Ok(())
    }
}

/// Sink that writes a line one character at a time into a shared byte stream,
/// yielding between characters. Without outside serialization, lines from
/// different threads would interleave.
#[derive(Clone, Default)]
struct ByteStreamSink {
    stream: Arc<Mutex<Vec<u8>>>,
}

impl LogSink for ByteStreamSink {
    fn write_line(&mut self, _level: Level, line: &str) -> io::Result<()> {
        for byte in line.bytes().chain(std::iter::once(b'\n')) {
            self.stream.lock().unwrap().push(byte);
            thread::yield_now();
        }
        Ok(())
    }
}

fn registered(sink: impl LogSink + 'static) -> EventBus {
    let bus = EventBus::new();
    DebugService::new().with_sink(sink).register(&bus).unwrap();
    bus
}

#[test]
fn test_pre_begin_without_scope() {
    let sink = RecordingSink::default();
    let bus = registered(sink.clone());
    sink.clear();

    bus.pre_begin(&Attribute::new(1, "phase", ValueType::String));

    assert_eq!(sink.lines(), vec!["Event: pre_begin (attr = phase)"]);
}

#[test]
fn test_snapshot_with_thread_and_process_scope() {
    let sink = RecordingSink::default();
    let bus = registered(sink.clone());
    sink.clear();

    bus.snapshot(ScopeMask::PROCESS | ScopeMask::THREAD);

    let lines = sink.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("scope = thread:process"));
}

#[test]
fn test_every_event_kind_writes_exactly_one_line() {
    let sink = RecordingSink::default();
    let bus = registered(sink.clone());
    let attr = Attribute::new(2, "loop", ValueType::String);
    let snapshot = SnapshotRecord::new();

    let fire: Vec<(&str, Box<dyn Fn() + '_>)> = vec![
        ("Event: create_attribute (attr = loop)", Box::new(|| bus.create_attribute(&attr))),
        ("Event: pre_begin (attr = loop)", Box::new(|| bus.pre_begin(&attr))),
        ("Event: pre_end (attr = loop)", Box::new(|| bus.pre_end(&attr))),
        ("Event: pre_set (attr = loop)", Box::new(|| bus.pre_set(&attr))),
        ("Event: create_context (scope = task)", Box::new(|| bus.create_context(ScopeMask::TASK))),
        ("Event: destroy_context", Box::new(|| bus.destroy_context())),
        ("Event: snapshot (scope = process)", Box::new(|| bus.snapshot(ScopeMask::PROCESS))),
        ("Event: process_snapshot:", Box::new(|| bus.process_snapshot(&snapshot))),
        ("Event: finish", Box::new(|| bus.finish())),
    ];

    for (expected, fire) in fire {
        sink.clear();
        fire();
        assert_eq!(sink.lines(), vec![expected]);
    }
}

#[test]
fn test_offsets_are_contiguous() {
    let sink = RecordingSink::default();
    let bus = registered(sink.clone());

    bus.finish();
    bus.destroy_context();

    let writes = sink.writes.lock().unwrap().clone();
    assert_eq!(writes[0], (0, "Registered debug service".to_string()));
    for pair in writes.windows(2) {
        assert_eq!(pair[1].0, pair[0].0 + pair[0].1.len() + 1);
    }
}

/// Record writer that checks it only ever sees the record under test
struct CheckingWriter {
    expected: usize,
    calls: Arc<Mutex<usize>>,
}

impl RecordWriter for CheckingWriter {
    fn write_record(
        &self,
        out: &mut dyn fmt::Write,
        rec: &RecordDescriptor,
        counts: &[usize],
        values: &[&[Variant]],
    ) -> fmt::Result {
        *self.calls.lock().unwrap() += 1;
        assert_eq!(rec.name, "ctx");
        assert_eq!(values[0].as_ptr() as usize, self.expected);
        write!(out, "fields={}", counts.iter().sum::<usize>())
    }
}

#[test]
fn test_snapshot_writer_receives_record_handed_in() {
    struct Fixed(Vec<Variant>);

    impl Snapshot for Fixed {
        fn push_record(&self, write: &mut dyn FnMut(&RecordDescriptor, &[usize], &[&[Variant]])) {
            let refs: &[Variant] = &self.0;
            let empty: &[Variant] = &[];
            write(&SNAPSHOT_RECORD, &[refs.len(), 0, 0][..], &[refs, empty, empty][..]);
        }
    }

    let snapshot = Fixed(vec![Variant::UInt(1), Variant::UInt(2), Variant::UInt(3)]);
    let calls = Arc::new(Mutex::new(0));
    let sink = RecordingSink::default();
    let bus = EventBus::new();
    DebugService::new()
        .with_sink(sink.clone())
        .with_record_writer(CheckingWriter {
            expected: snapshot.0.as_ptr() as usize,
            calls: calls.clone(),
        })
        .register(&bus)
        .unwrap();
    sink.clear();

    bus.process_snapshot(&snapshot);

    assert_eq!(*calls.lock().unwrap(), 1);
    assert_eq!(sink.lines(), vec!["Event: process_snapshot: fields=3"]);
}

#[test]
fn test_snapshot_with_entries() {
    let sink = RecordingSink::default();
    let bus = registered(sink.clone());
    sink.clear();

    let iteration = Attribute::new(7, "iteration", ValueType::Int);
    let phase = Attribute::new(8, "phase", ValueType::String);
    let snapshot = SnapshotRecord::new()
        .with_reference(40)
        .with_immediate(&iteration, 3i64)
        .with_immediate(&phase, "solve");

    bus.process_snapshot(&snapshot);

    assert_eq!(sink.lines(), vec!["Event: process_snapshot: ref=40,attr=7=8,data=3=solve"]);
}

#[test]
fn test_concurrent_events_produce_whole_lines() {
    const THREADS: usize = 8;
    const EVENTS: usize = 50;

    let sink = ByteStreamSink::default();
    let bus = Arc::new(registered(sink.clone()));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let bus = Arc::clone(&bus);
            thread::spawn(move || {
                let attr = Attribute::new(t as u64, format!("attr{}", t), ValueType::Int);
                for i in 0..EVENTS {
                    match i % 4 {
                        0 => bus.pre_begin(&attr),
                        1 => bus.snapshot(ScopeMask::THREAD | ScopeMask::PROCESS),
                        2 => bus.process_snapshot(&SnapshotRecord::new().with_immediate(&attr, i as u64)),
                        _ => bus.pre_end(&attr),
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let stream = String::from_utf8(sink.stream.lock().unwrap().clone()).unwrap();
    let lines: Vec<&str> = stream.lines().collect();

    assert_eq!(lines.len(), 1 + THREADS * EVENTS);
    assert_eq!(lines[0], "Registered debug service");
    for line in &lines[1..] {
        let well_formed = (line.starts_with("Event: pre_begin (attr = attr") && line.ends_with(')'))
            || (line.starts_with("Event: pre_end (attr = attr") && line.ends_with(')'))
            || *line == "Event: snapshot (scope = thread:process)"
            || line.starts_with("Event: process_snapshot: attr=");
        assert!(well_formed, "corrupted line: {line:?}");
        assert_eq!(line.matches("Event:").count(), 1, "interleaved line: {line:?}");
    }
}

#[test]
fn test_failure_on_third_event_kind_registers_nothing() {
    let sink = RecordingSink::default();
    let bus = EventBus::with_supported(&[EventKind::CreateAttribute, EventKind::PreBegin]);

    let result = DebugService::new().with_sink(sink.clone()).register(&bus);

    let err = result.unwrap_err();
    assert!(err.to_string().contains("pre_end"));
    assert_eq!(bus.total_subscribers(), 0);
    assert!(sink.lines().is_empty());

    bus.pre_begin(&Attribute::new(1, "phase", ValueType::String));
    assert!(sink.lines().is_empty());
}

#[test]
fn test_second_registration_of_same_service_is_independent() {
    let first = RecordingSink::default();
    let second = RecordingSink::default();
    let bus = registered(first.clone());
    DebugService::new().with_sink(second.clone()).register(&bus).unwrap();

    bus.finish();

    assert_eq!(first.lines().last().map(String::as_str), Some("Event: finish"));
    assert_eq!(second.lines().last().map(String::as_str), Some("Event: finish"));
}

#[test]
fn test_load_services_from_config_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("event-tap.yaml");
    std::fs::write(&path, "services:\n  enabled: [debug]\ndebug:\n  event_level: trace\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    let bus = EventBus::new();
    let registered = load_services(&config, &bus).unwrap();

    assert_eq!(registered, vec!["debug"]);
    assert_eq!(bus.total_subscribers(), EventKind::ALL.len());
}
