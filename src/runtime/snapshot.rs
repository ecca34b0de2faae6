//! Snapshot records
//!
//! A snapshot is offered to observers as a borrowed view. Observers read it by
//! handing `push_record` a writer callback; the callback receives, per record,
//! the record's descriptor, a value count per field, and the values per field.

use super::{Attribute, Variant};

/// Static layout of a record type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordDescriptor {
    pub id: u32,
    pub name: &'static str,
    pub fields: &'static [&'static str],
}

/// Layout of snapshot records: context tree references, then immediate
/// attribute ids and their values
pub const SNAPSHOT_RECORD: RecordDescriptor = RecordDescriptor {
    id: 0x100,
    name: "ctx",
    fields: &["ref", "attr", "data"],
};

/// Read-only view of a captured snapshot
pub trait Snapshot {
    fn push_record(&self, write: &mut dyn FnMut(&RecordDescriptor, &[usize], &[&[Variant]]));
}

/// A snapshot assembled in memory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotRecord {
    refs: Vec<Variant>,
    attrs: Vec<Variant>,
    data: Vec<Variant>,
}

impl SnapshotRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reference to a context tree node
    pub fn with_reference(mut self, node_id: u64) -> Self {
        self.refs.push(Variant::UInt(node_id));
        self
    }

    /// Add an immediate attribute value
    pub fn with_immediate(mut self, attr: &Attribute, value: impl Into<Variant>) -> Self {
        self.attrs.push(Variant::UInt(attr.id()));
        self.data.push(value.into());
        self
    }

    /// Number of entries (references plus immediates)
    pub fn len(&self) -> usize {
        self.refs.len() + self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Snapshot for SnapshotRecord {
    fn push_record(&self, write: &mut dyn FnMut(&RecordDescriptor, &[usize], &[&[Variant]])) {
        let counts = [self.refs.len(), self.attrs.len(), self.data.len()];
        let values: [&[Variant]; 3] = [&self.refs, &self.attrs, &self.data];
        write(&SNAPSHOT_RECORD, &counts[..], &values[..]);
    }
}
