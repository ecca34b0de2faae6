//! Record serialization
//!
//! Writers turn one record (descriptor, per-field counts, per-field values)
//! into text appended to an output buffer.

use std::fmt::{self, Write};

use crate::runtime::{RecordDescriptor, Variant};

/// Serializes records into a text sink
pub trait RecordWriter: Send + Sync {
    fn write_record(
        &self,
        out: &mut dyn Write,
        rec: &RecordDescriptor,
        counts: &[usize],
        values: &[&[Variant]],
    ) -> fmt::Result;
}

/// Writes records as `field=value=value,field=value`.
///
/// Fields without values are skipped. Separator characters inside values,
/// including the `;` used between records on one line, are escaped with a
/// backslash.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvRecordWriter;

impl CsvRecordWriter {
    pub const FIELD_SEPARATOR: char = ',';
    pub const VALUE_SEPARATOR: char = '=';
}

impl RecordWriter for CsvRecordWriter {
    fn write_record(
        &self,
        out: &mut dyn Write,
        rec: &RecordDescriptor,
        counts: &[usize],
        values: &[&[Variant]],
    ) -> fmt::Result {
        let mut first = true;

        for ((field, count), entries) in rec.fields.iter().zip(counts).zip(values) {
            let count = (*count).min(entries.len());
            if count == 0 {
                continue;
            }

            if !first {
                out.write_char(Self::FIELD_SEPARATOR)?;
            }
            first = false;

            write_escaped(out, field)?;
            for value in &entries[..count] {
                out.write_char(Self::VALUE_SEPARATOR)?;
                write_escaped(out, &value.to_string())?;
            }
        }

        Ok(())
    }
}

fn write_escaped(out: &mut dyn Write, text: &str) -> fmt::Result {
    for c in text.chars() {
        match c {
            ',' | '=' | ';' | '\\' => {
                out.write_char('\\')?;
                out.write_char(c)?;
            }
            '\n' => out.write_str("\\n")?,
            _ => out.write_char(c)?,
        }
    }
    Ok(())
}
