//! Record sinks
//!
//! Records are handed over by value, one at a time, as the driver
//! produces them.

use std::io::Write;
use std::marker::PhantomData;

use crate::error::Result;
use crate::record::Record;

pub trait Sink<R> {
    fn write(&mut self, record: R) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single CSV row to any writer.
pub fn write_row<W: Write>(mut w: W, row: &[String], sep: char) -> std::io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            write!(w, "{}", sep)?;
        } else {
            first = false;
        }
        if needs_quotes(cell, sep) {
            let escaped = cell.replace('"', "\"\"");
            write!(w, "\"{}\"", escaped)?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

/// CSV output with the record type's fixed header row.
pub struct CsvSink<R, W: Write> {
    out: W,
    rows: usize,
    _record: PhantomData<fn(R)>,
}

impl<R: Record, W: Write> CsvSink<R, W> {
    /// Writes the header row immediately, so an empty scrape still
    /// leaves a well-formed file.
    pub fn new(mut out: W) -> Result<Self> {
        let headers: Vec<String> = R::HEADERS.iter().map(|h| h.to_string()).collect();
        write_row(&mut out, &headers, ',')?;
        Ok(Self {
            out,
            rows: 0,
            _record: PhantomData,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<R: Record, W: Write> Sink<R> for CsvSink<R, W> {
    fn write(&mut self, record: R) -> Result<()> {
        write_row(&mut self.out, &record.row(), ',')?;
        self.rows += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// One JSON object per line, carrying every field of the record.
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<R: Record, W: Write> Sink<R> for JsonLinesSink<W> {
    fn write(&mut self, record: R) -> Result<()> {
        serde_json::to_writer(&mut self.out, &record)?;
        writeln!(self.out)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Keeps every record in memory.
#[derive(Debug)]
pub struct MemorySink<R> {
    records: Vec<R>,
}

impl<R> Default for MemorySink<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<R> MemorySink<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn into_records(self) -> Vec<R> {
        self.records
    }
}

impl<R> Sink<R> for MemorySink<R> {
    fn write(&mut self, record: R) -> Result<()> {
        self.records.push(record);
        Ok(())
    }
}

impl<R, S: Sink<R> + ?Sized> Sink<R> for Box<S> {
    fn write(&mut self, record: R) -> Result<()> {
        (**self).write(record)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}
