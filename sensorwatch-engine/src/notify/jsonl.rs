//! Sink that appends events as newline-delimited JSON.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use sensorwatch_types::Event;

use super::Notifier;
use crate::error::NotifyError;

/// Writes each event as one JSON line.
///
/// With `skip_reminders` set, repeat reminders for an already-reported
/// condition are dropped.
#[derive(Debug)]
pub struct JsonLinesNotifier<W> {
    writer: W,
    skip_reminders: bool,
    written: u64,
}

impl<W: Write + Send> JsonLinesNotifier<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            skip_reminders: false,
            written: 0,
        }
    }

    pub fn skip_reminders(mut self, skip: bool) -> Self {
        self.skip_reminders = skip;
        self
    }

    /// Number of events written.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesNotifier<BufWriter<File>> {
    /// Append to the file at `path`, creating it if needed.
    pub fn append(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write + Send> Notifier for JsonLinesNotifier<W> {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn handle(&mut self, event: &Event) -> Result<(), NotifyError> {
        if self.skip_reminders && event.is_reminder() {
            return Ok(());
        }
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }
}
