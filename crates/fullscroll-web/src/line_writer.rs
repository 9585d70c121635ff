#![forbid(unsafe_code)]

//! `tracing-subscriber` writer that hands formatted events to a sink one
//! line at a time.
//!
//! The fmt layer asks for a fresh writer per event and drops it when the
//! event is written, so buffering until drop yields exactly one flush per
//! event.

use std::io;
use std::sync::Arc;

use tracing_subscriber::fmt::MakeWriter;

/// Receives complete log lines without their trailing newline.
pub trait LineSink: Send + Sync + 'static {
    fn emit(&self, line: &str);
}

/// [`MakeWriter`] over a shared [`LineSink`].
#[derive(Debug)]
pub struct MakeLineWriter<S> {
    sink: Arc<S>,
}

impl<S> MakeLineWriter<S> {
    pub fn new(sink: Arc<S>) -> Self {
        Self { sink }
    }
}

impl<S> Clone for MakeLineWriter<S> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<'a, S: LineSink> MakeWriter<'a> for MakeLineWriter<S> {
    type Writer = LineWriter<S>;

    fn make_writer(&'a self) -> Self::Writer {
        LineWriter {
            sink: Arc::clone(&self.sink),
            buf: Vec::new(),
        }
    }
}

/// Per-event writer. Emits on `flush` and on drop.
#[derive(Debug)]
pub struct LineWriter<S: LineSink> {
    sink: Arc<S>,
    buf: Vec<u8>,
}

impl<S: LineSink> LineWriter<S> {
    fn emit_buffered(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let buf = std::mem::take(&mut self.buf);
        for line in String::from_utf8_lossy(&buf).lines() {
            let line = line.trim_end();
            if !line.is_empty() {
                self.sink.emit(line);
            }
        }
    }
}

impl<S: LineSink> io::Write for LineWriter<S> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.emit_buffered();
        Ok(())
    }
}

impl<S: LineSink> Drop for LineWriter<S> {
    fn drop(&mut self) {
        self.emit_buffered();
    }
}
