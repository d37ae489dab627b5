//! De-duplicating progress output.
//!
//! Batch imports repeat the same status line many times; the logger collapses
//! repeats into dots on one line and starts a new line when the message
//! changes. The sink is injected so tests can capture output in a buffer.

use std::io::Write;

pub struct ProgressLogger<W: Write> {
    sink: W,
    prev: Option<String>,
    dots: usize,
}

impl<W: Write> ProgressLogger<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            prev: None,
            dots: 0,
        }
    }

    /// Write `message`, collapsing a repeat of the previous message into a
    /// single dot. Write errors on the progress channel are ignored.
    pub fn log(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        if self.prev.as_deref() == Some(message) {
            let _ = write!(self.sink, ".");
            self.dots += 1;
        } else {
            self.prev = Some(message.to_string());
            self.dots = 0;
            let _ = write!(self.sink, "\n{message}");
        }
        let _ = self.sink.flush();
    }

    /// Finish the in-progress line.
    pub fn finish(&mut self) {
        let _ = writeln!(self.sink);
    }
}
