//! Terminal rendering of scaleover progress.
//!
//! On a terminal the status line is redrawn in place with one `<` per
//! source instance and one `>` per target instance. Otherwise each
//! snapshot is printed on its own line.

use std::io::Write;

use scaleover_core::{ProgressSink, ProgressSnapshot};
use tracing::debug;

pub struct TerminalProgress<W: Write> {
    out: W,
    interactive: bool,
}

impl<W: Write> TerminalProgress<W> {
    pub fn new(out: W, interactive: bool) -> Self {
        Self { out, interactive }
    }

    /// End the in-place line so later output starts on a fresh one.
    pub fn finish(&mut self) {
        if self.interactive {
            let _ = writeln!(self.out);
        }
        let _ = self.out.flush();
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

pub fn render(snapshot: &ProgressSnapshot, interactive: bool) -> String {
    if interactive {
        format!(
            "{} ({}) {} {} {} ({}) \r",
            snapshot.source_name,
            snapshot.source_lifecycle,
            "<".repeat(snapshot.source_requested as usize),
            ">".repeat(snapshot.target_requested as usize),
            snapshot.target_name,
            snapshot.target_lifecycle,
        )
    } else {
        format!(
            "{} ({}) {} instances, {} ({}) {} instances\n",
            snapshot.source_name,
            snapshot.source_lifecycle,
            snapshot.source_requested,
            snapshot.target_name,
            snapshot.target_lifecycle,
            snapshot.target_requested,
        )
    }
}

impl<W: Write> ProgressSink for TerminalProgress<W> {
    fn observe(&mut self, snapshot: &ProgressSnapshot) {
        let line = render(snapshot, self.interactive);
        if let Err(e) = self
            .out
            .write_all(line.as_bytes())
            .and_then(|()| self.out.flush())
        {
            debug!(error = %e, "failed to write progress");
        }
    }
}
