//! Verbosity-gated console output shared by the audit pipeline.
//!
//! The engine talks to an [`OutputSink`] capability rather than printing
//! directly, so it can run headless (tests, library embedding) with the
//! no-op [`NullSink`].

/// Console output capability with quiet/debug gating.
pub trait OutputSink {
    /// Progress message (debug mode only).
    fn progress(&self, message: &str);

    /// Debug detail (debug mode only).
    fn debug_info(&self, message: &str);

    /// Informational message (suppressed in quiet mode).
    fn info(&self, message: &str);

    /// Success message (suppressed in quiet mode).
    fn success(&self, message: &str);

    /// Warning (suppressed in quiet mode).
    fn warning(&self, message: &str);

    /// Error (always shown, goes to stderr).
    fn error(&self, message: &str);
}

/// Writes to stdout/stderr, honoring the quiet and debug flags.
#[derive(Clone, Copy, Debug)]
pub struct ConsoleSink {
    quiet: bool,
    debug: bool,
}

impl ConsoleSink {
    pub fn new(quiet: bool, debug: bool) -> Self {
        Self { quiet, debug }
    }
}

impl OutputSink for ConsoleSink {
    fn progress(&self, message: &str) {
        if self.debug && !self.quiet {
            println!("⏳ {message}");
        }
    }

    fn debug_info(&self, message: &str) {
        if self.debug && !self.quiet {
            println!("🔍 {message}");
        }
    }

    fn info(&self, message: &str) {
        if !self.quiet {
            println!("{message}");
        }
    }

    fn success(&self, message: &str) {
        if !self.quiet {
            println!("✅ {message}");
        }
    }

    fn warning(&self, message: &str) {
        if !self.quiet {
            println!("⚠️  {message}");
        }
    }

    fn error(&self, message: &str) {
        eprintln!("❌ {message}");
    }
}

/// Null object: swallows every message.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn progress(&self, _message: &str) {}
    fn debug_info(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
    fn warning(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_sink_accepts_everything() {
        let sink = NullSink;
        sink.progress("p");
        sink.debug_info("d");
        sink.info("i");
        sink.success("s");
        sink.warning("w");
        sink.error("e");
    }

    #[test]
    fn test_console_sink_is_constructible_in_any_mode() {
        // Output itself goes to stdout/stderr; here we only exercise the
        // gating paths for panics.
        for (quiet, debug) in [(false, false), (true, false), (false, true), (true, true)] {
            let sink = ConsoleSink::new(quiet, debug);
            sink.progress("p");
            sink.info("i");
            sink.error("e");
        }
    }
}
