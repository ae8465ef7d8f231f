//! Console logger for the `log` crate.
//!
//! Records go to stderr, one line each. Concurrent producers and the consumer
//! all log, so lines are serialized through a ticket lock.

use hyperring::locks::ticket::TicketLock;
use std::io::{Stderr, Write};

static CONSOLE: TicketLock<Option<Stderr>> = TicketLock::new(None);

/// The logger instance handed to the `log` crate.
pub static LOGGER_API: LockedLogger = LockedLogger;

/// A logger backed by the locked console.
pub struct LockedLogger;

impl log::Log for LockedLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        CONSOLE.with_locked(|console| {
            if let Some(out) = console {
                // Nowhere left to report a failing stderr.
                let _ = writeln!(out, "[{:5}] {}", record.level(), record.args());
            }
        });
    }

    fn flush(&self) {
        CONSOLE.with_locked(|console| {
            if let Some(out) = console {
                let _ = out.flush();
            }
        });
    }
}

pub fn init(verbose: bool) {
    CONSOLE.with_locked(|console| *console = Some(std::io::stderr()));

    if log::set_logger(&LOGGER_API).is_ok() {
        log::set_max_level(if verbose {
            log::LevelFilter::Trace
        } else {
            log::LevelFilter::Info
        });
    }
}
