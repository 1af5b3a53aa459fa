//! In-RAM event log
//!
//! Entries are formatted with `ufmt` at the call site and kept in a fixed
//! ring until the console task flushes them. When the ring is full the
//! oldest entry is discarded.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::{Deque, String};
use ufmt::{uWrite, uwrite};

use crate::config::{LOG_CAPACITY, LOG_LINE_LEN};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
        }
    }
}

#[cfg(feature = "debug")]
const DEFAULT_LEVEL: Level = Level::Debug;
#[cfg(not(feature = "debug"))]
const DEFAULT_LEVEL: Level = Level::Info;

pub type Line = String<LOG_LINE_LEN>;

pub struct LogEntry {
    timestamp: u32,
    level: Level,
    text: Line,
}

impl LogEntry {
    #[inline]
    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    #[inline]
    pub fn level(&self) -> Level {
        self.level
    }

    #[inline]
    pub fn text(&self) -> &str {
        self.text.as_str()
    }
}

/// `uWrite` adapter that silently cuts a line at its capacity.
pub struct LineWriter<'a, const N: usize> {
    line: &'a mut String<N>,
}

impl<'a, const N: usize> LineWriter<'a, N> {
    pub fn new(line: &'a mut String<N>) -> Self {
        Self { line }
    }
}

impl<const N: usize> uWrite for LineWriter<'_, N> {
    type Error = core::convert::Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        for c in s.chars() {
            if self.line.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

pub struct Logger<const N: usize> {
    entries: Deque<LogEntry, N>,
    dropped: u32,
    max_level: Level,
}

impl<const N: usize> Logger<N> {
    pub const fn new(max_level: Level) -> Self {
        Self {
            entries: Deque::new(),
            dropped: 0,
            max_level,
        }
    }

    #[inline]
    pub fn enabled(&self, level: Level) -> bool {
        level <= self.max_level
    }

    pub fn set_max_level(&mut self, level: Level) {
        self.max_level = level;
    }

    /// Formats and stores one entry. Returns false when `level` is filtered
    /// out.
    pub fn log_entry<F>(&mut self, timestamp: u32, level: Level, format: F) -> bool
    where
        F: FnOnce(&mut LineWriter<'_, LOG_LINE_LEN>),
    {
        if !self.enabled(level) {
            return false;
        }

        let mut text = Line::new();
        format(&mut LineWriter::new(&mut text));

        if self.entries.is_full() {
            self.entries.pop_front();
            self.dropped = self.dropped.wrapping_add(1);
        }
        // Cannot fail, a slot was just freed
        let _ = self.entries.push_back(LogEntry {
            timestamp,
            level,
            text,
        });
        true
    }

    pub fn pop(&mut self) -> Option<LogEntry> {
        self.entries.pop_front()
    }

    /// Writes out and removes every stored entry, oldest first.
    pub fn flush<W: uWrite>(&mut self, out: &mut W) -> Result<usize, W::Error> {
        let mut written = 0;
        if self.dropped > 0 {
            uwrite!(out, "[log] {} entries lost\r\n", self.dropped)?;
            self.dropped = 0;
        }
        while let Some(entry) = self.entries.pop_front() {
            uwrite!(
                out,
                "[{}] {} {}\r\n",
                entry.timestamp,
                entry.level.as_str(),
                entry.text.as_str()
            )?;
            written += 1;
        }
        Ok(written)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl<const N: usize> Default for Logger<N> {
    fn default() -> Self {
        Self::new(DEFAULT_LEVEL)
    }
}

static LOGGER: Mutex<RefCell<Logger<LOG_CAPACITY>>> =
    Mutex::new(RefCell::new(Logger::new(DEFAULT_LEVEL)));

/// Records an entry in the global log, stamped with the current uptime.
/// Used through the `log_*!` macros.
pub fn log<F>(level: Level, format: F)
where
    F: FnOnce(&mut LineWriter<'_, LOG_LINE_LEN>),
{
    let timestamp = crate::os::uptime_ms();
    critical_section::with(|cs| {
        LOGGER
            .borrow_ref_mut(cs)
            .log_entry(timestamp, level, format);
    });
}

/// Changes which entries the global log keeps from now on.
pub fn set_max_level(level: Level) {
    critical_section::with(|cs| LOGGER.borrow_ref_mut(cs).set_max_level(level));
}

/// Drains the global log into `out`.
///
/// Entries are taken one at a time so the sink is never written to while
/// interrupts are masked.
pub fn flush<W: uWrite>(out: &mut W) -> Result<usize, W::Error> {
    let lost = critical_section::with(|cs| {
        let mut logger = LOGGER.borrow_ref_mut(cs);
        core::mem::replace(&mut logger.dropped, 0)
    });
    if lost > 0 {
        uwrite!(out, "[log] {} entries lost\r\n", lost)?;
    }

    let mut written = 0;
    while let Some(entry) = critical_section::with(|cs| LOGGER.borrow_ref_mut(cs).pop()) {
        uwrite!(
            out,
            "[{}] {} {}\r\n",
            entry.timestamp,
            entry.level.as_str(),
            entry.text.as_str()
        )?;
        written += 1;
    }
    Ok(written)
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)+) => {
        $crate::logger::log($crate::logger::Level::Error, |w| {
            let _ = ufmt::uwrite!(w, $($arg)+);
        })
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)+) => {
        $crate::logger::log($crate::logger::Level::Warn, |w| {
            let _ = ufmt::uwrite!(w, $($arg)+);
        })
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)+) => {
        $crate::logger::log($crate::logger::Level::Info, |w| {
            let _ = ufmt::uwrite!(w, $($arg)+);
        })
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)+) => {
        $crate::logger::log($crate::logger::Level::Debug, |w| {
            let _ = ufmt::uwrite!(w, $($arg)+);
        })
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::String as StdString;

    struct Sink(StdString);

    impl uWrite for Sink {
        type Error = core::convert::Infallible;

        fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
            self.0.push_str(s);
            Ok(())
        }
    }

    #[test]
    fn entries_below_the_level_are_filtered() {
        let mut logger: Logger<4> = Logger::new(Level::Info);

        assert!(logger.log_entry(1, Level::Error, |w| {
            let _ = uwrite!(w, "boom");
        }));
        assert!(!logger.log_entry(2, Level::Debug, |w| {
            let _ = uwrite!(w, "noise");
        }));
        assert_eq!(logger.len(), 1);
    }

    #[test]
    fn raising_the_level_admits_debug_entries() {
        let mut logger: Logger<4> = Logger::new(Level::Info);
        assert!(!logger.enabled(Level::Debug));

        logger.set_max_level(Level::Debug);
        assert!(logger.log_entry(3, Level::Debug, |w| {
            let _ = uwrite!(w, "adc {}", 512u16);
        }));

        logger.set_max_level(Level::Warn);
        assert!(!logger.enabled(Level::Info));
        assert_eq!(logger.len(), 1);
    }

    #[test]
    fn full_ring_drops_the_oldest_entry() {
        let mut logger: Logger<2> = Logger::new(Level::Debug);
        for i in 0..3u32 {
            logger.log_entry(i, Level::Info, |w| {
                let _ = uwrite!(w, "entry {}", i);
            });
        }

        assert_eq!(logger.dropped(), 1);
        let first = logger.pop().unwrap();
        assert_eq!(first.timestamp(), 1);
        assert_eq!(first.text(), "entry 1");
    }

    #[test]
    fn long_lines_are_truncated() {
        let mut logger: Logger<2> = Logger::new(Level::Debug);
        logger.log_entry(0, Level::Warn, |w| {
            for _ in 0..LOG_LINE_LEN {
                let _ = uwrite!(w, "ab");
            }
        });

        let entry = logger.pop().unwrap();
        assert_eq!(entry.text().len(), LOG_LINE_LEN);
        assert!(entry.text().starts_with("abab"));
    }

    #[test]
    fn flush_formats_and_empties() {
        let mut logger: Logger<2> = Logger::new(Level::Debug);
        logger.log_entry(12, Level::Info, |w| {
            let _ = uwrite!(w, "pump {} on", 1u8);
        });
        logger.log_entry(40, Level::Error, |w| {
            let _ = uwrite!(w, "table full");
        });

        let mut sink = Sink(StdString::new());
        assert_eq!(logger.flush(&mut sink), Ok(2));
        assert_eq!(sink.0, "[12] INFO pump 1 on\r\n[40] ERROR table full\r\n");
        assert!(logger.is_empty());
    }

    #[test]
    fn flush_reports_lost_entries_first() {
        let mut logger: Logger<1> = Logger::new(Level::Debug);
        logger.log_entry(1, Level::Info, |w| {
            let _ = uwrite!(w, "a");
        });
        logger.log_entry(2, Level::Info, |w| {
            let _ = uwrite!(w, "b");
        });

        let mut sink = Sink(StdString::new());
        logger.flush(&mut sink).unwrap();
        assert_eq!(sink.0, "[log] 1 entries lost\r\n[2] INFO b\r\n");
        assert_eq!(logger.dropped(), 0);
    }
}
