//! Minimal stderr logger.
//!
//! Prints `[elapsed LEVEL target] message`, with workspace crate prefixes
//! trimmed from the target. Detector hot loops log at `trace`,
//! so the level filter is checked before any formatting happens.

use std::io::Write;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let elapsed = self.started.elapsed().as_secs_f64();
        let _ = write_record(&mut std::io::stderr().lock(), elapsed, record);
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Format one record as `[elapsed LEVEL target] message`.
///
/// Targets inside this workspace drop their crate prefix, so detector lines
/// read `detector` instead of `ringmark_detector::detector`.
fn write_record(out: &mut impl Write, elapsed: f64, record: &Record) -> std::io::Result<()> {
    let target = record.target();
    let target = target
        .strip_prefix("ringmark_")
        .and_then(|t| t.split_once("::"))
        .map_or(target, |(_, module)| module);
    writeln!(
        out,
        "[{:8.3}s {:>5} {}] {}",
        elapsed,
        record.level(),
        target,
        record.args()
    )
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger with the provided level filter.
///
/// Only the first call installs; later calls keep the original level.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| StderrLogger {
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// Parse a level name (`"off"`, `"info"`, `"trace"`, ...), defaulting to `Info`.
pub fn parse_level(name: &str) -> LevelFilter {
    LevelFilter::from_str(name).unwrap_or(LevelFilter::Info)
}

#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        let _ = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .json()
            .flatten_event(true)
            .finish()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init();
    }
}
