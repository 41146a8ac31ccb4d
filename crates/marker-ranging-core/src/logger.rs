//! Process-wide logging setup.
//!
//! `init_with_level` installs a stderr `log` backend; `init_tracing`
//! (feature `tracing`) installs a `tracing-subscriber` instead. Both apply
//! the requested level to the `marker_ranging*` crates and keep every other
//! target at `warn`, and both write to stderr so stdout stays free for
//! command output.

use std::fmt::Arguments;
use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, util::SubscriberInitExt, EnvFilter};

/// Target prefix shared by every crate of the workspace.
const OWN_TARGET: &str = "marker_ranging";

/// Effective filter for `target` when ours run at `level`.
fn filter_for(target: &str, level: LevelFilter) -> LevelFilter {
    if target.starts_with(OWN_TARGET) {
        level
    } else {
        level.min(LevelFilter::Warn)
    }
}

fn format_line(elapsed: f64, level: Level, target: &str, args: &Arguments<'_>) -> String {
    let module = target.split("::").next().unwrap_or(target);
    format!("[{elapsed:8.3}s {level:<5} {module}] {args}")
}

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= filter_for(metadata.target(), self.level)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(
            self.started.elapsed().as_secs_f64(),
            record.level(),
            record.target(),
            record.args(),
        );
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger. Later calls keep the first level.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| StderrLogger {
        level,
        started: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// `EnvFilter` directives used when `RUST_LOG` is unset.
#[cfg(feature = "tracing")]
fn default_directives(level: LevelFilter) -> String {
    let level = level.to_string().to_lowercase();
    format!("warn,{OWN_TARGET}={level},{OWN_TARGET}_core={level},{OWN_TARGET}_vision={level},{OWN_TARGET}_session={level}")
}

/// Install a `tracing` fmt subscriber on stderr. `RUST_LOG` overrides
/// `level` when set. Spans report their duration on close.
#[cfg(feature = "tracing")]
pub fn init_tracing(level: LevelFilter, json: bool) {
    use tracing_subscriber::fmt::format::FmtSpan;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));
    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}
