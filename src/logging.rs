//! # Logging
//!
//! Single-line `LEVEL:\t message` records on stderr, filtered by `RUST_LOG`
//! (or `--log-filter`) with a default that keeps the AMQP client quiet.
//!
//! The binary installs the subscriber once per process with [`init_logging`].
//! Tests build the same subscriber over their own writer with [`subscriber`]
//! and install it with `tracing::subscriber::set_default`.

use std::fmt;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{ConfigResult, ConfigurationError};
use crate::constants::DEFAULT_LOG_FILTER;

/// Event formatter producing `LEVEL:\t message key=value...`
#[derive(Debug, Default, Clone, Copy)]
pub struct PulseLogFormat;

/// Level names as operators' log tooling expects them
fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARNING",
        Level::INFO => "INFO",
        Level::DEBUG => "DEBUG",
        Level::TRACE => "TRACE",
    }
}

impl<S, N> FormatEvent<S, N> for PulseLogFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(writer, "{}:\t ", level_name(event.metadata().level()))?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Resolve the filter: explicit directive, then `RUST_LOG`, then the default
pub fn env_filter(directives: Option<&str>) -> ConfigResult<EnvFilter> {
    match directives {
        Some(directives) => EnvFilter::try_new(directives).map_err(|e| {
            ConfigurationError::invalid_value("log_filter", directives, e.to_string())
        }),
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))),
    }
}

/// The worker's subscriber writing to `writer`
pub fn subscriber<W>(filter: EnvFilter, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .event_format(PulseLogFormat)
        .with_writer(writer)
        .finish()
}

/// Install the process-wide subscriber
///
/// Calling this again after a subscriber is installed is a no-op.
pub fn init_logging(directives: Option<&str>) -> ConfigResult<()> {
    let filter = env_filter(directives)?;
    if subscriber(filter, std::io::stderr).try_init().is_err() {
        tracing::debug!("Global tracing subscriber already initialized");
    }
    Ok(())
}
