//! Log line layout: `<timestamp> <LEVEL>: <message>`
//!
//! Timestamps are local time with millisecond precision, e.g.
//! `2013-10-14 10:00:00,123 DEBUG: Node node1 is online`.

use chrono::Local;
use std::fmt;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// Event formatter producing `<timestamp> <LEVEL>: <message>` lines
#[derive(Debug, Clone, Copy, Default)]
pub struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
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
        write!(
            writer,
            "{} {}: ",
            Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            event.metadata().level()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// `RUST_LOG` when set, otherwise the configured level
pub fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("debug"))
}

/// Install the global subscriber
pub fn init(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(level))
        .event_format(LineFormat)
        .init();
}
