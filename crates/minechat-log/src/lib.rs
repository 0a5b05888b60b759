//! Structured logging for the minechat client.
//!
//! Two output shapes on stdout, via the `tracing` ecosystem:
//!
//! - the general console layer: timestamps, module paths, severity,
//!   filterable with `RUST_LOG` or the configured level;
//! - a bare `[unix-time] message` layer owned exclusively by the watchdog's
//!   liveness log, so the connection heartbeat reads like a ticker rather
//!   than an application log.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use minechat_net::WATCHDOG_TARGET;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, filter, fmt as fmt_layer};

/// Initialize the tracing subscriber.
///
/// `log_level` is the default filter directive; `RUST_LOG` overrides it.
/// Safe to call once per process.
pub fn init_logging(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let console_layer = fmt_layer::layer()
        .with_target(true)
        .with_level(true)
        .with_filter(filter::filter_fn(|meta| meta.target() != WATCHDOG_TARGET))
        .with_filter(env_filter);

    let watchdog_layer = fmt_layer::layer()
        .event_format(WatchdogFormat)
        .with_filter(filter::filter_fn(|meta| meta.target() == WATCHDOG_TARGET));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(watchdog_layer)
        .init();
}

/// `[unix-time] message` — the liveness ticker format.
struct WatchdogFormat;

impl<S, N> FormatEvent<S, N> for WatchdogFormat
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
        let epoch_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        write!(writer, "[{epoch_secs}] ")?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    /// Writer double collecting everything a layer emits.
    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Capture {
        type Writer = Capture;

        fn make_writer(&'a self) -> Capture {
            self.clone()
        }
    }

    #[test]
    fn test_watchdog_layer_only_sees_its_target() {
        let capture = Capture::default();
        let layer = fmt_layer::layer()
            .event_format(WatchdogFormat)
            .with_writer(capture.clone())
            .with_filter(filter::filter_fn(|meta| meta.target() == WATCHDOG_TARGET));
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "watchdog", "Connection is alive. Message sent");
            tracing::info!("routine application event");
        });

        let output = capture.contents();
        assert!(output.contains("Connection is alive. Message sent"));
        assert!(
            !output.contains("routine application event"),
            "the ticker must not pick up general logs: {output}"
        );
    }

    #[test]
    fn test_console_layer_excludes_watchdog_target() {
        let capture = Capture::default();
        let layer = fmt_layer::layer()
            .with_target(true)
            .with_ansi(false)
            .with_writer(capture.clone())
            .with_filter(filter::filter_fn(|meta| meta.target() != WATCHDOG_TARGET));
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "watchdog", "Connection is alive. Message sent");
            tracing::info!("routine application event");
        });

        let output = capture.contents();
        assert!(output.contains("routine application event"));
        assert!(
            !output.contains("Connection is alive"),
            "liveness lines belong to the ticker layer alone: {output}"
        );
    }

    #[test]
    fn test_watchdog_format_is_a_unix_time_ticker() {
        let capture = Capture::default();
        let layer = fmt_layer::layer()
            .event_format(WatchdogFormat)
            .with_writer(capture.clone())
            .with_filter(filter::filter_fn(|meta| meta.target() == WATCHDOG_TARGET));
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "watchdog", "Connection is alive. Ping message was successful");
        });

        let output = capture.contents();
        let (stamp, message) = output
            .split_once("] ")
            .expect("ticker line starts with a bracketed timestamp");
        assert!(stamp.starts_with('['));
        assert!(
            stamp[1..].chars().all(|c| c.is_ascii_digit()),
            "timestamp is whole epoch seconds: {stamp}"
        );
        assert_eq!(
            message.trim_end(),
            "Connection is alive. Ping message was successful"
        );
    }
}
