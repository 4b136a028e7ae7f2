//! A tracing layer that speaks GitHub Actions workflow commands.
//!
//! The runner scans step stdout for lines such as `::warning::text` and turns
//! them into annotations. Informational events are printed as plain lines.

use std::fmt::{self, Write as _};
use std::io::Write;

use tracing::field::{Field, Visit};
use tracing::{Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

/// Escape a message for use as workflow command data.
#[must_use]
pub fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Render one event as a workflow command line.
#[must_use]
pub fn format_command(level: Level, message: &str) -> String {
    let message = escape_data(message);
    match level {
        Level::ERROR => format!("::error::{message}"),
        Level::WARN => format!("::warning::{message}"),
        Level::INFO => message,
        Level::DEBUG | Level::TRACE => format!("::debug::{message}"),
    }
}

/// Writes every event it sees as a workflow command.
pub struct WorkflowCommandLayer<W> {
    make_writer: W,
}

impl<W> WorkflowCommandLayer<W>
where
    W: for<'w> MakeWriter<'w> + 'static,
{
    /// Create a layer writing to `make_writer`, usually `std::io::stdout`.
    pub const fn new(make_writer: W) -> Self {
        Self { make_writer }
    }
}

impl<S, W> Layer<S> for WorkflowCommandLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let line = format_command(*event.metadata().level(), &visitor.finish());
        let mut writer = self.make_writer.make_writer();
        let _ = writeln!(writer, "{line}");
    }
}

/// Collects the event message followed by its fields as `key=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields
        } else {
            format!("{} ({})", self.message, self.fields)
        }
    }

    fn push_field(&mut self, name: &str, value: fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{name}={value}");
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.push_field(field.name(), format_args!("{value}"));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.push_field(field.name(), format_args!("{value:?}"));
        }
    }
}

#[cfg(test)]
pub(crate) mod capture {
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Shared in-memory sink for a [`super::WorkflowCommandLayer`].
    #[derive(Clone, Default)]
    pub struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        pub fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// A subscriber that records workflow commands into `captured`.
    pub fn subscriber(captured: &Captured) -> impl tracing::Subscriber + Send + Sync {
        use tracing_subscriber::layer::SubscriberExt;

        let sink = captured.clone();
        tracing_subscriber::registry()
            .with(super::WorkflowCommandLayer::new(move || sink.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::capture::{Captured, subscriber};
    use super::*;

    #[test]
    fn test_escape_data() {
        assert_eq!(escape_data("100% done"), "100%25 done");
        assert_eq!(escape_data("a\r\nb"), "a%0D%0Ab");
        assert_eq!(escape_data("plain"), "plain");
    }

    #[test]
    fn test_format_command_levels() {
        assert_eq!(format_command(Level::ERROR, "boom"), "::error::boom");
        assert_eq!(format_command(Level::WARN, "careful"), "::warning::careful");
        assert_eq!(format_command(Level::INFO, "hello"), "hello");
        assert_eq!(format_command(Level::DEBUG, "detail"), "::debug::detail");
        assert_eq!(format_command(Level::TRACE, "x\ny"), "::debug::x%0Ay");
    }

    #[test]
    fn test_layer_writes_commands() {
        let captured = Captured::default();
        tracing::subscriber::with_default(subscriber(&captured), || {
            tracing::warn!("Both inputs set");
            tracing::info!(version = "1.26.0", "Setting up");
            tracing::debug!("line one\nline two");
        });

        let lines: Vec<String> = captured.contents().lines().map(String::from).collect();
        assert_eq!(
            lines,
            vec![
                "::warning::Both inputs set".to_string(),
                "Setting up (version=1.26.0)".to_string(),
                "::debug::line one%0Aline two".to_string(),
            ]
        );
    }
}
