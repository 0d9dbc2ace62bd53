use tracing_subscriber::{
    fmt::{self, format::FmtSpan, MakeWriter},
    layer::Layer as LayerTrait,
    registry::LookupSpan,
};

use crate::logging::config::{LogFormat, LoggingConfig};

/// Строит форматирующий layer по конфигурации.
///
/// Возвращаем boxed trait-объект, чтобы стереть конкретный тип формата
/// (json/pretty/compact).
pub fn build_formatter_from_config<S, W>(
    config: &LoggingConfig,
    writer: W,
) -> Box<dyn LayerTrait<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match config.format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .event_format(fmt::format().json().with_current_span(true))
                .with_writer(writer)
                .with_ansi(false)
                .with_target(config.with_target)
                .with_thread_ids(config.with_thread_ids);
            Box::new(layer)
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .event_format(fmt::format().pretty())
                .with_span_events(FmtSpan::CLOSE)
                .with_writer(writer)
                .with_ansi(config.with_ansi)
                .with_target(config.with_target)
                .with_thread_ids(config.with_thread_ids);
            Box::new(layer)
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .event_format(fmt::format().compact())
                .with_writer(writer)
                .with_ansi(config.with_ansi)
                .with_target(config.with_target)
                .with_thread_ids(config.with_thread_ids);
            Box::new(layer)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::{prelude::*, registry::Registry};

    use super::*;

    #[derive(Clone)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Buffer {
        fn write(
            &mut self,
            buf: &[u8],
        ) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture(format: LogFormat) -> String {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let writer = {
            let buf = buf.clone();
            move || Buffer(buf.clone())
        };
        let cfg = LoggingConfig {
            format,
            with_ansi: false,
            ..Default::default()
        };
        let layer = build_formatter_from_config::<Registry, _>(&cfg, writer);

        tracing::subscriber::with_default(Registry::default().with(layer), || {
            tracing::info!(channel = "orders", deliveries = 3, "message fanned out");
        });

        let out = buf.lock().unwrap();
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Тест проверяет, что JSON-формат выдаёт разбираемую строку с полями.
    #[test]
    fn test_json_format_has_fields() {
        let out = capture(LogFormat::Json);
        let line = out.lines().next().expect("one log line");
        let value: serde_json::Value = serde_json::from_str(line).expect("valid json");
        assert_eq!(value["fields"]["channel"], "orders");
        assert_eq!(value["fields"]["deliveries"], 3);
    }

    #[test]
    fn test_compact_and_pretty_formats_write_message() {
        for format in [LogFormat::Compact, LogFormat::Pretty] {
            let out = capture(format);
            assert!(
                out.contains("message fanned out"),
                "формат {format:?} должен писать сообщение"
            );
        }
    }
}
