use std::io::IsTerminal;

use crate::config::EmulationConfig;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber. Keep the guard alive until exit or the
/// file writer drops buffered events.
///
/// Progress lines are written to stdout directly, so the stderr layer here
/// only carries run-level events (start and total, setup, divergence, summary).
pub fn init_logging(config: &EmulationConfig) -> WorkerGuard {
    let file_appender = match config.rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(&config.log_dir, &config.log_file),
        "daily" => tracing_appender::rolling::daily(&config.log_dir, &config.log_file),
        _ => tracing_appender::rolling::never(&config.log_dir, &config.log_file),
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let subscriber = build_subscriber(
        config,
        non_blocking,
        std::io::stderr,
        std::io::stderr().is_terminal(),
    );

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Logging already initialised: {}", e);
    }

    guard
}

/// File layer (JSON or text) plus a human-readable console layer.
///
/// The console layer is present in both modes so the pre-run total is
/// visible to whoever watches the terminal.
fn build_subscriber<F, C>(
    config: &EmulationConfig,
    file_writer: F,
    console_writer: C,
    console_ansi: bool,
) -> Box<dyn Subscriber + Send + Sync>
where
    F: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    C: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(console_writer)
        .with_ansi(console_ansi);
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer);

    if config.use_json {
        let file_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_writer(file_writer)
            .with_ansi(false);
        Box::new(registry.with(file_layer))
    } else {
        let file_layer = fmt::layer()
            .with_target(false)
            .with_writer(file_writer)
            .with_ansi(false);
        Box::new(registry.with(file_layer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn config(use_json: bool) -> EmulationConfig {
        let yaml = format!(
            r#"
log_level: info
log_dir: ./logs
log_file: emulation.log
use_json: {}
rotation: never
candidate: {{ name: a, rpc_url: "http://127.0.0.1:8545", address: "0x01", weights_selector: "0xa11aa1b4" }}
reference: {{ name: b, rpc_url: "http://127.0.0.1:8545", address: "0x02", weights_selector: "0xa11aa1b4" }}
"#,
            use_json
        );
        EmulationConfig::from_yaml(&yaml).unwrap()
    }

    fn emit_start(use_json: bool) -> (String, String) {
        let console = Captured::default();
        let file = Captured::default();
        let (c, f) = (console.clone(), file.clone());
        let subscriber = build_subscriber(
            &config(use_json),
            move || f.clone(),
            move || c.clone(),
            false,
        );

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(total = 100000, "Starting emulation run");
        });
        (console.text(), file.text())
    }

    #[test]
    fn test_json_mode_keeps_console_layer() {
        let (console, file) = emit_start(true);
        assert!(console.contains("total=100000"), "console: {}", console);
        assert!(file.contains("\"total\":100000"), "file: {}", file);
    }

    #[test]
    fn test_text_mode_logs_to_console_and_file() {
        let (console, file) = emit_start(false);
        assert!(console.contains("Starting emulation run"));
        assert!(file.contains("total=100000"));
    }
}
