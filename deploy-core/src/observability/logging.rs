use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

type FormatLayer = Box<dyn Layer<Registry> + Send + Sync>;

static LOG_HANDLE: OnceLock<Option<reload::Handle<FormatLayer, Registry>>> = OnceLock::new();

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

fn format_layer(format: LogFormat) -> FormatLayer {
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed(),
    }
}

/// Install the global subscriber once. `RUST_LOG` overrides `default_level`.
pub fn setup_logging(format: LogFormat, default_level: &str) {
    LOG_HANDLE.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));
        let (layer, handle) = reload::Layer::new(format_layer(format));

        // A subscriber may already be installed (e.g. by a test harness)
        tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .try_init()
            .ok()
            .map(|_| handle)
    });
}

/// Switch the output format of the subscriber installed by `setup_logging`.
pub fn set_log_format(format: LogFormat) {
    if let Some(Some(handle)) = LOG_HANDLE.get() {
        if let Err(e) = handle.reload(format_layer(format)) {
            tracing::warn!(error = %e, "could not switch log format");
        }
    }
}
