use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, MetricsError},
    trace::{TraceError, TracerProvider as _},
};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource, runtime,
    trace::{RandomIdGenerator, Sampler, Tracer},
};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

pub const METER_NAME: &str = "users-cache-service";
const METRICS_EXPORT_PERIOD: Duration = Duration::from_secs(30);

/// Logging and OpenTelemetry export settings
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: String,
    /// OTLP endpoint (e.g., "http://localhost:4317")
    pub otlp_endpoint: String,
    /// Export metrics over OTLP
    pub enable_metrics: bool,
    /// Export spans over OTLP
    pub enable_tracing: bool,
    /// Filter used when RUST_LOG is not a valid directive
    pub log_level: String,
    /// Emit logs as JSON lines instead of the human format
    pub json_logs: bool,
}

fn flag_from<F: Fn(&str) -> Option<String>>(lookup: F, name: &str, default: bool) -> bool {
    lookup(name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(name: &str, default: bool) -> bool {
    flag_from(|key| std::env::var(key).ok(), name, default)
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: env!("CARGO_PKG_NAME").to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4317".to_string()),
            enable_metrics: env_flag("OTEL_ENABLE_METRICS", false),
            enable_tracing: env_flag("OTEL_ENABLE_TRACING", false),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            json_logs: env_flag("LOG_JSON", false),
        }
    }
}

impl TelemetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn with_otlp_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = endpoint.into();
        self
    }

    pub fn with_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = enable;
        self
    }

    pub fn with_tracing(mut self, enable: bool) -> Self {
        self.enable_tracing = enable;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn with_json_logs(mut self, enable: bool) -> Self {
        self.json_logs = enable;
        self
    }
}

fn service_resource(config: &TelemetryConfig) -> Resource {
    use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};

    Resource::new([
        KeyValue::new(SERVICE_NAME, config.service_name.clone()),
        KeyValue::new(SERVICE_VERSION, config.service_version.clone()),
    ])
}

/// OTLP/gRPC span pipeline; also registered as the global tracer provider
fn otlp_tracer(config: &TelemetryConfig, resource: Resource) -> Result<Tracer, TraceError> {
    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(config.otlp_endpoint.as_str());
    let trace_config = opentelemetry_sdk::trace::Config::default()
        .with_sampler(Sampler::ParentBased(Box::new(Sampler::AlwaysOn)))
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource);

    let provider = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(trace_config)
        .install_batch(runtime::Tokio)?;

    global::set_tracer_provider(provider.clone());
    Ok(provider.tracer(config.service_name.clone()))
}

/// OTLP/gRPC metric pipeline, exporting every `METRICS_EXPORT_PERIOD`
fn install_otlp_meter(config: &TelemetryConfig, resource: Resource) -> Result<(), MetricsError> {
    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(config.otlp_endpoint.as_str());

    let provider = opentelemetry_otlp::new_pipeline()
        .metrics(runtime::Tokio)
        .with_exporter(exporter)
        .with_resource(resource)
        .with_period(METRICS_EXPORT_PERIOD)
        .build()?;

    global::set_meter_provider(provider);
    Ok(())
}

/// Install the global tracing subscriber.
///
/// Console logging is always on. OTLP span export and OTLP metric export
/// are added only when enabled in the config; with metrics disabled the
/// global meter is a no-op and counters cost nothing.
pub fn init_telemetry(config: Option<TelemetryConfig>) -> Result<(), Box<dyn std::error::Error>> {
    let config = config.unwrap_or_default();
    let resource = service_resource(&config);

    let tracer = config
        .enable_tracing
        .then(|| otlp_tracer(&config, resource.clone()))
        .transpose()?;

    if config.enable_metrics {
        install_otlp_meter(&config, resource)?;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console = if config.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_filter(filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .with_filter(filter)
            .boxed()
    };

    let otel = tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    tracing_subscriber::registry()
        .with(console)
        .with(otel)
        .try_init()?;

    info!(
        service = %config.service_name,
        version = %config.service_version,
        tracing = config.enable_tracing,
        metrics = config.enable_metrics,
        "Telemetry initialized"
    );

    Ok(())
}

/// Flush pending spans before exit
pub fn shutdown_telemetry() {
    info!("Shutting down telemetry");
    global::shutdown_tracer_provider();
}

/// Monotonic counter registered on the service meter
pub fn create_counter(name: &str, description: &str) -> Counter<u64> {
    global::meter(METER_NAME)
        .u64_counter(name.to_string())
        .with_description(description.to_string())
        .init()
}
