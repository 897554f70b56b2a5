use crate::server::ServerError;
use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const DEFAULT_FILTER: &str = "duo_session=debug,duo_server=debug,tower_http=debug,axum=info,warn";

fn telemetry_enabled() -> bool {
    env::var("ENABLE_TELEMETRY")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false)
}

/// Installs the global subscriber: JSON logs filtered by `RUST_LOG`, plus a
/// Jaeger exporter when built with `telemetry` and `ENABLE_TELEMETRY=true`.
pub fn init_telemetry() -> Result<(), ServerError> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .json();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    #[cfg(feature = "telemetry")]
    {
        if telemetry_enabled() {
            let (tracer, endpoint) = jaeger::tracer()?;
            Registry::default()
                .with(env_filter)
                .with(fmt_layer)
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .try_init()
                .map_err(|e| ServerError::Telemetry(e.to_string()))?;

            tracing::info!(%endpoint, "Telemetry initialized");
            return Ok(());
        }
    }

    Registry::default()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| ServerError::Telemetry(e.to_string()))?;

    if telemetry_enabled() && cfg!(not(feature = "telemetry")) {
        tracing::warn!("ENABLE_TELEMETRY is set but the server was built without telemetry");
    } else {
        tracing::info!("Telemetry disabled");
    }
    Ok(())
}

pub fn shutdown_telemetry() {
    #[cfg(feature = "telemetry")]
    {
        if telemetry_enabled() {
            opentelemetry::global::shutdown_tracer_provider();
        }
    }
}

#[cfg(feature = "telemetry")]
mod jaeger {
    use crate::server::ServerError;
    use opentelemetry::sdk::propagation::TraceContextPropagator;
    use opentelemetry::sdk::{
        trace::{self, RandomIdGenerator, Sampler, Tracer},
        Resource,
    };
    use opentelemetry::{global, KeyValue};
    use std::env;

    const SERVICE_NAME: &str = "duo-session";

    pub fn tracer() -> Result<(Tracer, String), ServerError> {
        global::set_text_map_propagator(TraceContextPropagator::new());

        let endpoint = env::var("JAEGER_ENDPOINT")
            .unwrap_or_else(|_| "http://jaeger:14268/api/traces".to_string());

        let tracer = opentelemetry_jaeger::new_collector_pipeline()
            .with_service_name(SERVICE_NAME)
            .with_endpoint(&endpoint)
            .with_isahc()
            .with_trace_config(
                trace::config()
                    .with_sampler(Sampler::AlwaysOn)
                    .with_id_generator(RandomIdGenerator::default())
                    .with_max_events_per_span(64)
                    .with_max_attributes_per_span(16)
                    .with_resource(Resource::new(vec![
                        KeyValue::new("service.name", SERVICE_NAME),
                        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                    ])),
            )
            .with_timeout(std::time::Duration::from_secs(2))
            .install_batch(opentelemetry::runtime::Tokio)
            .map_err(|e| ServerError::Telemetry(e.to_string()))?;

        Ok((tracer, endpoint))
    }
}
