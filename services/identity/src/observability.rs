//! Tracing, trace propagation, and Prometheus metrics for the identity service.
//!
//! Initialization runs once per process; later calls only hand back the
//! metrics handle.
use crate::config::{DirectoryBackend, IdentityConfig};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use opentelemetry::KeyValue;
use opentelemetry::propagation::{Extractor, TextMapPropagator};
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const SERVICE_NAME: &str = "roster-identity";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static TRACING_INIT: OnceLock<()> = OnceLock::new();

pub fn init_observability(config: &IdentityConfig) -> anyhow::Result<PrometheusHandle> {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer());
        let otel_layer = config.otlp_endpoint.as_deref().and_then(|endpoint| {
            match build_tracer_provider(endpoint, config) {
                Ok(provider) => Some(
                    tracing_opentelemetry::layer().with_tracer(provider.tracer(SERVICE_NAME)),
                ),
                Err(err) => {
                    eprintln!("otlp exporter disabled: {err}");
                    None
                }
            }
        });
        let _ = registry.with(otel_layer).try_init();
    });

    install_metrics_recorder()
}

fn build_tracer_provider(
    endpoint: &str,
    config: &IdentityConfig,
) -> anyhow::Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;
    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(
            Resource::builder_empty()
                .with_attributes(resource_attributes(config))
                .build(),
        )
        .build())
}

fn resource_attributes(config: &IdentityConfig) -> Vec<KeyValue> {
    let backend = match config.backend {
        DirectoryBackend::Memory => "memory",
        DirectoryBackend::Ldap => "ldap",
    };
    let mut attrs = vec![
        KeyValue::new("service.name", SERVICE_NAME),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        KeyValue::new("roster.directory.backend", backend),
        KeyValue::new("roster.people_tree", config.people_tree.clone()),
    ];
    if let Some(ldap) = &config.ldap {
        attrs.push(KeyValue::new("server.address", ldap.server.clone()));
    }
    attrs
}

/// Remote parent of an incoming request, read from its W3C `traceparent` header.
pub fn trace_context_from_headers(headers: &axum::http::HeaderMap) -> opentelemetry::Context {
    TraceContextPropagator::new().extract(&HeaderMapExtractor(headers))
}

struct HeaderMapExtractor<'a>(&'a axum::http::HeaderMap);

impl Extractor for HeaderMapExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|name| name.as_str()).collect()
    }
}

pub async fn serve_metrics(handle: PrometheusHandle, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve_metrics_with_listener(handle, listener, std::future::pending()).await
}

async fn serve_metrics_with_listener<F>(
    handle: PrometheusHandle,
    listener: tokio::net::TcpListener,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, metrics_router(handle).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
}

fn metrics_router(handle: PrometheusHandle) -> axum::Router {
    axum::Router::new().route(
        "/metrics",
        axum::routing::get(move || async move { handle.render() }),
    )
}

fn install_metrics_recorder() -> anyhow::Result<PrometheusHandle> {
    if let Some(handle) = METRICS_HANDLE.get() {
        return Ok(handle.clone());
    }
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    let _ = METRICS_HANDLE.set(handle.clone());
    Ok(handle)
}

fn describe_metrics() {
    metrics::describe_counter!(
        "roster_users_cache_hits_total",
        "Identity lookups answered from the cache"
    );
    metrics::describe_counter!(
        "roster_users_cache_misses_total",
        "Identity lookups that went to the directory"
    );
    metrics::describe_counter!(
        "roster_users_cache_evictions_total",
        "Expired identities dropped during cleanup"
    );
    metrics::describe_gauge!("roster_users_cached", "Identities currently cached");
    metrics::describe_counter!(
        "roster_people_resyncs_total",
        "Full roster reloads from the people tree"
    );
    metrics::describe_gauge!("roster_people_cached", "Accounts in the cached roster");
    metrics::describe_counter!(
        "roster_invites_redeemed_total",
        "Invites bound to an external id"
    );
}
