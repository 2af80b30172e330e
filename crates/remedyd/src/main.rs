use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use remedy_core::config::{AppConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use tracing::info;

mod metrics_cleanup;
mod observe;
mod process;
mod remediation;
mod retry;
mod routes;
mod runtime;

use metrics_cleanup::MetricsCleaner;
use observe::TracingObserver;
use process::TokioProcessInvoker;
use remediation::Remediator;
use routes::AppState;
use runtime::DockerRuntime;

static LOGGING: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGING.get_or_init(|| {
        tracing_subscriber::fmt()
            // info unless RUST_LOG says otherwise.
            .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
            .with_target(false)
            .compact()
            .init();
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config_path =
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = AppConfig::load(&config_path)?;
    info!(
        "config loaded path={} listen={} prometheus={}",
        config_path, config.server.listen, config.metrics.base_url
    );

    let runtime = DockerRuntime::connect(&config.runtime)
        .map_err(|err| anyhow::anyhow!("container runtime: {err}"))?;
    info!("container runtime socket: {}", config.runtime.socket_path);

    let invoker = TokioProcessInvoker::new(
        config.scale.working_dir.as_ref().map(PathBuf::from),
        Duration::from_secs(config.scale.timeout_seconds.max(1)),
    );
    info!(
        "scale command: {} (timeout {}s)",
        config.scale.command.join(" "),
        config.scale.timeout_seconds.max(1)
    );
    info!(
        "restart policy: attempts={} delay={}s container_timeout={}s",
        config.restart.max_attempts,
        config.restart.retry_delay_seconds,
        config.restart.container_timeout_seconds
    );

    let metrics = MetricsCleaner::from_config(&config.metrics)
        .map_err(|err| anyhow::anyhow!("metrics client: {err}"))?;

    let state = AppState {
        remediator: Arc::new(Remediator::from_config(
            &config,
            Arc::new(runtime),
            Arc::new(invoker),
        )),
        metrics,
        observer: Arc::new(TracingObserver),
        default_replicas: config.scale.default_replicas,
    };

    let app = routes::router(state);
    let listener = tokio::net::TcpListener::bind(&config.server.listen).await?;
    info!("remedyd listening on {}", config.server.listen);
    axum::serve(listener, app).await?;
    Ok(())
}
