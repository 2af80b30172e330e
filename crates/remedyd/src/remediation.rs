use std::sync::Arc;
use std::time::Duration;

use remedy_core::config::AppConfig;
use remedy_core::error::RemedyError;
use remedy_core::types::{ProcessResult, RemediationResult, ScaleRequest};
use tracing::{info, warn};

use crate::process::ProcessInvoker;
use crate::retry::RetryPolicy;
use crate::runtime::{find_containers, ContainerRuntime};

const MAX_DETAIL_CHARS: usize = 2000;

/// Turns a logical service name into runtime actions.
pub(crate) struct Remediator {
    runtime: Arc<dyn ContainerRuntime>,
    invoker: Arc<dyn ProcessInvoker>,
    restart_policy: RetryPolicy,
    container_timeout_seconds: u32,
    scale_command: Vec<String>,
}

impl Remediator {
    pub(crate) fn new(
        runtime: Arc<dyn ContainerRuntime>,
        invoker: Arc<dyn ProcessInvoker>,
        restart_policy: RetryPolicy,
        container_timeout_seconds: u32,
        scale_command: Vec<String>,
    ) -> Self {
        Self {
            runtime,
            invoker,
            restart_policy,
            container_timeout_seconds,
            scale_command,
        }
    }

    pub(crate) fn from_config(
        config: &AppConfig,
        runtime: Arc<dyn ContainerRuntime>,
        invoker: Arc<dyn ProcessInvoker>,
    ) -> Self {
        Self::new(
            runtime,
            invoker,
            RetryPolicy::fixed(
                config.restart.max_attempts,
                Duration::from_secs(config.restart.retry_delay_seconds),
            ),
            config.restart.container_timeout_seconds,
            config.scale.command.clone(),
        )
    }

    /// Restarts every container of `service`. The whole lookup + restart
    /// sequence is repeated on runtime faults, so containers restarted in a
    /// failed attempt are restarted again. `Err` means the policy gave up.
    pub(crate) async fn restart_service(
        &self,
        service: &str,
    ) -> Result<RemediationResult, RemedyError> {
        let label = format!("restart {service}");
        self.restart_policy
            .run(&label, RemedyError::is_retryable, || self.restart_once(service))
            .await
    }

    async fn restart_once(&self, service: &str) -> Result<RemediationResult, RemedyError> {
        let containers = find_containers(self.runtime.as_ref(), service).await?;
        if containers.is_empty() {
            warn!("no containers match service={service}");
            return Ok(RemediationResult::failed(
                RemedyError::ServiceNotFound(service.to_string()).to_string(),
            ));
        }

        for container in &containers {
            info!("restarting container={} service={service}", container.name);
            self.runtime
                .restart(container, self.container_timeout_seconds)
                .await?;
        }

        Ok(RemediationResult::ok(format!(
            "Restarted {} container(s) for {service}",
            containers.len()
        )))
    }

    /// Best effort: a zero exit from the orchestration tool counts as success
    /// even though the replicas may not have converged yet.
    pub(crate) async fn scale_service(&self, req: &ScaleRequest) -> RemediationResult {
        if req.replicas < 1 {
            return RemediationResult::failed("replicas must be >= 1");
        }

        let argv = self.scale_argv(req);
        info!("scaling service={} replicas={}", req.service, req.replicas);
        match self.invoker.run(&argv).await {
            Ok(out) if out.success() => RemediationResult::ok("Scale command issued"),
            Ok(out) => {
                let detail = describe_failed_exit(&argv, &out);
                warn!("scale failed service={}: {detail}", req.service);
                RemediationResult::failed(format!("Compose scale failed: {detail}"))
            }
            Err(err) => {
                warn!("scale failed service={}: {err}", req.service);
                RemediationResult::failed(format!("Compose scale failed: {err}"))
            }
        }
    }

    fn scale_argv(&self, req: &ScaleRequest) -> Vec<String> {
        let mut argv = self.scale_command.clone();
        argv.push(format!("{}={}", req.service, req.replicas));
        argv
    }
}

fn describe_failed_exit(argv: &[String], out: &ProcessResult) -> String {
    let mut detail = format!(
        "command '{}' returned exit status {}",
        argv.join(" "),
        out.exit_code
    );
    let stderr = out.stderr_text();
    if !stderr.is_empty() {
        detail.push_str("; stderr: ");
        detail.push_str(&stderr);
    }
    if detail.chars().count() > MAX_DETAIL_CHARS {
        detail = detail.chars().take(MAX_DETAIL_CHARS).collect();
    }
    detail
}
