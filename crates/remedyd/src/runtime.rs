use async_trait::async_trait;
use bollard::query_parameters::{ListContainersOptionsBuilder, RestartContainerOptionsBuilder};
use bollard::{Docker, API_DEFAULT_VERSION};
use remedy_core::config::RuntimeConfig;
use remedy_core::error::RemedyError;
use remedy_core::types::ContainerHandle;
use tracing::debug;

/// The subset of the local container runtime the remediation engine needs.
#[async_trait]
pub(crate) trait ContainerRuntime: Send + Sync {
    async fn list_containers(
        &self,
        include_stopped: bool,
    ) -> Result<Vec<ContainerHandle>, RemedyError>;

    async fn restart(
        &self,
        handle: &ContainerHandle,
        timeout_seconds: u32,
    ) -> Result<(), RemedyError>;
}

/// Every container whose name starts with `service`, in runtime listing
/// order. `cart` also matches `cart-service-worker`; callers accept that.
pub(crate) async fn find_containers(
    runtime: &dyn ContainerRuntime,
    service: &str,
) -> Result<Vec<ContainerHandle>, RemedyError> {
    let all = runtime.list_containers(true).await?;
    Ok(all
        .into_iter()
        .filter(|c| c.name.starts_with(service))
        .collect())
}

pub(crate) struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    pub(crate) fn connect(cfg: &RuntimeConfig) -> Result<Self, RemedyError> {
        let docker = Docker::connect_with_socket(
            &cfg.socket_path,
            cfg.client_timeout_seconds.max(1),
            API_DEFAULT_VERSION,
        )
        .map_err(|err| {
            RemedyError::RuntimeUnavailable(format!("connect {} failed: {err}", cfg.socket_path))
        })?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_containers(
        &self,
        include_stopped: bool,
    ) -> Result<Vec<ContainerHandle>, RemedyError> {
        let summaries = self
            .docker
            .list_containers(Some(
                ListContainersOptionsBuilder::new()
                    .all(include_stopped)
                    .build(),
            ))
            .await
            .map_err(|err| RemedyError::RuntimeUnavailable(err.to_string()))?;

        let handles: Vec<ContainerHandle> = summaries
            .into_iter()
            .filter_map(|s| {
                let id = s.id?;
                let name = s
                    .names
                    .as_ref()
                    .and_then(|names| names.first())
                    .map(|n| normalize_name(n))
                    .unwrap_or_else(|| id.clone());
                Some(ContainerHandle { id, name })
            })
            .collect();
        debug!("runtime listed {} container(s)", handles.len());
        Ok(handles)
    }

    async fn restart(
        &self,
        handle: &ContainerHandle,
        timeout_seconds: u32,
    ) -> Result<(), RemedyError> {
        let t = i32::try_from(timeout_seconds).unwrap_or(i32::MAX);
        self.docker
            .restart_container(
                &handle.id,
                Some(RestartContainerOptionsBuilder::new().t(t).build()),
            )
            .await
            .map_err(|err| RemedyError::RestartFailed {
                container: handle.name.clone(),
                reason: err.to_string(),
            })
    }
}

// The engine API reports names as "/web-1".
fn normalize_name(raw: &str) -> String {
    raw.trim_start_matches('/').to_string()
}
