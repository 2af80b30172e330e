use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "configs/config.toml";
pub const CONFIG_PATH_ENV: &str = "REMEDY_CONFIG";
pub const PROMETHEUS_URL_ENV: &str = "PROMETHEUS_URL";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub restart: RestartConfig,
    #[serde(default)]
    pub scale: ScaleConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_socket_path")]
    pub socket_path: String,
    #[serde(default = "default_client_timeout_seconds")]
    pub client_timeout_seconds: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            client_timeout_seconds: default_client_timeout_seconds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestartConfig {
    #[serde(default = "default_restart_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_restart_retry_delay_seconds")]
    pub retry_delay_seconds: u64,
    #[serde(default = "default_container_timeout_seconds")]
    pub container_timeout_seconds: u32,
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_restart_max_attempts(),
            retry_delay_seconds: default_restart_retry_delay_seconds(),
            container_timeout_seconds: default_container_timeout_seconds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScaleConfig {
    /// Program and leading arguments; `{service}={replicas}` is appended.
    /// From the environment it is a space-separated list.
    #[serde(default = "default_scale_command")]
    pub command: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default = "default_scale_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_replicas")]
    pub default_replicas: i64,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            command: default_scale_command(),
            working_dir: None,
            timeout_seconds: default_scale_timeout_seconds(),
            default_replicas: default_replicas(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_base_url")]
    pub base_url: String,
    #[serde(default = "default_metrics_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,
    #[serde(default = "default_metrics_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            base_url: default_metrics_base_url(),
            connect_timeout_seconds: default_metrics_connect_timeout_seconds(),
            timeout_seconds: default_metrics_timeout_seconds(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_socket_path() -> String {
    "/var/run/docker.sock".to_string()
}

fn default_client_timeout_seconds() -> u64 {
    60
}

fn default_restart_max_attempts() -> usize {
    5
}

fn default_restart_retry_delay_seconds() -> u64 {
    2
}

fn default_container_timeout_seconds() -> u32 {
    10
}

fn default_scale_command() -> Vec<String> {
    ["docker", "compose", "up", "-d", "--scale"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_scale_timeout_seconds() -> u64 {
    120
}

fn default_replicas() -> i64 {
    2
}

fn default_metrics_base_url() -> String {
    "http://prometheus:9090".to_string()
}

fn default_metrics_connect_timeout_seconds() -> u64 {
    5
}

fn default_metrics_timeout_seconds() -> u64 {
    30
}

impl AppConfig {
    /// Loads the optional TOML file at `path`, then `REMEDY__SECTION__KEY`
    /// variables, then `PROMETHEUS_URL`. A blank `PROMETHEUS_URL` is ignored.
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("REMEDY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(" ")
                    .with_list_parse_key("scale.command"),
            )
            .set_override_option(
                "metrics.base_url",
                std::env::var(PROMETHEUS_URL_ENV)
                    .ok()
                    .filter(|v| !v.trim().is_empty()),
            )?
            .build()?;
        cfg.try_deserialize()
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, config::ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()?;
        cfg.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = AppConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.server.listen, "0.0.0.0:5000");
        assert_eq!(cfg.runtime.socket_path, "/var/run/docker.sock");
        assert_eq!(cfg.restart.max_attempts, 5);
        assert_eq!(cfg.restart.retry_delay_seconds, 2);
        assert_eq!(cfg.restart.container_timeout_seconds, 10);
        assert_eq!(cfg.scale.default_replicas, 2);
        assert_eq!(
            cfg.scale.command,
            vec!["docker", "compose", "up", "-d", "--scale"]
        );
        assert_eq!(cfg.metrics.base_url, "http://prometheus:9090");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = AppConfig::from_toml_str(
            r#"
[scale]
working_dir = "/srv/demo"
timeout_seconds = 30

[metrics]
base_url = "http://localhost:9090"
"#,
        )
        .unwrap();
        assert_eq!(cfg.scale.working_dir.as_deref(), Some("/srv/demo"));
        assert_eq!(cfg.scale.timeout_seconds, 30);
        assert_eq!(cfg.scale.default_replicas, 2);
        assert_eq!(cfg.metrics.base_url, "http://localhost:9090");
        assert_eq!(cfg.metrics.connect_timeout_seconds, 5);
        assert_eq!(cfg.restart.max_attempts, 5);
    }

    // Only test in this crate that touches the process environment.
    #[test]
    fn environment_overrides_missing_file() {
        let missing = "/nonexistent/remedy/config.toml";
        std::env::set_var(PROMETHEUS_URL_ENV, "http://metrics.internal:9091");
        std::env::set_var("REMEDY__RESTART__MAX_ATTEMPTS", "7");
        std::env::set_var("REMEDY__SCALE__COMMAND", "podman compose up -d --scale");

        let cfg = AppConfig::load(missing).unwrap();
        assert_eq!(cfg.metrics.base_url, "http://metrics.internal:9091");
        assert_eq!(cfg.restart.max_attempts, 7);
        assert_eq!(
            cfg.scale.command,
            vec!["podman", "compose", "up", "-d", "--scale"]
        );
        assert_eq!(cfg.restart.retry_delay_seconds, 2);

        std::env::set_var(PROMETHEUS_URL_ENV, "  ");
        let cfg = AppConfig::load(missing).unwrap();
        assert_eq!(cfg.metrics.base_url, "http://prometheus:9090");

        std::env::remove_var(PROMETHEUS_URL_ENV);
        std::env::remove_var("REMEDY__RESTART__MAX_ATTEMPTS");
        std::env::remove_var("REMEDY__SCALE__COMMAND");
        let cfg = AppConfig::load(missing).unwrap();
        assert_eq!(cfg.restart.max_attempts, 5);
        assert_eq!(cfg.scale.command, default_scale_command());
    }
}
