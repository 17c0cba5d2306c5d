use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

pub const DEFAULT_API_BASE: &str = "http://localhost:11434";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    /// Daemon base URL used when no custom host is set.
    pub ollama_api_base: String,
    pub default_max_tokens: u32,
    pub default_temperature: f64,
    pub request_timeout: Duration,
    pub custom_ollama_ip: Option<String>,
    /// Where the runtime custom host is persisted. `None` keeps it in memory only.
    pub config_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080),
            ollama_api_base: DEFAULT_API_BASE.to_string(),
            default_max_tokens: 1000,
            default_temperature: 0.7,
            request_timeout: Duration::from_secs(1200),
            custom_ollama_ip: None,
            config_path: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let listen_addr = env::var("SERVER_ADDR")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.listen_addr);

        let ollama_api_base = env::var("OLLAMA_API_BASE")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.ollama_api_base);

        let default_max_tokens = env::var("OLLAMA_DEFAULT_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.default_max_tokens);
        let default_temperature = env::var("OLLAMA_DEFAULT_TEMPERATURE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.default_temperature);
        let request_timeout = env::var("OLLAMA_REQUEST_TIMEOUT")
            .ok()
            .and_then(|v| parse_timeout(&v))
            .unwrap_or(defaults.request_timeout);

        let custom_ollama_ip = env::var("OLLAMA_CUSTOM_IP")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let config_path = env::var("OLLAMA_CONFIG_PATH").ok().map(PathBuf::from);

        Ok(Self {
            listen_addr,
            ollama_api_base,
            default_max_tokens,
            default_temperature,
            request_timeout,
            custom_ollama_ip,
            config_path,
        })
    }
}

/// Seconds, fractional allowed ("1200", "2.5").
fn parse_timeout(raw: &str) -> Option<Duration> {
    let secs: f64 = raw.trim().parse().ok()?;
    Duration::try_from_secs_f64(secs).ok().filter(|d| !d.is_zero())
}
