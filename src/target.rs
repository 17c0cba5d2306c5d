//! Where the gateway sends its traffic.
//!
//! The daemon address is an immutable [`OllamaTarget`] snapshot. Updates build a
//! new snapshot and swap it in, so concurrent readers see either the old or the
//! new pair, never a mix.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::{config::AppConfig, error::GatewayError};

pub const DEFAULT_OLLAMA_PORT: u16 = 11434;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OllamaTarget {
    pub custom_ollama_ip: Option<String>,
    pub ollama_api_base: String,
}

impl OllamaTarget {
    pub fn resolve(custom_ollama_ip: Option<String>, default_base: &str) -> Self {
        let custom_ollama_ip = custom_ollama_ip.and_then(normalize_host);
        let ollama_api_base = resolve_base_url(custom_ollama_ip.as_deref(), default_base);
        Self {
            custom_ollama_ip,
            ollama_api_base,
        }
    }

    /// Rejects hosts that cannot form a URL, e.g. `10.0.0.1:9000` which would
    /// resolve to `http://10.0.0.1:9000:11434`.
    pub fn validate(&self) -> Result<(), GatewayError> {
        match reqwest::Url::parse(&self.ollama_api_base) {
            Ok(url) if url.has_host() => Ok(()),
            Ok(_) => Err(GatewayError::BadRequest(format!(
                "ollama base {:?} has no host",
                self.ollama_api_base
            ))),
            Err(err) => Err(GatewayError::BadRequest(format!(
                "custom_ollama_ip {:?} does not form a valid URL ({:?}): {err}; \
                 include the scheme to set a port, e.g. http://host:port",
                self.custom_ollama_ip.as_deref().unwrap_or_default(),
                self.ollama_api_base
            ))),
        }
    }

    /// `{base}{path}` without doubling the slash when the base ends in one.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.ollama_api_base.trim_end_matches('/'), path)
    }
}

pub fn resolve_base_url(custom_ollama_ip: Option<&str>, default_base: &str) -> String {
    match custom_ollama_ip {
        Some(host) if host.starts_with("http://") || host.starts_with("https://") => {
            host.to_string()
        }
        Some(host) => format!("http://{host}:{DEFAULT_OLLAMA_PORT}"),
        None => default_base.to_string(),
    }
}

fn normalize_host(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedTarget {
    custom_ollama_ip: Option<String>,
}

pub struct TargetStore {
    default_base: String,
    path: Option<PathBuf>,
    current: RwLock<Arc<OllamaTarget>>,
    /// Held across persist + swap so the file and the snapshot agree.
    update: Mutex<()>,
}

impl TargetStore {
    /// Builds the store from startup config. A value persisted on disk wins over
    /// `OLLAMA_CUSTOM_IP`.
    pub fn initialize(config: &AppConfig) -> Result<Self, GatewayError> {
        let persisted = match config.config_path.as_deref() {
            Some(path) => load_persisted(path)?,
            None => None,
        };
        let custom = persisted.or_else(|| config.custom_ollama_ip.clone());
        let mut target = OllamaTarget::resolve(custom, &config.ollama_api_base);
        if let Err(err) = target.validate() {
            warn!(%err, "ignoring unusable custom ollama host");
            target = OllamaTarget::resolve(None, &config.ollama_api_base);
        }
        info!(
            base = %target.ollama_api_base,
            custom = ?target.custom_ollama_ip,
            "resolved ollama target"
        );

        Ok(Self {
            default_base: config.ollama_api_base.clone(),
            path: config.config_path.clone(),
            current: RwLock::new(Arc::new(target)),
            update: Mutex::new(()),
        })
    }

    pub fn current(&self) -> Arc<OllamaTarget> {
        self.current.read().clone()
    }

    /// Applies a new custom host (`None` or blank clears it), persists it when a
    /// store path is configured, then publishes the new snapshot.
    pub fn set_custom_host(
        &self,
        custom_ollama_ip: Option<String>,
    ) -> Result<Arc<OllamaTarget>, GatewayError> {
        if let Some(host) = custom_ollama_ip.as_deref() {
            if host.trim().chars().any(char::is_whitespace) {
                return Err(GatewayError::BadRequest(format!(
                    "custom_ollama_ip must not contain whitespace: {host:?}"
                )));
            }
        }

        let target = OllamaTarget::resolve(custom_ollama_ip, &self.default_base);
        target.validate()?;
        let target = Arc::new(target);

        let _guard = self.update.lock();
        if let Some(path) = self.path.as_deref() {
            persist(path, target.custom_ollama_ip.as_deref())?;
        }
        *self.current.write() = target.clone();
        info!(
            base = %target.ollama_api_base,
            custom = ?target.custom_ollama_ip,
            "ollama target updated"
        );
        Ok(target)
    }
}

fn load_persisted(path: &Path) -> Result<Option<String>, GatewayError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no persisted ollama target");
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };
    match serde_json::from_str::<PersistedTarget>(&raw) {
        Ok(persisted) => Ok(persisted.custom_ollama_ip),
        Err(err) => {
            warn!(path = %path.display(), %err, "ignoring unreadable ollama target file");
            Ok(None)
        }
    }
}

fn persist(path: &Path, custom_ollama_ip: Option<&str>) -> Result<(), GatewayError> {
    let payload = PersistedTarget {
        custom_ollama_ip: custom_ollama_ip.map(str::to_string),
    };
    let json = serde_json::to_vec_pretty(&payload)
        .map_err(|e| GatewayError::Store(e.to_string()))?;

    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            fs::create_dir_all(parent)?;
            parent
        }
        None => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(&json)?;
    tmp.persist(path)
        .map_err(|e| GatewayError::Store(format!("{}: {}", path.display(), e.error)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT: &str = "http://localhost:11434";

    fn config_with(path: Option<PathBuf>, custom: Option<&str>) -> AppConfig {
        AppConfig {
            custom_ollama_ip: custom.map(str::to_string),
            config_path: path,
            ..AppConfig::default()
        }
    }

    #[test]
    fn host_with_scheme_is_used_verbatim() {
        for host in [
            "http://10.0.0.5:11434",
            "https://ollama.internal",
            "http://gpu-box:9000/",
        ] {
            assert_eq!(resolve_base_url(Some(host), DEFAULT), host);
        }
    }

    #[test]
    fn bare_host_gets_scheme_and_default_port() {
        assert_eq!(
            resolve_base_url(Some("192.168.1.105"), DEFAULT),
            "http://192.168.1.105:11434"
        );
        assert_eq!(
            resolve_base_url(Some("gpu-box"), DEFAULT),
            "http://gpu-box:11434"
        );
    }

    #[test]
    fn no_host_falls_back_to_default() {
        assert_eq!(resolve_base_url(None, DEFAULT), DEFAULT);
    }

    #[test]
    fn blank_host_clears_override() {
        let target = OllamaTarget::resolve(Some("   ".into()), DEFAULT);
        assert_eq!(target.custom_ollama_ip, None);
        assert_eq!(target.ollama_api_base, DEFAULT);
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let target = OllamaTarget::resolve(Some("http://host:1/".into()), DEFAULT);
        assert_eq!(target.endpoint("/api/tags"), "http://host:1/api/tags");
    }

    #[test]
    fn set_then_clear_in_memory() {
        let store = TargetStore::initialize(&config_with(None, None)).unwrap();
        let updated = store.set_custom_host(Some("10.1.1.1".into())).unwrap();
        assert_eq!(updated.ollama_api_base, "http://10.1.1.1:11434");
        assert_eq!(*store.current(), *updated);

        let cleared = store.set_custom_host(Some(String::new())).unwrap();
        assert_eq!(cleared.custom_ollama_ip, None);
        assert_eq!(store.current().ollama_api_base, DEFAULT);
    }

    #[test]
    fn whitespace_inside_host_is_rejected() {
        let store = TargetStore::initialize(&config_with(None, Some("10.0.0.2"))).unwrap();
        let err = store.set_custom_host(Some("10.0.0.1 evil".into())).unwrap_err();
        assert!(matches!(err, GatewayError::BadRequest(_)));
        assert_eq!(store.current().ollama_api_base, "http://10.0.0.2:11434");
    }

    #[test]
    fn persisted_host_survives_restart_and_wins_over_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ollama.json");

        let store = TargetStore::initialize(&config_with(Some(path.clone()), None)).unwrap();
        store.set_custom_host(Some("gpu-box".into())).unwrap();

        let restarted =
            TargetStore::initialize(&config_with(Some(path.clone()), Some("other-box"))).unwrap();
        assert_eq!(
            restarted.current().custom_ollama_ip.as_deref(),
            Some("gpu-box")
        );

        restarted.set_custom_host(None).unwrap();
        let again = TargetStore::initialize(&config_with(Some(path), None)).unwrap();
        assert_eq!(again.current().ollama_api_base, DEFAULT);
    }

    #[test]
    fn corrupt_store_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ollama.json");
        fs::write(&path, "{not json").unwrap();

        let store = TargetStore::initialize(&config_with(Some(path), Some("10.0.0.9"))).unwrap();
        assert_eq!(store.current().ollama_api_base, "http://10.0.0.9:11434");
    }

    #[test]
    fn host_with_port_but_no_scheme_is_rejected() {
        let store = TargetStore::initialize(&config_with(None, None)).unwrap();
        let err = store
            .set_custom_host(Some("127.0.0.1:9000".into()))
            .unwrap_err();
        assert!(matches!(err, GatewayError::BadRequest(_)));
        assert!(err.to_string().contains("http://host:port"));
        assert_eq!(store.current().ollama_api_base, DEFAULT);

        let with_scheme = store
            .set_custom_host(Some("http://127.0.0.1:9000".into()))
            .unwrap();
        assert_eq!(with_scheme.ollama_api_base, "http://127.0.0.1:9000");
    }

    #[test]
    fn unusable_startup_host_falls_back_to_default() {
        let store = TargetStore::initialize(&config_with(None, Some("10.0.0.1:9000"))).unwrap();
        assert_eq!(store.current().custom_ollama_ip, None);
        assert_eq!(store.current().ollama_api_base, DEFAULT);
    }

    #[test]
    fn concurrent_updates_keep_file_and_snapshot_in_sync() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ollama.json");
        let store = TargetStore::initialize(&config_with(Some(path.clone()), None)).unwrap();

        for _ in 0..300 {
            std::thread::scope(|scope| {
                let a = scope.spawn(|| store.set_custom_host(Some("host-a".into())));
                let b = scope.spawn(|| store.set_custom_host(Some("host-b".into())));
                a.join().unwrap().unwrap();
                b.join().unwrap().unwrap();
            });
            assert_eq!(
                load_persisted(&path).unwrap(),
                store.current().custom_ollama_ip
            );
        }

        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1, "temp files left behind");
    }
}
