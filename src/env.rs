use std::collections::BTreeMap;
use std::path::Path;
use crate::config::Config;

/// Where the toolchain may fetch modules from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proxy {
    /// Only the on-disk download cache, no network access.
    LocalCache,
    /// Whatever `GOPROXY` the caller already has configured.
    Upstream,
}

/// Builds the environment for a toolchain subprocess.
///
/// Starts from the captured host environment and overrides `GO111MODULE`,
/// `GOPROXY` (for [`Proxy::LocalCache`]) and `GOFLAGS`.
pub fn build_env(config: &Config, proxy: Proxy) -> BTreeMap<String, String> {
    let mut env: BTreeMap<String, String> = config.env.vars.iter().cloned().collect();
    env.insert("GO111MODULE".to_string(), "on".to_string());

    if proxy == Proxy::LocalCache {
        env.insert("GOPROXY".to_string(), file_url(&config.download_cache));
    }

    let mut goflags = config.env.get("GOFLAGS").unwrap_or_default().to_string();
    if config.main_mod {
        if let Some(mode) = config.mod_mode {
            goflags.push_str(" -mod=");
            goflags.push_str(mode.as_str());
        }
    }
    env.insert("GOFLAGS".to_string(), goflags.trim().to_string());
    env
}

/// `file://` URL for a local directory.
pub fn file_url(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    if path.starts_with('/') {
        format!("file://{}", path)
    } else {
        format!("file:///{}", path)
    }
}
