use std::path::{Path, PathBuf};
use std::str::FromStr;
use anyhow::{anyhow, bail, Context, Result};
use directories::BaseDirs;

/// Name of the module manifest that marks a module root.
pub const MANIFEST_FILE: &str = "go.mod";
/// Artifact cache directory inside the main module in `-m` mode.
pub const MAIN_MODULE_CACHE_DIR: &str = ".gobincache";

/// What to do with a main package once it is built into the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    #[default]
    Install,
    Print,
    Version,
    DownloadOnly,
    Run,
}

/// Accepted values for `-mod`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModMode {
    Readonly,
    Vendor,
}

impl ModMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModMode::Readonly => "readonly",
            ModMode::Vendor => "vendor",
        }
    }
}

impl FromStr for ModMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "readonly" => Ok(ModMode::Readonly),
            "vendor" => Ok(ModMode::Vendor),
            _ => bail!("-mod has invalid value {:?}", s),
        }
    }
}

/// Raw flag values as handed over by the command line layer.
#[derive(Debug, Clone, Default)]
pub struct Flags {
    pub main_mod: bool,
    pub mod_mode: Option<String>,
    pub run: bool,
    pub print: bool,
    pub version: bool,
    pub download: bool,
    pub upgrade: bool,
    pub no_net: bool,
    pub debug: bool,
}

impl Flags {
    /// Checks the mutually exclusive flag groups and derives the execution mode.
    pub fn execution_mode(&self) -> Result<ExecutionMode> {
        let selected = [self.run, self.print, self.version, self.download]
            .iter()
            .filter(|set| **set)
            .count();
        if selected > 1 {
            bail!("the -run, -p, -v and -d flags are mutually exclusive");
        }
        let mode = if self.run {
            ExecutionMode::Run
        } else if self.print {
            ExecutionMode::Print
        } else if self.version {
            ExecutionMode::Version
        } else if self.download {
            ExecutionMode::DownloadOnly
        } else {
            ExecutionMode::Install
        };
        Ok(mode)
    }
}

/// Snapshot of the process environment, taken once at startup.
#[derive(Debug, Clone, Default)]
pub struct HostEnv {
    pub vars: Vec<(String, String)>,
}

impl HostEnv {
    pub fn capture() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        HostEnv { vars }
    }

    /// Returns the value of `key` if it is set and non-empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }
}

/// User directories the configuration falls back on.
#[derive(Debug, Clone, Default)]
pub struct UserDirs {
    pub home: Option<PathBuf>,
    pub cache: Option<PathBuf>,
}

impl UserDirs {
    pub fn discover() -> Self {
        match BaseDirs::new() {
            Some(dirs) => UserDirs {
                home: Some(dirs.home_dir().to_path_buf()),
                cache: Some(dirs.cache_dir().to_path_buf()),
            },
            None => UserDirs::default(),
        }
    }
}

/// Immutable configuration for one invocation. Built once, then passed by
/// reference to every component.
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: ExecutionMode,
    pub main_mod: bool,
    pub mod_mode: Option<ModMode>,
    pub upgrade: bool,
    pub no_net: bool,
    pub debug: bool,
    /// Root of the main module; set in `-m` mode only.
    pub main_module: Option<PathBuf>,
    pub gopath: PathBuf,
    /// `$GOPATH/pkg/mod/cache/download`, served as a `file://` proxy.
    pub download_cache: PathBuf,
    /// Root of the built-binary cache.
    pub artifact_cache: PathBuf,
    /// Where install mode copies binaries to.
    pub install_dir: PathBuf,
    pub env: HostEnv,
}

impl Config {
    pub fn discover(flags: &Flags) -> Result<Config> {
        let cwd = std::env::current_dir().context("failed to get working directory")?;
        Config::from_parts(flags, HostEnv::capture(), &cwd, &UserDirs::discover())
    }

    pub fn from_parts(flags: &Flags, env: HostEnv, cwd: &Path, dirs: &UserDirs) -> Result<Config> {
        let mode = flags.execution_mode()?;

        let mut main_mod = flags.main_mod;
        let mod_mode = match flags.mod_mode.as_deref() {
            Some(value) if !value.is_empty() => {
                main_mod = true;
                Some(value.parse::<ModMode>()?)
            }
            _ => None,
        };

        if flags.upgrade && flags.no_net {
            bail!("the -u and -nonet flags are mutually exclusive");
        }

        let gopath = match env.get("GOPATH").and_then(|p| std::env::split_paths(p).next()) {
            Some(first) => first,
            None => dirs
                .home
                .as_ref()
                .ok_or_else(|| anyhow!("failed to determine user home directory"))?
                .join("go"),
        };
        let download_cache = gopath.join("pkg").join("mod").join("cache").join("download");

        let (main_module, artifact_cache) = if main_mod {
            let root = find_main_module(cwd)?;
            let cache = root.join(MAIN_MODULE_CACHE_DIR);
            (Some(root), cache)
        } else {
            let cache = dirs
                .cache
                .as_ref()
                .ok_or_else(|| anyhow!("failed to determine user cache dir"))?
                .join("gobin");
            (None, cache)
        };

        let install_dir = match env.get("GOBIN") {
            Some(dir) => PathBuf::from(dir),
            None => gopath.join("bin"),
        };

        Ok(Config {
            mode,
            main_mod,
            mod_mode,
            upgrade: flags.upgrade,
            no_net: flags.no_net,
            debug: flags.debug,
            main_module,
            gopath,
            download_cache,
            artifact_cache,
            install_dir,
            env,
        })
    }
}

/// Walks upward from `start` to the first directory containing a `go.mod`.
pub fn find_main_module(start: &Path) -> Result<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(MANIFEST_FILE).is_file())
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow!("could not find main module"))
}
