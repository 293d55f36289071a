use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failure read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failure parse file {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Profiles {
    pub active: String,
}

// application.yml only names the active profile
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EnvConfig {
    pub profiles: Profiles,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Bootstrap {
    pub server: Server,
    pub analyzer: AnalyzerConfig,
    pub fleet: FleetConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Server {
    pub addr: String,
}

impl Default for Server {
    fn default() -> Self {
        Server {
            addr: "127.0.0.1:3000".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key_env: "API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct FleetConfig {
    /// Number of servers generated at startup.
    pub size: usize,
}

impl Default for FleetConfig {
    fn default() -> Self {
        FleetConfig { size: 15 }
    }
}

// 加载指定配置文件
fn load_config<T>(path: &Path) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = serde_yaml::from_str::<T>(&text).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    info!("loaded config {}", path.display());
    Ok(config)
}

fn load_env_config(dir: &Path) -> Result<EnvConfig, ConfigError> {
    load_config::<EnvConfig>(&dir.join("application.yml"))
}

// 根据环境加载application-{}.yml文件
fn load_bootstrap_config_from_env(dir: &Path, active: &str) -> Result<Bootstrap, ConfigError> {
    load_config::<Bootstrap>(&dir.join(format!("application-{}.yml", active)))
}

/// Load `application.yml` from `dir`, then the `application-{profile}.yml`
/// it names.
pub fn load_bootstrap_config_from(dir: &Path) -> Result<Bootstrap, ConfigError> {
    let env_config = load_env_config(dir)?;
    load_bootstrap_config_from_env(dir, &env_config.profiles.active)
}

pub fn load_bootstrap_config() -> Result<Bootstrap, ConfigError> {
    load_bootstrap_config_from(Path::new("."))
}
