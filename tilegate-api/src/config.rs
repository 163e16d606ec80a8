//! Gateway and API Configuration
//!
//! Configuration is read once at startup from environment variables, with an
//! optional `.env`-style file supplying values the process environment does
//! not set. The resulting structs are passed by value into the gateway and
//! router; nothing reads the environment after startup.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tilegate_core::{ConfigError, KeyDigest};
use tilegate_render::{OutputCapture, ParserKind};

// ============================================================================
// ENVIRONMENT SOURCE
// ============================================================================

/// Where configuration values come from.
///
/// Lookups consult the process environment first and fall back to values
/// loaded from an env file, so an exported variable always wins.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    use_process_env: bool,
    file_values: HashMap<String, String>,
}

impl EnvSource {
    /// The process environment, with no file overlay.
    pub fn process() -> Self {
        Self {
            use_process_env: true,
            file_values: HashMap::new(),
        }
    }

    /// A fixed set of values that ignores the process environment.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            use_process_env: false,
            file_values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Add the variables defined in the env file at `path`.
    ///
    /// The file uses dotenv syntax. When a key repeats, the first definition
    /// wins, matching how dotenv loaders treat already-set variables.
    pub fn with_env_file(mut self, path: &Path) -> Result<Self, dotenvy::Error> {
        for item in dotenvy::from_path_iter(path)? {
            let (key, value) = item?;
            self.file_values.entry(key).or_insert(value);
        }
        Ok(self)
    }

    /// Look up `key`; empty values count as unset.
    pub fn get(&self, key: &str) -> Option<String> {
        let from_process = if self.use_process_env {
            std::env::var(key).ok()
        } else {
            None
        };
        from_process
            .or_else(|| self.file_values.get(key).cloned())
            .filter(|v| !v.trim().is_empty())
    }

    /// Parse `key` with `FromStr`, reporting a bad value as a config error.
    fn parse<T: FromStr>(&self, key: &str, expected: &str) -> Result<Option<T>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue {
                    field: key.to_string(),
                    value: raw,
                    reason: format!("expected {}", expected),
                }),
        }
    }
}

// ============================================================================
// GATEWAY CONFIGURATION
// ============================================================================

pub const DEFAULT_CACHE_DIR: &str = "cache";
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 30;

/// Settings for rendering and caching tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Renderer executable.
    pub renderer_path: PathBuf,

    /// Root directory of the tile cache.
    pub cache_dir: PathBuf,

    /// Bounded wait on the renderer; `None` waits forever.
    pub render_timeout: Option<Duration>,

    /// Which renderer output channels are parsed.
    pub output_capture: OutputCapture,

    /// Which response parser interprets renderer output.
    pub parser: ParserKind,

    /// Digest used to derive cache keys.
    pub key_digest: KeyDigest,
}

impl GatewayConfig {
    /// Defaults for everything except the renderer path.
    pub fn new(renderer_path: impl Into<PathBuf>) -> Self {
        Self {
            renderer_path: renderer_path.into(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            render_timeout: Some(Duration::from_secs(DEFAULT_RENDER_TIMEOUT_SECS)),
            output_capture: OutputCapture::default(),
            parser: ParserKind::default(),
            key_digest: KeyDigest::default(),
        }
    }

    /// Create GatewayConfig from `env`.
    ///
    /// Environment variables:
    /// - `TILEGATE_RENDERER_PATH`: renderer executable (required)
    /// - `TILEGATE_CACHE_DIR`: cache root (default: cache)
    /// - `TILEGATE_RENDER_TIMEOUT_SECS`: renderer timeout, 0 disables (default: 30)
    /// - `TILEGATE_RENDER_OUTPUT`: combined or stdout (default: combined)
    /// - `TILEGATE_PARSER`: literal or structured (default: literal)
    /// - `TILEGATE_KEY_DIGEST`: md5 or sha256 (default: md5)
    pub fn from_source(env: &EnvSource) -> Result<Self, ConfigError> {
        let renderer_path =
            env.get("TILEGATE_RENDERER_PATH")
                .ok_or_else(|| ConfigError::MissingRequired {
                    field: "TILEGATE_RENDERER_PATH".to_string(),
                })?;

        let mut config = Self::new(renderer_path);

        if let Some(dir) = env.get("TILEGATE_CACHE_DIR") {
            config.cache_dir = PathBuf::from(dir);
        }

        if let Some(secs) =
            env.parse::<u64>("TILEGATE_RENDER_TIMEOUT_SECS", "a whole number of seconds")?
        {
            config.render_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        config.output_capture = env
            .get("TILEGATE_RENDER_OUTPUT")
            .map(|v| v.parse::<OutputCapture>())
            .transpose()?
            .unwrap_or_default();

        config.parser = env
            .get("TILEGATE_PARSER")
            .map(|v| v.parse::<ParserKind>())
            .transpose()?
            .unwrap_or_default();

        config.key_digest = env
            .get("TILEGATE_KEY_DIGEST")
            .map(|v| v.parse::<KeyDigest>())
            .transpose()?
            .unwrap_or_default();

        Ok(config)
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_CORS_MAX_AGE_SECS: u64 = 86400;

/// HTTP listener, routing and CORS settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Listen host.
    pub bind: String,

    /// Listen port.
    pub port: u16,

    /// Path the tile endpoint is mounted at. Always starts with `/` and has
    /// no trailing slash unless it is exactly `/`.
    pub base_path: String,

    /// Allowed CORS origins; a single `*` allows any origin.
    pub cors_origins: Vec<String>,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
            base_path: "/".to_string(),
            cors_origins: vec![default_origin(DEFAULT_PORT)],
            cors_max_age_secs: DEFAULT_CORS_MAX_AGE_SECS,
        }
    }
}

fn default_origin(port: u16) -> String {
    format!("http://localhost:{}", port)
}

/// Normalize a configured base path, or `None` if it is not absolute.
pub fn normalize_base_path(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if !raw.starts_with('/') {
        return None;
    }
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() {
        Some("/".to_string())
    } else {
        Some(trimmed.to_string())
    }
}

impl ApiConfig {
    /// Create ApiConfig from `env`. Invalid values are logged and replaced
    /// by their defaults.
    ///
    /// Environment variables:
    /// - `TILEGATE_BIND`: listen host (default: 0.0.0.0)
    /// - `TILEGATE_PORT`: listen port (default: 8000)
    /// - `TILEGATE_BASE_PATH`: tile endpoint path (default: /)
    /// - `TILEGATE_CORS_ORIGINS`: comma-separated origins (default: http://localhost:<port>)
    /// - `TILEGATE_CORS_MAX_AGE_SECS`: preflight cache duration (default: 86400)
    pub fn from_source(env: &EnvSource) -> Self {
        let bind = env
            .get("TILEGATE_BIND")
            .map(|b| b.trim().to_string())
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        let port = match env.get("TILEGATE_PORT") {
            Some(raw) => raw.trim().parse::<u16>().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, default = DEFAULT_PORT, "Invalid TILEGATE_PORT, using default");
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        let base_path = match env.get("TILEGATE_BASE_PATH") {
            Some(raw) => normalize_base_path(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "TILEGATE_BASE_PATH must start with '/', using '/'");
                "/".to_string()
            }),
            None => "/".to_string(),
        };

        let cors_origins: Vec<String> = env
            .get("TILEGATE_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let cors_origins = if cors_origins.is_empty() {
            vec![default_origin(port)]
        } else {
            cors_origins
        };

        let cors_max_age_secs = match env.get("TILEGATE_CORS_MAX_AGE_SECS") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "Invalid TILEGATE_CORS_MAX_AGE_SECS, using default");
                DEFAULT_CORS_MAX_AGE_SECS
            }),
            None => DEFAULT_CORS_MAX_AGE_SECS,
        };

        Self {
            bind,
            port,
            base_path,
            cors_origins,
            cors_max_age_secs,
        }
    }

    /// Socket address to listen on.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.bind, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                field: "TILEGATE_BIND".to_string(),
                value: addr,
                reason: e.to_string(),
            })
    }

    /// Whether any origin is allowed.
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }

    /// Paths the tile endpoint answers on: the base path and, unless the base
    /// path is the root, the same path with a trailing slash.
    pub fn tile_paths(&self) -> Vec<String> {
        if self.base_path == "/" {
            vec!["/".to_string()]
        } else {
            vec![self.base_path.clone(), format!("{}/", self.base_path)]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_api_config() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.base_path, "/");
        assert_eq!(config.cors_origins, vec!["http://localhost:8000".to_string()]);
        assert_eq!(config.cors_max_age_secs, 86400);
        assert_eq!(config.tile_paths(), vec!["/".to_string()]);
    }

    #[test]
    fn test_api_config_from_source() {
        let env = EnvSource::from_pairs([
            ("TILEGATE_PORT", "9090"),
            ("TILEGATE_BIND", "127.0.0.1"),
            ("TILEGATE_BASE_PATH", "/wms/"),
            ("TILEGATE_CORS_ORIGINS", "https://maps.example.org, https://b.example.org"),
        ]);
        let config = ApiConfig::from_source(&env);

        assert_eq!(config.port, 9090);
        assert_eq!(config.base_path, "/wms");
        assert_eq!(
            config.tile_paths(),
            vec!["/wms".to_string(), "/wms/".to_string()]
        );
        assert_eq!(config.cors_origins.len(), 2);
        assert_eq!(
            config.bind_addr(),
            Ok("127.0.0.1:9090".parse().expect("valid socket address"))
        );
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let env = EnvSource::from_pairs([
            ("TILEGATE_PORT", "eighty"),
            ("TILEGATE_BASE_PATH", "tiles"),
            ("TILEGATE_CORS_MAX_AGE_SECS", "-1"),
        ]);
        let config = ApiConfig::from_source(&env);

        assert_eq!(config.port, 8000);
        assert_eq!(config.base_path, "/");
        assert_eq!(config.cors_max_age_secs, 86400);
    }

    #[test]
    fn test_default_origin_follows_port() {
        let env = EnvSource::from_pairs([("TILEGATE_PORT", "8081")]);
        let config = ApiConfig::from_source(&env);
        assert_eq!(config.cors_origins, vec!["http://localhost:8081".to_string()]);
        assert!(!config.allows_any_origin());
    }

    #[test]
    fn test_normalize_base_path() {
        assert_eq!(normalize_base_path("/"), Some("/".to_string()));
        assert_eq!(normalize_base_path("///"), Some("/".to_string()));
        assert_eq!(normalize_base_path("/a/b/"), Some("/a/b".to_string()));
        assert_eq!(normalize_base_path("a"), None);
    }

    #[test]
    fn test_gateway_config_requires_renderer() {
        let env = EnvSource::from_pairs(Vec::<(String, String)>::new());
        assert_eq!(
            GatewayConfig::from_source(&env),
            Err(ConfigError::MissingRequired {
                field: "TILEGATE_RENDERER_PATH".to_string()
            })
        );
    }

    #[test]
    fn test_gateway_config_defaults() -> Result<(), ConfigError> {
        let env = EnvSource::from_pairs([("TILEGATE_RENDERER_PATH", "/usr/bin/mapserv")]);
        let config = GatewayConfig::from_source(&env)?;

        assert_eq!(config.renderer_path, PathBuf::from("/usr/bin/mapserv"));
        assert_eq!(config.cache_dir, PathBuf::from("cache"));
        assert_eq!(config.render_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.output_capture, OutputCapture::Combined);
        assert_eq!(config.parser, ParserKind::Literal);
        assert_eq!(config.key_digest, KeyDigest::Md5);
        Ok(())
    }

    #[test]
    fn test_gateway_config_overrides() -> Result<(), ConfigError> {
        let env = EnvSource::from_pairs([
            ("TILEGATE_RENDERER_PATH", "/opt/mapserv"),
            ("TILEGATE_CACHE_DIR", "/var/cache/tiles"),
            ("TILEGATE_RENDER_TIMEOUT_SECS", "0"),
            ("TILEGATE_RENDER_OUTPUT", "stdout"),
            ("TILEGATE_PARSER", "structured"),
            ("TILEGATE_KEY_DIGEST", "sha256"),
        ]);
        let config = GatewayConfig::from_source(&env)?;

        assert_eq!(config.cache_dir, PathBuf::from("/var/cache/tiles"));
        assert_eq!(config.render_timeout, None);
        assert_eq!(config.output_capture, OutputCapture::Stdout);
        assert_eq!(config.parser, ParserKind::Structured);
        assert_eq!(config.key_digest, KeyDigest::Sha256);
        Ok(())
    }

    #[test]
    fn test_gateway_config_rejects_bad_values() {
        let env = EnvSource::from_pairs([
            ("TILEGATE_RENDERER_PATH", "/opt/mapserv"),
            ("TILEGATE_RENDER_TIMEOUT_SECS", "soon"),
        ]);
        assert!(matches!(
            GatewayConfig::from_source(&env),
            Err(ConfigError::InvalidValue { .. })
        ));

        let env = EnvSource::from_pairs([
            ("TILEGATE_RENDERER_PATH", "/opt/mapserv"),
            ("TILEGATE_PARSER", "mime"),
        ]);
        assert!(GatewayConfig::from_source(&env).is_err());
    }

    #[test]
    fn test_env_file_overlay() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("tilegate.env");
        std::fs::write(&path, "TILEGATE_PORT=8123\nTILEGATE_PORT=9000\n")?;

        let env = EnvSource::from_pairs([("TILEGATE_BIND", "127.0.0.1")]).with_env_file(&path)?;
        assert_eq!(env.get("TILEGATE_PORT"), Some("8123".to_string()));
        assert_eq!(env.get("TILEGATE_BIND"), Some("127.0.0.1".to_string()));

        assert!(EnvSource::process()
            .with_env_file(&dir.path().join("missing.env"))
            .is_err());
        Ok(())
    }

    #[test]
    fn test_env_file_dotenv_syntax() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("tilegate.env");
        std::fs::write(
            &path,
            "# renderer\n\
             TILEGATE_RENDERER_PATH=/usr/bin/mapserv\n\
             TILEGATE_PORT=8080 # listen port\n\
             export TILEGATE_BASE_PATH=\"/wms\"\n\
             TILEGATE_CORS_ORIGINS='https://maps.example.org'\n",
        )?;

        let env = EnvSource::from_pairs(Vec::<(String, String)>::new()).with_env_file(&path)?;
        let api = ApiConfig::from_source(&env);
        assert_eq!(api.port, 8080);
        assert_eq!(api.base_path, "/wms");
        assert_eq!(api.cors_origins, vec!["https://maps.example.org".to_string()]);

        let gateway = GatewayConfig::from_source(&env)?;
        assert_eq!(gateway.renderer_path, PathBuf::from("/usr/bin/mapserv"));
        Ok(())
    }
}
