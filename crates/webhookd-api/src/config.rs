//! Configuration for the webhookd service.

use std::{
    net::SocketAddr,
    path::Path,
    str::FromStr,
    time::Duration,
};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use webhookd_auth::{AuthConfig, TokenExtractor};

use crate::state::RouteProtection;

/// Files tried in order when no path is given; the first one found wins.
const CONFIG_FILES: [&str; 3] = ["webhookd.toml", "webhookd.json", ".webhookdrc.json"];
const ENV_PREFIX: &str = "WEBHOOKD_";

/// Complete service configuration with defaults, file, and environment
/// overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables prefixed `WEBHOOKD_` (highest priority)
/// 2. Configuration file (the path given on the command line, else the first
///    of `webhookd.toml`, `webhookd.json`, `.webhookdrc.json`; `.json` files
///    are read as JSON)
/// 3. Built-in defaults (lowest priority)
///
/// A combined `host:port` bind address may also be given as `server.addr`
/// in a file or as `WEBHOOKD_ADDR` / `WEBHOOKD_SERVER_ADDR` (the latter wins).
/// When present it replaces `host` and `port`.
///
/// Authentication stays off until all three OAuth settings are present.
///
/// # Example
///
/// ```no_run
/// use webhookd_api::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
/// println!("Server will bind to {}:{}", config.host, config.port);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    // Server
    /// Server bind address.
    ///
    /// Environment variable: `WEBHOOKD_HOST`
    #[serde(default = "default_host")]
    pub host: String,
    /// Server bind port.
    ///
    /// Environment variable: `WEBHOOKD_PORT`
    #[serde(default = "default_port")]
    pub port: u16,
    /// HTTP request timeout in seconds.
    ///
    /// Environment variable: `WEBHOOKD_REQUEST_TIMEOUT_SECS`
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Combined bind address, folded into `host` and `port` on load.
    ///
    /// Environment variables: `WEBHOOKD_ADDR`, `WEBHOOKD_SERVER_ADDR`
    #[serde(default, skip_serializing)]
    pub server: Option<ServerSection>,

    // Auth
    /// Authenticate pre-flight `OPTIONS` requests too.
    ///
    /// Environment variable: `WEBHOOKD_ENABLE_AUTH_ON_OPTIONS`
    #[serde(default)]
    pub enable_auth_on_options: bool,
    /// Token sources in order: `headers`, `params`.
    ///
    /// Environment variable: `WEBHOOKD_TOKEN_EXTRACTORS` (comma-separated)
    #[serde(default = "default_token_extractors", deserialize_with = "deserialize_extractors")]
    pub token_extractors: Vec<TokenExtractor>,
    /// JWKS document URL.
    ///
    /// Environment variable: `WEBHOOKD_OAUTH_JSON_WEB_KEY_SETS_URL`
    #[serde(default)]
    pub oauth_json_web_key_sets_url: String,
    /// Required token issuer.
    ///
    /// Environment variable: `WEBHOOKD_OAUTH_ISSUER`
    #[serde(default)]
    pub oauth_issuer: String,
    /// Required token audience.
    ///
    /// Environment variable: `WEBHOOKD_OAUTH_AUDIENCE`
    #[serde(default)]
    pub oauth_audience: String,
    /// Maximum age of cached signing keys in seconds.
    ///
    /// Environment variable: `WEBHOOKD_JWKS_CACHE_TTL_SECS`
    #[serde(default = "default_jwks_cache_ttl")]
    pub jwks_cache_ttl_secs: u64,
    /// JWKS request timeout in seconds.
    ///
    /// Environment variable: `WEBHOOKD_JWKS_FETCH_TIMEOUT_SECS`
    #[serde(default = "default_jwks_fetch_timeout")]
    pub jwks_fetch_timeout_secs: u64,
    /// Require a token for hook management and route listing.
    ///
    /// Environment variable: `WEBHOOKD_PROTECT_MANAGEMENT`
    #[serde(default)]
    pub protect_management: bool,
    /// Require a token for hook invocation.
    ///
    /// Environment variable: `WEBHOOKD_PROTECT_INVOCATION`
    #[serde(default)]
    pub protect_invocation: bool,

    // Logging
    /// Log filter used when `RUST_LOG` is unset.
    ///
    /// Environment variable: `WEBHOOKD_RUST_LOG`
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

/// The `[server]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSection {
    /// Bind address as `host:port`; an empty host means all interfaces.
    #[serde(default)]
    pub addr: Option<String>,
}

impl Config {
    /// Loads configuration from defaults, the first config file found in the
    /// working directory, and environment variable overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Loads configuration like [`Config::load`], reading `path` instead of
    /// searching for a config file. An explicitly given file must exist.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let figment = match path {
            Some(path) => {
                anyhow::ensure!(path.exists(), "config file {} does not exist", path.display());
                merge_file(figment, path)
            },
            None => match CONFIG_FILES.iter().map(Path::new).find(|path| path.exists()) {
                Some(path) => merge_file(figment, path),
                None => figment,
            },
        };

        let mut config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).ignore(&["addr", "server_addr"]))
            .merge(Env::prefixed(ENV_PREFIX).only(&["addr"]).map(|_| "server.addr".into()))
            .merge(Env::prefixed(ENV_PREFIX).only(&["server_addr"]).map(|_| "server.addr".into()))
            .extract()
            .context("Failed to load configuration")?;
        config.apply_server_addr()?;
        config.validate()?;
        Ok(config)
    }

    /// Replaces `host` and `port` with `server.addr` when one was given.
    fn apply_server_addr(&mut self) -> Result<()> {
        let Some(addr) = self.server.take().and_then(|server| server.addr) else {
            return Ok(());
        };

        let (host, port) = addr
            .rsplit_once(':')
            .with_context(|| format!("server address {addr:?} must be host:port"))?;
        self.port =
            port.parse().with_context(|| format!("invalid port in server address {addr:?}"))?;
        self.host = if host.is_empty() { default_host() } else { host.to_string() };
        Ok(())
    }

    /// Authentication settings for the auth gate.
    pub fn to_auth_config(&self) -> AuthConfig {
        AuthConfig {
            enable_auth_on_options: self.enable_auth_on_options,
            token_extractors: self.token_extractors.clone(),
            jwks_url: self.oauth_json_web_key_sets_url.clone(),
            issuer: self.oauth_issuer.clone(),
            audience: self.oauth_audience.clone(),
            cache_ttl: Duration::from_secs(self.jwks_cache_ttl_secs),
            fetch_timeout: Duration::from_secs(self.jwks_fetch_timeout_secs),
        }
    }

    /// Route groups requiring authentication.
    pub fn route_protection(&self) -> RouteProtection {
        RouteProtection { management: self.protect_management, invocation: self.protect_invocation }
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parse server socket address from host and port configuration.
    pub fn parse_server_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.host, self.port);
        SocketAddr::from_str(&addr_str).context("Invalid server address")
    }

    /// Applies command-line overrides, which win over every other source.
    #[must_use]
    pub fn with_overrides(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        let auth = self.to_auth_config();
        auth.validate().context("Invalid OAuth configuration")?;

        if (self.protect_management || self.protect_invocation) && !auth.is_complete() {
            anyhow::bail!(
                "protect_management and protect_invocation require oauth_json_web_key_sets_url, \
                 oauth_issuer and oauth_audience"
            );
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            enable_auth_on_options: false,
            token_extractors: default_token_extractors(),
            oauth_json_web_key_sets_url: String::new(),
            oauth_issuer: String::new(),
            oauth_audience: String::new(),
            jwks_cache_ttl_secs: default_jwks_cache_ttl(),
            jwks_fetch_timeout_secs: default_jwks_fetch_timeout(),
            protect_management: false,
            protect_invocation: false,
            server: None,
            rust_log: default_log_level(),
        }
    }
}

fn merge_file(figment: Figment, path: &Path) -> Figment {
    if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
        figment.merge(Json::file(path))
    } else {
        figment.merge(Toml::file(path))
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    1337
}

fn default_request_timeout() -> u64 {
    30
}

fn default_token_extractors() -> Vec<TokenExtractor> {
    TokenExtractor::DEFAULT.to_vec()
}

fn default_jwks_cache_ttl() -> u64 {
    300
}

fn default_jwks_fetch_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Extractors arrive as a list from files and as `headers,params` from the
/// environment.
#[derive(Deserialize)]
#[serde(untagged)]
enum ExtractorNames {
    Csv(String),
    List(Vec<String>),
}

fn deserialize_extractors<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<TokenExtractor>, D::Error> {
    let names = match ExtractorNames::deserialize(deserializer)? {
        ExtractorNames::Csv(csv) => csv.split(',').map(str::to_string).collect(),
        ExtractorNames::List(list) => list,
    };

    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(|name| {
            TokenExtractor::from_name(name).ok_or_else(|| {
                D::Error::custom(format!(
                    "unsupported token extractor {name:?} (allowed: headers, params)"
                ))
            })
        })
        .collect()
}
