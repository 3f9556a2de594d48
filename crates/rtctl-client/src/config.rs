//! Connection settings for reaching the daemon's XML-RPC endpoint.
//!
//! # Design
//! - Settings deserialize with serde defaults or load from `RTCTL_*` variables;
//!   the variable lookup is injectable so parsing stays testable without
//!   touching the process environment.
//! - An explicit `uri` wins over the host/port/path parts.

use std::fmt;
use std::time::Duration;

use reqwest::Client;
use rtctl_core::MAX_XMLRPC_SIZE;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::ConfigError;
use crate::transport::HttpTransport;

/// Default URL scheme.
pub const DEFAULT_SCHEME: &str = "https";
/// Default XML-RPC mount point behind the web server.
pub const DEFAULT_RPC_PATH: &str = "/rutorrent";
/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ENV_URI: &str = "RTCTL_URI";
const ENV_SCHEME: &str = "RTCTL_SCHEME";
const ENV_HOST: &str = "RTCTL_HOST";
const ENV_PORT: &str = "RTCTL_PORT";
const ENV_USERNAME: &str = "RTCTL_USERNAME";
const ENV_PASSWORD: &str = "RTCTL_PASSWORD";
const ENV_RPC_PATH: &str = "RTCTL_RPC_PATH";
const ENV_TIMEOUT_SECS: &str = "RTCTL_TIMEOUT_SECS";
const ENV_MAX_REQUEST_BYTES: &str = "RTCTL_MAX_REQUEST_BYTES";

/// How to reach the daemon.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Complete endpoint URL; overrides every part below when set.
    pub uri: Option<String>,
    /// `http` or `https`.
    pub scheme: String,
    /// Host name or address.
    pub host: Option<String>,
    /// Port; the scheme default applies when unset.
    pub port: Option<u16>,
    /// Basic-auth user.
    pub username: Option<String>,
    /// Basic-auth password.
    pub password: Option<String>,
    /// Path of the XML-RPC endpoint.
    pub rpc_path: String,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
    /// Largest encoded request that will be sent.
    pub max_request_bytes: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            uri: None,
            scheme: DEFAULT_SCHEME.to_string(),
            host: None,
            port: None,
            username: None,
            password: None,
            rpc_path: DEFAULT_RPC_PATH.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_request_bytes: MAX_XMLRPC_SIZE,
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ConnectionConfig")
            .field("uri", &self.uri.as_ref().map(|_| "<set>"))
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("rpc_path", &self.rpc_path)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_request_bytes", &self.max_request_bytes)
            .finish()
    }
}

impl ConnectionConfig {
    /// Load settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSetting`] when a numeric variable does not
    /// parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through `lookup`, which maps a variable name to its value.
    ///
    /// Unset and empty variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSetting`] when a numeric variable does not
    /// parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();
        Ok(Self {
            uri: read(ENV_URI),
            scheme: read(ENV_SCHEME).unwrap_or(defaults.scheme),
            host: read(ENV_HOST),
            port: parse_setting(ENV_PORT, read(ENV_PORT))?,
            username: read(ENV_USERNAME),
            password: read(ENV_PASSWORD),
            rpc_path: read(ENV_RPC_PATH).unwrap_or(defaults.rpc_path),
            timeout_secs: parse_setting(ENV_TIMEOUT_SECS, read(ENV_TIMEOUT_SECS))?
                .unwrap_or(defaults.timeout_secs),
            max_request_bytes: parse_setting(ENV_MAX_REQUEST_BYTES, read(ENV_MAX_REQUEST_BYTES))?
                .unwrap_or(defaults.max_request_bytes),
        })
    }

    /// Check the settings without building anything.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a missing host, an unsupported scheme, or a
    /// payload ceiling above [`MAX_XMLRPC_SIZE`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_request_bytes > MAX_XMLRPC_SIZE {
            return Err(ConfigError::PayloadCeiling {
                requested: self.max_request_bytes,
                maximum: MAX_XMLRPC_SIZE,
            });
        }
        if self.explicit_uri().is_some() {
            return Ok(());
        }
        ensure_scheme(&self.scheme)?;
        if self.host.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::MissingHost);
        }
        Ok(())
    }

    /// Compose the endpoint URL, credentials included.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails or the parts do not form a
    /// valid URL.
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        self.validate()?;
        if let Some(uri) = self.explicit_uri() {
            let url = parse_url(uri)?;
            ensure_scheme(url.scheme())?;
            return Ok(url);
        }

        let host = self.host.as_deref().unwrap_or_default();
        let mut url = parse_url(&format!("{}://{host}", self.scheme))?;
        if url.set_port(self.port).is_err() {
            return Err(ConfigError::InvalidSetting {
                field: "port",
                value: self.port.map(|port| port.to_string()).unwrap_or_default(),
            });
        }
        url.set_path(&self.rpc_path);
        if let Some(username) = &self.username
            && (url.set_username(username).is_err()
                || url.set_password(self.password.as_deref()).is_err())
        {
            return Err(ConfigError::InvalidSetting {
                field: "username",
                value: username.clone(),
            });
        }
        Ok(url)
    }

    /// Build the HTTP transport described by these settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the endpoint is invalid or the HTTP client
    /// cannot be constructed.
    pub fn transport(&self) -> Result<HttpTransport, ConfigError> {
        let endpoint = self.endpoint()?;
        let max_request_bytes =
            usize::try_from(self.max_request_bytes).map_err(|_| ConfigError::PayloadCeiling {
                requested: self.max_request_bytes,
                maximum: MAX_XMLRPC_SIZE,
            })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|source| ConfigError::HttpClient { source })?;
        let transport = HttpTransport::new(client, endpoint, max_request_bytes)
            .map_err(|source| ConfigError::Endpoint { source })?;
        debug!(
            endpoint = %transport.endpoint(),
            timeout_secs = self.timeout_secs,
            max_request_bytes,
            "http transport configured"
        );
        Ok(transport)
    }

    fn explicit_uri(&self) -> Option<&str> {
        self.uri.as_deref().filter(|uri| !uri.trim().is_empty())
    }
}

fn ensure_scheme(scheme: &str) -> Result<(), ConfigError> {
    match scheme {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::UnsupportedScheme {
            scheme: other.to_string(),
        }),
    }
}

fn parse_url(value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
        value: value.to_string(),
        source,
    })
}

fn parse_setting<T: std::str::FromStr>(
    field: &'static str,
    value: Option<String>,
) -> Result<Option<T>, ConfigError> {
    value
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidSetting { field, value: raw })
        })
        .transpose()
}
