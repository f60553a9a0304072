//! Configuration for one Easee cloud account.
//!
//! Loaded through a [figment](https://docs.rs/figment), merging an optional
//! `Easee.toml` in the working directory with `EASEE_*` environment
//! variables (environment wins). All token state derived from this config
//! lives in process memory only and is lost on restart.

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

use crate::credentials::Credentials;

fn default_rest_base_url() -> String {
    "https://api.easee.com/api".to_string()
}

fn default_stream_url() -> String {
    "https://streams.easee.com/hubs/chargers".to_string()
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_reconnect_interval_secs() -> u64 {
    3
}

#[derive(Clone, Deserialize)]
pub struct EaseeConfig {
    /// Account e-mail.
    pub username: String,
    /// Account password. Masked in the manual `Debug` impl below so it
    /// cannot leak through `{:?}` logging.
    pub password: String,

    #[serde(default = "default_rest_base_url")]
    pub rest_base_url: String,
    #[serde(default = "default_stream_url")]
    pub stream_url: String,

    /// Default charger for commands and the stream subscription. Commands may
    /// override it per call.
    #[serde(default)]
    pub charger_id: Option<String>,
    #[serde(default)]
    pub site_id: Option<String>,
    #[serde(default)]
    pub circuit_id: Option<String>,

    /// Timeout applied to every login/refresh/REST call. The underlying
    /// client would otherwise wait indefinitely.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Fixed delay before a stream reconnect attempt.
    #[serde(default = "default_reconnect_interval_secs")]
    pub reconnect_interval_secs: u64,

    /// Log every decoded observation at info level.
    #[serde(default)]
    pub log_observations: bool,
    /// Log every REST command and its response at info level.
    #[serde(default)]
    pub log_commands: bool,
}

impl EaseeConfig {
    /// The default figment: `Easee.toml` merged under `EASEE_*` env vars.
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Toml::file("Easee.toml"))
            .merge(Env::prefixed("EASEE_"))
    }

    pub fn from_figment(figment: &Figment) -> figment::error::Result<Self> {
        figment.extract()
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

impl std::fmt::Debug for EaseeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EaseeConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("rest_base_url", &self.rest_base_url)
            .field("stream_url", &self.stream_url)
            .field("charger_id", &self.charger_id)
            .field("site_id", &self.site_id)
            .field("circuit_id", &self.circuit_id)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("reconnect_interval_secs", &self.reconnect_interval_secs)
            .field("log_observations", &self.log_observations)
            .field("log_commands", &self.log_commands)
            .finish()
    }
}
