//! REST command dispatcher for the Easee cloud API.
//!
//! A small closed set of named topics maps onto one generic
//! authenticated-call primitive. Every call goes through
//! [`TokenManager::ensure_authenticated`] first and fails with an
//! authentication error before any HTTP request when no token can be
//! established.
//!
//! Topic-to-endpoint resolution is a pure function ([`resolve_topic`]) so
//! the parameter rules can be tested without a network in sight. Two of
//! those rules are deliberate design choices carried over from the field:
//! `dynamic_current` derives GET vs POST from the payload shape, and missing
//! charger/site/circuit ids fail with a message naming every place the id
//! could have come from.

use std::sync::Arc;

use reqwest::Method;
use serde_json::{json, Value};

use crate::auth::{AuthApi, TokenManager};
use crate::config::EaseeConfig;
use crate::credentials::{validate_login_credentials, Credentials};
use crate::error::{EaseeError, Result};

/// One command for the dispatcher: a topic, an optional payload, and
/// optional per-call id overrides.
#[derive(Debug, Clone, Default)]
pub struct Command {
    pub topic: String,
    pub payload: Option<Value>,
    pub charger: Option<String>,
    pub site: Option<String>,
    pub circuit: Option<String>,
}

impl Command {
    pub fn new(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            ..Self::default()
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Default ids from the static configuration, the last resort of parameter
/// resolution.
#[derive(Debug, Clone, Default)]
pub struct DefaultIds {
    pub charger: Option<String>,
    pub site: Option<String>,
    pub circuit: Option<String>,
}

impl From<&EaseeConfig> for DefaultIds {
    fn from(config: &EaseeConfig) -> Self {
        Self {
            charger: config.charger_id.clone(),
            site: config.site_id.clone(),
            circuit: config.circuit_id.clone(),
        }
    }
}

/// A resolved endpoint call, ready for the HTTP layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// Resolve one id from its three possible supply points, in order: explicit
/// command field, payload sub-field, configured default. A miss on all
/// three names every one of them; a silent empty id must never reach the
/// network layer.
fn required_id(
    kind: &str,
    explicit: Option<&str>,
    payload: Option<&Value>,
    configured: Option<&str>,
) -> Result<String> {
    if let Some(id) = explicit {
        return Ok(id.to_string());
    }
    if let Some(id) = payload
        .and_then(|p| p.get(kind))
        .and_then(Value::as_str)
    {
        return Ok(id.to_string());
    }
    if let Some(id) = configured {
        return Ok(id.to_string());
    }
    Err(EaseeError::MissingParameter(format!(
        "no {kind} id: set the command's {kind} field, a {kind} field in the payload, \
         or configure a default {kind} id",
    )))
}

/// Payload fields that make a `dynamic_current` command an update rather
/// than a query.
const CURRENT_LIMIT_FIELDS: &[&str] = &[
    "phase1",
    "phase2",
    "phase3",
    "dynamicChargerCurrent",
    "timeToLive",
];

fn is_current_limit_update(payload: Option<&Value>) -> bool {
    match payload.and_then(Value::as_object) {
        Some(map) => CURRENT_LIMIT_FIELDS.iter().any(|f| map.contains_key(*f)),
        None => false,
    }
}

/// Map a topic to its endpoint. Pure; id resolution and the
/// `dynamic_current` method overload live here.
pub fn resolve_topic(command: &Command, defaults: &DefaultIds) -> Result<ResolvedCall> {
    let charger_id = || {
        required_id(
            "charger",
            command.charger.as_deref(),
            command.payload.as_ref(),
            defaults.charger.as_deref(),
        )
    };

    let get = |path: String| ResolvedCall {
        method: Method::GET,
        path,
        body: None,
    };

    match command.topic.as_str() {
        "charger" => Ok(get(format!("/chargers/{}", charger_id()?))),
        "charger_details" => Ok(get(format!("/chargers/{}/details", charger_id()?))),
        "charger_state" => Ok(get(format!("/chargers/{}/state", charger_id()?))),
        "charger_site" => Ok(get(format!("/chargers/{}/site", charger_id()?))),
        "charger_config" => Ok(get(format!("/chargers/{}/config", charger_id()?))),
        "charger_session_latest" => {
            Ok(get(format!("/chargers/{}/sessions/latest", charger_id()?)))
        }
        "charger_session_ongoing" => {
            Ok(get(format!("/chargers/{}/sessions/ongoing", charger_id()?)))
        }
        "start_charging" | "stop_charging" | "pause_charging" | "resume_charging"
        | "toggle_charging" | "reboot" => Ok(ResolvedCall {
            method: Method::POST,
            path: format!("/chargers/{}/commands/{}", charger_id()?, command.topic),
            body: None,
        }),
        "dynamic_current" => {
            let site = required_id(
                "site",
                command.site.as_deref(),
                command.payload.as_ref(),
                defaults.site.as_deref(),
            )?;
            let circuit = required_id(
                "circuit",
                command.circuit.as_deref(),
                command.payload.as_ref(),
                defaults.circuit.as_deref(),
            )?;
            let path = format!("/sites/{site}/circuits/{circuit}/dynamicCurrent");
            // Object payload carrying current-limit fields means an update;
            // anything else is a query of the current limits.
            if is_current_limit_update(command.payload.as_ref()) {
                Ok(ResolvedCall {
                    method: Method::POST,
                    path,
                    body: command.payload.clone(),
                })
            } else {
                Ok(get(path))
            }
        }
        other => Err(EaseeError::UnknownTopic(other.to_string())),
    }
}

/// Authenticated REST client. Shares the token manager with the streaming
/// subscriber; one instance per configured account.
pub struct EaseeClient<A: AuthApi> {
    config: EaseeConfig,
    tokens: Arc<TokenManager<A>>,
    http: reqwest::Client,
}

impl<A: AuthApi> EaseeClient<A> {
    pub fn new(config: EaseeConfig, tokens: Arc<TokenManager<A>>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.http_timeout_secs))
            .build()?;
        Ok(Self {
            config,
            tokens,
            http,
        })
    }

    /// Generic authenticated call. The path is relative to the configured
    /// REST base URL.
    pub async fn call(&self, path: &str, method: Method, body: Option<Value>) -> Result<Value> {
        if !self.tokens.ensure_authenticated().await {
            // Distinguish an exhausted retry budget from a plain failure so
            // callers can stop issuing commands that cannot succeed.
            if self.tokens.state_snapshot().await.terminal {
                return Err(EaseeError::TerminalAuth);
            }
            return Err(EaseeError::NotAuthenticated);
        }
        let token = self
            .tokens
            .access_token()
            .await
            .ok_or(EaseeError::NotAuthenticated)?;

        self.execute(path, method, body, Some(&token)).await
    }

    /// Dispatch one named command.
    pub async fn command(&self, command: &Command) -> Result<Value> {
        if self.config.log_commands {
            log::info!("Easee: command {} {:?}", command.topic, command.payload);
        }
        match command.topic.as_str() {
            // The two account topics bypass the stored-token path.
            "login" => self.login_command(command).await,
            "refresh_token" => self.refresh_command().await,
            _ => {
                let resolved = resolve_topic(command, &DefaultIds::from(&self.config))?;
                let response = self
                    .call(&resolved.path, resolved.method, resolved.body)
                    .await?;
                if self.config.log_commands {
                    log::info!("Easee: command {} completed", command.topic);
                }
                Ok(response)
            }
        }
    }

    /// Direct login with payload-supplied (or configured) credentials. Uses
    /// the loose presence-only validation, matching the login form.
    async fn login_command(&self, command: &Command) -> Result<Value> {
        let payload_creds = command.payload.as_ref().and_then(|p| {
            let username = p.get("username").and_then(Value::as_str)?;
            let password = p.get("password").and_then(Value::as_str)?;
            Some(Credentials {
                username: username.to_string(),
                password: password.to_string(),
            })
        });
        let credentials = payload_creds.unwrap_or_else(|| self.config.credentials());

        let validation = validate_login_credentials(Some(&credentials));
        if !validation.valid {
            return Err(EaseeError::Validation {
                message: validation.message,
                field: validation.field,
            });
        }

        self.execute(
            "/accounts/login",
            Method::POST,
            Some(json!({
                "userName": credentials.username,
                "password": credentials.password,
            })),
            None,
        )
        .await
    }

    /// Exchange the currently held token pair explicitly.
    async fn refresh_command(&self) -> Result<Value> {
        let state = self.tokens.state_snapshot().await;
        let (Some(access), Some(refresh)) = (state.access_token, state.refresh_token) else {
            return Err(EaseeError::NotAuthenticated);
        };
        self.execute(
            "/accounts/refresh_token",
            Method::POST,
            Some(json!({ "accessToken": access, "refreshToken": refresh })),
            None,
        )
        .await
    }

    async fn execute(
        &self,
        path: &str,
        method: Method,
        body: Option<Value>,
        bearer: Option<&str>,
    ) -> Result<Value> {
        let url = format!(
            "{}{}",
            self.config.rest_base_url.trim_end_matches('/'),
            path
        );
        let mut request = self
            .http
            .request(method, &url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = bearer {
            request = request.header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", token),
            );
        }
        if let Some(body) = body {
            request = request.json(&body);
        } else {
            // Some command endpoints reject POSTs without a content length.
            request = request.header(reqwest::header::CONTENT_LENGTH, "0");
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(EaseeError::Api {
                status: status.as_u16(),
                body: text,
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::auth::{TokenResponse, TokenSettings};

    fn defaults() -> DefaultIds {
        DefaultIds {
            charger: Some("EH000001".to_string()),
            site: Some("1001".to_string()),
            circuit: Some("2002".to_string()),
        }
    }

    #[test]
    fn charger_state_resolves_to_get() {
        let resolved = resolve_topic(&Command::new("charger_state"), &defaults()).unwrap();
        assert_eq!(resolved.method, Method::GET);
        assert_eq!(resolved.path, "/chargers/EH000001/state");
        assert!(resolved.body.is_none());
    }

    #[test]
    fn command_topics_resolve_to_post() {
        for topic in ["start_charging", "stop_charging", "pause_charging", "reboot"] {
            let resolved = resolve_topic(&Command::new(topic), &defaults()).unwrap();
            assert_eq!(resolved.method, Method::POST, "{topic}");
            assert_eq!(
                resolved.path,
                format!("/chargers/EH000001/commands/{topic}")
            );
        }
    }

    #[test]
    fn explicit_charger_beats_configured_default() {
        let mut command = Command::new("charger");
        command.charger = Some("EH999999".to_string());
        let resolved = resolve_topic(&command, &defaults()).unwrap();
        assert_eq!(resolved.path, "/chargers/EH999999");
    }

    #[test]
    fn payload_charger_beats_configured_default() {
        let command =
            Command::new("charger").with_payload(json!({ "charger": "EH555555" }));
        let resolved = resolve_topic(&command, &defaults()).unwrap();
        assert_eq!(resolved.path, "/chargers/EH555555");
    }

    #[test]
    fn dynamic_current_update_is_post_with_body() {
        let payload = json!({ "dynamicChargerCurrent": 16 });
        let command = Command::new("dynamic_current").with_payload(payload.clone());
        let resolved = resolve_topic(&command, &defaults()).unwrap();
        assert_eq!(resolved.method, Method::POST);
        assert_eq!(resolved.path, "/sites/1001/circuits/2002/dynamicCurrent");
        assert_eq!(resolved.body, Some(payload));
    }

    #[test]
    fn dynamic_current_phase_fields_are_updates() {
        let command = Command::new("dynamic_current")
            .with_payload(json!({ "phase1": 10, "phase2": 10, "phase3": 10 }));
        let resolved = resolve_topic(&command, &defaults()).unwrap();
        assert_eq!(resolved.method, Method::POST);
    }

    #[test]
    fn dynamic_current_query_is_get() {
        // Non-object payloads query rather than update.
        let command = Command::new("dynamic_current").with_payload(json!("read"));
        let resolved = resolve_topic(&command, &defaults()).unwrap();
        assert_eq!(resolved.method, Method::GET);
        assert!(resolved.body.is_none());

        let resolved = resolve_topic(&Command::new("dynamic_current"), &defaults()).unwrap();
        assert_eq!(resolved.method, Method::GET);
    }

    #[test]
    fn missing_circuit_is_named_with_supply_points() {
        let mut defaults = defaults();
        defaults.circuit = None;
        let err = resolve_topic(&Command::new("dynamic_current"), &defaults).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("circuit"), "{message}");
        assert!(message.contains("payload"), "{message}");
        assert!(message.contains("default"), "{message}");
    }

    #[test]
    fn missing_charger_everywhere_fails() {
        let err = resolve_topic(&Command::new("charger_state"), &DefaultIds::default())
            .unwrap_err();
        assert!(matches!(err, EaseeError::MissingParameter(_)));
    }

    #[test]
    fn unknown_topic_is_rejected() {
        let err = resolve_topic(&Command::new("does_not_exist"), &defaults()).unwrap_err();
        assert!(matches!(err, EaseeError::UnknownTopic(_)));
    }

    /// Stand-in account API that rejects everything.
    struct RejectingApi;

    impl AuthApi for RejectingApi {
        async fn login(&self, _username: &str, _password: &str) -> Result<TokenResponse> {
            Err(EaseeError::Api {
                status: 401,
                body: "bad credentials".to_string(),
            })
        }

        async fn refresh(
            &self,
            _access_token: &str,
            _refresh_token: &str,
        ) -> Result<TokenResponse> {
            Err(EaseeError::AuthExpired)
        }
    }

    fn test_config() -> EaseeConfig {
        EaseeConfig {
            username: "user@example.com".to_string(),
            password: "hunter22".to_string(),
            rest_base_url: "http://127.0.0.1:9".to_string(),
            stream_url: "http://127.0.0.1:9".to_string(),
            charger_id: Some("EH000001".to_string()),
            site_id: None,
            circuit_id: None,
            http_timeout_secs: 1,
            reconnect_interval_secs: 1,
            log_observations: false,
            log_commands: false,
        }
    }

    #[tokio::test]
    async fn exhausted_auth_surfaces_terminal_error() {
        let settings = TokenSettings {
            max_login_retries: 1,
            retry_backoff: Duration::from_millis(1),
            ..TokenSettings::default()
        };
        let config = test_config();
        let tokens = Arc::new(TokenManager::new(
            RejectingApi,
            Some(config.credentials()),
            settings,
        ));
        let client = EaseeClient::new(config, tokens).unwrap();

        let err = client
            .call("/chargers/EH000001/state", Method::GET, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EaseeError::TerminalAuth), "{err}");
    }
}
