//! Token store and refresh engine.
//!
//! One [`TokenManager`] instance owns the token pair for one configured
//! account. Any caller that needs a bearer token goes through
//! [`TokenManager::ensure_authenticated`], which guarantees at most one
//! authentication round-trip is in flight at a time: the token state sits
//! behind a `tokio::sync::Mutex` that is held across the network call, so
//! callers that lose the race wait for the winner's outcome instead of
//! issuing duplicate logins.
//!
//! Renewal is proactive. Tokens with a known lifetime renew at 75% of it;
//! a five-minute buffer before expiry forces renewal regardless. Refresh
//! failures are classified: a rejected token pair skips straight to a fresh
//! login, transient network errors retry with linear backoff, and an
//! exhausted login budget clears all state and parks the engine until an
//! external trigger arrives.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::credentials::{validate_credentials, Credentials};
use crate::error::EaseeError;

mod api;

pub use api::{AccountsApi, AuthApi, TokenResponse};

/// Tunables for the refresh engine. The defaults mirror the behavior of the
/// Easee cloud clients in the field; tests shrink the durations.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    /// Minimum remaining validity for the no-network fast path.
    pub safety_margin: Duration,
    /// Remaining validity below which renewal is always due.
    pub min_buffer: Duration,
    /// Renewal point for tokens without a declared lifetime.
    pub early_renewal: Duration,
    /// Fraction of a known lifetime after which renewal is due.
    pub renewal_fraction: f64,
    pub max_login_retries: u32,
    pub max_refresh_retries: u32,
    /// Base of the linear refresh backoff (`base * attempt`).
    pub retry_backoff: Duration,
    /// Hard cap on how long a caller waits for a concurrent attempt.
    pub auth_wait_cap: Duration,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            safety_margin: Duration::from_secs(60),
            min_buffer: Duration::from_secs(300),
            early_renewal: Duration::from_secs(600),
            renewal_fraction: 0.75,
            max_login_retries: 5,
            max_refresh_retries: 5,
            retry_backoff: Duration::from_secs(2),
            auth_wait_cap: Duration::from_secs(30),
        }
    }
}

/// Mutable token state for one account.
#[derive(Debug, Default, Clone)]
pub struct TokenState {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    /// Server-declared validity in seconds. 0 means unknown.
    pub declared_lifetime_secs: i64,
    pub refresh_retry_count: u32,
    pub login_retry_count: u32,
    /// Set once the login budget is exhausted. Cleared only by an external
    /// trigger (a fresh `ensure_authenticated` call).
    pub terminal: bool,
}

impl TokenState {
    /// Derived expiry: `issued_at + declared_lifetime_secs`. Present whenever
    /// an access token is present.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.issued_at
            .map(|at| at + chrono::Duration::seconds(self.declared_lifetime_secs))
    }

    fn time_to_expire_secs(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expires_at().map(|at| (at - now).num_seconds())
    }

    fn age_secs(&self, now: DateTime<Utc>) -> Option<i64> {
        self.issued_at.map(|at| (now - at).num_seconds())
    }

    fn install(&mut self, response: TokenResponse, now: DateTime<Utc>) {
        self.access_token = Some(response.access_token);
        self.refresh_token = Some(response.refresh_token);
        self.issued_at = Some(now);
        self.declared_lifetime_secs = response.expires_in.max(0);
    }

    /// Drop the token pair but keep retry counters.
    fn clear_tokens(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
        self.issued_at = None;
        self.declared_lifetime_secs = 0;
    }

    /// Full reset: tokens and counters. Used on unrecoverable failure so the
    /// next cycle goes through a fresh login.
    fn clear_all(&mut self) {
        self.clear_tokens();
        self.refresh_retry_count = 0;
        self.login_retry_count = 0;
    }
}

/// Why (or that no) renewal is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalDecision {
    NotNeeded,
    NoToken,
    Expired,
    WithinBuffer,
    PercentageThreshold,
    EarlyRenewalFallback,
}

impl RenewalDecision {
    pub fn needed(self) -> bool {
        self != RenewalDecision::NotNeeded
    }
}

/// Decide whether the token should be renewed now. Pure; used by both the
/// authenticated-call path and the periodic background check.
pub fn renewal_decision(
    state: &TokenState,
    settings: &TokenSettings,
    now: DateTime<Utc>,
) -> RenewalDecision {
    if state.access_token.is_none() {
        return RenewalDecision::NoToken;
    }

    let time_to_expire = state.time_to_expire_secs(now).unwrap_or(0);
    if time_to_expire <= 0 {
        return RenewalDecision::Expired;
    }
    if time_to_expire <= settings.min_buffer.as_secs() as i64 {
        return RenewalDecision::WithinBuffer;
    }

    let age = state.age_secs(now).unwrap_or(0);
    if state.declared_lifetime_secs > 0 {
        let threshold = state.declared_lifetime_secs as f64 * settings.renewal_fraction;
        if age as f64 >= threshold {
            return RenewalDecision::PercentageThreshold;
        }
    } else if time_to_expire <= settings.early_renewal.as_secs() as i64 {
        return RenewalDecision::EarlyRenewalFallback;
    }

    RenewalDecision::NotNeeded
}

/// Connection health, observable by UI-ish consumers through a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    LoggedOut,
    Authenticated,
    Retrying,
    /// Retry budget exhausted; reconfiguration required.
    Failed,
}

/// Owns the token state for one account and keeps it fresh.
pub struct TokenManager<A: AuthApi> {
    api: A,
    credentials: Option<Credentials>,
    settings: TokenSettings,
    state: Mutex<TokenState>,
    status_tx: watch::Sender<AuthStatus>,
    /// Bumped after every completed authentication attempt. Callers that
    /// were already waiting for the lock when an attempt completed adopt
    /// its outcome instead of starting another one.
    attempt_generation: AtomicU64,
}

impl<A: AuthApi> TokenManager<A> {
    pub fn new(api: A, credentials: Option<Credentials>, settings: TokenSettings) -> Self {
        let (status_tx, _) = watch::channel(AuthStatus::LoggedOut);
        Self {
            api,
            credentials,
            settings,
            state: Mutex::new(TokenState::default()),
            status_tx,
            attempt_generation: AtomicU64::new(0),
        }
    }

    /// Subscribe to authentication status changes.
    pub fn status(&self) -> watch::Receiver<AuthStatus> {
        self.status_tx.subscribe()
    }

    /// Current bearer token, if one is held. Does not trigger renewal.
    pub async fn access_token(&self) -> Option<String> {
        self.state.lock().await.access_token.clone()
    }

    /// Snapshot of the token state, mainly for diagnostics.
    pub async fn state_snapshot(&self) -> TokenState {
        self.state.lock().await.clone()
    }

    /// Guarantee a currently-valid bearer token, performing at most one
    /// authentication network call across all concurrent callers. Callers
    /// that overlap with an attempt in flight share its outcome, whether it
    /// succeeded or failed.
    ///
    /// Returns `false` without touching the network when the configured
    /// credentials do not validate.
    pub async fn ensure_authenticated(&self) -> bool {
        let validation = validate_credentials(self.credentials.as_ref());
        if !validation.valid {
            log::warn!("Easee: not authenticating: {}", validation.message);
            return false;
        }

        let entry_generation = self.attempt_generation.load(Ordering::SeqCst);

        // Waiting here more than the cap means an authentication attempt is
        // badly stuck; report failure rather than piling up.
        let mut state = match tokio::time::timeout(self.settings.auth_wait_cap, self.state.lock())
            .await
        {
            Ok(guard) => guard,
            Err(_) => {
                log::warn!("Easee: timed out waiting for a concurrent authentication attempt");
                return false;
            }
        };

        let now = Utc::now();
        if state.access_token.is_some() {
            let remaining = state.time_to_expire_secs(now).unwrap_or(0);
            if remaining > self.settings.safety_margin.as_secs() as i64 {
                return true;
            }
        }

        // An attempt completed while this caller waited for the lock: its
        // outcome stands for this caller too. Running the ladder again here
        // would turn one failure into a burst of duplicate network calls.
        if self.attempt_generation.load(Ordering::SeqCst) != entry_generation {
            return state.access_token.is_some();
        }

        // An ensure call is an explicit external trigger, so a terminal
        // failure state does not stay sticky here.
        if state.terminal {
            log::info!("Easee: retrying authentication after terminal failure");
            state.terminal = false;
        }

        self.check_token_locked(&mut state).await
    }

    /// Renewal decision plus the refresh-then-login ladder. Caller holds the
    /// state lock, which is what serializes authentication attempts.
    async fn check_token_locked(&self, state: &mut TokenState) -> bool {
        let decision = renewal_decision(state, &self.settings, Utc::now());
        if !decision.needed() {
            return state.access_token.is_some();
        }
        log::info!("Easee: token renewal needed: {:?}", decision);
        let outcome = self.renew_locked(state).await;
        self.attempt_generation.fetch_add(1, Ordering::SeqCst);
        outcome
    }

    async fn renew_locked(&self, state: &mut TokenState) -> bool {
        if let (Some(access), Some(refresh)) =
            (state.access_token.clone(), state.refresh_token.clone())
        {
            loop {
                match self.api.refresh(&access, &refresh).await {
                    Ok(response) => {
                        state.install(response, Utc::now());
                        state.refresh_retry_count = 0;
                        self.publish(AuthStatus::Authenticated);
                        return true;
                    }
                    Err(EaseeError::AuthExpired) => {
                        // The pair is dead. Not a fault to retry: reset the
                        // counter and go get a fresh pair.
                        log::warn!("Easee: refresh token rejected, falling back to login");
                        state.clear_tokens();
                        state.refresh_retry_count = 0;
                        break;
                    }
                    Err(err) => {
                        state.refresh_retry_count += 1;
                        if state.refresh_retry_count > self.settings.max_refresh_retries {
                            log::warn!(
                                "Easee: refresh failed {} times ({}), falling back to login",
                                state.refresh_retry_count,
                                err
                            );
                            state.clear_tokens();
                            state.refresh_retry_count = 0;
                            break;
                        }
                        log::warn!(
                            "Easee: refresh attempt {} failed: {}",
                            state.refresh_retry_count,
                            err
                        );
                        self.publish(AuthStatus::Retrying);
                        tokio::time::sleep(
                            self.settings.retry_backoff * state.refresh_retry_count,
                        )
                        .await;
                    }
                }
            }
        }

        self.login_locked(state).await
    }

    async fn login_locked(&self, state: &mut TokenState) -> bool {
        // Credentials were validated on entry; unwrap-free access anyway.
        let Some(credentials) = self.credentials.as_ref() else {
            return false;
        };

        match self
            .api
            .login(&credentials.username, &credentials.password)
            .await
        {
            Ok(response) => {
                state.install(response, Utc::now());
                state.refresh_retry_count = 0;
                state.login_retry_count = 0;
                self.publish(AuthStatus::Authenticated);
                log::info!(
                    "Easee: logged in, token valid for {}s",
                    state.declared_lifetime_secs
                );
                true
            }
            Err(err) => {
                state.login_retry_count += 1;
                log::warn!(
                    "Easee: login attempt {} failed: {}",
                    state.login_retry_count,
                    err
                );
                if state.login_retry_count >= self.settings.max_login_retries {
                    // Terminal: wipe everything and stop silent retries.
                    state.clear_all();
                    state.terminal = true;
                    self.publish(AuthStatus::Failed);
                    log::error!("Easee: authentication failed - reconfiguration required");
                } else {
                    self.publish(AuthStatus::Retrying);
                }
                false
            }
        }
    }

    fn publish(&self, status: AuthStatus) {
        // send_replace never fails even with no receivers.
        self.status_tx.send_replace(status);
    }

    /// Delay until the next background check, adapted to the current state.
    async fn next_check_delay(&self) -> Duration {
        if !validate_credentials(self.credentials.as_ref()).valid {
            return Duration::from_secs(300);
        }

        let state = self.state.lock().await;
        if state.terminal {
            // Parked; poll slowly so an external trigger can still wake us.
            return Duration::from_secs(300);
        }
        if state.access_token.is_none() {
            return Duration::from_secs(60);
        }

        let now = Utc::now();
        let time_to_expire = state.time_to_expire_secs(now).unwrap_or(0);
        let mut to_renewal = time_to_expire - self.settings.min_buffer.as_secs() as i64;
        if state.declared_lifetime_secs > 0 {
            let threshold =
                (state.declared_lifetime_secs as f64 * self.settings.renewal_fraction) as i64;
            let age = state.age_secs(now).unwrap_or(0);
            to_renewal = to_renewal.min(threshold - age);
        }

        // Land roughly a third of the way toward the renewal point.
        let secs = (to_renewal / 3).clamp(30, 300);
        Duration::from_secs(secs as u64)
    }

    async fn background_check(&self) {
        if !validate_credentials(self.credentials.as_ref()).valid {
            return;
        }
        let mut state = self.state.lock().await;
        if state.terminal {
            return;
        }
        self.check_token_locked(&mut state).await;
    }
}

impl<A: AuthApi + 'static> TokenManager<A> {
    /// Periodic token check. The returned handle must be aborted on
    /// shutdown so no scheduled work leaks past teardown.
    pub fn spawn_check_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let delay = manager.next_check_delay().await;
                log::debug!("Easee: next token check in {:?}", delay);
                tokio::time::sleep(delay).await;
                manager.background_check().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Scripted network stand-in. Refresh outcomes are consumed in order;
    /// once the script runs dry, refreshes fail with a network error.
    struct ScriptedApi {
        login_calls: AtomicUsize,
        refresh_calls: AtomicUsize,
        login_ok: bool,
        login_delay: Duration,
        refresh_script: StdMutex<VecDeque<crate::error::Result<TokenResponse>>>,
    }

    impl ScriptedApi {
        fn new(login_ok: bool) -> Self {
            Self {
                login_calls: AtomicUsize::new(0),
                refresh_calls: AtomicUsize::new(0),
                login_ok,
                login_delay: Duration::from_millis(0),
                refresh_script: StdMutex::new(VecDeque::new()),
            }
        }

        fn with_login_delay(mut self, delay: Duration) -> Self {
            self.login_delay = delay;
            self
        }

        fn push_refresh(&self, outcome: crate::error::Result<TokenResponse>) {
            self.refresh_script.lock().unwrap().push_back(outcome);
        }

        fn tokens(lifetime: i64) -> TokenResponse {
            TokenResponse {
                access_token: "access".to_string(),
                refresh_token: "refresh".to_string(),
                expires_in: lifetime,
            }
        }
    }

    impl AuthApi for ScriptedApi {
        async fn login(&self, _username: &str, _password: &str) -> crate::error::Result<TokenResponse> {
            self.login_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.login_delay).await;
            if self.login_ok {
                Ok(Self::tokens(3600))
            } else {
                Err(EaseeError::Api {
                    status: 401,
                    body: "bad credentials".to_string(),
                })
            }
        }

        async fn refresh(
            &self,
            _access_token: &str,
            _refresh_token: &str,
        ) -> crate::error::Result<TokenResponse> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            self.refresh_script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(EaseeError::Network("connection refused".to_string())))
        }
    }

    fn creds() -> Option<Credentials> {
        Some(Credentials {
            username: "user@example.com".to_string(),
            password: "hunter22".to_string(),
        })
    }

    fn fast_settings() -> TokenSettings {
        TokenSettings {
            retry_backoff: Duration::from_millis(1),
            ..TokenSettings::default()
        }
    }

    async fn seed_token(manager: &TokenManager<ScriptedApi>, lifetime: i64, age: i64) {
        let mut state = manager.state.lock().await;
        state.access_token = Some("access".to_string());
        state.refresh_token = Some("refresh".to_string());
        state.issued_at = Some(Utc::now() - chrono::Duration::seconds(age));
        state.declared_lifetime_secs = lifetime;
    }

    fn decision_for(lifetime: i64, age: i64) -> RenewalDecision {
        let state = TokenState {
            access_token: Some("access".to_string()),
            refresh_token: Some("refresh".to_string()),
            issued_at: Some(Utc::now() - chrono::Duration::seconds(age)),
            declared_lifetime_secs: lifetime,
            ..TokenState::default()
        };
        renewal_decision(&state, &TokenSettings::default(), Utc::now())
    }

    #[test]
    fn renewal_decision_reasons() {
        let empty = TokenState::default();
        assert_eq!(
            renewal_decision(&empty, &TokenSettings::default(), Utc::now()),
            RenewalDecision::NoToken
        );
        assert_eq!(decision_for(3600, 4000), RenewalDecision::Expired);
        assert_eq!(decision_for(3600, 3400), RenewalDecision::WithinBuffer);
        // Past 75% of a known lifetime.
        assert_eq!(decision_for(3600, 2800), RenewalDecision::PercentageThreshold);
        // Under 75% with plenty of buffer left.
        assert_eq!(decision_for(3600, 2000), RenewalDecision::NotNeeded);
    }

    #[tokio::test]
    async fn invalid_credentials_never_touch_the_network() {
        let manager = TokenManager::new(ScriptedApi::new(true), None, fast_settings());
        assert!(!manager.ensure_authenticated().await);
        assert_eq!(manager.api.login_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fresh_token_short_circuits() {
        let manager = TokenManager::new(ScriptedApi::new(true), creds(), fast_settings());
        seed_token(&manager, 3600, 10).await;
        assert!(manager.ensure_authenticated().await);
        assert_eq!(manager.api.login_calls.load(Ordering::SeqCst), 0);
        assert_eq!(manager.api.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrent_calls_share_one_login() {
        let api = ScriptedApi::new(true).with_login_delay(Duration::from_millis(50));
        let manager = Arc::new(TokenManager::new(api, creds(), fast_settings()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = Arc::clone(&manager);
            handles.push(tokio::spawn(
                async move { manager.ensure_authenticated().await },
            ));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert_eq!(manager.api.login_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_failed_logins_share_one_attempt() {
        let api = ScriptedApi::new(false).with_login_delay(Duration::from_millis(50));
        let manager = Arc::new(TokenManager::new(api, creds(), fast_settings()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = Arc::clone(&manager);
            handles.push(tokio::spawn(
                async move { manager.ensure_authenticated().await },
            ));
        }
        for handle in handles {
            assert!(!handle.await.unwrap());
        }
        // One shared failure, not a burst of eight.
        assert_eq!(manager.api.login_calls.load(Ordering::SeqCst), 1);

        let state = manager.state_snapshot().await;
        assert_eq!(state.login_retry_count, 1);
        assert!(!state.terminal);

        // A call arriving after the attempt finished is a fresh attempt.
        assert!(!manager.ensure_authenticated().await);
        assert_eq!(manager.api.login_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn rejected_refresh_clears_pair_and_logs_in() {
        let api = ScriptedApi::new(true);
        api.push_refresh(Err(EaseeError::AuthExpired));
        let manager = TokenManager::new(api, creds(), fast_settings());
        seed_token(&manager, 3600, 3570).await; // 30s left: inside the safety margin

        assert!(manager.ensure_authenticated().await);
        assert_eq!(manager.api.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(manager.api.login_calls.load(Ordering::SeqCst), 1);

        let state = manager.state_snapshot().await;
        // Rejection is a state transition, not a fault: counter stays 0.
        assert_eq!(state.refresh_retry_count, 0);
        assert!(state.access_token.is_some());
    }

    #[tokio::test]
    async fn refresh_retry_budget_then_login_fallback() {
        let api = ScriptedApi::new(false);
        let settings = TokenSettings {
            max_refresh_retries: 1,
            max_login_retries: 5,
            retry_backoff: Duration::from_millis(1),
            ..TokenSettings::default()
        };
        let manager = TokenManager::new(api, creds(), settings);
        seed_token(&manager, 3600, 3570).await;

        assert!(!manager.ensure_authenticated().await);
        // Initial failure plus one retry, then the terminal fallback.
        assert_eq!(manager.api.refresh_calls.load(Ordering::SeqCst), 2);
        assert_eq!(manager.api.login_calls.load(Ordering::SeqCst), 1);

        let state = manager.state_snapshot().await;
        assert_eq!(state.refresh_retry_count, 0);
        assert!(state.access_token.is_none());
    }

    #[tokio::test]
    async fn successful_refresh_resets_counter() {
        let api = ScriptedApi::new(true);
        api.push_refresh(Err(EaseeError::Network("timeout".to_string())));
        api.push_refresh(Ok(ScriptedApi::tokens(7200)));
        let manager = TokenManager::new(api, creds(), fast_settings());
        seed_token(&manager, 3600, 3570).await;

        assert!(manager.ensure_authenticated().await);
        assert_eq!(manager.api.refresh_calls.load(Ordering::SeqCst), 2);
        assert_eq!(manager.api.login_calls.load(Ordering::SeqCst), 0);

        let state = manager.state_snapshot().await;
        assert_eq!(state.refresh_retry_count, 0);
        assert_eq!(state.declared_lifetime_secs, 7200);
    }

    #[tokio::test]
    async fn login_budget_exhaustion_is_terminal() {
        let settings = TokenSettings {
            max_login_retries: 2,
            retry_backoff: Duration::from_millis(1),
            ..TokenSettings::default()
        };
        let manager = TokenManager::new(ScriptedApi::new(false), creds(), settings);
        let mut status = manager.status();

        assert!(!manager.ensure_authenticated().await);
        assert!(!manager.ensure_authenticated().await);

        let state = manager.state_snapshot().await;
        assert!(state.terminal);
        assert!(state.access_token.is_none());
        assert_eq!(state.login_retry_count, 0);
        assert!(status.has_changed().unwrap());
        assert_eq!(*status.borrow_and_update(), AuthStatus::Failed);

        // The background check respects the terminal state...
        manager.background_check().await;
        assert_eq!(manager.api.login_calls.load(Ordering::SeqCst), 2);

        // ...but an explicit ensure call is an external trigger.
        assert!(!manager.ensure_authenticated().await);
        assert_eq!(manager.api.login_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn expiry_invariant_holds_after_install() {
        let manager = TokenManager::new(ScriptedApi::new(true), creds(), fast_settings());
        assert!(manager.ensure_authenticated().await);
        let state = manager.state_snapshot().await;
        let expires = state.expires_at().unwrap();
        let issued = state.issued_at.unwrap();
        assert_eq!(
            (expires - issued).num_seconds(),
            state.declared_lifetime_secs
        );
    }

    #[tokio::test]
    async fn check_delay_adapts_to_state() {
        let manager = TokenManager::new(ScriptedApi::new(true), None, fast_settings());
        assert_eq!(manager.next_check_delay().await, Duration::from_secs(300));

        let manager = TokenManager::new(ScriptedApi::new(true), creds(), fast_settings());
        assert_eq!(manager.next_check_delay().await, Duration::from_secs(60));

        // Fresh hour-long token: a third of the way to the 45min renewal
        // point, clamped to the five-minute ceiling.
        seed_token(&manager, 3600, 0).await;
        assert_eq!(manager.next_check_delay().await, Duration::from_secs(300));

        // Nearly due: clamped to the 30s floor.
        seed_token(&manager, 3600, 2650).await;
        let delay = manager.next_check_delay().await;
        assert!(delay >= Duration::from_secs(30) && delay <= Duration::from_secs(60));
    }
}
