//! Decision mediation — the user-agent multiplexer.
//!
//! The protocol occasionally needs an outside answer before it can
//! proceed: accept a sync-mode switch, choose a refresh direction, supply
//! credentials for an auth challenge. Handlers implement [`UserAgent`]
//! with any subset of hooks; [`UserAgentMultiplexer`] resolves each
//! decision by trying, across the whole handler chain, the decision's
//! specific hook, then the generic hook for its action, then the
//! catch-all, and finally a built-in default.
//!
//! Handlers may wait on a human, so the trait is async and the
//! multiplexer can bound `choose`/`fetch` with a timeout.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use syncml_types::{DeviceId, StoreUri};
use tracing::{debug, warn};

/// Decision point: the peer proposes a different sync mode than requested.
pub const DECISION_SYNC_MODE_SWITCH: &str = "sync.mode-switch";
/// Decision point: the peer asks to replace the stored device info.
pub const DECISION_DEV_INFO_SWAP: &str = "devinfo.swap";
/// Decision point: sync state is lost and a refresh direction is needed.
pub const DECISION_REFRESH_REQUIRED: &str = "sync.refresh-required";
/// Decision point: the peer issued an authentication challenge.
pub const DECISION_AUTH_CHALLENGE: &str = "auth.challenge";

/// The action class a decision point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Yes/no confirmation.
    Accept,
    /// Selection among presented options.
    Choose,
    /// Production of a value (e.g. credentials).
    Fetch,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::Accept => "accept",
            Action::Choose => "choose",
            Action::Fetch => "fetch",
        };
        write!(f, "{s}")
    }
}

/// Context handed to handlers at a decision point.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionEvent {
    /// The peer the session is talking to, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer: Option<DeviceId>,
    /// The store the decision concerns, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_uri: Option<StoreUri>,
    /// Human-readable description of what is being decided.
    pub message: String,
    /// Free-form protocol detail for rich UIs.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub detail: serde_json::Value,
}

impl DecisionEvent {
    /// Creates an event with just a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            peer: None,
            store_uri: None,
            message: message.into(),
            detail: serde_json::Value::Null,
        }
    }

    /// Attaches the peer device ID.
    #[must_use]
    pub fn with_peer(mut self, peer: impl Into<DeviceId>) -> Self {
        self.peer = Some(peer.into());
        self
    }

    /// Attaches the store the decision concerns.
    #[must_use]
    pub fn with_store(mut self, uri: impl Into<StoreUri>) -> Self {
        self.store_uri = Some(uri.into());
        self
    }

    /// Attaches protocol detail.
    #[must_use]
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = detail;
        self
    }
}

/// One selectable option at a `choose` decision point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Stable machine value.
    pub value: String,
    /// Human-readable label.
    pub label: String,
    /// Whether this option is preselected when no handler answers.
    pub default: bool,
}

impl Choice {
    /// Creates a non-default choice.
    #[must_use]
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            default: false,
        }
    }

    /// Flags this choice as the default.
    #[must_use]
    pub fn preselected(mut self) -> Self {
        self.default = true;
        self
    }
}

/// Credentials supplied for an authentication challenge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Username, if supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Password, if supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Credentials {
    /// Username/password credentials.
    #[must_use]
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// No credentials supplied.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// True when no credential material is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none()
    }
}

/// A value produced by a `fetch` decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FetchValue {
    /// Credentials for an auth challenge.
    Credentials(Credentials),
    /// Any other fetched value.
    Raw(serde_json::Value),
}

/// An answer produced by the catch-all hook.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    /// Answer to an `accept` decision.
    Accepted(bool),
    /// Answer to a `choose` decision.
    Chose(Choice),
    /// Answer to a `fetch` decision.
    Fetched(FetchValue),
}

/// A decision handler. Every hook defaults to "not handled here"
/// (`None`); implement only the decisions you care about.
#[async_trait]
pub trait UserAgent: Send + Sync {
    /// Specific hook: accept or refuse a sync-mode switch.
    async fn accept_sync_mode_switch(&self, event: &DecisionEvent) -> Option<bool> {
        let _ = event;
        None
    }

    /// Specific hook: accept or refuse a device-info swap.
    async fn accept_dev_info_swap(&self, event: &DecisionEvent) -> Option<bool> {
        let _ = event;
        None
    }

    /// Specific hook: choose the refresh direction.
    async fn choose_refresh_required(
        &self,
        event: &DecisionEvent,
        options: &[Choice],
    ) -> Option<Choice> {
        let _ = (event, options);
        None
    }

    /// Specific hook: supply credentials for an auth challenge.
    async fn fetch_credentials(&self, event: &DecisionEvent) -> Option<Credentials> {
        let _ = event;
        None
    }

    /// Generic hook for any `accept` decision.
    async fn accept(&self, decision: &str, event: &DecisionEvent) -> Option<bool> {
        let _ = (decision, event);
        None
    }

    /// Generic hook for any `choose` decision.
    async fn choose(
        &self,
        decision: &str,
        event: &DecisionEvent,
        options: &[Choice],
    ) -> Option<Choice> {
        let _ = (decision, event, options);
        None
    }

    /// Generic hook for any `fetch` decision.
    async fn fetch(&self, decision: &str, event: &DecisionEvent) -> Option<FetchValue> {
        let _ = (decision, event);
        None
    }

    /// Fully generic catch-all.
    async fn handle(
        &self,
        action: Action,
        decision: &str,
        event: &DecisionEvent,
        options: &[Choice],
    ) -> Option<Answer> {
        let _ = (action, decision, event, options);
        None
    }
}

/// Resolves decisions against an ordered handler chain.
///
/// Resolution is layered: all handlers are tried for the decision's
/// specific hook, then all for the generic action hook, then all for the
/// catch-all. Within a layer the first handler that produces an answer
/// wins and later handlers are not consulted. If no layer answers, the
/// built-in defaults apply: `accept` is "yes", `choose` takes the option
/// flagged default (or the first), `fetch` of an auth challenge yields
/// empty credentials, and any other `fetch` is unrecoverable.
pub struct UserAgentMultiplexer {
    handlers: Vec<Arc<dyn UserAgent>>,
    timeout: Option<Duration>,
}

impl UserAgentMultiplexer {
    /// Creates a multiplexer over an ordered handler chain.
    #[must_use]
    pub fn new(handlers: Vec<Arc<dyn UserAgent>>) -> Self {
        Self {
            handlers,
            timeout: None,
        }
    }

    /// Bounds `choose` and `fetch` decisions (the genuinely external wait
    /// points) with a deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Appends a handler to the chain.
    pub fn push_handler(&mut self, handler: Arc<dyn UserAgent>) {
        self.handlers.push(handler);
    }

    // ── Named decision points ────────────────────────────────────

    /// Asks whether to switch sync modes. Defaults to yes.
    pub async fn accept_sync_mode_switch(&self, event: &DecisionEvent) -> SyncResult<bool> {
        for handler in &self.handlers {
            if let Some(answer) = handler.accept_sync_mode_switch(event).await {
                return Ok(answer);
            }
        }
        self.accept_generic(DECISION_SYNC_MODE_SWITCH, event).await
    }

    /// Asks whether to swap stored device info. Defaults to yes.
    pub async fn accept_dev_info_swap(&self, event: &DecisionEvent) -> SyncResult<bool> {
        for handler in &self.handlers {
            if let Some(answer) = handler.accept_dev_info_swap(event).await {
                return Ok(answer);
            }
        }
        self.accept_generic(DECISION_DEV_INFO_SWAP, event).await
    }

    /// Asks for the refresh direction. Defaults to the flagged option.
    pub async fn choose_refresh_required(
        &self,
        event: &DecisionEvent,
        options: &[Choice],
    ) -> SyncResult<Choice> {
        self.timed(DECISION_REFRESH_REQUIRED, async {
            for handler in &self.handlers {
                if let Some(choice) = handler.choose_refresh_required(event, options).await {
                    return Ok(choice);
                }
            }
            self.choose_generic(DECISION_REFRESH_REQUIRED, event, options)
                .await
        })
        .await
    }

    /// Asks for credentials. Defaults to no credentials supplied.
    pub async fn fetch_credentials(&self, event: &DecisionEvent) -> SyncResult<Credentials> {
        self.timed(DECISION_AUTH_CHALLENGE, async {
            for handler in &self.handlers {
                if let Some(credentials) = handler.fetch_credentials(event).await {
                    return Ok(credentials);
                }
            }
            match self.fetch_generic(DECISION_AUTH_CHALLENGE, event).await? {
                FetchValue::Credentials(credentials) => Ok(credentials),
                FetchValue::Raw(other) => Err(SyncError::Internal(format!(
                    "auth challenge answered with a non-credential value: {other}"
                ))),
            }
        })
        .await
    }

    // ── Generic decision points ──────────────────────────────────

    /// Resolves an arbitrary `accept` decision.
    pub async fn accept(&self, decision: &str, event: &DecisionEvent) -> SyncResult<bool> {
        self.accept_generic(decision, event).await
    }

    /// Resolves an arbitrary `choose` decision.
    pub async fn choose(
        &self,
        decision: &str,
        event: &DecisionEvent,
        options: &[Choice],
    ) -> SyncResult<Choice> {
        self.timed(decision, self.choose_generic(decision, event, options))
            .await
    }

    /// Resolves an arbitrary `fetch` decision.
    pub async fn fetch(&self, decision: &str, event: &DecisionEvent) -> SyncResult<FetchValue> {
        self.timed(decision, self.fetch_generic(decision, event))
            .await
    }

    // ── Resolution layers ────────────────────────────────────────

    async fn accept_generic(&self, decision: &str, event: &DecisionEvent) -> SyncResult<bool> {
        for handler in &self.handlers {
            if let Some(answer) = handler.accept(decision, event).await {
                return Ok(answer);
            }
        }
        for handler in &self.handlers {
            match handler.handle(Action::Accept, decision, event, &[]).await {
                Some(Answer::Accepted(answer)) => return Ok(answer),
                Some(other) => {
                    warn!(decision, ?other, "catch-all returned a non-accept answer; skipping");
                }
                None => {}
            }
        }
        debug!(decision, "no handler answered; accepting by default");
        Ok(true)
    }

    async fn choose_generic(
        &self,
        decision: &str,
        event: &DecisionEvent,
        options: &[Choice],
    ) -> SyncResult<Choice> {
        for handler in &self.handlers {
            if let Some(choice) = handler.choose(decision, event, options).await {
                return Ok(choice);
            }
        }
        for handler in &self.handlers {
            match handler.handle(Action::Choose, decision, event, options).await {
                Some(Answer::Chose(choice)) => return Ok(choice),
                Some(other) => {
                    warn!(decision, ?other, "catch-all returned a non-choice answer; skipping");
                }
                None => {}
            }
        }
        let fallback = options
            .iter()
            .find(|c| c.default)
            .or_else(|| options.first())
            .cloned()
            .ok_or_else(|| {
                SyncError::Logical(format!("choose decision '{decision}' offered no options"))
            })?;
        debug!(decision, choice = %fallback.value, "no handler answered; using default option");
        Ok(fallback)
    }

    async fn fetch_generic(&self, decision: &str, event: &DecisionEvent) -> SyncResult<FetchValue> {
        for handler in &self.handlers {
            if let Some(value) = handler.fetch(decision, event).await {
                return Ok(value);
            }
        }
        for handler in &self.handlers {
            match handler.handle(Action::Fetch, decision, event, &[]).await {
                Some(Answer::Fetched(value)) => return Ok(value),
                Some(other) => {
                    warn!(decision, ?other, "catch-all returned a non-fetch answer; skipping");
                }
                None => {}
            }
        }
        if decision == DECISION_AUTH_CHALLENGE {
            debug!(decision, "no handler answered; supplying empty credentials");
            return Ok(FetchValue::Credentials(Credentials::none()));
        }
        Err(SyncError::NotImplemented(format!(
            "no handler for fetch decision '{decision}'"
        )))
    }

    async fn timed<T>(
        &self,
        decision: &str,
        fut: impl std::future::Future<Output = SyncResult<T>>,
    ) -> SyncResult<T> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| SyncError::Timeout(decision.to_string()))?,
            None => fut.await,
        }
    }
}
