use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use syncml_engine::{
    Action, Answer, Choice, Credentials, DecisionEvent, FetchValue, SyncError, UserAgent,
    UserAgentMultiplexer, DECISION_AUTH_CHALLENGE, DECISION_REFRESH_REQUIRED,
    DECISION_SYNC_MODE_SWITCH,
};

struct Silent;

#[async_trait]
impl UserAgent for Silent {}

/// Refuses every decision through the generic hooks.
struct GenericRefuser;

#[async_trait]
impl UserAgent for GenericRefuser {
    async fn accept(&self, _decision: &str, _event: &DecisionEvent) -> Option<bool> {
        Some(false)
    }

    async fn choose(
        &self,
        _decision: &str,
        _event: &DecisionEvent,
        options: &[Choice],
    ) -> Option<Choice> {
        options.last().cloned()
    }

    async fn fetch(&self, _decision: &str, _event: &DecisionEvent) -> Option<FetchValue> {
        Some(FetchValue::Raw(json!("generic")))
    }
}

/// Answers only the mode-switch decision, through the specific hook.
struct ModeSwitchApprover;

#[async_trait]
impl UserAgent for ModeSwitchApprover {
    async fn accept_sync_mode_switch(&self, _event: &DecisionEvent) -> Option<bool> {
        Some(true)
    }
}

struct CredentialVault;

#[async_trait]
impl UserAgent for CredentialVault {
    async fn fetch_credentials(&self, _event: &DecisionEvent) -> Option<Credentials> {
        Some(Credentials::basic("sync-user", "hunter2"))
    }
}

/// Answers everything through the catch-all, always with an accept.
struct AcceptOnlyCatchAll;

#[async_trait]
impl UserAgent for AcceptOnlyCatchAll {
    async fn handle(
        &self,
        _action: Action,
        _decision: &str,
        _event: &DecisionEvent,
        _options: &[Choice],
    ) -> Option<Answer> {
        Some(Answer::Accepted(false))
    }
}

struct SlowChooser;

#[async_trait]
impl UserAgent for SlowChooser {
    async fn choose(
        &self,
        _decision: &str,
        _event: &DecisionEvent,
        options: &[Choice],
    ) -> Option<Choice> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        options.first().cloned()
    }
}

fn event() -> DecisionEvent {
    DecisionEvent::new("peer proposed slow sync").with_peer("remote-dev")
}

fn refresh_options() -> Vec<Choice> {
    vec![
        Choice::new("client-wins", "Keep local data"),
        Choice::new("server-wins", "Keep remote data").preselected(),
        Choice::new("merge", "Merge both"),
    ]
}

// ── Layered resolution ────────────────────────────────────────────

#[tokio::test]
async fn specific_hook_beats_earlier_generic_hook() {
    // GenericRefuser comes first in the chain, but only implements the
    // generic layer; the specific layer is consulted across the whole
    // chain before any generic hook runs.
    let agent = UserAgentMultiplexer::new(vec![
        Arc::new(GenericRefuser),
        Arc::new(ModeSwitchApprover),
    ]);
    assert!(agent.accept_sync_mode_switch(&event()).await.unwrap());
}

#[tokio::test]
async fn generic_hook_beats_builtin_default() {
    let agent = UserAgentMultiplexer::new(vec![Arc::new(Silent), Arc::new(GenericRefuser)]);
    assert!(!agent.accept_sync_mode_switch(&event()).await.unwrap());
    assert!(!agent.accept_dev_info_swap(&event()).await.unwrap());
}

#[tokio::test]
async fn first_handler_in_a_layer_wins() {
    struct Approver;

    #[async_trait]
    impl UserAgent for Approver {
        async fn accept(&self, _decision: &str, _event: &DecisionEvent) -> Option<bool> {
            Some(true)
        }
    }

    let agent = UserAgentMultiplexer::new(vec![Arc::new(Approver), Arc::new(GenericRefuser)]);
    assert!(agent.accept("custom.decision", &event()).await.unwrap());
}

#[tokio::test]
async fn catch_all_answers_when_upper_layers_are_silent() {
    let agent = UserAgentMultiplexer::new(vec![Arc::new(Silent), Arc::new(AcceptOnlyCatchAll)]);
    assert!(!agent.accept(DECISION_SYNC_MODE_SWITCH, &event()).await.unwrap());
}

#[tokio::test]
async fn mismatched_catch_all_answer_is_skipped() {
    // AcceptOnlyCatchAll answers a choose decision with Answer::Accepted,
    // which cannot satisfy it; resolution falls through to the default.
    let agent = UserAgentMultiplexer::new(vec![Arc::new(AcceptOnlyCatchAll)]);
    let options = refresh_options();
    let choice = agent
        .choose_refresh_required(&event(), &options)
        .await
        .unwrap();
    assert_eq!(choice.value, "server-wins");
}

// ── Built-in defaults ─────────────────────────────────────────────

#[tokio::test]
async fn accept_defaults_to_yes() {
    let agent = UserAgentMultiplexer::new(vec![Arc::new(Silent)]);
    assert!(agent.accept_sync_mode_switch(&event()).await.unwrap());
    assert!(agent.accept_dev_info_swap(&event()).await.unwrap());

    let empty = UserAgentMultiplexer::new(Vec::new());
    assert!(empty.accept("custom.decision", &event()).await.unwrap());
}

#[tokio::test]
async fn choose_defaults_to_flagged_option() {
    let agent = UserAgentMultiplexer::new(Vec::new());
    let options = refresh_options();
    let choice = agent
        .choose_refresh_required(&event(), &options)
        .await
        .unwrap();
    assert_eq!(choice.value, "server-wins");
}

#[tokio::test]
async fn choose_defaults_to_first_option_when_none_flagged() {
    let agent = UserAgentMultiplexer::new(Vec::new());
    let options = vec![
        Choice::new("client-wins", "Keep local data"),
        Choice::new("server-wins", "Keep remote data"),
    ];
    let choice = agent.choose("custom.pick", &event(), &options).await.unwrap();
    assert_eq!(choice.value, "client-wins");
}

#[tokio::test]
async fn choose_without_options_is_a_logical_error() {
    let agent = UserAgentMultiplexer::new(Vec::new());
    let err = agent
        .choose(DECISION_REFRESH_REQUIRED, &event(), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Logical(_)));
}

#[tokio::test]
async fn auth_challenge_defaults_to_empty_credentials() {
    let agent = UserAgentMultiplexer::new(vec![Arc::new(Silent)]);
    let credentials = agent.fetch_credentials(&event()).await.unwrap();
    assert!(credentials.is_empty());
}

#[tokio::test]
async fn other_fetch_decisions_have_no_default() {
    let agent = UserAgentMultiplexer::new(Vec::new());
    let err = agent.fetch("device.pin", &event()).await.unwrap_err();
    assert!(matches!(err, SyncError::NotImplemented(_)));
}

#[tokio::test]
async fn fetch_credentials_uses_specific_hook() {
    let agent = UserAgentMultiplexer::new(vec![Arc::new(Silent), Arc::new(CredentialVault)]);
    let credentials = agent.fetch_credentials(&event()).await.unwrap();
    assert_eq!(credentials.username.as_deref(), Some("sync-user"));
    assert_eq!(credentials.password.as_deref(), Some("hunter2"));
}

#[tokio::test]
async fn auth_challenge_via_generic_fetch_must_yield_credentials() {
    // GenericRefuser answers every fetch with a raw value; for the auth
    // challenge that cannot be used as credentials.
    let agent = UserAgentMultiplexer::new(vec![Arc::new(GenericRefuser)]);
    let err = agent.fetch_credentials(&event()).await.unwrap_err();
    assert!(matches!(err, SyncError::Internal(_)));

    // The generic entry point surfaces the raw value untouched.
    let value = agent
        .fetch(DECISION_AUTH_CHALLENGE, &event())
        .await
        .unwrap();
    assert_eq!(value, FetchValue::Raw(json!("generic")));
}

// ── Timeouts ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn slow_choose_hits_the_deadline() {
    let agent = UserAgentMultiplexer::new(vec![Arc::new(SlowChooser)])
        .with_timeout(Duration::from_secs(30));
    let options = refresh_options();
    let err = agent
        .choose("custom.pick", &event(), &options)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Timeout(decision) if decision == "custom.pick"));
}

#[tokio::test(start_paused = true)]
async fn choose_within_the_deadline_succeeds() {
    struct QuickChooser;

    #[async_trait]
    impl UserAgent for QuickChooser {
        async fn choose(
            &self,
            _decision: &str,
            _event: &DecisionEvent,
            options: &[Choice],
        ) -> Option<Choice> {
            tokio::time::sleep(Duration::from_secs(1)).await;
            options.first().cloned()
        }
    }

    let agent = UserAgentMultiplexer::new(vec![Arc::new(QuickChooser)])
        .with_timeout(Duration::from_secs(30));
    let options = refresh_options();
    let choice = agent
        .choose("custom.pick", &event(), &options)
        .await
        .unwrap();
    assert_eq!(choice.value, "client-wins");
}

#[tokio::test]
async fn push_handler_extends_the_chain() {
    let mut agent = UserAgentMultiplexer::new(vec![Arc::new(Silent)]);
    assert!(agent.accept_sync_mode_switch(&event()).await.unwrap());

    agent.push_handler(Arc::new(GenericRefuser));
    assert!(!agent.accept_sync_mode_switch(&event()).await.unwrap());
}
