/// Session tracking: who is signed in, and how we got there
use async_trait::async_trait;
use serde::Serialize;

use crate::bookmark::Session;
use crate::error::RequestError;
use crate::subscription::SubscriptionGuard;

/// Where the session currently stands
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Startup lookup of a persisted session has not resolved yet
    #[default]
    Restoring,
    SignedOut,
    /// Redirecting to the identity provider
    SigningIn,
    SignedIn(Session),
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::SignedIn(session) => Some(session),
            _ => None,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.session().map(Session::user_id)
    }
}

/// Inputs that move the session state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The startup lookup resolved (with or without a session)
    Restored(Option<Session>),
    RestoreFailed,
    SignInStarted,
    SignInFailed,
    /// The provider's auth-change notification fired
    AuthChanged(Option<Session>),
    SignedOut,
}

/// Identifies one startup lookup, so late or superseded results can be dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupToken(u64);

/// Owner id before and after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityChange {
    pub before: Option<String>,
    pub after: Option<String>,
}

impl IdentityChange {
    pub fn is_switch(&self) -> bool {
        self.before != self.after
    }
}

/// The session state machine plus the epoch used to order lookups.
///
/// Every sign-in/out or auth-change bumps the epoch; a lookup result is only
/// applied if it was issued in the current epoch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionManager {
    state: SessionState,
    epoch: u64,
}

impl SessionManager {
    pub fn new() -> SessionManager {
        SessionManager::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn user_id(&self) -> Option<&str> {
        self.state.user_id()
    }

    pub fn lookup_token(&self) -> LookupToken {
        LookupToken(self.epoch)
    }

    pub fn is_current(&self, token: LookupToken) -> bool {
        token.0 == self.epoch
    }

    pub fn apply(&mut self, event: SessionEvent) -> IdentityChange {
        let before = self.user_id().map(str::to_string);

        let next = match (&self.state, event) {
            (_, SessionEvent::Restored(Some(session))) => SessionState::SignedIn(session),
            (SessionState::Restoring, SessionEvent::Restored(None) | SessionEvent::RestoreFailed) => {
                SessionState::SignedOut
            }
            (_, SessionEvent::Restored(None) | SessionEvent::RestoreFailed) => self.state.clone(),

            (SessionState::SignedOut, SessionEvent::SignInStarted) => SessionState::SigningIn,
            (_, SessionEvent::SignInStarted) => self.state.clone(),
            (SessionState::SigningIn, SessionEvent::SignInFailed) => SessionState::SignedOut,
            (_, SessionEvent::SignInFailed) => self.state.clone(),

            (_, SessionEvent::AuthChanged(Some(session))) => {
                self.epoch += 1;
                SessionState::SignedIn(session)
            }
            // A null notification mid-redirect does not cancel the redirect
            (SessionState::SigningIn, SessionEvent::AuthChanged(None)) => {
                self.epoch += 1;
                SessionState::SigningIn
            }
            (_, SessionEvent::AuthChanged(None) | SessionEvent::SignedOut) => {
                self.epoch += 1;
                SessionState::SignedOut
            }
        };

        self.state = next;
        IdentityChange {
            before,
            after: self.user_id().map(str::to_string),
        }
    }
}

/// Arguments for the OAuth redirect
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub provider: String,
    pub redirect_to: String,
}

/// The external identity provider and its session store
#[async_trait(?Send)]
pub trait IdentityProvider {
    /// Look up a session persisted by an earlier visit
    async fn current_session(&self) -> Result<Option<Session>, RequestError>;

    /// Start the redirect flow. Success means the browser is navigating away;
    /// the session arrives later through `watch`.
    async fn sign_in_with_oauth(&self, request: &SignInRequest) -> Result<(), RequestError>;

    async fn sign_out(&self) -> Result<(), RequestError>;

    /// Register for auth-change notifications until the guard is dropped
    fn watch(&self, on_change: Box<dyn Fn(Option<Session>)>) -> SubscriptionGuard;
}
