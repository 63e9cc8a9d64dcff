//! Session state owned by the console. The reorder core only reads it.

use shared::domain::Role;
use tokio::sync::watch;
use tracing::info;

/// `token` is present iff the session is authenticated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    token: Option<String>,
    role: Option<Role>,
}

impl SessionState {
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn role(&self) -> Option<&Role> {
        self.role.as_ref()
    }
}

#[derive(Debug, Clone)]
pub enum SessionAction {
    Login { token: String, role: Option<Role> },
    Logout,
}

pub fn reduce(state: &SessionState, action: SessionAction) -> SessionState {
    match action {
        SessionAction::Login { token, role } if !token.trim().is_empty() => SessionState {
            token: Some(token),
            role,
        },
        SessionAction::Login { .. } => state.clone(),
        SessionAction::Logout => SessionState::signed_out(),
    }
}

/// What the reorder core needs from whoever owns authentication.
pub trait SessionGate: Send + Sync {
    fn is_authenticated(&self) -> bool;
    fn current_token(&self) -> Option<String>;
    fn subscribe(&self) -> watch::Receiver<SessionState>;
}

pub struct SessionStore {
    state: watch::Sender<SessionState>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::signed_out());
        Self { state }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Applies `action` and notifies subscribers. Returns the new state.
    pub fn dispatch(&self, action: SessionAction) -> SessionState {
        let is_logout = matches!(action, SessionAction::Logout);
        let mut next = SessionState::signed_out();
        self.state.send_modify(|state| {
            *state = reduce(state, action);
            next = state.clone();
        });
        if is_logout {
            info!("session signed out");
        }
        next
    }
}

impl SessionGate for SessionStore {
    fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    fn current_token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
