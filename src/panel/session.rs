//! Client half of the session guard.
//!
//! Every navigation into a protected view re-asks the identity gateway for
//! the current user. The answer is deliberately never cached across
//! navigations, so a sign-out elsewhere is noticed on the next navigation
//! instead of showing stale protected content.

use super::gateway::{GatewayError, IdentityGateway};
use super::{PanelUser, Route};

/// Outcome of guarding one navigation.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardOutcome {
    /// Render the protected view with this identity threaded into it.
    Allow(PanelUser),
    /// No session: go to the login view and render nothing protected.
    Redirect(Route),
}

pub struct SessionGuard<'a> {
    identity: &'a dyn IdentityGateway,
}

impl<'a> SessionGuard<'a> {
    pub fn new(identity: &'a dyn IdentityGateway) -> Self {
        Self { identity }
    }

    pub async fn check(&self) -> Result<GuardOutcome, GatewayError> {
        match self.identity.current_user().await? {
            Some(user) => Ok(GuardOutcome::Allow(user)),
            None => Ok(GuardOutcome::Redirect(Route::Login)),
        }
    }
}
