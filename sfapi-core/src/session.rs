//! # Connection Session
//!
//! [`with_session`] scopes an authenticated session to one unit of work:
//!
//! 1. `login` once; on failure stop right there.
//! 2. Run the unit of work against the authenticated connection.
//! 3. `logout`, whatever the unit of work returned.
//!
//! A failed logout is logged and otherwise ignored, so it can never replace
//! the outcome of the unit of work.
use crate::crm::{CrmConnection, CrmError};
use futures_util::future::BoxFuture;
use std::fmt;

/// Credentials used to open a session.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError<E> {
    #[error("Authentication failed: '{0}'")]
    Authentication(#[source] CrmError),
    #[error(transparent)]
    Work(E),
}

/// Authenticates `conn`, runs `work` against it and releases the session.
///
/// The connection is consumed: it is never left authenticated once this
/// function returns.
pub async fn with_session<C, T, E, F>(
    credentials: &Credentials,
    conn: C,
    work: F,
) -> Result<T, SessionError<E>>
where
    C: CrmConnection,
    F: for<'c> FnOnce(&'c C) -> BoxFuture<'c, Result<T, E>>,
{
    conn.login(credentials)
        .await
        .map_err(SessionError::Authentication)?;

    tracing::debug!(username = %credentials.username, "session authenticated");

    let outcome = work(&conn).await;

    if let Err(err) = conn.logout().await {
        tracing::warn!(error = %err, "failed to release CRM session");
    } else {
        tracing::debug!("session released");
    }

    outcome.map_err(SessionError::Work)
}
