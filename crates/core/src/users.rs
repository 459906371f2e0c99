//! Credential list administered from the admin panel.
//!
//! Users live in memory for the lifetime of the process. Edits replace the
//! entry at a position wholesale and deletes remove by position, matching how
//! the admin list addresses rows.

use crate::session::{Role, SessionContext};
use crate::{HcduError, HcduResult};
use serde::{Deserialize, Serialize};

/// A credential triple.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub password: String,
    pub role: Role,
}

impl User {
    pub fn new(username: impl Into<String>, password: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            role,
        }
    }

    fn validate(&self) -> HcduResult<()> {
        if self.username.trim().is_empty() {
            return Err(HcduError::InvalidInput("username cannot be empty".into()));
        }
        if self.username.trim() != self.username {
            return Err(HcduError::InvalidInput(
                "username must not start or end with whitespace".into(),
            ));
        }
        if self.password.is_empty() {
            return Err(HcduError::InvalidInput("password cannot be empty".into()));
        }
        Ok(())
    }
}

/// In-memory list of users.
#[derive(Clone, Debug)]
pub struct UserDirectory {
    users: Vec<User>,
}

impl UserDirectory {
    /// The fixed credential set the system starts with.
    pub fn bootstrap() -> Self {
        Self {
            users: vec![
                User::new("admin", "admin123", Role::Admin),
                User::new("auditor", "auditor123", Role::Auditor),
                User::new("prestador", "prestador123", Role::Provider),
                User::new("operador", "operator123", Role::Provider),
            ],
        }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Exact, case-sensitive username and password match.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<&User> {
        self.users
            .iter()
            .find(|u| u.username == username && u.password == password)
    }

    /// Appends a new user.
    ///
    /// # Errors
    ///
    /// Requires an admin session. Fails with [`HcduError::DuplicateUsername`]
    /// if the username is taken and [`HcduError::InvalidInput`] for blank fields.
    pub fn create(&mut self, session: &SessionContext, user: User) -> HcduResult<()> {
        let actor = session.require_admin("create users")?;
        user.validate()?;
        if self.position_of(&user.username).is_some() {
            return Err(HcduError::DuplicateUsername(user.username));
        }

        tracing::info!("{} created user {} ({})", actor.username, user.username, user.role);
        self.users.push(user);
        Ok(())
    }

    /// Replaces the user at `index` wholesale.
    ///
    /// # Errors
    ///
    /// Requires an admin session. Fails with [`HcduError::UserNotFound`] for an
    /// out-of-range index and [`HcduError::DuplicateUsername`] when the new
    /// username belongs to a different entry.
    pub fn replace(
        &mut self,
        session: &SessionContext,
        index: usize,
        user: User,
    ) -> HcduResult<()> {
        let actor = session.require_admin("edit users")?;
        user.validate()?;
        if index >= self.users.len() {
            return Err(HcduError::UserNotFound(index));
        }
        if matches!(self.position_of(&user.username), Some(other) if other != index) {
            return Err(HcduError::DuplicateUsername(user.username));
        }

        tracing::info!("{} replaced user at {} with {}", actor.username, index, user.username);
        self.users[index] = user;
        Ok(())
    }

    /// Removes and returns the user at `index`.
    ///
    /// # Errors
    ///
    /// Requires an admin session. Fails with [`HcduError::UserNotFound`] for an
    /// out-of-range index.
    pub fn remove(&mut self, session: &SessionContext, index: usize) -> HcduResult<User> {
        let actor = session.require_admin("delete users")?;
        if index >= self.users.len() {
            return Err(HcduError::UserNotFound(index));
        }

        let removed = self.users.remove(index);
        tracing::info!("{} deleted user {}", actor.username, removed.username);
        Ok(removed)
    }

    fn position_of(&self, username: &str) -> Option<usize> {
        self.users.iter().position(|u| u.username == username)
    }
}

impl Default for UserDirectory {
    fn default() -> Self {
        Self::bootstrap()
    }
}
