//! Module `state`
//!
//! Defines the `Client` struct holding per-connection authentication state.

/// Represents the state of a connected client.
///
/// Owned by the connection's task; nothing else mutates it.
#[derive(Debug, Default)]
pub struct Client {
    username: Option<String>,
    is_user_valid: bool,
    is_logged_in: bool,
}

impl Client {
    /// Clears authentication state.
    pub fn logout(&mut self) {
        self.username = None;
        self.is_user_valid = false;
        self.is_logged_in = false;
    }

    // --------------------
    // Getter methods
    // --------------------

    /// Returns whether the USER command was accepted.
    pub fn is_user_valid(&self) -> bool {
        self.is_user_valid
    }

    /// Returns whether the client has passed authentication.
    pub fn is_logged_in(&self) -> bool {
        self.is_logged_in
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    // --------------------
    // Setter methods
    // --------------------

    /// Records the outcome of USER validation. Always resets login.
    pub fn set_user(&mut self, username: Option<String>) {
        self.is_user_valid = username.is_some();
        self.is_logged_in = false;
        self.username = username;
    }

    pub fn set_logged_in(&mut self, logged_in: bool) {
        self.is_logged_in = logged_in;
    }
}
