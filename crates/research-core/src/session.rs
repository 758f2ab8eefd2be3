/// Client view of the backend session. The backend owns the real session
/// cookie; this only tracks what the UI should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub authenticated: bool,
    pub checking: bool,
}

impl Session {
    /// State at startup, before the token check has answered.
    pub fn checking() -> Self {
        Self {
            authenticated: false,
            checking: true,
        }
    }

    /// Resolve the startup check. Any failure means unauthenticated.
    pub fn resolve(&mut self, authenticated: bool) {
        self.authenticated = authenticated;
        self.checking = false;
    }

    pub fn sign_in(&mut self) {
        self.authenticated = true;
    }

    pub fn sign_out(&mut self) {
        self.authenticated = false;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::checking()
    }
}
