use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::ResearchError;

/// Query parameter carrying the OTP token on the verify step.
pub const TOKEN_PARAM: &str = "token";

const DEFAULT_LOCATION: &str = "research://app/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Register,
    Verify,
    Signin,
    Dashboard,
}

impl Route {
    pub const ALL: &[Route] = &[
        Route::Register,
        Route::Verify,
        Route::Signin,
        Route::Dashboard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Register => "register",
            Route::Verify => "verify",
            Route::Signin => "signin",
            Route::Dashboard => "dashboard",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Route::Register => "Register",
            Route::Verify => "Verify",
            Route::Signin => "Sign in",
            Route::Dashboard => "Dashboard",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "register" => Some(Route::Register),
            "verify" => Some(Route::Verify),
            "signin" => Some(Route::Signin),
            "dashboard" => Some(Route::Dashboard),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Auxiliary data attached to a navigation target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    pub token: Option<String>,
}

impl RouteParams {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }
}

/// The shareable address of the client. Only the OTP token is ever written
/// into it; every other query parameter is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    url: Url,
}

impl Location {
    pub fn parse(input: &str) -> Result<Self, ResearchError> {
        let url = Url::parse(input).map_err(|e| ResearchError::InvalidUrl(format!("{input}: {e}")))?;
        Ok(Self { url })
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// The non-empty `token` query parameter, if any.
    pub fn token(&self) -> Option<String> {
        token_param(&self.url)
    }

    /// Replace the token parameter in place. There is no history stack, so
    /// this never creates a back-navigation entry.
    pub fn set_token(&mut self, token: &str) {
        self.rewrite_query(Some(token));
    }

    pub fn clear_token(&mut self) {
        self.rewrite_query(None);
    }

    fn rewrite_query(&mut self, token: Option<&str>) {
        let kept: Vec<(String, String)> = self
            .url
            .query_pairs()
            .filter(|(k, _)| k != TOKEN_PARAM)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() && token.is_none() {
            self.url.set_query(None);
            return;
        }

        let mut pairs = self.url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        if let Some(token) = token {
            pairs.append_pair(TOKEN_PARAM, token);
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self {
            url: Url::parse(DEFAULT_LOCATION).expect("default location is a valid url"),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Where the client starts: an emailed verification link lands on `verify`,
/// everything else on the dashboard.
pub fn initial_route(location: &Location) -> (Route, RouteParams) {
    match location.token() {
        Some(token) => (Route::Verify, RouteParams::with_token(token)),
        None => (Route::Dashboard, RouteParams::default()),
    }
}

pub(crate) fn token_param(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == TOKEN_PARAM)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}
