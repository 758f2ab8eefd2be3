use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::route::token_param;

/// Markers that count as a successful OTP verification.
pub const VERIFY_SUCCESS_MARKERS: &[&str] = &["success"];

/// Markers that count as a successful sign-in.
pub const SIGNIN_SUCCESS_MARKERS: &[&str] = &["sign-in", "success"];

const REDIRECT_BASE: &str = "http://localhost/";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignIn {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyOtp {
    pub otp: String,
}

/// Result of the debounced email uniqueness check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmailAvailability {
    #[default]
    Unknown,
    Available,
    Taken,
}

impl EmailAvailability {
    pub fn display_name(&self) -> &'static str {
        match self {
            EmailAvailability::Unknown => "",
            EmailAvailability::Available => "available",
            EmailAvailability::Taken => "taken",
        }
    }
}

impl fmt::Display for EmailAvailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Pull the OTP token out of a registration `redirectUrl`. Relative URLs are
/// resolved against a placeholder base since only the query matters.
pub fn token_from_redirect(redirect_url: &str) -> Option<String> {
    let url = Url::parse(redirect_url).or_else(|_| {
        Url::parse(REDIRECT_BASE).and_then(|base| base.join(redirect_url))
    });
    url.ok().as_ref().and_then(token_param)
}

/// Compatibility shim: the backend reports success only through a
/// human-readable message, so success is a case-insensitive substring match.
/// Replace with a status field if the backend ever provides one.
pub fn message_indicates_success(message: Option<&str>, markers: &[&str]) -> bool {
    let Some(message) = message else {
        return false;
    };
    let lower = message.to_lowercase();
    markers.iter().any(|m| lower.contains(m))
}
