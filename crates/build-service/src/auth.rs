//! Caller credential check

use secrecy::ExposeSecret;

use crate::config::Config;

/// Check a caller's email and secret against the configured pair.
///
/// An empty configured value never matches.
pub fn verify_secret(config: &Config, email: &str, secret: &str) -> bool {
    let expected_secret = config.student_secret.expose_secret();
    if config.student_email.is_empty() || expected_secret.is_empty() {
        return false;
    }

    secret == expected_secret && email == config.student_email
}
