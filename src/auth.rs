//! Basic-auth credentials for the Twilio API
//!
//! Twilio authenticates every request with HTTP Basic auth: the account SID
//! as the username and the auth token as the password. The credentials are an
//! opaque handle - the engine passes the same handle to parent streams when
//! resolving nested chains.

use serde::Deserialize;

/// Account SID + auth token pair applied to outgoing requests
#[derive(Clone, Deserialize)]
pub struct Credentials {
    account_sid: String,
    auth_token: String,
}

impl Credentials {
    /// Create credentials from an account SID and auth token
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
        }
    }

    /// The account SID (username half of the pair)
    pub fn account_sid(&self) -> &str {
        &self.account_sid
    }

    /// Attach the credentials to a request as HTTP Basic auth
    pub fn apply(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.basic_auth(&self.account_sid, Some(&self.auth_token))
    }
}

// The auth token never appears in logs or debug output
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"***")
            .finish()
    }
}
