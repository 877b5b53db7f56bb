//! Chat network transport contract
//!
//! The wire protocol lives outside this crate. The engine only sees typed
//! outcomes: whatever client implementation is plugged in must map its
//! protocol errors onto these variants.

use async_trait::async_trait;
use gramline_storage::models::Account;

/// Credentials for one messaging account session
#[derive(Debug, Clone)]
pub struct AccountCredentials {
    pub phone_number: String,
    pub session_name: String,
    pub api_id: i32,
    pub api_hash: String,
}

impl From<&Account> for AccountCredentials {
    fn from(account: &Account) -> Self {
        Self {
            phone_number: account.phone_number.clone(),
            session_name: account.session_name.clone(),
            api_id: account.api_id,
            api_hash: account.api_hash.clone(),
        }
    }
}

/// Outcome of a connect attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected,
    /// Session is missing or revoked; sending is impossible until relogin
    AuthenticationRequired,
    /// Transport-reported backoff, in seconds
    RateControlled(u64),
}

/// Outcome of a send attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Ok,
    /// Transport-reported backoff, in seconds
    RateControlled(u64),
    /// Posting to this target is forbidden for this account
    WriteForbidden,
    /// Protocol-layer fault
    ProtocolError(String),
    /// Anything else
    Unknown(String),
}

impl SendOutcome {
    /// Error code recorded in the message log, None for success
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            SendOutcome::Ok => None,
            SendOutcome::RateControlled(_) => Some("FLOOD_WAIT"),
            SendOutcome::WriteForbidden => Some("WRITE_FORBIDDEN"),
            SendOutcome::ProtocolError(_) => Some("PROTOCOL_ERROR"),
            SendOutcome::Unknown(_) => Some("UNKNOWN_ERROR"),
        }
    }
}

/// One session against the chat network.
///
/// One instance = one account. Constructed fresh for each loop iteration and
/// torn down within it; never shared across tasks.
#[async_trait]
pub trait ChatClient: Send {
    /// Establish (or resume) the session
    async fn connect(&mut self, credentials: &AccountCredentials) -> ConnectOutcome;

    /// Send a message to a group/channel/user identifier
    async fn send(&mut self, target: &str, text: &str) -> SendOutcome;

    /// Idempotent, always safe to call
    async fn disconnect(&mut self);
}

/// Builds a fresh client per iteration
pub trait ClientFactory: Send + Sync {
    fn client(&self) -> Box<dyn ChatClient>;
}

/// Transport stand-in that logs sends without performing them.
///
/// Used when no real network client is wired up (development, staging
/// without credentials). Every send reports success.
pub struct DryRunClientFactory;

struct DryRunClient {
    session_name: Option<String>,
}

impl ClientFactory for DryRunClientFactory {
    fn client(&self) -> Box<dyn ChatClient> {
        Box::new(DryRunClient { session_name: None })
    }
}

#[async_trait]
impl ChatClient for DryRunClient {
    async fn connect(&mut self, credentials: &AccountCredentials) -> ConnectOutcome {
        self.session_name = Some(credentials.session_name.clone());
        ConnectOutcome::Connected
    }

    async fn send(&mut self, target: &str, text: &str) -> SendOutcome {
        tracing::info!(
            session = self.session_name.as_deref().unwrap_or("-"),
            target,
            bytes = text.len(),
            "Dry-run send"
        );
        SendOutcome::Ok
    }

    async fn disconnect(&mut self) {
        self.session_name = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_cover_every_failure() {
        assert_eq!(SendOutcome::Ok.error_code(), None);
        assert_eq!(
            SendOutcome::RateControlled(30).error_code(),
            Some("FLOOD_WAIT")
        );
        assert_eq!(
            SendOutcome::WriteForbidden.error_code(),
            Some("WRITE_FORBIDDEN")
        );
        assert_eq!(
            SendOutcome::ProtocolError("boom".into()).error_code(),
            Some("PROTOCOL_ERROR")
        );
        assert_eq!(
            SendOutcome::Unknown("?".into()).error_code(),
            Some("UNKNOWN_ERROR")
        );
    }

    #[tokio::test]
    async fn dry_run_client_reports_success() {
        let factory = DryRunClientFactory;
        let mut client = factory.client();

        let credentials = AccountCredentials {
            phone_number: "+15550000001".to_string(),
            session_name: "acct_1".to_string(),
            api_id: 12345,
            api_hash: "hash".to_string(),
        };

        assert_eq!(
            client.connect(&credentials).await,
            ConnectOutcome::Connected
        );
        assert_eq!(client.send("@market", "hello").await, SendOutcome::Ok);
        client.disconnect().await;
        // Idempotent
        client.disconnect().await;
    }
}
