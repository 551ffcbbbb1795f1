//! Failures surfaced by the account workflow.

use std::time::Duration;

use thiserror::Error;

/// Everything an account, fetch or send operation can fail with.
///
/// None of these are fatal to the process; the front end renders the message
/// and keeps serving.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("account index {index} out of range ({len} accounts)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Fetch or send was attempted with no current account.
    #[error("account not selected")]
    AccountNotSelected,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("mailbox unavailable: {0}")]
    Folder(String),

    /// The bulk FETCH errored; anything already delivered is discarded.
    #[error("fetch failed: {0}")]
    FetchProtocol(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("account storage: {0}")]
    Persistence(String),

    /// A request outlived its configured bound.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

impl MailError {
    pub fn status(&self) -> u16 {
        match self {
            MailError::IndexOutOfRange { .. } => 404,
            MailError::AccountNotSelected => 409,
            MailError::Connection(_)
            | MailError::Auth(_)
            | MailError::Folder(_)
            | MailError::FetchProtocol(_)
            | MailError::Send(_) => 502,
            MailError::Persistence(_) => 500,
            MailError::Timeout(_) => 504,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_detail() {
        let e = MailError::IndexOutOfRange { index: 5, len: 2 };
        assert_eq!(e.to_string(), "account index 5 out of range (2 accounts)");

        let e = MailError::Auth("LOGIN rejected".to_string());
        assert!(e.to_string().contains("LOGIN rejected"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(MailError::AccountNotSelected.status(), 409);
        assert_eq!(MailError::Send("x".into()).status(), 502);
        assert_eq!(MailError::Persistence("x".into()).status(), 500);
        assert_eq!(MailError::Timeout(Duration::from_secs(1)).status(), 504);
    }
}
