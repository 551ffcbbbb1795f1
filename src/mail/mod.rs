pub mod fetch;
pub mod imap;
pub mod smtp;

use crate::account::MailAccount;
use crate::error::MailError;

pub const INBOX: &str = "INBOX";

pub const WINDOW: u32 = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageSummary {
    pub seq: u32,
    pub subject: String,
    pub from: String,
    /// `YYYY-MM-DD HH:MM:SS`, or empty when the server sent no usable date.
    pub date: String,
    pub excerpt: Option<String>,
}

/// Envelope fields and body of a message as the server delivered them.
#[derive(Clone, Debug, Default)]
pub struct RawMessage {
    pub seq: u32,
    pub subject: Option<Vec<u8>>,
    /// Display name of the first `From` address.
    pub sender_name: Option<Vec<u8>>,
    pub date: Option<Vec<u8>>,
    pub body: Option<Vec<u8>>,
}

pub trait Retriever: Send + Sync {
    /// Connects and logs in. Fails with `Connection` or `Auth`.
    fn open(&self, account: &MailAccount) -> Result<Box<dyn RetrievalSession>, MailError>;
}

pub trait RetrievalSession {
    fn examine(&mut self, mailbox: &str) -> Result<u32, MailError>;

    /// Fetches sequence numbers `first..=last` in the order the server sends them.
    fn fetch_range(&mut self, first: u32, last: u32) -> Result<Vec<RawMessage>, MailError>;

    fn logout(&mut self);
}

pub trait Submitter: Send + Sync {
    fn send(&self, account: &MailAccount, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

fn is_localhost(host: &str) -> bool {
    host == "127.0.0.1" || host == "localhost"
}
