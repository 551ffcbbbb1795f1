//! Reading the newest slice of the inbox and turning it into summaries.

use chrono::DateTime;
use tracing::debug;

use crate::account::MailAccount;
use crate::error::MailError;
use crate::mail::{MessageSummary, RawMessage, RetrievalSession, Retriever, INBOX, WINDOW};

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const EXCERPT_CHARS: usize = 200;

/// Logs the session out however the fetch ends, unwinding included.
struct LogoutGuard(Box<dyn RetrievalSession>);

impl Drop for LogoutGuard {
    fn drop(&mut self) {
        self.0.logout();
    }
}

/// Sequence numbers of the newest `limit` messages in a folder of `exists`.
///
/// `None` for an empty folder.
pub fn fetch_window(exists: u32, limit: u32) -> Option<(u32, u32)> {
    if exists == 0 || limit == 0 {
        return None;
    }
    let first = exists.saturating_sub(limit - 1).max(1);
    Some((first, exists))
}

/// Fetches the newest [`WINDOW`] inbox messages of `account`.
///
/// The result keeps the server's delivery order. A failure anywhere discards
/// whatever was already delivered.
pub fn fetch_summaries(retriever: &dyn Retriever, account: &MailAccount) -> Result<Vec<MessageSummary>, MailError> {
    let mut session = LogoutGuard(retriever.open(account)?);

    let exists = session.0.examine(INBOX)?;
    let Some((first, last)) = fetch_window(exists, WINDOW) else {
        debug!(user = %account.username, "inbox is empty");
        return Ok(vec![]);
    };

    debug!(user = %account.username, exists, first, last, "fetching inbox window");
    let raw = session.0.fetch_range(first, last)?;

    Ok(raw.iter().map(summarize).collect())
}

pub fn summarize(raw: &RawMessage) -> MessageSummary {
    MessageSummary {
        seq: raw.seq,
        subject: raw.subject.as_deref().map(decode_words).unwrap_or_default(),
        from: raw.sender_name.as_deref().map(decode_words).unwrap_or_default(),
        date: raw.date.as_deref().map(format_date).unwrap_or_default(),
        excerpt: raw.body.as_deref().and_then(excerpt),
    }
}

/// Decodes RFC 2047 words by running the value through the header parser.
fn decode_words(raw: &[u8]) -> String {
    let mut line = b"X: ".to_vec();
    line.extend_from_slice(raw);
    match mailparse::parse_header(&line) {
        Ok((h, _)) => h.get_value().trim().to_string(),
        Err(_) => String::from_utf8_lossy(raw).trim().to_string(),
    }
}

/// Envelope date as `YYYY-MM-DD HH:MM:SS` in the sender's own offset.
pub fn format_date(raw: &[u8]) -> String {
    let s = String::from_utf8_lossy(raw);
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return dt.format(DATE_FORMAT).to_string();
    }

    // mailparse tolerates comments and sloppy spacing but only gives us UTC,
    // and it answers 0 for input it found nothing in
    mailparse::dateparse(s)
        .ok()
        .filter(|&ts| ts != 0)
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

fn excerpt(raw: &[u8]) -> Option<String> {
    let parsed = mailparse::parse_mail(raw).ok()?;

    let text = match first_part(&parsed, "text/plain") {
        Some(t) => t,
        None => {
            let html = first_part(&parsed, "text/html")?;
            html2text::from_read(html.as_bytes(), 100).ok()?
        }
    };

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    Some(truncate(collapsed, EXCERPT_CHARS))
}

fn first_part(m: &mailparse::ParsedMail, mimetype: &str) -> Option<String> {
    if m.subparts.is_empty() {
        if m.ctype.mimetype.eq_ignore_ascii_case(mimetype) {
            return m.get_body().ok();
        }
        return None;
    }
    m.subparts.iter().find_map(|sp| first_part(sp, mimetype))
}

fn truncate(s: String, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((i, _)) => format!("{}…", s[..i].trim_end()),
        None => s,
    }
}
