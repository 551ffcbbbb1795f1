use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Message, SmtpTransport, Transport};
use std::time::Duration;
use tracing::debug;

use crate::account::MailAccount;
use crate::config::TimeoutConfig;
use crate::error::MailError;
use crate::mail::{is_localhost, Submitter};

/// Port on which the server expects TLS from the first byte.
const IMPLICIT_TLS_PORT: u16 = 465;

pub struct SmtpSubmitter {
    timeout: Duration,
}

impl SmtpSubmitter {
    pub fn new(t: &TimeoutConfig) -> Self {
        Self { timeout: t.send() }
    }
}

pub fn compose(account: &MailAccount, to: &str, subject: &str, body: &str) -> Result<Message, MailError> {
    let from: Mailbox = account
        .username
        .parse()
        .map_err(|e| MailError::Send(format!("sender {:?}: {e}", account.username)))?;
    let to: Mailbox = to
        .parse()
        .map_err(|e| MailError::Send(format!("recipient {to:?}: {e}")))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(send_err)
}

impl Submitter for SmtpSubmitter {
    fn send(&self, account: &MailAccount, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let email = compose(account, to, subject, body)?;

        let host = account.smtp_server.clone();
        let creds = Credentials::new(account.username.clone(), account.password.clone());

        let mut tlsb = TlsParameters::builder(host.clone());
        if is_localhost(&host) {
            tlsb = tlsb
                .dangerous_accept_invalid_certs(true)
                .dangerous_accept_invalid_hostnames(true);
        }
        let tls = tlsb.build().map_err(send_err)?;
        let tls = if account.smtp_port == IMPLICIT_TLS_PORT {
            Tls::Wrapper(tls)
        } else {
            Tls::Opportunistic(tls)
        };

        let mailer = SmtpTransport::builder_dangerous(&host)
            .port(account.smtp_port)
            .credentials(creds)
            .tls(tls)
            .timeout(Some(self.timeout))
            .build();

        debug!(host = %host, port = account.smtp_port, "submitting message");
        mailer.send(&email).map_err(send_err)?;
        Ok(())
    }
}

fn send_err(e: impl std::fmt::Display) -> MailError {
    MailError::Send(e.to_string())
}
