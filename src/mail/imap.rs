use native_tls::{TlsConnector, TlsStream};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::debug;

use crate::account::MailAccount;
use crate::config::TimeoutConfig;
use crate::error::MailError;
use crate::mail::{is_localhost, RawMessage, RetrievalSession, Retriever};

/// Port on which the server expects a plain greeting followed by STARTTLS.
const STARTTLS_PORT: u16 = 143;

const FETCH_ITEMS: &str = "(ENVELOPE BODY.PEEK[])";

type TlsSession = imap::Session<TlsStream<TcpStream>>;

pub struct ImapRetriever {
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl ImapRetriever {
    pub fn new(t: &TimeoutConfig) -> Self {
        Self { connect_timeout: t.connect(), io_timeout: t.io() }
    }

    fn open_tcp(&self, host: &str, port: u16) -> Result<TcpStream, MailError> {
        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|e| MailError::Connection(format!("{host}:{port}: {e}")))?;

        let mut last = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.io_timeout)).map_err(conn)?;
                    stream.set_write_timeout(Some(self.io_timeout)).map_err(conn)?;
                    return Ok(stream);
                }
                Err(e) => last = Some(e),
            }
        }

        Err(match last {
            Some(e) => MailError::Connection(format!("{host}:{port}: {e}")),
            None => MailError::Connection(format!("{host}:{port}: no addresses")),
        })
    }

    fn connect(&self, account: &MailAccount) -> Result<imap::Client<TlsStream<TcpStream>>, MailError> {
        let host = account.imap_server.as_str();
        let tls = tls_connector_for(host)?;
        let tcp = self.open_tcp(host, account.imap_port)?;

        // STARTTLS / TLS
        if account.imap_port == STARTTLS_PORT {
            let mut client = imap::Client::new(tcp);
            client.read_greeting().map_err(conn)?;
            client.secure(host, &tls).map_err(conn)
        } else {
            let stream = tls.connect(host, tcp).map_err(conn)?;
            let mut client = imap::Client::new(stream);
            client.read_greeting().map_err(conn)?;
            Ok(client)
        }
    }
}

impl Retriever for ImapRetriever {
    fn open(&self, account: &MailAccount) -> Result<Box<dyn RetrievalSession>, MailError> {
        debug!(host = %account.imap_server, port = account.imap_port, "connecting imap");
        let client = self.connect(account)?;

        let session = client
            .login(&account.username, &account.password)
            .map_err(|(e, _)| MailError::Auth(e.to_string()))?;

        Ok(Box::new(ImapSession(session)))
    }
}

struct ImapSession(TlsSession);

impl RetrievalSession for ImapSession {
    fn examine(&mut self, mailbox: &str) -> Result<u32, MailError> {
        let mbox = self
            .0
            .examine(mailbox)
            .map_err(|e| MailError::Folder(format!("{mailbox}: {e}")))?;
        Ok(mbox.exists)
    }

    fn fetch_range(&mut self, first: u32, last: u32) -> Result<Vec<RawMessage>, MailError> {
        let fetches = self
            .0
            .fetch(format!("{first}:{last}"), FETCH_ITEMS)
            .map_err(|e| MailError::FetchProtocol(e.to_string()))?;

        let mut out = Vec::with_capacity(fetches.len());
        for f in fetches.iter() {
            let mut raw = RawMessage {
                seq: f.message,
                body: f.body().map(<[u8]>::to_vec),
                ..Default::default()
            };

            if let Some(env) = f.envelope() {
                raw.subject = env.subject.as_deref().map(<[u8]>::to_vec);
                raw.date = env.date.as_deref().map(<[u8]>::to_vec);
                raw.sender_name = env
                    .from
                    .as_ref()
                    .and_then(|froms| froms.first())
                    .and_then(|a| a.name.as_deref())
                    .map(<[u8]>::to_vec);
            }

            out.push(raw);
        }
        Ok(out)
    }

    fn logout(&mut self) {
        if let Err(e) = self.0.logout() {
            debug!("imap logout: {e}");
        }
    }
}

fn tls_connector_for(host: &str) -> Result<TlsConnector, MailError> {
    let mut b = TlsConnector::builder();

    if is_localhost(host) {
        b.danger_accept_invalid_certs(true);
        b.danger_accept_invalid_hostnames(true);
    }

    b.build().map_err(conn)
}

fn conn(e: impl std::fmt::Display) -> MailError {
    MailError::Connection(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn account_at(host: &str, port: u16) -> MailAccount {
        MailAccount {
            username: "a@x.com".into(),
            password: "p".into(),
            imap_server: host.into(),
            imap_port: port,
            smtp_server: host.into(),
            smtp_port: 587,
        }
    }

    #[test]
    fn test_refused_connection_is_connection_error() {
        // bind then drop so the port is very likely closed
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let r = ImapRetriever::new(&TimeoutConfig::default());
        let err = r.open(&account_at("127.0.0.1", port)).err().unwrap();
        assert!(matches!(err, MailError::Connection(_)), "{err}");
    }

    #[test]
    fn test_unresolvable_host() {
        let r = ImapRetriever::new(&TimeoutConfig::default());
        let err = r.open(&account_at("no-such-host.invalid", 993)).err().unwrap();
        assert!(matches!(err, MailError::Connection(_)));
    }
}
