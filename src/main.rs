use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod account;
mod config;
mod error;
mod mail;
mod session;
mod storage;
mod web;

use account::AccountStore;
use config::Config;
use mail::imap::ImapRetriever;
use mail::smtp::SmtpSubmitter;
use session::SessionWorkflow;
use storage::AccountFile;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailrelay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (config, created, config_path) = Config::load_or_create()?;
    if created {
        info!("wrote default config to {}", config_path.display());
    }

    let file = AccountFile::new(config.accounts_path(&config_path)?);
    let store = match file.load() {
        Ok(accounts) => {
            info!("loaded {} accounts from {}", accounts.len(), file.path().display());
            AccountStore::from_accounts(accounts)
        }
        Err(e) => {
            warn!("failed to load accounts, starting empty: {e}");
            AccountStore::new()
        }
    };

    let workflow = SessionWorkflow::new(
        store,
        file,
        Box::new(ImapRetriever::new(&config.timeouts)),
        Box::new(SmtpSubmitter::new(&config.timeouts)),
    );

    info!("session state: {:?}", workflow.state());

    let listener = TcpListener::bind(&config.server.listen).await?;
    let state = web::AppState {
        workflow: Arc::new(workflow),
        request_timeout: config.timeouts.request(),
    };

    web::serve(listener, state).await
}
