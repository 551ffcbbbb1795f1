use serde::{Deserialize, Serialize};

use crate::error::MailError;

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct MailAccount {
    pub username: String,
    pub password: String,
    pub imap_server: String,
    pub imap_port: u16,
    pub smtp_server: String,
    pub smtp_port: u16,
}

/// Insertion-ordered accounts plus the index of the current one.
///
/// `current` is an index rather than a reference so the list can grow
/// without invalidating the selection. It is always `< accounts.len()`.
#[derive(Clone, Debug, Default)]
pub struct AccountStore {
    accounts: Vec<MailAccount>,
    current: Option<usize>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a persisted list, selecting the first account if any.
    pub fn from_accounts(accounts: Vec<MailAccount>) -> Self {
        let current = if accounts.is_empty() { None } else { Some(0) };
        Self { accounts, current }
    }

    /// Appends an account. When nothing is selected yet the first account
    /// becomes current; an existing selection is never moved.
    pub fn add(&mut self, account: MailAccount) {
        self.accounts.push(account);
        if self.current.is_none() {
            self.current = Some(0);
        }
    }

    pub fn select(&mut self, index: usize) -> Result<(), MailError> {
        if index >= self.accounts.len() {
            return Err(MailError::IndexOutOfRange {
                index,
                len: self.accounts.len(),
            });
        }
        self.current = Some(index);
        Ok(())
    }

    pub fn current(&self) -> Option<&MailAccount> {
        self.current.and_then(|i| self.accounts.get(i))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn accounts(&self) -> &[MailAccount] {
        &self.accounts
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn sample(user: &str) -> MailAccount {
    let domain = user.split('@').nth(1).unwrap_or("example.com");
    MailAccount {
        username: user.to_string(),
        password: "p".to_string(),
        imap_server: format!("imap.{domain}"),
        imap_port: 993,
        smtp_server: format!("smtp.{domain}"),
        smtp_port: 587,
    }
}
