//! Account selection plus fetch and send against the current account.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{error, info, warn};

use crate::account::{AccountStore, MailAccount};
use crate::error::MailError;
use crate::mail::fetch::fetch_summaries;
use crate::mail::{MessageSummary, Retriever, Submitter};
use crate::storage::AccountFile;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    NoAccount,
    AccountSelected,
}

/// Process-wide account state shared by every request.
///
/// The store sits behind one lock; network I/O runs on a copy of the current
/// account so a slow server never blocks `select`.
pub struct SessionWorkflow {
    store: Mutex<AccountStore>,
    file: AccountFile,
    retriever: Box<dyn Retriever>,
    submitter: Box<dyn Submitter>,
}

impl SessionWorkflow {
    pub fn new(
        store: AccountStore,
        file: AccountFile,
        retriever: Box<dyn Retriever>,
        submitter: Box<dyn Submitter>,
    ) -> Self {
        Self {
            store: Mutex::new(store),
            file,
            retriever,
            submitter,
        }
    }

    fn lock(&self) -> MutexGuard<'_, AccountStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> SessionState {
        if self.lock().current().is_some() {
            SessionState::AccountSelected
        } else {
            SessionState::NoAccount
        }
    }

    /// Appends and persists an account.
    ///
    /// If the file can't be written the store goes back to how it was, so
    /// memory and disk never disagree.
    pub fn add(&self, account: MailAccount) -> Result<(), MailError> {
        let mut store = self.lock();
        let before = store.clone();
        let username = account.username.clone();

        store.add(account);
        if let Err(e) = self.file.save(store.accounts()) {
            *store = before;
            error!(user = %username, "account not saved, add rolled back: {e}");
            return Err(e);
        }

        info!(user = %username, total = store.len(), "account added");
        Ok(())
    }

    pub fn select(&self, index: usize) -> Result<(), MailError> {
        let mut store = self.lock();
        match store.select(index) {
            Ok(()) => {
                if let Some(a) = store.current() {
                    info!(index, user = %a.username, "account selected");
                }
                Ok(())
            }
            Err(e) => {
                warn!(index, "select failed: {e}");
                Err(e)
            }
        }
    }

    pub fn current(&self) -> Option<MailAccount> {
        self.lock().current().cloned()
    }

    pub fn snapshot(&self) -> AccountStore {
        self.lock().clone()
    }

    /// Newest inbox messages of the current account. Blocks on network I/O.
    pub fn fetch(&self) -> Result<Vec<MessageSummary>, MailError> {
        let account = self.current().ok_or(MailError::AccountNotSelected)?;

        match fetch_summaries(self.retriever.as_ref(), &account) {
            Ok(list) => {
                info!(user = %account.username, count = list.len(), "fetched inbox");
                Ok(list)
            }
            Err(e) => {
                warn!(user = %account.username, "fetch failed: {e}");
                Err(e)
            }
        }
    }

    pub fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let account = self.current().ok_or(MailError::AccountNotSelected)?;

        match self.submitter.send(&account, to, subject, body) {
            Ok(()) => {
                info!(user = %account.username, to, "message sent");
                Ok(())
            }
            Err(e) => {
                warn!(user = %account.username, to, "send failed: {e}");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::sample;
    use crate::mail::testing::{CallLog, FakeRetriever, FakeSubmitter};
    use std::fs;
    use tempfile::{tempdir, TempDir};

    struct Harness {
        wf: SessionWorkflow,
        fetch_log: CallLog,
        send_log: CallLog,
        _dir: TempDir,
    }

    fn harness(exists: u32) -> Harness {
        let dir = tempdir().unwrap();
        let file = AccountFile::new(dir.path().join("accounts.json"));
        let retriever = FakeRetriever::with_messages(exists);
        let submitter = FakeSubmitter::default();
        let fetch_log = retriever.log.clone();
        let send_log = submitter.log.clone();
        Harness {
            wf: SessionWorkflow::new(AccountStore::new(), file, Box::new(retriever), Box::new(submitter)),
            fetch_log,
            send_log,
            _dir: dir,
        }
    }

    #[test]
    fn test_scenario_add_and_select() {
        let h = harness(0);
        assert_eq!(h.wf.state(), SessionState::NoAccount);

        h.wf.add(sample("a@x.com")).unwrap();
        assert_eq!(h.wf.state(), SessionState::AccountSelected);
        assert_eq!(h.wf.current(), Some(sample("a@x.com")));

        h.wf.add(sample("b@y.com")).unwrap();
        assert_eq!(h.wf.snapshot().len(), 2);
        assert_eq!(h.wf.current(), Some(sample("a@x.com")));

        h.wf.select(1).unwrap();
        assert_eq!(h.wf.current(), Some(sample("b@y.com")));

        assert!(matches!(h.wf.select(5), Err(MailError::IndexOutOfRange { .. })));
        assert_eq!(h.wf.current(), Some(sample("b@y.com")));
    }

    #[test]
    fn test_add_persists_each_time() {
        let h = harness(0);
        h.wf.add(sample("a@x.com")).unwrap();
        h.wf.add(sample("b@y.com")).unwrap();

        let back = h.wf.file.load().unwrap();
        assert_eq!(back, vec![sample("a@x.com"), sample("b@y.com")]);
    }

    #[test]
    fn test_failed_persist_rolls_back() {
        let dir = tempdir().unwrap();
        // a directory where the file should be makes the rename fail
        let path = dir.path().join("accounts.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        let wf = SessionWorkflow::new(
            AccountStore::new(),
            AccountFile::new(&path),
            Box::new(FakeRetriever::with_messages(0)),
            Box::new(FakeSubmitter::default()),
        );

        let err = wf.add(sample("a@x.com")).unwrap_err();
        assert!(matches!(err, MailError::Persistence(_)));
        assert!(wf.snapshot().is_empty());
        assert_eq!(wf.state(), SessionState::NoAccount);
    }

    #[test]
    fn test_fetch_without_account_does_no_io() {
        let h = harness(5);
        assert!(matches!(h.wf.fetch(), Err(MailError::AccountNotSelected)));
        assert!(h.fetch_log.entries().is_empty());
    }

    #[test]
    fn test_send_without_account_does_no_io() {
        let h = harness(0);
        assert!(matches!(h.wf.send("b@y.com", "s", "b"), Err(MailError::AccountNotSelected)));
        assert!(h.send_log.entries().is_empty());
    }

    #[test]
    fn test_fetch_uses_current_account() {
        let h = harness(25);
        h.wf.add(sample("a@x.com")).unwrap();
        h.wf.add(sample("b@y.com")).unwrap();
        h.wf.select(1).unwrap();

        let list = h.wf.fetch().unwrap();
        assert_eq!(list.len(), 10);
        assert_eq!(list.first().map(|m| m.seq), Some(16));
        assert_eq!(h.fetch_log.entries()[0], "open imap.y.com");
    }

    #[test]
    fn test_send_uses_current_account() {
        let h = harness(0);
        h.wf.add(sample("a@x.com")).unwrap();
        h.wf.send("c@z.com", "hello", "body").unwrap();
        assert_eq!(h.send_log.entries(), vec!["send a@x.com -> c@z.com: hello"]);
    }

    #[test]
    fn test_send_failure_surfaces() {
        let dir = tempdir().unwrap();
        let wf = SessionWorkflow::new(
            AccountStore::from_accounts(vec![sample("a@x.com")]),
            AccountFile::new(dir.path().join("accounts.json")),
            Box::new(FakeRetriever::with_messages(0)),
            Box::new(FakeSubmitter { fail: true, ..Default::default() }),
        );
        assert!(matches!(wf.send("b@y.com", "s", "b"), Err(MailError::Send(_))));
    }
}
