use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::account::MailAccount;
use crate::error::MailError;

#[derive(Clone, Debug)]
pub struct AccountFile {
    path: PathBuf,
}

impl AccountFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the list back. A missing file is an empty list.
    pub fn load(&self) -> Result<Vec<MailAccount>, MailError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(persistence(&self.path, e)),
        };
        serde_json::from_str(&data).map_err(|e| persistence(&self.path, e))
    }

    pub fn save(&self, accounts: &[MailAccount]) -> Result<(), MailError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| persistence(parent, e))?;
            }
        }

        let json = serde_json::to_string_pretty(accounts).map_err(|e| persistence(&self.path, e))?;

        // write-then-rename so a crash never leaves half a file behind
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| persistence(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| persistence(&self.path, e))?;
        Ok(())
    }
}

fn persistence(path: &Path, e: impl std::fmt::Display) -> MailError {
    MailError::Persistence(format!("{}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::sample;
    use tempfile::tempdir;

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let file = AccountFile::new(dir.path().join("accounts.json"));
        let accounts = vec![sample("a@x.com"), sample("b@y.com")];

        file.save(&accounts).unwrap();
        assert_eq!(file.load().unwrap(), accounts);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let file = AccountFile::new(dir.path().join("nope.json"));
        assert!(file.load().unwrap().is_empty());
    }

    #[test]
    fn test_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let file = AccountFile::new(dir.path().join("a").join("b").join("accounts.json"));
        file.save(&[sample("a@x.com")]).unwrap();
        assert_eq!(file.load().unwrap().len(), 1);
        assert!(!dir.path().join("a/b/accounts.json.tmp").exists());
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        fs::write(&path, "{ not json").unwrap();

        let err = AccountFile::new(&path).load().unwrap_err();
        assert!(matches!(err, MailError::Persistence(_)));
    }

    #[test]
    fn test_field_names_on_disk() {
        let dir = tempdir().unwrap();
        let file = AccountFile::new(dir.path().join("accounts.json"));
        file.save(&[sample("a@x.com")]).unwrap();

        let raw = fs::read_to_string(file.path()).unwrap();
        for field in ["username", "password", "imap_server", "imap_port", "smtp_server", "smtp_port"] {
            assert!(raw.contains(&format!("\"{field}\"")), "missing {field}");
        }
    }
}
