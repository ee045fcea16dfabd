//! Credential validation for the honeypot's authentication surface.
//!
//! The table is deliberately weak: the whole point is that attackers get in.
//! No rate limiting, no lockout, no timing games beyond what the transport
//! layer already applies to rejections.

use std::collections::HashMap;

use crate::config::CredentialEntry;

/// Fixed in-memory username/password table, read-only after startup
#[derive(Debug, Clone)]
pub struct CredentialChecker {
    table: HashMap<String, String>,
}

impl CredentialChecker {
    pub fn new(entries: &[CredentialEntry]) -> Self {
        let table = entries
            .iter()
            .map(|e| (e.username.clone(), e.password.clone()))
            .collect();
        Self { table }
    }

    /// Exact-match lookup; pure, no session side effects
    pub fn authenticate(&self, username: &str, password: &str) -> bool {
        self.table
            .get(username)
            .is_some_and(|expected| expected == password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock_checker() -> CredentialChecker {
        CredentialChecker::new(&CredentialEntry::defaults())
    }

    #[test]
    fn accepts_known_pairs() {
        let checker = stock_checker();
        assert!(checker.authenticate("admin", "aaa"));
        assert!(checker.authenticate("guest", "bbb"));
    }

    #[test]
    fn rejects_wrong_password() {
        let checker = stock_checker();
        assert!(!checker.authenticate("admin", "bbb"));
        assert!(!checker.authenticate("admin", ""));
    }

    #[test]
    fn rejects_unknown_username() {
        let checker = stock_checker();
        assert!(!checker.authenticate("root", "aaa"));
        assert!(!checker.authenticate("", "aaa"));
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let checker = stock_checker();
        assert!(!checker.authenticate("Admin", "aaa"));
        assert!(!checker.authenticate("admin", "AAA"));
    }
}
