//! Configuration for the StudyHub engine
//!
//! Plain structs with `Default` and `from_env`, so embedders can construct
//! configuration directly or pull it from the environment.

use std::time::Duration;

/// Engine-wide configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Email domains allowed to create accounts (empty = any domain)
    pub allowed_email_domains: Vec<String>,

    /// Emails granted the admin flag at account creation
    pub admin_emails: Vec<String>,

    /// Window after creation during which a direct message may be edited
    pub edit_window: Duration,

    /// Delay before a sync subscription is re-issued after an error
    pub reconnect_delay: Duration,

    /// Capacity of broadcast channels (change batches, engine events)
    pub channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            allowed_email_domains: Vec::new(),
            admin_emails: Vec::new(),
            edit_window: Duration::from_secs(15 * 60),
            reconnect_delay: Duration::from_secs(5),
            channel_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Create config from environment
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            allowed_email_domains: list_from_env("STUDYHUB_ALLOWED_DOMAINS"),
            admin_emails: list_from_env("STUDYHUB_ADMIN_EMAILS"),
            edit_window: Duration::from_secs(
                std::env::var("STUDYHUB_EDIT_WINDOW_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.edit_window.as_secs()),
            ),
            reconnect_delay: Duration::from_secs(
                std::env::var("STUDYHUB_RECONNECT_DELAY_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.reconnect_delay.as_secs()),
            ),
            channel_capacity: std::env::var("STUDYHUB_CHANNEL_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.channel_capacity),
        }
    }

    /// Whether the given email may create an account
    pub fn is_domain_allowed(&self, email: &str) -> bool {
        if self.allowed_email_domains.is_empty() {
            return true;
        }
        email
            .rsplit_once('@')
            .map(|(_, domain)| {
                self.allowed_email_domains
                    .iter()
                    .any(|d| d.eq_ignore_ascii_case(domain))
            })
            .unwrap_or(false)
    }

    /// Whether the given email is on the fixed admin allow-list
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails.iter().any(|e| e.eq_ignore_ascii_case(email))
    }
}

fn list_from_env(key: &str) -> Vec<String> {
    std::env::var(key)
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_allows_any_domain() {
        let config = EngineConfig::default();
        assert!(config.is_domain_allowed("anyone@anywhere.org"));
    }

    #[test]
    fn test_domain_allow_list() {
        let config = EngineConfig {
            allowed_email_domains: vec!["campus.edu".to_string()],
            ..Default::default()
        };
        assert!(config.is_domain_allowed("student@campus.edu"));
        assert!(config.is_domain_allowed("student@CAMPUS.EDU"));
        assert!(!config.is_domain_allowed("student@elsewhere.com"));
        assert!(!config.is_domain_allowed("not-an-email"));
    }

    #[test]
    fn test_admin_allow_list() {
        let config = EngineConfig {
            admin_emails: vec!["ops@campus.edu".to_string()],
            ..Default::default()
        };
        assert!(config.is_admin_email("ops@campus.edu"));
        assert!(!config.is_admin_email("student@campus.edu"));
    }
}
