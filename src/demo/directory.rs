//! Simulated account directory used by the Contact step

use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

/// Addresses already registered in the demo directory
const SEEDED: &[&str] = &["admin@example.com", "taken@example.com"];

/// In-memory stand-in for a remote "is this email registered" service
#[derive(Debug, Clone)]
pub struct EmailDirectory {
    taken: HashSet<String>,
    latency: Duration,
}

impl EmailDirectory {
    pub fn new(latency: Duration) -> Self {
        Self {
            taken: HashSet::new(),
            latency,
        }
    }

    /// Directory pre-populated with a few registered addresses
    pub fn seeded(latency: Duration) -> Self {
        Self::new(latency).with_taken(SEEDED.iter().copied())
    }

    pub fn with_taken<I, S>(mut self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.taken
            .extend(emails.into_iter().map(|email| normalize(email.as_ref())));
        self
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Look up an address, after the simulated round trip
    pub async fn is_taken(&self, email: &str) -> anyhow::Result<bool> {
        tokio::time::sleep(self.latency).await;
        let taken = self.taken.contains(&normalize(email));
        debug!(taken, "email directory lookup");
        Ok(taken)
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_lookup_is_case_insensitive() {
        let directory = EmailDirectory::seeded(Duration::from_millis(200));
        assert!(directory.is_taken(" Admin@Example.com ").await.unwrap());
        assert!(!directory.is_taken("new@example.com").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_takes_latency() {
        let directory = EmailDirectory::new(Duration::from_millis(300));
        let started = tokio::time::Instant::now();
        directory.is_taken("a@b.co").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(300));
    }
}
