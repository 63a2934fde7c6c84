use dashmap::DashMap;
use std::time::{Duration, Instant};

struct FailureRecord {
    count: u32,
    first_failure: Instant,
    locked_until: Option<Instant>,
}

/// Failed-login tracker with automatic lockout.
///
/// After `max_failures` failed logins from one client within `window`, the
/// client is locked out for `lockout`.
pub struct LoginGuard {
    failures: DashMap<String, FailureRecord>,
    max_failures: u32,
    window: Duration,
    lockout: Duration,
}

impl LoginGuard {
    pub fn new(max_failures: u32, window: Duration, lockout: Duration) -> Self {
        tracing::info!(
            "Login guard: max {} failures in {}s window, {}s lockout",
            max_failures,
            window.as_secs(),
            lockout.as_secs()
        );

        Self {
            failures: DashMap::new(),
            max_failures: max_failures.max(1),
            window,
            lockout,
        }
    }

    /// Record a failed login. Returns `true` when this failure starts a lockout.
    pub fn record_failure(&self, client: &str) -> bool {
        self.record_failure_at(client, Instant::now())
    }

    fn record_failure_at(&self, client: &str, now: Instant) -> bool {
        let mut entry = self
            .failures
            .entry(client.to_string())
            .or_insert(FailureRecord {
                count: 0,
                first_failure: now,
                locked_until: None,
            });
        let record = entry.value_mut();

        if now.duration_since(record.first_failure) > self.window {
            record.count = 0;
            record.first_failure = now;
            record.locked_until = None;
        }

        let already_locked = record.locked_until.map(|until| now < until).unwrap_or(false);
        record.count += 1;
        if record.count >= self.max_failures && !already_locked {
            record.locked_until = Some(now + self.lockout);
            return true;
        }
        false
    }

    pub fn is_locked(&self, client: &str) -> bool {
        self.is_locked_at(client, Instant::now())
    }

    fn is_locked_at(&self, client: &str, now: Instant) -> bool {
        self.failures
            .get(client)
            .and_then(|entry| entry.locked_until)
            .map(|until| now < until)
            .unwrap_or(false)
    }

    /// Forget a client's failures after a successful login.
    pub fn record_success(&self, client: &str) {
        self.failures.remove(client);
    }

    /// Drop entries older than window + lockout. Run periodically.
    pub fn cleanup(&self) {
        let now = Instant::now();
        let max_age = self.window + self.lockout;
        self.failures
            .retain(|_, record| now.duration_since(record.first_failure) < max_age);
    }

    pub fn tracked_clients(&self) -> usize {
        self.failures.len()
    }
}
