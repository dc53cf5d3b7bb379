//! Test-only helpers for mutating process environment.
//!
//! Environment is process-global; tests using these helpers must be marked
//! `#[serial(env)]`.

/// Environment variables read by [`GigaChatConfig::new`](crate::GigaChatConfig::new)
pub const GIGACHAT_ENV_VARS: [&str; 5] = [
    "GIGACHAT_CREDENTIALS",
    "GIGACHAT_SCOPE",
    "GIGACHAT_MODEL",
    "GIGACHAT_BASE_URL",
    "GIGACHAT_AUTH_URL",
];

/// Restores one environment variable to its previous value on drop
pub struct EnvGuard {
    key: &'static str,
    prev: Option<String>,
}

impl EnvGuard {
    fn capture(key: &'static str) -> Self {
        Self {
            key,
            prev: std::env::var(key).ok(),
        }
    }

    /// Sets `key` to `val` until the guard is dropped
    #[must_use]
    pub fn set(key: &'static str, val: &str) -> Self {
        let guard = Self::capture(key);
        // SAFETY: callers serialize environment access with `#[serial(env)]`.
        unsafe { std::env::set_var(key, val) };
        guard
    }

    /// Unsets `key` until the guard is dropped
    #[must_use]
    pub fn remove(key: &'static str) -> Self {
        let guard = Self::capture(key);
        // SAFETY: callers serialize environment access with `#[serial(env)]`.
        unsafe { std::env::remove_var(key) };
        guard
    }

    /// Unsets every `GIGACHAT_*` variable the config reads
    #[must_use]
    pub fn clear_gigachat() -> Vec<Self> {
        GIGACHAT_ENV_VARS.into_iter().map(Self::remove).collect()
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // SAFETY: the guard lives inside a `#[serial(env)]` test.
        match &self.prev {
            Some(v) => unsafe { std::env::set_var(self.key, v) },
            None => unsafe { std::env::remove_var(self.key) },
        }
    }
}
