//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Server failed to start: {0}")]
    ServerStartup(String),

    #[error("Server health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("WebDriver error: {0}")]
    WebDriver(#[from] thirtyfour::error::WebDriverError),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Timeout waiting for: {what} (after {waited_ms} ms)")]
    Timeout { what: String, waited_ms: u64 },

    #[error("Cancelled while waiting for: {0}")]
    Cancelled(String),

    #[error("Data store returned {status}: {body}")]
    Store { status: u16, body: String },

    #[error("Test case not found: {0}")]
    CaseNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// Errors that end the whole run rather than a single case.
    ///
    /// Data-store failures and suite cancellation are fatal; everything a
    /// case body can raise on its own (assertions, timeouts, driver errors)
    /// only fails that case.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            E2eError::Cancelled(_) | E2eError::Store { .. } | E2eError::Http(_)
        )
    }
}

pub type E2eResult<T> = Result<T, E2eError>;

/// Fail with [`E2eError::AssertionFailed`] unless `cond` holds.
pub fn ensure(cond: bool, msg: impl FnOnce() -> String) -> E2eResult<()> {
    if cond {
        Ok(())
    } else {
        Err(E2eError::AssertionFailed(msg()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(E2eError::Cancelled("x".into()).is_fatal());
        assert!(E2eError::Store { status: 401, body: String::new() }.is_fatal());
        assert!(!E2eError::AssertionFailed("x".into()).is_fatal());
        assert!(!E2eError::Timeout { what: "x".into(), waited_ms: 10 }.is_fatal());
    }

    #[test]
    fn test_ensure() {
        assert!(ensure(true, || unreachable!()).is_ok());
        let err = ensure(false, || "login link hidden".to_string()).unwrap_err();
        assert_eq!(err.to_string(), "Assertion failed: login link hidden");
    }
}
