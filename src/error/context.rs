//! Context extension traits for [`SynctraceError`].
//!
//! Lets call sites attach a short "what were we doing" string to any error
//! without losing the source, in the spirit of anyhow's `Context` but
//! staying inside the crate error type.

use super::SynctraceError;

/// Attach context to `Result` values.
pub trait ResultExt<T> {
    /// Wrap the error with additional context.
    ///
    /// # Errors
    ///
    /// Returns the wrapped error if the result was `Err`.
    fn context(self, ctx: impl Into<String>) -> Result<T, SynctraceError>;

    /// Wrap the error with lazily-evaluated context.
    ///
    /// # Errors
    ///
    /// Returns the wrapped error if the result was `Err`.
    fn with_context<F, S>(self, f: F) -> Result<T, SynctraceError>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, ctx: impl Into<String>) -> Result<T, SynctraceError> {
        self.map_err(|e| SynctraceError::WithContext {
            context: ctx.into(),
            source: Box::new(e),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T, SynctraceError>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| SynctraceError::WithContext {
            context: f().into(),
            source: Box::new(e),
        })
    }
}

/// Attach context when unwrapping `Option` values.
pub trait OptionExt<T> {
    /// Convert `None` to an error carrying the given message.
    ///
    /// # Errors
    ///
    /// Returns an error if the option is `None`.
    fn ok_or_context(self, ctx: impl Into<String>) -> Result<T, SynctraceError>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_context(self, ctx: impl Into<String>) -> Result<T, SynctraceError> {
        self.ok_or_else(|| SynctraceError::Other(anyhow::anyhow!(ctx.into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, ErrorKind};

    #[test]
    fn context_wraps_io_error() {
        let result: Result<(), io::Error> =
            Err(io::Error::new(ErrorKind::NotFound, "no such file"));
        let err = result.context("failed to open status log").unwrap_err();
        assert!(err.to_string().contains("failed to open status log"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn with_context_is_lazy() {
        let path = "/var/lib/synctrace/snt.db";
        let result: Result<(), io::Error> = Err(io::Error::new(ErrorKind::NotFound, "missing"));
        let err = result
            .with_context(|| format!("failed to open {path}"))
            .unwrap_err();
        assert!(err.to_string().contains("snt.db"));
    }

    #[test]
    fn ok_or_context_on_none() {
        let none: Option<u32> = None;
        assert!(none.ok_or_context("expected a row").is_err());
        assert_eq!(Some(3).ok_or_context("expected a row").unwrap(), 3);
    }
}
