//! Error types for cache loading, resolution, and commit ordering.

use thiserror::Error;

/// Errors produced while searching for a transaction state.
///
/// During alternative exploration these act as branch verdicts: a failed
/// branch reports why it failed, the caller discards its changes and
/// moves on. Only when every branch has failed does the error reach the
/// API surface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("cannot change locked package {0}")]
    Locked(String),

    #[error("cannot install {package}: no provider for {requirement}")]
    NoProvider {
        package: String,
        requirement: String,
    },

    #[error("cannot satisfy {target}: {}", join_reasons(.reasons))]
    AllAlternativesFailed {
        target: String,
        reasons: Vec<String>,
    },

    #[error("cannot remove {package}: {capability} is still required: {}", join_reasons(.reasons))]
    StillRequired {
        package: String,
        capability: String,
        reasons: Vec<String>,
    },

    #[error("resolution exceeded maximum depth of {0}")]
    TooDeep(usize),
}

fn join_reasons(reasons: &[String]) -> String {
    if reasons.is_empty() {
        "no alternatives were available".to_string()
    } else {
        reasons.join("; ")
    }
}

/// Errors produced while ordering a change set for commit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SortError {
    #[error("unbreakable dependency loop involving {0}")]
    Loop(String),

    #[error("ordering lost elements: expected {expected}, sorted {sorted}")]
    Incomplete { expected: usize, sorted: usize },
}

/// Top-level error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Sort(#[from] SortError),

    #[error("loader error: {0}")]
    Loader(String),

    #[error("changeset state error: {0}")]
    State(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_error_display() {
        let err = ResolveError::Locked("bash-5.0".to_string());
        assert_eq!(err.to_string(), "cannot change locked package bash-5.0");

        let err = ResolveError::NoProvider {
            package: "app-1.0".to_string(),
            requirement: "libssl >= 1.0".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "cannot install app-1.0: no provider for libssl >= 1.0"
        );
    }

    #[test]
    fn test_all_alternatives_failed_lists_reasons() {
        let err = ResolveError::AllAlternativesFailed {
            target: "libssl >= 1.0 needed by app-1.0".to_string(),
            reasons: vec![
                "cannot change locked package openssl-0.9".to_string(),
                "cannot install bar-1.0: no provider for libcrypto".to_string(),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("libssl >= 1.0 needed by app-1.0"));
        assert!(msg.contains("locked package openssl-0.9"));
        assert!(msg.contains("no provider for libcrypto"));
    }

    #[test]
    fn test_all_alternatives_failed_without_reasons() {
        let err = ResolveError::AllAlternativesFailed {
            target: "widget".to_string(),
            reasons: vec![],
        };
        assert!(err.to_string().contains("no alternatives were available"));
    }

    #[test]
    fn test_still_required_display() {
        let err = ResolveError::StillRequired {
            package: "libc-2.31".to_string(),
            capability: "libc = 2.31".to_string(),
            reasons: vec!["cannot change locked package bash-5.0".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("cannot remove libc-2.31"));
        assert!(msg.contains("libc = 2.31 is still required"));
    }

    #[test]
    fn test_sort_error_display() {
        let err = SortError::Incomplete {
            expected: 4,
            sorted: 3,
        };
        assert_eq!(
            err.to_string(),
            "ordering lost elements: expected 4, sorted 3"
        );
    }
}
