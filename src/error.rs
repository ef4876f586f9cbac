use thiserror::Error;

/// Failures raised while building or compiling a query.
///
/// None of these are retryable: precondition failures are caller bugs and
/// translation failures mean the query uses a construct with no SQL mapping.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A builder call received an unusable argument.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// An expression, operator, method, cast or captured value has no
    /// translation. Carries the textual form of the offending fragment.
    #[error("{0}")]
    Unsupported(String),

    /// A translation-only marker was invoked as a normal operation.
    #[error("{0}")]
    Misuse(String),

    /// Configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        Error::Unsupported(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_names_parameter() {
        let err = Error::invalid_argument("count", "must not be negative");
        assert_eq!(
            err.to_string(),
            "invalid argument `count`: must not be negative"
        );
    }

    #[test]
    fn test_unsupported_carries_fragment() {
        let err = Error::unsupported("Can not translate method u.Login.Foo()");
        assert!(err.to_string().contains("u.Login.Foo()"));
    }
}
