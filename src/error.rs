use thiserror::Error;

/// The single error kind raised by `optbind`.
///
/// Both mis-configuration (detected while building a [`ParserContext`](crate::ParserContext))
/// and parse failures surface as this type; the message always names the offending
/// option(s), ambiguous candidates, or missing required options.
#[derive(Debug, Error)]
#[error("parameter error: {kind}")]
pub struct ParameterError {
    pub(crate) kind: ErrorKind,
}

impl From<ErrorKind> for ParameterError {
    fn from(kind: ErrorKind) -> Self {
        Self { kind }
    }
}

// The internal categories behind the single external kind.
// Configuration variants fire at construction/registration time, before any
// token is consumed; the remainder fire during a parse.
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    #[error("{0}")]
    Configuration(String),

    #[error("unknown option '{0}'.")]
    UnknownOption(String),

    #[error("'{token}' is ambiguous: matches {}.", .candidates.join(", "))]
    AmbiguousOption {
        token: String,
        candidates: Vec<String>,
    },

    #[error("'{token}' is ambiguous: matches commands {}.", .candidates.join(", "))]
    AmbiguousCommand {
        token: String,
        candidates: Vec<String>,
    },

    #[error("expected {expected} values after '{name}' (got {got}).")]
    ExpectedValues {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("'{0}' can only be specified once.")]
    SpecifiedTwice(String),

    #[error("option '{name}' inside the cluster '{cluster}' cannot take values.")]
    ClusterValue { cluster: String, name: String },

    #[error("expected 'key{assignment}value' after '{name}', got '{token}'.")]
    MalformedPair {
        name: String,
        assignment: char,
        token: String,
    },

    #[error("cannot convert '{token}' for '{name}': {message}")]
    Conversion {
        name: String,
        token: String,
        message: String,
    },

    #[error("invalid value for '{name}': {message}")]
    Validation { name: String, message: String },

    #[error("group '{scope}' rejected: {message}")]
    GroupValidation { scope: String, message: String },

    #[error("the following options are required: {}.", .names.join("; "))]
    MissingRequired { names: Vec<String> },

    #[error("no main parameter defined to receive '{0}'.")]
    NoMainParameter(String),

    #[error("could not read secret for '{name}': {message}")]
    SecretUnavailable { name: String, message: String },
}

impl ErrorKind {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        ErrorKind::Configuration(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefix() {
        let error = ParameterError::from(ErrorKind::UnknownOption("-x".to_string()));
        assert_eq!(error.to_string(), "parameter error: unknown option '-x'.");
    }

    #[test]
    fn display_ambiguous() {
        let error = ParameterError::from(ErrorKind::AmbiguousOption {
            token: "-ver".to_string(),
            candidates: vec!["-verbose".to_string(), "-version".to_string()],
        });
        assert_eq!(
            error.to_string(),
            "parameter error: '-ver' is ambiguous: matches -verbose, -version."
        );
    }

    #[test]
    fn display_missing_required() {
        let error = ParameterError::from(ErrorKind::MissingRequired {
            names: vec!["-log, -verbose".to_string(), "-out".to_string()],
        });
        assert_eq!(
            error.to_string(),
            "parameter error: the following options are required: -log, -verbose; -out."
        );
    }
}
