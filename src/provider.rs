use std::io::{BufRead, Write};

/// Supplies option defaults before any token is consumed (ex: backed by
/// environment variables or a properties file).
///
/// A value found here seeds the bound field but does not satisfy the option's
/// `required` constraint; only a live command line value does.
pub trait DefaultProvider {
    /// Look up a default for an option declared under `names`.
    fn lookup(&self, names: &[String]) -> Option<String>;
}

impl<F> DefaultProvider for F
where
    F: Fn(&[String]) -> Option<String>,
{
    fn lookup(&self, names: &[String]) -> Option<String> {
        self(names)
    }
}

/// Chooses how many of the remaining tokens a [`Arity::Variable`](crate::Arity::Variable)
/// option consumes.
pub trait VariableArity {
    /// Return the number of leading `remaining` tokens that belong to `name`.
    fn how_many(&self, name: &str, remaining: &[&str]) -> usize;
}

impl<F> VariableArity for F
where
    F: Fn(&str, &[&str]) -> usize,
{
    fn how_many(&self, name: &str, remaining: &[&str]) -> usize {
        self(name, remaining)
    }
}

/// Obtains a password option's value out-of-band when the option declares no
/// explicit arity.
pub trait SecretReader {
    /// Read the secret for the option `name`; the error is a human-readable message.
    fn read_secret(&self, name: &str) -> Result<String, String>;
}

/// A [`SecretReader`] that prompts on stderr and reads one line from stdin.
#[derive(Default)]
pub struct StdinSecretReader {}

impl SecretReader for StdinSecretReader {
    fn read_secret(&self, name: &str) -> Result<String, String> {
        let mut err = std::io::stderr();
        write!(err, "value for {name}: ").map_err(|e| e.to_string())?;
        err.flush().map_err(|e| e.to_string())?;

        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| e.to_string())?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Post-processing hook invoked after each successful live assignment.
pub trait AssignObserver {
    /// `name` is the descriptor's primary name; `raw` the token as typed.
    fn assigned(&self, name: &str, raw: &str);
}

impl<F> AssignObserver for F
where
    F: Fn(&str, &str),
{
    fn assigned(&self, name: &str, raw: &str) {
        self(name, raw)
    }
}
