use std::collections::BTreeMap;

/// Validates the raw string form of a value, before conversion.
///
/// Implemented for free by any `Fn(&str, &str) -> Result<(), String>`.
pub trait Validator {
    /// Validate the raw `token` assigned to the option `name`.
    fn validate(&self, name: &str, token: &str) -> Result<(), String>;
}

impl<F> Validator for F
where
    F: Fn(&str, &str) -> Result<(), String>,
{
    fn validate(&self, name: &str, token: &str) -> Result<(), String> {
        self(name, token)
    }
}

/// Validates the typed form of a value, after conversion.
pub trait ValueValidator<T> {
    /// Validate the converted `value` assigned to the option `name`.
    fn validate(&self, name: &str, value: &T) -> Result<(), String>;
}

impl<T, F> ValueValidator<T> for F
where
    F: Fn(&str, &T) -> Result<(), String>,
{
    fn validate(&self, name: &str, value: &T) -> Result<(), String> {
        self(name, value)
    }
}

/// Validates one container's (or one delegate subtree's) assigned options as a group.
///
/// The map holds only the scope's own descriptors, keyed by primary name, with
/// the raw values assigned during the parse; flags record `"true"`. Ancestor
/// and sibling scopes are never visible.
pub trait GroupValidator {
    /// Validate the scope's name-to-values map; the error is a human-readable message.
    fn validate(&self, values: &BTreeMap<String, Vec<String>>) -> Result<(), String>;
}

impl<F> GroupValidator for F
where
    F: Fn(&BTreeMap<String, Vec<String>>) -> Result<(), String>,
{
    fn validate(&self, values: &BTreeMap<String, Vec<String>>) -> Result<(), String> {
        self(values)
    }
}

// One validator scope: a container or a connected delegate subtree.
// `members` index into the flattened descriptor table.
pub(crate) struct GroupScope {
    pub(crate) label: String,
    pub(crate) members: Vec<usize>,
    pub(crate) validators: Vec<Box<dyn GroupValidator>>,
}

impl std::fmt::Debug for GroupScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupScope")
            .field("label", &self.label)
            .field("members", &self.members)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validator_closure() {
        let no_spaces = |name: &str, token: &str| -> Result<(), String> {
            if token.contains(' ') {
                Err(format!("'{name}' must not contain spaces"))
            } else {
                Ok(())
            }
        };

        no_spaces.validate("-out", "file.txt").unwrap();
        let message = no_spaces.validate("-out", "a b").unwrap_err();
        assert_eq!(message, "'-out' must not contain spaces");
    }

    #[test]
    fn value_validator_closure() {
        let positive = |name: &str, value: &i32| -> Result<(), String> {
            if *value > 0 {
                Ok(())
            } else {
                Err(format!("'{name}' must be positive"))
            }
        };

        positive.validate("-log", &2).unwrap();
        positive.validate("-log", &0).unwrap_err();
    }

    #[test]
    fn group_validator_closure() {
        let exclusive = |values: &BTreeMap<String, Vec<String>>| -> Result<(), String> {
            if values.contains_key("-quiet") && values.contains_key("-verbose") {
                Err("'-quiet' and '-verbose' are mutually exclusive".to_string())
            } else {
                Ok(())
            }
        };

        let mut values = BTreeMap::default();
        values.insert("-quiet".to_string(), vec!["true".to_string()]);
        exclusive.validate(&values).unwrap();

        values.insert("-verbose".to_string(), vec!["true".to_string()]);
        exclusive.validate(&values).unwrap_err();
    }
}
