/// The number of value tokens an option consumes after its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Defer to the bound field's natural cardinality (ex: a `Switch` consumes `0`, a `Scalar` consumes `1`).
    TypeDefault,
    /// Precisely `N` value tokens; `0` marks a flag.
    Fixed(usize),
    /// The count is chosen at parse time by a [`VariableArity`](crate::VariableArity) resolver.
    Variable,
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// How user-typed tokens are matched against declared option and command names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamePolicy {
    /// Whether names match with exact casing.
    pub case_sensitive: bool,
    /// Whether an unambiguous prefix of a declared name resolves to it.
    pub abbreviations: bool,
    /// Whether `-abc` may stand for the single-character flags `-a -b -c`.
    pub clusters: bool,
}

impl Default for NamePolicy {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            abbreviations: false,
            clusters: false,
        }
    }
}

impl NamePolicy {
    pub(crate) fn eq_names(&self, left: &str, right: &str) -> bool {
        if self.case_sensitive {
            left == right
        } else {
            left.eq_ignore_ascii_case(right)
        }
    }

    pub(crate) fn is_prefix(&self, prefix: &str, name: &str) -> bool {
        match name.get(..prefix.len()) {
            Some(head) => self.eq_names(prefix, head),
            None => false,
        }
    }

    pub(crate) fn fold(&self, name: &str) -> String {
        if self.case_sensitive {
            name.to_string()
        } else {
            name.to_ascii_lowercase()
        }
    }
}
