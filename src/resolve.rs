use crate::model::NamePolicy;

// The outcome of resolving a user-typed token against a set of declared names.
// `One` carries the table index the matched name maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Resolution {
    Unknown,
    One(usize),
    Ambiguous(Vec<String>),
}

// Stateless fuzzy lookup over a `(declared name, table index)` list.
// Resolution is a pure function of `(token, names, policy)`; repeated calls
// always return the same result.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NameResolver {
    policy: NamePolicy,
}

impl NameResolver {
    pub(crate) fn new(policy: NamePolicy) -> Self {
        Self { policy }
    }

    pub(crate) fn resolve(&self, token: &str, names: &[(String, usize)]) -> Resolution {
        // An exact match always wins, even when it is also a prefix of a longer name.
        let mut exact: Vec<&(String, usize)> = names
            .iter()
            .filter(|(name, _)| self.policy.eq_names(token, name))
            .collect();

        match exact.len() {
            1 => {
                return Resolution::One(exact.remove(0).1);
            }
            n if n > 1 => {
                // Only reachable case-insensitively, ex: '-a' vs '-A'.
                return Resolution::Ambiguous(
                    exact.into_iter().map(|(name, _)| name.clone()).collect(),
                );
            }
            _ => {}
        }

        if !self.policy.abbreviations {
            return Resolution::Unknown;
        }

        let mut prefixed: Vec<&(String, usize)> = names
            .iter()
            .filter(|(name, _)| self.policy.is_prefix(token, name))
            .collect();

        match prefixed.len() {
            0 => Resolution::Unknown,
            1 => Resolution::One(prefixed.remove(0).1),
            _ => Resolution::Ambiguous(
                prefixed.into_iter().map(|(name, _)| name.clone()).collect(),
            ),
        }
    }
}
