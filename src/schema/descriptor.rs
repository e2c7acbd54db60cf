use crate::binding::AnonymousBinding;
use crate::model::Arity;
use crate::provider::VariableArity;
use crate::validate::Validator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DescriptorKind {
    Named,
    Main,
    Dynamic { assignment: char },
}

// One declared option, type-erased.  The typed half (converter, typed value
// validators, the bound field itself) lives behind `binding`.
pub(crate) struct OptionDescriptor<'a> {
    pub(crate) names: Vec<String>,
    pub(crate) kind: DescriptorKind,
    // As declared; `TypeDefault` defers to `default_arity`.
    pub(crate) arity: Arity,
    pub(crate) default_arity: Arity,
    pub(crate) required: bool,
    pub(crate) password: bool,
    pub(crate) hidden: bool,
    pub(crate) accumulates: bool,
    pub(crate) description: Option<String>,
    pub(crate) variable: Option<Box<dyn VariableArity>>,
    pub(crate) checks: Vec<Box<dyn Validator>>,
    pub(crate) binding: Box<dyn AnonymousBinding + 'a>,
    // The scope path this descriptor was declared under (ex: 'root.rotation').
    pub(crate) source: String,
}

impl<'a> std::fmt::Debug for OptionDescriptor<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionDescriptor")
            .field("names", &self.names)
            .field("kind", &self.kind)
            .finish()
    }
}

impl<'a> OptionDescriptor<'a> {
    pub(crate) fn effective_arity(&self) -> Arity {
        match self.arity {
            Arity::TypeDefault => self.default_arity,
            declared => declared,
        }
    }

    pub(crate) fn arity_overridden(&self) -> bool {
        self.arity != Arity::TypeDefault
    }

    pub(crate) fn primary_name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or("<main>")
    }

    pub(crate) fn display_name(&self) -> String {
        if self.names.is_empty() {
            "<main>".to_string()
        } else {
            self.names.join(", ")
        }
    }

    pub(crate) fn info(&self) -> DescriptorInfo {
        DescriptorInfo {
            names: self.names.clone(),
            arity: self.effective_arity(),
            required: self.required,
            password: self.password,
            hidden: self.hidden,
            accumulates: self.accumulates,
            description: self.description.clone(),
        }
    }
}

/// A read-only snapshot of one descriptor, exposed for external help formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorInfo {
    /// The declared names; empty for the main parameter.
    pub names: Vec<String>,
    /// The effective token cardinality.
    pub arity: Arity,
    /// Whether the option must be supplied on the command line.
    pub required: bool,
    /// Whether the option's value is obtained via the secret reader.
    pub password: bool,
    /// Whether an external formatter should omit the option.
    pub hidden: bool,
    /// Whether repeated occurrences accumulate.
    pub accumulates: bool,
    /// The help description, if declared.
    pub description: Option<String>,
}
