use std::collections::HashSet;
use std::rc::Rc;
use std::str::FromStr;

use crate::binding::{AnonymousBinding, BindField, BindPairs, ErasedField, ErasedPairs};
use crate::constant::{DYNAMIC_ASSIGNMENT, MAX_DELEGATE_DEPTH};
use crate::convert::Converter;
use crate::error::ErrorKind;
use crate::model::Arity;
use crate::provider::VariableArity;
use crate::schema::descriptor::{DescriptorKind, OptionDescriptor};
use crate::validate::{GroupScope, GroupValidator, Validator, ValueValidator};

/// A container whose fields participate in parsing.
///
/// `describe` registers each bound field onto the [`SchemaBuilder`]; the engine
/// depends only on the resulting descriptor table, never on the container type.
///
/// ### Example
/// ```
/// use optbind::{Param, Scalar, Schema, SchemaBuilder, Switch};
///
/// struct Args {
///     verbose: u32,
///     debug: bool,
/// }
///
/// impl Schema for Args {
///     fn describe<'a>(&'a mut self, schema: &mut SchemaBuilder<'a>) {
///         let Args { verbose, debug } = self;
///         schema
///             .add(Param::option(Scalar::new(verbose), &["-log", "-verbose"]).required())
///             .add(Param::option(Switch::new(debug, true), &["-debug"]));
///     }
/// }
/// ```
pub trait Schema {
    /// Declare this container's options (and delegates) onto the builder.
    fn describe<'a>(&'a mut self, schema: &mut SchemaBuilder<'a>);
}

#[derive(Debug, PartialEq, Eq)]
enum ParamClass {
    Named,
    Main,
    Dynamic,
}

enum Holder<'a, T> {
    Field(Box<dyn BindField<'a, T> + 'a>),
    Pairs(Box<dyn BindPairs<'a, T> + 'a>),
}

/// The declaration of a single parameter: a bound field plus its option metadata.
pub struct Param<'a, T> {
    class: ParamClass,
    names: Vec<String>,
    holder: Holder<'a, T>,
    arity: Arity,
    required: bool,
    password: bool,
    hidden: bool,
    description: Option<String>,
    assignment: char,
    variable: Option<Box<dyn VariableArity>>,
    converter: Option<Rc<dyn Converter<T>>>,
    checks: Vec<Box<dyn Validator>>,
    value_checks: Vec<Box<dyn ValueValidator<T>>>,
}

impl<'a, T> Param<'a, T> {
    fn new(class: ParamClass, names: Vec<String>, holder: Holder<'a, T>) -> Self {
        Self {
            class,
            names,
            holder,
            arity: Arity::TypeDefault,
            required: false,
            password: false,
            hidden: false,
            description: None,
            assignment: DYNAMIC_ASSIGNMENT,
            variable: None,
            converter: None,
            checks: Vec::default(),
            value_checks: Vec::default(),
        }
    }

    /// Declare an ordinary named option.
    /// Names carry their prefix as typed on the command line (ex: `-log`, `--opt`).
    pub fn option(field: impl BindField<'a, T> + 'a, names: &[&str]) -> Self {
        Self::new(
            ParamClass::Named,
            names.iter().map(|n| n.to_string()).collect(),
            Holder::Field(Box::new(field)),
        )
    }

    /// Declare the main (positional) parameter.
    /// The field must be a collection; every token not consumed elsewhere accumulates here.
    pub fn main(field: impl BindField<'a, T> + 'a) -> Self {
        Self::new(ParamClass::Main, Vec::default(), Holder::Field(Box::new(field)))
    }

    /// Declare a dynamic option accepting repeated `key=value` tokens (ex: `-Dkey=value`).
    pub fn dynamic(pairs: impl BindPairs<'a, T> + 'a, names: &[&str]) -> Self {
        Self::new(
            ParamClass::Dynamic,
            names.iter().map(|n| n.to_string()).collect(),
            Holder::Pairs(Box::new(pairs)),
        )
    }

    /// Require the option to be supplied on the command line.
    /// A default-provider value does not satisfy this.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Obtain the value via the context's [`SecretReader`](crate::SecretReader)
    /// when no explicit arity is declared.
    pub fn password(mut self) -> Self {
        self.password = true;
        self
    }

    /// Omit the option from the external descriptor table listing.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Override the number of value tokens consumed per occurrence.
    pub fn arity(mut self, count: usize) -> Self {
        self.arity = Arity::Fixed(count);
        self
    }

    /// Let `resolver` choose the number of value tokens at parse time.
    pub fn variable_arity(mut self, resolver: impl VariableArity + 'static) -> Self {
        self.arity = Arity::Variable;
        self.variable = Some(Box::new(resolver));
        self
    }

    /// Change the `key=value` assignment character of a dynamic option.
    pub fn assignment(mut self, assignment: char) -> Self {
        self.assignment = assignment;
        self
    }

    /// Document the parameter for external help formatting.
    pub fn help(mut self, description: impl Into<String>) -> Self {
        self.description.replace(description.into());
        self
    }

    /// Convert with `converter` instead of the registry or `FromStr`.
    pub fn converter(mut self, converter: impl Converter<T> + 'static) -> Self {
        self.converter = Some(Rc::new(converter));
        self
    }

    /// Validate the raw string before conversion; runs in declaration order.
    pub fn check(mut self, validator: impl Validator + 'static) -> Self {
        self.checks.push(Box::new(validator));
        self
    }

    /// Validate the converted value after conversion; runs in declaration order.
    pub fn check_value(mut self, validator: impl ValueValidator<T> + 'static) -> Self {
        self.value_checks.push(Box::new(validator));
        self
    }

    fn consume(self, source: &str) -> OptionDescriptor<'a>
    where
        T: FromStr + 'static,
    {
        let (kind, default_arity, accumulates, binding): (
            DescriptorKind,
            Arity,
            bool,
            Box<dyn AnonymousBinding + 'a>,
        ) = match self.holder {
            Holder::Field(field) => {
                let kind = match self.class {
                    ParamClass::Named => DescriptorKind::Named,
                    ParamClass::Main => DescriptorKind::Main,
                    ParamClass::Dynamic => {
                        unreachable!("internal error - dynamic params must hold pairs")
                    }
                };
                let default_arity = field.default_arity();
                let accumulates = field.accumulates();
                (
                    kind,
                    default_arity,
                    accumulates,
                    Box::new(ErasedField::new(field, self.converter, self.value_checks)),
                )
            }
            Holder::Pairs(pairs) => (
                DescriptorKind::Dynamic {
                    assignment: self.assignment,
                },
                Arity::Fixed(1),
                true,
                Box::new(ErasedPairs::new(pairs, self.converter, self.value_checks)),
            ),
        };

        OptionDescriptor {
            names: self.names,
            kind,
            arity: self.arity,
            default_arity,
            required: self.required,
            password: self.password,
            hidden: self.hidden,
            accumulates,
            description: self.description,
            variable: self.variable,
            checks: self.checks,
            binding,
            source: source.to_string(),
        }
    }
}

struct ScopeNode {
    label: String,
    members: Vec<usize>,
    validators: Vec<Box<dyn GroupValidator>>,
}

/// Collects descriptors, delegates and validator scopes from a container graph.
pub struct SchemaBuilder<'a> {
    descriptors: Vec<OptionDescriptor<'a>>,
    scopes: Vec<ScopeNode>,
    scope_stack: Vec<usize>,
    visited: HashSet<String>,
    errors: Vec<ErrorKind>,
}

impl<'a> SchemaBuilder<'a> {
    pub(crate) fn new(root_label: impl Into<String>) -> Self {
        Self {
            descriptors: Vec::default(),
            scopes: vec![ScopeNode {
                label: root_label.into(),
                members: Vec::default(),
                validators: Vec::default(),
            }],
            scope_stack: vec![0],
            visited: HashSet::default(),
            errors: Vec::default(),
        }
    }

    fn current_scope(&self) -> usize {
        *self
            .scope_stack
            .last()
            .expect("internal error - the scope stack must never be empty")
    }

    fn current_label(&self) -> String {
        self.scopes[self.current_scope()].label.clone()
    }

    /// Register a parameter under the current scope.
    pub fn add<T>(&mut self, param: Param<'a, T>) -> &mut Self
    where
        T: FromStr + 'static,
    {
        let source = self.current_label();

        match param.class {
            ParamClass::Named | ParamClass::Dynamic if param.names.is_empty() => {
                self.errors.push(ErrorKind::configuration(format!(
                    "option at '{source}' must declare at least one name."
                )));
                return self;
            }
            _ => {}
        }

        let descriptor = param.consume(&source);

        if descriptor.kind == DescriptorKind::Main && !descriptor.accumulates {
            self.errors.push(ErrorKind::configuration(format!(
                "main parameter at '{source}' must bind a collection."
            )));
            return self;
        }

        let ix = self.descriptors.len();
        self.descriptors.push(descriptor);

        // The descriptor belongs to every enclosing scope: a delegate subtree
        // sees its own members, ancestors see the whole subtree.
        for scope in &self.scope_stack {
            self.scopes[*scope].members.push(ix);
        }

        self
    }

    /// Merge a delegated sub-container's descriptors into this namespace.
    ///
    /// The delegate opens a validator scope covering exactly its own subtree.
    /// An unset (`None`) delegate is a configuration error, detected here
    /// rather than at parse time.
    pub fn delegate<D: Schema>(&mut self, label: &str, target: Option<&'a mut D>) -> &mut Self {
        let parent = self.current_label();

        let Some(target) = target else {
            self.errors.push(ErrorKind::configuration(format!(
                "delegate '{label}' at '{parent}' is unset."
            )));
            return self;
        };

        if self.scope_stack.len() >= MAX_DELEGATE_DEPTH {
            self.errors.push(ErrorKind::configuration(format!(
                "delegate '{label}' at '{parent}' exceeds the nesting limit ({MAX_DELEGATE_DEPTH})."
            )));
            return self;
        }

        let ix = self.scopes.len();
        self.scopes.push(ScopeNode {
            label: format!("{parent}.{label}"),
            members: Vec::default(),
            validators: Vec::default(),
        });
        self.scope_stack.push(ix);
        target.describe(self);
        self.scope_stack.pop();

        self
    }

    /// Register a shared declaration fragment exactly once.
    ///
    /// A `key` already seen anywhere in the graph is skipped, so a fragment
    /// reachable through multiple paths contributes its descriptors once
    /// instead of colliding with itself.
    pub fn include(&mut self, key: &str, fragment: impl FnOnce(&mut SchemaBuilder<'a>)) -> &mut Self {
        if self.visited.insert(key.to_string()) {
            fragment(self);
        }

        self
    }

    /// Attach a group validator to the current scope.
    pub fn group_check(&mut self, validator: impl GroupValidator + 'static) -> &mut Self {
        let current = self.current_scope();
        self.scopes[current].validators.push(Box::new(validator));
        self
    }

    pub(crate) fn finish(self) -> Result<FlattenedSchema<'a>, ErrorKind> {
        if let Some(error) = self.errors.into_iter().next() {
            return Err(error);
        }

        let mut main: Option<usize> = None;

        for (ix, descriptor) in self.descriptors.iter().enumerate() {
            if descriptor.kind == DescriptorKind::Main {
                if let Some(previous) = main {
                    return Err(ErrorKind::configuration(format!(
                        "cannot define more than one main parameter ('{}' and '{}').",
                        self.descriptors[previous].source, descriptor.source
                    )));
                }

                main = Some(ix);
            }
        }

        let scopes = self
            .scopes
            .into_iter()
            .map(|node| GroupScope {
                label: node.label,
                members: node.members,
                validators: node.validators,
            })
            .collect();

        Ok(FlattenedSchema {
            descriptors: self.descriptors,
            main,
            scopes,
        })
    }
}

#[derive(Debug)]
pub(crate) struct FlattenedSchema<'a> {
    pub(crate) descriptors: Vec<OptionDescriptor<'a>>,
    pub(crate) main: Option<usize>,
    pub(crate) scopes: Vec<GroupScope>,
}
