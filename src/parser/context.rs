use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;
use std::str::FromStr;

use crate::command::{CommandRegistry, CommandSelection};
use crate::constant::{FALLBACK_COLUMNS, OPTION_PREFIX, VALUE_SEPARATOR};
use crate::convert::ConverterRegistry;
use crate::error::{ErrorKind, ParameterError};
use crate::model::NamePolicy;
use crate::provider::{AssignObserver, DefaultProvider, SecretReader, StdinSecretReader};
use crate::resolve::NameResolver;
use crate::schema::{DescriptorInfo, OptionDescriptor, Param, Schema, SchemaBuilder};
use crate::validate::{GroupScope, GroupValidator};

/// One container graph's descriptor table plus its per-parse state.
/// Built via [`ContextBuilder`]; run via [`ParserContext::parse`].
///
/// A context is single-threaded and non-reentrant: parsing mutates the
/// required-set and per-descriptor assigned flags.  Use
/// [`ParserContext::reset`] before re-parsing the same context.
pub struct ParserContext<'a> {
    pub(crate) program: String,
    pub(crate) descriptors: Vec<OptionDescriptor<'a>>,
    pub(crate) main: Option<usize>,
    // Every declared name, mapped to its descriptor index.
    pub(crate) names: Vec<(String, usize)>,
    pub(crate) scopes: Vec<GroupScope>,
    pub(crate) commands: CommandRegistry<'a>,
    pub(crate) policy: NamePolicy,
    pub(crate) resolver: NameResolver,
    pub(crate) prefix: char,
    pub(crate) separator: char,
    columns: usize,
    pub(crate) converters: Rc<ConverterRegistry>,
    pub(crate) defaults: Option<Rc<dyn DefaultProvider>>,
    pub(crate) secrets: Rc<dyn SecretReader>,
    pub(crate) observer: Option<Rc<dyn AssignObserver>>,
    // Parse-time state.
    pub(crate) required: BTreeSet<usize>,
    pub(crate) assigned: HashSet<usize>,
    pub(crate) values: HashMap<usize, Vec<String>>,
    pub(crate) selected: Option<(usize, String)>,
    pub(crate) seeded: bool,
}

impl<'a> std::fmt::Debug for ParserContext<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserContext")
            .field("program", &self.program)
            .finish()
    }
}

impl<'a> ParserContext<'a> {
    /// Build a context directly from a container, with default policy and collaborators.
    pub fn from_container(container: &'a mut impl Schema) -> Result<Self, ParameterError> {
        ContextBuilder::new("program").container(container).build()
    }

    /// The program (or sub-command chain) this context parses for.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The column width available to an external help formatter.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Snapshot the descriptor table for external formatting.
    pub fn descriptors(&self) -> Vec<DescriptorInfo> {
        self.descriptors.iter().map(|d| d.info()).collect()
    }

    /// The command chain selected by the most recent parse, outermost first.
    pub fn selection(&self) -> Vec<CommandSelection> {
        match &self.selected {
            None => Vec::default(),
            Some((entry_ix, matched)) => {
                let entry = &self.commands.entries[*entry_ix];
                let mut chain = vec![CommandSelection {
                    canonical: entry.canonical.clone(),
                    matched: matched.clone(),
                }];
                chain.extend(entry.context.selection());
                chain
            }
        }
    }

    /// The context registered under the canonical command name, for external formatting.
    pub fn sub_context(&self, canonical: &str) -> Option<&ParserContext<'a>> {
        self.commands
            .entries
            .iter()
            .find(|entry| entry.canonical == canonical)
            .map(|entry| &entry.context)
    }

    /// Clear the per-parse state so the context can run a second, independent parse.
    ///
    /// Without a reset, a second parse keeps the first parse's bookkeeping:
    /// single-valued options raise "can only be specified once" again, while
    /// multi-valued options keep accumulating.  The bound variables themselves
    /// are caller-owned and are not restored to their initials.
    pub fn reset(&mut self) {
        self.required = self
            .descriptors
            .iter()
            .enumerate()
            .filter(|(_, d)| d.required)
            .map(|(ix, _)| ix)
            .collect();
        self.assigned.clear();
        self.values.clear();
        self.selected = None;
        self.seeded = false;

        for entry in &mut self.commands.entries {
            entry.context.reset();
        }
    }
}

/// Configures and builds a [`ParserContext`].
///
/// ### Example
/// ```no_run
/// use optbind::{ContextBuilder, Param, Scalar, Switch};
///
/// let mut verbose: u32 = 0;
/// let mut debug: bool = false;
/// let mut context = ContextBuilder::new("program")
///     .add(Param::option(Scalar::new(&mut verbose), &["-log", "-verbose"]).required())
///     .add(Param::option(Switch::new(&mut debug, true), &["-debug"]))
///     .build()
///     .unwrap();
/// context.parse(&["-log", "2"]).unwrap();
/// ```
pub struct ContextBuilder<'a> {
    program: String,
    case_sensitive: Option<bool>,
    abbreviations: Option<bool>,
    clusters: Option<bool>,
    prefix: Option<char>,
    separator: Option<char>,
    columns: Option<usize>,
    converters: Option<Rc<ConverterRegistry>>,
    defaults: Option<Rc<dyn DefaultProvider>>,
    secrets: Option<Rc<dyn SecretReader>>,
    observer: Option<Rc<dyn AssignObserver>>,
    schema: SchemaBuilder<'a>,
    commands: Vec<(String, Vec<String>, ContextBuilder<'a>)>,
}

// The settings a sub-command context takes over from its parent, unless it
// declares its own.
struct Inherited {
    policy: NamePolicy,
    prefix: char,
    separator: char,
    columns: usize,
    converters: Rc<ConverterRegistry>,
    defaults: Option<Rc<dyn DefaultProvider>>,
    secrets: Rc<dyn SecretReader>,
    observer: Option<Rc<dyn AssignObserver>>,
}

impl Default for Inherited {
    fn default() -> Self {
        Self {
            policy: NamePolicy::default(),
            prefix: OPTION_PREFIX,
            separator: VALUE_SEPARATOR,
            columns: detect_columns(),
            converters: Rc::new(ConverterRegistry::new()),
            defaults: None,
            secrets: Rc::new(StdinSecretReader::default()),
            observer: None,
        }
    }
}

fn detect_columns() -> usize {
    match terminal_size::terminal_size() {
        Some((terminal_size::Width(width), _)) => width as usize,
        None => FALLBACK_COLUMNS,
    }
}

impl<'a> ContextBuilder<'a> {
    /// Create a builder for `program`.
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        let schema = SchemaBuilder::new(program.clone());
        Self {
            program,
            case_sensitive: None,
            abbreviations: None,
            clusters: None,
            prefix: None,
            separator: None,
            columns: None,
            converters: None,
            defaults: None,
            secrets: None,
            observer: None,
            schema,
            commands: Vec::default(),
        }
    }

    /// Match option and command names ignoring ascii case.
    pub fn case_insensitive(mut self, insensitive: bool) -> Self {
        self.case_sensitive.replace(!insensitive);
        self
    }

    /// Let an unambiguous prefix of a declared name resolve to it.
    pub fn allow_abbreviations(mut self, allow: bool) -> Self {
        self.abbreviations.replace(allow);
        self
    }

    /// Let `-abc` stand for the single-character flags `-a -b -c`
    /// (only the final character may consume values).
    pub fn allow_clusters(mut self, allow: bool) -> Self {
        self.clusters.replace(allow);
        self
    }

    /// The character that classifies a token as option-like (default `-`).
    pub fn prefix(mut self, prefix: char) -> Self {
        self.prefix.replace(prefix);
        self
    }

    /// The character separating an inline value from an option name (default `=`).
    pub fn separator(mut self, separator: char) -> Self {
        self.separator.replace(separator);
        self
    }

    /// Fix the column width reported to external formatters
    /// (default: the terminal width, or 80 when unavailable).
    pub fn columns(mut self, columns: usize) -> Self {
        self.columns.replace(columns);
        self
    }

    /// Supply the converter registry consulted for descriptors without an explicit converter.
    pub fn converters(mut self, converters: ConverterRegistry) -> Self {
        self.converters.replace(Rc::new(converters));
        self
    }

    /// Supply the default provider consulted before parsing.
    pub fn defaults(mut self, provider: impl DefaultProvider + 'static) -> Self {
        self.defaults.replace(Rc::new(provider));
        self
    }

    /// Supply the secret reader used by password options without an explicit arity.
    pub fn secrets(mut self, reader: impl SecretReader + 'static) -> Self {
        self.secrets.replace(Rc::new(reader));
        self
    }

    /// Supply the post-assignment observer.
    pub fn observer(mut self, observer: impl AssignObserver + 'static) -> Self {
        self.observer.replace(Rc::new(observer));
        self
    }

    /// Register a parameter directly on this context.
    pub fn add<T>(mut self, param: Param<'a, T>) -> Self
    where
        T: FromStr + 'static,
    {
        self.schema.add(param);
        self
    }

    /// Extract a container's declared options (and delegates) into this context.
    pub fn container(mut self, container: &'a mut impl Schema) -> Self {
        container.describe(&mut self.schema);
        self
    }

    /// Attach a group validator to this context's root scope.
    pub fn group_check(mut self, validator: impl GroupValidator + 'static) -> Self {
        self.schema.group_check(validator);
        self
    }

    /// Register a command under `canonical` plus `aliases`, parsed by `container`'s options.
    pub fn command(
        self,
        canonical: &str,
        aliases: &[&str],
        container: &'a mut impl Schema,
    ) -> Self {
        self.command_with(canonical, aliases, container, |sub| sub)
    }

    /// Register a command and further configure its context (ex: nested sub-commands).
    pub fn command_with(
        mut self,
        canonical: &str,
        aliases: &[&str],
        container: &'a mut impl Schema,
        setup: impl FnOnce(ContextBuilder<'a>) -> ContextBuilder<'a>,
    ) -> Self {
        let sub = ContextBuilder::new(format!("{} {canonical}", self.program)).container(container);
        let sub = setup(sub);
        self.commands.push((
            canonical.to_string(),
            aliases.iter().map(|a| a.to_string()).collect(),
            sub,
        ));
        self
    }

    /// Build the parser context.
    /// This finalizes the configuration and checks for errors (ex: a repeated option name).
    pub fn build(self) -> Result<ParserContext<'a>, ParameterError> {
        self.build_inherited(&Inherited::default())
            .map_err(ParameterError::from)
    }

    fn build_inherited(self, parent: &Inherited) -> Result<ParserContext<'a>, ErrorKind> {
        let policy = NamePolicy {
            case_sensitive: self.case_sensitive.unwrap_or(parent.policy.case_sensitive),
            abbreviations: self.abbreviations.unwrap_or(parent.policy.abbreviations),
            clusters: self.clusters.unwrap_or(parent.policy.clusters),
        };
        let prefix = self.prefix.unwrap_or(parent.prefix);
        let separator = self.separator.unwrap_or(parent.separator);
        let columns = self.columns.unwrap_or(parent.columns);
        let converters = self
            .converters
            .unwrap_or_else(|| Rc::clone(&parent.converters));
        let defaults = self.defaults.or_else(|| parent.defaults.clone());
        let secrets = self.secrets.unwrap_or_else(|| Rc::clone(&parent.secrets));
        let observer = self.observer.or_else(|| parent.observer.clone());

        let flattened = self.schema.finish()?;

        let mut names: Vec<(String, usize)> = Vec::default();
        let mut counts: HashMap<String, usize> = HashMap::default();

        for (ix, descriptor) in flattened.descriptors.iter().enumerate() {
            for name in &descriptor.names {
                names.push((name.clone(), ix));
                *counts.entry(policy.fold(name)).or_default() += 1;
            }
        }

        for (name, _) in &names {
            let count = counts[&policy.fold(name)];
            if count > 1 {
                return Err(ErrorKind::configuration(format!(
                    "the option '{name}' is defined {count} times."
                )));
            }
        }

        let inherited = Inherited {
            policy,
            prefix,
            separator,
            columns,
            converters: Rc::clone(&converters),
            defaults: defaults.clone(),
            secrets: Rc::clone(&secrets),
            observer: observer.clone(),
        };

        let mut commands = CommandRegistry::default();
        for (canonical, aliases, sub_builder) in self.commands {
            let sub_context = sub_builder.build_inherited(&inherited)?;
            commands.register(canonical, aliases, sub_context, &policy)?;
        }

        let required = flattened
            .descriptors
            .iter()
            .enumerate()
            .filter(|(_, d)| d.required)
            .map(|(ix, _)| ix)
            .collect();

        Ok(ParserContext {
            program: self.program,
            descriptors: flattened.descriptors,
            main: flattened.main,
            names,
            scopes: flattened.scopes,
            commands,
            policy,
            resolver: NameResolver::new(policy),
            prefix,
            separator,
            columns,
            converters,
            defaults,
            secrets,
            observer,
            required,
            assigned: HashSet::default(),
            values: HashMap::default(),
            selected: None,
            seeded: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{Scalar, Switch};
    use crate::test::assert_contains;

    #[test]
    fn build_empty() {
        let context = ContextBuilder::new("program").build().unwrap();
        assert_eq!(context.program(), "program");
        assert_eq!(context.descriptors(), Vec::default());
        assert_eq!(context.selection(), Vec::default());
    }

    #[test]
    fn build_duplicate_name() {
        // Setup
        let mut first: u32 = 0;
        let mut second: u32 = 0;
        let builder = ContextBuilder::new("program")
            .add(Param::option(Scalar::new(&mut first), &["-x"]))
            .add(Param::option(Scalar::new(&mut second), &["-y", "-x"]));

        // Execute
        let error = builder.build().unwrap_err();

        // Verify
        assert_contains!(error.to_string(), "the option '-x' is defined 2 times");
    }

    #[test]
    fn build_duplicate_name_case_insensitive() {
        // Setup
        // '-x' and '-X' are distinct case-sensitively, but collide under a
        // case-insensitive policy.
        let mut first: u32 = 0;
        let mut second: u32 = 0;
        let builder = ContextBuilder::new("program")
            .case_insensitive(true)
            .add(Param::option(Scalar::new(&mut first), &["-x"]))
            .add(Param::option(Scalar::new(&mut second), &["-X"]));

        // Execute
        let error = builder.build().unwrap_err();

        // Verify
        assert_contains!(error.to_string(), "is defined 2 times");
    }

    #[test]
    fn build_distinct_names_case_sensitive() {
        let mut first: u32 = 0;
        let mut second: u32 = 0;
        ContextBuilder::new("program")
            .add(Param::option(Scalar::new(&mut first), &["-x"]))
            .add(Param::option(Scalar::new(&mut second), &["-X"]))
            .build()
            .unwrap();
    }

    struct SubArgs {
        value: u32,
    }

    impl Schema for SubArgs {
        fn describe<'a>(&'a mut self, schema: &mut SchemaBuilder<'a>) {
            let SubArgs { value } = self;
            schema.add(Param::option(Scalar::new(value), &["-Value"]));
        }
    }

    #[test]
    fn sub_command_inherits_policy() {
        // Setup
        let mut sub = SubArgs { value: 0 };
        let mut context = ContextBuilder::new("program")
            .case_insensitive(true)
            .command("run", &[], &mut sub)
            .build()
            .unwrap();

        // Execute
        // Both the command lookup and the sub-context's option lookup follow
        // the parent's case-insensitive policy.
        context.parse(&["RUN", "-value", "7"]).unwrap();

        // Verify
        drop(context);
        assert_eq!(sub.value, 7);
    }

    #[test]
    fn sub_command_overrides_policy() {
        // Setup
        let mut sub = SubArgs { value: 0 };
        let mut context = ContextBuilder::new("program")
            .case_insensitive(true)
            .command_with("run", &[], &mut sub, |command| {
                command.case_insensitive(false)
            })
            .build()
            .unwrap();

        // Execute
        let error = context.parse(&["RUN", "-value", "7"]).unwrap_err();

        // Verify
        assert_contains!(error.to_string(), "unknown option '-value'");
    }

    #[test]
    fn command_repeated_name() {
        // Setup
        let mut first = SubArgs { value: 0 };
        let mut second = SubArgs { value: 0 };
        let builder = ContextBuilder::new("program")
            .command("run", &["r"], &mut first)
            .command("rerun", &["r"], &mut second);

        // Execute
        let error = builder.build().unwrap_err();

        // Verify
        assert_contains!(error.to_string(), "'r' is already registered under 'run'");
    }

    #[test]
    fn reset_clears_selection() {
        // Setup
        let mut sub = SubArgs { value: 0 };
        let mut context = ContextBuilder::new("program")
            .command("run", &[], &mut sub)
            .build()
            .unwrap();
        context.parse(&["run", "-Value", "7"]).unwrap();
        assert_eq!(context.selection().len(), 1);

        // Execute
        context.reset();

        // Verify
        assert_eq!(context.selection(), Vec::default());
        context.parse(&["run", "-Value", "8"]).unwrap();
        drop(context);
        assert_eq!(sub.value, 8);
    }
}
