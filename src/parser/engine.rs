use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::{ErrorKind, ParameterError};
use crate::model::Arity;
use crate::parser::context::ParserContext;
use crate::resolve::Resolution;
use crate::schema::DescriptorKind;

#[cfg(feature = "tracing_debug")]
use tracing::debug;

// A prefixed token, classified.
#[derive(Debug)]
enum OptionMatch {
    Descriptor { ix: usize, inline: Option<String> },
    DynamicPair { ix: usize, key: String, value: String },
    Cluster { members: Vec<usize>, inline: Option<String> },
}

impl<'a> ParserContext<'a> {
    /// Run the parser against the input tokens.
    ///
    /// Parsing seeds defaults from the default provider, consumes every token
    /// (dispatching to a sub-command context when a command token appears),
    /// then checks required-option completeness and runs group validators.
    /// On success the bound container fields hold the parsed values; any
    /// failure aborts the whole parse with a single [`ParameterError`].
    pub fn parse(&mut self, tokens: &[&str]) -> Result<(), ParameterError> {
        self.parse_inner(tokens).map_err(ParameterError::from)
    }

    fn parse_inner(&mut self, tokens: &[&str]) -> Result<(), ErrorKind> {
        self.seed_defaults()?;

        let mut position = 0;

        while position < tokens.len() {
            let token = tokens[position];
            position += 1;

            // Empty tokens are dropped, never appended to the main parameter.
            if token.is_empty() {
                continue;
            }

            if token.starts_with(self.prefix) {
                self.consume_option_token(token, tokens, &mut position)?;
            } else if let Some((entry_ix, matched)) =
                self.commands.resolve(token, &self.resolver)?
            {
                #[cfg(feature = "tracing_debug")]
                {
                    debug!("Dispatching '{token}' to command '{matched}'.");
                }

                // This context's consumption ends here: check completeness and
                // run group validators before handing off, so nested scopes
                // validate independently of whatever the sub-parse does.
                self.finish_consumption()?;
                self.selected = Some((entry_ix, matched));
                let remaining: Vec<&str> = tokens[position..].to_vec();
                return self.commands.entries[entry_ix]
                    .context
                    .parse_inner(&remaining);
            } else {
                self.assign_main(token)?;
            }
        }

        self.finish_consumption()
    }

    fn seed_defaults(&mut self) -> Result<(), ErrorKind> {
        if self.seeded {
            return Ok(());
        }
        self.seeded = true;

        let Some(provider) = self.defaults.clone() else {
            return Ok(());
        };

        for ix in 0..self.descriptors.len() {
            if self.descriptors[ix].kind != DescriptorKind::Named {
                continue;
            }

            let names = self.descriptors[ix].names.clone();
            let Some(raw) = provider.lookup(&names) else {
                continue;
            };

            // A default never satisfies `required` and never arms the
            // "can only be specified once" protection.
            if self.descriptors[ix].effective_arity() == Arity::Fixed(0) {
                if raw == "true" {
                    self.descriptors[ix].binding.touched();
                    self.record_assignment(ix, "true", false);
                }
            } else {
                self.assign_value(ix, &raw, false)?;
            }
        }

        Ok(())
    }

    fn consume_option_token(
        &mut self,
        token: &str,
        tokens: &[&str],
        position: &mut usize,
    ) -> Result<(), ErrorKind> {
        match self.resolve_option_token(token)? {
            OptionMatch::Descriptor { ix, inline } => {
                self.consume_descriptor(ix, inline, tokens, position)
            }
            OptionMatch::DynamicPair { ix, key, value } => {
                let assignment = match self.descriptors[ix].kind {
                    DescriptorKind::Dynamic { assignment } => assignment,
                    _ => unreachable!("internal error - dynamic match must hit a dynamic descriptor"),
                };
                let source = format!("{key}{assignment}{value}");
                self.assign_pair(ix, &key, &value, &source)
            }
            OptionMatch::Cluster { members, inline } => {
                let last = members.len() - 1;

                for ix in &members[..last] {
                    self.consume_descriptor(*ix, None, tokens, position)?;
                }

                self.consume_descriptor(members[last], inline, tokens, position)
            }
        }
    }

    // Classification order: exact/abbreviated name, inline-value split,
    // dynamic prefix form, short cluster.  An ambiguous abbreviation is always
    // an error, even when the token would also read as a cluster.
    fn resolve_option_token(&self, token: &str) -> Result<OptionMatch, ErrorKind> {
        match self.resolver.resolve(token, &self.names) {
            Resolution::One(ix) => {
                return Ok(OptionMatch::Descriptor { ix, inline: None });
            }
            Resolution::Ambiguous(candidates) => {
                return Err(ErrorKind::AmbiguousOption {
                    token: token.to_string(),
                    candidates,
                });
            }
            Resolution::Unknown => {}
        }

        let (head, inline) = match token.split_once(self.separator) {
            Some((head, value)) => (head, Some(value.to_string())),
            None => (token, None),
        };

        if inline.is_some() {
            match self.resolver.resolve(head, &self.names) {
                Resolution::One(ix) => {
                    return Ok(OptionMatch::Descriptor { ix, inline });
                }
                Resolution::Ambiguous(candidates) => {
                    return Err(ErrorKind::AmbiguousOption {
                        token: head.to_string(),
                        candidates,
                    });
                }
                Resolution::Unknown => {}
            }
        }

        if let Some(found) = self.resolve_dynamic(token)? {
            return Ok(found);
        }

        if self.policy.clusters {
            if let Some(found) = self.resolve_cluster(head, inline, token)? {
                return Ok(found);
            }
        }

        Err(ErrorKind::UnknownOption(token.to_string()))
    }

    // Match '-Dkey=value' style tokens: a dynamic descriptor's name followed
    // immediately by an assignment pair.  The longest matching name wins.
    fn resolve_dynamic(&self, token: &str) -> Result<Option<OptionMatch>, ErrorKind> {
        let mut best: Option<(usize, &str, char)> = None;

        for (ix, descriptor) in self.descriptors.iter().enumerate() {
            let DescriptorKind::Dynamic { assignment } = descriptor.kind else {
                continue;
            };

            for name in &descriptor.names {
                if !self.policy.is_prefix(name, token) {
                    continue;
                }

                let Some(rest) = token.get(name.len()..) else {
                    continue;
                };

                if rest.is_empty() {
                    // The bare name; already handled by exact resolution.
                    continue;
                }

                if best.map_or(true, |(_, previous, _)| rest.len() < previous.len()) {
                    best = Some((ix, rest, assignment));
                }
            }
        }

        match best {
            None => Ok(None),
            Some((ix, rest, assignment)) => match rest.split_once(assignment) {
                Some((key, value)) => Ok(Some(OptionMatch::DynamicPair {
                    ix,
                    key: key.to_string(),
                    value: value.to_string(),
                })),
                None => Err(ErrorKind::MalformedPair {
                    name: self.descriptors[ix].primary_name().to_string(),
                    assignment,
                    token: token.to_string(),
                }),
            },
        }
    }

    // Match '-abc' as the flags '-a -b -c'; only the final character may
    // consume values (from the inline value or subsequent tokens).
    fn resolve_cluster(
        &self,
        head: &str,
        inline: Option<String>,
        token: &str,
    ) -> Result<Option<OptionMatch>, ErrorKind> {
        let Some(rest) = head.strip_prefix(self.prefix) else {
            return Ok(None);
        };

        // '--long' is never a cluster.
        if rest.starts_with(self.prefix) {
            return Ok(None);
        }

        let singles: Vec<char> = rest.chars().collect();
        if singles.len() < 2 {
            return Ok(None);
        }

        let mut members = Vec::with_capacity(singles.len());

        for single in &singles {
            let name = format!("{}{}", self.prefix, single);
            match self
                .names
                .iter()
                .find(|(declared, _)| self.policy.eq_names(declared, &name))
            {
                Some((_, ix)) => members.push(*ix),
                None => return Ok(None),
            }
        }

        for ix in &members[..members.len() - 1] {
            if self.descriptors[*ix].effective_arity() != Arity::Fixed(0) {
                return Err(ErrorKind::ClusterValue {
                    cluster: token.to_string(),
                    name: self.descriptors[*ix].display_name(),
                });
            }
        }

        Ok(Some(OptionMatch::Cluster { members, inline }))
    }

    fn consume_descriptor(
        &mut self,
        ix: usize,
        inline: Option<String>,
        tokens: &[&str],
        position: &mut usize,
    ) -> Result<(), ErrorKind> {
        let (name, display, arity, arity_overridden, password, accumulates, kind) = {
            let descriptor = &self.descriptors[ix];
            (
                descriptor.primary_name().to_string(),
                descriptor.display_name(),
                descriptor.effective_arity(),
                descriptor.arity_overridden(),
                descriptor.password,
                descriptor.accumulates,
                descriptor.kind,
            )
        };

        #[cfg(feature = "tracing_debug")]
        {
            debug!("Consuming option '{name}' with arity {arity}.");
        }

        if !accumulates && self.assigned.contains(&ix) {
            return Err(ErrorKind::SpecifiedTwice(display));
        }

        if let DescriptorKind::Dynamic { assignment } = kind {
            let source = match inline {
                Some(value) => value,
                None => {
                    if *position >= tokens.len() {
                        return Err(ErrorKind::ExpectedValues {
                            name: display,
                            expected: 1,
                            got: 0,
                        });
                    }
                    let raw = tokens[*position].to_string();
                    *position += 1;
                    raw
                }
            };

            let (key, value) = match source.split_once(assignment) {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => {
                    return Err(ErrorKind::MalformedPair {
                        name,
                        assignment,
                        token: source,
                    });
                }
            };

            return self.assign_pair(ix, &key, &value, &source);
        }

        // A password option with no declared arity never consumes tokens; the
        // value arrives out-of-band through the secret reader.
        if password && !arity_overridden {
            let secret =
                self.secrets
                    .clone()
                    .read_secret(&name)
                    .map_err(|message| ErrorKind::SecretUnavailable {
                        name: name.clone(),
                        message,
                    })?;
            return self.assign_value(ix, &secret, true);
        }

        match arity {
            Arity::Fixed(0) => {
                if inline.is_some() {
                    return Err(ErrorKind::ExpectedValues {
                        name: display,
                        expected: 0,
                        got: 1,
                    });
                }

                self.descriptors[ix].binding.touched();
                self.record_assignment(ix, "true", true);
                Ok(())
            }
            Arity::Fixed(expected) => {
                if let Some(value) = inline {
                    // Inline syntax carries precisely one value; anything else
                    // is an arity violation for this option.
                    if expected != 1 {
                        return Err(ErrorKind::ExpectedValues {
                            name: display,
                            expected,
                            got: 1,
                        });
                    }

                    return self.assign_value(ix, &value, true);
                }

                let available = tokens.len() - *position;
                if available < expected {
                    return Err(ErrorKind::ExpectedValues {
                        name: display,
                        expected,
                        got: available,
                    });
                }

                for _ in 0..expected {
                    let raw = tokens[*position];
                    *position += 1;
                    self.assign_value(ix, raw, true)?;
                }

                Ok(())
            }
            Arity::Variable => {
                if let Some(value) = inline {
                    return self.assign_value(ix, &value, true);
                }

                let remaining = &tokens[*position..];
                let count = match &self.descriptors[ix].variable {
                    Some(resolver) => resolver.how_many(&name, remaining),
                    None => unreachable!("internal error - variable arity must carry a resolver"),
                };

                if count > remaining.len() {
                    return Err(ErrorKind::ExpectedValues {
                        name: display,
                        expected: count,
                        got: remaining.len(),
                    });
                }

                for _ in 0..count {
                    let raw = tokens[*position];
                    *position += 1;
                    self.assign_value(ix, raw, true)?;
                }

                Ok(())
            }
            Arity::TypeDefault => {
                unreachable!("internal error - the effective arity is never TypeDefault")
            }
        }
    }

    fn assign_main(&mut self, token: &str) -> Result<(), ErrorKind> {
        match self.main {
            Some(ix) => self.assign_value(ix, token, true),
            None => Err(ErrorKind::NoMainParameter(token.to_string())),
        }
    }

    // The conversion & validation pipeline for one value: string-form checks
    // in declaration order, conversion, typed checks in declaration order,
    // field assignment, then bookkeeping.
    fn assign_value(&mut self, ix: usize, raw: &str, live: bool) -> Result<(), ErrorKind> {
        let name = self.descriptors[ix].primary_name().to_string();

        {
            let descriptor = &self.descriptors[ix];
            for check in &descriptor.checks {
                check
                    .validate(&name, raw)
                    .map_err(|message| ErrorKind::Validation {
                        name: name.clone(),
                        message,
                    })?;
            }
        }

        let converters = Rc::clone(&self.converters);
        self.descriptors[ix].binding.assign(&name, raw, &converters)?;
        self.record_assignment(ix, raw, live);
        Ok(())
    }

    fn assign_pair(
        &mut self,
        ix: usize,
        key: &str,
        value: &str,
        source: &str,
    ) -> Result<(), ErrorKind> {
        let name = self.descriptors[ix].primary_name().to_string();

        {
            let descriptor = &self.descriptors[ix];
            for check in &descriptor.checks {
                check
                    .validate(&name, source)
                    .map_err(|message| ErrorKind::Validation {
                        name: name.clone(),
                        message,
                    })?;
            }
        }

        let converters = Rc::clone(&self.converters);
        self.descriptors[ix]
            .binding
            .assign_pair(&name, key, value, &converters)?;
        self.record_assignment(ix, source, true);
        Ok(())
    }

    fn record_assignment(&mut self, ix: usize, raw: &str, live: bool) {
        self.values.entry(ix).or_default().push(raw.to_string());

        if live {
            self.required.remove(&ix);
            self.assigned.insert(ix);

            if let Some(observer) = self.observer.clone() {
                observer.assigned(self.descriptors[ix].primary_name(), raw);
            }
        }
    }

    // Required-option completeness (aggregated over every missing option),
    // then group validation, scope by scope.
    fn finish_consumption(&mut self) -> Result<(), ErrorKind> {
        if !self.required.is_empty() {
            let names = self
                .required
                .iter()
                .map(|ix| self.descriptors[*ix].display_name())
                .collect();
            return Err(ErrorKind::MissingRequired { names });
        }

        for scope in &self.scopes {
            if scope.validators.is_empty() {
                continue;
            }

            let mut assigned: BTreeMap<String, Vec<String>> = BTreeMap::default();

            for member in &scope.members {
                if let Some(raw_values) = self.values.get(member) {
                    assigned.insert(
                        self.descriptors[*member].primary_name().to_string(),
                        raw_values.clone(),
                    );
                }
            }

            for validator in &scope.validators {
                validator
                    .validate(&assigned)
                    .map_err(|message| ErrorKind::GroupValidation {
                        scope: scope.label.clone(),
                        message,
                    })?;
            }
        }

        Ok(())
    }
}
