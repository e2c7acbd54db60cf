use crate::error::ErrorKind;
use crate::model::NamePolicy;
use crate::parser::ParserContext;
use crate::resolve::{NameResolver, Resolution};

/// One resolved step of the command chain, queryable after a parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSelection {
    /// The canonical command name.
    pub canonical: String,
    /// The declared name that matched: the canonical name itself, or an alias.
    pub matched: String,
}

pub(crate) struct CommandEntry<'a> {
    pub(crate) canonical: String,
    pub(crate) aliases: Vec<String>,
    pub(crate) context: ParserContext<'a>,
}

impl<'a> CommandEntry<'a> {
    fn all_names(&self) -> impl Iterator<Item = &String> {
        std::iter::once(&self.canonical).chain(self.aliases.iter())
    }
}

// The commands registered under one parser context.  Sub-commands nest through
// each entry's own context, forming a tree.
#[derive(Default)]
pub(crate) struct CommandRegistry<'a> {
    pub(crate) entries: Vec<CommandEntry<'a>>,
}

impl<'a> CommandRegistry<'a> {
    // Alias collision is checked here, at registration time, under the owning
    // context's name policy.
    pub(crate) fn register(
        &mut self,
        canonical: String,
        aliases: Vec<String>,
        context: ParserContext<'a>,
        policy: &NamePolicy,
    ) -> Result<(), ErrorKind> {
        let mut incoming = vec![canonical.clone()];
        incoming.extend(aliases.iter().cloned());

        for (position, name) in incoming.iter().enumerate() {
            if incoming[..position]
                .iter()
                .any(|previous| policy.eq_names(previous, name))
            {
                return Err(ErrorKind::configuration(format!(
                    "command '{canonical}' repeats the name '{name}'."
                )));
            }

            for entry in &self.entries {
                if entry
                    .all_names()
                    .any(|existing| policy.eq_names(existing, name))
                {
                    return Err(ErrorKind::configuration(format!(
                        "command name '{name}' is already registered under '{}'.",
                        entry.canonical
                    )));
                }
            }
        }

        self.entries.push(CommandEntry {
            canonical,
            aliases,
            context,
        });
        Ok(())
    }

    // Resolve a token against every canonical name and alias, under the same
    // fuzzy policy as option names.  `None` means the token is not a command.
    pub(crate) fn resolve(
        &self,
        token: &str,
        resolver: &NameResolver,
    ) -> Result<Option<(usize, String)>, ErrorKind> {
        let mut table: Vec<(String, usize)> = Vec::default();
        let mut flat: Vec<(usize, String)> = Vec::default();

        for (entry_ix, entry) in self.entries.iter().enumerate() {
            for name in entry.all_names() {
                table.push((name.clone(), flat.len()));
                flat.push((entry_ix, name.clone()));
            }
        }

        match resolver.resolve(token, &table) {
            Resolution::Unknown => Ok(None),
            Resolution::One(ix) => {
                let (entry_ix, matched) = &flat[ix];
                Ok(Some((*entry_ix, matched.clone())))
            }
            Resolution::Ambiguous(candidates) => Err(ErrorKind::AmbiguousCommand {
                token: token.to_string(),
                candidates,
            }),
        }
    }
}
