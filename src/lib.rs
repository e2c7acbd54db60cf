//! `optbind` is a declarative command line option binding engine for Rust.
//!
//! Rather than parsing into an intermediate matches structure, `optbind` binds
//! tokens directly onto the fields of ordinary data containers.
//! A container declares its schema once; the engine then turns a raw token
//! stream (argv) into populated fields, enforcing a command/sub-command
//! hierarchy, nested delegation between containers, fuzzy/abbreviated name
//! resolution, and multi-valued accumulation.
//! Specifically, `optbind` prioritizes the following design concerns:
//! * *Type safe binding*:
//! The user should not call any `&str -> T` conversion functions directly.
//! Conversion is resolved per declared type: an explicit converter, a registry
//! entry, or the `FromStr` convention.
//! * *Schema as data*:
//! The engine depends only on the descriptor table produced by
//! [`Schema::describe`]; how a container builds that table (by hand, through
//! shared [`SchemaBuilder::include`] fragments, or through delegated
//! sub-containers) is the container's business.
//! * *Exact edge-case behavior*:
//! Ambiguous abbreviations, arity shortfalls, duplicate single-valued options,
//! and missing required options are each precise, named errors - never a
//! silent guess.
//! * *No global state*:
//! Converters, default providers, and console collaborators are plain values
//! owned by the [`ContextBuilder`]; independent contexts may be built and
//! parsed concurrently on different threads.
//!
//! # Usage
//! ```
//! use optbind::{ContextBuilder, Param, Scalar, Switch};
//!
//! let mut verbose: u32 = 0;
//! let mut debug: bool = false;
//!
//! let mut context = ContextBuilder::new("program")
//!     .add(Param::option(Scalar::new(&mut verbose), &["-log", "-verbose"]).required())
//!     .add(Param::option(Switch::new(&mut debug, true), &["-debug"]))
//!     .build()
//!     .unwrap();
//!
//! context.parse(&["-log", "2"]).unwrap();
//! drop(context);
//!
//! assert_eq!(verbose, 2);
//! assert!(!debug);
//! ```
//!
//! # Containers
//! Implement [`Schema`] to keep the declaration next to the data:
//! ```
//! use optbind::{Collection, ContextBuilder, Param, Scalar, Schema, SchemaBuilder};
//!
//! #[derive(Default)]
//! struct Args {
//!     pairs: Vec<String>,
//!     rest: Vec<String>,
//! }
//!
//! impl Schema for Args {
//!     fn describe<'a>(&'a mut self, schema: &mut SchemaBuilder<'a>) {
//!         let Args { pairs, rest } = self;
//!         schema
//!             .add(Param::option(Collection::new(pairs), &["-pairs"]).arity(2))
//!             .add(Param::main(Collection::new(rest)));
//!     }
//! }
//!
//! let mut args = Args::default();
//! let mut context = ContextBuilder::new("program").container(&mut args).build().unwrap();
//! context.parse(&["-pairs", "a", "b", "c"]).unwrap();
//! drop(context);
//!
//! assert_eq!(args.pairs, vec!["a".to_string(), "b".to_string()]);
//! assert_eq!(args.rest, vec!["c".to_string()]);
//! ```
//!
//! # Semantics
//! * Named options carry their prefix as declared (ex: `-log`, `--opt`) and
//! consume value tokens per their arity; `--opt=value` supplies precisely one
//! value inline.
//! * A flag ([`Switch`] with no arity override) consumes nothing and assigns
//! its target immediately.
//! * With [`ContextBuilder::allow_abbreviations`], an unambiguous prefix of a
//! declared name resolves to it; an ambiguous prefix is a fatal error naming
//! every candidate.
//! * With [`ContextBuilder::allow_clusters`], `-abc` stands for `-a -b -c`
//! where only the final character may consume values.
//! * A dynamic option ([`Param::dynamic`]) accepts repeated `key=value`
//! tokens, attached (`-Dkey=value`) or detached (`-D key=value`).
//! * Tokens matching no option resolve against the registered commands (same
//! fuzzy policy); the remaining tokens then belong exclusively to that
//! command's own context.
//! * Anything else accumulates onto the main parameter ([`Param::main`]), or
//! raises an error when no main parameter exists.
//! * After consumption, every missing required option is reported in one
//! aggregated error, then group validators run scope by scope.
//!
//! # Features
//! * `tracing_debug`: Emit `tracing` events at resolution and consumption decision points.
mod binding;
mod command;
mod constant;
mod convert;
mod error;
mod model;
mod parser;
#[allow(missing_docs)]
pub mod prelude;
mod provider;
mod resolve;
mod schema;
mod validate;

pub use binding::{Collection, DynamicMap, Scalar, Switch};
pub use command::CommandSelection;
pub use convert::{Converter, ConverterRegistry};
pub use error::ParameterError;
pub use model::Arity;
pub use parser::{ContextBuilder, ParserContext};
pub use provider::{
    AssignObserver, DefaultProvider, SecretReader, StdinSecretReader, VariableArity,
};
pub use schema::{DescriptorInfo, Param, Schema, SchemaBuilder};
pub use validate::{GroupValidator, Validator, ValueValidator};

#[cfg(test)]
#[macro_use]
extern crate assert_matches;

#[cfg(test)]
pub(crate) mod test {
    macro_rules! assert_contains {
        ($base:expr, $sub:expr) => {
            assert!(
                $base.contains($sub),
                "'{b}' does not contain '{s}'",
                b = $base,
                s = $sub,
            );
        };
    }

    pub(crate) use assert_contains;
}
