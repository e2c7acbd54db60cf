//! Traits which, typically, may be imported without concern: `use optbind::prelude::*`.

pub use crate::binding::{BindField, BindPairs, Collectable};
pub use crate::convert::Converter;
pub use crate::provider::{AssignObserver, DefaultProvider, SecretReader, VariableArity};
pub use crate::schema::Schema;
pub use crate::validate::{GroupValidator, Validator, ValueValidator};
