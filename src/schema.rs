mod builder;
mod descriptor;

pub use builder::{Param, Schema, SchemaBuilder};
pub use descriptor::DescriptorInfo;

pub(crate) use descriptor::{DescriptorKind, OptionDescriptor};
