mod context;
mod engine;

pub use context::{ContextBuilder, ParserContext};
