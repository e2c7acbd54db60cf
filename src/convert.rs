use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;
use std::str::FromStr;

use crate::error::ErrorKind;

/// Converts a raw command line token into a typed value.
///
/// Implemented for free by any `Fn(&str) -> Result<T, String>`.
pub trait Converter<T> {
    /// Convert `raw`; the error is a human-readable message.
    fn convert(&self, raw: &str) -> Result<T, String>;
}

impl<T, F> Converter<T> for F
where
    F: Fn(&str) -> Result<T, String>,
{
    fn convert(&self, raw: &str) -> Result<T, String> {
        self(raw)
    }
}

/// A caller-constructed table of converters keyed by target type.
///
/// The registry is plain state owned by the context builder; there is no
/// process-wide converter table.
#[derive(Default)]
pub struct ConverterRegistry {
    // Values are `Rc<dyn Converter<T>>`, boxed as `Any` so every T fits in one map.
    entries: HashMap<TypeId, Box<dyn Any>>,
}

impl ConverterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the converter used for every descriptor of declared type `T`
    /// that does not carry an explicit converter.
    /// If repeated for the same `T`, only the final converter applies.
    pub fn register<T: 'static>(&mut self, converter: impl Converter<T> + 'static) {
        let rc: Rc<dyn Converter<T>> = Rc::new(converter);
        self.entries.insert(TypeId::of::<T>(), Box::new(rc));
    }

    pub(crate) fn resolve<T: 'static>(&self) -> Option<Rc<dyn Converter<T>>> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<Rc<dyn Converter<T>>>())
            .cloned()
    }
}

// Converter resolution, first match wins:
// 1. the descriptor's explicit converter;
// 2. the registry entry for the declared type;
// 3. the `FromStr` convention.
// Collection descriptors run this element-wise; dynamic descriptors run it on
// the value half of each pair.
pub(crate) fn convert_value<T>(
    name: &str,
    raw: &str,
    explicit: Option<&Rc<dyn Converter<T>>>,
    registry: &ConverterRegistry,
) -> Result<T, ErrorKind>
where
    T: FromStr + 'static,
{
    if let Some(converter) = explicit {
        return converter.convert(raw).map_err(|message| ErrorKind::Conversion {
            name: name.to_string(),
            token: raw.to_string(),
            message,
        });
    }

    if let Some(converter) = registry.resolve::<T>() {
        return converter.convert(raw).map_err(|message| ErrorKind::Conversion {
            name: name.to_string(),
            token: raw.to_string(),
            message,
        });
    }

    T::from_str(raw).map_err(|_| ErrorKind::Conversion {
        name: name.to_string(),
        token: raw.to_string(),
        message: format!("cannot parse as {}", std::any::type_name::<T>()),
    })
}
