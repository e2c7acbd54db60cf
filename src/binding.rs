use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::rc::Rc;
use std::str::FromStr;

use crate::convert::{convert_value, Converter, ConverterRegistry};
use crate::error::ErrorKind;
use crate::model::Arity;
use crate::validate::ValueValidator;

/// Behaviour for multiple (0 to many) items T to be collected together.
// Needs to be imported in order to implement a custom `Collectable`.
pub trait Collectable<T> {
    /// Add a value to this `Collectable`.
    fn add(&mut self, item: T);
}

impl<T> Collectable<T> for Vec<T> {
    fn add(&mut self, item: T) {
        self.push(item);
    }
}

impl<T: Eq + std::hash::Hash> Collectable<T> for HashSet<T> {
    fn add(&mut self, item: T) {
        self.insert(item);
    }
}

/// Behaviour to bind an explicit generic type T onto a container field.
///
/// We use this at the bottom of the descriptor graph so the compiler can maintain each field's type.
pub trait BindField<'a, T> {
    /// Declare that the option appeared (before any value is stored).
    fn touched(&mut self);

    /// Store one converted value onto the field.
    fn accept(&mut self, value: T);

    /// The token cardinality this field consumes when the descriptor does not override it.
    fn default_arity(&self) -> Arity;

    /// Whether repeated occurrences accumulate instead of raising "can only be specified once".
    fn accumulates(&self) -> bool;
}

/// Behaviour to bind dynamic `key=value` pairs onto a container field.
pub trait BindPairs<'a, T> {
    /// Declare that the option appeared (before any pair is stored).
    fn touched(&mut self);

    /// Store one converted pair onto the field.
    fn accept(&mut self, key: String, value: T);
}

/// Binds a single-value field; the value is overwritten on assignment.
pub struct Scalar<'a, T> {
    variable: Rc<RefCell<&'a mut T>>,
}

impl<'a, T> Scalar<'a, T> {
    /// Create a scalar binding.
    pub fn new(variable: &'a mut T) -> Self {
        Self {
            variable: Rc::new(RefCell::new(variable)),
        }
    }
}

impl<'a, T> BindField<'a, T> for Scalar<'a, T> {
    fn touched(&mut self) {
        // Do nothing.
    }

    fn accept(&mut self, value: T) {
        **self.variable.borrow_mut() = value;
    }

    fn default_arity(&self) -> Arity {
        Arity::Fixed(1)
    }

    fn accumulates(&self) -> bool {
        false
    }
}

/// Binds a no-value flag; naming the option stores the target value.
pub struct Switch<'a, T> {
    variable: Rc<RefCell<&'a mut T>>,
    target: Option<T>,
}

impl<'a, T> Switch<'a, T> {
    /// Create a switch binding.
    pub fn new(variable: &'a mut T, target: T) -> Self {
        Self {
            variable: Rc::new(RefCell::new(variable)),
            target: Some(target),
        }
    }
}

impl<'a, T> BindField<'a, T> for Switch<'a, T> {
    fn touched(&mut self) {
        // A default-value replay followed by a live occurrence touches twice;
        // the target moves on the first touch and the rest are no-ops.
        if let Some(target) = self.target.take() {
            **self.variable.borrow_mut() = target;
        }
    }

    fn accept(&mut self, _value: T) {
        unreachable!("internal error - must not accept values on a Switch");
    }

    fn default_arity(&self) -> Arity {
        Arity::Fixed(0)
    }

    fn accumulates(&self) -> bool {
        false
    }
}

/// Binds a multi-value field; assignments extend the collection.
pub struct Collection<'a, C, T>
where
    C: 'a + Collectable<T>,
{
    variable: Rc<RefCell<&'a mut C>>,
    _phantom: PhantomData<T>,
}

impl<'a, C, T> Collection<'a, C, T>
where
    C: 'a + Collectable<T>,
{
    /// Create a collection binding.
    pub fn new(variable: &'a mut C) -> Self {
        Self {
            variable: Rc::new(RefCell::new(variable)),
            _phantom: PhantomData,
        }
    }
}

impl<'a, C, T> BindField<'a, T> for Collection<'a, C, T>
where
    C: 'a + Collectable<T>,
{
    fn touched(&mut self) {
        // Do nothing.
    }

    fn accept(&mut self, value: T) {
        (**self.variable.borrow_mut()).add(value);
    }

    fn default_arity(&self) -> Arity {
        Arity::Fixed(1)
    }

    fn accumulates(&self) -> bool {
        true
    }
}

/// Binds a dynamic option's `key=value` pairs onto a map field.
/// A repeated key overwrites the earlier pair.
pub struct DynamicMap<'a, T> {
    variable: Rc<RefCell<&'a mut HashMap<String, T>>>,
}

impl<'a, T> DynamicMap<'a, T> {
    /// Create a dynamic map binding.
    pub fn new(variable: &'a mut HashMap<String, T>) -> Self {
        Self {
            variable: Rc::new(RefCell::new(variable)),
        }
    }
}

impl<'a, T> BindPairs<'a, T> for DynamicMap<'a, T> {
    fn touched(&mut self) {
        // Do nothing.
    }

    fn accept(&mut self, key: String, value: T) {
        (*self.variable.borrow_mut()).insert(key, value);
    }
}

// We need a (dyn .. [ignoring T] ..) in the descriptor table in order to put
// all the fields of varying types T under one collection.
pub(crate) trait AnonymousBinding {
    fn touched(&mut self);

    fn assign(
        &mut self,
        name: &str,
        raw: &str,
        registry: &ConverterRegistry,
    ) -> Result<(), ErrorKind>;

    fn assign_pair(
        &mut self,
        _name: &str,
        _key: &str,
        _raw: &str,
        _registry: &ConverterRegistry,
    ) -> Result<(), ErrorKind> {
        unreachable!("internal error - must not assign key/value pairs on a non-dynamic binding");
    }
}

pub(crate) struct ErasedField<'a, T> {
    field: Box<dyn BindField<'a, T> + 'a>,
    converter: Option<Rc<dyn Converter<T>>>,
    value_checks: Vec<Box<dyn ValueValidator<T>>>,
}

impl<'a, T> ErasedField<'a, T> {
    pub(crate) fn new(
        field: Box<dyn BindField<'a, T> + 'a>,
        converter: Option<Rc<dyn Converter<T>>>,
        value_checks: Vec<Box<dyn ValueValidator<T>>>,
    ) -> Self {
        Self {
            field,
            converter,
            value_checks,
        }
    }
}

impl<'a, T> AnonymousBinding for ErasedField<'a, T>
where
    T: FromStr + 'static,
{
    fn touched(&mut self) {
        self.field.touched();
    }

    fn assign(
        &mut self,
        name: &str,
        raw: &str,
        registry: &ConverterRegistry,
    ) -> Result<(), ErrorKind> {
        let value = convert_value(name, raw, self.converter.as_ref(), registry)?;

        for check in &self.value_checks {
            check
                .validate(name, &value)
                .map_err(|message| ErrorKind::Validation {
                    name: name.to_string(),
                    message,
                })?;
        }

        self.field.accept(value);
        Ok(())
    }
}

pub(crate) struct ErasedPairs<'a, T> {
    pairs: Box<dyn BindPairs<'a, T> + 'a>,
    converter: Option<Rc<dyn Converter<T>>>,
    value_checks: Vec<Box<dyn ValueValidator<T>>>,
}

impl<'a, T> ErasedPairs<'a, T> {
    pub(crate) fn new(
        pairs: Box<dyn BindPairs<'a, T> + 'a>,
        converter: Option<Rc<dyn Converter<T>>>,
        value_checks: Vec<Box<dyn ValueValidator<T>>>,
    ) -> Self {
        Self {
            pairs,
            converter,
            value_checks,
        }
    }
}

impl<'a, T> AnonymousBinding for ErasedPairs<'a, T>
where
    T: FromStr + 'static,
{
    fn touched(&mut self) {
        self.pairs.touched();
    }

    fn assign(
        &mut self,
        _name: &str,
        _raw: &str,
        _registry: &ConverterRegistry,
    ) -> Result<(), ErrorKind> {
        unreachable!("internal error - must not assign single values on a dynamic binding");
    }

    fn assign_pair(
        &mut self,
        name: &str,
        key: &str,
        raw: &str,
        registry: &ConverterRegistry,
    ) -> Result<(), ErrorKind> {
        let value = convert_value(name, raw, self.converter.as_ref(), registry)?;

        for check in &self.value_checks {
            check
                .validate(name, &value)
                .map_err(|message| ErrorKind::Validation {
                    name: name.to_string(),
                    message,
                })?;
        }

        self.pairs.accept(key.to_string(), value);
        Ok(())
    }
}
