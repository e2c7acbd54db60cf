pub(crate) const OPTION_PREFIX: char = '-';
pub(crate) const VALUE_SEPARATOR: char = '=';
pub(crate) const DYNAMIC_ASSIGNMENT: char = '=';

// Delegates are expected to form a shallow tree; the guard only exists to turn
// an accidental cycle into a configuration error instead of a stack overflow.
pub(crate) const MAX_DELEGATE_DEPTH: usize = 16;

pub(crate) const FALLBACK_COLUMNS: usize = 80;
