//! Equality filter for table scans.

use rusqlite::types::Value;

/// Conjunction of `field = value` conditions used by `get_all`.
///
/// Conditions keep insertion order; setting the same field twice keeps the
/// latest value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `field = value` to the conjunction.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = field.into();
        let value = value.into();
        match self
            .conditions
            .iter_mut()
            .find(|(existing, _)| *existing == field)
        {
            Some(slot) => slot.1 = value,
            None => self.conditions.push((field, value)),
        }
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.conditions.iter().map(|(field, _)| field.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.conditions.iter().map(|(_, value)| value)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }
}

impl<F: Into<String>> FromIterator<(F, Value)> for Filter {
    fn from_iter<I: IntoIterator<Item = (F, Value)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |filter, (field, value)| filter.with(field, value))
    }
}
