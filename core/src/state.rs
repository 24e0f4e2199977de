//! Global application state: a flat, case-sensitive name → Scalar store
//!
//! There is no scoping. Variables appear on first write and live for the
//! whole session; every mutation is visible to the very next read.

use crate::types::Scalar;
use std::collections::{BTreeMap, HashMap};

/// Arithmetic applied in place by `StateStore::apply`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arithmetic {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, Default)]
pub struct StateStore {
    vars: HashMap<String, Scalar>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.vars.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Scalar>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Apply `op` to the variable using floating point and store the result
    ///
    /// The current value and the operand are both coerced to f64 (absent or
    /// non-numeric → 0). Dividing by zero leaves the variable untouched and
    /// returns `None`; otherwise the stored result is returned.
    pub fn apply(&mut self, name: &str, op: Arithmetic, operand: &Scalar) -> Option<f64> {
        let current = self.vars.get(name).map(Scalar::as_f64).unwrap_or(0.0);
        let rhs = operand.as_f64();

        let result = match op {
            Arithmetic::Add => current + rhs,
            Arithmetic::Subtract => current - rhs,
            Arithmetic::Multiply => current * rhs,
            Arithmetic::Divide => {
                if rhs == 0.0 {
                    return None;
                }
                current / rhs
            }
        };

        self.vars.insert(name.to_string(), Scalar::Float(result));
        Some(result)
    }

    pub fn increment(&mut self, name: &str, operand: impl Into<Scalar>) -> Option<f64> {
        self.apply(name, Arithmetic::Add, &operand.into())
    }

    pub fn decrement(&mut self, name: &str, operand: impl Into<Scalar>) -> Option<f64> {
        self.apply(name, Arithmetic::Subtract, &operand.into())
    }

    pub fn multiply(&mut self, name: &str, operand: impl Into<Scalar>) -> Option<f64> {
        self.apply(name, Arithmetic::Multiply, &operand.into())
    }

    pub fn divide(&mut self, name: &str, operand: impl Into<Scalar>) -> Option<f64> {
        self.apply(name, Arithmetic::Divide, &operand.into())
    }

    /// Read-only copy of every variable, ordered by name
    pub fn snapshot(&self) -> BTreeMap<String, Scalar> {
        self.vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
