//! The behavior interpreter
//!
//! Text evaluators (`expression`, `binding`, `condition`), built-in
//! functions (`stdlib`) and the command dispatcher (`executor`).

pub mod binding;
pub mod condition;
pub mod executor;
pub mod expression;
pub mod stdlib;

pub use binding::BindingResolver;
pub use condition::evaluate_condition;
pub use executor::{Command, Dispatcher, InvokeOutcome};
pub use expression::evaluate_expression;
