//! Built-in functions for `CallFunction`
//!
//! Keys are matched ignoring ASCII case. Numeric functions take
//! comma-separated arguments; text functions take the whole argument text.
//! Unknown keys return `None` so the caller can try the host's plugins.

use crate::types::{coerce_f64, Scalar};

/// Built-in function identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Abs,
    Round,
    Floor,
    Ceil,
    Sqrt,
    Min,
    Max,
    Pow,
    Len,
    Upper,
    Lower,
    Trim,
    Concat,
}

impl Builtin {
    pub fn from_key(key: &str) -> Option<Builtin> {
        let builtin = match key.trim().to_ascii_lowercase().as_str() {
            "abs" => Builtin::Abs,
            "round" => Builtin::Round,
            "floor" => Builtin::Floor,
            "ceil" | "ceiling" => Builtin::Ceil,
            "sqrt" => Builtin::Sqrt,
            "min" => Builtin::Min,
            "max" => Builtin::Max,
            "pow" | "power" => Builtin::Pow,
            "len" | "length" => Builtin::Len,
            "upper" | "toupper" => Builtin::Upper,
            "lower" | "tolower" => Builtin::Lower,
            "trim" => Builtin::Trim,
            "concat" => Builtin::Concat,
            _ => return None,
        };
        Some(builtin)
    }
}

/// Call a built-in by key; `None` if the key is not a built-in
pub fn call_builtin(key: &str, args: &str) -> Option<String> {
    let builtin = Builtin::from_key(key)?;
    let numbers = || -> Vec<f64> { split_args(args).map(coerce_f64).collect() };
    let first = || numbers().first().copied().unwrap_or(0.0);

    let result = match builtin {
        Builtin::Abs => number(first().abs()),
        Builtin::Round => {
            let nums = numbers();
            let value = nums.first().copied().unwrap_or(0.0);
            let digits = nums.get(1).copied().unwrap_or(0.0).clamp(0.0, 15.0) as i32;
            let scale = 10f64.powi(digits);
            number((value * scale).round() / scale)
        }
        Builtin::Floor => number(first().floor()),
        Builtin::Ceil => number(first().ceil()),
        Builtin::Sqrt => number(first().sqrt()),
        Builtin::Min => number(numbers().into_iter().fold(f64::INFINITY, f64::min)),
        Builtin::Max => number(numbers().into_iter().fold(f64::NEG_INFINITY, f64::max)),
        Builtin::Pow => {
            let nums = numbers();
            let base = nums.first().copied().unwrap_or(0.0);
            let exp = nums.get(1).copied().unwrap_or(1.0);
            number(base.powf(exp))
        }
        Builtin::Len => args.chars().count().to_string(),
        Builtin::Upper => args.to_uppercase(),
        Builtin::Lower => args.to_lowercase(),
        Builtin::Trim => args.trim().to_string(),
        Builtin::Concat => split_args(args).collect(),
    };
    Some(result)
}

fn split_args(args: &str) -> impl Iterator<Item = &str> {
    args.split(',').map(str::trim).filter(|a| !a.is_empty())
}

fn number(value: f64) -> String {
    Scalar::Float(value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_builtins() {
        assert_eq!(call_builtin("Abs", "-3"), Some("3".to_string()));
        assert_eq!(call_builtin("round", "2.456, 2"), Some("2.46".to_string()));
        assert_eq!(call_builtin("Floor", "2.9"), Some("2".to_string()));
        assert_eq!(call_builtin("CEIL", "2.1"), Some("3".to_string()));
        assert_eq!(call_builtin("Max", "3, 9, 4"), Some("9".to_string()));
        assert_eq!(call_builtin("Min", "3, 9, 4"), Some("3".to_string()));
        assert_eq!(call_builtin("Pow", "2, 10"), Some("1024".to_string()));
        assert_eq!(call_builtin("Sqrt", "16"), Some("4".to_string()));
    }

    #[test]
    fn test_text_builtins() {
        assert_eq!(call_builtin("Len", "héllo"), Some("5".to_string()));
        assert_eq!(call_builtin("Upper", "abc"), Some("ABC".to_string()));
        assert_eq!(call_builtin("Trim", "  x "), Some("x".to_string()));
        assert_eq!(call_builtin("Concat", "a, b ,c"), Some("abc".to_string()));
    }

    #[test]
    fn test_unknown_key() {
        assert_eq!(call_builtin("Teleport", "1"), None);
    }
}
