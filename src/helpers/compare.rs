//! Comparison and logic helpers: eq, ne, gt, lt, gte, lte, and, or, not
//!
//! Ordering comparisons coerce both sides to numbers; anything non-numeric
//! counts as 0.

use crate::template::Value;

pub fn eq(a: &Value, b: &Value) -> Value {
    Value::Bool(a.loose_eq(b))
}

pub fn ne(a: &Value, b: &Value) -> Value {
    Value::Bool(!a.loose_eq(b))
}

pub fn gt(a: &Value, b: &Value) -> Value {
    Value::Bool(a.as_number() > b.as_number())
}

pub fn lt(a: &Value, b: &Value) -> Value {
    Value::Bool(a.as_number() < b.as_number())
}

pub fn gte(a: &Value, b: &Value) -> Value {
    Value::Bool(a.as_number() >= b.as_number())
}

pub fn lte(a: &Value, b: &Value) -> Value {
    Value::Bool(a.as_number() <= b.as_number())
}

/// True when every argument is truthy (and there is at least one)
pub fn and(args: &[Value]) -> Value {
    Value::Bool(!args.is_empty() && args.iter().all(Value::is_truthy))
}

/// True when any argument is truthy
pub fn or(args: &[Value]) -> Value {
    Value::Bool(args.iter().any(Value::is_truthy))
}

pub fn not(a: &Value) -> Value {
    Value::Bool(!a.is_truthy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality() {
        assert_eq!(eq(&Value::from("served"), &Value::from("served")), Value::Bool(true));
        assert_eq!(eq(&Value::from("2"), &Value::Number(2.0)), Value::Bool(true));
        assert_eq!(ne(&Value::from("a"), &Value::Undefined), Value::Bool(true));
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(gt(&Value::from("10"), &Value::Number(9.0)), Value::Bool(true));
        assert_eq!(lt(&Value::from("abc"), &Value::Number(1.0)), Value::Bool(true));
        assert_eq!(gte(&Value::Undefined, &Value::Number(0.0)), Value::Bool(true));
        assert_eq!(lte(&Value::Number(3.0), &Value::Number(2.0)), Value::Bool(false));
    }

    #[test]
    fn test_logic() {
        let yes = Value::from("x");
        let no = Value::from("");
        assert_eq!(and(&[yes.clone(), no.clone()]), Value::Bool(false));
        assert_eq!(and(&[]), Value::Bool(false));
        assert_eq!(or(&[no.clone(), yes]), Value::Bool(true));
        assert_eq!(not(&no), Value::Bool(true));
    }
}
