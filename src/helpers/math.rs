//! Arithmetic helpers: add, subtract, multiply, divide
//!
//! Operands are coerced to numbers; division by zero yields 0.

use crate::template::Value;

pub fn add(a: &Value, b: &Value) -> Value {
    Value::Number(a.as_number() + b.as_number())
}

pub fn subtract(a: &Value, b: &Value) -> Value {
    Value::Number(a.as_number() - b.as_number())
}

pub fn multiply(a: &Value, b: &Value) -> Value {
    Value::Number(a.as_number() * b.as_number())
}

pub fn divide(a: &Value, b: &Value) -> Value {
    let divisor = b.as_number();
    if divisor == 0.0 {
        return Value::Number(0.0);
    }
    Value::Number(a.as_number() / divisor)
}

pub fn remainder(a: &Value, b: &Value) -> Value {
    let divisor = b.as_number();
    if divisor == 0.0 {
        return Value::Number(0.0);
    }
    Value::Number(a.as_number() % divisor)
}

/// The `+` operator: text that is not numeric concatenates, otherwise adds
pub fn plus(a: &Value, b: &Value) -> Value {
    let textual = |v: &Value| matches!(v, Value::String(_)) && v.to_number().is_none();
    if textual(a) || textual(b) {
        return Value::String(format!("{}{}", a.to_output_string(), b.to_output_string()));
    }
    add(a, b)
}
