//! The number-addition demo callable.

use serde::Serialize;
use serde_json::Value;

use crate::Error;

pub const ADD_NUMBERS_USAGE: &str = "The function must be called with two arguments, \"firstNumber\" and \"secondNumber\", which must both be numbers.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionResult {
    pub first_number: i64,
    pub second_number: i64,
    pub operator: &'static str,
    pub operation_result: i64,
}

/// Add `firstNumber` and `secondNumber` from a callable payload.
pub fn add_numbers(data: &Value) -> Result<AdditionResult, Error> {
    let first = data.get("firstNumber").and_then(coerce_integer);
    let second = data.get("secondNumber").and_then(coerce_integer);

    let (Some(first_number), Some(second_number)) = (first, second) else {
        return Err(Error::validation(ADD_NUMBERS_USAGE));
    };
    let operation_result = first_number
        .checked_add(second_number)
        .ok_or_else(|| Error::validation(ADD_NUMBERS_USAGE))?;

    Ok(AdditionResult {
        first_number,
        second_number,
        operator: "+",
        operation_result,
    })
}

/// Integers as-is, floats truncated toward zero, strings parsed after trimming.
fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
