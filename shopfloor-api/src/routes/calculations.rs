/// Arithmetic utility endpoints
///
/// - `GET /calculations/` - list operations
/// - `POST /calculations/add` - sum
/// - `POST /calculations/subtract` - first minus the rest
/// - `POST /calculations/multiply` - product
/// - `POST /calculations/divide` - first divided by the rest
///
/// Every operation takes `{"numbers": [..]}` with at least two numbers and
/// answers `{"result", "operation", "operands"}`. Integer operands stay
/// integers for add/subtract/multiply unless the result overflows `i64`;
/// division always yields a float.

use crate::{
    error::{ApiError, ApiResult},
    extract::ApiJson,
};
use axum::Json;
use serde_json::{json, Number, Value};

const OPERATIONS: [&str; 4] = ["add", "subtract", "multiply", "divide"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    fn name(&self) -> &'static str {
        match self {
            Operation::Add => "addition",
            Operation::Subtract => "subtraction",
            Operation::Multiply => "multiplication",
            Operation::Divide => "division",
        }
    }

    fn apply_int(&self, a: i64, b: i64) -> Option<i64> {
        match self {
            Operation::Add => a.checked_add(b),
            Operation::Subtract => a.checked_sub(b),
            Operation::Multiply => a.checked_mul(b),
            Operation::Divide => None,
        }
    }

    fn apply_float(&self, a: f64, b: f64) -> f64 {
        match self {
            Operation::Add => a + b,
            Operation::Subtract => a - b,
            Operation::Multiply => a * b,
            Operation::Divide => a / b,
        }
    }
}

/// Pulls the operand list out of the request body
fn operands(body: &Value) -> ApiResult<Vec<Number>> {
    let numbers = body
        .get("numbers")
        .ok_or_else(|| ApiError::BadRequest("Missing numbers field".to_string()))?
        .as_array()
        .ok_or_else(|| ApiError::BadRequest("Numbers must be a list".to_string()))?;

    if numbers.len() < 2 {
        return Err(ApiError::BadRequest("At least 2 numbers required".to_string()));
    }

    numbers
        .iter()
        .map(|n| match n {
            Value::Number(n) => Ok(n.clone()),
            _ => Err(ApiError::BadRequest("All items must be numbers".to_string())),
        })
        .collect()
}

/// Folds `numbers` left to right
fn compute(operation: Operation, numbers: &[Number]) -> ApiResult<Value> {
    if operation == Operation::Divide && numbers[1..].iter().any(|n| n.as_f64() == Some(0.0)) {
        return Err(ApiError::BadRequest("Division by zero".to_string()));
    }

    let ints: Option<Vec<i64>> = numbers.iter().map(Number::as_i64).collect();

    if let Some(ints) = ints {
        let folded = ints[1..]
            .iter()
            .try_fold(ints[0], |acc, &n| operation.apply_int(acc, n));
        if let Some(result) = folded {
            return Ok(json!(result));
        }
    }

    let floats: Vec<f64> = numbers.iter().filter_map(Number::as_f64).collect();
    let result = floats[1..]
        .iter()
        .fold(floats[0], |acc, &n| operation.apply_float(acc, n));

    Number::from_f64(result)
        .map(Value::Number)
        .ok_or_else(|| ApiError::BadRequest("Result is not a finite number".to_string()))
}

fn respond(operation: Operation, body: Value) -> ApiResult<Json<Value>> {
    let numbers = operands(&body)?;
    let result = compute(operation, &numbers)?;

    Ok(Json(json!({
        "result": result,
        "operation": operation.name(),
        "operands": numbers,
    })))
}

/// List available operations
pub async fn list_operations() -> Json<Value> {
    Json(json!({
        "operations": OPERATIONS,
        "endpoints": OPERATIONS.iter().map(|op| format!("/calculations/{}", op)).collect::<Vec<_>>(),
    }))
}

pub async fn add(ApiJson(body): ApiJson<Value>) -> ApiResult<Json<Value>> {
    respond(Operation::Add, body)
}

pub async fn subtract(ApiJson(body): ApiJson<Value>) -> ApiResult<Json<Value>> {
    respond(Operation::Subtract, body)
}

pub async fn multiply(ApiJson(body): ApiJson<Value>) -> ApiResult<Json<Value>> {
    respond(Operation::Multiply, body)
}

pub async fn divide(ApiJson(body): ApiJson<Value>) -> ApiResult<Json<Value>> {
    respond(Operation::Divide, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(operation: Operation, body: Value) -> ApiResult<Value> {
        respond(operation, body).map(|Json(v)| v)
    }

    #[test]
    fn test_integer_arithmetic_stays_integral() {
        let out = run(Operation::Add, json!({"numbers": [1, 2, 3]})).unwrap();
        assert_eq!(out["result"], json!(6));
        assert_eq!(out["operation"], "addition");
        assert_eq!(out["operands"], json!([1, 2, 3]));

        let out = run(Operation::Subtract, json!({"numbers": [10, 3, 2]})).unwrap();
        assert_eq!(out["result"], json!(5));

        let out = run(Operation::Multiply, json!({"numbers": [2, 3, 4]})).unwrap();
        assert_eq!(out["result"], json!(24));
    }

    #[test]
    fn test_mixed_operands_use_floats() {
        let out = run(Operation::Add, json!({"numbers": [1, 2.5]})).unwrap();
        assert_eq!(out["result"], json!(3.5));
    }

    #[test]
    fn test_division() {
        let out = run(Operation::Divide, json!({"numbers": [100, 2, 5]})).unwrap();
        assert_eq!(out["result"], json!(10.0));
        assert_eq!(out["operation"], "division");
    }

    #[test]
    fn test_division_by_zero_anywhere_in_tail() {
        for numbers in [json!([10, 0]), json!([10, 2, 0]), json!([10, 0.0, 5])] {
            match run(Operation::Divide, json!({ "numbers": numbers })) {
                Err(ApiError::BadRequest(msg)) => assert_eq!(msg, "Division by zero"),
                other => panic!("unexpected: {:?}", other),
            }
        }

        // A zero dividend is fine
        let out = run(Operation::Divide, json!({"numbers": [0, 4]})).unwrap();
        assert_eq!(out["result"], json!(0.0));
    }

    #[test]
    fn test_overflow_falls_back_to_float() {
        let out = run(Operation::Multiply, json!({"numbers": [i64::MAX, 2]})).unwrap();
        assert!(out["result"].is_f64());
    }

    #[test]
    fn test_request_shape_errors() {
        let cases = [
            (json!({}), "Missing numbers field"),
            (json!({"numbers": 5}), "Numbers must be a list"),
            (json!({"numbers": [1]}), "At least 2 numbers required"),
            (json!({"numbers": [1, "2"]}), "All items must be numbers"),
        ];

        for (body, expected) in cases {
            match run(Operation::Add, body) {
                Err(ApiError::BadRequest(msg)) => assert_eq!(msg, expected),
                other => panic!("unexpected: {:?}", other),
            }
        }
    }
}
