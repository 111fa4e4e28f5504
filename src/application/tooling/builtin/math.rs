//! Arithmetic tools: expression evaluation and list averaging.

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::super::{Tool, ToolInvokeError};

pub struct CalculateTool;

#[async_trait]
impl Tool for CalculateTool {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Calculate a mathematical expression."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "The mathematical expression to calculate, e.g., '3*10.4+2'.",
                }
            },
            "required": ["expression"],
        })
    }

    async fn invoke(&self, arguments: Map<String, Value>) -> Result<Value, ToolInvokeError> {
        let expression = arguments
            .get("expression")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ToolInvokeError::InvalidArguments("'expression' must be a string".into())
            })?;
        let result = evaluate(expression)
            .map_err(|reason| ToolInvokeError::Failed(format!("Error in calculation: {reason}")))?;
        Ok(json!(result))
    }
}

pub struct AverageTool;

#[async_trait]
impl Tool for AverageTool {
    fn name(&self) -> &str {
        "average"
    }

    fn description(&self) -> &str {
        "Calculate the average of a list of numbers."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "numbers": {
                    "type": "array",
                    "items": {"type": "number"},
                    "description": "A list of numbers to average.",
                }
            },
            "required": ["numbers"],
        })
    }

    async fn invoke(&self, arguments: Map<String, Value>) -> Result<Value, ToolInvokeError> {
        let numbers = arguments
            .get("numbers")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ToolInvokeError::InvalidArguments("'numbers' must be an array of numbers".into())
            })?;
        if numbers.is_empty() {
            return Err(ToolInvokeError::Failed(
                "Error in averaging: cannot average an empty list".into(),
            ));
        }
        let mut sum = 0.0;
        for number in numbers {
            sum += number.as_f64().ok_or_else(|| {
                ToolInvokeError::InvalidArguments("'numbers' must contain only numbers".into())
            })?;
        }
        Ok(json!(sum / numbers.len() as f64))
    }
}

/// Evaluates an infix arithmetic expression: + - * / % with parentheses,
/// unary minus, and decimal literals.
fn evaluate(expression: &str) -> Result<f64, String> {
    let mut parser = ExprParser {
        bytes: expression.as_bytes(),
        position: 0,
    };
    let value = parser.expression()?;
    parser.skip_whitespace();
    if parser.position != parser.bytes.len() {
        return Err(format!(
            "unexpected character at position {}",
            parser.position
        ));
    }
    Ok(value)
}

struct ExprParser<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl ExprParser<'_> {
    fn expression(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'+') => {
                    self.position += 1;
                    value += self.term()?;
                }
                Some(b'-') => {
                    self.position += 1;
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.factor()?;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'*') => {
                    self.position += 1;
                    value *= self.factor()?;
                }
                Some(b'/') => {
                    self.position += 1;
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err("division by zero".into());
                    }
                    value /= divisor;
                }
                Some(b'%') => {
                    self.position += 1;
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err("division by zero".into());
                    }
                    value %= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    fn factor(&mut self) -> Result<f64, String> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'-') => {
                self.position += 1;
                Ok(-self.factor()?)
            }
            Some(b'(') => {
                self.position += 1;
                let value = self.expression()?;
                self.skip_whitespace();
                if self.peek() == Some(b')') {
                    self.position += 1;
                    Ok(value)
                } else {
                    Err("missing closing parenthesis".into())
                }
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.number(),
            Some(c) => Err(format!("unexpected character '{}'", c as char)),
            None => Err("unexpected end of expression".into()),
        }
    }

    fn number(&mut self) -> Result<f64, String> {
        let start = self.position;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == b'.') {
            self.position += 1;
        }
        let literal = std::str::from_utf8(&self.bytes[start..self.position])
            .map_err(|_| "invalid literal".to_string())?;
        literal
            .parse::<f64>()
            .map_err(|_| format!("invalid number '{literal}'"))
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.position).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
            self.position += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_precedence_and_parentheses() {
        assert_eq!(evaluate("3*10.4+2").unwrap(), 33.2);
        assert_eq!(evaluate("2+3*4").unwrap(), 14.0);
        assert_eq!(evaluate("(2+3)*4").unwrap(), 20.0);
        assert_eq!(evaluate("-4 + 6 / 2").unwrap(), -1.0);
        assert_eq!(evaluate("10 % 3").unwrap(), 1.0);
    }

    #[test]
    fn rejects_malformed_expressions() {
        assert!(evaluate("2+").is_err());
        assert!(evaluate("(1+2").is_err());
        assert!(evaluate("1/0").is_err());
        assert!(evaluate("two plus two").is_err());
    }

    #[tokio::test]
    async fn calculate_requires_string_expression() {
        let mut arguments = Map::new();
        arguments.insert("expression".into(), json!(42));
        let error = CalculateTool.invoke(arguments).await.unwrap_err();
        assert!(matches!(error, ToolInvokeError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn average_of_numbers() {
        let mut arguments = Map::new();
        arguments.insert("numbers".into(), json!([1.0, 2.0, 3.0]));
        let value = AverageTool.invoke(arguments).await.unwrap();
        assert_eq!(value, json!(2.0));
    }

    #[tokio::test]
    async fn average_rejects_empty_list() {
        let mut arguments = Map::new();
        arguments.insert("numbers".into(), json!([]));
        let error = AverageTool.invoke(arguments).await.unwrap_err();
        assert!(error.to_string().contains("empty list"));
    }
}
