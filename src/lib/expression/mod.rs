//! The small expression language technique attributes are written in.
//!
//! Attributes are either constants or expressions over named runtime variables such as the
//! zoom level. Expressions are re-evaluated against an [`Env`] whenever the variables change.

mod env;

pub use env::*;

use crate::*;
use std::cell::RefCell;

/// A fully evaluated attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f32),
    Color(Color),
    Bool(bool),
    String(String),
}

impl Value {
    pub fn as_number(&self) -> Option<f32> {
        match self {
            Value::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            Value::Color(color) => Some(*color),
            Value::String(name) => Color::from_name(name),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            Value::Number(number) => Some(*number != 0.0),
            Value::String(value) => match &value[..] {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    /// Interpolates between two values of the same type.
    ///
    /// Values which can't be blended snap to `self`.
    fn lerp(&self, other: &Value, t: f32) -> Value {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + (b - a) * t),
            (Value::Color(a), Value::Color(b)) => Value::Color(a.lerp(b, t)),
            _ => self.clone(),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(number) => write!(f, "{}", number),
            Value::Color(color) => write!(f, "{}", color),
            Value::Bool(value) => write!(f, "{}", value),
            Value::String(value) => write!(f, "{}", value),
        }
    }
}

/// An expression over named runtime variables.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `var(zoom)`
    Var(String),
    /// `interpolate(zoom, 10: 1px, 14: 4px)`
    ///
    /// Linear interpolation between the stops, clamped to the first and last stop.
    Interpolate {
        input: String,
        stops: Vec<(f32, Value)>,
    },
    /// `step(zoom, #ff0000, 12: #00ff00)`
    ///
    /// Yields the value of the last stop not above the input or `default` below the first stop.
    Step {
        input: String,
        default: Box<Value>,
        stops: Vec<(f32, Value)>,
    },
}

impl Expr {
    pub fn evaluate(&self, env: &dyn Env) -> Option<Value> {
        match self {
            Expr::Var(name) => env.lookup(name),
            Expr::Interpolate { input, stops } => {
                let x = env.lookup(input)?.as_number()?;
                let (first, last) = (stops.first()?, stops.last()?);
                if x <= first.0 {
                    return Some(first.1.clone());
                }
                if x >= last.0 {
                    return Some(last.1.clone());
                }
                stops.windows(2).find_map(|pair| {
                    let ((x0, v0), (x1, v1)) = (&pair[0], &pair[1]);
                    if x >= *x0 && x <= *x1 {
                        let span = x1 - x0;
                        let t = if span > 0.0 { (x - x0) / span } else { 1.0 };
                        Some(v0.lerp(v1, t))
                    } else {
                        None
                    }
                })
            }
            Expr::Step {
                input,
                default,
                stops,
            } => {
                let x = env.lookup(input)?.as_number()?;
                Some(
                    stops
                        .iter()
                        .take_while(|(stop, _)| *stop <= x)
                        .last()
                        .map(|(_, value)| value.clone())
                        .unwrap_or_else(|| (**default).clone()),
                )
            }
        }
    }

    /// The smallest and largest stop input, if the expression has stops.
    pub fn stop_range(&self) -> Option<(f32, f32)> {
        match self {
            Expr::Var(_) => None,
            Expr::Interpolate { stops, .. } | Expr::Step { stops, .. } => {
                Some((stops.first()?.0, stops.last()?.0))
            }
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Var(name) => write!(f, "var({})", name),
            Expr::Interpolate { input, stops } => {
                write!(f, "interpolate({}", input)?;
                write_stops(f, stops)?;
                write!(f, ")")
            }
            Expr::Step {
                input,
                default,
                stops,
            } => {
                write!(f, "step({}, {}", input, default)?;
                write_stops(f, stops)?;
                write!(f, ")")
            }
        }
    }
}

fn write_stops(f: &mut std::fmt::Formatter<'_>, stops: &[(f32, Value)]) -> std::fmt::Result {
    for (stop, value) in stops {
        write!(f, ", {}: {}", stop, value)?;
    }
    Ok(())
}

/// A technique attribute: either fixed for the lifetime of the technique or re-evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum Attr {
    Constant(Value),
    Expression(Expr),
}

impl Attr {
    pub fn number(value: f32) -> Self {
        Attr::Constant(Value::Number(value))
    }

    pub fn color(color: Color) -> Self {
        Attr::Constant(Value::Color(color))
    }

    pub fn boolean(value: bool) -> Self {
        Attr::Constant(Value::Bool(value))
    }

    pub fn is_expression(&self) -> bool {
        matches!(self, Attr::Expression(_))
    }

    /// Resolves the attribute, consulting `cache` for expressions if there is one.
    pub fn evaluate(&self, env: &dyn Env, cache: Option<&RefCell<ExprCache>>) -> Option<Value> {
        match self {
            Attr::Constant(value) => Some(value.clone()),
            Attr::Expression(expr) => match cache {
                Some(cache) => cache.borrow_mut().get_or_evaluate(expr, env),
                None => expr.evaluate(env),
            },
        }
    }
}

impl From<Expr> for Attr {
    fn from(expr: Expr) -> Self {
        Attr::Expression(expr)
    }
}

/// `true` if the attribute exists and is an expression.
pub fn is_dynamic(attr: Option<&Attr>) -> bool {
    attr.map_or(false, Attr::is_expression)
}
