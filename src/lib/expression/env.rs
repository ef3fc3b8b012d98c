use super::*;
use std::collections::HashMap;

/// The current zoom level of the view.
pub const ZOOM_LEVEL: &str = "zoom";
/// World units covered by one screen pixel at the current zoom level.
pub const PIXEL_TO_WORLD: &str = "pixel-to-world";

/// Variable bindings expressions are evaluated against.
pub trait Env {
    fn lookup(&self, name: &str) -> Option<Value>;
}

/// An `Env` backed by a plain map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapEnv {
    entries: HashMap<String, Value>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.entries.insert(name.into(), value);
    }

    pub fn zoom(&self) -> Option<f32> {
        self.lookup(ZOOM_LEVEL).and_then(|v| v.as_number())
    }

    pub fn pixel_to_world(&self) -> Option<f32> {
        self.lookup(PIXEL_TO_WORLD).and_then(|v| v.as_number())
    }
}

impl Env for MapEnv {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.entries.get(name).cloned()
    }
}

/// Memoizes expression results for the duration of one frame.
///
/// Results are keyed by the expression's textual form, so two techniques using the same
/// expression share one evaluation. The cache empties itself when a new frame begins.
#[derive(Debug, Default)]
pub struct ExprCache {
    frame: Option<u64>,
    results: HashMap<String, Option<Value>>,
    hits: usize,
}

impl ExprCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops all results if `frame_number` differs from the frame the cache was filled in.
    pub fn begin_frame(&mut self, frame_number: u64) {
        if self.frame != Some(frame_number) {
            self.results.clear();
            self.frame = Some(frame_number);
        }
    }

    pub fn get_or_evaluate(&mut self, expr: &Expr, env: &dyn Env) -> Option<Value> {
        let key = expr.to_string();
        if let Some(result) = self.results.get(&key) {
            self.hits += 1;
            return result.clone();
        }
        let result = expr.evaluate(env);
        self.results.insert(key, result.clone());
        result
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }
}
