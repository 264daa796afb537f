use std::collections::HashMap;
use std::fmt;
use lazy_static::lazy_static;
use regex::Regex;
use crate::error::{Result, SimulationError};
use crate::eval::{evaluate, Value};

/// Current values of the loop variables in scope, shared by every nested loop and statement
pub type Bindings = HashMap<String, i64>;

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();
}

/// A formula template such as `"{i} * 4 + 1"`
///
/// Evaluation happens in two phases: every `{name}` placeholder is replaced with the decimal value
/// bound to `name`, then the resulting literal-only text goes through [`evaluate`]. Bindings which
/// the template doesn't mention are ignored, while a placeholder with no binding is an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula {
    template: String,
}

impl Formula {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Names of the variables the template refers to, in order of appearance
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        PLACEHOLDER.captures_iter(&self.template)
            .filter_map(|captures| captures.get(1))
            .map(|name| name.as_str())
    }

    pub fn references(&self, variable: &str) -> bool {
        self.variables().any(|name| name == variable)
    }

    /// Replaces each placeholder with its binding
    ///
    /// # Arguments
    ///
    /// * `bindings`: The current loop variable bindings
    ///
    /// returns: Result<String, SimulationError>
    ///
    /// # Examples
    ///
    /// ```
    /// use tracelib::formula::{Bindings, Formula};
    /// let bindings = Bindings::from([("i".to_string(), -3)]);
    /// assert_eq!(Formula::new("2-{i}").substitute(&bindings).unwrap(), "2--3");
    /// ```
    pub fn substitute(&self, bindings: &Bindings) -> Result<String> {
        let mut out = String::with_capacity(self.template.len());
        let mut copied_up_to = 0;
        for captures in PLACEHOLDER.captures_iter(&self.template) {
            let (Some(placeholder), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let value = bindings.get(name.as_str()).ok_or_else(|| SimulationError::UnboundVariable {
                formula: self.template.clone(),
                variable: name.as_str().to_string(),
            })?;
            out.push_str(&self.template[copied_up_to..placeholder.start()]);
            out.push_str(&value.to_string());
            copied_up_to = placeholder.end();
        }
        out.push_str(&self.template[copied_up_to..]);
        Ok(out)
    }

    pub fn evaluate(&self, bindings: &Bindings) -> Result<Value> {
        evaluate(&self.substitute(bindings)?)
    }

    /// Evaluates the formula as arithmetic, as used by indices and increments
    pub fn evaluate_integer(&self, bindings: &Bindings) -> Result<i64> {
        let substituted = self.substitute(bindings)?;
        evaluate(&substituted)?.into_integer(&substituted)
    }

    /// Evaluates the formula as a comparison, as used by loop conditions
    pub fn evaluate_condition(&self, bindings: &Bindings) -> Result<bool> {
        let substituted = self.substitute(bindings)?;
        evaluate(&substituted)?.into_boolean(&substituted)
    }
}

impl From<&str> for Formula {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Formula {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}
