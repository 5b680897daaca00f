use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::Step;

/// Run-time variables keyed by name.
pub type Variables = HashMap<String, String>;

static VARIABLE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.-]+)\s*\}\}").expect("valid variable regex"));

/// Replace `{{VAR}}` tokens with values from `variables`.
///
/// Unknown tokens stay verbatim.
pub fn substitute_variables(input: &str, variables: &Variables) -> String {
    if variables.is_empty() || !input.contains("{{") {
        return input.to_string();
    }
    VARIABLE_TOKEN
        .replace_all(input, |caps: &Captures<'_>| match variables.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

impl Step {
    /// Copy of the step with variables substituted into value, snippet and instruction.
    pub fn resolved(&self, variables: &Variables) -> Step {
        let mut step = self.clone();
        step.instruction_text = substitute_variables(&self.instruction_text, variables);
        step.snippet_code = substitute_variables(&self.snippet_code, variables);
        step.value = self
            .value
            .as_deref()
            .map(|value| substitute_variables(value, variables));
        step
    }
}
