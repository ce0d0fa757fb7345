//! Decoding of `terraform output -json`.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::error::TerraformError;

/// Read-only snapshot of every output declared by the stack, taken once
/// after a successful apply.
#[derive(Debug, Clone, Default)]
pub struct StackOutputs {
    values: BTreeMap<String, Value>,
}

impl StackOutputs {
    /// Decode the full-map form, where each output is wrapped as
    /// `{"sensitive": …, "type": …, "value": …}`.
    pub(crate) fn decode(stdout: &[u8]) -> Result<Self> {
        let parsed: Value =
            serde_json::from_slice(stdout).context("parsing `terraform output -json`")?;
        let Value::Object(map) = parsed else {
            anyhow::bail!("`terraform output -json` did not return an object");
        };
        let values = map
            .into_iter()
            .map(|(name, entry)| {
                let value = entry.get("value").cloned().unwrap_or(entry);
                (name, value)
            })
            .collect();
        Ok(Self { values })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// String value of `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the output is missing, not a string, or empty —
    /// a successful apply must leave every consumed output present and
    /// non-empty.
    pub fn require(&self, name: &str) -> Result<String> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| TerraformError::MissingOutput(name.to_string()))?;
        string_value(name, value)
    }
}

/// Decode the single-output form (`terraform output -json <name>` prints the
/// bare value).
pub(crate) fn decode_single(name: &str, stdout: &[u8]) -> Result<String> {
    let value: Value = serde_json::from_slice(stdout)
        .with_context(|| format!("parsing `terraform output -json {name}`"))?;
    string_value(name, &value)
}

fn string_value(name: &str, value: &Value) -> Result<String> {
    let s = value.as_str().ok_or_else(|| TerraformError::NonStringOutput {
        name: name.to_string(),
        found: json_type_name(value),
    })?;
    if s.is_empty() {
        return Err(TerraformError::EmptyOutput(name.to_string()).into());
    }
    Ok(s.to_string())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
