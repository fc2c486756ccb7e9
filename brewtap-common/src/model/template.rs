//! `${...}` substitution for formula fields.

use crate::error::{BrewtapError, Result};

pub const VERSION_PLACEHOLDER: &str = "version";
pub const MAINTAINER_PLACEHOLDER: &str = "maintainerIdentity";

/// Values bound to the placeholders a formula may use.
#[derive(Debug, Clone, Copy)]
pub struct Bindings<'a> {
    pub version: &'a str,
    pub maintainer_identity: &'a str,
}

impl Bindings<'_> {
    fn lookup(&self, key: &str) -> Option<&str> {
        match key {
            VERSION_PLACEHOLDER => Some(self.version),
            MAINTAINER_PLACEHOLDER => Some(self.maintainer_identity),
            _ => None,
        }
    }
}

/// Replaces every `${key}` in `input`. Unknown keys and unterminated placeholders are errors.
pub fn substitute(input: &str, bindings: &Bindings<'_>) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or_else(|| {
            BrewtapError::ParseError(
                "formula template",
                format!("unterminated placeholder in '{input}'"),
            )
        })?;
        let key = &after[..end];
        let value = bindings.lookup(key).ok_or_else(|| {
            BrewtapError::ParseError(
                "formula template",
                format!("unknown placeholder '${{{key}}}' in '{input}'"),
            )
        })?;
        out.push_str(value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

pub fn substitute_all(inputs: &[String], bindings: &Bindings<'_>) -> Result<Vec<String>> {
    inputs.iter().map(|s| substitute(s, bindings)).collect()
}
