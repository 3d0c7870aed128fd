//! Structured-output template embedded in JSON-prompting mode.

use super::inject::Fragment;

/// Fixed opening of the template instruction; also its presence marker.
pub const TEMPLATE_PREAMBLE: &str =
    "Respond with a structure that mirrors this template, where `context` reproduces the exact user prompt:";

/// Escape `value` for embedding inside a JSON string literal.
///
/// Only backslash, double quote, line breaks (`\n` and `\r\n`) and tabs are escaped.
#[must_use]
pub fn escape_json_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' if chars.peek() == Some(&'\n') => {
                chars.next();
                out.push_str("\\n");
            }
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

/// The literal JSON skeleton with `context` set to the escaped, trimmed prompt.
#[must_use]
pub fn build_template(original: &str) -> String {
    let context = escape_json_string(original.trim());
    format!(
        "{{\n  \"context\": \"{context}\",\n  \"analysis\": [],\n  \"steps\": [],\n  \"answer\": \"\"\n}}"
    )
}

/// Template instruction fragment for `original`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateInstruction {
    text: String,
}

impl TemplateInstruction {
    #[must_use]
    pub fn for_prompt(original: &str) -> Self {
        Self {
            text: format!(
                "{TEMPLATE_PREAMBLE}\n```json\n{}\n```",
                build_template(original)
            ),
        }
    }
}

impl Fragment for TemplateInstruction {
    fn text(&self) -> &str {
        &self.text
    }

    fn marker(&self) -> &str {
        TEMPLATE_PREAMBLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn escape_handles_quotes_backslashes_and_breaks() {
        assert_eq!(
            escape_json_string("say \"hi\"\\\n\tok\r\nend"),
            "say \\\"hi\\\"\\\\\\n\\tok\\nend"
        );
    }

    #[test]
    fn template_parses_as_json_with_empty_slots() {
        let template = build_template("  Line \"one\"\nline two  ");
        let value: Value = match serde_json::from_str(&template) {
            Ok(value) => value,
            Err(err) => panic!("template should be valid JSON: {err}"),
        };
        assert_eq!(value["context"], "Line \"one\"\nline two");
        assert_eq!(value["analysis"], Value::Array(Vec::new()));
        assert_eq!(value["steps"], Value::Array(Vec::new()));
        assert_eq!(value["answer"], "");
    }

    #[test]
    fn instruction_wraps_template_in_fence() {
        let instruction = TemplateInstruction::for_prompt("Hi");
        assert!(instruction.text().starts_with(TEMPLATE_PREAMBLE));
        assert!(instruction.text().contains("\n```json\n{\n  \"context\": \"Hi\","));
        assert!(instruction.text().ends_with("}\n```"));
        assert_eq!(instruction.marker(), TEMPLATE_PREAMBLE);
    }
}
