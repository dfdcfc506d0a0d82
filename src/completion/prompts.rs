/*!
 * Prompt templates for instruction interpretation.
 *
 * Two command modes are supported:
 * - `operations`: the model answers with an operation batch in JSON, using
 *   the row markers appended to each line to address specific lines
 * - `free-form`: the model answers with the complete rewritten document
 */

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::operations::OperationKind;

/// System message sent with every command
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant for restructuring and restyling markdown documents.";

const OPERATIONS_PREAMBLE: &str = "You are an assistant that helps restructure and restyle Markdown documents. Given the following command and document content, provide the necessary instructions to modify the document using only the available operations. Be creative and use operations repeatedly if needed to fulfill the command.";

const ROW_MARKER_NOTES: &str = r#"### Important Notes about Row Numbers:
- Every line of the document ends with a technical row marker such as [ROW 8]. Row numbers may not match the visual content lines.
- To target a specific line, pass its row number as the "lineNumber" parameter.
- Never copy row markers into "match", "newText" or "text" values."#;

const OUTPUT_FORMAT: &str = r#"Provide the instructions in the following JSON format:

{
  "operations": [
    {
      "type": "operation_type",
      "parameters": { ... }
    }
  ]
}"#;

const EXAMPLES: &str = r#"1. If the command is "Change the heading 'Introduction' to 'Overview' and add '-Updated' to the 'Features' heading", the JSON should look like:

{
  "operations": [
    { "type": "change_heading", "parameters": { "match": "Introduction", "newText": "Overview" } },
    { "type": "change_heading", "parameters": { "match": "Features", "newText": "Features-Updated" } }
  ]
}

2. If the command is "Emphasize the words 'important' and 'crucial' across the document", the JSON should look like:

{
  "operations": [
    { "type": "emphasize_text", "parameters": { "text": "important" } },
    { "type": "emphasize_text", "parameters": { "text": "crucial" } }
  ]
}

3. If the command is "Emphasize the word 'important' only on line 3", the JSON should look like:

{
  "operations": [
    { "type": "emphasize_text", "parameters": { "text": "important", "lineNumber": 3 } }
  ]
}"#;

const OPERATIONS_CLOSING: &str = "Only provide the JSON without any additional text. Use only the available operations listed above, applying them creatively and repeatedly if necessary. If the command absolutely cannot be fulfilled using the available operations, return an empty operations array.";

const FREE_FORM_PREAMBLE: &str = "You are an assistant that rewrites Markdown documents. Apply the following command to the document and return the complete modified document.";

const FREE_FORM_CLOSING: &str = "Return only the Markdown document, without explanations and without wrapping it in a code block.";

/// How a command is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandMode {
    /// The model picks operations from the fixed vocabulary
    #[default]
    Operations,
    /// The model rewrites the whole body
    FreeForm,
}

impl fmt::Display for CommandMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operations => f.write_str("operations"),
            Self::FreeForm => f.write_str("free-form"),
        }
    }
}

impl FromStr for CommandMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "operations" | "default" => Ok(Self::Operations),
            "free-form" | "freeform" | "free_form" => Ok(Self::FreeForm),
            _ => Err(anyhow!("Invalid command mode: {}", s)),
        }
    }
}

/// Prompt asking for an operation batch; `annotated_body` carries row markers
pub fn operations_prompt(command: &str, annotated_body: &str) -> String {
    let vocabulary = OperationKind::ALL
        .iter()
        .enumerate()
        .map(|(i, kind)| format!("{}. {}: {}", i + 1, kind.name(), kind.description()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{OPERATIONS_PREAMBLE}\n\n**Command**: {command}\n**Document Content**:\n{annotated_body}\n\nAvailable operations:\n{vocabulary}\n\n{ROW_MARKER_NOTES}\n\n{OUTPUT_FORMAT}\n\n{EXAMPLES}\n\n{OPERATIONS_CLOSING}\n"
    )
}

/// Prompt asking for the rewritten document
pub fn free_form_prompt(command: &str, body: &str) -> String {
    format!("{FREE_FORM_PREAMBLE}\n\n**Command**: {command}\n**Document Content**:\n{body}\n\n{FREE_FORM_CLOSING}\n")
}

/// Prompt for `command` in the given mode; operations prompts expect a row-marked body
pub fn build_prompt(mode: CommandMode, command: &str, body: &str) -> String {
    match mode {
        CommandMode::Operations => operations_prompt(command, body),
        CommandMode::FreeForm => free_form_prompt(command, body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operationsPrompt_shouldListVocabularyAndDocument() {
        let prompt = operations_prompt("Rename the intro", "# Intro [ROW 1]");

        for kind in OperationKind::ALL {
            assert!(prompt.contains(kind.name()), "missing {}", kind);
        }
        assert!(prompt.contains("**Command**: Rename the intro"));
        assert!(prompt.contains("# Intro [ROW 1]"));
        assert!(prompt.contains("\"lineNumber\": 3"));
    }

    #[test]
    fn test_buildPrompt_freeForm_shouldAskForWholeDocument() {
        let prompt = build_prompt(CommandMode::FreeForm, "Shorten it", "Body");

        assert!(prompt.contains("complete modified document"));
        assert!(prompt.contains("**Command**: Shorten it"));
        assert!(!prompt.contains("Available operations"));
    }

    #[test]
    fn test_commandMode_fromStr_shouldAcceptAliases() {
        assert_eq!("free-form".parse::<CommandMode>().unwrap(), CommandMode::FreeForm);
        assert_eq!("Operations".parse::<CommandMode>().unwrap(), CommandMode::Operations);
        assert!("poetry".parse::<CommandMode>().is_err());
        assert_eq!(CommandMode::FreeForm.to_string(), "free-form");
    }
}
