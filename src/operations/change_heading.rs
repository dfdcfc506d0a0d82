//! `change_heading`: literal substring replacement inside heading text.

use log::debug;
use serde_json::Value;

use super::{OperationKind, required_str};
use crate::document::{Node, NodeKind};
use crate::errors::OperationError;
use crate::row_markers::remove_marker_text;

/// Apply the operation from its wire parameters (`match`, `newText`)
pub fn apply(tree: &mut Node, parameters: &Value) -> Result<usize, OperationError> {
    let pattern = remove_marker_text(&required_str(OperationKind::ChangeHeading, parameters, &["match"])?);
    let replacement = match parameters.get("newText").or_else(|| parameters.get("new_text")) {
        Some(Value::String(text)) => remove_marker_text(text),
        _ => {
            return Err(OperationError::InvalidParameters {
                operation: OperationKind::ChangeHeading.name().to_string(),
                message: "missing string parameter \"newText\"".to_string(),
            });
        }
    };
    if pattern.is_empty() {
        return Err(OperationError::InvalidParameters {
            operation: OperationKind::ChangeHeading.name().to_string(),
            message: "\"match\" must not be empty".to_string(),
        });
    }

    Ok(change_heading(tree, &pattern, &replacement))
}

/// Replace the first occurrence of `pattern` in every text run of every heading.
///
/// When a heading only contains the pattern across inline markup, its content
/// is flattened to a single text node first. Returns the number of headings changed.
pub fn change_heading(tree: &mut Node, pattern: &str, replacement: &str) -> usize {
    if let NodeKind::Heading { .. } = tree.kind {
        return usize::from(replace_in_heading(tree, pattern, replacement));
    }

    tree.children
        .iter_mut()
        .map(|child| change_heading(child, pattern, replacement))
        .sum()
}

fn replace_in_heading(heading: &mut Node, pattern: &str, replacement: &str) -> bool {
    let mut changed = false;
    for child in heading.children.iter_mut() {
        if let NodeKind::Text(value) = &mut child.kind {
            if value.contains(pattern) {
                let updated = value.replacen(pattern, replacement, 1);
                debug!("Changing heading text from \"{}\" to \"{}\"", value, updated);
                *value = updated;
                changed = true;
            }
        }
    }
    if changed {
        return true;
    }

    let rendered = heading.plain_text();
    if !rendered.contains(pattern) {
        return false;
    }
    let updated = rendered.replacen(pattern, replacement, 1);
    debug!("Flattening heading \"{}\" to \"{}\"", rendered, updated);
    heading.children = vec![Node::text(updated)];
    true
}
