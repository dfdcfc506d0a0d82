/*!
 * Operation engine.
 *
 * Applies a batch of operations to one document tree strictly in the order
 * given. Each operation stands alone: an unknown name is reported and skipped,
 * and a failing handler is logged and recorded without stopping the rest of
 * the batch. Export operations leave the tree untouched and hand their bytes
 * back under a well-known artifact key.
 */

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::Serialize;
use serde_json::Value;

use super::{Operation, OperationKind, change_heading, convert_to_doc, convert_to_mp3, emphasize_text};
use super::{generate_toc::generate_toc, heading_numbering::add_heading_numbering};
use crate::document::Node;
use crate::errors::OperationError;
use crate::front_matter::FrontMatter;
use crate::speech::SpeechSynthesizer;

/// Binary artifact produced by an export operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Docx,
    Mp3,
}

impl ArtifactKind {
    /// Key the artifact is reported under
    pub fn key(&self) -> &'static str {
        match self {
            Self::Docx => "docx",
            Self::Mp3 => "mp3",
        }
    }

    /// File extension for the artifact
    pub fn extension(&self) -> &'static str {
        self.key()
    }
}

/// A handler failure, tied to its position in the batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationFailure {
    /// Index of the operation in the batch
    pub index: usize,
    /// Operation type name
    pub operation: String,
    /// Error description
    pub message: String,
}

/// Aggregate report of one batch application
#[derive(Debug, Clone, Default)]
pub struct ApplyOutcome {
    /// Export bytes, by artifact kind
    pub artifacts: HashMap<ArtifactKind, Vec<u8>>,
    /// Operations that ran successfully, in batch order
    pub applied: Vec<OperationKind>,
    /// Operation names outside the vocabulary
    pub unknown: Vec<String>,
    /// Operations whose handler failed
    pub failures: Vec<OperationFailure>,
}

impl ApplyOutcome {
    /// True when every operation in the batch ran
    pub fn is_clean(&self) -> bool {
        self.unknown.is_empty() && self.failures.is_empty()
    }
}

/// Applies operation batches; holds the collaborators export handlers need
#[derive(Debug, Clone, Default)]
pub struct OperationEngine {
    /// Speech backend for `convert_to_mp3`
    synthesizer: Option<Arc<SpeechSynthesizer>>,
}

impl OperationEngine {
    /// Engine without speech support
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that can export audio
    pub fn with_synthesizer(synthesizer: Arc<SpeechSynthesizer>) -> Self {
        Self {
            synthesizer: Some(synthesizer),
        }
    }

    /// Apply `operations` to `tree` in order
    pub async fn apply_operations(
        &self,
        tree: &mut Node,
        operations: &[Operation],
        config: &FrontMatter,
        request_id: &str,
    ) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();

        for (index, operation) in operations.iter().enumerate() {
            let Some(kind) = operation.kind() else {
                warn!("[{}] Unknown operation type: \"{}\"", request_id, operation.op_type);
                outcome.unknown.push(operation.op_type.clone());
                continue;
            };

            match self.apply_one(kind, tree, &operation.parameters, config, request_id).await {
                Ok(artifact) => {
                    if let Some((artifact_kind, bytes)) = artifact {
                        debug!("[{}] {} produced {} bytes", request_id, kind, bytes.len());
                        outcome.artifacts.insert(artifact_kind, bytes);
                    }
                    outcome.applied.push(kind);
                }
                Err(e) => {
                    error!("[{}] Failed to apply operation {}: {}", request_id, kind, e);
                    outcome.failures.push(OperationFailure {
                        index,
                        operation: kind.name().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            "[{}] Applied {}/{} operations ({} unknown, {} failed)",
            request_id,
            outcome.applied.len(),
            operations.len(),
            outcome.unknown.len(),
            outcome.failures.len()
        );
        outcome
    }

    async fn apply_one(
        &self,
        kind: OperationKind,
        tree: &mut Node,
        parameters: &Value,
        config: &FrontMatter,
        request_id: &str,
    ) -> Result<Option<(ArtifactKind, Vec<u8>)>, OperationError> {
        match kind {
            OperationKind::ChangeHeading => {
                let changed = change_heading::apply(tree, parameters)?;
                debug!("[{}] change_heading touched {} heading(s)", request_id, changed);
                Ok(None)
            }
            OperationKind::EmphasizeText => {
                let wrapped = emphasize_text::apply(tree, parameters)?;
                debug!("[{}] emphasize_text wrapped {} occurrence(s)", request_id, wrapped);
                Ok(None)
            }
            OperationKind::GenerateToc => {
                let entries = generate_toc(tree);
                debug!("[{}] generate_toc listed {} heading(s)", request_id, entries);
                Ok(None)
            }
            OperationKind::AddHeadingNumbering => {
                let numbered = add_heading_numbering(tree);
                debug!("[{}] add_heading_numbering prefixed {} heading(s)", request_id, numbered);
                Ok(None)
            }
            OperationKind::ConvertToDoc => {
                let bytes = convert_to_doc::convert_to_doc(tree, request_id)?;
                Ok(Some((ArtifactKind::Docx, bytes)))
            }
            OperationKind::ConvertToMp3 => {
                let synthesizer = self
                    .synthesizer
                    .as_deref()
                    .ok_or_else(|| OperationError::Unavailable(kind.name().to_string()))?;
                let bytes = convert_to_mp3::convert_to_mp3(tree, config, synthesizer, request_id).await?;
                Ok(Some((ArtifactKind::Mp3, bytes)))
            }
        }
    }
}
