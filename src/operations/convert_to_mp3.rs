//! `convert_to_mp3`: export the document as spoken audio.

use log::debug;

use crate::document::Node;
use crate::errors::OperationError;
use crate::front_matter::FrontMatter;
use crate::row_markers::strip_row_markers;
use crate::speech::SpeechSynthesizer;

/// Speak the document (without row markers) and return the encoded audio
pub async fn convert_to_mp3(
    tree: &Node,
    config: &FrontMatter,
    synthesizer: &SpeechSynthesizer,
    request_id: &str,
) -> Result<Vec<u8>, OperationError> {
    let mut clean = tree.clone();
    let removed = strip_row_markers(&mut clean);
    debug!("[{}] Removed {} row markers before speech export", request_id, removed);

    Ok(synthesizer.synthesize(&clean, config, request_id).await?)
}
