/*!
 * Speaker segmentation.
 *
 * Without a speaker map the whole document is read as prose with one voice.
 * With a speaker map, top-level paragraphs are scanned line by line and each
 * `[speaker: NAME]` tag opens a new segment spoken with NAME's voice.
 */

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::{Node, NodeKind};
use crate::errors::SpeechError;
use crate::front_matter::{FrontMatter, SpeakerVoice};

static SPEAKER_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\[speaker:\s*(.+?)\]\s*(.*)$").unwrap());

/// Text attributed to one speaker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerSegment {
    /// Speaker name as written in the tag
    pub speaker: String,
    /// Spoken text
    pub text: String,
}

/// Text resolved to the voice that will speak it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSegment {
    /// Provider voice identifier
    pub voice: String,
    /// Spoken text
    pub text: String,
}

/// Decide what is spoken, and by which voice
pub fn plan_segments(tree: &Node, config: &FrontMatter, default_voice: &str) -> Result<Vec<VoiceSegment>, SpeechError> {
    let speaker_map = config.speaker_map()?;

    if speaker_map.is_empty() {
        let voice = config.tts_voice().unwrap_or(default_voice).to_string();
        let text = document_prose(tree);
        debug!("Single-voice speech with voice {}", voice);
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        return Ok(vec![VoiceSegment { voice, text }]);
    }

    resolve_voices(&speaker_segments(tree), &speaker_map)
}

/// Flatten every speakable block of the document to prose, one block per line
pub fn document_prose(tree: &Node) -> String {
    let mut blocks = Vec::new();
    collect_prose(tree, &mut blocks);
    blocks.join("\n")
}

fn collect_prose(node: &Node, blocks: &mut Vec<String>) {
    match &node.kind {
        NodeKind::Code { .. } | NodeKind::Html(_) | NodeKind::ThematicBreak | NodeKind::RowMarker { .. } => {}
        NodeKind::Heading { .. } | NodeKind::Paragraph => {
            let text = node
                .plain_text()
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            if !text.is_empty() {
                blocks.push(text);
            }
        }
        _ => {
            for child in &node.children {
                collect_prose(child, blocks);
            }
        }
    }
}

/// Split top-level paragraphs into speaker segments
pub fn speaker_segments(tree: &Node) -> Vec<SpeakerSegment> {
    let mut segments = Vec::new();
    let mut current: Option<SpeakerSegment> = None;
    let mut skipped_untagged = false;

    for paragraph in tree.children.iter().filter(|n| n.kind == NodeKind::Paragraph) {
        let text = paragraph.plain_text();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(caps) = SPEAKER_TAG.captures(line) {
                if let Some(done) = current.take() {
                    push_segment(&mut segments, done);
                }
                current = Some(SpeakerSegment {
                    speaker: caps[1].trim().to_string(),
                    text: caps[2].trim().to_string(),
                });
            } else if let Some(segment) = current.as_mut() {
                if !segment.text.is_empty() {
                    segment.text.push(' ');
                }
                segment.text.push_str(line);
            } else {
                skipped_untagged = true;
            }
        }
    }

    if let Some(done) = current.take() {
        push_segment(&mut segments, done);
    }

    if skipped_untagged {
        warn!("Skipping text before the first [speaker: ...] tag");
    }

    segments
}

fn push_segment(segments: &mut Vec<SpeakerSegment>, segment: SpeakerSegment) {
    if !segment.text.is_empty() {
        segments.push(segment);
    }
}

/// Look up each segment's voice; speaker names compare case-insensitively
pub fn resolve_voices(segments: &[SpeakerSegment], speaker_map: &[SpeakerVoice]) -> Result<Vec<VoiceSegment>, SpeechError> {
    segments
        .iter()
        .map(|segment| {
            let entry = speaker_map
                .iter()
                .find(|entry| entry.speaker.trim().eq_ignore_ascii_case(&segment.speaker))
                .ok_or_else(|| SpeechError::UnknownSpeaker(segment.speaker.clone()))?;
            Ok(VoiceSegment {
                voice: entry.voice.trim().to_string(),
                text: segment.text.clone(),
            })
        })
        .collect()
}
