/*!
 * Front-matter codec.
 *
 * A document may start with a YAML configuration block, either hidden in an
 * HTML comment (`<!-- ... -->`) or in the classic `--- ... ---` fence. The
 * comment form is tried first. Encoding always writes the comment form.
 */

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::errors::{FrontMatterError, SpeechError};

static COMMENT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\A<!--(.*?)\n-->(.*)\z").expect("valid comment front matter regex"));

static DASH_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\A---\n(.*?)\n---(?:\n(.*))?\z").expect("valid dash front matter regex"));

/// One `speaker_map` entry mapping a speaker tag to a synthesis voice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerVoice {
    /// Name used in `[speaker: NAME]` tags
    #[serde(rename = "Speaker")]
    pub speaker: String,

    /// Voice identifier passed to the speech provider
    #[serde(rename = "TTS_Voice")]
    pub voice: String,
}

/// Per-document configuration decoded from the front matter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    values: Mapping,
}

impl FrontMatter {
    /// Wrap an existing YAML mapping
    pub fn from_mapping(values: Mapping) -> Self {
        Self { values }
    }

    /// True when no key is set
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value of a key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Set a key, replacing any previous value
    pub fn insert(&mut self, key: &str, value: Value) {
        self.values.insert(Value::String(key.to_string()), value);
    }

    /// Underlying mapping
    pub fn values(&self) -> &Mapping {
        &self.values
    }

    /// Whether a table of contents should be generated
    pub fn toc(&self) -> bool {
        self.flag("toc")
    }

    /// Whether headings should be numbered
    pub fn numbering(&self) -> bool {
        self.flag("numbering")
    }

    /// Single-voice override for speech export
    pub fn tts_voice(&self) -> Option<&str> {
        self.get("tts_voice")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|voice| !voice.is_empty())
    }

    /// Speaker-to-voice table; empty when the key is absent or null
    pub fn speaker_map(&self) -> Result<Vec<SpeakerVoice>, SpeechError> {
        match self.get("speaker_map") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => serde_yaml::from_value(value.clone())
                .map_err(|e| SpeechError::InvalidSpeakerMap(e.to_string())),
        }
    }

    fn flag(&self, key: &str) -> bool {
        match self.get(key) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(text)) => text.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

/// Result of splitting a document into configuration and body
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Decoded configuration (empty when there is no prologue)
    pub config: FrontMatter,
    /// Remaining Markdown text
    pub body: String,
}

/// Split a document into its front matter and body.
///
/// Text without a prologue is returned verbatim with an empty configuration.
pub fn decode(text: &str) -> Result<Decoded, FrontMatterError> {
    let captures = COMMENT_BLOCK
        .captures(text)
        .or_else(|| DASH_BLOCK.captures(text));

    let Some(captures) = captures else {
        return Ok(Decoded {
            config: FrontMatter::default(),
            body: text.to_string(),
        });
    };

    let yaml = captures.get(1).map_or("", |m| m.as_str());
    let body = captures.get(2).map_or("", |m| m.as_str());

    let config = match serde_yaml::from_str::<Value>(yaml)? {
        Value::Null => FrontMatter::default(),
        Value::Mapping(values) => FrontMatter::from_mapping(values),
        other => return Err(FrontMatterError::NotAMapping(kind_name(&other).to_string())),
    };

    debug!("Decoded front matter with {} key(s)", config.values.len());
    Ok(Decoded {
        config,
        body: body.trim_start_matches(['\r', '\n']).to_string(),
    })
}

/// Like `decode`, but a malformed prologue is logged and treated as absent
pub fn decode_lenient(text: &str) -> Decoded {
    match decode(text) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("Ignoring front matter: {}", e);
            Decoded {
                config: FrontMatter::default(),
                body: text.to_string(),
            }
        }
    }
}

/// Reattach a configuration to a body. An empty configuration leaves the body unchanged.
pub fn encode(config: &FrontMatter, body: &str) -> Result<String, FrontMatterError> {
    if config.is_empty() {
        return Ok(body.to_string());
    }

    let yaml = serde_yaml::to_string(&config.values)?;
    Ok(format!("<!--\n{}\n-->\n\n{}", yaml.trim_end(), body))
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
