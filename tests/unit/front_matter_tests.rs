/*!
 * Tests for the front matter codec on whole documents
 */

use mdcraft::front_matter::{FrontMatter, SpeakerVoice, decode, decode_lenient, encode};
use serde_yaml::Value;

use crate::common::{DIALOGUE_DOC, REPORT_DOC};

#[test]
fn test_decode_dialogueDoc_shouldExposeSpeakerMapAndBody() {
    let decoded = decode(DIALOGUE_DOC).unwrap();
    let speakers = decoded.config.speaker_map().unwrap();

    assert_eq!(
        speakers,
        vec![
            SpeakerVoice { speaker: "Alice".into(), voice: "nova".into() },
            SpeakerVoice { speaker: "Bob".into(), voice: "onyx".into() },
        ]
    );
    assert!(decoded.body.starts_with("[speaker: Alice] Hi Bob."));
    assert!(!decoded.config.toc());
    assert_eq!(decoded.config.tts_voice(), None);
}

#[test]
fn test_decode_plainDocument_shouldKeepTextVerbatim() {
    let decoded = decode(REPORT_DOC).unwrap();

    assert!(decoded.config.is_empty());
    assert_eq!(decoded.body, REPORT_DOC);
}

#[test]
fn test_encode_thenDecode_withDialogue_shouldPreserveConfigAndBody() {
    let decoded = decode(DIALOGUE_DOC).unwrap();
    let encoded = encode(&decoded.config, &decoded.body).unwrap();

    assert!(encoded.starts_with("<!--\n"));
    assert_eq!(decode(&encoded).unwrap(), decoded);
}

#[test]
fn test_encode_dashInput_shouldWriteCommentForm() {
    let decoded = decode("---\nnumbering: true\n---\n# A\n").unwrap();

    assert_eq!(encode(&decoded.config, &decoded.body).unwrap(), "<!--\nnumbering: true\n-->\n\n# A\n");
}

#[test]
fn test_flags_stringValues_shouldBeCaseInsensitive() {
    let decoded = decode("<!--\ntoc: \"TRUE\"\nnumbering: \"no\"\n-->\nBody\n").unwrap();

    assert!(decoded.config.toc());
    assert!(!decoded.config.numbering());
}

#[test]
fn test_ttsVoice_blankValue_shouldBeIgnored() {
    let decoded = decode("<!--\ntts_voice: \"  \"\n-->\nBody\n").unwrap();

    assert_eq!(decoded.config.tts_voice(), None);
}

#[test]
fn test_insert_thenEncode_shouldCarryNewKey() {
    let mut config = FrontMatter::default();
    config.insert("toc", Value::Bool(true));

    let encoded = encode(&config, "# Title\n").unwrap();

    assert!(decode(&encoded).unwrap().config.toc());
}

#[test]
fn test_decodeLenient_unterminatedSequence_shouldKeepWholeText() {
    let text = "<!--\nspeaker_map: [\n-->\n\nHello\n";
    let decoded = decode_lenient(text);

    assert!(decoded.config.is_empty());
    assert_eq!(decoded.body, text);
}
