//! Static practice content: scripted dialogues and vocabulary items.
//!
//! The catalog is authored offline, loaded once at startup, and never mutated
//! at runtime. Turn order within a dialogue is fixed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two conversational roles in a dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    A,
    B,
}

impl Speaker {
    /// The opposite role; in roleplay this is the system-voiced partner.
    pub fn other(self) -> Self {
        match self {
            Speaker::A => Speaker::B,
            Speaker::B => Speaker::A,
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::A => write!(f, "A"),
            Speaker::B => write!(f, "B"),
        }
    }
}

/// One line of a dialogue, attributed to speaker A or B.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueTurn {
    pub id: u32,
    pub speaker: Speaker,
    /// The sentence in the language being learned.
    pub text_target: String,
    /// The translation in the learner's native language.
    pub text_native: String,
}

/// An ordered, fixed script of alternating speaker turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dialogue {
    pub id: u32,
    pub title: String,
    pub category: String,
    pub turns: Vec<DialogueTurn>,
}

/// A single vocabulary item for word practice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabItem {
    pub id: u32,
    pub text_target: String,
    pub text_native: String,
    pub category: String,
}

/// The complete set of practice content available to a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub dialogues: Vec<Dialogue>,
    pub words: Vec<VocabItem>,
}

impl Catalog {
    pub fn dialogue(&self, index: usize) -> Option<&Dialogue> {
        self.dialogues.get(index)
    }

    pub fn word(&self, index: usize) -> Option<&VocabItem> {
        self.words.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speaker_other() {
        assert_eq!(Speaker::A.other(), Speaker::B);
        assert_eq!(Speaker::B.other(), Speaker::A);
    }

    #[test]
    fn test_speaker_serialization() {
        assert_eq!(serde_json::to_string(&Speaker::A).unwrap(), "\"A\"");
        let b: Speaker = serde_json::from_str("\"B\"").unwrap();
        assert_eq!(b, Speaker::B);
    }

    #[test]
    fn test_catalog_deserialization() {
        let json = r#"{
            "dialogues": [
                {
                    "id": 1,
                    "title": "Ordering at a cafe",
                    "category": "Meals",
                    "turns": [
                        { "id": 101, "speaker": "A", "text_target": "What can I get for you?", "text_native": "..." },
                        { "id": 102, "speaker": "B", "text_target": "A coffee, please.", "text_native": "..." }
                    ]
                }
            ],
            "words": [
                { "id": 1001, "text_target": "Definitely", "text_native": "...", "category": "Adverb" }
            ]
        }"#;

        let catalog: Catalog = serde_json::from_str(json).unwrap();
        assert_eq!(catalog.dialogues.len(), 1);
        assert_eq!(catalog.words.len(), 1);
        assert_eq!(catalog.dialogue(0).unwrap().turns[1].speaker, Speaker::B);
        assert!(catalog.dialogue(1).is_none());
        assert_eq!(catalog.word(0).unwrap().id, 1001);
    }
}
