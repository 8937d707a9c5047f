//! Text Normalization
//!
//! Cleans typed commands before intent matching: collapses whitespace,
//! fixes configured typos and strips conversational prefixes. Case is kept
//! so extracted queries reach providers as the user wrote them.

use std::collections::HashMap;

/// Conversational prefixes that carry no intent, matched case-insensitively
const PREFIXES: &[&str] = &[
    "hey ",
    "hi ",
    "ok ",
    "okay ",
    "please ",
    "can you ",
    "could you ",
    "would you ",
    "will you ",
    "i want you to ",
    "i'd like you to ",
];

/// Normalizes typed commands
pub struct TextNormalizer {
    /// Word-level corrections from config, keyed by lowercase word
    corrections: HashMap<String, String>,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

impl TextNormalizer {
    pub fn new(corrections: HashMap<String, String>) -> Self {
        let corrections = corrections
            .into_iter()
            .map(|(from, to)| (from.to_lowercase(), to))
            .collect();
        Self { corrections }
    }

    /// Normalize a command
    pub fn normalize(&self, text: &str) -> String {
        let corrected: Vec<String> = text
            .split_whitespace()
            .map(|word| {
                self.corrections
                    .get(&word.to_lowercase())
                    .cloned()
                    .unwrap_or_else(|| word.to_string())
            })
            .collect();
        let mut result = corrected.join(" ");

        // Strip conversational prefixes, matched in place so slicing stays on char boundaries
        while let Some(prefix) = PREFIXES.iter().find(|p| {
            result
                .get(..p.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(p))
        }) {
            result = result[prefix.len()..].trim_start().to_string();
        }

        result.trim().to_string()
    }
}
