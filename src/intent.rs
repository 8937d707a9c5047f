//! Intent Classification
//!
//! Maps a typed command to exactly one [`Intent`]. Classification is an
//! ordered rule table evaluated top-down; the first rule that produces an
//! intent wins and [`Intent::Chat`] is the fallback. Rules that need an
//! argument (a query, a URL, a description) never hand an empty one to a
//! provider: they fail over to `Chat` carrying the missing-argument message.

use crate::core::TextNormalizer;
use crate::utils::fuzzy::find_best_match;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

lazy_static! {
    static ref URL: Regex = Regex::new(
        r#"(?i)https?://(?:localhost|[a-z0-9](?:[a-z0-9-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]*[a-z0-9])?)+)(?::\d{1,5})?(?:[/?#][^\s<>"']*)?"#
    )
    .unwrap();
}

pub const MISSING_URL: &str = "No valid URL found in command";
pub const MISSING_QUERY: &str = "No search query found in command";
pub const MISSING_DESCRIPTION: &str = "No content description found in command";
pub const EMPTY_COMMAND: &str = "Command is empty";

const GENERATION_VERBS: &[&str] = &["write", "create", "generate", "draft", "compose"];
const INSERTION_VERBS: &[&str] = &["insert", "add", "put", "append", "paste"];
const SEARCH_VERBS: &[&str] = &["look up", "search for", "search", "lookup", "find", "google"];
const CRAWL_VERBS: &[&str] = &["crawl", "scrape", "fetch"];
const SUMMARIZE_VERBS: &[&str] = &["sum up", "summarize", "summarise", "summary", "tl;dr", "tldr"];
const SELECTION_WORDS: &[&str] = &["selection", "selected", "highlighted"];

/// Words stripped from the front of an extracted argument
const LEADING_FILLER: &[&str] = &["for", "please", "and", "to", "me", "about", "on"];

/// Words stripped from the end of an extracted argument
const TRAILING_FILLER: &[&str] = &[
    "and", "for", "please", "into", "in", "to", "the", "it", "this", "that", "them", "editor",
    "document", "doc", "here", "there", "below", "then", "online",
];

/// Extra words allowed after an insertion verb ("add the results below")
const INSERTION_OBJECTS: &[&str] = &["results", "result", "them", "answer", "output"];

/// Leading words dropped from inline summarize content
const CONTENT_FILLER: &[&str] = &["this", "the", "following", "text", "of", "for", "me", "please"];

/// Words that may surround a transform verb without naming a subject
const TRANSFORM_FILLER: &[&str] = &[
    "make", "it", "this", "that", "the", "a", "an", "more", "less", "tone", "sound", "editor",
    "document", "doc", "text", "content", "selection", "selected", "highlighted", "paragraph",
    "my", "of", "to", "in", "into", "please", "and", "for", "fix", "correct", "check",
    "convert", "turn", "change", "be", "give", "me", "quick", "short", "brief", "bit", "little",
    "version", "style", "whole", "entire", "all", "everything", "up", "its", "language",
    "writing", "wording", "as", "so", "sounds", "use",
];

/// Kind of editor transform offered by the floating toolbar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformKind {
    Grammar,
    Professional,
    Casual,
    Summarize,
    Shorten,
    Lengthen,
    Formal,
    CasualTone,
    Table,
    Enhance,
}

impl TransformKind {
    pub const ALL: [TransformKind; 10] = [
        TransformKind::Grammar,
        TransformKind::Professional,
        TransformKind::Casual,
        TransformKind::Summarize,
        TransformKind::Shorten,
        TransformKind::Lengthen,
        TransformKind::Formal,
        TransformKind::CasualTone,
        TransformKind::Table,
        TransformKind::Enhance,
    ];

    /// Stable kebab-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformKind::Grammar => "grammar",
            TransformKind::Professional => "professional",
            TransformKind::Casual => "casual",
            TransformKind::Summarize => "summarize",
            TransformKind::Shorten => "shorten",
            TransformKind::Lengthen => "lengthen",
            TransformKind::Formal => "formal",
            TransformKind::CasualTone => "casual-tone",
            TransformKind::Table => "table",
            TransformKind::Enhance => "enhance",
        }
    }

    /// Phrases that select this transform inside a command
    fn triggers(&self) -> &'static [&'static str] {
        match self {
            TransformKind::Grammar => &[
                "grammar", "grammatical", "spelling", "spell check", "typos", "proofread",
            ],
            TransformKind::Professional => &["professional", "professionally"],
            TransformKind::Casual => &["casual", "casually", "informal"],
            TransformKind::Summarize => SUMMARIZE_VERBS,
            TransformKind::Shorten => &["shorten", "shorter", "concise", "condense", "trim"],
            TransformKind::Lengthen => &["lengthen", "longer", "expand", "elaborate"],
            TransformKind::Formal => &["formal", "formally"],
            TransformKind::CasualTone => &[
                "casual tone", "friendly tone", "conversational tone", "friendlier", "friendly",
            ],
            TransformKind::Table => &["table", "tabulate", "tabular"],
            TransformKind::Enhance => &["enhance", "improve", "polish", "rewrite", "refine"],
        }
    }

    /// Scan order for commands; `CasualTone` must precede `Casual`
    fn detection_order() -> [TransformKind; 10] {
        [
            TransformKind::Grammar,
            TransformKind::Professional,
            TransformKind::CasualTone,
            TransformKind::Casual,
            TransformKind::Formal,
            TransformKind::Summarize,
            TransformKind::Shorten,
            TransformKind::Lengthen,
            TransformKind::Table,
            TransformKind::Enhance,
        ]
    }

    /// Map a toolbar label or typed action name to a transform
    ///
    /// Exact aliases first, then fuzzy matching above `cutoff`.
    pub fn from_label(label: &str, cutoff: f64) -> Option<TransformKind> {
        let aliases: Vec<(String, TransformKind)> = Self::ALL
            .iter()
            .flat_map(|kind| {
                let mut names = vec![kind.as_str().to_string()];
                names.extend(kind.triggers().iter().map(|t| t.to_string()));
                names.push(format!("make {}", kind.as_str()));
                names.into_iter().map(move |n| (n, *kind))
            })
            .chain([
                ("fix grammar".to_string(), TransformKind::Grammar),
                ("make shorter".to_string(), TransformKind::Shorten),
                ("make longer".to_string(), TransformKind::Lengthen),
                ("convert to table".to_string(), TransformKind::Table),
            ])
            .collect();

        let candidates: Vec<String> = aliases.iter().map(|(name, _)| name.clone()).collect();
        let best = find_best_match(label, &candidates, cutoff)?;
        aliases
            .into_iter()
            .find(|(name, _)| *name == best.value)
            .map(|(_, kind)| kind)
    }

    /// Prompt asking the model to rewrite `text`
    pub fn prompt(&self, text: &str) -> String {
        let instruction = match self {
            TransformKind::Grammar => {
                "Fix the grammar, spelling and punctuation of the following text. Keep the meaning and wording otherwise unchanged."
            }
            TransformKind::Professional => {
                "Rewrite the following text in a professional tone suitable for business communication."
            }
            TransformKind::Casual => "Rewrite the following text so it reads casual and relaxed.",
            TransformKind::Summarize => "Summarize the following text concisely.",
            TransformKind::Shorten => {
                "Shorten the following text while keeping its key points."
            }
            TransformKind::Lengthen => {
                "Expand the following text with more detail while keeping its meaning."
            }
            TransformKind::Formal => "Rewrite the following text in a formal register.",
            TransformKind::CasualTone => {
                "Rewrite the following text in a friendly, conversational tone."
            }
            TransformKind::Table => {
                "Convert the following text into a markdown table with a header row."
            }
            TransformKind::Enhance => {
                "Improve the clarity, flow and word choice of the following text."
            }
        };
        format!(
            "{instruction}\nRespond with only the rewritten text, without explanations or quotes.\n\nText:\n{text}"
        )
    }
}

impl std::fmt::Display for TransformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What part of the document a transform applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformScope {
    Selection,
    Document,
}

/// The classified action a command maps to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    WebSearch { query: String, auto_insert: bool },
    Crawl { url: String },
    Summarize { text: Option<String> },
    EditorTransform { kind: TransformKind, scope: TransformScope },
    CreateAndInsert { prompt: String },
    /// Free-form chat. `missing` carries the message of a rule that matched
    /// but had nothing to act on; such intents never reach a provider.
    Chat { prompt: String, missing: Option<String> },
}

impl Intent {
    fn chat(prompt: &str) -> Self {
        Intent::Chat {
            prompt: prompt.to_string(),
            missing: None,
        }
    }

    fn missing(prompt: &str, message: &str) -> Self {
        Intent::Chat {
            prompt: prompt.to_string(),
            missing: Some(message.to_string()),
        }
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Intent::WebSearch { .. } => "web_search",
            Intent::Crawl { .. } => "crawl",
            Intent::Summarize { .. } => "summarize",
            Intent::EditorTransform { .. } => "editor_transform",
            Intent::CreateAndInsert { .. } => "create_and_insert",
            Intent::Chat { .. } => "chat",
        }
    }
}

/// A command word with its matching key
#[derive(Debug, Clone)]
struct Word {
    raw: String,
    key: String,
}

/// Tokenized command shared by every rule
struct Command {
    text: String,
    words: Vec<Word>,
}

impl Command {
    fn new(text: String) -> Self {
        let words = text
            .split_whitespace()
            .map(|raw| Word {
                raw: raw.to_string(),
                key: raw
                    .trim_matches(|c: char| !c.is_alphanumeric() && c != ';')
                    .trim_matches(';')
                    .to_lowercase(),
            })
            .collect();
        Self { text, words }
    }

    /// Index span of the first occurrence of any phrase
    fn find_any(&self, phrases: &[&str]) -> Option<(usize, usize)> {
        for start in 0..self.words.len() {
            for phrase in phrases {
                if let Some(len) = phrase_at(&self.words, start, phrase) {
                    return Some((start, start + len));
                }
            }
        }
        None
    }

    fn contains_any(&self, phrases: &[&str]) -> bool {
        self.find_any(phrases).is_some()
    }

    /// Start of a trailing insertion clause such as "and insert it into the editor"
    fn insertion_tail(&self) -> Option<usize> {
        (0..self.words.len()).rev().find(|&i| {
            INSERTION_VERBS.contains(&self.words[i].key.as_str())
                && self.words[i + 1..].iter().all(|w| {
                    TRAILING_FILLER.contains(&w.key.as_str())
                        || INSERTION_OBJECTS.contains(&w.key.as_str())
                })
        })
    }
}

/// Number of words `phrase` spans when it matches at `start`
fn phrase_at(words: &[Word], start: usize, phrase: &str) -> Option<usize> {
    let parts: Vec<&str> = phrase.split(' ').collect();
    if start + parts.len() > words.len() {
        return None;
    }
    parts
        .iter()
        .zip(&words[start..])
        .all(|(part, word)| word.key == *part)
        .then_some(parts.len())
}

/// Join words after dropping filler from both edges
fn extract(words: &[Word]) -> String {
    let mut slice = words;
    while let Some(first) = slice.first() {
        if LEADING_FILLER.contains(&first.key.as_str()) || first.key.is_empty() {
            slice = &slice[1..];
        } else {
            break;
        }
    }
    while let Some(last) = slice.last() {
        if TRAILING_FILLER.contains(&last.key.as_str()) || last.key.is_empty() {
            slice = &slice[..slice.len() - 1];
        } else {
            break;
        }
    }
    join(slice)
}

fn join(words: &[Word]) -> String {
    words
        .iter()
        .map(|w| w.raw.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| matches!(c, ',' | ';' | ':' | '-'))
        .trim()
        .to_string()
}

/// A URL literal, without trailing sentence punctuation
///
/// A closing bracket is kept when the URL opens a matching one, as in
/// `wiki/Rust_(programming_language)`.
fn find_url(text: &str) -> Option<&str> {
    let mut url = URL.find(text)?.as_str();
    loop {
        let trimmed = url.trim_end_matches(['.', ',', ';', ':', '!', '?', '\'', '"']);
        let trimmed = match trimmed.chars().last() {
            Some(close @ (')' | ']')) => {
                let open = if close == ')' { '(' } else { '[' };
                if trimmed.matches(close).count() > trimmed.matches(open).count() {
                    &trimmed[..trimmed.len() - 1]
                } else {
                    trimmed
                }
            }
            _ => trimmed,
        };
        if trimmed.len() == url.len() {
            return Some(url);
        }
        url = trimmed;
    }
}

type Rule = fn(&Command) -> Option<Intent>;

/// Ordered rule table, first match wins
const RULES: &[(&str, Rule)] = &[
    ("crawl_url", rule_crawl_url),
    ("editor_transform", rule_editor_transform),
    ("create_and_insert", rule_create_and_insert),
    ("web_search", rule_web_search),
    ("crawl_without_url", rule_crawl_without_url),
    ("summarize_inline", rule_summarize_inline),
];

/// A URL literal always promotes to `Crawl`
fn rule_crawl_url(cmd: &Command) -> Option<Intent> {
    find_url(&cmd.text).map(|url| Intent::Crawl {
        url: url.to_string(),
    })
}

/// A transform verb with no subject of its own applies to the editor
fn rule_editor_transform(cmd: &Command) -> Option<Intent> {
    for kind in TransformKind::detection_order() {
        let Some((start, end)) = cmd.find_any(kind.triggers()) else {
            continue;
        };

        let subject: Vec<&Word> = cmd
            .words
            .iter()
            .enumerate()
            .filter(|(i, _)| *i < start || *i >= end)
            .map(|(_, w)| w)
            .filter(|w| !w.key.is_empty() && !TRANSFORM_FILLER.contains(&w.key.as_str()))
            .collect();

        if !subject.is_empty() {
            debug!(
                "Transform '{}' has explicit subject ({} words), not an editor transform",
                kind,
                subject.len()
            );
            return None;
        }

        let scope = if cmd.contains_any(SELECTION_WORDS) {
            TransformScope::Selection
        } else {
            TransformScope::Document
        };
        return Some(Intent::EditorTransform { kind, scope });
    }
    None
}

/// "write X and insert" style commands
fn rule_create_and_insert(cmd: &Command) -> Option<Intent> {
    let (gen_start, gen_end) = cmd.find_any(GENERATION_VERBS)?;

    // Insertion clause at the end ("write X and insert it")
    let tail = cmd.insertion_tail();
    // Or straight after the verb ("write and insert X")
    let inline = match tail {
        Some(_) => None,
        None => {
            let mut i = gen_end;
            if cmd.words.get(i).map(|w| w.key.as_str()) == Some("and") {
                i += 1;
            }
            cmd.words
                .get(i)
                .filter(|w| INSERTION_VERBS.contains(&w.key.as_str()))
                .map(|_| i)
        }
    };
    if tail.is_none() && inline.is_none() {
        return None;
    }

    let words: Vec<Word> = cmd
        .words
        .iter()
        .enumerate()
        .filter(|(i, w)| {
            let in_verb = *i >= gen_start && *i < gen_end;
            let in_insertion = match (tail, inline) {
                (Some(tail), _) => *i >= tail,
                (None, Some(verb)) => *i == verb || (*i + 1 == verb && w.key == "and"),
                (None, None) => false,
            };
            !in_verb && !in_insertion
        })
        .map(|(_, w)| w.clone())
        .collect();

    let prompt = extract(&words);
    if prompt.is_empty() {
        return Some(Intent::missing(&cmd.text, MISSING_DESCRIPTION));
    }
    Some(Intent::CreateAndInsert { prompt })
}

fn rule_web_search(cmd: &Command) -> Option<Intent> {
    let (_, verb_end) = cmd.find_any(SEARCH_VERBS)?;
    let tail = cmd.insertion_tail().filter(|&i| i >= verb_end);
    let query_end = tail.unwrap_or(cmd.words.len());

    let query = extract(&cmd.words[verb_end..query_end]);
    if query.is_empty() {
        return Some(Intent::missing(&cmd.text, MISSING_QUERY));
    }
    Some(Intent::WebSearch {
        query,
        auto_insert: tail.is_some(),
    })
}

fn rule_crawl_without_url(cmd: &Command) -> Option<Intent> {
    cmd.contains_any(CRAWL_VERBS)
        .then(|| Intent::missing(&cmd.text, MISSING_URL))
}

fn rule_summarize_inline(cmd: &Command) -> Option<Intent> {
    let (_, verb_end) = cmd.find_any(SUMMARIZE_VERBS)?;
    let mut rest = &cmd.words[verb_end..];
    while let Some(first) = rest.first() {
        if CONTENT_FILLER.contains(&first.key.as_str()) || first.key.is_empty() {
            rest = &rest[1..];
        } else {
            break;
        }
    }
    let content = join(rest);
    (!content.is_empty()).then(|| Intent::Summarize {
        text: Some(content),
    })
}

/// Classifier with configurable command corrections
pub struct Classifier {
    normalizer: TextNormalizer,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

impl Classifier {
    pub fn new(corrections: HashMap<String, String>) -> Self {
        Self {
            normalizer: TextNormalizer::new(corrections),
        }
    }

    /// Classify a command. Total: always returns an intent.
    pub fn classify(&self, command: &str) -> Intent {
        let text = self.normalizer.normalize(command);
        if text.is_empty() {
            return Intent::missing("", EMPTY_COMMAND);
        }

        let cmd = Command::new(text);
        for (name, rule) in RULES {
            if let Some(intent) = rule(&cmd) {
                debug!("🎯 Rule '{}' matched: {:?}", name, intent);
                return intent;
            }
        }

        debug!("No rule matched, falling back to chat");
        Intent::chat(&cmd.text)
    }
}

/// Classify with the default normalizer
pub fn classify(command: &str) -> Intent {
    Classifier::default().classify(command)
}
