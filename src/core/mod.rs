//! Core processing modules
//!
//! Command text normalization shared by the classifier and the shell.

pub mod text_normalizer;

pub use text_normalizer::TextNormalizer;
