use docpilot::config::Config;
use docpilot::dispatcher::{AgentResponse, Dispatcher, ErrorKind};
use docpilot::intent::{Classifier, Intent, TransformKind};
use docpilot::providers::Providers;
use docpilot::EditorBridge;
use std::sync::Arc;
use std::time::Instant;

mod common;
use common::mock_providers::{MockCompletion, MockCrawl, MockSearch};

#[test]
fn test_garbage_flood_classifies_totally() {
    let classifier = Classifier::new(Config::default().command_corrections);

    // Classification never panics and always yields an intent
    let garbage = [
        "asdfghjkl",
        "!!! @@@ ###",
        "1234567890",
        "",
        " ",
        "\t\n",
        "search",
        "crawl crawl crawl",
        "http://",
        "https://.",
        "insert insert and and write",
        "🦀🦀🦀",
        "O\u{212A} fix grammar",
        "\u{130}\u{130} please",
        "ΣΑΣ hey there",
        "summarize",
        "extremely long string that doesn't mean anything to the system at all but might cause buffer issues if we were in C but we are in Rust so it's just a long string",
    ];

    for text in garbage {
        let intent = classifier.classify(text);
        if let Intent::WebSearch { query, .. } = &intent {
            assert!(!query.is_empty(), "Empty query forwarded for {:?}", text);
        }
        if let Intent::CreateAndInsert { prompt } = &intent {
            assert!(!prompt.is_empty(), "Empty prompt forwarded for {:?}", text);
        }
    }

    let commands = [
        "search for rust async",
        "fix grammar",
        "crawl https://example.com",
        "what time is it",
    ];
    let start = Instant::now();
    for i in 0..1000 {
        let _ = classifier.classify(commands[i % commands.len()]);
    }
    println!("Classified 1000 commands in {:?}", start.elapsed());

    // Stability check: classifier still behaves after the flood
    assert_eq!(
        classifier.classify("crawl https://example.com"),
        Intent::Crawl {
            url: "https://example.com".to_string()
        }
    );
}

#[test]
fn test_case_folding_that_changes_length() {
    let classifier = Classifier::default();

    // Lowercasing these changes their byte length
    for text in ["O\u{212A} fix grammar", "\u{212A}\u{212A} please search for Kelvin"] {
        let _ = classifier.classify(text);
    }
    assert_eq!(
        classifier.classify("PLEASE search for Straße"),
        Intent::WebSearch {
            query: "Straße".to_string(),
            auto_insert: false
        }
    );
}

#[test]
fn test_typo_corrections() {
    let classifier = Classifier::new(Config::default().command_corrections);

    match classifier.classify("serach for tokio channels") {
        Intent::WebSearch { query, .. } => assert_eq!(query, "tokio channels"),
        other => panic!("Typo not corrected. Found: {:?}", other),
    }
    match classifier.classify("fix the grammer") {
        Intent::EditorTransform { kind, .. } => assert_eq!(kind, TransformKind::Grammar),
        other => panic!("Typo not corrected. Found: {:?}", other),
    }
}

#[test]
fn test_misspelled_toolbar_labels() {
    let cutoff = Config::default().action_match_cutoff;
    assert_eq!(
        TransformKind::from_label("Fix Grammer", cutoff),
        Some(TransformKind::Grammar)
    );
    assert_eq!(
        TransformKind::from_label("profesional", cutoff),
        Some(TransformKind::Professional)
    );
    assert_eq!(TransformKind::from_label("xyzzy", cutoff), None);
}

#[test]
fn test_missing_arguments_never_reach_providers() {
    let completion = Arc::new(MockCompletion::new("unused"));
    let search = Arc::new(MockSearch::default());
    let crawl = Arc::new(MockCrawl::new("unused"));
    let dispatcher = Dispatcher::new(
        Providers {
            completion: completion.clone(),
            search: search.clone(),
            crawl: crawl.clone(),
        },
        Arc::new(EditorBridge::default()),
        "s1",
        5,
    );
    let classifier = Classifier::default();

    for command in ["crawl ", "search for", "write and insert", "   ", "fetch please"] {
        let intent = classifier.classify(command);
        let response = tokio_test::block_on(dispatcher.dispatch(&intent));
        match response {
            AgentResponse::Error { kind, .. } => assert_eq!(kind, ErrorKind::MissingArgument),
            other => panic!("{:?} reached a provider: {:?}", command, other),
        }
    }

    assert_eq!(completion.call_count(), 0);
    assert_eq!(search.call_count(), 0);
    assert_eq!(crawl.call_count(), 0);
}
