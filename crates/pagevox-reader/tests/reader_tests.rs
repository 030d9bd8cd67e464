//! Reader session tests
//!
//! Tests cover:
//! - Spoken-buffer substitutions (negative numbers, abbreviations, emphasis,
//!   image alt text) and position-map invariants
//! - Playback state machine: cancel-then-submit, stale-event discard,
//!   pause/resume guards, rate-change restart
//! - Click dispatch and heading/abbreviation navigation
//! - Idempotent rebuild and empty-document degradation

use pagevox_dom::Document;
use pagevox_reader::{
    DocLanguage, HighlightCommand, PlaybackState, ReaderConfig, ReaderSession, SegmentKind,
};
use pagevox_speech::testing::RecordingEngine;
use pagevox_speech::{UtteranceEvent, VoiceInfo};
use tokio::sync::mpsc;

type Session = ReaderSession<RecordingEngine>;

fn test_config() -> ReaderConfig {
    ReaderConfig {
        voice_poll_attempts: 1,
        voice_poll_interval_ms: 0,
        ..Default::default()
    }
}

async fn session_with_engine(
    html: &str,
    engine: RecordingEngine,
) -> (
    Session,
    RecordingEngine,
    mpsc::UnboundedReceiver<HighlightCommand>,
) {
    let handle = engine.clone();
    let (highlight_tx, highlight_rx) = mpsc::unbounded_channel();
    let session = ReaderSession::create(Document::parse(html), engine, test_config(), highlight_tx)
        .await
        .unwrap();
    (session, handle, highlight_rx)
}

async fn session_for(
    html: &str,
) -> (
    Session,
    RecordingEngine,
    mpsc::UnboundedReceiver<HighlightCommand>,
) {
    session_with_engine(html, RecordingEngine::new()).await
}

fn boundary(id: u64, char_index: usize) -> UtteranceEvent {
    UtteranceEvent::WordBoundary {
        utterance_id: id,
        char_index,
    }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<HighlightCommand>) -> Vec<HighlightCommand> {
    let mut commands = Vec::new();
    while let Ok(command) = rx.try_recv() {
        commands.push(command);
    }
    commands
}

// ─── Spoken buffer scenarios ────────────────────────────────────────

#[tokio::test]
async fn accounting_negative_is_normalized_and_click_speaks_from_word() {
    let html = "<html><body><p>Revenue was (1,234) this year</p></body></html>";
    let doc = Document::parse(html);
    let text_node = doc
        .iter()
        .find(|&id| doc.text(id).map(|t| t.contains("Revenue")).unwrap_or(false))
        .unwrap();

    let engine = RecordingEngine::new();
    let handle = engine.clone();
    let (highlight_tx, _highlight_rx) = mpsc::unbounded_channel();
    let mut session = ReaderSession::create(doc, engine, test_config(), highlight_tx)
        .await
        .unwrap();

    let spoken = &session.spoken().text;
    assert!(spoken.contains("negative 1,234"));
    assert!(!spoken.contains("(1,234)"));

    session.click_text(text_node, 0).await.unwrap();
    let utterance = handle.last_utterance().unwrap();
    assert!(utterance.text.starts_with("Revenue"));
    assert_eq!(session.state(), PlaybackState::Speaking);
}

#[tokio::test]
async fn abbreviation_expands_without_emphasis_prefix() {
    let html = r#"<body><p>The <abbr title="World Health Organization">WHO</abbr> said</p></body>"#;
    let (mut session, engine, _rx) = session_for(html).await;

    assert_eq!(
        session.spoken().text,
        "The World Health Organization said"
    );

    session.next_abbreviation().await.unwrap();
    let utterance = engine.last_utterance().unwrap();
    assert_eq!(utterance.text, "World Health Organization");
}

#[tokio::test]
async fn nested_strong_em_yields_combined_prefix() {
    let (session, _engine, _rx) =
        session_for("<body><strong><em>critical</em></strong></body>").await;
    assert_eq!(session.spoken().text, "important emphasis critical");
}

#[tokio::test]
async fn decorative_image_is_silent_and_labeled_image_speaks() {
    let html = r#"<body><p>pic:</p><img alt=""><img alt="Logo"></body>"#;
    let (session, _engine, _rx) = session_for(html).await;

    let kinds: Vec<SegmentKind> = session.stream().segments.iter().map(|s| s.kind).collect();
    assert_eq!(kinds, vec![SegmentKind::Text, SegmentKind::Image]);
    assert!(session.spoken().text.contains("Logo"));
}

#[tokio::test]
async fn french_document_uses_french_voice_and_tokens() {
    let voices = vec![
        VoiceInfo {
            id: "en".to_string(),
            name: "Google US English".to_string(),
            language: "en-US".to_string(),
        },
        VoiceInfo {
            id: "fr".to_string(),
            name: "Microsoft Hortense".to_string(),
            language: "fr-FR".to_string(),
        },
    ];
    let html = r#"<html lang="fr"><body><p>Valeur (25)</p></body></html>"#;
    let (mut session, engine, _rx) =
        session_with_engine(html, RecordingEngine::with_voices(voices)).await;

    assert_eq!(session.language(), DocLanguage::French);
    assert_eq!(session.voice().unwrap().id, "fr");
    assert!(session.spoken().text.contains("négatif 25"));

    session.play().await.unwrap();
    let utterance = engine.last_utterance().unwrap();
    assert_eq!(utterance.options.language_tag, "fr-CA");
    assert_eq!(utterance.options.voice.as_deref(), Some("fr"));
}

#[tokio::test]
async fn position_map_is_total_monotonic_and_anchored() {
    let html = concat!(
        r#"<body><h1>Report</h1><p>Loss was -42 or (1,234) overall.</p>"#,
        r#"<p><abbr title="Gross Domestic Product">GDP</abbr> grew <strong>fast</strong>.</p>"#,
        r#"<img alt="Chart"></body>"#
    );
    let (session, _engine, _rx) = session_for(html).await;

    let spoken = session.spoken();
    let original = session.transcript();

    assert_eq!(spoken.map.len(), spoken.text.len());
    for pair in spoken.map.windows(2) {
        assert!(pair[0] <= pair[1]);
    }
    for &m in &spoken.map {
        assert!(m < original.len());
    }

    // round-trip anchor: the expansion maps back to one original offset
    let gdp_spoken = spoken.text.find("Gross Domestic Product").unwrap();
    let anchor = spoken.map[gdp_spoken];
    for i in gdp_spoken..gdp_spoken + "Gross Domestic Product".len() {
        assert_eq!(spoken.map[i], anchor);
    }
    assert_eq!(anchor, original.find("GDP").unwrap());
}

// ─── Playback state machine ─────────────────────────────────────────

#[tokio::test]
async fn stale_boundary_after_stop_and_replay_is_discarded() {
    let (mut session, engine, _rx) = session_for("<body><p>alpha beta gamma</p></body>").await;

    session.play().await.unwrap();
    let first = engine.last_utterance().unwrap().id;
    let beta = session.spoken().text.find("beta").unwrap();
    session.handle_engine_event(boundary(first, beta)).await.unwrap();
    assert_eq!(session.cursor(), beta);

    session.stop().await.unwrap();
    assert_eq!(session.state(), PlaybackState::Stopped);

    session.play().await.unwrap();
    let second = engine.last_utterance().unwrap().id;
    assert_ne!(first, second);
    let cursor_after_replay = session.cursor();

    // the superseded utterance must not move the cursor
    let gamma = session.spoken().text.find("gamma").unwrap();
    session.handle_engine_event(boundary(first, gamma)).await.unwrap();
    assert_eq!(session.cursor(), cursor_after_replay);

    // the live one does; char_index is relative to the submitted suffix
    session.handle_engine_event(boundary(second, 0)).await.unwrap();
    assert_eq!(session.cursor(), beta);

    // every submission was preceded by a cancel
    assert!(engine.cancel_calls() >= engine.utterances().len());
}

#[tokio::test]
async fn pause_and_resume_are_guarded_by_state() {
    let (mut session, engine, _rx) = session_for("<body><p>words here</p></body>").await;

    // pause from idle is a no-op that never reaches the engine
    session.pause().await.unwrap();
    assert_eq!(session.state(), PlaybackState::Idle);
    assert_eq!(engine.pause_calls(), 0);

    session.play().await.unwrap();
    session.pause().await.unwrap();
    assert_eq!(session.state(), PlaybackState::Paused);
    assert_eq!(engine.pause_calls(), 1);

    // resume only from paused
    session.resume().await.unwrap();
    assert_eq!(session.state(), PlaybackState::Speaking);
    session.resume().await.unwrap();
    assert_eq!(engine.resume_calls(), 1);
}

#[tokio::test]
async fn rate_change_restarts_from_last_known_word() {
    let (mut session, engine, _rx) = session_for("<body><p>alpha beta gamma</p></body>").await;

    session.play().await.unwrap();
    let id = engine.last_utterance().unwrap().id;
    let beta = session.spoken().text.find("beta").unwrap();
    session.handle_engine_event(boundary(id, beta)).await.unwrap();

    session.set_rate(2.0).await.unwrap();
    let restarted = engine.last_utterance().unwrap();
    assert!(restarted.text.starts_with("beta"));
    assert_eq!(restarted.options.rate, 2.0);
    assert_eq!(session.state(), PlaybackState::Speaking);

    // rate change while idle does not submit anything
    let submissions = engine.utterances().len();
    session.stop().await.unwrap();
    session.set_rate(0.5).await.unwrap();
    assert_eq!(engine.utterances().len(), submissions);
}

#[tokio::test]
async fn completion_returns_to_idle_and_rewinds() {
    let (mut session, engine, mut rx) = session_for("<body><p>one two</p></body>").await;

    session.play().await.unwrap();
    let id = engine.last_utterance().unwrap().id;
    session.handle_engine_event(boundary(id, 0)).await.unwrap();
    assert!(drain(&mut rx)
        .iter()
        .any(|c| matches!(c, HighlightCommand::Word { .. })));

    session
        .handle_engine_event(UtteranceEvent::Completed { utterance_id: id })
        .await
        .unwrap();
    assert_eq!(session.state(), PlaybackState::Idle);
    assert_eq!(session.cursor(), 0);
    assert!(drain(&mut rx)
        .iter()
        .any(|c| matches!(c, HighlightCommand::ClearWord)));
}

#[tokio::test]
async fn skipped_boundaries_resync_on_the_next_one() {
    let (mut session, engine, _rx) = session_for("<body><p>alpha beta gamma delta</p></body>").await;

    session.play().await.unwrap();
    let id = engine.last_utterance().unwrap().id;
    // engine coalesced everything up to the last word
    let delta = session.spoken().text.find("delta").unwrap();
    session.handle_engine_event(boundary(id, delta)).await.unwrap();
    assert_eq!(session.cursor(), delta);
}

#[tokio::test]
async fn empty_document_makes_playback_a_no_op() {
    let (mut session, engine, _rx) = session_for("").await;

    assert!(session.is_empty());
    session.play().await.unwrap();
    session.pause().await.unwrap();
    session.stop().await.unwrap();
    session.next_heading().await.unwrap();
    session.next_abbreviation().await.unwrap();
    assert!(engine.utterances().is_empty());
}

#[tokio::test]
async fn rebuild_from_same_markup_is_identical() {
    let html = concat!(
        r#"<body><h2>Title</h2><p>Net was -5 <abbr title="Percent">pct</abbr></p>"#,
        r#"<img alt="Graph"></body>"#
    );
    let (first, _e1, _r1) = session_for(html).await;
    let (second, _e2, _r2) = session_for(html).await;

    assert_eq!(first.stream(), second.stream());
    assert_eq!(first.spoken(), second.spoken());
}

// ─── Click dispatch & navigation ────────────────────────────────────

#[tokio::test]
async fn click_inside_labeled_container_speaks_the_label() {
    let html = r#"<body><nav aria-label="Site menu"><a>Home</a></nav></body>"#;
    let doc = Document::parse(html);
    let anchor = doc.first_element_by_tag("a").unwrap();

    let engine = RecordingEngine::new();
    let handle = engine.clone();
    let (highlight_tx, mut highlight_rx) = mpsc::unbounded_channel();
    let mut session = ReaderSession::create(doc, engine, test_config(), highlight_tx)
        .await
        .unwrap();

    session.click_element(anchor).await.unwrap();
    assert_eq!(handle.last_utterance().unwrap().text, "Site menu");
    assert!(drain(&mut highlight_rx)
        .iter()
        .any(|c| matches!(c, HighlightCommand::Focus { .. })));
}

#[tokio::test]
async fn click_on_unannotated_element_is_ignored() {
    let html = "<body><div><p>plain</p></div></body>";
    let doc = Document::parse(html);
    let div = doc.first_element_by_tag("div").unwrap();

    let engine = RecordingEngine::new();
    let handle = engine.clone();
    let (highlight_tx, _rx) = mpsc::unbounded_channel();
    let mut session = ReaderSession::create(doc, engine, test_config(), highlight_tx)
        .await
        .unwrap();

    session.click_element(div).await.unwrap();
    assert!(handle.utterances().is_empty());
    assert_eq!(session.state(), PlaybackState::Idle);
}

#[tokio::test]
async fn heading_navigation_is_circular_and_moves_the_cursor() {
    let html = "<body><h1>First</h1><p>body</p><h2>Second</h2><p>more</p></body>";
    let (mut session, engine, _rx) = session_for(html).await;

    session.next_heading().await.unwrap();
    assert_eq!(engine.last_utterance().unwrap().text, "First");
    let first_offset = session.cursor();

    session.next_heading().await.unwrap();
    assert_eq!(engine.last_utterance().unwrap().text, "Second");
    assert!(session.cursor() > first_offset);

    session.next_heading().await.unwrap();
    assert_eq!(engine.last_utterance().unwrap().text, "First");
    assert_eq!(session.cursor(), first_offset);
}

#[tokio::test]
async fn navigation_anchors_resumed_playback() {
    let html = "<body><p>intro text</p><h1>Chapter</h1><p>chapter body</p></body>";
    let (mut session, engine, _rx) = session_for(html).await;

    session.next_heading().await.unwrap();
    let id = engine.last_utterance().unwrap().id;
    session
        .handle_engine_event(UtteranceEvent::Completed { utterance_id: id })
        .await
        .unwrap();

    // playback resumed after navigation continues from the heading
    session.play().await.unwrap();
    let resumed = engine.last_utterance().unwrap();
    assert!(resumed.text.trim_start().starts_with("Chapter"));
    assert!(!resumed.text.contains("intro"));
}

#[tokio::test]
async fn abbreviation_navigation_wraps_and_respects_emphasis() {
    let html = concat!(
        r#"<body><p><abbr title="Alpha Expansion">AE</abbr> then "#,
        r#"<strong><abbr title="Beta Expansion">BE</abbr></strong></p></body>"#
    );
    let (mut session, engine, _rx) = session_for(html).await;

    session.next_abbreviation().await.unwrap();
    assert_eq!(engine.last_utterance().unwrap().text, "Alpha Expansion");

    session.next_abbreviation().await.unwrap();
    assert_eq!(engine.last_utterance().unwrap().text, "important Beta Expansion");

    session.next_abbreviation().await.unwrap();
    assert_eq!(engine.last_utterance().unwrap().text, "Alpha Expansion");
}

#[tokio::test]
async fn word_boundary_highlights_the_containing_word() {
    let html = "<body><p>shine on this</p></body>";
    let doc = Document::parse(html);
    let text_node = doc.iter().find(|&id| doc.text(id).is_some()).unwrap();

    let engine = RecordingEngine::new();
    let handle = engine.clone();
    let (highlight_tx, mut highlight_rx) = mpsc::unbounded_channel();
    let mut session = ReaderSession::create(doc, engine, test_config(), highlight_tx)
        .await
        .unwrap();

    session.play().await.unwrap();
    let id = handle.last_utterance().unwrap().id;
    let on = session.spoken().text.find("on ").unwrap();
    session.handle_engine_event(boundary(id, on)).await.unwrap();

    let commands = drain(&mut highlight_rx);
    assert!(commands.contains(&HighlightCommand::Word {
        node: text_node,
        start: "shine ".len(),
        end: "shine on".len(),
    }));
}
