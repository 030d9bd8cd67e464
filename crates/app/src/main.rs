use anyhow::{bail, Context};
use clap::Parser;
use pagevox_dom::Document;
use pagevox_reader::{
    normalize, HighlightCommand, PlaybackState, ReaderConfig, ReaderSession,
};
use pagevox_speech::{
    SimulatedConfig, SimulatedEngine, SpeechConfig, SpeechEngine, UtteranceEvent,
};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Screen reader simulation over local HTML documents
#[derive(Debug, Parser)]
#[command(name = "pagevox")]
struct Cli {
    /// HTML document to read aloud
    file: PathBuf,

    /// Playback rate (1.0 is normal)
    #[arg(long, default_value_t = 1.0)]
    rate: f32,

    /// Force the document language (en or fr) instead of detecting it
    #[arg(long)]
    language: Option<String>,

    /// Reader configuration file (TOML)
    #[arg(long, env = "PAGEVOX_CONFIG")]
    config: Option<PathBuf>,

    /// Simulated delay between spoken words at rate 1.0, in milliseconds
    #[arg(long, default_value_t = 120)]
    word_delay_ms: u64,

    /// List the engine's voices and exit
    #[arg(long)]
    list_voices: bool,
}

fn init_logging() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(log_level).init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ReaderConfig> {
    let Some(path) = path else {
        return Ok(ReaderConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: ReaderConfig =
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}

/// Force the detected language by overriding the root `lang` attribute
fn apply_language_override(doc: &mut Document, language: &str) -> anyhow::Result<()> {
    let language = language.trim().to_lowercase();
    if language != "en" && language != "fr" {
        bail!("unsupported language override: {language} (expected en or fr)");
    }
    if let Some(root) = doc.root() {
        doc.set_attribute(root, "lang", &language);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    config.default_rate = cli.rate;

    let (event_tx, mut event_rx) = mpsc::channel::<UtteranceEvent>(64);
    let mut engine = SimulatedEngine::with_config(
        SimulatedConfig {
            word_delay_ms: cli.word_delay_ms,
            ..Default::default()
        },
        event_tx,
    );
    engine.initialize(SpeechConfig::default()).await?;

    if cli.list_voices {
        for voice in engine.list_voices().await? {
            println!("{}\t{}\t{}", voice.id, voice.language, voice.name);
        }
        return Ok(());
    }

    let markup = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("reading {}", cli.file.display()))?;
    let mut doc = Document::parse(&markup);
    normalize::prepare_document(&mut doc);
    if let Some(language) = &cli.language {
        apply_language_override(&mut doc, language)?;
    }

    let (highlight_tx, mut highlight_rx) = mpsc::unbounded_channel::<HighlightCommand>();
    let mut session = ReaderSession::create(doc, engine, config, highlight_tx).await?;

    if session.is_empty() {
        tracing::warn!("document has no speakable content");
        return Ok(());
    }
    tracing::info!(
        language = %session.language(),
        voice = session.voice().map(|v| v.name.as_str()).unwrap_or("engine default"),
        segments = session.stream().segments.len(),
        "document ready"
    );

    session.play().await?;

    while let Some(event) = event_rx.recv().await {
        session.handle_engine_event(event).await?;
        while let Ok(command) = highlight_rx.try_recv() {
            render_highlight(&session, command);
        }
        if session.state() == PlaybackState::Idle {
            break;
        }
    }

    tracing::info!("playback finished");
    Ok(())
}

fn render_highlight<E: SpeechEngine>(session: &ReaderSession<E>, command: HighlightCommand) {
    match command {
        HighlightCommand::Word { node, start, end } => {
            if let Some(text) = session.document().text(node) {
                if let Some(word) = text.get(start..end) {
                    println!("» {word}");
                }
            }
        }
        HighlightCommand::Focus { node } => {
            tracing::debug!(?node, "focus element");
        }
        HighlightCommand::Unfocus { node } => {
            tracing::debug!(?node, "unfocus element");
        }
        HighlightCommand::ClearWord => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.yield_batch, ReaderConfig::default().yield_batch);
    }

    #[test]
    fn config_file_is_parsed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            concat!(
                "yield_batch = 500\n",
                "language_sample_bytes = 4000\n",
                "transcript_limit = 1000\n",
                "default_rate = 1.5\n",
                "voice_poll_attempts = 3\n",
                "voice_poll_interval_ms = 50\n",
            )
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.yield_batch, 500);
        assert_eq!(config.default_rate, 1.5);
    }

    #[test]
    fn language_override_rejects_unknown_codes() {
        let mut doc = Document::parse("<html><body>x</body></html>");
        assert!(apply_language_override(&mut doc, "fr").is_ok());
        let root = doc.root().unwrap();
        assert_eq!(doc.attribute(root, "lang"), Some("fr"));
        assert!(apply_language_override(&mut doc, "de").is_err());
    }
}
