//! Voice selection
//!
//! Preference-list driven voice matching: a prioritized list of named
//! voices per supported language, then locale-prefix and locale-substring
//! fallbacks, then the engine default (no explicit voice).

use crate::engine::SpeechEngine;
use crate::types::VoiceInfo;
use std::time::Duration;
use tracing::debug;

/// Preferred English voices, best first
pub const ENGLISH_PREFERENCES: &[&str] = &[
    "Google US English",
    "Google UK English Female",
    "Google UK English Male",
    "Microsoft David",
    "Microsoft Mark",
    "Microsoft Zira",
    "en-US",
];

/// Preferred French voices, best first
pub const FRENCH_PREFERENCES: &[&str] = &[
    "Google français",
    "Google français du Canada",
    "Microsoft Claude",
    "Microsoft Caroline",
    "Microsoft Hortense",
    "fr-CA",
    "fr-FR",
];

/// Preference list for a two-letter language code; unknown codes fall back
/// to the English list.
pub fn preferences_for(code: &str) -> &'static [&'static str] {
    match code {
        "fr" => FRENCH_PREFERENCES,
        _ => ENGLISH_PREFERENCES,
    }
}

/// Pick the best available voice for a language code.
///
/// Matching is case-insensitive substring on voice name or language tag,
/// walking the preference list in order; failing that, any voice whose
/// language tag starts with the code; failing that, any voice whose tag
/// contains the code; failing that, None (engine default).
pub fn pick_best_voice<'a>(voices: &'a [VoiceInfo], code: &str) -> Option<&'a VoiceInfo> {
    for pref in preferences_for(code) {
        let pref = pref.to_lowercase();
        if let Some(found) = voices.iter().find(|v| {
            v.name.to_lowercase().contains(&pref) || v.language.to_lowercase().contains(&pref)
        }) {
            return Some(found);
        }
    }

    let code = code.to_lowercase();
    voices
        .iter()
        .find(|v| v.language.to_lowercase().starts_with(&code))
        .or_else(|| {
            voices
                .iter()
                .find(|v| v.language.to_lowercase().contains(&code))
        })
}

/// Poll the engine until its voice catalog is non-empty, up to `attempts`
/// polls spaced `delay` apart. Returns whatever was available at the end,
/// possibly empty; callers proceed with the engine default voice rather
/// than waiting forever.
pub async fn wait_for_voices<E>(engine: &E, attempts: u32, delay: Duration) -> Vec<VoiceInfo>
where
    E: SpeechEngine + ?Sized,
{
    for attempt in 0..attempts {
        match engine.list_voices().await {
            Ok(voices) if !voices.is_empty() => return voices,
            Ok(_) => {
                debug!(attempt, "voice catalog still empty");
            }
            Err(e) => {
                debug!(attempt, error = %e, "voice catalog query failed");
            }
        }
        if attempt + 1 < attempts {
            tokio::time::sleep(delay).await;
        }
    }
    Vec::new()
}
