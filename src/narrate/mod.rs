//! Narration Layer
//!
//! Fire-and-forget speech for detail-view entries. At most one utterance is
//! active at a time; starting a new one replaces (and thereby stops) the
//! previous sink. Synthesis happens on a short-lived worker thread so the UI
//! never waits on the speech service.

pub mod synth;

use parking_lot::Mutex;
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{info, warn};

use crate::catalog::PokemonDetail;
use crate::config::{NarrationSettings, VisionServiceSettings};

pub use synth::{GeminiSpeech, SpeechProvider, SpeechRequest};

/// Text-to-speech narrator with a single active utterance
pub struct Narrator {
    provider: Option<Arc<dyn SpeechProvider>>,
    // The output stream must outlive every sink attached to it
    _stream: Option<OutputStream>,
    stream_handle: Option<OutputStreamHandle>,
    active: Arc<Mutex<Option<Sink>>>,
    last_error: Arc<Mutex<Option<String>>>,
    voice: String,
    volume: f32,
    enabled: bool,
}

impl Narrator {
    /// Set up the narrator from settings. Missing audio output or a missing
    /// API key degrade to a disabled narrator rather than failing startup.
    pub fn new(settings: &NarrationSettings, vision: &VisionServiceSettings) -> Self {
        let provider: Option<Arc<dyn SpeechProvider>> = match std::env::var(&vision.api_key_env) {
            Ok(key) => Some(Arc::new(GeminiSpeech::new(key))),
            Err(_) => {
                warn!(
                    "Narration disabled: environment variable {} is not set",
                    vision.api_key_env
                );
                None
            }
        };

        let (stream, stream_handle) = match OutputStream::try_default() {
            Ok((stream, handle)) => (Some(stream), Some(handle)),
            Err(e) => {
                warn!("Narration disabled: no audio output ({})", e);
                (None, None)
            }
        };

        let enabled = settings.enabled && provider.is_some() && stream_handle.is_some();

        Self {
            provider,
            _stream: stream,
            stream_handle,
            active: Arc::new(Mutex::new(None)),
            last_error: Arc::new(Mutex::new(None)),
            voice: settings.voice.clone(),
            volume: settings.volume.clamp(0.0, 1.0),
            enabled,
        }
    }

    /// Whether narration can actually produce audio
    pub fn is_available(&self) -> bool {
        self.enabled
    }

    /// Speak `text`, replacing any utterance already playing.
    /// Fire-and-forget: synthesis and playback run off-thread.
    pub fn speak(&self, text: &str) {
        if !self.enabled {
            return;
        }
        let (Some(provider), Some(handle)) = (self.provider.clone(), self.stream_handle.clone())
        else {
            return;
        };

        self.stop();

        let request = SpeechRequest {
            text: text.to_string(),
            voice: self.voice.clone(),
        };
        let active = self.active.clone();
        let last_error = self.last_error.clone();
        let volume = self.volume;

        std::thread::Builder::new()
            .name("narration".to_string())
            .spawn(move || {
                let audio = Runtime::new()
                    .map_err(|e| e.to_string())
                    .and_then(|rt| {
                        rt.block_on(provider.synthesize(request))
                            .map_err(|e| e.to_string())
                    });

                match audio {
                    Ok(audio) => match Sink::try_new(&handle) {
                        Ok(sink) => {
                            sink.set_volume(volume);
                            sink.append(SamplesBuffer::new(
                                audio.channels,
                                audio.sample_rate,
                                audio.samples,
                            ));
                            info!("Narration playing");
                            // Replacing the slot drops (and stops) any sink
                            // that slipped in while we were synthesizing
                            *active.lock() = Some(sink);
                        }
                        Err(e) => {
                            warn!("Narration playback failed: {}", e);
                            *last_error.lock() = Some(format!("Narration failed: {}", e));
                        }
                    },
                    Err(e) => {
                        warn!("Narration synthesis failed: {}", e);
                        *last_error.lock() = Some(format!("Narration failed: {}", e));
                    }
                }
            })
            .ok();
    }

    /// Stop the active utterance, if any
    pub fn stop(&self) {
        if let Some(sink) = self.active.lock().take() {
            sink.stop();
        }
    }

    /// Whether an utterance is currently playing
    pub fn is_speaking(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .map(|sink| !sink.empty())
            .unwrap_or(false)
    }

    /// Take the most recent narration error for display
    pub fn take_error(&self) -> Option<String> {
        self.last_error.lock().take()
    }
}

/// Build the spoken encyclopedia entry for a detail record
pub fn narration_text(detail: &PokemonDetail) -> String {
    let types = detail.types.join(" and ");
    let abilities = detail
        .abilities
        .iter()
        .map(|a| a.name.replace('-', " "))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{}. This is a {} type Pokemon. It stands {} meters tall and weighs {} kilograms. \
         Its abilities include {}.",
        detail.name,
        types,
        detail.height_m(),
        detail.weight_kg(),
        abilities
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Ability, StatValue};

    fn detail() -> PokemonDetail {
        PokemonDetail {
            id: 25,
            name: "pikachu".to_string(),
            height: 4,
            weight: 60,
            types: vec!["electric".to_string()],
            stats: vec![StatValue { name: "hp".to_string(), value: 35 }],
            abilities: vec![
                Ability { name: "static".to_string(), is_hidden: false },
                Ability { name: "lightning-rod".to_string(), is_hidden: true },
            ],
            artwork_url: None,
        }
    }

    #[test]
    fn test_narration_text() {
        let text = narration_text(&detail());
        assert_eq!(
            text,
            "pikachu. This is a electric type Pokemon. It stands 0.4 meters tall and \
             weighs 6 kilograms. Its abilities include static, lightning rod."
        );
    }

    #[test]
    fn test_narration_text_joins_types() {
        let mut d = detail();
        d.types = vec!["grass".to_string(), "poison".to_string()];
        let text = narration_text(&d);
        assert!(text.contains("grass and poison type"));
    }
}
