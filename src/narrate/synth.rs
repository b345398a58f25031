//! Speech synthesis providers
//!
//! `SpeechProvider` turns narration text into raw PCM audio; the Gemini
//! implementation calls the speech-generation endpoint and decodes its
//! base64-encoded 16-bit 24 kHz mono payload.

use anyhow::{bail, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use tracing::info;

/// Narration inputs are clipped to this many characters before synthesis
const MAX_NARRATION_CHARS: usize = 500;

/// A synthesis request
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: String,
}

/// Raw audio returned by a speech service
#[derive(Debug, Clone)]
pub struct PcmAudio {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Returns raw PCM audio for the given text.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    async fn synthesize(&self, request: SpeechRequest) -> Result<PcmAudio>;
}

/// Gemini speech-generation provider
pub struct GeminiSpeech {
    api_key: String,
    model: String,
    client: Client,
}

impl GeminiSpeech {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: "gemini-2.5-flash-preview-tts".to_string(),
            client: Client::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl SpeechProvider for GeminiSpeech {
    async fn synthesize(&self, request: SpeechRequest) -> Result<PcmAudio> {
        let text = clip_text(&request.text);
        info!("Synthesizing narration via {} ({} chars)", self.model, text.len());

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let body = serde_json::json!({
            "contents": [{ "parts": [
                { "text": format!("Read this Pokedex entry clearly: {}", text) }
            ]}],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": request.voice }
                    }
                }
            }
        });

        let resp = self.client.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            bail!("speech service error: {}", resp.text().await.unwrap_or_default());
        }

        let json: serde_json::Value = resp.json().await?;
        let data = json["candidates"][0]["content"]["parts"][0]["inlineData"]["data"]
            .as_str()
            .unwrap_or("");
        if data.is_empty() {
            bail!("speech service returned no audio payload");
        }

        let bytes = STANDARD.decode(data)?;
        Ok(decode_pcm16(&bytes))
    }
}

/// Interpret service audio bytes as signed 16-bit little-endian 24 kHz mono
fn decode_pcm16(bytes: &[u8]) -> PcmAudio {
    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    PcmAudio {
        samples,
        sample_rate: 24_000,
        channels: 1,
    }
}

fn clip_text(text: &str) -> &str {
    match text.char_indices().nth(MAX_NARRATION_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_pcm16_little_endian() {
        let bytes = [0x00, 0x00, 0xFF, 0x7F, 0x00, 0x80];
        let audio = decode_pcm16(&bytes);
        assert_eq!(audio.samples, vec![0, i16::MAX, i16::MIN]);
        assert_eq!(audio.sample_rate, 24_000);
        assert_eq!(audio.channels, 1);
    }

    #[test]
    fn test_decode_pcm16_ignores_trailing_byte() {
        let audio = decode_pcm16(&[0x01, 0x00, 0x7F]);
        assert_eq!(audio.samples, vec![1]);
    }

    #[test]
    fn test_clip_text_limits_length() {
        let long = "a".repeat(600);
        assert_eq!(clip_text(&long).len(), 500);
        assert_eq!(clip_text("short"), "short");
    }
}
