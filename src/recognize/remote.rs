//! Remote vision backend
//!
//! One-shot image-understanding call: JPEG-encode the snapshot, send it to the
//! Gemini `generateContent` endpoint with a fixed instruction, and treat the
//! reply as the candidate name. No polling; the dashboard triggers a capture
//! explicitly per user press.

use base64::{engine::general_purpose::STANDARD, Engine};
use std::io::Cursor;
use tokio::runtime::Runtime;
use tracing::{debug, info};

use crate::capture::Snapshot;
use crate::config::VisionServiceSettings;

use super::{RecognizeError, Recognizer, RecognizerBackend};

const IDENTIFY_PROMPT: &str = "Identify the Pokemon in this image. Return ONLY the name of the \
     Pokemon in lowercase English. If you cannot find a Pokemon, return the word 'unknown'.";

const JPEG_QUALITY: u8 = 80;

/// Remote image-understanding recognizer
pub struct RemoteVision {
    http: reqwest::Client,
    runtime: Runtime,
    model: String,
    api_key: String,
}

impl RemoteVision {
    /// Build the recognizer from settings; the API key comes from the
    /// configured environment variable.
    pub fn new(settings: &VisionServiceSettings) -> Result<Self, RecognizeError> {
        let api_key = std::env::var(&settings.api_key_env).map_err(|_| {
            RecognizeError::Setup(format!(
                "environment variable {} is not set",
                settings.api_key_env
            ))
        })?;

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| RecognizeError::Setup(e.to_string()))?;
        let runtime = Runtime::new().map_err(|e| RecognizeError::Setup(e.to_string()))?;

        Ok(Self {
            http,
            runtime,
            model: settings.model.clone(),
            api_key,
        })
    }

    async fn identify(&self, image_b64: &str) -> Result<Option<String>, RecognizeError> {
        info!("Identifying subject via vision model {}", self.model);

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let body = serde_json::json!({
            "contents": [{ "parts": [
                { "inlineData": { "mimeType": "image/jpeg", "data": image_b64 } },
                { "text": IDENTIFY_PROMPT }
            ]}]
        });

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RecognizeError::Service(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(RecognizeError::Service(format!("{}: {}", status, detail)));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| RecognizeError::Service(e.to_string()))?;

        let name = json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or("")
            .trim()
            .to_lowercase();

        debug!("Vision service replied '{}'", name);
        Ok(interpret_reply(&name))
    }
}

impl Recognizer for RemoteVision {
    fn recognize(&mut self, snapshot: &Snapshot) -> Result<Option<String>, RecognizeError> {
        let jpeg = encode_jpeg(snapshot)?;
        let b64 = STANDARD.encode(&jpeg);
        self.runtime.block_on(self.identify(&b64))
    }

    fn backend(&self) -> RecognizerBackend {
        RecognizerBackend::RemoteVision
    }
}

/// `unknown` and empty replies mean "no match"; anything else is taken
/// verbatim as the candidate (the resolver does the catalog cross-check).
fn interpret_reply(reply: &str) -> Option<String> {
    if reply.is_empty() || reply == "unknown" {
        None
    } else {
        Some(reply.to_string())
    }
}

/// Compress the snapshot for transfer
fn encode_jpeg(snapshot: &Snapshot) -> Result<Vec<u8>, RecognizeError> {
    let image = snapshot
        .to_rgb_image()
        .ok_or_else(|| RecognizeError::Inference("snapshot buffer mismatch".to_string()))?;

    let mut bytes = Vec::new();
    let mut encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(Cursor::new(&mut bytes), JPEG_QUALITY);
    encoder
        .encode_image(&image)
        .map_err(|e| RecognizeError::Inference(e.to_string()))?;

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpret_reply_maps_unknown_to_none() {
        assert_eq!(interpret_reply("unknown"), None);
        assert_eq!(interpret_reply(""), None);
        assert_eq!(interpret_reply("mewtwo"), Some("mewtwo".to_string()));
    }

    #[test]
    fn test_encode_jpeg_produces_payload() {
        let image = image::RgbImage::from_pixel(32, 32, image::Rgb([200, 30, 30]));
        let snapshot = Snapshot::new(image.into_raw(), 32, 32);
        let jpeg = encode_jpeg(&snapshot).unwrap();
        // JPEG SOI marker
        assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_setup_fails_without_api_key() {
        let settings = VisionServiceSettings {
            model: "gemini-2.0-flash".to_string(),
            api_key_env: "ELIDEX_TEST_KEY_THAT_DOES_NOT_EXIST".to_string(),
        };
        let result = RemoteVision::new(&settings);
        assert!(matches!(result, Err(RecognizeError::Setup(_))));
    }
}
