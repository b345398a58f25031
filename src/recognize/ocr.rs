//! Local OCR backend
//!
//! Runs the PaddleOCR recognition model (CRNN + CTC) over projection-segmented
//! line bands of the snapshot, then matches the decoded tokens against the
//! known catalog names. The ONNX session is built once per scan session and
//! reused across polling cycles.

use image::imageops::FilterType;
use image::GrayImage;
use ort::value::Tensor;
use tracing::{debug, warn};

use crate::capture::Snapshot;

use super::models::{ModelManager, ModelType, OnnxSession};
use super::preprocess::{
    binarize, boost_contrast, crop_band, segment_lines, to_grayscale, MIN_LINE_HEIGHT,
};
use super::{RecognizeError, Recognizer, RecognizerBackend};

/// Input height expected by the recognition model
const REC_HEIGHT: u32 = 48;

/// Width bounds for a recognition input strip
const REC_MIN_WIDTH: u32 = 16;
const REC_MAX_WIDTH: u32 = 512;

/// Only the most prominent bands are worth inference time
const MAX_LINES: usize = 8;

/// Contrast boost applied before binarization
const CONTRAST_FACTOR: f32 = 1.4;

/// Tokens this short are OCR noise, not names
const MIN_TOKEN_LEN: usize = 4;

/// On-device text recognizer matched against a frozen name list
pub struct LocalOcr {
    session: OnnxSession,
    dictionary: Vec<String>,
    known_names: Vec<String>,
}

impl LocalOcr {
    /// Build the recognizer: ensure model files, load the dictionary and the
    /// ONNX session. Expensive; done once per scan session.
    pub fn new(manager: &ModelManager, known_names: Vec<String>) -> Result<Self, RecognizeError> {
        let rec_path = manager
            .ensure_model(ModelType::Recognition)
            .map_err(|e| RecognizeError::Setup(e.to_string()))?;
        let dict_path = manager
            .ensure_model(ModelType::Dictionary)
            .map_err(|e| RecognizeError::Setup(e.to_string()))?;

        let dictionary = load_dictionary_file(&dict_path)?;
        let session =
            OnnxSession::new(&rec_path).map_err(|e| RecognizeError::Setup(e.to_string()))?;

        Ok(Self {
            session,
            dictionary,
            known_names,
        })
    }

    /// Extract raw text from the snapshot, one decoded string per line band
    fn extract_text(&mut self, snapshot: &Snapshot) -> Result<String, RecognizeError> {
        let gray = to_grayscale(&snapshot.data, snapshot.width, snapshot.height)
            .ok_or_else(|| RecognizeError::Inference("snapshot buffer mismatch".to_string()))?;

        let mut enhanced = gray;
        boost_contrast(&mut enhanced, CONTRAST_FACTOR);
        let binary = binarize(&enhanced);

        let bands = segment_lines(&binary, MIN_LINE_HEIGHT);
        if bands.is_empty() {
            return Ok(String::new());
        }

        let mut lines = Vec::new();
        for band in bands.into_iter().take(MAX_LINES) {
            let strip = crop_band(&binary, band);
            match self.recognize_strip(&strip) {
                Ok(text) if !text.trim().is_empty() => lines.push(text),
                Ok(_) => {}
                Err(e) => {
                    // One unreadable band should not sink the whole frame
                    warn!("Line recognition failed: {}", e);
                }
            }
        }

        Ok(lines.join("\n"))
    }

    /// Run the CRNN over one line strip and CTC-decode the result
    fn recognize_strip(&mut self, strip: &GrayImage) -> Result<String, RecognizeError> {
        let (input, width) = prepare_strip_tensor(strip);

        let tensor = Tensor::from_array(([1usize, 3, REC_HEIGHT as usize, width as usize], input))
            .map_err(|e| RecognizeError::Inference(e.to_string()))?;

        let output_name = self.session.output_names()[0].clone();
        let outputs = self
            .session
            .session_mut()
            .run(ort::inputs![tensor])
            .map_err(|e| RecognizeError::Inference(e.to_string()))?;

        let (shape, probs) = outputs[output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| RecognizeError::Inference(e.to_string()))?;

        let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
        if dims.len() != 3 || dims[0] != 1 {
            return Err(RecognizeError::Inference(format!(
                "unexpected recognition output shape {:?}",
                dims
            )));
        }
        let (steps, classes) = (dims[1], dims[2]);

        let mut argmax = Vec::with_capacity(steps);
        for t in 0..steps {
            let row = &probs[t * classes..(t + 1) * classes];
            let mut best = 0usize;
            let mut best_p = f32::MIN;
            for (i, &p) in row.iter().enumerate() {
                if p > best_p {
                    best_p = p;
                    best = i;
                }
            }
            argmax.push(best);
        }

        let text = ctc_greedy_decode(&argmax, &self.dictionary);
        debug!("Strip decoded as '{}'", text);
        Ok(text)
    }
}

impl Recognizer for LocalOcr {
    fn recognize(&mut self, snapshot: &Snapshot) -> Result<Option<String>, RecognizeError> {
        let text = self.extract_text(snapshot)?;
        if text.is_empty() {
            return Ok(None);
        }
        Ok(find_name_in_text(&text, &self.known_names))
    }

    fn backend(&self) -> RecognizerBackend {
        RecognizerBackend::LocalOcr
    }
}

/// Resize a line strip to model height, replicate the gray channel to RGB and
/// normalize to [-1, 1]. Returns CHW data and the final strip width.
fn prepare_strip_tensor(strip: &GrayImage) -> (Vec<f32>, usize) {
    let (w, h) = strip.dimensions();
    let scale = REC_HEIGHT as f32 / h.max(1) as f32;
    let width = ((w as f32 * scale) as u32).clamp(REC_MIN_WIDTH, REC_MAX_WIDTH);
    let resized = image::imageops::resize(strip, width, REC_HEIGHT, FilterType::Triangle);

    let (width, height) = (width as usize, REC_HEIGHT as usize);
    let plane = width * height;
    let mut data = vec![0.0f32; 3 * plane];
    for (i, pixel) in resized.pixels().enumerate() {
        let value = (pixel.0[0] as f32 / 255.0 - 0.5) / 0.5;
        data[i] = value;
        data[plane + i] = value;
        data[2 * plane + i] = value;
    }

    (data, width)
}

/// Collapse a per-timestep argmax sequence into text.
///
/// Class 0 is the CTC blank; classes 1..=N map onto the dictionary; class
/// N + 1 is the space appended by the model's character set.
pub fn ctc_greedy_decode(steps: &[usize], dictionary: &[String]) -> String {
    let mut text = String::new();
    let mut previous = 0usize;

    for &class in steps {
        if class != 0 && class != previous {
            if class <= dictionary.len() {
                text.push_str(&dictionary[class - 1]);
            } else if class == dictionary.len() + 1 {
                text.push(' ');
            }
        }
        previous = class;
    }

    text
}

/// Match decoded text against the known-name list.
///
/// Tokens of length <= 3 are discarded as noise. A token equal to a known
/// name wins outright; otherwise the first known name with bidirectional
/// substring containment against the token is returned.
pub fn find_name_in_text(text: &str, known_names: &[String]) -> Option<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() { c } else { ' ' })
        .collect();

    for word in cleaned.split_whitespace().filter(|w| w.len() >= MIN_TOKEN_LEN) {
        if known_names.iter().any(|n| n == word) {
            return Some(word.to_string());
        }

        if let Some(fuzzy) = known_names
            .iter()
            .find(|name| name.contains(word) || word.contains(name.as_str()))
        {
            return Some(fuzzy.clone());
        }
    }

    None
}

/// Load the recognition character dictionary, one glyph per line
fn load_dictionary_file(path: &std::path::Path) -> Result<Vec<String>, RecognizeError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| RecognizeError::Setup(e.to_string()))?;
    let dictionary: Vec<String> = content.lines().map(|l| l.to_string()).collect();

    if dictionary.is_empty() {
        return Err(RecognizeError::Setup("empty character dictionary".to_string()));
    }
    Ok(dictionary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict() -> Vec<String> {
        "abcdefghijklmnopqrstuvwxyz"
            .chars()
            .map(|c| c.to_string())
            .collect()
    }

    fn names() -> Vec<String> {
        vec![
            "pikachu".to_string(),
            "raichu".to_string(),
            "bulbasaur".to_string(),
        ]
    }

    #[test]
    fn test_ctc_collapses_repeats_and_blanks() {
        let d = dict();
        // 3='c', 1='a', 20='t'; repeats collapse, a blank separates real repeats
        assert_eq!(ctc_greedy_decode(&[3, 1, 1, 20], &d), "cat");
        assert_eq!(ctc_greedy_decode(&[3, 1, 0, 1, 20], &d), "caat");
        assert_eq!(ctc_greedy_decode(&[0, 0, 0], &d), "");
    }

    #[test]
    fn test_ctc_decode_simple() {
        let d = dict();
        let steps = [16, 16, 0, 9, 11, 1, 3, 8, 21, 0];
        // p i k a c h u
        assert_eq!(ctc_greedy_decode(&steps, &d), "pikachu");
    }

    #[test]
    fn test_ctc_space_class() {
        let d = dict();
        let space = d.len() + 1;
        let steps = [8, 9, space, 13, 15];
        assert_eq!(ctc_greedy_decode(&steps, &d), "hi mo");
    }

    #[test]
    fn test_ctc_out_of_range_skipped() {
        let d = dict();
        let steps = [1, 999, 2];
        assert_eq!(ctc_greedy_decode(&steps, &d), "ab");
    }

    #[test]
    fn test_find_name_exact_match_with_noise() {
        // Digits and punctuation are stripped, case folded
        let found = find_name_in_text("PiKaChu!! #025", &names());
        assert_eq!(found.as_deref(), Some("pikachu"));
    }

    #[test]
    fn test_find_name_short_tokens_discarded() {
        assert_eq!(find_name_in_text("cha", &names()), None);
        assert_eq!(find_name_in_text("a ab abc", &names()), None);
    }

    #[test]
    fn test_find_name_containment_returns_catalog_name() {
        // "bulba" is a prefix of bulbasaur: the catalog name comes back
        let found = find_name_in_text("wild bulba appeared", &names());
        assert_eq!(found.as_deref(), Some("bulbasaur"));
    }

    #[test]
    fn test_find_name_no_match() {
        assert_eq!(find_name_in_text("completely unrelated text", &names()), None);
    }

    #[test]
    fn test_prepare_strip_tensor_shape() {
        let strip = GrayImage::from_pixel(96, 24, image::Luma([128]));
        let (data, width) = prepare_strip_tensor(&strip);
        assert_eq!(width, 192); // 96 * (48 / 24)
        assert_eq!(data.len(), 3 * 48 * 192);
        // Mid-gray maps to ~0 after normalization
        assert!(data[0].abs() < 0.02);
    }
}
