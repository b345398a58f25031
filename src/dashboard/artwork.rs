//! Artwork texture cache
//!
//! Downloads official artwork on a background thread and keeps the decoded
//! frames as egui textures, keyed by catalog id. The grid requests lazily;
//! a failed download is remembered so it is not retried every frame.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::catalog::CatalogClient;

/// Largest artwork edge kept in memory; sprites are downscaled past this
const MAX_ARTWORK_EDGE: u32 = 512;

/// State of one artwork slot
pub enum ArtworkState {
    Pending,
    Ready(egui::TextureHandle),
    Failed,
}

/// Decoded image on its way to texture upload
struct DecodedArtwork {
    id: u32,
    width: usize,
    height: usize,
    rgba: Vec<u8>,
}

/// Lazy artwork loader shared by the dex grid and the detail view
pub struct ArtworkCache {
    slots: HashMap<u32, ArtworkState>,
    requests: Sender<(u32, String)>,
    results: Receiver<Result<DecodedArtwork, u32>>,
}

impl ArtworkCache {
    /// Spawn the download worker
    pub fn new(client: Arc<CatalogClient>) -> Self {
        let (request_tx, request_rx) = unbounded::<(u32, String)>();
        let (result_tx, result_rx) = unbounded();

        std::thread::Builder::new()
            .name("artwork-loader".to_string())
            .spawn(move || {
                while let Ok((id, url)) = request_rx.recv() {
                    let result = fetch_and_decode(&client, id, &url);
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
                debug!("Artwork loader exiting");
            })
            .expect("failed to spawn artwork loader");

        Self {
            slots: HashMap::new(),
            requests: request_tx,
            results: result_rx,
        }
    }

    /// Ensure the artwork for `id` is loading or loaded; returns the current
    /// slot state.
    pub fn request(&mut self, id: u32, url: Option<&str>) -> &ArtworkState {
        let requests = &self.requests;
        self.slots.entry(id).or_insert_with(|| match url {
            Some(url) => {
                let _ = requests.send((id, url.to_string()));
                ArtworkState::Pending
            }
            None => ArtworkState::Failed,
        })
    }

    /// Get a ready texture without triggering a load
    pub fn texture(&self, id: u32) -> Option<&egui::TextureHandle> {
        match self.slots.get(&id) {
            Some(ArtworkState::Ready(texture)) => Some(texture),
            _ => None,
        }
    }

    /// Upload any finished downloads as textures. Call once per frame.
    pub fn pump(&mut self, ctx: &egui::Context) {
        while let Ok(result) = self.results.try_recv() {
            match result {
                Ok(decoded) => {
                    let image = egui::ColorImage::from_rgba_unmultiplied(
                        [decoded.width, decoded.height],
                        &decoded.rgba,
                    );
                    let texture = ctx.load_texture(
                        format!("artwork-{}", decoded.id),
                        image,
                        egui::TextureOptions::LINEAR,
                    );
                    self.slots.insert(decoded.id, ArtworkState::Ready(texture));
                }
                Err(id) => {
                    self.slots.insert(id, ArtworkState::Failed);
                }
            }
        }
    }
}

fn fetch_and_decode(
    client: &CatalogClient,
    id: u32,
    url: &str,
) -> Result<DecodedArtwork, u32> {
    let bytes = client.fetch_image(url).map_err(|e| {
        warn!("Artwork download failed for #{}: {}", id, e);
        id
    })?;

    let image = image::load_from_memory(&bytes).map_err(|e| {
        warn!("Artwork decode failed for #{}: {}", id, e);
        id
    })?;

    let image = if image.width() > MAX_ARTWORK_EDGE || image.height() > MAX_ARTWORK_EDGE {
        image.resize(
            MAX_ARTWORK_EDGE,
            MAX_ARTWORK_EDGE,
            image::imageops::FilterType::Triangle,
        )
    } else {
        image
    };

    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(DecodedArtwork {
        id,
        width: width as usize,
        height: height as usize,
        rgba: rgba.into_raw(),
    })
}
