//! Asynchronous PNG loading keyed by asset key.
//!
//! Requests are decoded on a worker thread; the frame loop calls [`ImageStore::pump`] to move
//! finished images into the store. Anything not yet ready is simply skipped by the renderer.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use image::ImageReader;
use thiserror::Error;
use tracing::{debug, warn};

use crate::asset_keys::{validate_asset_key, AssetKeyError};

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("invalid asset key '{key}': {source}")]
    InvalidKey {
        key: String,
        #[source]
        source: AssetKeyError,
    },
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image loader thread is gone")]
    LoaderStopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl LoadedImage {
    /// Returns `None` when the buffer does not hold exactly `width * height` RGBA pixels.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        (rgba.len() == expected).then_some(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let bytes = self.rgba.get(offset..offset + 4)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

#[derive(Debug)]
enum ImageSlot {
    Pending,
    Ready(LoadedImage),
    Failed,
}

struct LoadJob {
    key: String,
    path: PathBuf,
}

type LoadOutcome = (String, Result<LoadedImage, ImageLoadError>);

pub struct ImageStore {
    asset_root: PathBuf,
    slots: HashMap<String, ImageSlot>,
    warned_keys: HashSet<String>,
    jobs: Option<Sender<LoadJob>>,
    outcomes: Receiver<LoadOutcome>,
}

impl ImageStore {
    pub fn new(asset_root: PathBuf) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<LoadJob>();
        let (outcome_tx, outcome_rx) = mpsc::channel::<LoadOutcome>();
        let spawned = thread::Builder::new()
            .name("image-loader".to_string())
            .spawn(move || {
                for job in job_rx {
                    let outcome = decode_png(&job.path);
                    if outcome_tx.send((job.key, outcome)).is_err() {
                        break;
                    }
                }
            });
        let jobs = match spawned {
            Ok(_) => Some(job_tx),
            Err(error) => {
                warn!(error = %error, "image_loader_spawn_failed");
                None
            }
        };
        Self {
            asset_root,
            slots: HashMap::new(),
            warned_keys: HashSet::new(),
            jobs,
            outcomes: outcome_rx,
        }
    }

    /// Queues `key` for loading unless it is already known. Repeated calls are free.
    pub fn request(&mut self, key: &str) {
        if self.slots.contains_key(key) {
            return;
        }
        let path = match image_path(&self.asset_root, key) {
            Ok(path) => path,
            Err(error) => {
                self.fail(key.to_string(), &error);
                return;
            }
        };
        let queued = self.jobs.as_ref().is_some_and(|jobs| {
            jobs.send(LoadJob {
                key: key.to_string(),
                path,
            })
            .is_ok()
        });
        if queued {
            self.slots.insert(key.to_string(), ImageSlot::Pending);
        } else {
            self.fail(key.to_string(), &ImageLoadError::LoaderStopped);
        }
    }

    /// Moves finished loads into the store. Returns how many slots settled.
    pub fn pump(&mut self) -> usize {
        let mut settled = 0;
        while let Ok((key, outcome)) = self.outcomes.try_recv() {
            settled += 1;
            match outcome {
                Ok(image) => {
                    debug!(key = key.as_str(), width = image.width, height = image.height, "image_loaded");
                    self.slots.insert(key, ImageSlot::Ready(image));
                }
                Err(error) => self.fail(key, &error),
            }
        }
        settled
    }

    pub fn ready(&self, key: &str) -> Option<&LoadedImage> {
        match self.slots.get(key) {
            Some(ImageSlot::Ready(image)) => Some(image),
            _ => None,
        }
    }

    pub fn is_pending(&self, key: &str) -> bool {
        matches!(self.slots.get(key), Some(ImageSlot::Pending))
    }

    pub fn has_failed(&self, key: &str) -> bool {
        matches!(self.slots.get(key), Some(ImageSlot::Failed))
    }

    /// Inserts an already decoded image, replacing any pending load for the key.
    pub fn insert_ready(&mut self, key: impl Into<String>, image: LoadedImage) {
        self.slots.insert(key.into(), ImageSlot::Ready(image));
    }

    fn fail(&mut self, key: String, error: &ImageLoadError) {
        if self.warned_keys.insert(key.clone()) {
            warn!(key = key.as_str(), error = %error, "image_load_failed");
        }
        self.slots.insert(key, ImageSlot::Failed);
    }
}

fn image_path(asset_root: &Path, key: &str) -> Result<PathBuf, ImageLoadError> {
    validate_asset_key(key).map_err(|source| ImageLoadError::InvalidKey {
        key: key.to_string(),
        source,
    })?;
    Ok(asset_root.join(format!("{key}.png")))
}

fn decode_png(path: &Path) -> Result<LoadedImage, ImageLoadError> {
    let reader = ImageReader::open(path).map_err(|source| ImageLoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let decoded = reader.decode().map_err(|source| ImageLoadError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let image = decoded.to_rgba8();
    Ok(LoadedImage {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}
