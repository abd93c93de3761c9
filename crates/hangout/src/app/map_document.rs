//! Map export parsing. Editors have written the tile layer at several places in the document
//! over time; the first populated location wins.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread;

use engine::{GridCoord, TileLayer, TileLayerError, TileSource};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LayerShape {
    MapLayers,
    MapLayer,
    Layers,
    MapDataLayers,
}

impl LayerShape {
    /// Priority order.
    pub(crate) const ALL: [LayerShape; 4] = [
        LayerShape::MapLayers,
        LayerShape::MapLayer,
        LayerShape::Layers,
        LayerShape::MapDataLayers,
    ];

    pub(crate) fn pointer(self) -> &'static str {
        match self {
            LayerShape::MapLayers => "/tilesetEditing/0/map/layers/0",
            LayerShape::MapLayer => "/tilesetEditing/0/map/layer",
            LayerShape::Layers => "/tilesetEditing/0/layers/0",
            LayerShape::MapDataLayers => "/tilesetEditing/0/map/data/layers/0",
        }
    }
}

#[derive(Debug)]
pub(crate) enum LayerResolution<'a> {
    Found { shape: LayerShape, layer: &'a Value },
    Absent,
}

#[derive(Debug, Error)]
pub(crate) enum MapLoadError {
    #[error("failed to read map document {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("map document {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no tile layer found; tried {}", tried_pointers())]
    NoRecognizedLayer,
    #[error("malformed tile layer at {pointer}{field}: {source}")]
    MalformedLayer {
        pointer: &'static str,
        field: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Layer(#[from] TileLayerError),
}

fn tried_pointers() -> String {
    LayerShape::ALL
        .iter()
        .map(|shape| shape.pointer())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Deserialize)]
struct RawLayer {
    #[serde(default)]
    tiles: BTreeMap<String, RawTile>,
}

#[derive(Debug, Deserialize)]
struct RawTile {
    x: u32,
    y: u32,
}

#[derive(Debug)]
pub(crate) struct MapLayer {
    pub(crate) shape: LayerShape,
    pub(crate) layer: TileLayer,
    pub(crate) skipped_keys: Vec<String>,
}

pub(crate) fn resolve_layer(document: &Value) -> LayerResolution<'_> {
    LayerShape::ALL
        .into_iter()
        .find_map(|shape| {
            document
                .pointer(shape.pointer())
                .filter(|layer| layer.is_object())
                .map(|layer| LayerResolution::Found { shape, layer })
        })
        .unwrap_or(LayerResolution::Absent)
}

pub(crate) fn parse_map_document(document: &Value, tile_size: u32) -> Result<MapLayer, MapLoadError> {
    let LayerResolution::Found { shape, layer } = resolve_layer(document) else {
        return Err(MapLoadError::NoRecognizedLayer);
    };
    let raw: RawLayer = serde_path_to_error::deserialize(layer).map_err(|error| {
        let field = error.path().to_string();
        MapLoadError::MalformedLayer {
            pointer: shape.pointer(),
            field: if field.is_empty() || field == "." {
                String::new()
            } else {
                format!(" ({field})")
            },
            source: error.into_inner(),
        }
    })?;

    let mut skipped_keys = Vec::new();
    let mut tiles = Vec::with_capacity(raw.tiles.len());
    for (key, tile) in raw.tiles {
        match parse_grid_key(&key) {
            Some(coord) => tiles.push((
                coord,
                TileSource {
                    column: tile.x,
                    row: tile.y,
                },
            )),
            None => skipped_keys.push(key),
        }
    }
    Ok(MapLayer {
        shape,
        layer: TileLayer::new(tile_size, tiles)?,
        skipped_keys,
    })
}

pub(crate) fn load_map_document(path: &Path, tile_size: u32) -> Result<MapLayer, MapLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| MapLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let document: Value = serde_json::from_str(&raw).map_err(|source| MapLoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    parse_map_document(&document, tile_size)
}

/// `"x-y"` grid keys. `x` may carry a leading minus; `y` is everything after the next dash.
pub(crate) fn parse_grid_key(key: &str) -> Option<GridCoord> {
    let split = key
        .char_indices()
        .skip(1)
        .find(|(_, ch)| *ch == '-')
        .map(|(index, _)| index)?;
    let x = key[..split].trim().parse().ok()?;
    let y = key[split + 1..].trim().parse().ok()?;
    Some(GridCoord::new(x, y))
}

/// Loads the document on its own thread; the single result arrives on the returned channel.
pub(crate) fn spawn_map_loader(
    path: PathBuf,
    tile_size: u32,
) -> io::Result<Receiver<Result<MapLayer, MapLoadError>>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("map-loader".to_string())
        .spawn(move || {
            debug!(path = %path.display(), "map_load_started");
            let result = load_map_document(&path, tile_size);
            if let Ok(map) = &result {
                if !map.skipped_keys.is_empty() {
                    warn!(
                        skipped = map.skipped_keys.len(),
                        first = map.skipped_keys[0].as_str(),
                        "map_tile_keys_skipped"
                    );
                }
            }
            let _ = tx.send(result);
        })?;
    Ok(rx)
}
