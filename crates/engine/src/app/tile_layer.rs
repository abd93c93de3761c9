//! Sparse tile layer: grid coordinates mapped to source cells in one shared tileset image.

use std::collections::BTreeMap;

use thiserror::Error;

pub const DEFAULT_TILE_SIZE_PX: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
}

impl GridCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Column/row of a cell inside the tileset image, in tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileSource {
    pub column: u32,
    pub row: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TileLayerError {
    #[error("tile size must be greater than zero")]
    ZeroTileSize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLayer {
    tile_size: u32,
    tiles: BTreeMap<GridCoord, TileSource>,
}

impl TileLayer {
    /// Later entries win when a coordinate repeats.
    pub fn new(
        tile_size: u32,
        tiles: impl IntoIterator<Item = (GridCoord, TileSource)>,
    ) -> Result<Self, TileLayerError> {
        if tile_size == 0 {
            return Err(TileLayerError::ZeroTileSize);
        }
        Ok(Self {
            tile_size,
            tiles: tiles.into_iter().collect(),
        })
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn get(&self, coord: GridCoord) -> Option<TileSource> {
        self.tiles.get(&coord).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GridCoord, TileSource)> + '_ {
        self.tiles.iter().map(|(coord, source)| (*coord, *source))
    }

    /// Inclusive min/max grid corners, or `None` for an empty layer.
    pub fn grid_bounds(&self) -> Option<(GridCoord, GridCoord)> {
        let mut coords = self.tiles.keys();
        let first = *coords.next()?;
        Some(coords.fold((first, first), |(min, max), coord| {
            (
                GridCoord::new(min.x.min(coord.x), min.y.min(coord.y)),
                GridCoord::new(max.x.max(coord.x), max.y.max(coord.y)),
            )
        }))
    }
}
