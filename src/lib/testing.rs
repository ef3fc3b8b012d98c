//! Fixtures shared by the unit tests.

use crate::*;
use std::rc::Rc;

pub const TILE_SIZE: f32 = 1000.0;
/// World units per pixel in the default test context.
pub const PIXEL_RATIO: f32 = 0.02;

/// A tile of the row 0 at level 10.
pub fn tile(column: u32) -> Tile {
    Tile::new(
        TileKey::new(10, column, 0),
        Bounds::square(glm::vec2(column as f32 * TILE_SIZE, 0.0), TILE_SIZE),
        Rc::new(DataSource::new("test")),
    )
}

/// A context at zoom level 5.
pub fn context(frame_number: u64) -> UpdateContext {
    zoomed_context(frame_number, 5.0)
}

pub fn zoomed_context(frame_number: u64, zoom: f32) -> UpdateContext {
    UpdateContext::new(
        frame_number,
        MapEnv::new()
            .with(ZOOM_LEVEL, Value::Number(zoom))
            .with(PIXEL_TO_WORLD, Value::Number(PIXEL_RATIO)),
    )
}

pub fn draw_context(tile: &Tile) -> DrawContext {
    DrawContext {
        frame_number: 1,
        time_ms: 0.0,
        tile_key: tile.key,
        tile_size: tile.bounds.size(),
        world_offset: tile.world_offset,
    }
}

/// `below` up to zoom level 10, `above` from there on.
pub fn zoom_step(below: f32, above: f32) -> Attr {
    Attr::from(Expr::Step {
        input: ZOOM_LEVEL.into(),
        default: Box::new(Value::Number(below)),
        stops: vec![(10.0, Value::Number(above))],
    })
}

/// Two squares made of four triangles with normals and outline edges.
///
/// The index buffer has 12 entries.
pub fn square_geometry() -> Geometry {
    #[rustfmt::skip]
    let positions = vec![
        0.0, 0.0, 0.0,
        1.0, 0.0, 0.0,
        1.0, 1.0, 0.0,
        0.0, 1.0, 0.0,
        2.0, 0.0, 0.0,
        2.0, 1.0, 0.0,
    ];
    let normals = positions.chunks(3).flat_map(|_| vec![0.0, 0.0, 1.0]).collect();
    Geometry::new()
        .with_attribute("position", BufferAttribute::new(positions, 3))
        .with_attribute("normal", BufferAttribute::new(normals, 3))
        .with_index(vec![0, 1, 2, 0, 2, 3, 1, 4, 5, 1, 5, 2])
        .with_edge_index(vec![0, 1, 1, 4, 4, 5, 5, 2, 2, 3, 3, 0])
}
