//! Synthetic tiles standing in for a tile decoder.

use sextant::*;
use std::rc::Rc;

pub const TILE_SIZE: f32 = 1000.0;
pub const LEVEL: u32 = 12;

/// A tile together with the data it was decoded from.
pub struct LoadedTile {
    pub tile: Tile,
    pub decoded: DecodedTile,
}

/// A `size` by `size` grid of tiles with one quad per technique of `theme`.
pub fn tile_grid(theme: &Theme, size: u32) -> Vec<LoadedTile> {
    let source = Rc::new(DataSource::new("synthetic"));
    (0..size)
        .flat_map(|column| (0..size).map(move |row| (column, row)))
        .map(|(column, row)| {
            let bounds = Bounds::square(
                glm::vec2(column as f32 * TILE_SIZE, row as f32 * TILE_SIZE),
                TILE_SIZE,
            );
            let mut tile = Tile::new(TileKey::new(LEVEL, column, row), bounds, source.clone());
            tile.animate_extrusion = true;
            LoadedTile {
                tile,
                decoded: decode(theme, column, row),
            }
        })
        .collect()
}

fn decode(theme: &Theme, column: u32, row: u32) -> DecodedTile {
    let techniques = theme.techniques().to_vec();
    let mut surface = quads(techniques.len());
    let mut geometries = vec![];

    for (index, technique) in techniques.iter().enumerate() {
        if technique.kind == TechniqueKind::Terrain {
            let heights = (0..16)
                .map(|i| ((i + column * 7 + row * 3) % 16) as f32 * 25.0)
                .collect();
            geometries.push(
                quads(1)
                    .with_object_infos(ObjectInfos::Displacement(DisplacementMap {
                        x_size: 4,
                        y_size: 4,
                        heights: Rc::new(heights),
                    }))
                    .with_group(Group::new(0, 6, index).with_render_order_offset(-10.0)),
            );
        } else {
            // Two halves of the quad, so the creator has something to merge.
            let start = index as u32 * 6;
            surface.groups.push(Group::new(start, 3, index));
            surface.groups.push(Group::new(start + 3, 3, index));
        }
    }

    geometries.insert(0, surface);
    DecodedTile {
        techniques,
        geometries,
    }
}

/// `n` unit quads in a row, each its own feature.
fn quads(n: usize) -> Geometry {
    let mut positions = Vec::with_capacity(n * 12);
    let mut index = Vec::with_capacity(n * 6);
    let mut edges = Vec::with_capacity(n * 8);
    for i in 0..n {
        let x = i as f32 * 2.0;
        positions.extend(&[x, 0.0, 0.0, x + 1.0, 0.0, 0.0, x + 1.0, 1.0, 0.0, x, 1.0, 0.0]);
        let v = i as u32 * 4;
        index.extend(&[v, v + 1, v + 2, v, v + 2, v + 3]);
        edges.extend(&[v, v + 1, v + 1, v + 2, v + 2, v + 3, v + 3, v]);
    }
    let normals = (0..n * 4).flat_map(|_| vec![0.0, 0.0, 1.0]).collect();

    Geometry::new()
        .with_attribute("position", BufferAttribute::new(positions, 3))
        .with_attribute("normal", BufferAttribute::new(normals, 3))
        .with_index(index)
        .with_edge_index(edges)
        .with_object_infos(ObjectInfos::Features {
            ids: (0..n as u64).collect(),
            starts: (0..n as u32).map(|i| i * 6).collect(),
        })
}
