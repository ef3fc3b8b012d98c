//! Creates the render objects of decoded tiles.

pub mod legacy;

use crate::*;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::rc::Rc;

/// Decides whether objects are created for a technique at all.
pub type TechniqueFilter = Box<dyn Fn(&Technique) -> bool>;

/// A range of one geometry objects were created for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Span {
    pub geometry_index: usize,
    pub start: u32,
    pub count: u32,
    pub technique_index: usize,
}

/// How one technique is turned into objects within one tile.
enum Resolution {
    Handler(HandlerRef),
    Legacy,
}

pub struct TileGeometryCreator {
    pool: TechniqueHandlerPool,
    filter: Option<TechniqueFilter>,
}

impl TileGeometryCreator {
    pub fn new(renderer: Renderer) -> Self {
        Self {
            pool: TechniqueHandlerPool::new(renderer),
            filter: None,
        }
    }

    /// Only creates objects for techniques `filter` accepts.
    pub fn with_filter(mut self, filter: impl Fn(&Technique) -> bool + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn pool(&self) -> &TechniqueHandlerPool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut TechniqueHandlerPool {
        &mut self.pool
    }

    fn is_enabled(&self, technique: &Technique) -> bool {
        !self.pool.renderer().is_disabled(&technique.kind)
            && self.filter.as_ref().map_or(true, |filter| filter(technique))
    }

    /// Creates the objects of every group of `decoded` not yet created for the tile's offset
    /// and registers them on `tile`.
    ///
    /// Contiguous groups of the same technique are merged into one span. Groups whose technique
    /// can't be drawn are skipped, any other error aborts the tile.
    pub fn create_all_geometries(
        &mut self,
        tile: &mut Tile,
        decoded: &mut DecodedTile,
        ctx: &UpdateContext,
    ) -> Result<Vec<Span>> {
        let offset = tile.offset;
        let DecodedTile {
            techniques,
            geometries,
        } = decoded;

        let mut resolutions: HashMap<usize, Resolution> = HashMap::new();
        let mut legacy_materials: HashMap<usize, MaterialRef> = HashMap::new();
        let mut spans = vec![];

        for (geometry_index, geometry) in geometries.iter_mut().enumerate() {
            let mut i = 0;
            while i < geometry.groups.len() {
                let group = &geometry.groups[i];
                if group.is_created(offset) {
                    i += 1;
                    continue;
                }

                let technique_index = group.technique_index;
                let technique = match techniques.get(technique_index) {
                    Some(technique) => technique.clone(),
                    None => {
                        log::warn!(
                            "Tile {} references technique {} but only has {}.",
                            tile.key,
                            technique_index,
                            techniques.len()
                        );
                        i += 1;
                        continue;
                    }
                };
                if !self.is_enabled(&technique) {
                    i += 1;
                    continue;
                }

                let mut merged = Group::new(group.start, group.count, technique_index);
                merged.render_order_offset = group.render_order_offset;
                let mut end = i + 1;
                while let Some(next) = geometry.groups.get(end) {
                    if next.technique_index != technique_index
                        || next.start != merged.end()
                        || next.is_created(offset)
                    {
                        break;
                    }
                    merged.count += next.count;
                    end += 1;
                }
                for group in &mut geometry.groups[i..end] {
                    group.mark_created(offset);
                }
                i = end;

                let created = self.create_span(
                    tile,
                    geometry,
                    &merged,
                    &technique,
                    ctx,
                    &mut resolutions,
                    &mut legacy_materials,
                );
                match created {
                    Ok(()) => spans.push(Span {
                        geometry_index,
                        start: merged.start,
                        count: merged.count,
                        technique_index,
                    }),
                    Err(err) if err.is_recoverable() => {
                        log::warn!(
                            "Skipping {} primitives of technique {} in tile {}: {}",
                            merged.count,
                            technique.name,
                            tile.key,
                            err
                        );
                    }
                    Err(err) => {
                        log::error!("Failed to create the geometry of tile {}: {}", tile.key, err);
                        return Err(err);
                    }
                }
            }
        }

        log::debug!(
            "Created {} spans for tile {} at offset {}.",
            spans.len(),
            tile.key,
            offset
        );
        Ok(spans)
    }

    #[allow(clippy::too_many_arguments)]
    fn create_span(
        &mut self,
        tile: &mut Tile,
        geometry: &Geometry,
        group: &Group,
        technique: &Rc<Technique>,
        ctx: &UpdateContext,
        resolutions: &mut HashMap<usize, Resolution>,
        legacy_materials: &mut HashMap<usize, MaterialRef>,
    ) -> Result<()> {
        let resolution = match resolutions.entry(group.technique_index) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let resolution = if self.pool.can_handle(technique) {
                    Resolution::Handler(self.pool.get_handler(technique, tile, ctx)?)
                } else {
                    Resolution::Legacy
                };
                entry.insert(resolution)
            }
        };

        match resolution {
            Resolution::Handler(handler) => {
                let objects = handler.borrow_mut().create_object(tile, geometry, group)?;
                for object in objects {
                    tile.add_object(object, &technique.kind);
                }
                if handler.borrow().is_dynamic() {
                    tile.add_dynamic_handler(handler.clone());
                }
            }
            Resolution::Legacy => {
                let material = match legacy_materials.entry(group.technique_index) {
                    Entry::Occupied(entry) => entry.get().clone(),
                    Entry::Vacant(entry) => entry
                        .insert(legacy::create_material(technique, ctx)?)
                        .clone(),
                };
                let object = legacy::create_object(technique, geometry, group, &material, ctx)?;
                tile.add_object(object, &technique.kind);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    fn decoded(groups: Vec<Group>) -> DecodedTile {
        let mut geometry = square_geometry();
        geometry.groups = groups;
        DecodedTile {
            techniques: vec![
                Rc::new(
                    Technique::new(TechniqueKind::Fill, TechniqueKey::new(0, 0))
                        .with("color", Attr::color(Color::BLUE))
                        .with("opacity", zoom_step(1.0, 0.5)),
                ),
                Rc::new(
                    Technique::new(TechniqueKind::SolidLine, TechniqueKey::new(0, 1))
                        .with("line-width", Attr::number(2.0)),
                ),
                Rc::new(
                    Technique::new(TechniqueKind::Standard, TechniqueKey::new(0, 2))
                        .with("color", Attr::color(Color::GREEN)),
                ),
                Rc::new(Technique::new(
                    TechniqueKind::Other("text".into()),
                    TechniqueKey::new(0, 3),
                )),
            ],
            geometries: vec![geometry],
        }
    }

    #[test]
    fn contiguous_groups_of_one_technique_are_merged() {
        let mut creator = TileGeometryCreator::new(Renderer::default());
        let mut tile = tile(0);
        let mut decoded = decoded(vec![
            Group::new(0, 5, 0),
            Group::new(5, 3, 0),
            Group::new(8, 2, 1),
        ]);

        let spans = creator
            .create_all_geometries(&mut tile, &mut decoded, &context(1))
            .expect("geometry");
        assert_eq!(
            spans,
            vec![
                Span {
                    geometry_index: 0,
                    start: 0,
                    count: 8,
                    technique_index: 0
                },
                Span {
                    geometry_index: 0,
                    start: 8,
                    count: 2,
                    technique_index: 1
                },
            ]
        );
        assert_eq!(tile.objects().len(), 2);
        assert!(decoded.geometries[0].groups.iter().all(|group| group.is_created(0)));
    }

    #[test]
    fn repeated_offsets_create_nothing() {
        let mut creator = TileGeometryCreator::new(Renderer::default());
        let mut original = tile(0);
        let mut decoded = decoded(vec![Group::new(0, 6, 0), Group::new(6, 6, 1)]);

        creator
            .create_all_geometries(&mut original, &mut decoded, &context(1))
            .expect("geometry");
        let objects = original.objects().len();
        let spans = creator
            .create_all_geometries(&mut original, &mut decoded, &context(1))
            .expect("geometry");
        assert!(spans.is_empty());
        assert_eq!(original.objects().len(), objects);

        // A wrapped copy of the tile gets its own objects.
        let mut wrapped = tile(0).with_offset(1, 1000.0);
        let spans = creator
            .create_all_geometries(&mut wrapped, &mut decoded, &context(1))
            .expect("geometry");
        assert_eq!(spans.len(), 2);
    }

    #[test]
    fn dynamic_handlers_are_scheduled_once() {
        let mut creator = TileGeometryCreator::new(Renderer::default());
        let mut tile = tile(0);
        let mut decoded = decoded(vec![
            Group::new(0, 4, 0),
            Group::new(4, 4, 1),
            Group::new(8, 4, 0),
        ]);

        creator
            .create_all_geometries(&mut tile, &mut decoded, &context(1))
            .expect("geometry");
        assert_eq!(tile.objects().len(), 3);
        // Only the fill has an expression.
        assert_eq!(tile.dynamic_handlers().len(), 1);
        assert_eq!(creator.pool().stats().hits, 0);
        assert_eq!(creator.pool().len(), 2);
    }

    #[test]
    fn unknown_techniques_are_skipped() {
        let mut creator = TileGeometryCreator::new(Renderer::default());
        let mut tile = tile(0);
        let mut decoded = decoded(vec![Group::new(0, 4, 3), Group::new(4, 4, 2)]);

        let spans = creator
            .create_all_geometries(&mut tile, &mut decoded, &context(1))
            .expect("geometry");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].technique_index, 2);
        assert_eq!(tile.objects()[0].borrow().kind, ObjectKind::Mesh);
        assert!(tile.dynamic_handlers().is_empty());
    }

    #[test]
    fn invalid_groups_abort_the_tile() {
        let mut creator = TileGeometryCreator::new(Renderer::default());
        let mut tile = tile(0);
        let mut decoded = decoded(vec![Group::new(8, 20, 0)]);

        assert!(matches!(
            creator.create_all_geometries(&mut tile, &mut decoded, &context(1)),
            Err(Error::InvalidGroup { .. })
        ));
    }

    #[test]
    fn disabled_and_filtered_techniques_are_skipped() {
        let renderer = Renderer {
            disabled_kinds: vec!["solid-line".to_string()],
            ..Renderer::default()
        };
        let mut creator = TileGeometryCreator::new(renderer)
            .with_filter(|technique: &Technique| technique.kind != TechniqueKind::Standard);
        let mut tile = tile(0);
        let mut decoded = decoded(vec![
            Group::new(0, 4, 0),
            Group::new(4, 4, 1),
            Group::new(8, 4, 2),
        ]);

        let spans = creator
            .create_all_geometries(&mut tile, &mut decoded, &context(1))
            .expect("geometry");
        assert_eq!(spans.len(), 1);
        assert!(!decoded.geometries[0].groups[1].is_created(0));
    }

    #[test]
    fn rendering_updates_before_drawing() {
        let mut creator = TileGeometryCreator::new(Renderer::default());
        let mut tile = tile(0);
        let mut decoded = decoded(vec![Group::new(0, 6, 0)]);
        creator
            .create_all_geometries(&mut tile, &mut decoded, &context(1))
            .expect("geometry");

        let calls = render_frame(&[&tile], &zoomed_context(2, 12.0));
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].material.opacity, 0.5);

        tile.dispose();
        assert!(tile.objects().is_empty());
        assert!(render_frame(&[&tile], &context(3)).is_empty());
    }
}
