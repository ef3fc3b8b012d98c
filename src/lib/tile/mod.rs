mod decoded;

pub use decoded::*;

use crate::*;
use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct DataSource {
    pub name: String,
    /// Ground data, e.g. terrain or landuse, is drawn below everything else.
    pub is_ground: bool,
}

impl DataSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_ground: false,
        }
    }
}

/// Tracks in which frame a tile was last visible.
///
/// Handlers keep a reference to it for every object they created, so they can restrict
/// visibility changes to tiles which are on screen.
#[derive(Debug, Default)]
pub struct FrameVisibility {
    last_visible_frame: Cell<Option<u64>>,
    recheck: Cell<bool>,
}

impl FrameVisibility {
    pub fn last_visible_frame(&self) -> Option<u64> {
        self.last_visible_frame.get()
    }

    pub fn is_visible_in(&self, frame_number: u64) -> bool {
        self.last_visible_frame.get() == Some(frame_number)
    }

    pub fn mark(&self, frame_number: u64) {
        self.last_visible_frame.set(Some(frame_number));
    }

    /// Asks the tile manager to recompute the tile's visibility, e.g. after objects changed.
    pub fn request_recheck(&self) {
        self.recheck.set(true);
    }

    /// Returns whether a recheck was requested and clears the request.
    pub fn take_recheck(&self) -> bool {
        self.recheck.replace(false)
    }
}

pub struct Tile {
    pub key: TileKey,
    pub bounds: Bounds,
    pub data_source: Rc<DataSource>,
    /// Index of the world copy this tile is drawn in.
    pub offset: i32,
    pub world_offset: glm::Vec3,
    /// Whether extruded polygons of this tile grow into place.
    pub animate_extrusion: bool,
    visibility: Rc<FrameVisibility>,
    objects: Vec<ObjectRef>,
    dynamic_handlers: Vec<HandlerRef>,
}

impl Tile {
    pub fn new(key: TileKey, bounds: Bounds, data_source: Rc<DataSource>) -> Self {
        Self {
            key,
            bounds,
            data_source,
            offset: 0,
            world_offset: glm::vec3(0.0, 0.0, 0.0),
            animate_extrusion: false,
            visibility: Rc::new(FrameVisibility::default()),
            objects: vec![],
            dynamic_handlers: vec![],
        }
    }

    /// Places the tile in the world copy `offset`, which is `world_width` units wide.
    pub fn with_offset(mut self, offset: i32, world_width: f32) -> Self {
        self.offset = offset;
        self.world_offset = glm::vec3(offset as f32 * world_width, 0.0, 0.0);
        self
    }

    pub fn visibility(&self) -> &Rc<FrameVisibility> {
        &self.visibility
    }

    pub fn mark_visible(&self, frame_number: u64) {
        self.visibility.mark(frame_number);
    }

    pub fn objects(&self) -> &[ObjectRef] {
        &self.objects
    }

    pub fn dynamic_handlers(&self) -> &[HandlerRef] {
        &self.dynamic_handlers
    }

    /// Takes ownership of an object created for this tile.
    pub fn add_object(&mut self, object: ObjectRef, kind: &TechniqueKind) {
        {
            let mut object = object.borrow_mut();
            object.user_data.tile_key = Some(self.key);
            object.user_data.data_source = Some(self.data_source.name.clone());
            object.user_data.kind = Some(kind.clone());
        }
        self.objects.push(object);
        self.visibility.request_recheck();
    }

    /// Schedules a handler for per frame updates. Returns `false` if it already was.
    pub fn add_dynamic_handler(&mut self, handler: HandlerRef) -> bool {
        if self
            .dynamic_handlers
            .iter()
            .any(|known| same_handler(known, &handler))
        {
            return false;
        }
        self.dynamic_handlers.push(handler);
        true
    }

    /// Runs the per frame update of every dynamic handler of the tile.
    pub fn update(&self, ctx: &UpdateContext) {
        for handler in &self.dynamic_handlers {
            handler.borrow_mut().update(ctx);
        }
    }

    /// Draws the visible objects of the tile, sorted by render order.
    ///
    /// The tile's handlers must have been updated for `ctx` already, see [`render_frame`].
    pub fn draw(&self, ctx: &UpdateContext) -> Vec<DrawCall> {
        let draw_ctx = DrawContext {
            frame_number: ctx.frame_number,
            time_ms: ctx.time_ms,
            tile_key: self.key,
            tile_size: self.bounds.size(),
            world_offset: self.world_offset,
        };
        let mut calls = self
            .objects
            .iter()
            .filter_map(|object| {
                let object = object.borrow();
                if object.visible && object.material.borrow().visible {
                    Some(object.draw(&draw_ctx))
                } else {
                    None
                }
            })
            .collect::<Vec<_>>();
        sort_by_render_order(&mut calls);
        calls
    }

    /// Releases every object of the tile.
    ///
    /// Shared handlers outlive the tile. They drop the tile's objects on their next update.
    pub fn dispose(&mut self) {
        log::debug!(
            "Disposing tile {} with {} objects.",
            self.key,
            self.objects.len()
        );
        self.objects.clear();
        self.dynamic_handlers.clear();
    }
}

impl std::fmt::Debug for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Tile")
            .field("key", &self.key)
            .field("offset", &self.offset)
            .field("objects", &self.objects.len())
            .field("dynamic_handlers", &self.dynamic_handlers.len())
            .finish()
    }
}

fn sort_by_render_order(calls: &mut [DrawCall]) {
    calls.sort_by(|a, b| {
        a.render_order
            .partial_cmp(&b.render_order)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Renders one frame of `tiles`, the tiles on screen.
///
/// All tiles are marked visible before any handler is updated. Handlers shared between
/// tiles update once per frame, and their visibility changes have to reach every tile drawn
/// in it. Draw calls of all tiles are returned sorted by render order.
pub fn render_frame(tiles: &[&Tile], ctx: &UpdateContext) -> Vec<DrawCall> {
    for tile in tiles {
        tile.mark_visible(ctx.frame_number);
    }
    for tile in tiles {
        tile.update(ctx);
    }
    let mut calls: Vec<DrawCall> = tiles.iter().flat_map(|tile| tile.draw(ctx)).collect();
    sort_by_render_order(&mut calls);
    calls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    #[test]
    fn recheck_is_requested_by_new_objects() {
        let mut tile = tile(0);
        assert!(!tile.visibility().take_recheck());

        let material = Rc::new(std::cell::RefCell::new(Material::new(MaterialKind::Basic)));
        let object = RenderObject::new(
            ObjectKind::Mesh,
            Rc::new(BufferGeometry::new()),
            material,
        );
        tile.add_object(Rc::new(std::cell::RefCell::new(object)), &TechniqueKind::Fill);

        assert!(tile.visibility().take_recheck());
        assert!(!tile.visibility().take_recheck());
        let object = tile.objects()[0].borrow();
        assert_eq!(object.user_data.tile_key, Some(tile.key));
        assert_eq!(object.user_data.kind, Some(TechniqueKind::Fill));
    }

    #[test]
    fn offsets_move_the_tile_by_whole_worlds() {
        let tile = tile(0).with_offset(-1, 1000.0);
        assert_eq!(tile.offset, -1);
        assert_eq!(tile.world_offset.x, -1000.0);
    }

    #[test]
    fn shared_handlers_see_every_tile_of_the_frame() {
        let technique = Rc::new(
            Technique::new(TechniqueKind::Fill, TechniqueKey::new(0, 0))
                .with("opacity", zoom_step(1.0, 0.0)),
        );
        let handler = FillHandler::create(technique, &tile(0), &context(1), &Renderer::default())
            .expect("fill handler");

        let geometry = square_geometry();
        let mut a = tile(0);
        let mut b = tile(1);
        for tile in [&mut a, &mut b].iter_mut() {
            let objects = handler
                .borrow_mut()
                .create_object(tile, &geometry, &Group::new(0, 6, 0))
                .expect("objects");
            for object in objects {
                tile.add_object(object, &TechniqueKind::Fill);
            }
            tile.add_dynamic_handler(handler.clone());
        }

        assert_eq!(render_frame(&[&a, &b], &context(1)).len(), 2);

        // Faded out, whichever tile comes first.
        assert!(render_frame(&[&a, &b], &zoomed_context(2, 12.0)).is_empty());
        assert!(!a.objects()[0].borrow().visible);
        assert!(!b.objects()[0].borrow().visible);

        // Faded back in, in the other order.
        let calls = render_frame(&[&b, &a], &context(3));
        assert_eq!(calls.len(), 2);
        assert!(a.objects()[0].borrow().visible);
        assert!(b.objects()[0].borrow().visible);
        assert_eq!(render_frame(&[&a], &context(4)).len(), 1);
    }
}
