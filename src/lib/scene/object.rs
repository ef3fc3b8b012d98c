use crate::*;
use std::rc::Rc;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    Mesh,
    LineSegments,
    SolidLine,
    DashedLine,
}

/// Metadata carried by every object, for picking and for the owning tile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectData {
    pub tile_key: Option<TileKey>,
    pub data_source: Option<String>,
    pub kind: Option<TechniqueKind>,
    pub technique: Option<TechniqueKey>,
    /// Ids of the features drawn by the object.
    pub feature_ids: Vec<u64>,
    /// First primitive of each feature in `feature_ids`.
    pub feature_starts: Vec<u32>,
    pub displacement: Option<Rc<DisplacementTexture>>,
}

/// Everything a render hook may look at while an object is being drawn.
#[derive(Debug, Clone)]
pub struct DrawContext {
    pub frame_number: u64,
    pub time_ms: f64,
    pub tile_key: TileKey,
    /// Extents of the tile the object belongs to.
    pub tile_size: glm::Vec3,
    pub world_offset: glm::Vec3,
}

/// Runs right before or after an object is drawn with its material.
///
/// Hooks carry state that belongs to the object rather than to the shared material.
pub type RenderHook = Box<dyn Fn(&mut Material, &DrawContext)>;

/// The material state and buffers one draw submits.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub kind: ObjectKind,
    pub render_order: f32,
    pub tile_key: Option<TileKey>,
    pub draw_range: DrawRange,
    pub material: Material,
}

pub struct RenderObject {
    pub kind: ObjectKind,
    pub geometry: Rc<BufferGeometry>,
    pub material: MaterialRef,
    pub render_order: f32,
    pub visible: bool,
    pub user_data: ObjectData,
    before_render: Vec<RenderHook>,
    after_render: Vec<RenderHook>,
}

impl RenderObject {
    pub fn new(kind: ObjectKind, geometry: Rc<BufferGeometry>, material: MaterialRef) -> Self {
        Self {
            kind,
            geometry,
            material,
            render_order: 0.0,
            visible: true,
            user_data: ObjectData::default(),
            before_render: vec![],
            after_render: vec![],
        }
    }

    pub fn on_before_render(&mut self, hook: RenderHook) {
        self.before_render.push(hook);
    }

    pub fn on_after_render(&mut self, hook: RenderHook) {
        self.after_render.push(hook);
    }

    pub fn has_render_hooks(&self) -> bool {
        !self.before_render.is_empty() || !self.after_render.is_empty()
    }

    /// Snapshots the material as this object sees it.
    ///
    /// The before-render hooks are applied to the shared material for the duration of the
    /// snapshot and the after-render hooks undo them.
    pub fn draw(&self, ctx: &DrawContext) -> DrawCall {
        let mut material = self.material.borrow_mut();
        for hook in &self.before_render {
            hook(&mut *material, ctx);
        }
        let snapshot = material.clone();
        for hook in &self.after_render {
            hook(&mut *material, ctx);
        }

        DrawCall {
            kind: self.kind,
            render_order: self.render_order,
            tile_key: self.user_data.tile_key,
            draw_range: self.geometry.draw_range,
            material: snapshot,
        }
    }
}

impl std::fmt::Debug for RenderObject {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("RenderObject")
            .field("kind", &self.kind)
            .field("render_order", &self.render_order)
            .field("visible", &self.visible)
            .field("draw_range", &self.geometry.draw_range)
            .field("user_data", &self.user_data)
            .field("hooks", &(self.before_render.len() + self.after_render.len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn hooks_only_affect_the_snapshot() {
        let material = Rc::new(RefCell::new(Material::new(MaterialKind::SolidLine)));
        let mut object = RenderObject::new(
            ObjectKind::SolidLine,
            Rc::new(BufferGeometry::new()),
            material.clone(),
        );
        object.on_before_render(Box::new(|material: &mut Material, ctx: &DrawContext| {
            material.clip_tile_size = Some([ctx.tile_size.x, ctx.tile_size.y]);
        }));
        object.on_after_render(Box::new(|material: &mut Material, _: &DrawContext| {
            material.clip_tile_size = None;
        }));

        let ctx = DrawContext {
            frame_number: 1,
            time_ms: 0.0,
            tile_key: TileKey::new(1, 0, 0),
            tile_size: glm::vec3(256.0, 128.0, 0.0),
            world_offset: glm::vec3(0.0, 0.0, 0.0),
        };
        let call = object.draw(&ctx);
        assert_eq!(call.material.clip_tile_size, Some([256.0, 128.0]));
        assert_eq!(material.borrow().clip_tile_size, None);
    }
}
