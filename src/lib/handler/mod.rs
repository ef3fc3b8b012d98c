//! Technique handlers turn one technique and tile geometry into render objects.
//!
//! A handler owns the materials of its technique. If nothing about those materials depends
//! on a particular tile, the handler is pooled and every tile drawn with the technique
//! shares them. Attributes which change with the view are re-evaluated by updaters which
//! run at most once per frame.

mod common;
mod extruded;
mod fill;
mod line;
mod pool;
mod terrain;

pub use common::*;
pub use extruded::*;
pub use fill::*;
pub use line::*;
pub use pool::*;
pub use terrain::*;

use crate::*;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub type HandlerRef = Rc<RefCell<dyn TechniqueHandler>>;

/// `true` if both references point to the same handler instance.
pub fn same_handler(a: &HandlerRef, b: &HandlerRef) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

/// Camera distances of the current view.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewRanges {
    pub near: f32,
    pub far: f32,
    pub minimum: f32,
    /// The farthest distance anything can be visible at. Fade distances are relative to it.
    pub maximum: f32,
}

impl Default for ViewRanges {
    fn default() -> Self {
        Self {
            near: 1.0,
            far: 10_000.0,
            minimum: 1.0,
            maximum: 10_000.0,
        }
    }
}

/// The state of the view handlers are updated against.
#[derive(Debug, Clone)]
pub struct UpdateContext {
    /// Increases by one with every rendered frame.
    pub frame_number: u64,
    pub time_ms: f64,
    pub env: MapEnv,
    pub view_ranges: ViewRanges,
    pub cache: Option<Rc<RefCell<ExprCache>>>,
}

impl UpdateContext {
    pub fn new(frame_number: u64, env: MapEnv) -> Self {
        Self {
            frame_number,
            time_ms: 0.0,
            env,
            view_ranges: ViewRanges::default(),
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Rc<RefCell<ExprCache>>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn evaluate(&self, attr: &Attr) -> Option<Value> {
        if let Some(cache) = &self.cache {
            cache.borrow_mut().begin_frame(self.frame_number);
        }
        attr.evaluate(&self.env, self.cache.as_deref())
    }

    pub fn number(&self, attr: Option<&Attr>) -> Option<f32> {
        attr.and_then(|attr| self.evaluate(attr))
            .and_then(|value| value.as_number())
    }

    pub fn color(&self, attr: Option<&Attr>) -> Option<Color> {
        attr.and_then(|attr| self.evaluate(attr))
            .and_then(|value| value.as_color())
    }

    pub fn boolean(&self, attr: Option<&Attr>) -> Option<bool> {
        attr.and_then(|attr| self.evaluate(attr))
            .and_then(|value| value.as_bool())
    }
}

/// An object a handler created, together with the visibility of the tile it was created for.
pub struct ObjectEntry {
    pub object: Weak<RefCell<RenderObject>>,
    pub tile: Rc<FrameVisibility>,
}

impl ObjectEntry {
    pub fn is_alive(&self) -> bool {
        self.object.strong_count() > 0
    }
}

/// Re-evaluates dynamic attributes. Receives every live object of the handler.
pub type Updater = Box<dyn FnMut(&UpdateContext, &[ObjectEntry])>;

/// State every handler has.
pub struct HandlerBase {
    technique: Rc<Technique>,
    render_order: f32,
    updaters: Vec<Updater>,
    objects: Vec<ObjectEntry>,
    last_frame: Option<u64>,
    shareable: bool,
    applied_updates: u64,
}

impl HandlerBase {
    /// Evaluates the technique's render order once, against `ctx`.
    pub fn new(technique: Rc<Technique>, ctx: &UpdateContext) -> Self {
        Self {
            render_order: ctx.number(technique.render_order.as_ref()).unwrap_or(0.0),
            technique,
            updaters: vec![],
            objects: vec![],
            last_frame: None,
            shareable: true,
            applied_updates: 0,
        }
    }

    pub fn technique(&self) -> &Rc<Technique> {
        &self.technique
    }

    /// Render order of objects drawing `group`.
    pub fn render_order(&self, group: &Group) -> f32 {
        self.render_order + group.render_order_offset.unwrap_or(0.0)
    }

    pub fn add_updater(&mut self, updater: impl FnMut(&UpdateContext, &[ObjectEntry]) + 'static) {
        self.updaters.push(Box::new(updater));
    }

    /// Remembers `object` for visibility updates, scoped to `tile`.
    pub fn register_object(&mut self, tile: &Tile, object: &ObjectRef) {
        self.objects.push(ObjectEntry {
            object: Rc::downgrade(object),
            tile: tile.visibility().clone(),
        });
    }

    pub fn objects(&self) -> &[ObjectEntry] {
        &self.objects
    }

    /// Prevents the pool from handing this handler to other tiles.
    pub fn set_private(&mut self) {
        self.shareable = false;
    }

    pub fn is_shareable(&self) -> bool {
        self.shareable
    }

    pub fn is_dynamic(&self) -> bool {
        !self.updaters.is_empty()
    }

    /// How often the updaters actually ran.
    pub fn applied_updates(&self) -> u64 {
        self.applied_updates
    }

    /// Runs all updaters in registration order, unless they already ran in this frame.
    pub fn update(&mut self, ctx: &UpdateContext) {
        if self.last_frame == Some(ctx.frame_number) {
            return;
        }
        self.objects.retain(ObjectEntry::is_alive);
        for updater in &mut self.updaters {
            updater(ctx, &self.objects);
        }
        self.last_frame = Some(ctx.frame_number);
        self.applied_updates += 1;
    }
}

/// Creates and maintains the render objects of one technique.
///
/// Implementors only provide access to their `HandlerBase` and object creation, the
/// update protocol is the same for all of them.
pub trait TechniqueHandler {
    fn base(&self) -> &HandlerBase;

    fn base_mut(&mut self) -> &mut HandlerBase;

    /// Builds the objects for `group` of `geometry` on behalf of `tile`.
    ///
    /// Shared handlers are called once per tile.
    fn create_object(
        &mut self,
        tile: &Tile,
        geometry: &Geometry,
        group: &Group,
    ) -> Result<Vec<ObjectRef>>;

    fn technique(&self) -> &Rc<Technique> {
        self.base().technique()
    }

    fn update(&mut self, ctx: &UpdateContext) {
        self.base_mut().update(ctx);
    }

    fn is_dynamic(&self) -> bool {
        self.base().is_dynamic()
    }

    fn is_shareable_across_tiles(&self) -> bool {
        self.base().is_shareable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn updates_apply_once_per_frame() {
        let technique = Rc::new(Technique::new(TechniqueKind::Fill, TechniqueKey::new(0, 0)));
        let mut base = HandlerBase::new(technique, &UpdateContext::new(0, MapEnv::new()));
        assert!(!base.is_dynamic());

        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();
        base.add_updater(move |_: &UpdateContext, _: &[ObjectEntry]| counter.set(counter.get() + 1));
        assert!(base.is_dynamic());

        let ctx = UpdateContext::new(1, MapEnv::new());
        base.update(&ctx);
        base.update(&ctx);
        assert_eq!(runs.get(), 1);

        base.update(&UpdateContext::new(2, MapEnv::new()));
        base.update(&UpdateContext::new(3, MapEnv::new()));
        assert_eq!(runs.get(), 3);
        assert_eq!(base.applied_updates(), 3);
    }

    #[test]
    fn cached_evaluation_is_scoped_to_the_frame() {
        let cache = Rc::new(RefCell::new(ExprCache::new()));
        let zoom = Attr::from(Expr::Var(ZOOM_LEVEL.into()));

        let ctx = UpdateContext::new(1, MapEnv::new().with(ZOOM_LEVEL, Value::Number(2.0)))
            .with_cache(cache.clone());
        assert_eq!(ctx.number(Some(&zoom)), Some(2.0));

        let ctx = UpdateContext::new(2, MapEnv::new().with(ZOOM_LEVEL, Value::Number(3.0)))
            .with_cache(cache);
        assert_eq!(ctx.number(Some(&zoom)), Some(3.0));
    }
}
