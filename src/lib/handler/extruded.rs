use super::fill::{has_width, setup_line_width};
use crate::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Render order offset of the depth pre-pass, it must be drawn before the main mesh.
const DEPTH_PRE_PASS_ORDER: f32 = -0.1;
/// Render order offset of the edges, they are drawn right after the main mesh.
const EDGE_ORDER: f32 = 0.1;

/// Progress of extruded polygons growing out of the ground.
///
/// The animation starts in the first frame the handler is updated in.
#[derive(Debug)]
pub struct ExtrusionAnimation {
    duration_ms: f32,
    start_ms: Cell<Option<f64>>,
    ratio: Cell<f32>,
}

impl ExtrusionAnimation {
    pub fn new(duration_ms: f32) -> Self {
        Self {
            duration_ms,
            start_ms: Cell::new(None),
            ratio: Cell::new(0.0),
        }
    }

    pub fn advance(&self, time_ms: f64) {
        let start = match self.start_ms.get() {
            Some(start) => start,
            None => {
                self.start_ms.set(Some(time_ms));
                time_ms
            }
        };
        let t = if self.duration_ms > 0.0 {
            ((time_ms - start) as f32 / self.duration_ms).max(0.0).min(1.0)
        } else {
            1.0
        };
        // Cubic ease out.
        self.ratio.set(1.0 - (1.0 - t).powi(3));
    }

    pub fn ratio(&self) -> f32 {
        self.ratio.get()
    }

    pub fn is_finished(&self) -> bool {
        self.ratio.get() >= 1.0
    }
}

/// Extruded polygons such as buildings.
pub struct ExtrudedPolygonHandler {
    base: HandlerBase,
    main: MaterialRef,
    depth: Option<MaterialRef>,
    edge: Option<MaterialRef>,
    animation: Option<Rc<ExtrusionAnimation>>,
}

impl ExtrudedPolygonHandler {
    pub fn new(
        technique: Rc<Technique>,
        tile: &Tile,
        ctx: &UpdateContext,
        renderer: &Renderer,
    ) -> Result<Self> {
        expect_kind(
            &technique,
            "extruded-polygon",
            &[TechniqueKind::ExtrudedPolygon],
        )?;

        let mut base = HandlerBase::new(technique.clone(), ctx);
        let main = new_material(
            Material::from_technique(&technique, &ctx.env)
                .ok_or(Error::MissingMaterial("extruded-polygon"))?,
        );
        setup_color(
            &mut base,
            &main,
            technique.color.clone(),
            technique.opacity.clone(),
            ctx,
        );

        if main.borrow().kind == MaterialKind::Standard && is_dynamic(technique.emissive.as_ref()) {
            let main = main.clone();
            let emissive = technique.emissive.clone();
            base.add_updater(move |ctx: &UpdateContext, _: &[ObjectEntry]| {
                if let Some(color) = ctx.color(emissive.as_ref()) {
                    main.borrow_mut().emissive = color.into();
                }
            });
        }

        let depth_pre_pass = ctx
            .boolean(technique.depth_pre_pass.as_ref())
            .unwrap_or(renderer.depth_pre_pass);
        // Opaque extrusions don't show their back faces anyway. Expressions may turn
        // transparent later, through the opacity or the color's alpha.
        let may_be_transparent = main.borrow().transparent
            || is_dynamic(technique.opacity.as_ref())
            || is_dynamic(technique.color.as_ref());
        let depth = if depth_pre_pass && may_be_transparent {
            let mut depth = Material::new(MaterialKind::DepthPrePass);
            depth.color_write = false;
            depth.stencil = Some(StencilState {
                func: StencilFunc::Always,
                reference: 1,
                replace: true,
            });
            main.borrow_mut().stencil = Some(StencilState {
                func: StencilFunc::NotEqual,
                reference: 0,
                replace: false,
            });
            main.borrow_mut().depth_write = false;
            Some(new_material(depth))
        } else {
            None
        };

        let mut faded = vec![main.clone()];
        let edge = if has_width(technique.line_width.as_ref(), ctx) {
            let edge = new_material(Material::new(MaterialKind::Edge));
            let edge_color = technique
                .line_color
                .clone()
                .or_else(|| technique.color.clone());
            setup_color(
                &mut base,
                &edge,
                edge_color,
                technique.opacity.clone(),
                ctx,
            );
            setup_line_width(&mut base, &edge, &technique, ctx);
            faded.push(edge.clone());
            Some(edge)
        } else {
            None
        };
        if let Some(depth) = &depth {
            faded.push(depth.clone());
        }
        setup_fading(&mut base, faded, &technique, ctx);

        let animate = tile.animate_extrusion
            && ctx
                .boolean(technique.animate_extrusion.as_ref())
                .unwrap_or(renderer.animate_extrusion);
        let animation = if animate {
            let duration = ctx
                .number(technique.animate_extrusion_duration.as_ref())
                .unwrap_or(renderer.extrusion_duration_ms as f32);
            let animation = Rc::new(ExtrusionAnimation::new(duration));
            let progress = animation.clone();
            base.add_updater(move |ctx: &UpdateContext, _: &[ObjectEntry]| {
                progress.advance(ctx.time_ms)
            });
            // The animation progress belongs to this tile.
            base.set_private();
            Some(animation)
        } else {
            None
        };

        Ok(Self {
            base,
            main,
            depth,
            edge,
            animation,
        })
    }

    pub fn create(
        technique: Rc<Technique>,
        tile: &Tile,
        ctx: &UpdateContext,
        renderer: &Renderer,
    ) -> Result<HandlerRef> {
        Ok(Rc::new(RefCell::new(Self::new(
            technique, tile, ctx, renderer,
        )?)))
    }

    pub fn animation(&self) -> Option<&Rc<ExtrusionAnimation>> {
        self.animation.as_ref()
    }

    fn add_animation_hooks(&self, object: &mut RenderObject) {
        if let Some(animation) = &self.animation {
            let animation = animation.clone();
            object.on_before_render(Box::new(move |material: &mut Material, _: &DrawContext| {
                material.extrusion_ratio = Some(animation.ratio());
            }));
            object.on_after_render(Box::new(|material: &mut Material, _: &DrawContext| {
                material.extrusion_ratio = None;
            }));
        }
    }
}

impl TechniqueHandler for ExtrudedPolygonHandler {
    fn base(&self) -> &HandlerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut HandlerBase {
        &mut self.base
    }

    fn create_object(
        &mut self,
        tile: &Tile,
        geometry: &Geometry,
        group: &Group,
    ) -> Result<Vec<ObjectRef>> {
        let key = self.base.technique().key;
        let buffer = build_geometry(geometry, group)?;
        let order = self.base.render_order(group);

        let mut mesh = RenderObject::new(ObjectKind::Mesh, buffer.clone(), self.main.clone());
        mesh.render_order = order;
        mesh.user_data.technique = Some(key);
        attach_feature_data(&mut mesh, geometry, group);
        self.add_animation_hooks(&mut mesh);
        let mut objects = vec![new_object(mesh)];

        if let Some(depth) = &self.depth {
            let mut pre_pass = RenderObject::new(ObjectKind::Mesh, buffer.clone(), depth.clone());
            pre_pass.render_order = order + DEPTH_PRE_PASS_ORDER;
            pre_pass.user_data.technique = Some(key);
            self.add_animation_hooks(&mut pre_pass);
            objects.push(new_object(pre_pass));
        }

        if let (Some(edge), Some(edge_index)) = (&self.edge, &geometry.edge_index) {
            let edges =
                build_edge_geometry(&buffer, edge_index, &["position", "color", "normal", "uv"]);
            let mut segments = RenderObject::new(ObjectKind::LineSegments, edges, edge.clone());
            segments.render_order = order + EDGE_ORDER;
            segments.user_data.technique = Some(key);
            attach_feature_data(&mut segments, geometry, group);
            self.add_animation_hooks(&mut segments);
            objects.push(new_object(segments));
        }

        for object in &objects {
            self.base.register_object(tile, object);
        }
        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    fn buildings() -> Technique {
        Technique::new(TechniqueKind::ExtrudedPolygon, TechniqueKey::new(0, 2))
            .with("color", Attr::color(Color::rgba(200, 200, 200, 0.5)))
            .with("line-width", Attr::number(1.0))
    }

    #[test]
    fn transparent_extrusions_get_a_depth_pre_pass() {
        let technique = Rc::new(buildings().with("render-order", Attr::number(5.0)));
        let mut handler =
            ExtrudedPolygonHandler::new(technique, &tile(0), &context(1), &Renderer::default())
                .expect("handler");
        assert!(handler.is_shareable_across_tiles());

        let objects = handler
            .create_object(&tile(0), &square_geometry(), &Group::new(0, 12, 0))
            .expect("objects");
        assert_eq!(objects.len(), 3);

        let mesh = objects[0].borrow();
        let pre_pass = objects[1].borrow();
        let edges = objects[2].borrow();
        assert!(pre_pass.render_order < mesh.render_order);
        assert!(edges.render_order > mesh.render_order);
        assert!(!pre_pass.material.borrow().color_write);
        assert_eq!(
            mesh.material.borrow().stencil.map(|stencil| stencil.func),
            Some(StencilFunc::NotEqual)
        );
        assert!(edges.geometry.attributes.contains_key("normal"));
    }

    #[test]
    fn color_expressions_may_become_transparent() {
        let fading = Attr::from(Expr::Step {
            input: ZOOM_LEVEL.into(),
            default: Box::new(Value::Color(Color::WHITE)),
            stops: vec![(10.0, Value::Color(Color::rgba(255, 255, 255, 0.5)))],
        });
        let technique = Rc::new(
            Technique::new(TechniqueKind::ExtrudedPolygon, TechniqueKey::new(0, 4))
                .with("color", fading),
        );
        let mut handler =
            ExtrudedPolygonHandler::new(technique, &tile(0), &context(1), &Renderer::default())
                .expect("handler");
        assert!(!handler.main.borrow().transparent);

        let objects = handler
            .create_object(&tile(0), &square_geometry(), &Group::new(0, 12, 0))
            .expect("objects");
        assert_eq!(objects.len(), 2);
        assert_eq!(
            objects[1].borrow().material.borrow().kind,
            MaterialKind::DepthPrePass
        );

        let opaque = Rc::new(
            Technique::new(TechniqueKind::ExtrudedPolygon, TechniqueKey::new(0, 5))
                .with("color", Attr::color(Color::WHITE)),
        );
        let handler =
            ExtrudedPolygonHandler::new(opaque, &tile(0), &context(1), &Renderer::default())
                .expect("handler");
        assert!(handler.depth.is_none());
    }

    #[test]
    fn animated_extrusion_is_private_to_the_tile() {
        let technique = Rc::new(buildings().with("animate-extrusion", Attr::boolean(true)));
        let mut animated = tile(0);
        animated.animate_extrusion = true;

        let mut handler =
            ExtrudedPolygonHandler::new(technique, &animated, &context(1), &Renderer::default())
                .expect("handler");
        assert!(!handler.is_shareable_across_tiles());
        assert!(handler.is_dynamic());

        let objects = handler
            .create_object(&animated, &square_geometry(), &Group::new(0, 12, 0))
            .expect("objects");

        let mut ctx = context(1);
        ctx.time_ms = 1000.0;
        handler.update(&ctx);
        ctx.frame_number = 2;
        ctx.time_ms = 1375.0;
        handler.update(&ctx);

        let call = objects[0].borrow().draw(&draw_context(&animated));
        let ratio = call.material.extrusion_ratio.expect("animated");
        assert!(ratio > 0.5 && ratio < 1.0);
        assert_eq!(objects[0].borrow().material.borrow().extrusion_ratio, None);
    }

    #[test]
    fn animation_needs_the_tile_to_allow_it() {
        let technique = Rc::new(buildings().with("animate-extrusion", Attr::boolean(true)));
        let handler =
            ExtrudedPolygonHandler::new(technique, &tile(0), &context(1), &Renderer::default())
                .expect("handler");
        assert!(handler.is_shareable_across_tiles());
        assert!(handler.animation().is_none());
    }

    #[test]
    fn dynamic_emissive_needs_lighting() {
        let glow = Attr::from(Expr::Interpolate {
            input: ZOOM_LEVEL.into(),
            stops: vec![
                (0.0, Value::Color(Color::BLACK)),
                (20.0, Value::Color(Color::WHITE)),
            ],
        });
        let opaque = Technique::new(TechniqueKind::ExtrudedPolygon, TechniqueKey::new(0, 3))
            .with("emissive", glow);

        let basic = ExtrudedPolygonHandler::new(
            Rc::new(opaque.clone()),
            &tile(0),
            &context(1),
            &Renderer::default(),
        )
        .expect("handler");
        assert!(!basic.is_dynamic());

        let lit = ExtrudedPolygonHandler::new(
            Rc::new(opaque.with_lighting(Lighting::Standard)),
            &tile(0),
            &context(1),
            &Renderer::default(),
        )
        .expect("handler");
        assert!(lit.is_dynamic());
    }

    #[test]
    fn ease_out_reaches_the_full_height() {
        let animation = ExtrusionAnimation::new(100.0);
        animation.advance(50.0);
        assert_eq!(animation.ratio(), 0.0);
        animation.advance(150.0);
        assert!(animation.is_finished());
    }
}
