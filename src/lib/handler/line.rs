use crate::*;
use std::cell::RefCell;
use std::rc::Rc;

/// Render order offset of the secondary line if the technique doesn't give one.
const SECONDARY_ORDER: f32 = -0.5;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum LineMetric {
    Width,
    OutlineWidth,
    DashSize,
    GapSize,
}

impl LineMetric {
    fn attr(self, technique: &Technique) -> Option<&Attr> {
        match self {
            LineMetric::Width => technique.line_width.as_ref(),
            LineMetric::OutlineWidth => technique.outline_width.as_ref(),
            LineMetric::DashSize => technique.dash_size.as_ref(),
            LineMetric::GapSize => technique.gap_size.as_ref(),
        }
    }

    /// Lines are drawn from their center, so full widths become half widths.
    /// The outline is already measured from the line's edge.
    fn scale(self) -> f32 {
        match self {
            LineMetric::OutlineWidth => 1.0,
            _ => 0.5,
        }
    }

    fn apply(self, material: &MaterialRef, technique: &Technique, ctx: &UpdateContext) {
        let value = match ctx.number(self.attr(technique)) {
            Some(value) => value * unit_factor(technique, ctx) * self.scale(),
            None => return,
        };
        let mut material = material.borrow_mut();
        match self {
            LineMetric::Width => material.line_width = value,
            LineMetric::OutlineWidth => material.outline_width = value,
            LineMetric::DashSize => material.dash_size = value,
            LineMetric::GapSize => material.gap_size = value,
        }
    }
}

/// Width of the secondary line given the main line's width and opacity.
///
/// A secondary line which is not wider than an opaque main line is hidden behind it anyway
/// and collapses to zero.
pub fn secondary_line_width(main_width: f32, secondary_width: f32, main_opacity: f32) -> f32 {
    if secondary_width <= main_width && main_opacity >= 1.0 {
        0.0
    } else {
        secondary_width
    }
}

/// Solid and dashed lines with an optional secondary line drawn below them.
pub struct LineHandler {
    base: HandlerBase,
    kind: ObjectKind,
    main: MaterialRef,
    secondary: Option<MaterialRef>,
    secondary_render_order: Option<f32>,
    clipping: bool,
}

impl LineHandler {
    pub fn new(technique: Rc<Technique>, ctx: &UpdateContext, renderer: &Renderer) -> Result<Self> {
        expect_kind(
            &technique,
            "line",
            &[TechniqueKind::SolidLine, TechniqueKind::DashedLine],
        )?;
        let kind = if technique.kind == TechniqueKind::DashedLine {
            ObjectKind::DashedLine
        } else {
            ObjectKind::SolidLine
        };

        let mut base = HandlerBase::new(technique.clone(), ctx);
        let main = new_material(
            Material::from_technique(&technique, &ctx.env).ok_or(Error::MissingMaterial("line"))?,
        );
        setup_color(
            &mut base,
            &main,
            technique.color.clone(),
            technique.opacity.clone(),
            ctx,
        );

        let mut metrics = vec![LineMetric::Width, LineMetric::OutlineWidth];
        if kind == ObjectKind::DashedLine {
            metrics.extend(&[LineMetric::DashSize, LineMetric::GapSize]);
        }
        for metric in metrics {
            let attr = metric.attr(&technique);
            if attr.is_none() {
                continue;
            }
            metric.apply(&main, &technique, ctx);
            if is_dynamic(attr) || technique.metric_unit == MetricUnit::Pixel {
                let main = main.clone();
                let technique = technique.clone();
                base.add_updater(move |ctx: &UpdateContext, _: &[ObjectEntry]| {
                    metric.apply(&main, &technique, ctx)
                });
            }
        }

        let mut faded = vec![main.clone()];
        let secondary = if technique.secondary_width.is_some() {
            let secondary = new_material(Material::new(MaterialKind::SolidLine));
            apply_secondary(&main, &secondary, &technique, ctx, &[]);
            // Registered after the width updaters, it needs the current main line width.
            let (main, updated, technique) = (main.clone(), secondary.clone(), technique.clone());
            base.add_updater(move |ctx: &UpdateContext, objects: &[ObjectEntry]| {
                apply_secondary(&main, &updated, &technique, ctx, objects)
            });
            faded.push(secondary.clone());
            Some(secondary)
        } else {
            None
        };
        setup_fading(&mut base, faded, &technique, ctx);

        let secondary_render_order = ctx.number(technique.secondary_render_order.as_ref());
        let clipping = ctx
            .boolean(technique.clipping.as_ref())
            .unwrap_or(renderer.clipping)
            && renderer.projection == Projection::Planar;

        Ok(Self {
            base,
            kind,
            main,
            secondary,
            secondary_render_order,
            clipping,
        })
    }

    pub fn create(
        technique: Rc<Technique>,
        _tile: &Tile,
        ctx: &UpdateContext,
        renderer: &Renderer,
    ) -> Result<HandlerRef> {
        Ok(Rc::new(RefCell::new(Self::new(technique, ctx, renderer)?)))
    }

    /// Clips the line against its tile while it is drawn.
    ///
    /// The material is shared, the tile size is not, so it is only set for the draw.
    fn add_clip_hooks(&self, object: &mut RenderObject) {
        if !self.clipping {
            return;
        }
        object.on_before_render(Box::new(|material: &mut Material, ctx: &DrawContext| {
            material.clip_tile_size = Some([ctx.tile_size.x, ctx.tile_size.y]);
        }));
        object.on_after_render(Box::new(|material: &mut Material, _: &DrawContext| {
            material.clip_tile_size = None;
        }));
    }
}

fn apply_secondary(
    main: &MaterialRef,
    secondary: &MaterialRef,
    technique: &Technique,
    ctx: &UpdateContext,
    objects: &[ObjectEntry],
) {
    let color = ctx
        .color(technique.secondary_color.as_ref())
        .or_else(|| ctx.color(technique.color.as_ref()));
    apply_color(
        secondary,
        color,
        ctx.number(technique.opacity.as_ref()),
        ctx,
        objects,
    );

    if let Some(width) = ctx.number(technique.secondary_width.as_ref()) {
        let requested = width * unit_factor(technique, ctx) * 0.5;
        let (main_width, main_opacity) = {
            let main = main.borrow();
            (main.line_width, main.opacity)
        };
        secondary.borrow_mut().line_width =
            secondary_line_width(main_width, requested, main_opacity);
    }
}

impl TechniqueHandler for LineHandler {
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

        let mut line = RenderObject::new(self.kind, buffer.clone(), self.main.clone());
        line.render_order = order;
        line.user_data.technique = Some(key);
        attach_feature_data(&mut line, geometry, group);
        self.add_clip_hooks(&mut line);
        let mut objects = vec![new_object(line)];

        if let Some(secondary) = &self.secondary {
            let mut casing = RenderObject::new(ObjectKind::SolidLine, buffer, secondary.clone());
            casing.render_order = match self.secondary_render_order {
                Some(secondary_order) => secondary_order + group.render_order_offset.unwrap_or(0.0),
                None => order + SECONDARY_ORDER,
            };
            casing.user_data.technique = Some(key);
            attach_feature_data(&mut casing, geometry, group);
            self.add_clip_hooks(&mut casing);
            objects.push(new_object(casing));
        }

        for object in &objects {
            self.base.register_object(tile, object);
        }
        Ok(objects)
    }
}
