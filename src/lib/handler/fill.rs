use crate::*;
use std::rc::Rc;

/// Flat polygons, optionally outlined along their edges.
pub struct FillHandler {
    base: HandlerBase,
    main: MaterialRef,
    outline: Option<MaterialRef>,
}

impl FillHandler {
    pub fn new(technique: Rc<Technique>, ctx: &UpdateContext) -> Result<Self> {
        expect_kind(&technique, "fill", &[TechniqueKind::Fill])?;

        let mut base = HandlerBase::new(technique.clone(), ctx);
        let main = new_material(
            Material::from_technique(&technique, &ctx.env).ok_or(Error::MissingMaterial("fill"))?,
        );
        setup_color(
            &mut base,
            &main,
            technique.color.clone(),
            technique.opacity.clone(),
            ctx,
        );

        let mut faded = vec![main.clone()];
        let outline = if has_width(technique.line_width.as_ref(), ctx) {
            let outline = new_material(Material::new(MaterialKind::Segments));
            setup_color(
                &mut base,
                &outline,
                technique.line_color.clone(),
                technique.opacity.clone(),
                ctx,
            );
            setup_line_width(&mut base, &outline, &technique, ctx);
            faded.push(outline.clone());
            Some(outline)
        } else {
            None
        };
        setup_fading(&mut base, faded, &technique, ctx);

        Ok(Self {
            base,
            main,
            outline,
        })
    }

    pub fn create(
        technique: Rc<Technique>,
        _tile: &Tile,
        ctx: &UpdateContext,
        _renderer: &Renderer,
    ) -> Result<HandlerRef> {
        Ok(Rc::new(std::cell::RefCell::new(Self::new(technique, ctx)?)))
    }
}

/// `true` if the attribute may evaluate to a positive width.
pub(crate) fn has_width(width: Option<&Attr>, ctx: &UpdateContext) -> bool {
    is_dynamic(width) || ctx.number(width).map_or(false, |width| width > 0.0)
}

/// Applies the technique's line width to an edge or outline material and keeps it current
/// if it is an expression.
pub(crate) fn setup_line_width(
    base: &mut HandlerBase,
    material: &MaterialRef,
    technique: &Rc<Technique>,
    ctx: &UpdateContext,
) {
    apply_line_width(material, technique, ctx);

    if is_dynamic(technique.line_width.as_ref()) || technique.metric_unit == MetricUnit::Pixel {
        let material = material.clone();
        let technique = technique.clone();
        base.add_updater(move |ctx: &UpdateContext, _: &[ObjectEntry]| {
            apply_line_width(&material, &technique, ctx)
        });
    }
}

fn apply_line_width(material: &MaterialRef, technique: &Technique, ctx: &UpdateContext) {
    if let Some(width) = ctx.number(technique.line_width.as_ref()) {
        material.borrow_mut().line_width = width * unit_factor(technique, ctx);
    }
}

impl TechniqueHandler for FillHandler {
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
        let mut objects = vec![new_object(mesh)];

        if let (Some(outline), Some(edge_index)) = (&self.outline, &geometry.edge_index) {
            let edges = build_edge_geometry(&buffer, edge_index, &["position"]);
            let mut segments = RenderObject::new(ObjectKind::LineSegments, edges, outline.clone());
            segments.render_order = order;
            segments.user_data.technique = Some(key);
            attach_feature_data(&mut segments, geometry, group);
            objects.push(new_object(segments));
        }

        for object in &objects {
            self.base.register_object(tile, object);
        }
        Ok(objects)
    }
}
