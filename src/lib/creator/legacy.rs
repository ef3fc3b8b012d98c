//! Objects for techniques without a handler.
//!
//! Materials are evaluated once when the tile is built and never updated afterwards.

use crate::*;
use std::rc::Rc;

/// Creates the material of a technique without a handler.
pub fn create_material(technique: &Technique, ctx: &UpdateContext) -> Result<MaterialRef> {
    let mut material = Material::from_technique(technique, &ctx.env)
        .ok_or_else(|| Error::UnknownTechniqueKind(technique.kind.name().to_string()))?;
    FadingParams::from_technique(technique, ctx).apply(&mut material);
    if let Some(width) = ctx.number(technique.line_width.as_ref()) {
        material.line_width = width * unit_factor(technique, ctx);
    }
    Ok(new_material(material))
}

pub fn object_kind(kind: &TechniqueKind) -> ObjectKind {
    match kind {
        TechniqueKind::SolidLine => ObjectKind::SolidLine,
        TechniqueKind::DashedLine => ObjectKind::DashedLine,
        TechniqueKind::Segments => ObjectKind::LineSegments,
        _ => ObjectKind::Mesh,
    }
}

pub fn create_object(
    technique: &Technique,
    geometry: &Geometry,
    group: &Group,
    material: &MaterialRef,
    ctx: &UpdateContext,
) -> Result<ObjectRef> {
    let buffer: Rc<BufferGeometry> = build_geometry(geometry, group)?;
    let mut object = RenderObject::new(object_kind(&technique.kind), buffer, material.clone());
    object.render_order = ctx.number(technique.render_order.as_ref()).unwrap_or(0.0)
        + group.render_order_offset.unwrap_or(0.0);
    object.user_data.technique = Some(technique.key);
    attach_feature_data(&mut object, geometry, group);
    Ok(new_object(object))
}
