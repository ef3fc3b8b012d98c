//! Helpers shared by all handlers.

use crate::*;
use std::cell::RefCell;
use std::rc::Rc;

/// Fails unless `technique` is one of the `accepted` kinds.
pub fn expect_kind(
    technique: &Technique,
    expected: &'static str,
    accepted: &[TechniqueKind],
) -> Result<()> {
    if accepted.contains(&technique.kind) {
        Ok(())
    } else {
        Err(Error::WrongTechniqueKind {
            expected,
            found: technique.kind.name().to_string(),
        })
    }
}

pub fn new_material(material: Material) -> MaterialRef {
    Rc::new(RefCell::new(material))
}

pub fn new_object(object: RenderObject) -> ObjectRef {
    Rc::new(RefCell::new(object))
}

/// Creates a geometry drawing `group` of the decoded `geometry`.
///
/// Buffers are shared, not copied.
pub fn build_geometry(geometry: &Geometry, group: &Group) -> Result<Rc<BufferGeometry>> {
    let buffer = BufferGeometry {
        attributes: geometry.vertex_attributes.clone(),
        interleaved: geometry.interleaved.clone(),
        index: geometry.index.clone(),
        draw_range: DrawRange {
            start: group.start,
            count: group.count,
        },
    };

    if !buffer.has_attribute("position") {
        return Err(Error::MissingAttribute("position"));
    }
    let len = buffer.primitive_count();
    if group.end() as usize > len {
        return Err(Error::InvalidGroup {
            start: group.start,
            count: group.count,
            len,
        });
    }

    Ok(Rc::new(buffer))
}

/// Creates a geometry drawing the whole `edge_index` with those `attributes` of `main`
/// which exist.
pub fn build_edge_geometry(
    main: &BufferGeometry,
    edge_index: &Rc<Vec<u32>>,
    attributes: &[&str],
) -> Rc<BufferGeometry> {
    let mut edges = BufferGeometry::new();
    for name in attributes {
        if let Some(attribute) = main.attributes.get(*name) {
            edges.attributes.insert(name.to_string(), attribute.clone());
        }
    }
    edges.interleaved = main
        .interleaved
        .iter()
        .filter(|buffer| attributes.iter().any(|name| buffer.attributes.contains_key(*name)))
        .cloned()
        .collect();
    edges.index = Some(edge_index.clone());
    edges.draw_range = DrawRange {
        start: 0,
        count: edge_index.len() as u32,
    };
    Rc::new(edges)
}

/// Copies the ids of the features within `group` to the object for picking.
pub fn attach_feature_data(object: &mut RenderObject, geometry: &Geometry, group: &Group) {
    if let Some(ObjectInfos::Features { ids, starts }) = &geometry.object_infos {
        let (ids, starts): (Vec<u64>, Vec<u32>) = ids
            .iter()
            .zip(starts.iter())
            .filter(|(_, start)| **start >= group.start && **start < group.end())
            .map(|(id, start)| (*id, *start))
            .unzip();
        object.user_data.feature_ids = ids;
        object.user_data.feature_starts = starts;
    }
}

/// Converts a fade distance relative to the maximum view distance to camera space.
///
/// Negative distances mean "no fading" and are kept as they are.
pub fn convert_fading_distance(distance: f32, view_ranges: &ViewRanges) -> f32 {
    if distance < 0.0 {
        distance
    } else {
        distance * view_ranges.maximum
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FadingParams {
    pub fade_near: f32,
    pub fade_far: f32,
}

impl FadingParams {
    pub fn from_technique(technique: &Technique, ctx: &UpdateContext) -> Self {
        let distance = |attr: Option<&Attr>| {
            ctx.number(attr)
                .map(|d| convert_fading_distance(d, &ctx.view_ranges))
                .unwrap_or(-1.0)
        };
        Self {
            fade_near: distance(technique.fade_near.as_ref()),
            fade_far: distance(technique.fade_far.as_ref()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.fade_near >= 0.0 && self.fade_far > self.fade_near
    }

    pub fn apply(&self, material: &mut Material) {
        material.fade_near = self.fade_near;
        material.fade_far = self.fade_far;
    }
}

/// World units per unit of the technique's widths.
pub fn unit_factor(technique: &Technique, ctx: &UpdateContext) -> f32 {
    match technique.metric_unit {
        MetricUnit::World => 1.0,
        MetricUnit::Pixel => ctx.env.pixel_to_world().unwrap_or(1.0),
    }
}

/// Applies color and opacity to `material`.
///
/// When the opacity becomes zero or stops being zero, every object of a tile visible in the
/// current frame is hidden or shown accordingly. Objects of other tiles are left alone.
pub fn apply_color(
    material: &MaterialRef,
    color: Option<Color>,
    opacity: Option<f32>,
    ctx: &UpdateContext,
    objects: &[ObjectEntry],
) {
    let (was_visible, is_visible) = {
        let mut material = material.borrow_mut();
        let was_visible = material.opacity > 0.0;
        material.set_color(color, opacity);
        (was_visible, material.opacity > 0.0)
    };

    if was_visible != is_visible {
        for entry in objects {
            if !entry.tile.is_visible_in(ctx.frame_number) {
                continue;
            }
            if let Some(object) = entry.object.upgrade() {
                object.borrow_mut().visible = is_visible;
            }
        }
    }
}

/// Applies `color` and `opacity` now and registers an updater if either is an expression.
pub fn setup_color(
    base: &mut HandlerBase,
    material: &MaterialRef,
    color: Option<Attr>,
    opacity: Option<Attr>,
    ctx: &UpdateContext,
) {
    apply_color(
        material,
        ctx.color(color.as_ref()),
        ctx.number(opacity.as_ref()),
        ctx,
        &[],
    );

    if is_dynamic(color.as_ref()) || is_dynamic(opacity.as_ref()) {
        let material = material.clone();
        base.add_updater(move |ctx: &UpdateContext, objects: &[ObjectEntry]| {
            apply_color(
                &material,
                ctx.color(color.as_ref()),
                ctx.number(opacity.as_ref()),
                ctx,
                objects,
            );
        });
    }
}

/// Applies the technique's fade distances to `materials` and keeps them up to date while
/// fading is enabled or depends on the view.
pub fn setup_fading(
    base: &mut HandlerBase,
    materials: Vec<MaterialRef>,
    technique: &Rc<Technique>,
    ctx: &UpdateContext,
) {
    let params = FadingParams::from_technique(technique, ctx);
    for material in &materials {
        params.apply(&mut material.borrow_mut());
    }

    let dynamic =
        is_dynamic(technique.fade_near.as_ref()) || is_dynamic(technique.fade_far.as_ref());
    if params.is_enabled() || dynamic {
        let technique = technique.clone();
        base.add_updater(move |ctx: &UpdateContext, _: &[ObjectEntry]| {
            let params = FadingParams::from_technique(&technique, ctx);
            for material in &materials {
                params.apply(&mut material.borrow_mut());
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    #[test]
    fn groups_must_fit_the_buffers() {
        let geometry = square_geometry();
        assert!(build_geometry(&geometry, &Group::new(0, 12, 0)).is_ok());
        match build_geometry(&geometry, &Group::new(8, 6, 0)) {
            Err(Error::InvalidGroup { len, .. }) => assert_eq!(len, 12),
            other => panic!("expected an invalid group, got {:?}", other),
        }
    }

    #[test]
    fn positions_are_required() {
        let geometry = Geometry::new().with_index(vec![0, 1, 2]);
        assert!(matches!(
            build_geometry(&geometry, &Group::new(0, 3, 0)),
            Err(Error::MissingAttribute("position"))
        ));
    }

    #[test]
    fn features_are_filtered_to_the_group() {
        let geometry = square_geometry().with_object_infos(ObjectInfos::Features {
            ids: vec![10, 11, 12],
            starts: vec![0, 6, 9],
        });
        let buffer = build_geometry(&geometry, &Group::new(6, 6, 0)).expect("valid group");
        let mut object = RenderObject::new(
            ObjectKind::Mesh,
            buffer,
            new_material(Material::new(MaterialKind::Basic)),
        );
        attach_feature_data(&mut object, &geometry, &Group::new(6, 6, 0));
        assert_eq!(object.user_data.feature_ids, vec![11, 12]);
        assert_eq!(object.user_data.feature_starts, vec![6, 9]);
    }

    #[test]
    fn fade_distances_scale_with_the_view() {
        let technique = Technique::new(TechniqueKind::Fill, TechniqueKey::new(0, 0))
            .with("fade-near", Attr::number(0.5))
            .with("fade-far", Attr::number(0.8));
        let mut ctx = context(1);
        ctx.view_ranges.maximum = 1000.0;
        let params = FadingParams::from_technique(&technique, &ctx);
        assert_eq!(params.fade_near, 500.0);
        assert_eq!(params.fade_far, 800.0);
        assert!(params.is_enabled());

        let plain = Technique::new(TechniqueKind::Fill, TechniqueKey::new(0, 1));
        assert!(!FadingParams::from_technique(&plain, &ctx).is_enabled());
        assert_eq!(convert_fading_distance(-1.0, &ctx.view_ranges), -1.0);
    }

    #[test]
    fn pixel_units_scale_by_the_pixel_ratio() {
        let ctx = context(1);
        let world = Technique::new(TechniqueKind::SolidLine, TechniqueKey::new(0, 0));
        let pixel = world.clone().with_unit(MetricUnit::Pixel);
        assert_eq!(unit_factor(&world, &ctx), 1.0);
        assert_eq!(unit_factor(&pixel, &ctx), PIXEL_RATIO);
        let unbound = UpdateContext::new(1, MapEnv::new());
        assert_eq!(unit_factor(&pixel, &unbound), 1.0);
    }
}
