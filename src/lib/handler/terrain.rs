use crate::*;
use std::cell::RefCell;
use std::rc::Rc;

/// Name of the variable height-to-color expressions are evaluated with.
pub const HEIGHT: &str = "height";

/// Terrain meshes, colored by height where elevation data exists.
///
/// Nothing about terrain changes after construction, terrain handlers are never dynamic.
pub struct TerrainHandler {
    base: HandlerBase,
    main: MaterialRef,
    /// Copy of `main` patched to color by height. Only displaced geometry is drawn with it.
    height_colored: Option<MaterialRef>,
}

impl TerrainHandler {
    pub fn new(technique: Rc<Technique>, ctx: &UpdateContext) -> Result<Self> {
        expect_kind(&technique, "terrain", &[TechniqueKind::Terrain])?;

        let material =
            Material::from_technique(&technique, &ctx.env).ok_or(Error::MissingMaterial("terrain"))?;

        let height_colored = technique.height_color.as_ref().map(|attr| {
            let mut patched = material.clone();
            patched.shader_patch = Some(ShaderPatch::HeightColor {
                lookup: Rc::new(height_lookup(attr, &ctx.env)),
            });
            new_material(patched)
        });

        Ok(Self {
            base: HandlerBase::new(technique, ctx),
            main: new_material(material),
            height_colored,
        })
    }

    pub fn create(
        technique: Rc<Technique>,
        _tile: &Tile,
        ctx: &UpdateContext,
        _renderer: &Renderer,
    ) -> Result<HandlerRef> {
        Ok(Rc::new(RefCell::new(Self::new(technique, ctx)?)))
    }
}

/// Samples the height-to-color mapping over the range of its stops.
fn height_lookup(attr: &Attr, env: &MapEnv) -> LookupTexture {
    let (min, max) = match attr {
        Attr::Expression(expr) => expr.stop_range().unwrap_or((0.0, 1.0)),
        Attr::Constant(_) => (0.0, 1.0),
    };
    LookupTexture::sample(min, max, |height| {
        let env = env.clone().with(HEIGHT, Value::Number(height));
        attr.evaluate(&env, None).and_then(|value| value.as_color())
    })
}

impl TechniqueHandler for TerrainHandler {
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
        let buffer = build_geometry(geometry, group)?;
        let displacement = match &geometry.object_infos {
            Some(ObjectInfos::Displacement(map)) => Some(Rc::new(DisplacementTexture::from(map))),
            _ => None,
        };
        // Only displaced terrain has heights to look colors up with.
        let material = match (&displacement, &self.height_colored) {
            (Some(_), Some(height_colored)) => height_colored.clone(),
            _ => self.main.clone(),
        };

        let mut mesh = RenderObject::new(ObjectKind::Mesh, buffer, material);
        mesh.render_order = self.base.render_order(group);
        mesh.user_data.technique = Some(self.base.technique().key);
        if displacement.is_some() {
            mesh.user_data.displacement = displacement;
        } else {
            attach_feature_data(&mut mesh, geometry, group);
        }

        let mesh = new_object(mesh);
        self.base.register_object(tile, &mesh);
        Ok(vec![mesh])
    }
}
