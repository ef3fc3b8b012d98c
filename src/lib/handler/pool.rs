use crate::*;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::rc::Rc;

/// Builds a handler for a technique on behalf of a tile.
pub type HandlerConstructor =
    fn(Rc<Technique>, &Tile, &UpdateContext, &Renderer) -> Result<HandlerRef>;

/// The handlers every pool knows, by technique kind name.
static CONSTRUCTORS: Lazy<HashMap<&'static str, HandlerConstructor>> = Lazy::new(|| {
    let mut constructors: HashMap<&'static str, HandlerConstructor> = HashMap::new();
    constructors.insert("fill", FillHandler::create);
    constructors.insert("extruded-polygon", ExtrudedPolygonHandler::create);
    constructors.insert("solid-line", LineHandler::create);
    constructors.insert("dashed-line", LineHandler::create);
    constructors.insert("terrain", TerrainHandler::create);
    constructors
});

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct PoolStats {
    /// Handlers currently shared.
    pub pooled: usize,
    /// Requests answered by a shared handler.
    pub hits: u64,
    /// Requests which constructed a handler.
    pub misses: u64,
    /// Constructed handlers which could not be shared.
    pub private: u64,
}

/// Shares handlers between tiles drawn with the same technique.
///
/// A handler is only pooled if it reports itself shareable after construction. Others are
/// built anew for every request.
pub struct TechniqueHandlerPool {
    constructors: HashMap<String, HandlerConstructor>,
    handlers: HashMap<TechniqueKey, HandlerRef>,
    renderer: Renderer,
    stats: PoolStats,
}

impl TechniqueHandlerPool {
    pub fn new(renderer: Renderer) -> Self {
        Self {
            constructors: CONSTRUCTORS
                .iter()
                .map(|(kind, constructor)| (kind.to_string(), *constructor))
                .collect(),
            handlers: HashMap::new(),
            renderer,
            stats: PoolStats::default(),
        }
    }

    /// Registers or replaces the handler for a technique kind.
    pub fn register(&mut self, kind: &str, constructor: HandlerConstructor) {
        self.constructors.insert(kind.to_string(), constructor);
    }

    pub fn can_handle(&self, technique: &Technique) -> bool {
        self.constructors.contains_key(technique.kind.name())
    }

    /// Returns the pooled handler of the technique or constructs one.
    pub fn get_handler(
        &mut self,
        technique: &Rc<Technique>,
        tile: &Tile,
        ctx: &UpdateContext,
    ) -> Result<HandlerRef> {
        if let Some(handler) = self.handlers.get(&technique.key) {
            self.stats.hits += 1;
            return Ok(handler.clone());
        }

        let constructor = self
            .constructors
            .get(technique.kind.name())
            .ok_or_else(|| Error::UnknownTechniqueKind(technique.kind.name().to_string()))?;
        let handler = constructor(technique.clone(), tile, ctx, &self.renderer)?;
        self.stats.misses += 1;

        if handler.borrow().is_shareable_across_tiles() {
            log::debug!(
                "Pooling the {} handler of technique {} ({}).",
                technique.kind,
                technique.key,
                technique.name
            );
            self.handlers.insert(technique.key, handler.clone());
        } else {
            log::debug!(
                "Technique {} ({}) got a private handler for tile {}.",
                technique.key,
                technique.name,
                tile.key
            );
            self.stats.private += 1;
        }
        Ok(handler)
    }

    /// Drops every pooled handler, e.g. because the theme changed.
    pub fn reset(&mut self) {
        log::info!("Dropping {} pooled technique handlers.", self.handlers.len());
        self.handlers.clear();
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            pooled: self.handlers.len(),
            ..self.stats
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    fn fill(index: u32) -> Rc<Technique> {
        Rc::new(
            Technique::new(TechniqueKind::Fill, TechniqueKey::new(0, index))
                .with("color", Attr::color(Color::BLUE)),
        )
    }

    #[test]
    fn shareable_handlers_are_shared() {
        let mut pool = TechniqueHandlerPool::new(Renderer::default());
        let technique = fill(0);
        let a = pool.get_handler(&technique, &tile(0), &context(1)).expect("handler");
        let b = pool.get_handler(&technique, &tile(1), &context(1)).expect("handler");
        assert!(same_handler(&a, &b));

        let stats = pool.stats();
        assert_eq!(stats.pooled, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn private_handlers_are_built_per_request() {
        let mut pool = TechniqueHandlerPool::new(Renderer::default());
        let technique = Rc::new(
            Technique::new(TechniqueKind::ExtrudedPolygon, TechniqueKey::new(0, 1))
                .with("animate-extrusion", Attr::boolean(true)),
        );
        let mut first = tile(0);
        first.animate_extrusion = true;
        let mut second = tile(1);
        second.animate_extrusion = true;

        let a = pool.get_handler(&technique, &first, &context(1)).expect("handler");
        let b = pool.get_handler(&technique, &second, &context(1)).expect("handler");
        assert!(!same_handler(&a, &b));
        assert!(pool.is_empty());
        assert_eq!(pool.stats().private, 2);
    }

    #[test]
    fn reset_drops_shared_handlers() {
        let mut pool = TechniqueHandlerPool::new(Renderer::default());
        let technique = fill(0);
        let before = pool.get_handler(&technique, &tile(0), &context(1)).expect("handler");
        pool.reset();
        assert!(pool.is_empty());
        let after = pool.get_handler(&technique, &tile(0), &context(1)).expect("handler");
        assert!(!same_handler(&before, &after));
    }

    #[test]
    fn unknown_kinds_fail_recoverably() {
        let mut pool = TechniqueHandlerPool::new(Renderer::default());
        let technique = Rc::new(Technique::new(
            TechniqueKind::Other("text".into()),
            TechniqueKey::new(0, 9),
        ));
        assert!(!pool.can_handle(&technique));
        match pool.get_handler(&technique, &tile(0), &context(1)) {
            Err(err) => assert!(err.is_recoverable()),
            Ok(_) => panic!("text has no handler"),
        }
    }

    #[test]
    fn registered_constructors_extend_the_pool() {
        let mut pool = TechniqueHandlerPool::new(Renderer::default());
        let technique = Rc::new(Technique::new(TechniqueKind::Standard, TechniqueKey::new(0, 3)));
        assert!(!pool.can_handle(&technique));
        pool.register("standard", |technique, tile, ctx, renderer| {
            let technique = Rc::new(Technique {
                kind: TechniqueKind::Fill,
                ..(*technique).clone()
            });
            FillHandler::create(technique, tile, ctx, renderer)
        });
        assert!(pool.can_handle(&technique));
        assert!(pool.get_handler(&technique, &tile(0), &context(1)).is_ok());
    }
}
