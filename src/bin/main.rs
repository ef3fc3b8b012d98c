extern crate nalgebra_glm as glm;

mod stats;
mod synth;

use sextant::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

const FRAMES: u64 = 600;
const GRID_SIZE: u32 = 3;

fn build(creator: &mut TileGeometryCreator, tiles: &mut [synth::LoadedTile], ctx: &UpdateContext) {
    for loaded in tiles.iter_mut() {
        if let Err(err) = creator.create_all_geometries(&mut loaded.tile, &mut loaded.decoded, ctx) {
            log::error!("Tile {} is left empty: {}", loaded.tile.key, err);
        }
    }
}

fn main() {
    let settings = match Settings::new() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("Falling back to the default settings: {}", err);
            Settings::default()
        }
    };
    pretty_env_logger::init();
    log::set_max_level(settings.general.log_level.to_level_filter());

    let mut themes = match ThemeCache::load(&settings.general.theme) {
        Ok(themes) => themes,
        Err(err) => {
            log::error!("Could not load the theme {}: {}", settings.general.theme, err);
            std::process::exit(1);
        }
    };

    let mut creator = TileGeometryCreator::new(settings.renderer.clone());
    let cache = Rc::new(RefCell::new(ExprCache::new()));
    let start = Instant::now();
    let mut stats = stats::Stats::new();

    let context = |frame_number: u64| {
        let zoom = 8.0 + frame_number as f32 / FRAMES as f32 * 8.0;
        let env = MapEnv::new()
            .with(ZOOM_LEVEL, Value::Number(zoom))
            .with(PIXEL_TO_WORLD, Value::Number(2f32.powf(-zoom + 4.0)));
        let mut ctx = UpdateContext::new(frame_number, env).with_cache(cache.clone());
        ctx.time_ms = start.elapsed().as_secs_f64() * 1000.0;
        ctx
    };

    let mut tiles = synth::tile_grid(themes.theme(), GRID_SIZE);
    build(&mut creator, &mut tiles, &context(0));

    for frame_number in 1..=FRAMES {
        if themes.update() {
            creator.pool_mut().reset();
            tiles = synth::tile_grid(themes.theme(), GRID_SIZE);
            build(&mut creator, &mut tiles, &context(frame_number));
        }

        let ctx = context(frame_number);
        let visible: Vec<&Tile> = tiles.iter().map(|loaded| &loaded.tile).collect();
        let draw_calls = render_frame(&visible, &ctx).len();
        stats.capture_frame(draw_calls);

        if frame_number % 60 == 0 {
            log::info!(
                "Frametime {:.2}us with {:.1} draw calls at zoom {:.2}",
                stats.get_average(),
                stats.get_average_draw_calls(),
                ctx.env.zoom().unwrap_or_default()
            );
        }
        std::thread::sleep(Duration::from_millis(16));
    }

    let pool = creator.pool().stats();
    log::info!(
        "Rendered {} frames. {} pooled handlers, {} hits, {} misses, {} private.",
        stats.frames(),
        pool.pooled,
        pool.hits,
        pool.misses,
        pool.private
    );
    for loaded in &mut tiles {
        loaded.tile.dispose();
    }
}
