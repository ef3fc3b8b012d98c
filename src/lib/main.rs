extern crate nalgebra_glm as glm;

mod creator;
mod error;
mod expression;
mod handler;
mod math;
mod scene;
mod settings;
mod style;
mod technique;
mod tile;

#[cfg(test)]
mod testing;

pub use creator::*;
pub use error::*;
pub use expression::*;
pub use handler::*;
pub use math::*;
pub use scene::*;
pub use settings::*;
pub use style::*;
pub use technique::*;
pub use tile::*;
