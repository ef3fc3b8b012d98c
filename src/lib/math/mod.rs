mod bounds;
mod tile_key;

pub use bounds::*;
pub use tile_key::*;
