//! Render-side objects: materials, buffer geometry and the objects which pair the two.

mod geometry;
mod material;
mod object;
mod texture;

pub use geometry::*;
pub use material::*;
pub use object::*;
pub use texture::*;

use std::cell::RefCell;
use std::rc::Rc;

/// A material shared by every object (and possibly every tile) drawn with it.
pub type MaterialRef = Rc<RefCell<Material>>;
pub type ObjectRef = Rc<RefCell<RenderObject>>;
