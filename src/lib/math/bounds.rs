/// An axis aligned box in world space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Bounds {
    pub min: glm::Vec3,
    pub max: glm::Vec3,
}

impl Bounds {
    pub fn new(min: glm::Vec3, max: glm::Vec3) -> Self {
        Self { min, max }
    }

    /// A flat square of `size` world units with its lower corner at `origin`.
    pub fn square(origin: glm::Vec2, size: f32) -> Self {
        Self {
            min: glm::vec3(origin.x, origin.y, 0.0),
            max: glm::vec3(origin.x + size, origin.y + size, 0.0),
        }
    }

    pub fn size(&self) -> glm::Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> glm::Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Moves the box by `offset`, e.g. to place a wrapped copy of a tile.
    pub fn translated(&self, offset: &glm::Vec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }
}

#[test]
fn square_has_flat_size() {
    let bounds = Bounds::square(glm::vec2(10.0, 20.0), 4.0);
    assert_eq!(bounds.size(), glm::vec3(4.0, 4.0, 0.0));
    assert_eq!(bounds.center(), glm::vec3(12.0, 22.0, 0.0));
    let moved = bounds.translated(&glm::vec3(100.0, 0.0, 0.0));
    assert_eq!(moved.min.x, 110.0);
}
