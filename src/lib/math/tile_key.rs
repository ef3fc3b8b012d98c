/// Addresses a tile in the quadtree of a tiling scheme.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct TileKey {
    pub level: u32,
    pub column: u32,
    pub row: u32,
}

impl TileKey {
    pub fn new(level: u32, column: u32, row: u32) -> Self {
        Self { level, column, row }
    }

    /// Returns the key of the tile one level up which contains this one.
    ///
    /// The root tile is its own parent.
    pub fn parent(&self) -> Self {
        if self.level == 0 {
            return *self;
        }
        Self {
            level: self.level - 1,
            column: self.column / 2,
            row: self.row / 2,
        }
    }
}

impl std::fmt::Display for TileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:0>3}/{:0>3}/{:0>3}", self.level, self.column, self.row)
    }
}

#[test]
fn parent_of_root_is_root() {
    let root = TileKey::new(0, 0, 0);
    assert_eq!(root.parent(), root);
    assert_eq!(TileKey::new(3, 5, 6).parent(), TileKey::new(2, 2, 3));
}

#[test]
fn displays_zero_padded() {
    assert_eq!(TileKey::new(8, 42, 7).to_string(), "008/042/007");
}
