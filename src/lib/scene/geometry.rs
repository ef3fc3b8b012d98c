use std::collections::BTreeMap;
use std::rc::Rc;

/// A non-interleaved vertex attribute. The data is shared with the decoded tile.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferAttribute {
    pub data: Rc<Vec<f32>>,
    pub item_size: usize,
}

impl BufferAttribute {
    pub fn new(data: Vec<f32>, item_size: usize) -> Self {
        Self {
            data: Rc::new(data),
            item_size,
        }
    }

    /// Number of vertices in the attribute.
    pub fn count(&self) -> usize {
        if self.item_size == 0 {
            0
        } else {
            self.data.len() / self.item_size
        }
    }
}

/// Several attributes packed into one buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct InterleavedBuffer {
    pub data: Rc<Vec<f32>>,
    pub stride: usize,
    /// Attribute name to `(offset, item_size)` within one stride.
    pub attributes: BTreeMap<String, (usize, usize)>,
}

impl InterleavedBuffer {
    pub fn count(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.data.len() / self.stride
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DrawRange {
    pub start: u32,
    pub count: u32,
}

impl DrawRange {
    pub fn end(&self) -> u32 {
        self.start + self.count
    }
}

/// Vertex data plus the range of primitives one object draws from it.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferGeometry {
    pub attributes: BTreeMap<String, BufferAttribute>,
    pub interleaved: Vec<InterleavedBuffer>,
    pub index: Option<Rc<Vec<u32>>>,
    pub draw_range: DrawRange,
}

impl BufferGeometry {
    pub fn new() -> Self {
        Self {
            attributes: BTreeMap::new(),
            interleaved: vec![],
            index: None,
            draw_range: DrawRange { start: 0, count: 0 },
        }
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
            || self
                .interleaved
                .iter()
                .any(|buffer| buffer.attributes.contains_key(name))
    }

    /// Number of vertices of the named attribute, wherever it is stored.
    pub fn attribute_count(&self, name: &str) -> Option<usize> {
        self.attributes.get(name).map(BufferAttribute::count).or_else(|| {
            self.interleaved
                .iter()
                .find(|buffer| buffer.attributes.contains_key(name))
                .map(InterleavedBuffer::count)
        })
    }

    /// Number of drawable primitives: indices if indexed, vertices otherwise.
    pub fn primitive_count(&self) -> usize {
        match &self.index {
            Some(index) => index.len(),
            None => self.attribute_count("position").unwrap_or(0),
        }
    }
}

impl Default for BufferGeometry {
    fn default() -> Self {
        Self::new()
    }
}
