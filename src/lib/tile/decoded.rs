use crate::*;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// A contiguous span of a geometry's primitives drawn with one technique.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub start: u32,
    pub count: u32,
    pub technique_index: usize,
    pub render_order_offset: Option<f32>,
    /// Tile offsets objects were already created for.
    created: BTreeSet<i32>,
}

impl Group {
    pub fn new(start: u32, count: u32, technique_index: usize) -> Self {
        Self {
            start,
            count,
            technique_index,
            render_order_offset: None,
            created: BTreeSet::new(),
        }
    }

    pub fn with_render_order_offset(mut self, offset: f32) -> Self {
        self.render_order_offset = Some(offset);
        self
    }

    pub fn end(&self) -> u32 {
        self.start + self.count
    }

    pub fn is_created(&self, offset: i32) -> bool {
        self.created.contains(&offset)
    }

    pub fn mark_created(&mut self, offset: i32) {
        self.created.insert(offset);
    }
}

/// Heights of a terrain tile on a regular grid.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplacementMap {
    pub x_size: u32,
    pub y_size: u32,
    pub heights: Rc<Vec<f32>>,
}

/// Per primitive metadata of a geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectInfos {
    Features { ids: Vec<u64>, starts: Vec<u32> },
    Displacement(DisplacementMap),
}

/// Buffers of one decoded geometry and the groups partitioning them.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub vertex_attributes: BTreeMap<String, BufferAttribute>,
    pub interleaved: Vec<InterleavedBuffer>,
    pub index: Option<Rc<Vec<u32>>>,
    /// Line segment indices along polygon edges.
    pub edge_index: Option<Rc<Vec<u32>>>,
    pub object_infos: Option<ObjectInfos>,
    pub groups: Vec<Group>,
}

impl Geometry {
    pub fn new() -> Self {
        Self {
            vertex_attributes: BTreeMap::new(),
            interleaved: vec![],
            index: None,
            edge_index: None,
            object_infos: None,
            groups: vec![],
        }
    }

    pub fn with_attribute(mut self, name: &str, attribute: BufferAttribute) -> Self {
        self.vertex_attributes.insert(name.to_string(), attribute);
        self
    }

    pub fn with_index(mut self, index: Vec<u32>) -> Self {
        self.index = Some(Rc::new(index));
        self
    }

    pub fn with_edge_index(mut self, index: Vec<u32>) -> Self {
        self.edge_index = Some(Rc::new(index));
        self
    }

    pub fn with_object_infos(mut self, infos: ObjectInfos) -> Self {
        self.object_infos = Some(infos);
        self
    }

    pub fn with_group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new()
    }
}

/// A tile as it comes out of the decoder.
#[derive(Debug, Clone, Default)]
pub struct DecodedTile {
    pub techniques: Vec<Rc<Technique>>,
    pub geometries: Vec<Geometry>,
}
