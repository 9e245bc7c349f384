use crate::symbol::{Label, Mesh, Organ};
use std::collections::BTreeMap;

/// Name of the property holding organ meshes
pub const GEOMETRY: &str = "geometry";
/// Name of the property holding organ labels
pub const LABEL: &str = "label";
/// Name of the property holding tissue types
pub const TISSUE_TYPE: &str = "tissue_type";

/// Value of a node property written by [`attach_organ`]
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum PropertyValue {
    Geometry(Mesh),
    Label(Label),
    TissueType(i32),
}

/// Per-node property storage of a plant topology graph
///
/// Each property is a map from node to value; graph libraries expose theirs
/// through this trait so that generated organs can be attached to nodes.
pub trait PropertyGraph {
    /// Node identifier
    type Node: Copy + Ord;

    /// Returns the named property, if it exists
    fn property(&self, name: &str) -> Option<&BTreeMap<Self::Node, PropertyValue>>;

    /// Returns the named property for writing, if it exists
    fn property_mut(
        &mut self,
        name: &str,
    ) -> Option<&mut BTreeMap<Self::Node, PropertyValue>>;

    /// Adds an empty property; does nothing if it already exists
    fn add_property(&mut self, name: &str);

    /// Removes a property, returning its values
    fn remove_property(
        &mut self,
        name: &str,
    ) -> Option<BTreeMap<Self::Node, PropertyValue>>;
}

/// In-memory [`PropertyGraph`] with integer nodes
#[derive(Clone, Debug, Default)]
pub struct PropertyTable {
    properties: BTreeMap<String, BTreeMap<u32, PropertyValue>>,
}

impl PropertyTable {
    /// Builds an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of every property
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(|s| s.as_str())
    }
}

impl PropertyGraph for PropertyTable {
    type Node = u32;

    fn property(&self, name: &str) -> Option<&BTreeMap<u32, PropertyValue>> {
        self.properties.get(name)
    }

    fn property_mut(
        &mut self,
        name: &str,
    ) -> Option<&mut BTreeMap<u32, PropertyValue>> {
        self.properties.get_mut(name)
    }

    fn add_property(&mut self, name: &str) {
        self.properties.entry(name.to_owned()).or_default();
    }

    fn remove_property(
        &mut self,
        name: &str,
    ) -> Option<BTreeMap<u32, PropertyValue>> {
        self.properties.remove(name)
    }
}

/// Writes an organ's geometry, label and tissue type onto a graph node
///
/// Missing properties are created.  Organs without a mesh only get a label
/// and a tissue type, and any stale geometry on the node is removed.
pub fn attach_organ<G: PropertyGraph>(graph: &mut G, node: G::Node, organ: Organ) {
    for name in [GEOMETRY, LABEL, TISSUE_TYPE] {
        if graph.property(name).is_none() {
            graph.add_property(name);
        }
    }
    let mut set = |name: &str, value: Option<PropertyValue>| {
        if let Some(p) = graph.property_mut(name) {
            match value {
                Some(v) => p.insert(node, v),
                None => p.remove(&node),
            };
        }
    };
    set(GEOMETRY, organ.geometry.map(PropertyValue::Geometry));
    set(LABEL, Some(PropertyValue::Label(organ.label)));
    set(TISSUE_TYPE, Some(PropertyValue::TissueType(organ.tissue_type)));
}
