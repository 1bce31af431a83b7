//! Scene graph owned by the rendering side: node hierarchy, name index,
//! material arena and a ledger of GPU-backed resources created at runtime.

use crate::render::geometry::{Aabb, Geometry};
use crate::render::material::{Material, TextureImage};
use crate::render::outline::EdgeOverlay;
use glam::Mat4;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(u32);

/// A drawable mesh surface. Several surfaces may share one material.
#[derive(Debug, Clone)]
pub struct Surface {
    pub geometry: Arc<Geometry>,
    pub material: MaterialId,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Group,
    Surface(Surface),
    Overlay(EdgeOverlay),
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub kind: NodeKind,
    pub local: Mat4,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SceneNode {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn surface(&self) -> Option<&Surface> {
        match &self.kind {
            NodeKind::Surface(surface) => Some(surface),
            _ => None,
        }
    }

    pub fn overlay(&self) -> Option<&EdgeOverlay> {
        match &self.kind {
            NodeKind::Overlay(overlay) => Some(overlay),
            _ => None,
        }
    }
}

/// Live runtime allocations: cloned materials, overlays and uploaded
/// textures. Asset-owned resources are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceLedger {
    pub materials: usize,
    pub overlays: usize,
    pub textures: usize,
}

impl ResourceLedger {
    pub fn is_empty(&self) -> bool {
        self.materials == 0 && self.overlays == 0 && self.textures == 0
    }
}

#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<Option<SceneNode>>,
    roots: Vec<NodeId>,
    name_index: HashMap<String, NodeId>,
    materials: Vec<Option<Material>>,
    runtime_materials: HashSet<MaterialId>,
    ledger: ResourceLedger,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let id = MaterialId(self.materials.len() as u32);
        self.materials.push(Some(material));
        id
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0 as usize)?.as_ref()
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id.0 as usize)?.as_mut()
    }

    pub fn material_count(&self) -> usize {
        self.materials.iter().flatten().count()
    }

    /// Duplicates a material with all its parameters. The copy is a runtime
    /// resource and must be released with [`SceneGraph::dispose_material`].
    pub fn clone_material(&mut self, id: MaterialId) -> Option<MaterialId> {
        let copy = self.material(id)?.clone();
        let clone_id = self.add_material(copy);
        self.runtime_materials.insert(clone_id);
        self.ledger.materials += 1;
        Some(clone_id)
    }

    /// Releases a material created by [`SceneGraph::clone_material`].
    /// Asset-owned materials are left alone.
    pub fn dispose_material(&mut self, id: MaterialId) -> bool {
        if !self.runtime_materials.remove(&id) {
            return false;
        }
        if let Some(slot) = self.materials.get_mut(id.0 as usize) {
            *slot = None;
        }
        self.ledger.materials = self.ledger.materials.saturating_sub(1);
        true
    }

    pub fn add_node(
        &mut self,
        parent: Option<NodeId>,
        name: impl Into<String>,
        kind: NodeKind,
        local: Mat4,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(SceneNode {
            name: name.into(),
            kind,
            local,
            parent,
            children: Vec::new(),
        }));
        match parent.and_then(|parent| self.node_mut(parent)) {
            Some(parent_node) => parent_node.children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Registers `name` in the lookup index. The first registration wins.
    pub fn index_name(&mut self, name: &str, id: NodeId) {
        if name.is_empty() {
            return;
        }
        self.name_index.entry(name.to_string()).or_insert(id);
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0 as usize)?.as_ref()
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0 as usize)?.as_mut()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_some())
            .map(|(index, _)| NodeId(index as u32))
    }

    pub fn find_indexed(&self, name: &str) -> Option<NodeId> {
        let id = *self.name_index.get(name)?;
        self.node(id).map(|_| id)
    }

    /// Depth-first search over the whole hierarchy, roots in insertion order.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            if node.name == name && node.overlay().is_none() {
                return Some(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    pub fn surface(&self, id: NodeId) -> Option<&Surface> {
        self.node(id)?.surface()
    }

    pub fn surfaces(&self) -> impl Iterator<Item = (NodeId, &Surface)> + '_ {
        self.nodes.iter().enumerate().filter_map(|(index, node)| {
            let surface = node.as_ref()?.surface()?;
            Some((NodeId(index as u32), surface))
        })
    }

    pub fn set_surface_material(&mut self, id: NodeId, material: MaterialId) -> bool {
        match self.node_mut(id).map(|node| &mut node.kind) {
            Some(NodeKind::Surface(surface)) => {
                surface.material = material;
                true
            }
            _ => false,
        }
    }

    /// Attaches an overlay as a child of `parent` so it follows its transform.
    pub fn attach_overlay(&mut self, parent: NodeId, overlay: EdgeOverlay) -> Option<NodeId> {
        let name = format!("{}#outline", self.node(parent)?.name);
        let id = self.add_node(Some(parent), name, NodeKind::Overlay(overlay), Mat4::IDENTITY);
        self.ledger.overlays += 1;
        Some(id)
    }

    /// Detaches and releases an overlay node. Non-overlay nodes are refused.
    pub fn dispose_overlay(&mut self, id: NodeId) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        if node.overlay().is_none() {
            return false;
        }
        let parent = node.parent;
        if let Some(parent) = parent.and_then(|parent| self.node_mut(parent)) {
            parent.children.retain(|child| *child != id);
        } else {
            self.roots.retain(|root| *root != id);
        }
        self.nodes[id.0 as usize] = None;
        self.ledger.overlays = self.ledger.overlays.saturating_sub(1);
        true
    }

    pub fn overlay_nodes(&self) -> Vec<NodeId> {
        self.node_ids()
            .filter(|id| self.node(*id).is_some_and(|node| node.overlay().is_some()))
            .collect()
    }

    pub fn world_transform(&self, id: NodeId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = Some(id);
        while let Some(node) = current.and_then(|id| self.node(id)) {
            matrix = node.local * matrix;
            current = node.parent;
        }
        matrix
    }

    /// World-space bounds of all surfaces.
    pub fn bounds(&self) -> Option<Aabb> {
        self.surfaces()
            .filter_map(|(id, surface)| {
                let local = surface.geometry.bounds()?;
                Some(local.transformed(&self.world_transform(id)))
            })
            .reduce(|a, b| a.union(&b))
    }

    /// Uploads a decoded image; the returned handle counts as one live texture
    /// until passed to [`SceneGraph::release_texture`].
    pub fn upload_texture(&mut self, image: TextureImage) -> Arc<TextureImage> {
        self.ledger.textures += 1;
        Arc::new(image)
    }

    pub fn release_texture(&mut self, texture: Arc<TextureImage>) {
        drop(texture);
        self.ledger.textures = self.ledger.textures.saturating_sub(1);
    }

    pub fn ledger(&self) -> ResourceLedger {
        self.ledger
    }
}
