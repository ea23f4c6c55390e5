use std::collections::BTreeMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::economy::goods::{GoodCatalog, GoodDescriptor, GoodId};
use crate::map::tile_pos::TilePos;
use crate::services::EconomyRegistry;

/// Stable handle of a factory, city or attraction.
///
/// Handles are never reused, so a lookup through [`NodeRegistry`] returning
/// `None` means the node was deleted.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect, Serialize, Deserialize,
)]
pub struct NodeId(pub u32);

/// Unordered pair of economic nodes plus the good moved between them.
///
/// `ConnectionKey::new(a, b, g) == ConnectionKey::new(b, a, g)`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect, Serialize, Deserialize,
)]
pub struct ConnectionKey {
    a: NodeId,
    b: NodeId,
    good: GoodId,
}

impl ConnectionKey {
    pub fn new(x: NodeId, y: NodeId, good: GoodId) -> Self {
        let (a, b) = if x <= y { (x, y) } else { (y, x) };
        Self { a, b, good }
    }

    pub fn nodes(&self) -> (NodeId, NodeId) {
        (self.a, self.b)
    }

    pub fn good(&self) -> GoodId {
        self.good
    }

    pub fn involves(&self, node: NodeId) -> bool {
        self.a == node || self.b == node
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Production {
    pub good: GoodId,
    pub per_month: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Factory {
        inputs: Vec<GoodId>,
        outputs: Vec<Production>,
    },
    City {
        population: u32,
    },
    Attraction {
        visitors_per_month: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EconomicNode {
    pub id: NodeId,
    pub name: String,
    /// Center tile.
    pub pos: TilePos,
    /// Tiles within this distance of `pos` belong to the node.
    pub extent: u32,
    pub kind: NodeKind,
}

impl EconomicNode {
    pub fn is_factory(&self) -> bool {
        matches!(self.kind, NodeKind::Factory { .. })
    }

    pub fn is_city(&self) -> bool {
        matches!(self.kind, NodeKind::City { .. })
    }

    pub fn inputs(&self) -> &[GoodId] {
        match &self.kind {
            NodeKind::Factory { inputs, .. } => inputs,
            _ => &[],
        }
    }

    pub fn produces(&self, good: GoodId) -> bool {
        match &self.kind {
            NodeKind::Factory { outputs, .. } => outputs.iter().any(|p| p.good == good),
            _ => false,
        }
    }

    pub fn population(&self) -> u32 {
        match self.kind {
            NodeKind::City { population } => population,
            NodeKind::Attraction { visitors_per_month } => visitors_per_month,
            NodeKind::Factory { .. } => 0,
        }
    }

    pub fn covers(&self, tile: TilePos) -> bool {
        self.pos.distance_to(tile) <= self.extent
    }
}

/// An input of a consumer factory that no connected supplier delivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingLink {
    pub consumer: NodeId,
    pub good: GoodId,
    /// Factories able to deliver the good, nearest first.
    pub suppliers: Vec<NodeId>,
}

/// Registry of factories, cities and attractions.
#[derive(Resource, Debug, Default)]
pub struct NodeRegistry {
    nodes: BTreeMap<NodeId, EconomicNode>,
    next_id: u32,
    pub goods: GoodCatalog,
    /// Deleted nodes not yet announced via [`crate::messages::NodeRemoved`].
    pending_removals: Vec<NodeId>,
}

impl NodeRegistry {
    pub fn with_goods(goods: GoodCatalog) -> Self {
        Self { goods, ..default() }
    }

    fn insert(&mut self, name: String, pos: TilePos, extent: u32, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            EconomicNode {
                id,
                name,
                pos,
                extent,
                kind,
            },
        );
        id
    }

    pub fn add_factory(
        &mut self,
        name: impl Into<String>,
        pos: TilePos,
        inputs: Vec<GoodId>,
        outputs: Vec<Production>,
    ) -> NodeId {
        self.insert(name.into(), pos, 1, NodeKind::Factory { inputs, outputs })
    }

    pub fn add_city(&mut self, name: impl Into<String>, pos: TilePos, population: u32) -> NodeId {
        self.insert(name.into(), pos, 2, NodeKind::City { population })
    }

    pub fn add_attraction(
        &mut self,
        name: impl Into<String>,
        pos: TilePos,
        visitors_per_month: u32,
    ) -> NodeId {
        self.insert(
            name.into(),
            pos,
            0,
            NodeKind::Attraction { visitors_per_month },
        )
    }

    /// Delete a node. Its handle is never handed out again.
    pub fn remove(&mut self, id: NodeId) -> Option<EconomicNode> {
        let removed = self.nodes.remove(&id);
        if removed.is_some() {
            self.pending_removals.push(id);
        }
        removed
    }

    pub fn take_removals(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.pending_removals)
    }

    pub fn get(&self, id: NodeId) -> Option<&EconomicNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EconomicNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Factories producing `good`, excluding `except`.
    pub fn suppliers_of(&self, good: GoodId, except: NodeId) -> impl Iterator<Item = &EconomicNode> {
        self.nodes
            .values()
            .filter(move |n| n.id != except && n.produces(good))
    }
}

impl EconomyRegistry for NodeRegistry {
    fn node(&self, id: NodeId) -> Option<&EconomicNode> {
        self.get(id)
    }

    fn nodes(&self) -> Box<dyn Iterator<Item = &EconomicNode> + '_> {
        Box::new(self.nodes.values())
    }

    fn good(&self, id: GoodId) -> Option<&GoodDescriptor> {
        self.goods.get(id)
    }

    fn passenger_good(&self) -> Option<GoodId> {
        self.goods.passengers()
    }

    fn missing_links(
        &self,
        consumer: NodeId,
        is_connected: &dyn Fn(&ConnectionKey) -> bool,
    ) -> Vec<MissingLink> {
        let Some(node) = self.get(consumer) else {
            return Vec::new();
        };

        let mut missing = Vec::new();
        for &good in node.inputs() {
            let mut suppliers: Vec<&EconomicNode> = self.suppliers_of(good, consumer).collect();
            let served = suppliers
                .iter()
                .any(|s| is_connected(&ConnectionKey::new(s.id, consumer, good)));
            if served {
                continue;
            }
            suppliers.sort_by_key(|s| (s.pos.distance_to(node.pos), s.id));
            missing.push(MissingLink {
                consumer,
                good,
                suppliers: suppliers.into_iter().map(|s| s.id).collect(),
            });
        }
        missing
    }

    fn output_rate(&self, node: NodeId, good: GoodId) -> u32 {
        match self.get(node).map(|n| &n.kind) {
            Some(NodeKind::Factory { outputs, .. }) => outputs
                .iter()
                .filter(|p| p.good == good)
                .map(|p| p.per_month)
                .sum(),
            _ => 0,
        }
    }
}
