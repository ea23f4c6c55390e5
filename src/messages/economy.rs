use bevy::prelude::*;

use crate::economy::nodes::NodeId;

/// A factory, city or attraction was deleted from the economy.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRemoved {
    pub node: NodeId,
}
