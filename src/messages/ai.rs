use bevy::prelude::*;

use crate::map::tile_pos::TilePos;

/// What a player-facing news item is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageCategory {
    /// A new connection opened.
    Construction,
    /// Convoys or lines were retired.
    Retirement,
    /// A vehicle got stuck and was removed.
    Problem,
}

/// News published by an AI player.
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct AiAnnouncement {
    pub player: Entity,
    pub text: String,
    pub location: Option<TilePos>,
    pub category: MessageCategory,
}
