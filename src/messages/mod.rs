pub mod ai;
pub mod economy;

pub use ai::{AiAnnouncement, MessageCategory};
pub use economy::NodeRemoved;
