pub mod goods;
pub mod nodes;
pub mod treasury;

pub use goods::{FreightCategory, GoodCatalog, GoodDescriptor, GoodId};
pub use nodes::{
    ConnectionKey, EconomicNode, MissingLink, NodeId, NodeKind, NodeRegistry, Production,
};
pub use treasury::Treasury;
