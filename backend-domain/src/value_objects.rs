// Domain value objects
pub mod compare_op;
pub mod entity_kind;
pub mod value_source;

pub use compare_op::*;
pub use entity_kind::*;
pub use value_source::*;
