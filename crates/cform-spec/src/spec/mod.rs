pub mod field;
pub mod form;

pub use field::{ColumnKind, ColumnSpec, FieldSpec, FieldType};
pub use form::{ConditionKind, ConditionSpec, FormSpec, MetaField};
