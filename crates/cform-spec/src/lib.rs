#![allow(missing_docs)]

pub mod aggregate;
pub mod condition;
pub mod expr;
pub mod normalize;
pub mod populate;
pub mod spec;
pub mod state;
pub mod trigger;
pub mod value;

pub use aggregate::{CollectOptions, RequestContext, collect_document};
pub use condition::{BLANK_SIGNATURE, ConditionResult, evaluate_condition};
pub use expr::{ExprError, Value, evaluate_str, parse};
pub use normalize::normalize_field;
pub use populate::{populate_field, populate_form, reset_form, set_field_options, set_range_options};
pub use spec::{
    ColumnKind, ColumnSpec, ConditionKind, ConditionSpec, FieldSpec, FieldType, FormSpec, MetaField,
};
pub use state::{FieldState, FormState, PendingFile, RangeLabel, RangeOptions, Visibility};
pub use trigger::{TriggerEngine, TriggerOutcome};
pub use value::{CellValue, FieldValue, FileDescriptor, FormDocument, Row};
