//! Record schemas
//!
//! One schema description drives both the in-memory value tree and the wire
//! codec. Schemas are plain data: the command catalog is supplied by the
//! application through a [`SchemaRegistry`].

mod error;
mod field;
mod record;
mod registry;
mod scalar;

pub use error::{Result, SchemaError};
pub use field::{
    CountSource, ElementSpec, FieldKind, FieldSpec, ListLayout, ListSpec, MaskWidth,
    OptionalSpec, UnionLayout, UnionSpec, VariantSpec,
};
pub use record::{RecordBuilder, RecordSchema};
pub use registry::{CommandSchema, SchemaRegistry, Segmentation};
pub use scalar::{ScalarKind, ScalarSpec};
