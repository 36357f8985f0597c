//! Field descriptors
//!
//! A record schema is an ordered list of [`FieldSpec`]s. Each descriptor fixes
//! the field's width, byte order and presence rule, so the codec never relies
//! on an inferred layout.

use std::sync::Arc;

use super::{RecordSchema, ScalarKind, ScalarSpec};

/// Width of a presence mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MaskWidth {
    /// 8-bit mask
    W8,
    /// 16-bit mask
    W16,
    /// 32-bit mask
    W32,
}

impl MaskWidth {
    /// Number of usable bits
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::W8 => 8,
            Self::W16 => 16,
            Self::W32 => 32,
        }
    }

    /// Wire representation
    #[must_use]
    pub const fn scalar(self) -> ScalarKind {
        match self {
            Self::W8 => ScalarKind::U8,
            Self::W16 => ScalarKind::U16,
            Self::W32 => ScalarKind::U32,
        }
    }
}

/// Sub-record gated by one bit of an earlier presence mask
#[derive(Debug, Clone)]
pub struct OptionalSpec {
    pub(crate) mask: String,
    pub(crate) bit: u8,
    pub(crate) record: Arc<RecordSchema>,
}

impl OptionalSpec {
    /// Name of the governing mask field
    #[must_use]
    pub fn mask(&self) -> &str {
        &self.mask
    }

    /// Bit index within the mask
    #[must_use]
    pub const fn bit(&self) -> u8 {
        self.bit
    }

    /// Schema of the sub-record
    #[must_use]
    pub fn record(&self) -> &Arc<RecordSchema> {
        &self.record
    }
}

/// How much room a union occupies on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnionLayout {
    /// Region sized to the largest variant, like a packed C union
    Overlay,
    /// Region of an explicit byte size
    Reserved(usize),
    /// Only the selected variant's bytes follow the selector
    Packed,
}

/// One arm of a discriminated union
#[derive(Debug, Clone)]
pub struct VariantSpec {
    pub(crate) tag: u64,
    pub(crate) name: String,
    pub(crate) record: Arc<RecordSchema>,
}

impl VariantSpec {
    /// Selector value for this arm
    #[must_use]
    pub const fn tag(&self) -> u64 {
        self.tag
    }

    /// Arm name, used in field paths
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Payload schema
    #[must_use]
    pub fn record(&self) -> &Arc<RecordSchema> {
        &self.record
    }
}

/// Discriminated union: a selector immediately followed by its payload
#[derive(Debug, Clone)]
pub struct UnionSpec {
    pub(crate) selector: ScalarKind,
    pub(crate) absent: u64,
    pub(crate) variants: Vec<VariantSpec>,
    pub(crate) layout: UnionLayout,
}

impl UnionSpec {
    /// Start a union whose selector is `selector` and whose "none" value is `absent`
    #[must_use]
    pub fn new(selector: ScalarKind, absent: u64) -> Self {
        Self {
            selector,
            absent: absent & selector.bit_mask(),
            variants: Vec::new(),
            layout: UnionLayout::Overlay,
        }
    }

    /// Add an arm
    #[must_use]
    pub fn variant(
        mut self,
        tag: u64,
        name: impl Into<String>,
        record: Arc<RecordSchema>,
    ) -> Self {
        self.variants.push(VariantSpec {
            tag,
            name: name.into(),
            record,
        });
        self
    }

    /// Override the wire layout (default: [`UnionLayout::Overlay`])
    #[must_use]
    pub fn layout(mut self, layout: UnionLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Selector kind
    #[must_use]
    pub const fn selector(&self) -> ScalarKind {
        self.selector
    }

    /// Selector value meaning "no variant"
    #[must_use]
    pub const fn absent(&self) -> u64 {
        self.absent
    }

    /// Declared arms
    #[must_use]
    pub fn variants(&self) -> &[VariantSpec] {
        &self.variants
    }

    /// Arm selected by `tag`
    #[must_use]
    pub fn find(&self, tag: u64) -> Option<&VariantSpec> {
        self.variants.iter().find(|v| v.tag == tag)
    }

    /// Wire layout
    #[must_use]
    pub const fn wire_layout(&self) -> UnionLayout {
        self.layout
    }

    /// Payload region size, or `None` for a packed union
    #[must_use]
    pub fn region_size(&self) -> Option<usize> {
        match self.layout {
            UnionLayout::Packed => None,
            UnionLayout::Reserved(size) => Some(size),
            UnionLayout::Overlay => self
                .variants
                .iter()
                .map(|v| v.record.fixed_size())
                .try_fold(0usize, |acc, size| size.map(|s| acc.max(s))),
        }
    }
}

/// Where a list takes its element count from
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CountSource {
    /// Count scalar written immediately before the elements
    Inline(ScalarKind),
    /// Count held by an earlier unsigned scalar field of the same record
    Field(String),
}

/// List element type
#[derive(Debug, Clone)]
pub enum ElementSpec {
    /// Raw octets, carried as one byte string
    Octet,
    /// Fixed-width integers
    Scalar(ScalarKind),
    /// Nested records
    Record(Arc<RecordSchema>),
}

impl ElementSpec {
    /// Encoded element size, when fixed
    #[must_use]
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            Self::Octet => Some(1),
            Self::Scalar(kind) => Some(kind.width()),
            Self::Record(record) => record.fixed_size(),
        }
    }
}

/// Physical list encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ListLayout {
    /// Exactly `count` packed elements
    Exact,
    /// Always `max` slots; only the first `count` are meaningful
    FixedCapacity,
}

/// Counted list or fixed-capacity array
#[derive(Debug, Clone)]
pub struct ListSpec {
    pub(crate) count: CountSource,
    pub(crate) max: usize,
    pub(crate) element: ElementSpec,
    pub(crate) layout: ListLayout,
}

impl ListSpec {
    /// Exact-count list with an inline count
    #[must_use]
    pub fn counted(count: ScalarKind, max: usize, element: ElementSpec) -> Self {
        Self {
            count: CountSource::Inline(count),
            max,
            element,
            layout: ListLayout::Exact,
        }
    }

    /// List whose count lives in an earlier field
    #[must_use]
    pub fn counted_by(count_field: impl Into<String>, max: usize, element: ElementSpec) -> Self {
        Self {
            count: CountSource::Field(count_field.into()),
            max,
            element,
            layout: ListLayout::Exact,
        }
    }

    /// Switch to the fixed-capacity layout
    #[must_use]
    pub fn fixed_capacity(mut self) -> Self {
        self.layout = ListLayout::FixedCapacity;
        self
    }

    /// Count source
    #[must_use]
    pub fn count(&self) -> &CountSource {
        &self.count
    }

    /// Declared maximum capacity
    #[must_use]
    pub const fn max(&self) -> usize {
        self.max
    }

    /// Element type
    #[must_use]
    pub fn element(&self) -> &ElementSpec {
        &self.element
    }

    /// Physical layout
    #[must_use]
    pub const fn layout(&self) -> ListLayout {
        self.layout
    }

    fn fixed_size(&self) -> Option<usize> {
        let inline = match &self.count {
            CountSource::Inline(kind) => kind.width(),
            CountSource::Field(_) => 0,
        };
        match self.layout {
            ListLayout::FixedCapacity => Some(inline + self.max * self.element.fixed_size()?),
            ListLayout::Exact if self.max == 0 => Some(inline),
            ListLayout::Exact => None,
        }
    }
}

/// What a field holds
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// Integer, possibly with an "absent" sentinel
    Scalar(ScalarSpec),
    /// Fixed-length opaque bytes
    Bytes(usize),
    /// Fixed-length NUL-padded string
    AsciiZ(usize),
    /// Presence mask for later optional sub-records
    Mask(MaskWidth),
    /// Sub-record present iff its mask bit is set
    Optional(OptionalSpec),
    /// Selector plus one variant payload
    Union(UnionSpec),
    /// Counted list or fixed-capacity array
    List(ListSpec),
    /// Always-present nested record
    Record(Arc<RecordSchema>),
}

impl FieldKind {
    /// Encoded size when it does not depend on the value
    #[must_use]
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            Self::Scalar(spec) => Some(spec.kind().width()),
            Self::Bytes(len) | Self::AsciiZ(len) => Some(*len),
            Self::Mask(width) => Some(width.scalar().width()),
            Self::Optional(_) => None,
            Self::Union(spec) => Some(spec.selector.width() + spec.region_size()?),
            Self::List(spec) => spec.fixed_size(),
            Self::Record(record) => record.fixed_size(),
        }
    }
}

/// Named field descriptor
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub(crate) name: String,
    pub(crate) kind: FieldKind,
}

impl FieldSpec {
    /// Field name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field kind
    #[must_use]
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }
}
