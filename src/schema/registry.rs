//! Command schema table
//!
//! The registry maps `(SAP, command type)` to the schemas used for the request
//! body and its ACK body. It is owned by the application and handed to the
//! session as configuration.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, instrument};
use xxhash_rust::xxh3::xxh3_64;

use crate::protocol::{Sapi, TypeCode};

use super::{FieldKind, RecordSchema, Result, ScalarKind, SchemaError};

/// Fields of a segmentable request that drive segmentation
///
/// The initial frame carries the request itself, so its remaining-segment
/// counter is a field of the request. Trailing frames repeat the request's
/// id in their own header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segmentation {
    counter: String,
    id: String,
}

impl Segmentation {
    /// `counter` is a `u8` field, `id` a `u32` field of the request
    #[must_use]
    pub fn new(counter: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            counter: counter.into(),
            id: id.into(),
        }
    }

    /// Name of the remaining-segment counter field
    #[must_use]
    pub fn counter(&self) -> &str {
        &self.counter
    }

    /// Name of the id field copied into trailing segment headers
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self, name: &str, request: &RecordSchema) -> Result<()> {
        for (field, expected) in [(&self.counter, ScalarKind::U8), (&self.id, ScalarKind::U32)] {
            let ok = request.fixed_offset(field).is_some()
                && matches!(
                    request.field(field).map(|f| f.kind()),
                    Some(FieldKind::Scalar(spec)) if spec.kind() == expected
                );
            if !ok {
                return Err(SchemaError::InvalidSegmentation {
                    name: name.to_owned(),
                    field: field.clone(),
                    expected,
                });
            }
        }
        Ok(())
    }
}

/// Everything the session needs to know about one command
#[derive(Debug, Clone)]
pub struct CommandSchema {
    name: String,
    sapi: Sapi,
    code: TypeCode,
    request: Arc<RecordSchema>,
    ack: Option<Arc<RecordSchema>>,
    segmentation: Option<Segmentation>,
}

impl CommandSchema {
    /// Describe a command; its ACK body is kept raw unless [`with_ack`](Self::with_ack) is set
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        sapi: Sapi,
        code: TypeCode,
        request: Arc<RecordSchema>,
    ) -> Self {
        Self {
            name: name.into(),
            sapi,
            code,
            request,
            ack: None,
            segmentation: None,
        }
    }

    /// Use a command-specific ACK body
    #[must_use]
    pub fn with_ack(mut self, ack: Arc<RecordSchema>) -> Self {
        self.ack = Some(ack);
        self
    }

    /// Allow the request to be split into segments
    #[must_use]
    pub fn segmentable(mut self, segmentation: Segmentation) -> Self {
        self.segmentation = Some(segmentation);
        self
    }

    /// Command name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Service access point
    #[must_use]
    pub const fn sapi(&self) -> Sapi {
        self.sapi
    }

    /// Command type code
    #[must_use]
    pub const fn code(&self) -> TypeCode {
        self.code
    }

    /// Request body schema
    #[must_use]
    pub fn request(&self) -> &Arc<RecordSchema> {
        &self.request
    }

    /// ACK body schema, if the command defines its own
    #[must_use]
    pub fn ack(&self) -> Option<&Arc<RecordSchema>> {
        self.ack.as_ref()
    }

    /// Segmentation fields, if the request may be segmented
    #[must_use]
    pub const fn segmentation(&self) -> Option<&Segmentation> {
        self.segmentation.as_ref()
    }

    /// Whether the request may be segmented
    #[must_use]
    pub const fn is_segmentable(&self) -> bool {
        self.segmentation.is_some()
    }

    /// Fingerprint over the command's name, schemas and segmentation fields
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut descriptor = Vec::with_capacity(self.name.len() + 32);
        descriptor.extend_from_slice(self.name.as_bytes());
        descriptor.extend_from_slice(&self.request.fingerprint().to_le_bytes());
        let ack = self.ack.as_ref().map_or(0, |a| a.fingerprint());
        descriptor.extend_from_slice(&ack.to_le_bytes());
        if let Some(seg) = &self.segmentation {
            descriptor.push(1);
            descriptor.extend_from_slice(seg.counter.as_bytes());
            descriptor.push(0);
            descriptor.extend_from_slice(seg.id.as_bytes());
        }
        xxh3_64(&descriptor)
    }
}

/// Table of known commands
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    commands: HashMap<(Sapi, TypeCode), CommandSchema>,
}

impl SchemaRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command
    ///
    /// Registering the same schema twice is a no-op; registering a different
    /// schema under an existing code is a [`SchemaError::Conflict`]. The
    /// segmentation fields of a segmentable command are checked against its
    /// request schema.
    #[instrument(level = "debug", skip(self, command), fields(name = command.name(), code = command.code().as_u16()))]
    pub fn register(&mut self, command: CommandSchema) -> Result<()> {
        let key = (command.sapi, command.code);
        let fingerprint = command.fingerprint();
        if let Some(seg) = &command.segmentation {
            seg.validate(&command.name, &command.request)?;
        }

        if let Some(existing) = self.commands.get(&key) {
            if existing.fingerprint() == fingerprint {
                return Ok(());
            }
            return Err(SchemaError::Conflict {
                name: command.name,
                sapi: command.sapi,
                code: command.code,
            });
        }

        debug!(fingerprint, segmentable = command.is_segmentable(), "command registered");
        self.commands.insert(key, command);
        Ok(())
    }

    /// Look up a command by SAP and type code
    pub fn lookup(&self, sapi: Sapi, code: TypeCode) -> Result<&CommandSchema> {
        self.commands
            .get(&(sapi, code))
            .ok_or(SchemaError::UnknownType { sapi, code })
    }

    /// Number of registered commands
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no command is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Iterate over the registered commands
    pub fn iter(&self) -> impl Iterator<Item = &CommandSchema> {
        self.commands.values()
    }
}
