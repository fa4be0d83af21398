//! Segment engine: ordered named fields, each bound to a codec, serialized
//! as a fixed sequence of binary records.
//!
//! A segment type is declared once through [`SegmentBuilder`] as an explicit,
//! ordered field-registration list; [`SegmentBuilder::build`] validates the
//! declaration before any encode/decode is possible. Field codecs are built
//! lazily through the injected [`FieldCodecCache`] and shared across every
//! instance of the segment type.
//!
//! Field order is the declaration order, identical for every instance.
//! Encode and decode are all-or-nothing: the first field failure aborts the
//! whole operation, rewrapped with the field's qualified name.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::cache::{FieldCodecCache, PropertyKey};
use crate::codec::{ArcCodec, Codec, CodecDefinition};
use crate::config::Factory;
use crate::cursor::{ReadCursor, WriteCursor};
use crate::error::{short_type_name, CodecError, DefinitionError};
use crate::filter::{apply_filters, FilterDefinition};

/// Per-instance slot for one segment field: the value (absent until set or
/// decoded) plus the cursor offset of its most recent encode/decode.
#[derive(Debug, Clone)]
pub struct Property<T> {
    value: Option<T>,
    last_offset: Cell<Option<usize>>,
}

impl<T> Default for Property<T> {
    fn default() -> Self {
        Property {
            value: None,
            last_offset: Cell::new(None),
        }
    }
}

impl<T> Property<T> {
    pub fn new() -> Self {
        Property::default()
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn set(&mut self, value: T) {
        self.value = Some(value);
    }

    pub fn take(&mut self) -> Option<T> {
        self.value.take()
    }

    pub fn clear(&mut self) {
        self.value = None;
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Cursor offset at the start of the most recent encode/decode of this
    /// field. Diagnostic only; `None` while the value is absent.
    pub fn last_offset(&self) -> Option<usize> {
        if self.value.is_some() {
            self.last_offset.get()
        } else {
            None
        }
    }

    fn record_offset(&self, offset: usize) {
        self.last_offset.set(Some(offset));
    }
}

/// Projects a segment field for reading.
pub type PropertyRef<S, T> = fn(&S) -> &Property<T>;
/// Projects a segment field for writing.
pub type PropertyMut<S, T> = fn(&mut S) -> &mut Property<T>;

trait ErasedField<S>: Send + Sync {
    fn name(&self) -> &'static str;
    /// Addresses of the slot the read and write accessors resolve to on a
    /// probe instance; used by definition-time wiring validation.
    fn slot_addrs(&self, probe: &mut S) -> (usize, usize);
    fn encode(
        &self,
        seg: &S,
        cache: &FieldCodecCache,
        cursor: &mut WriteCursor,
    ) -> Result<(), CodecError>;
    fn decode(
        &self,
        seg: &mut S,
        cache: &FieldCodecCache,
        cursor: &mut ReadCursor<'_>,
    ) -> Result<(), CodecError>;
}

struct FieldDef<S, T> {
    name: &'static str,
    owner: &'static str,
    get: PropertyRef<S, T>,
    get_mut: PropertyMut<S, T>,
    definition: Arc<dyn CodecDefinition<T>>,
    filters: Vec<Arc<dyn FilterDefinition<T>>>,
}

impl<S, T> FieldDef<S, T> {
    fn qualified(&self) -> String {
        format!("{}.{}", self.owner, self.name)
    }
}

impl<S: 'static, T: 'static> FieldDef<S, T> {
    /// Built at most once per `(owning type, field)` key per cache; the
    /// filter chain folds over the base codec, last filter outermost.
    fn codec(&self, cache: &FieldCodecCache) -> Result<ArcCodec<T>, DefinitionError> {
        cache.get_or_build(PropertyKey::new::<S>(self.name), || {
            let base = self.definition.build_codec()?;
            apply_filters(base, &self.filters)
        })
    }
}

impl<S: 'static, T: 'static> ErasedField<S> for FieldDef<S, T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn slot_addrs(&self, probe: &mut S) -> (usize, usize) {
        let by_ref = (self.get)(probe) as *const Property<T> as usize;
        let by_mut = (self.get_mut)(probe) as *mut Property<T> as usize;
        (by_ref, by_mut)
    }

    fn encode(
        &self,
        seg: &S,
        cache: &FieldCodecCache,
        cursor: &mut WriteCursor,
    ) -> Result<(), CodecError> {
        let codec = self.codec(cache)?;
        let property = (self.get)(seg);
        property.record_offset(cursor.position());
        match property.get() {
            Some(value) => codec.encode(value, cursor).map_err(|e| CodecError::Field {
                field: self.qualified(),
                source: Box::new(e),
            }),
            None => Err(CodecError::AbsentField {
                field: self.qualified(),
            }),
        }
    }

    fn decode(
        &self,
        seg: &mut S,
        cache: &FieldCodecCache,
        cursor: &mut ReadCursor<'_>,
    ) -> Result<(), CodecError> {
        let codec = self.codec(cache)?;
        let offset = cursor.position();
        let value = codec.decode(cursor).map_err(|e| CodecError::Field {
            field: self.qualified(),
            source: Box::new(e),
        })?;
        let property = (self.get_mut)(seg);
        property.last_offset.set(Some(offset));
        property.value = Some(value);
        Ok(())
    }
}

/// Collects the ordered field registrations of a segment type.
pub struct SegmentBuilder<S> {
    factory: Factory<S>,
    fields: Vec<Arc<dyn ErasedField<S>>>,
}

impl<S: 'static> SegmentBuilder<S> {
    pub fn new(factory: Factory<S>) -> Self {
        SegmentBuilder {
            factory,
            fields: Vec::new(),
        }
    }

    /// Registers the next field in declaration order.
    pub fn field<T: 'static>(
        self,
        name: &'static str,
        get: PropertyRef<S, T>,
        get_mut: PropertyMut<S, T>,
        definition: impl CodecDefinition<T> + 'static,
    ) -> Self {
        self.field_filtered(name, get, get_mut, definition, Vec::new())
    }

    /// Registers a field whose codec is wrapped by `filters` in declaration
    /// order (last filter outermost).
    pub fn field_filtered<T: 'static>(
        mut self,
        name: &'static str,
        get: PropertyRef<S, T>,
        get_mut: PropertyMut<S, T>,
        definition: impl CodecDefinition<T> + 'static,
        filters: Vec<Arc<dyn FilterDefinition<T>>>,
    ) -> Self {
        self.fields.push(Arc::new(FieldDef {
            name,
            owner: short_type_name::<S>(),
            get,
            get_mut,
            definition: Arc::new(definition),
            filters,
        }));
        self
    }

    /// Validates the declaration and produces the segment definition.
    ///
    /// Checks, with every problem collected into one combined error:
    /// - the factory produces an instance (decode needs fresh ones);
    /// - at least one field is registered;
    /// - field names are unique and every registration resolves to its own
    ///   property slot (read and write accessors must agree).
    pub fn build(self, cache: Arc<FieldCodecCache>) -> Result<SegmentDef<S>, DefinitionError> {
        let type_name = short_type_name::<S>();
        let mut problems = Vec::new();

        let mut probe = match (self.factory)() {
            Ok(instance) => Some(instance),
            Err(reason) => {
                problems.push(DefinitionError::Construction { type_name, reason });
                None
            }
        };

        if self.fields.is_empty() {
            problems.push(DefinitionError::NoFields { type_name });
        }

        let mut offenders: Vec<String> = Vec::new();
        let mut names = HashSet::new();
        for field in &self.fields {
            if !names.insert(field.name()) {
                offenders.push(format!("{} (duplicate name)", field.name()));
            }
        }
        if let Some(probe) = probe.as_mut() {
            let mut slots: HashMap<usize, &'static str> = HashMap::new();
            for field in &self.fields {
                let (by_ref, by_mut) = field.slot_addrs(probe);
                if by_ref != by_mut {
                    offenders.push(format!("{} (accessors disagree)", field.name()));
                    continue;
                }
                if let Some(previous) = slots.insert(by_mut, field.name()) {
                    offenders.push(format!(
                        "{} (shares a slot with {})",
                        field.name(),
                        previous
                    ));
                }
            }
        }
        if !offenders.is_empty() {
            problems.push(DefinitionError::MiswiredFields {
                type_name,
                fields: offenders,
            });
        }

        if !problems.is_empty() {
            return Err(DefinitionError::aggregate(problems));
        }

        tracing::debug!(segment = type_name, fields = self.fields.len(), "segment defined");
        Ok(SegmentDef {
            name: type_name,
            factory: self.factory,
            fields: self.fields,
            cache,
        })
    }
}

/// A validated segment type: its ordered fields and the codec cache they
/// build through. Field order is fixed once built.
pub struct SegmentDef<S> {
    name: &'static str,
    factory: Factory<S>,
    fields: Vec<Arc<dyn ErasedField<S>>>,
    cache: Arc<FieldCodecCache>,
}

impl<S> Clone for SegmentDef<S> {
    fn clone(&self) -> Self {
        SegmentDef {
            name: self.name,
            factory: Arc::clone(&self.factory),
            fields: self.fields.clone(),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<S> fmt::Debug for SegmentDef<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentDef")
            .field("name", &self.name)
            .field(
                "fields",
                &self.fields.iter().map(|x| x.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<S: 'static> SegmentDef<S> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Fresh instance with every field absent.
    pub fn new_instance(&self) -> Result<S, CodecError> {
        (self.factory)().map_err(|reason| {
            CodecError::Definition(DefinitionError::Construction {
                type_name: self.name,
                reason,
            })
        })
    }

    /// Encode every field in declaration order into a new buffer.
    pub fn encode(&self, seg: &S) -> Result<Vec<u8>, CodecError> {
        let mut cursor = WriteCursor::new();
        self.encode_into(seg, &mut cursor)?;
        Ok(cursor.into_bytes())
    }

    /// Encode onto an existing cursor. All-or-nothing: an absent field value
    /// fails with that field's name and nothing after it is written.
    pub fn encode_into(&self, seg: &S, cursor: &mut WriteCursor) -> Result<(), CodecError> {
        tracing::trace!(segment = self.name, "encode");
        for field in &self.fields {
            field.encode(seg, &self.cache, cursor)?;
        }
        Ok(())
    }

    /// Decode a buffer into a brand-new instance, consuming it exactly to
    /// the end: unread bytes after the last field are a trailing-data error.
    pub fn decode(&self, bytes: &[u8]) -> Result<S, CodecError> {
        let mut cursor = ReadCursor::new(bytes);
        let seg = self.decode_from(&mut cursor)?;
        if !cursor.is_empty() {
            return Err(CodecError::TrailingData {
                segment: self.name,
                remaining: cursor.remaining(),
            });
        }
        Ok(seg)
    }

    /// Decode from a cursor, consuming exactly the fields' bytes and leaving
    /// the cursor at the first byte after them. The trailing-data check
    /// belongs to the buffer boundary ([`Self::decode`]); use this form when
    /// the segment sits inside a larger buffer, handing it a bounded
    /// [`ReadCursor::take`] view if a strict inner boundary is needed.
    pub fn decode_from(&self, cursor: &mut ReadCursor<'_>) -> Result<S, CodecError> {
        tracing::trace!(segment = self.name, "decode");
        let mut seg = self.new_instance()?;
        for field in &self.fields {
            field.decode(&mut seg, &self.cache, cursor)?;
        }
        Ok(seg)
    }

    /// Adapts this segment into a codec definition so it can be bound as a
    /// field of an outer segment.
    pub fn codec_definition(&self) -> SegmentCodecDefinition<S> {
        SegmentCodecDefinition { def: self.clone() }
    }
}

/// [`CodecDefinition`] adapter for a segment used as a field value.
pub struct SegmentCodecDefinition<S> {
    def: SegmentDef<S>,
}

impl<S> Clone for SegmentCodecDefinition<S> {
    fn clone(&self) -> Self {
        SegmentCodecDefinition {
            def: self.def.clone(),
        }
    }
}

impl<S: 'static> CodecDefinition<S> for SegmentCodecDefinition<S> {
    fn build_codec(&self) -> Result<ArcCodec<S>, DefinitionError> {
        Ok(Arc::new(SegmentCodec {
            def: self.def.clone(),
        }))
    }
}

struct SegmentCodec<S> {
    def: SegmentDef<S>,
}

impl<S: 'static> Codec<S> for SegmentCodec<S> {
    fn encode(&self, value: &S, cursor: &mut WriteCursor) -> Result<(), CodecError> {
        self.def.encode_into(value, cursor)
    }

    fn decode(&self, cursor: &mut ReadCursor<'_>) -> Result<S, CodecError> {
        self.def.decode_from(cursor)
    }
}
