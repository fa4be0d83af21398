//! Codec filters: decorators that wrap an existing codec with pre/post
//! behavior while delegating to the wrapped chain.
//!
//! Filters declared `[f1, f2, f3]` over a base codec `c0` fold into
//! `f3.wrap(f2.wrap(f1.wrap(c0)))`: the last-declared filter runs outermost
//! on both encode and decode. That order determines byte framing (e.g.
//! checksum-then-pad vs pad-then-checksum) and is preserved exactly.
//!
//! Built-in filters cover the common cross-cutting cases: [`checksum_filter`],
//! [`pad_filter`], and [`trace_filter`].

use std::sync::Arc;

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::codec::{check_halves, ArcCodec, Codec};
use crate::config::{ConfigResolver, Factory};
use crate::cursor::{ReadCursor, WriteCursor};
use crate::error::{CodecError, DefinitionError};

pub type EncodeFilterFn<T> = Arc<
    dyn Fn(&T, &mut WriteCursor, &dyn Codec<T>) -> Result<(), CodecError> + Send + Sync,
>;
pub type DecodeFilterFn<T> = Arc<
    dyn Fn(&mut ReadCursor<'_>, &dyn Codec<T>) -> Result<T, CodecError> + Send + Sync,
>;
pub type EncodeFilterWithConfigFn<T, C> = Arc<
    dyn Fn(&T, &mut WriteCursor, &C, &dyn Codec<T>) -> Result<(), CodecError> + Send + Sync,
>;
pub type DecodeFilterWithConfigFn<T, C> = Arc<
    dyn Fn(&mut ReadCursor<'_>, &C, &dyn Codec<T>) -> Result<T, CodecError> + Send + Sync,
>;

/// Produces a new codec that calls into `chain` as part of its own
/// encode/decode. A filter may call its chain zero or more times.
pub trait FilterDefinition<T>: Send + Sync {
    fn wrap(&self, chain: ArcCodec<T>) -> Result<ArcCodec<T>, DefinitionError>;
}

impl<T, D: FilterDefinition<T> + ?Sized> FilterDefinition<T> for Arc<D> {
    fn wrap(&self, chain: ArcCodec<T>) -> Result<ArcCodec<T>, DefinitionError> {
        (**self).wrap(chain)
    }
}

/// Fold an ordered filter list over a base codec, last filter outermost.
pub fn apply_filters<T>(
    base: ArcCodec<T>,
    filters: &[Arc<dyn FilterDefinition<T>>],
) -> Result<ArcCodec<T>, DefinitionError> {
    let mut codec = base;
    for filter in filters {
        codec = filter.wrap(codec)?;
    }
    Ok(codec)
}

/// The codec a filter wraps around its chain.
struct FilterCodec<T> {
    enc: EncodeFilterFn<T>,
    dec: DecodeFilterFn<T>,
    chain: ArcCodec<T>,
}

impl<T> Codec<T> for FilterCodec<T> {
    fn encode(&self, value: &T, cursor: &mut WriteCursor) -> Result<(), CodecError> {
        (self.enc)(value, cursor, self.chain.as_ref())
    }

    fn decode(&self, cursor: &mut ReadCursor<'_>) -> Result<T, CodecError> {
        (self.dec)(cursor, self.chain.as_ref())
    }
}

/// Collects the encode and decode halves of a filter definition.
pub struct FilterBuilder<T> {
    enc: Vec<EncodeFilterFn<T>>,
    dec: Vec<DecodeFilterFn<T>>,
}

impl<T: 'static> Default for FilterBuilder<T> {
    fn default() -> Self {
        FilterBuilder::new()
    }
}

impl<T: 'static> FilterBuilder<T> {
    pub fn new() -> Self {
        FilterBuilder {
            enc: Vec::new(),
            dec: Vec::new(),
        }
    }

    pub fn encodes_with(
        mut self,
        enc: impl Fn(&T, &mut WriteCursor, &dyn Codec<T>) -> Result<(), CodecError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.enc.push(Arc::new(enc));
        self
    }

    pub fn decodes_with(
        mut self,
        dec: impl Fn(&mut ReadCursor<'_>, &dyn Codec<T>) -> Result<T, CodecError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.dec.push(Arc::new(dec));
        self
    }

    /// Validates the declaration the same way [`crate::CodecBuilder`] does:
    /// both halves, declared once, problems combined.
    pub fn build(self) -> Result<SimpleFilterDefinition<T>, DefinitionError> {
        let mut problems = Vec::new();
        check_halves("filter", self.enc.len(), self.dec.len(), &mut problems);
        if !problems.is_empty() {
            return Err(DefinitionError::aggregate(problems));
        }
        match (self.enc.into_iter().next(), self.dec.into_iter().next()) {
            (Some(enc), Some(dec)) => Ok(SimpleFilterDefinition { enc, dec }),
            _ => Err(DefinitionError::MissingHalf {
                what: "filter",
                half: "encode",
            }),
        }
    }
}

/// Filter definition built from plain filter closures.
pub struct SimpleFilterDefinition<T> {
    enc: EncodeFilterFn<T>,
    dec: DecodeFilterFn<T>,
}

impl<T> Clone for SimpleFilterDefinition<T> {
    fn clone(&self) -> Self {
        SimpleFilterDefinition {
            enc: Arc::clone(&self.enc),
            dec: Arc::clone(&self.dec),
        }
    }
}

impl<T> std::fmt::Debug for SimpleFilterDefinition<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleFilterDefinition").finish_non_exhaustive()
    }
}

impl<T: 'static> SimpleFilterDefinition<T> {
    pub(crate) fn from_parts(enc: EncodeFilterFn<T>, dec: DecodeFilterFn<T>) -> Self {
        SimpleFilterDefinition { enc, dec }
    }
}

impl<T: 'static> FilterDefinition<T> for SimpleFilterDefinition<T> {
    fn wrap(&self, chain: ArcCodec<T>) -> Result<ArcCodec<T>, DefinitionError> {
        Ok(Arc::new(FilterCodec {
            enc: Arc::clone(&self.enc),
            dec: Arc::clone(&self.dec),
            chain,
        }))
    }
}

/// Collects the halves of a filter definition parameterized by a
/// configuration type `C`.
pub struct ConfigurableFilterBuilder<T, C> {
    resolver: ConfigResolver<C>,
    enc: Vec<EncodeFilterWithConfigFn<T, C>>,
    dec: Vec<DecodeFilterWithConfigFn<T, C>>,
}

impl<T: 'static, C: Send + Sync + 'static> ConfigurableFilterBuilder<T, C> {
    /// Probes `factory` once, like [`crate::ConfigurableCodecBuilder::new`].
    pub fn new(factory: Factory<C>) -> Result<Self, DefinitionError> {
        Ok(ConfigurableFilterBuilder {
            resolver: ConfigResolver::new(factory)?,
            enc: Vec::new(),
            dec: Vec::new(),
        })
    }

    pub fn with_spec(mut self, spec: impl Fn(&mut C) + Send + Sync + 'static) -> Self {
        self.resolver = self.resolver.with_spec(Arc::new(spec));
        self
    }

    pub fn encodes_with(
        mut self,
        enc: impl Fn(&T, &mut WriteCursor, &C, &dyn Codec<T>) -> Result<(), CodecError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.enc.push(Arc::new(enc));
        self
    }

    pub fn decodes_with(
        mut self,
        dec: impl Fn(&mut ReadCursor<'_>, &C, &dyn Codec<T>) -> Result<T, CodecError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.dec.push(Arc::new(dec));
        self
    }

    pub fn build(self) -> Result<ConfigurableFilterDefinition<T, C>, DefinitionError> {
        let mut problems = Vec::new();
        check_halves("filter", self.enc.len(), self.dec.len(), &mut problems);
        if !problems.is_empty() {
            return Err(DefinitionError::aggregate(problems));
        }
        match (self.enc.into_iter().next(), self.dec.into_iter().next()) {
            (Some(enc), Some(dec)) => Ok(ConfigurableFilterDefinition {
                resolver: self.resolver,
                enc,
                dec,
            }),
            _ => Err(DefinitionError::MissingHalf {
                what: "filter",
                half: "encode",
            }),
        }
    }
}

/// A filter definition parameterized by a configuration type `C`, with the
/// same immutable-value semantics as [`crate::ConfigurableCodecDefinition`].
pub struct ConfigurableFilterDefinition<T, C> {
    resolver: ConfigResolver<C>,
    enc: EncodeFilterWithConfigFn<T, C>,
    dec: DecodeFilterWithConfigFn<T, C>,
}

impl<T, C> Clone for ConfigurableFilterDefinition<T, C> {
    fn clone(&self) -> Self {
        ConfigurableFilterDefinition {
            resolver: self.resolver.clone(),
            enc: Arc::clone(&self.enc),
            dec: Arc::clone(&self.dec),
        }
    }
}

impl<T: 'static, C: Send + Sync + 'static> ConfigurableFilterDefinition<T, C> {
    pub(crate) fn from_parts(
        resolver: ConfigResolver<C>,
        enc: EncodeFilterWithConfigFn<T, C>,
        dec: DecodeFilterWithConfigFn<T, C>,
    ) -> Self {
        ConfigurableFilterDefinition { resolver, enc, dec }
    }

    /// Appends an override spec, returning a new definition.
    pub fn with_overrides(&self, spec: impl Fn(&mut C) + Send + Sync + 'static) -> Self {
        ConfigurableFilterDefinition {
            resolver: self.resolver.with_spec(Arc::new(spec)),
            enc: Arc::clone(&self.enc),
            dec: Arc::clone(&self.dec),
        }
    }
}

impl<T: 'static, C: Send + Sync + 'static> FilterDefinition<T>
    for ConfigurableFilterDefinition<T, C>
{
    fn wrap(&self, chain: ArcCodec<T>) -> Result<ArcCodec<T>, DefinitionError> {
        let config = Arc::new(self.resolver.resolve()?);
        let enc = Arc::clone(&self.enc);
        let dec = Arc::clone(&self.dec);
        let enc_config = Arc::clone(&config);
        Ok(Arc::new(FilterCodec {
            enc: Arc::new(
                move |value: &T, cursor: &mut WriteCursor, chain: &dyn Codec<T>| {
                    enc(value, cursor, &enc_config, chain)
                },
            ),
            dec: Arc::new(move |cursor: &mut ReadCursor<'_>, chain: &dyn Codec<T>| {
                dec(cursor, &config, chain)
            }),
            chain,
        }))
    }
}

fn xor_sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// Appends one XOR checksum byte over the bytes the chain wrote; decode
/// re-computes it over the bytes the chain consumed and verifies.
pub fn checksum_filter<T: 'static>() -> SimpleFilterDefinition<T> {
    SimpleFilterDefinition::from_parts(
        Arc::new(
            |value: &T, cursor: &mut WriteCursor, chain: &dyn Codec<T>| {
                let start = cursor.position();
                chain.encode(value, cursor)?;
                let sum = xor_sum(&cursor.as_bytes()[start..]);
                cursor.write_u8(sum)?;
                Ok(())
            },
        ),
        Arc::new(|cursor: &mut ReadCursor<'_>, chain: &dyn Codec<T>| {
            let start = cursor.position();
            let value = chain.decode(cursor)?;
            let expected = xor_sum(&cursor.bytes()[start..cursor.position()]);
            let found = cursor.read_u8()?;
            if found != expected {
                return Err(CodecError::Invalid(format!(
                    "checksum mismatch: expected 0x{expected:02x}, found 0x{found:02x}"
                )));
            }
            Ok(value)
        }),
    )
}

/// Configuration for [`pad_filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadConfig {
    /// Total encoded width of the padded field in bytes.
    pub width: usize,
    /// Fill byte written after the chain's output.
    pub fill: u8,
}

impl Default for PadConfig {
    fn default() -> Self {
        PadConfig { width: 0, fill: 0 }
    }
}

/// Pads the chain's encoding with fill bytes up to a fixed width; fails if
/// the chain wrote more than `width` bytes. Decode hands the chain a bounded
/// sub-view of exactly `width` bytes and requires the unconsumed tail to be
/// fill bytes.
pub fn pad_filter<T: 'static>(width: usize) -> ConfigurableFilterDefinition<T, PadConfig> {
    let definition = ConfigurableFilterDefinition::from_parts(
        ConfigResolver::of_default(),
        Arc::new(
            |value: &T, cursor: &mut WriteCursor, config: &PadConfig, chain: &dyn Codec<T>| {
                let start = cursor.position();
                chain.encode(value, cursor)?;
                let written = cursor.position() - start;
                if written > config.width {
                    return Err(CodecError::Invalid(format!(
                        "padded field wrote {written} byte(s), width is {}",
                        config.width
                    )));
                }
                for _ in written..config.width {
                    cursor.write_u8(config.fill)?;
                }
                Ok(())
            },
        ),
        Arc::new(
            |cursor: &mut ReadCursor<'_>, config: &PadConfig, chain: &dyn Codec<T>| {
                let mut view = cursor.take(config.width)?;
                let value = chain.decode(&mut view)?;
                while !view.is_empty() {
                    let byte = view.read_u8()?;
                    if byte != config.fill {
                        return Err(CodecError::Invalid(format!(
                            "unexpected padding byte 0x{byte:02x}, fill is 0x{:02x}",
                            config.fill
                        )));
                    }
                }
                Ok(value)
            },
        ),
    );
    definition.with_overrides(move |config| config.width = width)
}

/// Logs byte extents around the chain with `tracing` at debug level.
pub fn trace_filter<T: 'static>(label: impl Into<String>) -> SimpleFilterDefinition<T> {
    let label = label.into();
    let enc_label = label.clone();
    SimpleFilterDefinition::from_parts(
        Arc::new(
            move |value: &T, cursor: &mut WriteCursor, chain: &dyn Codec<T>| {
                let start = cursor.position();
                chain.encode(value, cursor)?;
                tracing::debug!(
                    label = %enc_label,
                    start,
                    len = cursor.position() - start,
                    "encoded"
                );
                Ok(())
            },
        ),
        Arc::new(move |cursor: &mut ReadCursor<'_>, chain: &dyn Codec<T>| {
            let start = cursor.position();
            let value = chain.decode(cursor)?;
            tracing::debug!(
                label = %label,
                start,
                len = cursor.position() - start,
                "decoded"
            );
            Ok(value)
        }),
    )
}
