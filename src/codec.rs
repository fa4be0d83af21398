//! Codec contracts and definitions.
//!
//! A [`Codec`] is the paired encode/decode capability for one value type over
//! a byte cursor. A [`CodecDefinition`] builds codecs; a
//! [`ConfigurableCodecDefinition`] additionally resolves a fresh configuration
//! per build (see [`crate::config`]).

use std::sync::Arc;

use crate::config::{ConfigResolver, Factory};
use crate::cursor::{ReadCursor, WriteCursor};
use crate::error::{CodecError, DefinitionError};

/// Paired encode/decode contract for one value type.
///
/// Codecs are stateless once built and safely shared across threads; each
/// call carries its own cursor and value.
pub trait Codec<T>: Send + Sync {
    /// Write `value`, leaving the cursor positioned exactly past the written
    /// bytes.
    fn encode(&self, value: &T, cursor: &mut WriteCursor) -> Result<(), CodecError>;

    /// Read one value, consuming exactly the bytes it owns and leaving the
    /// cursor at the first unread byte.
    fn decode(&self, cursor: &mut ReadCursor<'_>) -> Result<T, CodecError>;
}

/// Shared handle to a built codec.
pub type ArcCodec<T> = Arc<dyn Codec<T>>;

impl<T> std::fmt::Debug for dyn Codec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<codec>")
    }
}

pub type EncodeFn<T> =
    Arc<dyn Fn(&T, &mut WriteCursor) -> Result<(), CodecError> + Send + Sync>;
pub type DecodeFn<T> =
    Arc<dyn Fn(&mut ReadCursor<'_>) -> Result<T, CodecError> + Send + Sync>;
pub type EncodeWithConfigFn<T, C> =
    Arc<dyn Fn(&T, &mut WriteCursor, &C) -> Result<(), CodecError> + Send + Sync>;
pub type DecodeWithConfigFn<T, C> =
    Arc<dyn Fn(&mut ReadCursor<'_>, &C) -> Result<T, CodecError> + Send + Sync>;

/// Codec backed by an encode closure and a decode closure.
pub(crate) struct FnCodec<T> {
    pub(crate) enc: EncodeFn<T>,
    pub(crate) dec: DecodeFn<T>,
}

impl<T> Codec<T> for FnCodec<T> {
    fn encode(&self, value: &T, cursor: &mut WriteCursor) -> Result<(), CodecError> {
        (self.enc)(value, cursor)
    }

    fn decode(&self, cursor: &mut ReadCursor<'_>) -> Result<T, CodecError> {
        (self.dec)(cursor)
    }
}

/// Builds a codec. Building may fail with a definition error, never a codec
/// error.
pub trait CodecDefinition<T>: Send + Sync {
    fn build_codec(&self) -> Result<ArcCodec<T>, DefinitionError>;
}

impl<T, D: CodecDefinition<T> + ?Sized> CodecDefinition<T> for Arc<D> {
    fn build_codec(&self) -> Result<ArcCodec<T>, DefinitionError> {
        (**self).build_codec()
    }
}

/// Definition that hands out an already-built codec, for callers that hold a
/// codec rather than a definition (e.g. one produced by wrapping filters by
/// hand).
pub struct PrebuiltCodec<T> {
    codec: ArcCodec<T>,
}

impl<T> Clone for PrebuiltCodec<T> {
    fn clone(&self) -> Self {
        PrebuiltCodec {
            codec: Arc::clone(&self.codec),
        }
    }
}

/// Adapts a built codec into a [`CodecDefinition`].
pub fn prebuilt<T>(codec: ArcCodec<T>) -> PrebuiltCodec<T> {
    PrebuiltCodec { codec }
}

impl<T: 'static> CodecDefinition<T> for PrebuiltCodec<T> {
    fn build_codec(&self) -> Result<ArcCodec<T>, DefinitionError> {
        Ok(Arc::clone(&self.codec))
    }
}

/// Both-halves validation shared by codec and filter builders: each half must
/// be declared exactly once, and every problem is collected rather than only
/// the first.
pub(crate) fn check_halves(
    what: &'static str,
    enc: usize,
    dec: usize,
    problems: &mut Vec<DefinitionError>,
) {
    match enc {
        0 => problems.push(DefinitionError::MissingHalf {
            what,
            half: "encode",
        }),
        1 => {}
        _ => problems.push(DefinitionError::DuplicateHalf {
            what,
            half: "encode",
        }),
    }
    match dec {
        0 => problems.push(DefinitionError::MissingHalf {
            what,
            half: "decode",
        }),
        1 => {}
        _ => problems.push(DefinitionError::DuplicateHalf {
            what,
            half: "decode",
        }),
    }
}

/// Collects the encode and decode halves of a plain codec definition.
pub struct CodecBuilder<T> {
    enc: Vec<EncodeFn<T>>,
    dec: Vec<DecodeFn<T>>,
}

impl<T: 'static> Default for CodecBuilder<T> {
    fn default() -> Self {
        CodecBuilder::new()
    }
}

impl<T: 'static> CodecBuilder<T> {
    pub fn new() -> Self {
        CodecBuilder {
            enc: Vec::new(),
            dec: Vec::new(),
        }
    }

    pub fn encodes_with(
        mut self,
        enc: impl Fn(&T, &mut WriteCursor) -> Result<(), CodecError> + Send + Sync + 'static,
    ) -> Self {
        self.enc.push(Arc::new(enc));
        self
    }

    pub fn decodes_with(
        mut self,
        dec: impl Fn(&mut ReadCursor<'_>) -> Result<T, CodecError> + Send + Sync + 'static,
    ) -> Self {
        self.dec.push(Arc::new(dec));
        self
    }

    /// Validates the declaration: both halves present, neither declared
    /// twice. Problems are reported in one combined error.
    pub fn build(self) -> Result<SimpleCodecDefinition<T>, DefinitionError> {
        let mut problems = Vec::new();
        check_halves("codec", self.enc.len(), self.dec.len(), &mut problems);
        if !problems.is_empty() {
            return Err(DefinitionError::aggregate(problems));
        }
        match (self.enc.into_iter().next(), self.dec.into_iter().next()) {
            (Some(enc), Some(dec)) => Ok(SimpleCodecDefinition { enc, dec }),
            _ => Err(DefinitionError::MissingHalf {
                what: "codec",
                half: "encode",
            }),
        }
    }
}

/// Definition built from plain encode/decode closures. Each
/// [`CodecDefinition::build_codec`] call produces a fresh codec instance.
pub struct SimpleCodecDefinition<T> {
    enc: EncodeFn<T>,
    dec: DecodeFn<T>,
}

impl<T> Clone for SimpleCodecDefinition<T> {
    fn clone(&self) -> Self {
        SimpleCodecDefinition {
            enc: Arc::clone(&self.enc),
            dec: Arc::clone(&self.dec),
        }
    }
}

impl<T> std::fmt::Debug for SimpleCodecDefinition<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleCodecDefinition").finish_non_exhaustive()
    }
}

impl<T: 'static> CodecDefinition<T> for SimpleCodecDefinition<T> {
    fn build_codec(&self) -> Result<ArcCodec<T>, DefinitionError> {
        Ok(Arc::new(FnCodec {
            enc: Arc::clone(&self.enc),
            dec: Arc::clone(&self.dec),
        }))
    }
}

/// Collects the halves of a codec definition parameterized by a configuration
/// type `C`.
pub struct ConfigurableCodecBuilder<T, C> {
    resolver: ConfigResolver<C>,
    enc: Vec<EncodeWithConfigFn<T, C>>,
    dec: Vec<DecodeWithConfigFn<T, C>>,
}

impl<T, C> std::fmt::Debug for ConfigurableCodecBuilder<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurableCodecBuilder").finish_non_exhaustive()
    }
}

impl<T: 'static, C: Send + Sync + 'static> ConfigurableCodecBuilder<T, C> {
    /// Probes `factory` once: a configuration type that cannot be
    /// default-constructed fails here, at declaration time.
    pub fn new(factory: Factory<C>) -> Result<Self, DefinitionError> {
        Ok(ConfigurableCodecBuilder {
            resolver: ConfigResolver::new(factory)?,
            enc: Vec::new(),
            dec: Vec::new(),
        })
    }

    /// Declares a spec applied to the defaults before any later overrides.
    pub fn with_spec(mut self, spec: impl Fn(&mut C) + Send + Sync + 'static) -> Self {
        self.resolver = self.resolver.with_spec(Arc::new(spec));
        self
    }

    pub fn encodes_with(
        mut self,
        enc: impl Fn(&T, &mut WriteCursor, &C) -> Result<(), CodecError> + Send + Sync + 'static,
    ) -> Self {
        self.enc.push(Arc::new(enc));
        self
    }

    pub fn decodes_with(
        mut self,
        dec: impl Fn(&mut ReadCursor<'_>, &C) -> Result<T, CodecError> + Send + Sync + 'static,
    ) -> Self {
        self.dec.push(Arc::new(dec));
        self
    }

    pub fn build(self) -> Result<ConfigurableCodecDefinition<T, C>, DefinitionError> {
        let mut problems = Vec::new();
        check_halves("codec", self.enc.len(), self.dec.len(), &mut problems);
        if !problems.is_empty() {
            return Err(DefinitionError::aggregate(problems));
        }
        match (self.enc.into_iter().next(), self.dec.into_iter().next()) {
            (Some(enc), Some(dec)) => Ok(ConfigurableCodecDefinition {
                resolver: self.resolver,
                enc,
                dec,
            }),
            _ => Err(DefinitionError::MissingHalf {
                what: "codec",
                half: "encode",
            }),
        }
    }
}

/// A codec definition parameterized by a configuration type `C`.
///
/// Definitions are immutable values: [`Self::with_overrides`] returns a
/// sibling and leaves the original, and any codec already built from it,
/// untouched.
pub struct ConfigurableCodecDefinition<T, C> {
    resolver: ConfigResolver<C>,
    enc: EncodeWithConfigFn<T, C>,
    dec: DecodeWithConfigFn<T, C>,
}

impl<T, C> Clone for ConfigurableCodecDefinition<T, C> {
    fn clone(&self) -> Self {
        ConfigurableCodecDefinition {
            resolver: self.resolver.clone(),
            enc: Arc::clone(&self.enc),
            dec: Arc::clone(&self.dec),
        }
    }
}

impl<T: 'static, C: Send + Sync + 'static> ConfigurableCodecDefinition<T, C> {
    pub(crate) fn from_parts(
        resolver: ConfigResolver<C>,
        enc: EncodeWithConfigFn<T, C>,
        dec: DecodeWithConfigFn<T, C>,
    ) -> Self {
        ConfigurableCodecDefinition { resolver, enc, dec }
    }

    /// Appends an override spec, returning a new definition.
    pub fn with_overrides(&self, spec: impl Fn(&mut C) + Send + Sync + 'static) -> Self {
        ConfigurableCodecDefinition {
            resolver: self.resolver.with_spec(Arc::new(spec)),
            enc: Arc::clone(&self.enc),
            dec: Arc::clone(&self.dec),
        }
    }
}

impl<T: 'static, C: Send + Sync + 'static> CodecDefinition<T>
    for ConfigurableCodecDefinition<T, C>
{
    /// Resolves a fresh configuration per build: two codecs built from the
    /// same (or a derived) definition never share a config instance. The
    /// encode and decode halves of one codec observe the same instance.
    fn build_codec(&self) -> Result<ArcCodec<T>, DefinitionError> {
        let config = Arc::new(self.resolver.resolve()?);
        let enc = Arc::clone(&self.enc);
        let dec = Arc::clone(&self.dec);
        let enc_config = Arc::clone(&config);
        Ok(Arc::new(FnCodec {
            enc: Arc::new(move |value: &T, cursor: &mut WriteCursor| {
                enc(value, cursor, &enc_config)
            }),
            dec: Arc::new(move |cursor: &mut ReadCursor<'_>| dec(cursor, &config)),
        }))
    }
}
