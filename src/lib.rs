//! # segcodec — declarative binary codecs and segments
//!
//! A framework for building binary **codecs** (paired encode/decode routines
//! over a byte cursor) and **segments**: record types whose ordered, named
//! fields each bind to their own codec and serialize as a fixed sequence of
//! binary records, the shape of fixed-layout wire formats (headers, telemetry
//! and financial messages).
//!
//! ## Pieces
//!
//! - **Codec**: the atomic encode/decode contract for one value type
//! - **Filter**: a decorator wrapping a codec with cross-cutting behavior
//!   (checksums, padding, logging) while delegating to the wrapped chain
//! - **Configuration resolution**: defaults + declared spec + overrides
//!   applied in order, resolved fresh per codec build
//! - **Field codec cache**: a field's codec is built once per cache and
//!   shared by every instance, safely under concurrent first use
//! - **Segment engine**: ordered field encode/decode with definition-time
//!   validation, strict buffer consumption, and field-scoped errors
//!
//! ## Example
//!
//! ```
//! use segcodec::{factory_of, FieldCodecCache, Property, SegmentBuilder};
//! use segcodec::primitive::{u16_codec, u8_codec};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Header {
//!     version: Property<u8>,
//!     length: Property<u16>,
//! }
//!
//! let cache = Arc::new(FieldCodecCache::new());
//! let header = SegmentBuilder::new(factory_of::<Header>())
//!     .field("version", |h: &Header| &h.version, |h: &mut Header| &mut h.version, u8_codec())
//!     .field("length", |h: &Header| &h.length, |h: &mut Header| &mut h.length, u16_codec())
//!     .build(cache)?;
//!
//! let mut msg = Header::default();
//! msg.version.set(1);
//! msg.length.set(300);
//! assert_eq!(header.encode(&msg)?, vec![0x01, 0x01, 0x2c]);
//!
//! let decoded = header.decode(&[0x01, 0x01, 0x2c])?;
//! assert_eq!(decoded.length.get(), Some(&300));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cache;
pub mod codec;
pub mod config;
pub mod cursor;
pub mod error;
pub mod filter;
pub mod primitive;
pub mod segment;

pub use cache::{FieldCodecCache, PropertyKey};
pub use codec::{
    prebuilt, ArcCodec, Codec, CodecBuilder, CodecDefinition, ConfigurableCodecBuilder,
    ConfigurableCodecDefinition, PrebuiltCodec, SimpleCodecDefinition,
};
pub use config::{factory_of, ConfigResolver, ConfigSpec, Factory};
pub use cursor::{ReadCursor, WriteCursor};
pub use error::{CodecError, DefinitionError};
pub use filter::{
    apply_filters, checksum_filter, pad_filter, trace_filter, ConfigurableFilterBuilder,
    ConfigurableFilterDefinition, FilterBuilder, FilterDefinition, PadConfig,
    SimpleFilterDefinition,
};
pub use segment::{
    Property, PropertyMut, PropertyRef, SegmentBuilder, SegmentCodecDefinition, SegmentDef,
};
