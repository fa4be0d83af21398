//! Leaf codecs for wire primitives.
//!
//! Integer and float codecs take a [`NumConfig`] carrying the endianness
//! (big-endian by default, the usual network order); override it per field
//! with [`crate::ConfigurableCodecDefinition::with_overrides`]. `bool` is one
//! strict byte (0 or 1). [`bytes_codec`] reads/writes a fixed-length run of
//! raw bytes.

use std::io::{Read, Write};
use std::sync::Arc;

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::codec::ConfigurableCodecDefinition;
use crate::config::ConfigResolver;
use crate::cursor::{ReadCursor, WriteCursor};
use crate::error::CodecError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Big,
    Little,
}

/// Configuration shared by the numeric codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumConfig {
    pub endianness: Endianness,
}

impl Default for NumConfig {
    fn default() -> Self {
        NumConfig {
            endianness: Endianness::Big,
        }
    }
}

pub fn u8_codec() -> ConfigurableCodecDefinition<u8, NumConfig> {
    ConfigurableCodecDefinition::from_parts(
        ConfigResolver::of_default(),
        Arc::new(|v: &u8, w: &mut WriteCursor, _: &NumConfig| Ok(w.write_u8(*v)?)),
        Arc::new(|r: &mut ReadCursor<'_>, _: &NumConfig| Ok(r.read_u8()?)),
    )
}

pub fn u16_codec() -> ConfigurableCodecDefinition<u16, NumConfig> {
    ConfigurableCodecDefinition::from_parts(
        ConfigResolver::of_default(),
        Arc::new(
            |v: &u16, w: &mut WriteCursor, c: &NumConfig| match c.endianness {
                Endianness::Big => Ok(w.write_u16::<BigEndian>(*v)?),
                Endianness::Little => Ok(w.write_u16::<LittleEndian>(*v)?),
            },
        ),
        Arc::new(|r: &mut ReadCursor<'_>, c: &NumConfig| match c.endianness {
            Endianness::Big => Ok(r.read_u16::<BigEndian>()?),
            Endianness::Little => Ok(r.read_u16::<LittleEndian>()?),
        }),
    )
}

pub fn u32_codec() -> ConfigurableCodecDefinition<u32, NumConfig> {
    ConfigurableCodecDefinition::from_parts(
        ConfigResolver::of_default(),
        Arc::new(
            |v: &u32, w: &mut WriteCursor, c: &NumConfig| match c.endianness {
                Endianness::Big => Ok(w.write_u32::<BigEndian>(*v)?),
                Endianness::Little => Ok(w.write_u32::<LittleEndian>(*v)?),
            },
        ),
        Arc::new(|r: &mut ReadCursor<'_>, c: &NumConfig| match c.endianness {
            Endianness::Big => Ok(r.read_u32::<BigEndian>()?),
            Endianness::Little => Ok(r.read_u32::<LittleEndian>()?),
        }),
    )
}

pub fn u64_codec() -> ConfigurableCodecDefinition<u64, NumConfig> {
    ConfigurableCodecDefinition::from_parts(
        ConfigResolver::of_default(),
        Arc::new(
            |v: &u64, w: &mut WriteCursor, c: &NumConfig| match c.endianness {
                Endianness::Big => Ok(w.write_u64::<BigEndian>(*v)?),
                Endianness::Little => Ok(w.write_u64::<LittleEndian>(*v)?),
            },
        ),
        Arc::new(|r: &mut ReadCursor<'_>, c: &NumConfig| match c.endianness {
            Endianness::Big => Ok(r.read_u64::<BigEndian>()?),
            Endianness::Little => Ok(r.read_u64::<LittleEndian>()?),
        }),
    )
}

pub fn i8_codec() -> ConfigurableCodecDefinition<i8, NumConfig> {
    ConfigurableCodecDefinition::from_parts(
        ConfigResolver::of_default(),
        Arc::new(|v: &i8, w: &mut WriteCursor, _: &NumConfig| Ok(w.write_i8(*v)?)),
        Arc::new(|r: &mut ReadCursor<'_>, _: &NumConfig| Ok(r.read_i8()?)),
    )
}

pub fn i16_codec() -> ConfigurableCodecDefinition<i16, NumConfig> {
    ConfigurableCodecDefinition::from_parts(
        ConfigResolver::of_default(),
        Arc::new(
            |v: &i16, w: &mut WriteCursor, c: &NumConfig| match c.endianness {
                Endianness::Big => Ok(w.write_i16::<BigEndian>(*v)?),
                Endianness::Little => Ok(w.write_i16::<LittleEndian>(*v)?),
            },
        ),
        Arc::new(|r: &mut ReadCursor<'_>, c: &NumConfig| match c.endianness {
            Endianness::Big => Ok(r.read_i16::<BigEndian>()?),
            Endianness::Little => Ok(r.read_i16::<LittleEndian>()?),
        }),
    )
}

pub fn i32_codec() -> ConfigurableCodecDefinition<i32, NumConfig> {
    ConfigurableCodecDefinition::from_parts(
        ConfigResolver::of_default(),
        Arc::new(
            |v: &i32, w: &mut WriteCursor, c: &NumConfig| match c.endianness {
                Endianness::Big => Ok(w.write_i32::<BigEndian>(*v)?),
                Endianness::Little => Ok(w.write_i32::<LittleEndian>(*v)?),
            },
        ),
        Arc::new(|r: &mut ReadCursor<'_>, c: &NumConfig| match c.endianness {
            Endianness::Big => Ok(r.read_i32::<BigEndian>()?),
            Endianness::Little => Ok(r.read_i32::<LittleEndian>()?),
        }),
    )
}

pub fn i64_codec() -> ConfigurableCodecDefinition<i64, NumConfig> {
    ConfigurableCodecDefinition::from_parts(
        ConfigResolver::of_default(),
        Arc::new(
            |v: &i64, w: &mut WriteCursor, c: &NumConfig| match c.endianness {
                Endianness::Big => Ok(w.write_i64::<BigEndian>(*v)?),
                Endianness::Little => Ok(w.write_i64::<LittleEndian>(*v)?),
            },
        ),
        Arc::new(|r: &mut ReadCursor<'_>, c: &NumConfig| match c.endianness {
            Endianness::Big => Ok(r.read_i64::<BigEndian>()?),
            Endianness::Little => Ok(r.read_i64::<LittleEndian>()?),
        }),
    )
}

pub fn f32_codec() -> ConfigurableCodecDefinition<f32, NumConfig> {
    ConfigurableCodecDefinition::from_parts(
        ConfigResolver::of_default(),
        Arc::new(
            |v: &f32, w: &mut WriteCursor, c: &NumConfig| match c.endianness {
                Endianness::Big => Ok(w.write_f32::<BigEndian>(*v)?),
                Endianness::Little => Ok(w.write_f32::<LittleEndian>(*v)?),
            },
        ),
        Arc::new(|r: &mut ReadCursor<'_>, c: &NumConfig| match c.endianness {
            Endianness::Big => Ok(r.read_f32::<BigEndian>()?),
            Endianness::Little => Ok(r.read_f32::<LittleEndian>()?),
        }),
    )
}

pub fn f64_codec() -> ConfigurableCodecDefinition<f64, NumConfig> {
    ConfigurableCodecDefinition::from_parts(
        ConfigResolver::of_default(),
        Arc::new(
            |v: &f64, w: &mut WriteCursor, c: &NumConfig| match c.endianness {
                Endianness::Big => Ok(w.write_f64::<BigEndian>(*v)?),
                Endianness::Little => Ok(w.write_f64::<LittleEndian>(*v)?),
            },
        ),
        Arc::new(|r: &mut ReadCursor<'_>, c: &NumConfig| match c.endianness {
            Endianness::Big => Ok(r.read_f64::<BigEndian>()?),
            Endianness::Little => Ok(r.read_f64::<LittleEndian>()?),
        }),
    )
}

/// One byte, 0 or 1; any other value fails decode.
pub fn bool_codec() -> ConfigurableCodecDefinition<bool, NumConfig> {
    ConfigurableCodecDefinition::from_parts(
        ConfigResolver::of_default(),
        Arc::new(|v: &bool, w: &mut WriteCursor, _: &NumConfig| {
            Ok(w.write_u8(u8::from(*v))?)
        }),
        Arc::new(|r: &mut ReadCursor<'_>, _: &NumConfig| match r.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::Invalid(format!(
                "invalid bool byte 0x{other:02x}"
            ))),
        }),
    )
}

/// Configuration for [`bytes_codec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BytesConfig {
    /// Exact number of bytes read and written.
    pub len: usize,
}

/// Fixed-length run of raw bytes; the encoded value must match the
/// configured length exactly.
pub fn bytes_codec(len: usize) -> ConfigurableCodecDefinition<Vec<u8>, BytesConfig> {
    let definition = ConfigurableCodecDefinition::from_parts(
        ConfigResolver::of_default(),
        Arc::new(|v: &Vec<u8>, w: &mut WriteCursor, c: &BytesConfig| {
            if v.len() != c.len {
                return Err(CodecError::Invalid(format!(
                    "expected {} byte(s), value has {}",
                    c.len,
                    v.len()
                )));
            }
            w.write_all(v)?;
            Ok(())
        }),
        Arc::new(|r: &mut ReadCursor<'_>, c: &BytesConfig| {
            let mut buf = vec![0u8; c.len];
            r.read_exact(&mut buf)?;
            Ok(buf)
        }),
    );
    definition.with_overrides(move |c| c.len = len)
}
