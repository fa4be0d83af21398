//! Codec, filter, and configuration definition tests: declaration-time
//! validation, configuration resolution/override semantics, and filter
//! wrapping order.

use std::sync::Arc;

use byteorder::{ReadBytesExt, WriteBytesExt};
use segcodec::primitive::{
    bool_codec, bytes_codec, u16_codec, u32_codec, u8_codec, Endianness,
};
use segcodec::{
    CodecBuilder, CodecDefinition, CodecError, ConfigurableCodecBuilder, DefinitionError,
    FilterBuilder, FilterDefinition, Factory, ReadCursor, WriteCursor,
};

// ==================== Declaration-time validation ====================

#[test]
fn codec_definition_requires_both_halves() {
    let err = CodecBuilder::<u8>::new().build().expect_err("no halves");
    let msg = err.to_string();
    assert!(msg.contains("encode"), "reports missing encode: {msg}");
    assert!(msg.contains("decode"), "reports missing decode: {msg}");

    let err = CodecBuilder::<u8>::new()
        .encodes_with(|v, w| Ok(w.write_u8(*v)?))
        .build()
        .expect_err("decode half missing");
    assert!(matches!(err, DefinitionError::MissingHalf { half: "decode", .. }));
}

#[test]
fn declaring_a_half_twice_is_rejected() {
    let err = CodecBuilder::<u8>::new()
        .encodes_with(|v, w| Ok(w.write_u8(*v)?))
        .encodes_with(|v, w| Ok(w.write_u8(*v)?))
        .decodes_with(|r| Ok(r.read_u8()?))
        .build()
        .expect_err("duplicate encode");
    assert!(matches!(err, DefinitionError::DuplicateHalf { half: "encode", .. }));
}

#[test]
fn simultaneous_problems_are_reported_together() {
    let err = CodecBuilder::<u8>::new()
        .encodes_with(|v, w| Ok(w.write_u8(*v)?))
        .encodes_with(|v, w| Ok(w.write_u8(*v)?))
        .build()
        .expect_err("duplicate encode and missing decode");
    match err {
        DefinitionError::Multiple(problems) => assert_eq!(problems.len(), 2),
        other => panic!("expected combined report, got {other}"),
    }
}

#[test]
fn filter_definition_requires_both_halves() {
    let err = FilterBuilder::<u8>::new().build().expect_err("no halves");
    assert!(matches!(err, DefinitionError::Multiple(_)));

    let err = FilterBuilder::<u8>::new()
        .decodes_with(|r, chain| chain.decode(r))
        .build()
        .expect_err("encode half missing");
    assert!(matches!(err, DefinitionError::MissingHalf { half: "encode", .. }));
}

#[test]
fn config_type_that_cannot_be_constructed_fails_at_declaration() {
    struct Strict;
    let factory: Factory<Strict> = Arc::new(|| Err("no default for Strict".to_string()));
    let err = ConfigurableCodecBuilder::<u8, Strict>::new(factory).expect_err("eager failure");
    let msg = err.to_string();
    assert!(msg.contains("Strict"), "names the type: {msg}");
    assert!(msg.contains("no default"), "carries the reason: {msg}");
}

// ==================== Codec behavior ====================

#[test]
fn codec_delegates_to_its_halves() {
    let def = CodecBuilder::<u8>::new()
        .encodes_with(|v, w| Ok(w.write_u8(*v ^ 0xff)?))
        .decodes_with(|r| Ok(r.read_u8()? ^ 0xff))
        .build()
        .expect("build definition");
    let codec = def.build_codec().expect("build codec");

    let mut w = WriteCursor::new();
    codec.encode(&0x12, &mut w).expect("encode");
    assert_eq!(w.as_bytes(), [0xed]);

    let mut r = ReadCursor::new(w.as_bytes());
    assert_eq!(codec.decode(&mut r).expect("decode"), 0x12);
    assert!(r.is_empty());
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LengthConfig {
    length: usize,
}

impl Default for LengthConfig {
    fn default() -> Self {
        LengthConfig { length: 4 }
    }
}

fn fixed_block() -> segcodec::ConfigurableCodecDefinition<Vec<u8>, LengthConfig> {
    ConfigurableCodecBuilder::<Vec<u8>, LengthConfig>::new(Arc::new(|| Ok(LengthConfig::default())))
        .expect("declare")
        .encodes_with(|v: &Vec<u8>, w, c| {
            if v.len() != c.length {
                return Err(CodecError::Invalid(format!(
                    "expected {} byte(s), got {}",
                    c.length,
                    v.len()
                )));
            }
            use std::io::Write;
            w.write_all(v)?;
            Ok(())
        })
        .decodes_with(|r, c| {
            use std::io::Read;
            let mut buf = vec![0u8; c.length];
            r.read_exact(&mut buf)?;
            Ok(buf)
        })
        .build()
        .expect("build definition")
}

#[test]
fn configurable_codec_uses_class_defaults_without_a_spec() {
    let codec = fixed_block().build_codec().expect("build");
    let mut w = WriteCursor::new();
    codec.encode(&vec![1, 2, 3, 4], &mut w).expect("encode");
    assert_eq!(w.position(), 4);
    assert!(codec.encode(&vec![1, 2], &mut WriteCursor::new()).is_err());
}

#[test]
fn overrides_apply_on_top_of_declared_spec_in_order() {
    let def = fixed_block();
    let derived = def.with_overrides(|c| c.length = 2).with_overrides(|c| c.length += 1);
    let codec = derived.build_codec().expect("build");
    let mut w = WriteCursor::new();
    codec.encode(&vec![9, 9, 9], &mut w).expect("three bytes");
}

#[test]
fn with_overrides_returns_a_sibling_and_never_mutates_the_original() {
    let original = fixed_block();
    let original_codec = original.build_codec().expect("build original");

    let derived = original.with_overrides(|c| c.length = 2);
    let derived_codec = derived.build_codec().expect("build derived");

    // The original definition, and codecs already built from it, still see 4.
    let mut w = WriteCursor::new();
    original_codec.encode(&vec![1, 2, 3, 4], &mut w).expect("original codec");
    let rebuilt = original.build_codec().expect("rebuild original");
    rebuilt
        .encode(&vec![1, 2, 3, 4], &mut WriteCursor::new())
        .expect("original definition unchanged");

    derived_codec
        .encode(&vec![7, 7], &mut WriteCursor::new())
        .expect("derived codec sees 2");
}

#[test]
fn each_build_resolves_a_fresh_configuration() {
    // Two codecs from the same definition must not share a live config
    // instance; resolution runs per build, so both observe identical values
    // resolved independently.
    let def = fixed_block().with_overrides(|c| c.length = 3);
    let a = def.build_codec().expect("build a");
    let b = def.build_codec().expect("build b");
    for codec in [a, b] {
        codec
            .encode(&vec![0, 1, 2], &mut WriteCursor::new())
            .expect("both resolved to 3");
    }
}

// ==================== Filter behavior ====================

/// Appends a one-byte marker after the wrapped codec runs; strips and checks
/// it on decode.
fn marker_filter(marker: u8) -> segcodec::SimpleFilterDefinition<u8> {
    FilterBuilder::<u8>::new()
        .encodes_with(move |v, w, chain| {
            chain.encode(v, w)?;
            Ok(w.write_u8(marker)?)
        })
        .decodes_with(move |r, chain| {
            let value = chain.decode(r)?;
            let found = r.read_u8()?;
            if found != marker {
                return Err(CodecError::Invalid(format!(
                    "expected marker 0x{marker:02x}, found 0x{found:02x}"
                )));
            }
            Ok(value)
        })
        .build()
        .expect("build filter")
}

#[test]
fn last_declared_filter_runs_outermost() {
    // Filters [f1, f2] over base c0: output must be [c0-bytes][f1][f2].
    let base = u8_codec().build_codec().expect("base");
    let f1 = marker_filter(0xaa);
    let f2 = marker_filter(0xbb);
    let chain = f2.wrap(f1.wrap(base).expect("wrap f1")).expect("wrap f2");

    let mut w = WriteCursor::new();
    chain.encode(&0x05, &mut w).expect("encode");
    assert_eq!(w.as_bytes(), [0x05, 0xaa, 0xbb]);

    let mut r = ReadCursor::new(w.as_bytes());
    assert_eq!(chain.decode(&mut r).expect("decode"), 0x05);
    assert!(r.is_empty());
}

#[test]
fn filtering_produces_a_new_codec_and_leaves_the_chain_usable() {
    let base = u8_codec().build_codec().expect("base");
    let wrapped = marker_filter(0x42).wrap(Arc::clone(&base)).expect("wrap");

    let mut w = WriteCursor::new();
    base.encode(&0x01, &mut w).expect("unfiltered");
    assert_eq!(w.position(), 1);

    let mut w = WriteCursor::new();
    wrapped.encode(&0x01, &mut w).expect("filtered");
    assert_eq!(w.position(), 2);
}

#[test]
fn a_filter_may_skip_its_chain_entirely() {
    // Constant filter: never calls the chain, owns the bytes itself.
    let constant = FilterBuilder::<u8>::new()
        .encodes_with(|_, w, _| Ok(w.write_u8(0x00)?))
        .decodes_with(|r, _| {
            let _ = r.read_u8()?;
            Ok(0x7f)
        })
        .build()
        .expect("build filter");
    let codec = constant
        .wrap(u8_codec().build_codec().expect("base"))
        .expect("wrap");

    let mut w = WriteCursor::new();
    codec.encode(&0x55, &mut w).expect("encode");
    assert_eq!(w.as_bytes(), [0x00]);
    let mut r = ReadCursor::new(w.as_bytes());
    assert_eq!(codec.decode(&mut r).expect("decode"), 0x7f);
}

// ==================== Primitive codecs ====================

#[test]
fn u16_default_is_big_endian_and_override_flips_it() {
    let big = u16_codec().build_codec().expect("big");
    let mut w = WriteCursor::new();
    big.encode(&0x0102, &mut w).expect("encode");
    assert_eq!(w.as_bytes(), [0x01, 0x02]);

    let little = u16_codec()
        .with_overrides(|c| c.endianness = Endianness::Little)
        .build_codec()
        .expect("little");
    let mut w = WriteCursor::new();
    little.encode(&0x0102, &mut w).expect("encode");
    assert_eq!(w.as_bytes(), [0x02, 0x01]);
}

#[test]
fn u32_roundtrips_both_endiannesses() {
    for def in [
        u32_codec(),
        u32_codec().with_overrides(|c| c.endianness = Endianness::Little),
    ] {
        let codec = def.build_codec().expect("build");
        let mut w = WriteCursor::new();
        codec.encode(&0xdead_beef, &mut w).expect("encode");
        assert_eq!(w.position(), 4);
        let mut r = ReadCursor::new(w.as_bytes());
        assert_eq!(codec.decode(&mut r).expect("decode"), 0xdead_beef);
        assert!(r.is_empty());
    }
}

#[test]
fn bool_is_strict_on_decode() {
    let codec = bool_codec().build_codec().expect("build");
    let mut r = ReadCursor::new(&[0x01]);
    assert!(codec.decode(&mut r).expect("one is true"));
    let mut r = ReadCursor::new(&[0x02]);
    assert!(codec.decode(&mut r).is_err());
}

#[test]
fn bytes_codec_enforces_its_length() {
    let codec = bytes_codec(3).build_codec().expect("build");
    let mut w = WriteCursor::new();
    codec.encode(&vec![1, 2, 3], &mut w).expect("encode");
    assert_eq!(w.as_bytes(), [1, 2, 3]);
    assert!(codec.encode(&vec![1], &mut WriteCursor::new()).is_err());

    let mut r = ReadCursor::new(&[9, 8, 7]);
    assert_eq!(codec.decode(&mut r).expect("decode"), vec![9, 8, 7]);
}

#[test]
fn decoding_a_truncated_buffer_is_an_io_error() {
    let codec = u32_codec().build_codec().expect("build");
    let mut r = ReadCursor::new(&[0x01, 0x02]);
    let err = codec.decode(&mut r).expect_err("short buffer");
    assert!(matches!(err, CodecError::Io(_)));
}
