//! Error taxonomy: definition-time errors vs encode/decode-time errors.
//!
//! Definition errors are raised eagerly, when a codec, filter, or segment is
//! declared; a malformed definition never produces a usable codec. Codec
//! errors are raised while encoding or decoding and carry the qualified name
//! of the field that failed.

/// A problem with how a codec, filter, or segment was declared.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DefinitionError {
    #[error("{what} definition is missing its {half} half")]
    MissingHalf {
        what: &'static str,
        half: &'static str,
    },
    #[error("{what} definition declares its {half} half more than once")]
    DuplicateHalf {
        what: &'static str,
        half: &'static str,
    },
    /// A default-construct factory failed for a configuration or segment type.
    #[error("cannot construct {type_name}: {reason}")]
    Construction {
        type_name: &'static str,
        reason: String,
    },
    #[error("segment {type_name} declares no fields")]
    NoFields { type_name: &'static str },
    /// Registered fields that do not resolve to distinct property slots.
    #[error("segment {type_name} has mis-wired fields: {}", .fields.join(", "))]
    MiswiredFields {
        type_name: &'static str,
        fields: Vec<String>,
    },
    #[error("field codec for [{field}] is cached with a different value type")]
    CacheTypeConflict { field: &'static str },
    /// Several simultaneous definition problems, reported as one.
    #[error("{}", render_all(.0))]
    Multiple(Vec<DefinitionError>),
}

fn render_all(problems: &[DefinitionError]) -> String {
    let rendered: Vec<String> = problems.iter().map(|p| p.to_string()).collect();
    format!(
        "{} definition problem(s): {}",
        rendered.len(),
        rendered.join("; ")
    )
}

impl DefinitionError {
    /// Collapse a non-empty list of problems into one error.
    pub(crate) fn aggregate(mut problems: Vec<DefinitionError>) -> DefinitionError {
        if problems.len() == 1 {
            if let Some(single) = problems.pop() {
                return single;
            }
        }
        DefinitionError::Multiple(problems)
    }
}

/// A failure while encoding or decoding.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    /// Encoding a field whose value was never set (never a silent skip).
    #[error("encoding absent value for [{field}]")]
    AbsentField { field: String },
    /// Segment decode is defined to consume its buffer exactly to the end.
    #[error("{remaining} trailing byte(s) after decoding {segment}")]
    TrailingData {
        segment: &'static str,
        remaining: usize,
    },
    #[error("{0}")]
    Invalid(String),
    /// A leaf codec failure rewrapped with the owning field's qualified name.
    #[error("error in [{field}]: {source}")]
    Field {
        field: String,
        #[source]
        source: Box<CodecError>,
    },
    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

/// Last path segment of a type name, e.g. `my_app::proto::Header` -> `Header`.
pub(crate) fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
