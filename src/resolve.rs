use crate::context::AmbientContext;
use crate::error::CompileError;
use crate::model::{Classification, TypeCatalog};
use crate::path::{Head, Path};
use crate::span::Span;

/// One level of the static context stack the resolver walks while visiting
/// the AST: the program's model type at the bottom, one frame pushed per
/// enclosing section.
#[derive(Debug, Clone)]
pub struct ContextFrame {
    pub classification: Classification,
    /// Set for a frame pushed by a section over a `list<T>`/`array<T>`,
    /// enabling `-index`/`-first`/`-last` lookups against it.
    pub is_loop: bool,
}

impl ContextFrame {
    pub fn root(classification: Classification) -> Self {
        ContextFrame {
            classification,
            is_loop: false,
        }
    }

    pub fn loop_element(classification: Classification) -> Self {
        ContextFrame {
            classification,
            is_loop: true,
        }
    }
}

/// Where a resolved expression reads its value from at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// `depth` frames up from the innermost context frame.
    Stack(usize),
    /// The ambient per-render context, never on the model stack.
    Ambient,
    /// An `@context.key` access naming a key with no statically-declared
    /// shape. The per-request context is populated dynamically, so this
    /// compiles rather than failing; it always renders as the empty string.
    AmbientMissing,
}

#[derive(Debug, Clone)]
pub struct ResolvedExpr {
    pub origin: Origin,
    pub classification: Classification,
}

/// Resolves `path` against the current context stack, the model catalog and
/// the ambient context. The head segment is searched top-down across
/// `stack` (innermost frame first); once found, every remaining dotted
/// segment is resolved strictly against the type it lands on — there is no
/// falling back to the stack partway through a dotted chain.
pub fn resolve(
    path: &Path,
    stack: &[ContextFrame],
    catalog: &TypeCatalog,
    ambient: &AmbientContext,
    span: &Span,
) -> Result<ResolvedExpr, CompileError> {
    let (mut classification, origin) = match path.head() {
        Head::Current => {
            let top = stack.last().ok_or_else(|| CompileError::UnknownName {
                path: path.clone(),
                span: span.clone(),
            })?;
            (top.classification.clone(), Origin::Stack(0))
        }
        Head::Context => {
            let name = path.tail().first().ok_or_else(|| CompileError::UnknownName {
                path: path.clone(),
                span: span.clone(),
            })?;
            return match ambient.member(name) {
                Some(classification) => {
                    walk_tail(classification.clone(), &path.tail()[1..], catalog, path, span, Origin::Ambient)
                }
                // The ambient context is populated per request; a key this
                // compiler wasn't told about ahead of time still compiles,
                // it just always renders empty rather than failing here.
                None => Ok(ResolvedExpr {
                    origin: Origin::AmbientMissing,
                    classification: Classification::String,
                }),
            };
        }
        Head::Name(name) if Path::is_loop_pseudo_member(name) => {
            let (depth, _) = stack
                .iter()
                .rev()
                .enumerate()
                .find(|(_, frame)| frame.is_loop)
                .ok_or_else(|| CompileError::UnknownName {
                    path: path.clone(),
                    span: span.clone(),
                })?;
            let classification = if name == "-index" {
                Classification::Number
            } else {
                Classification::Boolean
            };
            return Ok(ResolvedExpr {
                origin: Origin::Stack(depth),
                classification,
            });
        }
        Head::Name(name) => {
            let found = stack.iter().rev().enumerate().find_map(|(depth, frame)| {
                record_name(&frame.classification)
                    .and_then(|type_name| catalog.get(type_name))
                    .and_then(|descriptor| descriptor.member(name))
                    .map(|classification| (depth, classification.clone()))
            });
            let (depth, classification) = found.ok_or_else(|| CompileError::UnknownName {
                path: path.clone(),
                span: span.clone(),
            })?;
            (classification, Origin::Stack(depth))
        }
    };

    for segment in path.tail() {
        classification = step(&classification, segment, catalog, path, span)?;
    }
    Ok(ResolvedExpr { origin, classification })
}

fn walk_tail(
    mut classification: Classification,
    tail: &[String],
    catalog: &TypeCatalog,
    path: &Path,
    span: &Span,
    origin: Origin,
) -> Result<ResolvedExpr, CompileError> {
    for segment in tail {
        classification = step(&classification, segment, catalog, path, span)?;
    }
    Ok(ResolvedExpr { origin, classification })
}

fn step(
    classification: &Classification,
    segment: &str,
    catalog: &TypeCatalog,
    path: &Path,
    span: &Span,
) -> Result<Classification, CompileError> {
    let type_name = record_name(classification).ok_or_else(|| CompileError::UnknownName {
        path: path.clone(),
        span: span.clone(),
    })?;
    let descriptor = catalog.get(type_name).ok_or_else(|| CompileError::UnknownName {
        path: path.clone(),
        span: span.clone(),
    })?;
    descriptor
        .member(segment)
        .cloned()
        .ok_or_else(|| CompileError::UnknownName {
            path: path.clone(),
            span: span.clone(),
        })
}

/// Unwraps through `Nullable` so a dotted access on an optional record type
/// reaches the record's members directly.
fn record_name(classification: &Classification) -> Option<&str> {
    match classification {
        Classification::Record(name) => Some(name.as_str()),
        Classification::Nullable(inner) => record_name(inner),
        _ => None,
    }
}
