pub mod runtime;

use std::fmt::Write as _;

use crate::ast::{Block, Statement};
use crate::context::AmbientContext;
use crate::error::CompileError;
use crate::model::{Classification, TypeCatalog};
use crate::name::Name;
use crate::path::{Head, Path};
use crate::resolve::{resolve, ContextFrame, Origin, ResolvedExpr};
use crate::span::Span;
use crate::template::Template;

/// The final result of lowering one template's tree into Rust source: the
/// full `pub fn` body, plus the model type and charset it was compiled
/// against.
#[derive(Debug)]
pub struct Program {
    pub model_type: String,
    pub fn_name: String,
    pub charset: String,
    /// Extra trait names a manifest entry asked the generated renderer to
    /// also carry. Codegen emits a single free function regardless, so
    /// these are surfaced rather than acted on; a caller wiring the
    /// generated function into a `Renderer<M>` impl can use them there.
    pub interfaces: Vec<String>,
    source: String,
}

impl Program {
    /// The full `pub fn` source for this template's renderer function.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Per-model codegen configuration threaded from a manifest entry: which
/// escaper a variable interpolation routes through, which formatter null
/// values and the final stringification go through, and which extra trait
/// names the caller asked the renderer to also carry.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub escaper_path: String,
    pub formatter_path: String,
    pub interfaces: Vec<String>,
}

impl RenderConfig {
    /// Picks an escaper from a MIME-style content type and a formatter from
    /// a manifest's `formatter` name (`None` or `:auto` both mean the
    /// default `NullRejectingFormatter`; anything else is taken as a
    /// fully-qualified Rust type path to a caller-supplied `Formatter`).
    pub fn new(content_type: &str, formatter: Option<&str>, interfaces: Vec<String>) -> Self {
        let escaper_path = if content_type.eq_ignore_ascii_case("text/plain") {
            "temple::escape::PlainEscaper"
        } else {
            "temple::escape::HtmlEscaper"
        }
        .to_string();
        let formatter_path = match formatter {
            None | Some("") | Some(":auto") => "temple::format::NullRejectingFormatter".to_string(),
            Some(path) => path.to_string(),
        };
        RenderConfig {
            escaper_path,
            formatter_path,
            interfaces,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig::new("text/html", None, Vec::new())
    }
}

/// One level of the codegen-time context stack: the resolver's own
/// `ContextFrame`, the Rust expression bound to it, and — for a frame
/// pushed by iterating a list/array — the index/length variables backing
/// the `-index`/`-first`/`-last` loop pseudo-members.
struct Frame {
    context: ContextFrame,
    binding: String,
    loop_meta: Option<(String, String)>,
}

/// Lowers a loaded, fully-inlined `Template` into the Rust source of a
/// renderer function. Every path is resolved against the type catalog as
/// the AST is walked, so the generated code never has to ask "what's in
/// this slot" at render time.
pub struct Emitter<'a> {
    catalog: &'a TypeCatalog,
    ambient: &'a AmbientContext,
    config: RenderConfig,
}

impl<'a> Emitter<'a> {
    pub fn new(catalog: &'a TypeCatalog, ambient: &'a AmbientContext) -> Self {
        Emitter {
            catalog,
            ambient,
            config: RenderConfig::default(),
        }
    }

    /// Overrides the default escaper/formatter/interfaces with a manifest
    /// entry's configuration.
    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    /// Compiles `template` against `model_type`, naming the generated
    /// function `fn_name`.
    pub fn emit(&self, template: &Template, model_type: &str, fn_name: &str) -> Result<Program, CompileError> {
        let root = match &template.tree {
            Statement::Program(block) => block,
            other => {
                return Err(CompileError::Internal(format!(
                    "template root must be a Program, found {:?}",
                    other
                )))
            }
        };

        let mut names = Name::new(fn_name);
        let mut frames = vec![Frame {
            context: ContextFrame::root(Classification::Record(model_type.to_string())),
            binding: "model".to_string(),
            loop_meta: None,
        }];

        let mut body = String::new();
        self.emit_block(root, &mut frames, &mut names, &mut body)?;

        let mut source = String::new();
        writeln!(
            source,
            "pub fn {}(model: &{}, out: &mut dyn std::fmt::Write) -> Result<(), temple::error::RenderError> {{",
            fn_name, model_type
        )
        .unwrap();
        source.push_str(&body);
        writeln!(source, "    Ok(())\n}}").unwrap();

        Ok(Program {
            model_type: model_type.to_string(),
            fn_name: fn_name.to_string(),
            charset: template.charset.clone(),
            interfaces: self.config.interfaces.clone(),
            source,
        })
    }

    fn resolve(&self, path: &Path, frames: &[Frame], span: &Span) -> Result<ResolvedExpr, CompileError> {
        let stack: Vec<ContextFrame> = frames.iter().map(|f| f.context.clone()).collect();
        resolve(path, &stack, self.catalog, self.ambient, span)
    }

    fn emit_block(&self, block: &Block, frames: &mut Vec<Frame>, names: &mut Name, out: &mut String) -> Result<(), CompileError> {
        for statement in &block.statements {
            self.emit_statement(statement, frames, names, out)?;
        }
        Ok(())
    }

    fn emit_statement(
        &self,
        statement: &Statement,
        frames: &mut Vec<Frame>,
        names: &mut Name,
        out: &mut String,
    ) -> Result<(), CompileError> {
        match statement {
            Statement::Content(text) => {
                writeln!(out, "    out.write_str({:?})?;", text).unwrap();
            }
            Statement::Comment => {}
            Statement::Variable(path, span) => {
                let resolved = self.resolve(path, frames, span)?;
                require_formattable(path, &resolved.classification, span)?;
                let expr = self.path_expr(path, &resolved, frames);
                let (value_expr, is_null_expr) = format_operands(&expr, &resolved.classification);
                writeln!(
                    out,
                    "    temple::codegen::runtime::format_and_escape({}, {}, &{}, &{}, out)?;",
                    value_expr, is_null_expr, self.config.formatter_path, self.config.escaper_path
                )
                .unwrap();
            }
            Statement::Html(path, span) => {
                let resolved = self.resolve(path, frames, span)?;
                require_formattable(path, &resolved.classification, span)?;
                let expr = self.path_expr(path, &resolved, frames);
                let (value_expr, is_null_expr) = format_operands(&expr, &resolved.classification);
                writeln!(
                    out,
                    "    temple::codegen::runtime::format_raw({}, {}, &{}, out)?;",
                    value_expr, is_null_expr, self.config.formatter_path
                )
                .unwrap();
            }
            Statement::Section(path, block, span) => {
                self.emit_section(path, block, span, frames, names, out)?;
            }
            Statement::Inverted(path, block, span) => {
                self.emit_inverted(path, block, span, frames, names, out)?;
            }
            Statement::Block(_, block, _) => {
                self.emit_block(block, frames, names, out)?;
            }
            Statement::Partial { name, .. } | Statement::Parent { name, .. } => {
                return Err(CompileError::Internal(format!(
                    "partial/parent {:?} was not inlined by the template loader before codegen",
                    name
                )));
            }
            Statement::Program(_) => {
                return Err(CompileError::Internal("nested Program statement".into()));
            }
        }
        Ok(())
    }

    fn emit_section(
        &self,
        path: &Path,
        block: &Block,
        span: &Span,
        frames: &mut Vec<Frame>,
        names: &mut Name,
        out: &mut String,
    ) -> Result<(), CompileError> {
        let resolved = self.resolve(path, frames, span)?;
        let expr = self.path_expr(path, &resolved, frames);
        names.next();
        let suffix = names.to_string();

        match resolved.classification.clone() {
            Classification::List(inner) | Classification::Array(inner) => {
                let item = format!("item_{}", suffix);
                let idx = format!("idx_{}", suffix);
                let len = format!("len_{}", suffix);
                writeln!(out, "    let {} = ({}).len();", len, expr).unwrap();
                writeln!(out, "    for ({}, {}) in ({}).iter().enumerate() {{", idx, item, expr).unwrap();
                frames.push(Frame {
                    context: ContextFrame::loop_element(*inner),
                    binding: item,
                    loop_meta: Some((idx, len)),
                });
                self.emit_block(block, frames, names, out)?;
                frames.pop();
                writeln!(out, "    }}").unwrap();
            }
            Classification::Nullable(inner) => {
                let value = format!("value_{}", suffix);
                writeln!(out, "    if let Some({}) = ({}).as_ref() {{", value, expr).unwrap();
                frames.push(Frame {
                    context: ContextFrame::root(*inner),
                    binding: value,
                    loop_meta: None,
                });
                self.emit_block(block, frames, names, out)?;
                frames.pop();
                writeln!(out, "    }}").unwrap();
            }
            Classification::Boolean => {
                writeln!(out, "    if {} {{", expr).unwrap();
                self.emit_block(block, frames, names, out)?;
                writeln!(out, "    }}").unwrap();
            }
            Classification::Record(_) | Classification::Map => {
                writeln!(out, "    {{").unwrap();
                frames.push(Frame {
                    context: ContextFrame::root(resolved.classification),
                    binding: expr,
                    loop_meta: None,
                });
                self.emit_block(block, frames, names, out)?;
                frames.pop();
                writeln!(out, "    }}").unwrap();
            }
            _ => {
                return Err(CompileError::WrongArity {
                    path: path.clone(),
                    span: span.clone(),
                });
            }
        }
        Ok(())
    }

    fn emit_inverted(
        &self,
        path: &Path,
        block: &Block,
        span: &Span,
        frames: &mut Vec<Frame>,
        names: &mut Name,
        out: &mut String,
    ) -> Result<(), CompileError> {
        let resolved = self.resolve(path, frames, span)?;
        let expr = self.path_expr(path, &resolved, frames);
        let condition = match &resolved.classification {
            Classification::Boolean => format!("!({})", expr),
            Classification::Nullable(_) => format!("({}).is_none()", expr),
            Classification::List(_) | Classification::Array(_) => format!("({}).is_empty()", expr),
            // Records and maps are never Mustache-falsy; an inverted section
            // over one never renders (the empty-map-is-truthy rule extends
            // naturally to any always-present value).
            _ => "false".to_string(),
        };
        writeln!(out, "    if {} {{", condition).unwrap();
        self.emit_block(block, frames, names, out)?;
        writeln!(out, "    }}").unwrap();
        Ok(())
    }

    /// Builds the Rust expression that reads a resolved path's value. A
    /// loop pseudo-member reads the nearest loop frame's index/length
    /// variables directly; everything else is a chain of accessor-method
    /// calls starting from whichever frame binding (or, for `@context`, the
    /// model's `context_*` accessor) the resolver says it lives on.
    fn path_expr(&self, path: &Path, resolved: &ResolvedExpr, frames: &[Frame]) -> String {
        if let Head::Name(name) = path.head() {
            if Path::is_loop_pseudo_member(name) {
                let depth = match resolved.origin {
                    Origin::Stack(depth) => depth,
                    Origin::Ambient | Origin::AmbientMissing => {
                        unreachable!("loop pseudo-members never resolve to the ambient context")
                    }
                };
                let (idx, len) = frames[frames.len() - 1 - depth]
                    .loop_meta
                    .as_ref()
                    .expect("resolver only matches -index/-first/-last against a loop frame");
                return match name {
                    "-index" => idx.clone(),
                    "-first" => format!("({} == 0)", idx),
                    "-last" => format!("({} + 1 == {})", idx, len),
                    _ => unreachable!(),
                };
            }
        }

        match resolved.origin {
            // An ambient key this compiler never heard of statically
            // always renders empty; no accessor call is generated for it.
            Origin::AmbientMissing => "\"\"".to_string(),
            Origin::Ambient => {
                let mut tail = path.tail().iter();
                let mut expr = match tail.next() {
                    Some(member) => format!("model.context_{}()", member),
                    None => "model".to_string(),
                };
                for segment in tail {
                    let _ = write!(expr, ".{}()", segment);
                }
                expr
            }
            Origin::Stack(depth) => {
                let mut expr = frames[frames.len() - 1 - depth].binding.clone();
                if let Head::Name(name) = path.head() {
                    let _ = write!(expr, ".{}()", name);
                }
                for segment in path.tail() {
                    let _ = write!(expr, ".{}()", segment);
                }
                expr
            }
        }
    }
}

/// Whether a resolved path's terminal classification can be interpolated at
/// all: stringish/numeric/boolean values, a lambda's own return, or any of
/// those wrapped in `Nullable`. Containers and records have no sensible
/// string form and are rejected here rather than at render time.
fn is_formattable(classification: &Classification) -> bool {
    match classification {
        Classification::String | Classification::Number | Classification::Boolean | Classification::Lambda => true,
        Classification::Nullable(inner) => is_formattable(inner),
        Classification::List(_) | Classification::Array(_) | Classification::Map | Classification::Record(_) => false,
    }
}

fn require_formattable(path: &Path, classification: &Classification, span: &Span) -> Result<(), CompileError> {
    if is_formattable(classification) {
        Ok(())
    } else {
        Err(CompileError::NotFormattable {
            path: path.clone(),
            found: format!("{:?}", classification),
            span: span.clone(),
        })
    }
}

/// Builds the `(value, is_null)` operand pair a runtime formatter call
/// takes: a plain value borrows itself as `&dyn Display` and is never null;
/// a `Nullable` value is unwrapped into the same shape with an `is_none()`
/// check standing in for the null flag.
fn format_operands(expr: &str, classification: &Classification) -> (String, String) {
    match classification {
        Classification::Nullable(_) => (
            format!(
                "(match ({expr}).as_ref() {{ Some(v) => v as &dyn std::fmt::Display, None => &\"\" as &dyn std::fmt::Display }})"
            ),
            format!("({expr}).is_none()"),
        ),
        _ => (format!("(&({expr}) as &dyn std::fmt::Display)"), "false".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::InlineLoader;
    use crate::template::TemplateLoader;

    fn catalog() -> TypeCatalog {
        let toml = r#"
            [[type]]
            name = "Person"
            [[type.member]]
            name = "name"
            type = "string"
            [[type.member]]
            name = "pets"
            type = "list<Pet>"
            [[type.member]]
            name = "tags"
            type = "map"

            [[type]]
            name = "Pet"
            [[type.member]]
            name = "name"
            type = "string"
        "#;
        TypeCatalog::from_toml(toml).unwrap()
    }

    fn load(source: &str) -> Template {
        let loader = InlineLoader::new().with("main", source);
        let mapping = Vec::new();
        let partials = std::collections::HashMap::new();
        TemplateLoader::new(&loader, &mapping, &partials).load("main", "UTF-8").unwrap().0
    }

    #[test]
    fn emits_an_escaped_interpolation() {
        let template = load("Hi {{name}}!");
        let catalog = catalog();
        let ambient = AmbientContext::new();
        let program = Emitter::new(&catalog, &ambient).emit(&template, "Person", "render_person").unwrap();
        assert!(program.source().contains("format_and_escape"));
        assert!(program.source().contains("model.name()"));
    }

    #[test]
    fn rejects_an_unformattable_interpolation() {
        let template = load("{{pets}}");
        let catalog = catalog();
        let ambient = AmbientContext::new();
        let result = Emitter::new(&catalog, &ambient).emit(&template, "Person", "render_person");
        assert!(matches!(result, Err(CompileError::NotFormattable { .. })));
    }

    #[test]
    fn a_nullable_interpolation_compiles() {
        let template = load("{{nickname}}");
        let catalog = TypeCatalog::from_toml(
            r#"
            [[type]]
            name = "Person"
            [[type.member]]
            name = "nickname"
            type = "nullable<string>"
        "#,
        )
        .unwrap();
        let ambient = AmbientContext::new();
        let program = Emitter::new(&catalog, &ambient).emit(&template, "Person", "render_person").unwrap();
        assert!(program.source().contains("is_none()"));
    }

    #[test]
    fn content_type_selects_the_plain_escaper() {
        let template = load("Hi {{name}}!");
        let catalog = catalog();
        let ambient = AmbientContext::new();
        let config = RenderConfig::new("text/plain", None, Vec::new());
        let program = Emitter::new(&catalog, &ambient)
            .with_config(config)
            .emit(&template, "Person", "render_person")
            .unwrap();
        assert!(program.source().contains("temple::escape::PlainEscaper"));
    }

    #[test]
    fn emits_a_loop_for_a_list_section() {
        let template = load("{{#pets}}{{name}}{{/pets}}");
        let catalog = catalog();
        let ambient = AmbientContext::new();
        let program = Emitter::new(&catalog, &ambient).emit(&template, "Person", "render_person").unwrap();
        assert!(program.source().contains(".iter().enumerate()"));
        assert!(program.source().contains(".name()"));
    }

    #[test]
    fn loop_pseudo_member_reads_the_index_variable() {
        let template = load("{{#pets}}{{-index}}{{/pets}}");
        let catalog = catalog();
        let ambient = AmbientContext::new();
        let program = Emitter::new(&catalog, &ambient).emit(&template, "Person", "render_person").unwrap();
        assert!(program.source().contains("idx_"));
    }

    #[test]
    fn emits_a_scope_for_a_map_section() {
        let template = load("{{#tags}}present{{/tags}}");
        let catalog = catalog();
        let ambient = AmbientContext::new();
        let program = Emitter::new(&catalog, &ambient).emit(&template, "Person", "render_person").unwrap();
        assert!(program.source().contains("present"));
    }

    #[test]
    fn rejects_a_section_over_a_plain_string() {
        let template = load("{{#name}}x{{/name}}");
        let catalog = catalog();
        let ambient = AmbientContext::new();
        let result = Emitter::new(&catalog, &ambient).emit(&template, "Person", "render_person");
        assert!(matches!(result, Err(CompileError::WrongArity { .. })));
    }
}
