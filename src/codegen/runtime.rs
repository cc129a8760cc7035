use std::fmt;
use std::io;

use crate::error::RenderError;
use crate::escape::{Escaper, HtmlEscaper};
use crate::format::Formatter;

/// The contract every generated renderer implements. A renderer is
/// stateless and reusable across calls; `supports_type` lets a registry of
/// generated renderers pick the right one for a model value without the
/// caller naming it explicitly.
pub trait Renderer<M> {
    fn execute(&self, model: &M, out: &mut dyn fmt::Write) -> Result<(), RenderError>;
    fn write(&self, model: &M, out: &mut dyn io::Write) -> Result<(), RenderError>;
    fn template_charset(&self) -> &'static str;
    fn supports_type(&self, type_name: &str) -> bool;
}

/// Default `Renderer::write` for any type that already implements
/// `execute`: renders to a `String` buffer under the renderer's own
/// charset, then copies the bytes out, raising the declared charset-mismatch
/// contract error if the sink demands something this renderer can't supply.
pub fn write_via_execute<M, R: Renderer<M>>(renderer: &R, model: &M, out: &mut dyn io::Write, sink_charset: &str) -> Result<(), RenderError> {
    if renderer.template_charset() != sink_charset {
        return Err(RenderError::UnsupportedCharset {
            expected: renderer.template_charset().to_string(),
            actual: sink_charset.to_string(),
        });
    }
    let mut buffer = String::new();
    renderer.execute(model, &mut buffer)?;
    out.write_all(buffer.as_bytes())?;
    Ok(())
}

pub static HTML_ESCAPER: HtmlEscaper = HtmlEscaper;

pub fn escape_to(value: &str, out: &mut dyn fmt::Write) -> fmt::Result {
    HTML_ESCAPER.escape(value, out)
}

/// Generated code's entry point for an escaped interpolation (`{{name}}`):
/// routes `value` through `formatter` (where null-rejection and any other
/// formatting rule lives), then `escaper` before writing.
pub fn format_and_escape(
    value: &dyn fmt::Display,
    is_null: bool,
    formatter: &dyn Formatter,
    escaper: &dyn Escaper,
    out: &mut dyn fmt::Write,
) -> Result<(), RenderError> {
    let formatted = formatter.format(value, is_null)?;
    escaper.escape(&formatted, out)?;
    Ok(())
}

/// Generated code's entry point for an unescaped interpolation
/// (`{{{name}}}`/`{{&name}}`): the same formatting step, written raw.
pub fn format_raw(value: &dyn fmt::Display, is_null: bool, formatter: &dyn Formatter, out: &mut dyn fmt::Write) -> Result<(), RenderError> {
    let formatted = formatter.format(value, is_null)?;
    out.write_str(&formatted)?;
    Ok(())
}
