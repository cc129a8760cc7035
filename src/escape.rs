use std::fmt::Write;

/// Converts a formatted value into its escaped-output form for `{{name}}`
/// interpolations. `{{{name}}}`/`{{&name}}` bypass this entirely. Stateless
/// so a single implementation can be shared across every generated
/// renderer.
pub trait Escaper: Send + Sync {
    fn escape(&self, value: &str, out: &mut dyn Write) -> std::fmt::Result;
}

/// The default escaper: the five characters HTML and XML both require
/// escaped in text content and attribute values.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlEscaper;

impl Escaper for HtmlEscaper {
    fn escape(&self, value: &str, out: &mut dyn Write) -> std::fmt::Result {
        for c in value.chars() {
            match c {
                '&' => out.write_str("&amp;")?,
                '<' => out.write_str("&lt;")?,
                '>' => out.write_str("&gt;")?,
                '"' => out.write_str("&quot;")?,
                '\'' => out.write_str("&#39;")?,
                c => out.write_char(c)?,
            }
        }
        Ok(())
    }
}

/// An escaper for non-markup content types (`text/plain`): passes the value
/// through unchanged, since there's no markup syntax to guard against.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainEscaper;

impl Escaper for PlainEscaper {
    fn escape(&self, value: &str, out: &mut dyn Write) -> std::fmt::Result {
        out.write_str(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_escaper_passes_markup_through_untouched() {
        let mut out = String::new();
        PlainEscaper.escape("<b>&</b>", &mut out).unwrap();
        assert_eq!("<b>&</b>", out);
    }

    #[test]
    fn escapes_the_five_reserved_characters() {
        let mut out = String::new();
        HtmlEscaper.escape(r#"<a href="x">'&'</a>"#, &mut out).unwrap();
        assert_eq!("&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;", out);
    }

    #[test]
    fn leaves_plain_text_untouched() {
        let mut out = String::new();
        HtmlEscaper.escape("plain text", &mut out).unwrap();
        assert_eq!("plain text", out);
    }
}
