use crate::error::RenderError;

/// Converts a resolved model value into the string a renderer interpolates.
/// Contract failures in generated code belong to `RenderError`, not this
/// trait; `Formatter::format` itself only fails when handed a value kind it
/// refuses to stringify.
pub trait Formatter: Send + Sync {
    fn format(&self, value: &dyn std::fmt::Display, is_null: bool) -> Result<String, RenderError>;
}

/// The default formatter: stringifies with `Display`, and rejects nulls
/// outright rather than silently rendering an empty string for them.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRejectingFormatter;

impl Formatter for NullRejectingFormatter {
    fn format(&self, value: &dyn std::fmt::Display, is_null: bool) -> Result<String, RenderError> {
        if is_null {
            return Err(RenderError::BrokenRenderer);
        }
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_a_display_value() {
        let formatted = NullRejectingFormatter.format(&42, false).unwrap();
        assert_eq!("42", formatted);
    }

    #[test]
    fn rejects_null() {
        assert!(NullRejectingFormatter.format(&"", true).is_err());
    }
}
