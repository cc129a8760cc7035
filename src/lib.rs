extern crate regex;

pub use error::{CompileError, Diagnostic, RenderError, Severity};
pub use name::Name;
pub use path::Path;
pub use span::{Span, Spanned};
pub use template::{Template, TemplateLoader};

pub mod annotation;
pub mod ast;
pub mod codegen;
pub mod context;
pub mod driver;
pub mod escape;
pub mod format;
pub mod loader;
pub mod model;
pub mod resolve;
mod error;
mod name;
mod path;
mod span;
mod template;
mod token;

pub use token::{tokenize, Token};
