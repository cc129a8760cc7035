use std::fmt;

/// A dotted-name expression as written in a template: `a.b.c`, `.`, or
/// `@context.key`. The head of the key list may be one of two special
/// forms (see `Path::head`); everything after the head is an ordinary
/// member-access chain resolved by the type resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    pub keys: Vec<String>,
}

/// The special meaning, if any, of a path's head segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Head<'a> {
    /// `.` — the current context element.
    Current,
    /// `@context` — the ambient per-request context; never walks the model stack.
    Context,
    /// An ordinary identifier, searched for top-down across the context stack.
    Name(&'a str),
}

impl Path {
    pub fn keys(keys: Vec<String>) -> Self {
        Path { keys }
    }

    pub fn current() -> Self {
        Path {
            keys: vec![".".to_string()],
        }
    }

    pub fn is_current(&self) -> bool {
        self.keys.len() == 1 && self.keys[0] == "."
    }

    pub fn is_context(&self) -> bool {
        self.keys.first().map(|k| k.as_str()) == Some("@context")
    }

    pub fn head(&self) -> Head<'_> {
        match self.keys.first().map(|k| k.as_str()) {
            Some(".") => Head::Current,
            Some("@context") => Head::Context,
            Some(name) => Head::Name(name),
            None => Head::Current,
        }
    }

    /// The segments after the head, e.g. `["b", "c"]` for `a.b.c`, or
    /// everything after `@context` for an ambient lookup.
    pub fn tail(&self) -> &[String] {
        &self.keys[1.min(self.keys.len())..]
    }

    /// True for the reserved loop pseudo-members exposed inside a section
    /// over an iterable: `-index`, `-first`, `-last`.
    pub fn is_loop_pseudo_member(name: &str) -> bool {
        matches!(name, "-index" | "-first" | "-last")
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.keys.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_string() {
        let path = Path::keys(vec!["one".into(), "two".into()]);
        assert_eq!("one.two", path.to_string());
    }

    #[test]
    fn current_head() {
        assert_eq!(Head::Current, Path::current().head());
        assert!(Path::current().is_current());
    }

    #[test]
    fn context_head() {
        let path = Path::keys(vec!["@context".into(), "locale".into()]);
        assert_eq!(Head::Context, path.head());
        assert_eq!(["locale".to_string()].as_slice(), path.tail());
        assert!(path.is_context());
    }

    #[test]
    fn name_head_with_tail() {
        let path = Path::keys(vec!["person".into(), "name".into()]);
        assert_eq!(Head::Name("person"), path.head());
        assert_eq!(["name".to_string()].as_slice(), path.tail());
    }

    #[test]
    fn loop_pseudo_members() {
        assert!(Path::is_loop_pseudo_member("-first"));
        assert!(!Path::is_loop_pseudo_member("first"));
    }
}
