use crate::model::Classification;

/// The ambient, per-render context a template may reach with `@context.key`
/// without walking the model stack. This crate only needs the
/// statically-known shape of that context, not live values — rendering is
/// left to the generated code.
#[derive(Debug, Clone, Default)]
pub struct AmbientContext {
    members: Vec<(String, Classification)>,
}

impl AmbientContext {
    pub fn new() -> Self {
        AmbientContext::default()
    }

    pub fn with(mut self, name: impl Into<String>, classification: Classification) -> Self {
        self.members.push((name.into(), classification));
        self
    }

    pub fn member(&self, name: &str) -> Option<&Classification> {
        self.members.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_a_registered_member() {
        let ctx = AmbientContext::new().with("locale", Classification::String);
        assert_eq!(Some(&Classification::String), ctx.member("locale"));
        assert_eq!(None, ctx.member("missing"));
    }
}
