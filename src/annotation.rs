use serde::Deserialize;

/// One entry of a driver manifest: everything needed to compile a single
/// model's templates into Rust source, carried as TOML configuration
/// instead of source-level annotations.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelSpec {
    /// The model's `TypeDescriptor` name, as registered in the type catalog.
    pub name: String,
    /// Directory or file the template is read from.
    pub path: String,
    /// Name of the template within `path` (defaults to `name` lowercased).
    pub template: Option<String>,
    /// Name given to the generated renderer's adapter function/struct.
    #[serde(rename = "adapterName")]
    pub adapter_name: Option<String>,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default)]
    pub formatter: Option<String>,
    #[serde(default = "default_charset")]
    pub charset: String,
    /// Partial name -> file path overrides.
    #[serde(default)]
    pub partials: std::collections::HashMap<String, String>,
    /// Prefix/suffix rewrite rules applied to every partial/parent reference
    /// before it's resolved against `path`.
    #[serde(default)]
    pub path_mapping: Vec<PathMapping>,
    /// Extra trait names the generated renderer should also implement.
    #[serde(default)]
    pub interfaces: Vec<String>,
}

fn default_content_type() -> String {
    "text/html".to_string()
}

fn default_charset() -> String {
    "UTF-8".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathMapping {
    pub prefix: String,
    pub replacement: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Driver {
    #[serde(default, rename = "model")]
    pub models: Vec<ModelSpec>,
}

impl Driver {
    pub fn from_toml(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_manifest() {
        let toml = r#"
            [[model]]
            name = "Person"
            path = "templates/person.mustache"
        "#;
        let driver = Driver::from_toml(toml).unwrap();
        assert_eq!(1, driver.models.len());
        assert_eq!("text/html", driver.models[0].content_type);
        assert_eq!("UTF-8", driver.models[0].charset);
    }

    #[test]
    fn parses_path_mapping_rules() {
        let toml = r#"
            [[model]]
            name = "Person"
            path = "templates/person.mustache"
            [[model.path_mapping]]
            prefix = "shared/"
            replacement = "common/"
        "#;
        let driver = Driver::from_toml(toml).unwrap();
        assert_eq!(1, driver.models[0].path_mapping.len());
        assert_eq!("shared/", driver.models[0].path_mapping[0].prefix);
    }
}
