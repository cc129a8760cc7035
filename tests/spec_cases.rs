extern crate temple;
extern crate yaml_rust;

use std::fs;

use temple::codegen::Emitter;
use temple::context::AmbientContext;
use temple::loader::InlineLoader;
use temple::model::TypeCatalog;
use temple::TemplateLoader;

use yaml_rust::YamlLoader;

fn catalog() -> TypeCatalog {
    TypeCatalog::from_toml(
        r#"
            [[type]]
            name = "Root"
            [[type.member]]
            name = "name"
            type = "string"
            [[type.member]]
            name = "pets"
            type = "list<string>"
            [[type.member]]
            name = "settings"
            type = "map"
        "#,
    )
    .unwrap()
}

/// Loads a small catalog of template/expectation cases from YAML (this
/// crate's `yaml-rust` dev-dependency, used the way a driver manifest's
/// model-list is, rather than for a full recorded render) and checks each
/// one's generated renderer source against its expectations.
#[test]
fn cases_match_expected_generated_source() {
    let text = fs::read_to_string("tests/fixtures/cases.yml").unwrap();
    let docs = YamlLoader::load_from_str(&text).unwrap();
    let doc = &docs[0];
    let cases = doc["tests"].as_vec().unwrap();

    let catalog = catalog();
    let ambient = AmbientContext::new();

    for case in cases {
        let name = case["name"].as_str().unwrap();
        let template_source = case["template"].as_str().unwrap();

        let loader = InlineLoader::new().with("case", template_source);
        let mapping = Vec::new();
        let partials = std::collections::HashMap::new();
        let (template, _warnings) = TemplateLoader::new(&loader, &mapping, &partials)
            .load("case", "UTF-8")
            .unwrap_or_else(|e| panic!("{}: failed to load template: {}", name, e));

        let program = Emitter::new(&catalog, &ambient)
            .emit(&template, "Root", "render_case")
            .unwrap_or_else(|e| panic!("{}: failed to emit: {}", name, e));
        let source = program.source();

        if let Some(expected) = case["expect_contains"].as_vec() {
            for snippet in expected {
                let snippet = snippet.as_str().unwrap();
                assert!(
                    source.contains(snippet),
                    "{}: expected generated source to contain {:?}, got:\n{}",
                    name,
                    snippet,
                    source
                );
            }
        }

        if let Some(excluded) = case["expect_missing"].as_vec() {
            for snippet in excluded {
                let snippet = snippet.as_str().unwrap();
                assert!(
                    !source.contains(snippet),
                    "{}: expected generated source NOT to contain {:?}, got:\n{}",
                    name,
                    snippet,
                    source
                );
            }
        }
    }
}
