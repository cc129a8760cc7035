use std::sync::Mutex;

use rayon::prelude::*;

use crate::annotation::{Driver as ManifestDriver, ModelSpec};
use crate::codegen::{Emitter, Program, RenderConfig};
use crate::context::AmbientContext;
use crate::error::{CompileError, Diagnostic};
use crate::loader::FilesystemLoader;
use crate::model::TypeCatalog;
use crate::template::TemplateLoader;

/// Drives a batch compile of every model in a manifest, compiling
/// independent models concurrently. A manifest can name models backed by
/// entirely different directories, so each gets its own loader and there's
/// no shared mutable state beyond the diagnostic sink and the read-only
/// type catalog.
pub struct CompileDriver {
    catalog: TypeCatalog,
    ambient: AmbientContext,
}

pub struct CompileOutcome {
    pub programs: Vec<Program>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileOutcome {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == crate::error::Severity::Error)
    }
}

impl CompileDriver {
    pub fn new(catalog: TypeCatalog, ambient: AmbientContext) -> Self {
        CompileDriver { catalog, ambient }
    }

    /// Compiles every model named in `manifest`, logging each diagnostic
    /// through `log` as it's produced in addition to returning the full
    /// list for the CLI's textual report.
    pub fn run(&self, manifest: &ManifestDriver) -> CompileOutcome {
        let diagnostics: Mutex<Vec<Diagnostic>> = Mutex::new(Vec::new());

        let programs: Vec<Program> = manifest
            .models
            .par_iter()
            .filter_map(|spec| match self.compile_one(spec) {
                Ok((program, warnings)) => {
                    for warning in &warnings {
                        log::warn!("{}", warning);
                    }
                    let mut sink = diagnostics.lock().unwrap();
                    sink.extend(warnings);
                    Some(program)
                }
                Err(err) => {
                    let diagnostic = Diagnostic::from(&err).for_model(spec.name.clone());
                    log::error!("{}", diagnostic);
                    diagnostics.lock().unwrap().push(diagnostic);
                    None
                }
            })
            .collect();

        CompileOutcome {
            programs,
            diagnostics: diagnostics.into_inner().unwrap(),
        }
    }

    fn compile_one(&self, spec: &ModelSpec) -> Result<(Program, Vec<Diagnostic>), CompileError> {
        let loader = FilesystemLoader::new(spec.path.clone());
        let template_name = spec.template.clone().unwrap_or_else(|| spec.name.to_lowercase());
        let (template, warnings) =
            TemplateLoader::new(&loader, &spec.path_mapping, &spec.partials).load(&template_name, &spec.charset)?;
        let fn_name = spec
            .adapter_name
            .clone()
            .unwrap_or_else(|| format!("render_{}", spec.name.to_lowercase()));
        let config = RenderConfig::new(&spec.content_type, spec.formatter.as_deref(), spec.interfaces.clone());
        let program = Emitter::new(&self.catalog, &self.ambient)
            .with_config(config)
            .emit(&template, &spec.name, &fn_name)?;
        Ok((program, warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_an_error_for_a_missing_template() {
        let catalog = TypeCatalog::from_toml("[[type]]\nname = \"Person\"\n").unwrap();
        let driver = CompileDriver::new(catalog, AmbientContext::new());
        let manifest = ManifestDriver {
            models: vec![ModelSpec {
                name: "Person".into(),
                path: "/nonexistent/path/for/tests".into(),
                template: Some("person".into()),
                adapter_name: None,
                content_type: "text/html".into(),
                formatter: None,
                charset: "UTF-8".into(),
                partials: Default::default(),
                path_mapping: Vec::new(),
                interfaces: Vec::new(),
            }],
        };
        let outcome = driver.run(&manifest);
        assert!(outcome.has_errors());
        assert!(outcome.programs.is_empty());
    }
}
