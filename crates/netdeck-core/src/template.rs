//! Template rendering
//!
//! Service templates are rendered with Tera. Templates are addressed by id,
//! which is the file path relative to the template directory (e.g. `vlan.j2`).

use crate::error::{CoreError, Result};
use crate::model::Variables;
use std::path::Path;
use tera::{Context, Tera};
use tracing::{debug, info};

/// Renders a named template with a variable mapping
pub trait TemplateRenderer: Send + Sync {
    /// Render `template` with `variables`
    fn render(&self, template: &str, variables: &Variables) -> Result<String>;

    /// Ids of every template the renderer knows about, sorted
    fn template_names(&self) -> Vec<String>;
}

/// Tera-backed renderer
pub struct TeraRenderer {
    tera: Tera,
}

impl TeraRenderer {
    /// Load every file below `dir` as a template
    #[tracing::instrument]
    pub fn from_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(CoreError::TemplateLoad(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let pattern = format!("{}/**/*", dir.display());
        let mut tera = Tera::new(&pattern).map_err(|e| CoreError::TemplateLoad(error_detail(&e)))?;
        // Device configuration is plain text
        tera.autoescape_on(vec![]);

        let renderer = Self { tera };
        info!(
            template_dir = %dir.display(),
            template_count = renderer.template_names().len(),
            "Loaded templates"
        );
        Ok(renderer)
    }

    /// Build a renderer from in-memory `(id, source)` pairs
    pub fn from_templates<I, N, S>(templates: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, S)>,
        N: AsRef<str>,
        S: AsRef<str>,
    {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        for (name, source) in templates {
            tera.add_raw_template(name.as_ref(), source.as_ref())
                .map_err(|e| CoreError::TemplateRender {
                    template: name.as_ref().to_string(),
                    message: error_detail(&e),
                })?;
        }
        Ok(Self { tera })
    }
}

impl TemplateRenderer for TeraRenderer {
    fn render(&self, template: &str, variables: &Variables) -> Result<String> {
        let mut context = Context::new();
        for (key, value) in variables {
            context.insert(key.as_str(), value);
        }

        let rendered = self
            .tera
            .render(template, &context)
            .map_err(|e| CoreError::TemplateRender {
                template: template.to_string(),
                message: error_detail(&e),
            })?;

        if rendered.trim().is_empty() {
            return Err(CoreError::TemplateRender {
                template: template.to_string(),
                message: "rendered to empty output".to_string(),
            });
        }

        debug!(template = %template, bytes = rendered.len(), "Rendered template");
        Ok(rendered)
    }

    fn template_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tera
            .get_template_names()
            .map(str::to_string)
            .collect();
        names.sort();
        names
    }
}

/// Flatten a Tera error and its sources into one message
fn error_detail(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
