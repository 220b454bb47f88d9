//! Template scaffolding
//!
//! Writes a starter forward/reverse template pair for a new service.

use crate::error::{CoreError, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Paths written by [`scaffold_service_templates`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaffoldPaths {
    pub template: PathBuf,
    pub reverse_template: PathBuf,
}

/// Normalize a service name into a template base name
pub fn template_base_name(name: &str) -> String {
    name.trim().replace(' ', "_")
}

/// Create `<name>.j2` and `<name>_delete.j2` under `dir`
///
/// Existing files are never overwritten.
pub fn scaffold_service_templates(dir: &Path, name: &str) -> Result<ScaffoldPaths> {
    let base = template_base_name(name);
    if base.is_empty() {
        return Err(CoreError::InvalidStack("template name is empty".to_string()));
    }

    let paths = ScaffoldPaths {
        template: dir.join(format!("{}.j2", base)),
        reverse_template: dir.join(format!("{}_delete.j2", base)),
    };

    for path in [&paths.template, &paths.reverse_template] {
        if path.exists() {
            return Err(CoreError::AlreadyExists(path.clone()));
        }
    }

    std::fs::create_dir_all(dir).map_err(|e| CoreError::Io {
        path: dir.to_path_buf(),
        message: e.to_string(),
    })?;

    write(&paths.template, &forward_template(&base))?;
    write(&paths.reverse_template, &reverse_template(&base))?;

    info!(
        template = %paths.template.display(),
        reverse_template = %paths.reverse_template.display(),
        "Scaffolded service templates"
    );
    Ok(paths)
}

fn write(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| CoreError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn forward_template(base: &str) -> String {
    format!(
        "{{# {base}: configuration pushed on deploy #}}\n\
         {{# variables come from the stack and the service definition #}}\n\
         interface {{{{ interface }}}}\n \
         description {{{{ description | default(value=\"{base}\") }}}}\n"
    )
}

fn reverse_template(base: &str) -> String {
    format!(
        "{{# {base}: configuration pushed on delete #}}\n\
         interface {{{{ interface }}}}\n \
         no description\n"
    )
}
