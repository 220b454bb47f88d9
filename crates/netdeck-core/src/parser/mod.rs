//! Stack bundle parser
//!
//! Stack bundles are KDL documents with one or more `stack` nodes. JSON
//! bundles (a single stack object or an array of them) are accepted as well.
//!
//! ```kdl
//! stack "core-vlans" {
//!     description "Core VLAN rollout"
//!     variables {
//!         site "lon1"
//!     }
//!     service "vlan-create" template="vlan.j2" order=0 {
//!         devices "sw1" "sw2"
//!     }
//! }
//! ```

mod service;

use service::{parse_service, parse_variables};

use crate::error::{CoreError, Result};
use crate::model::StackSpec;
use kdl::{KdlDocument, KdlNode};
use std::path::Path;
use tracing::debug;

/// Load stack specs from a `.kdl` or `.json` file
pub fn parse_stack_file<P: AsRef<Path>>(path: P) -> Result<Vec<StackSpec>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| CoreError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let specs = if is_json {
        parse_stack_json(&content)?
    } else {
        parse_stack_kdl(&content)?
    };
    debug!(path = %path.display(), stacks = specs.len(), "Parsed stack bundle");
    Ok(specs)
}

/// Parse a JSON stack bundle
pub fn parse_stack_json(content: &str) -> Result<Vec<StackSpec>> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    let specs = if value.is_array() {
        serde_json::from_value::<Vec<StackSpec>>(value)?
    } else {
        vec![serde_json::from_value::<StackSpec>(value)?]
    };
    for spec in &specs {
        spec.validate()?;
    }
    Ok(specs)
}

/// Parse a KDL stack bundle
pub fn parse_stack_kdl(content: &str) -> Result<Vec<StackSpec>> {
    let doc: KdlDocument = content.parse()?;

    let mut specs = Vec::new();
    for node in doc.nodes() {
        match node.name().value() {
            "stack" => specs.push(parse_stack(node)?),
            _ => {
                // unknown top-level nodes are ignored
            }
        }
    }

    if specs.is_empty() {
        return Err(CoreError::InvalidStack(
            "bundle contains no stack node".to_string(),
        ));
    }
    Ok(specs)
}

fn parse_stack(node: &KdlNode) -> Result<StackSpec> {
    let name = node
        .entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| CoreError::InvalidStack("stack requires a name".to_string()))?
        .to_string();

    let mut spec = StackSpec::new(name);

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "description" => {
                    spec.description = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_string())
                        .map(|s| s.to_string());
                }
                "variables" | "vars" => {
                    spec.variables.extend(parse_variables(child));
                }
                "service" => {
                    spec.services.push(parse_service(child)?);
                }
                _ => {}
            }
        }
    }

    spec.validate()?;
    Ok(spec)
}
