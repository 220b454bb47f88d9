//! `service` node and variable block parsing

use crate::error::{CoreError, Result};
use crate::model::{ServiceDefinition, Variables};
use kdl::{KdlNode, KdlValue};

/// Parse a `service` node
pub fn parse_service(node: &KdlNode) -> Result<ServiceDefinition> {
    let name = node
        .entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| CoreError::InvalidStack("service requires a name".to_string()))?
        .to_string();

    let mut template: Option<String> = None;
    let mut service = ServiceDefinition::new(name, String::new());

    // properties on the node itself: template="..." order=1
    for entry in node.entries() {
        let Some(key) = entry.name() else {
            continue;
        };
        match key.value() {
            "template" => template = entry.value().as_string().map(str::to_string),
            "reverse_template" | "reverse-template" => {
                service.reverse_template = entry.value().as_string().map(str::to_string);
            }
            "validation_template" | "validation-template" => {
                service.validation_template = entry.value().as_string().map(str::to_string);
            }
            "order" => service.order = parse_order(&service.name, entry.value())?,
            _ => {}
        }
    }

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "template" => template = first_string(child),
                "reverse_template" | "reverse-template" => {
                    service.reverse_template = first_string(child);
                }
                "validation_template" | "validation-template" => {
                    service.validation_template = first_string(child);
                }
                "order" => {
                    let value = child.entries().first().map(|e| e.value()).ok_or_else(|| {
                        CoreError::InvalidStack(format!(
                            "service '{}' has an empty order node",
                            service.name
                        ))
                    })?;
                    service.order = parse_order(&service.name, value)?;
                }
                "devices" | "device" => {
                    service.devices.extend(all_strings(child));
                }
                "depends_on" | "depends-on" => {
                    service.depends_on.extend(all_strings(child));
                }
                "variables" | "vars" => {
                    service.variables.extend(parse_variables(child));
                }
                _ => {}
            }
        }
    }

    service.template = template.ok_or_else(|| {
        CoreError::InvalidStack(format!("service '{}' requires a template", service.name))
    })?;

    Ok(service)
}

fn parse_order(service: &str, value: &KdlValue) -> Result<i64> {
    value
        .as_integer()
        .and_then(|order| i64::try_from(order).ok())
        .ok_or_else(|| {
            CoreError::InvalidStack(format!(
                "service '{}' has invalid order {}: expected an integer",
                service, value
            ))
        })
}

/// Parse a `variables { key value }` block
pub fn parse_variables(node: &KdlNode) -> Variables {
    let mut variables = Variables::new();
    if let Some(children) = node.children() {
        for var in children.nodes() {
            let key = var.name().value().to_string();
            let values: Vec<serde_json::Value> = var
                .entries()
                .iter()
                .filter(|e| e.name().is_none())
                .map(|e| kdl_to_json(e.value()))
                .collect();
            let value = match values.len() {
                0 => serde_json::Value::Null,
                1 => values.into_iter().next().unwrap_or(serde_json::Value::Null),
                // `interfaces "Gi1/0/1" "Gi1/0/2"` becomes a list
                _ => serde_json::Value::Array(values),
            };
            variables.insert(key, value);
        }
    }
    variables
}

fn kdl_to_json(value: &KdlValue) -> serde_json::Value {
    if let Some(s) = value.as_string() {
        serde_json::Value::String(s.to_string())
    } else if let Some(i) = value.as_integer() {
        serde_json::Value::from(i as i64)
    } else if let Some(f) = value.as_float() {
        serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    } else if let Some(b) = value.as_bool() {
        serde_json::Value::Bool(b)
    } else {
        serde_json::Value::Null
    }
}

fn first_string(node: &KdlNode) -> Option<String> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_string())
        .map(str::to_string)
}

fn all_strings(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter_map(|e| e.value().as_string().map(str::to_string))
        .collect()
}
