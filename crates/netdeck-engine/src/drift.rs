//! Expected vs. live configuration comparison
//!
//! Both sides are normalized (trimmed, leading keyword abbreviations
//! expanded). An expected line is present when it is a substring of any
//! normalized live line, so vendor-appended trailing text still matches.

use crate::error::Result;
use netdeck_core::{DeviceFamily, ServiceInstance, TemplateRenderer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub const JUNIPER_SHOW_COMMAND: &str = "show configuration | display set";
pub const RUNNING_CONFIG_COMMAND: &str = "show running-config";

/// Leading keyword abbreviations and their canonical form
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("int", "interface"),
    ("inte", "interface"),
    ("inter", "interface"),
    ("interf", "interface"),
    ("interfa", "interface"),
    ("interfac", "interface"),
    ("interface", "interface"),
    ("desc", "description"),
    ("descr", "description"),
    ("description", "description"),
    ("sw", "switchport"),
    ("switch", "switchport"),
    ("switchport", "switchport"),
    ("hostn", "hostname"),
    ("hostname", "hostname"),
];

pub fn show_config_command(family: DeviceFamily) -> &'static str {
    match family {
        DeviceFamily::Juniper => JUNIPER_SHOW_COMMAND,
        DeviceFamily::Other => RUNNING_CONFIG_COMMAND,
    }
}

pub fn normalize_line(line: &str) -> String {
    let line = line.trim();
    let (first, rest) = match line.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim_start()),
        None => (line, ""),
    };

    let canonical = ABBREVIATIONS
        .iter()
        .find(|(abbr, _)| first.eq_ignore_ascii_case(abbr))
        .map(|(_, full)| *full);

    match (canonical, rest.is_empty()) {
        (Some(full), true) => full.to_string(),
        (Some(full), false) => format!("{} {}", full, rest),
        (None, _) => line.to_string(),
    }
}

/// Lines worth checking; blank lines are dropped
pub fn expected_lines(config: &str) -> Vec<String> {
    config
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftReport {
    pub valid: bool,
    /// Expected lines absent from the device, in their original form
    pub missing: Vec<String>,
    /// Number of expected lines checked
    pub checked: usize,
}

pub fn compare_lines<E, L>(expected: &[E], live: &[L]) -> DriftReport
where
    E: AsRef<str>,
    L: AsRef<str>,
{
    let live: Vec<String> = live.iter().map(|l| normalize_line(l.as_ref())).collect();

    let mut checked = 0;
    let mut missing = Vec::new();
    for line in expected {
        let original = line.as_ref();
        if original.trim().is_empty() {
            continue;
        }
        checked += 1;
        let wanted = normalize_line(original);
        if !live.iter().any(|l| l.contains(&wanted)) {
            missing.push(original.to_string());
        }
    }

    DriftReport {
        valid: missing.is_empty(),
        missing,
        checked,
    }
}

/// Compare a rendered config against a live config dump
pub fn compare_config(expected: &str, live: &str) -> DriftReport {
    let live: Vec<&str> = live.lines().collect();
    compare_lines(&expected_lines(expected), &live)
}

/// Pull the configuration text out of a show-command task result
///
/// Accepts a bare string, an object keyed by command (or holding a single
/// entry), or a list of output lines.
pub fn live_config_text(result: &Value, command: &str) -> Option<String> {
    match result {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| live_config_text(item, command))
                .collect();
            Some(parts.join("\n"))
        }
        Value::Object(map) => {
            if let Some(value) = map.get(command) {
                return live_config_text(value, command);
            }
            if map.len() == 1 {
                return map.values().next().and_then(|v| live_config_text(v, command));
            }
            let parts: Vec<String> = map
                .values()
                .filter_map(|v| live_config_text(v, command))
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("\n"))
            }
        }
        other => Some(other.to_string()),
    }
}

/// Produces the expected configuration of an instance and checks it
#[derive(Clone)]
pub struct DriftComparator {
    renderer: Arc<dyn TemplateRenderer>,
}

impl DriftComparator {
    pub fn new(renderer: Arc<dyn TemplateRenderer>) -> Self {
        Self { renderer }
    }

    /// Validation template output when the instance has one, otherwise the
    /// stored rendered config
    pub fn expected_config(&self, instance: &ServiceInstance) -> Result<String> {
        match &instance.validation_template {
            Some(template) => Ok(self.renderer.render(template, &instance.variables)?),
            None => Ok(instance.rendered_config.clone()),
        }
    }

    pub fn validate<L: AsRef<str>>(
        &self,
        instance: &ServiceInstance,
        live_lines: &[L],
    ) -> Result<DriftReport> {
        let expected = self.expected_config(instance)?;
        Ok(self.compare(instance, &expected, live_lines))
    }

    /// Compare an already produced expected config for `instance`
    pub fn compare<L: AsRef<str>>(
        &self,
        instance: &ServiceInstance,
        expected: &str,
        live_lines: &[L],
    ) -> DriftReport {
        let report = compare_lines(&expected_lines(expected), live_lines);
        tracing::debug!(
            instance = %instance.id,
            checked = report.checked,
            missing = report.missing.len(),
            "Drift comparison complete"
        );
        report
    }
}
