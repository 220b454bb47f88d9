use colored::{ColoredString, Colorize};
use netdeck_core::{InstanceState, StackState, ValidationStatus, Variables};
use std::io::Write;

/// Parse `key=value` pairs; values that parse as JSON keep their type
pub fn parse_vars(pairs: &[String]) -> anyhow::Result<Variables> {
    let mut variables = Variables::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("expected key=value, got '{}'", pair))?;
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("variable name is empty in '{}'", pair);
        }
        let value = serde_json::from_str(raw)
            .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
        variables.insert(key.to_string(), value);
    }
    Ok(variables)
}

pub fn stack_state(state: StackState) -> ColoredString {
    let label = state.to_string();
    match state {
        StackState::Deployed => label.green(),
        StackState::Failed => label.red(),
        StackState::Deploying => label.yellow(),
        StackState::Pending => label.dimmed(),
    }
}

pub fn instance_state(state: InstanceState) -> ColoredString {
    let label = state.to_string();
    match state {
        InstanceState::Deployed => label.green(),
        InstanceState::Failed => label.red(),
        InstanceState::Deploying | InstanceState::Deleting => label.yellow(),
        InstanceState::Pending => label.dimmed(),
    }
}

pub fn validation_status(status: ValidationStatus) -> ColoredString {
    let label = status.to_string();
    match status {
        ValidationStatus::Valid => label.green(),
        ValidationStatus::DriftDetected => label.yellow(),
        ValidationStatus::Error => label.red(),
        ValidationStatus::Unknown => label.dimmed(),
    }
}

pub fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Ask on stdout, read the answer from stdin
pub fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{} [y/N]: ", prompt);
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_vars_keeps_json_types() {
        let vars = parse_vars(&[
            "vlan_id=100".to_string(),
            "vlan_name=users".to_string(),
            "tagged=true".to_string(),
            "ports=[\"Gi1/0/1\",\"Gi1/0/2\"]".to_string(),
        ])
        .unwrap();

        assert_eq!(vars["vlan_id"], json!(100));
        assert_eq!(vars["vlan_name"], json!("users"));
        assert_eq!(vars["tagged"], json!(true));
        assert_eq!(vars["ports"], json!(["Gi1/0/1", "Gi1/0/2"]));
    }

    #[test]
    fn test_parse_vars_value_may_contain_equals() {
        let vars = parse_vars(&["filter=a=b".to_string()]).unwrap();
        assert_eq!(vars["filter"], json!("a=b"));
    }

    #[test]
    fn test_parse_vars_rejects_bad_pairs() {
        assert!(parse_vars(&["novalue".to_string()]).is_err());
        assert!(parse_vars(&["=1".to_string()]).is_err());
    }
}
