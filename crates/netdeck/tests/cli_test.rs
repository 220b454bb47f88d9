#![allow(deprecated)] // TODO: move cargo_bin to the cargo_bin_cmd! macro

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

/// `netdeck` isolated from the caller's settings and stores
fn netdeck(work: &Path) -> Command {
    let mut cmd = Command::cargo_bin("netdeck").unwrap();
    cmd.current_dir(work)
        .env("NETDECK_STATE_DIR", work.join("state"))
        .env("XDG_CONFIG_HOME", work.join("xdg"))
        .env("RUST_LOG", "warn")
        .env_remove("NETDECK_CONFIG_PATH")
        .env_remove("NETDECK_TEMPLATE_DIR")
        .env_remove("NETBOX_URL")
        .env_remove("NETDECK_USERNAME")
        .env_remove("NETDECK_PASSWORD");
    cmd
}

fn seed_store(work: &Path, records: &[(&str, &str)]) {
    let records: serde_json::Map<String, serde_json::Value> = records
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
        .collect();
    let doc = serde_json::json!({
        "version": 1,
        "updated_at": "2026-01-01T00:00:00Z",
        "records": records,
    });
    let state = work.join("state");
    fs::create_dir_all(&state).unwrap();
    fs::write(state.join("store.json"), doc.to_string()).unwrap();
}

#[test]
fn test_cli_help() {
    let work = tempfile::tempdir().unwrap();
    netdeck(work.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("stack"))
        .stdout(predicate::str::contains("service"))
        .stdout(predicate::str::contains("devices"))
        .stdout(predicate::str::contains("templates"))
        .stdout(predicate::str::contains("--username"));
}

#[test]
fn test_stack_help() {
    let work = tempfile::tempdir().unwrap();
    netdeck(work.path())
        .args(["stack", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("reset"));
}

#[test]
fn test_invalid_command() {
    let work = tempfile::tempdir().unwrap();
    netdeck(work.path()).arg("invalid-command").assert().failure();
}

#[test]
fn test_templates_new_refuses_to_overwrite() {
    let work = tempfile::tempdir().unwrap();
    let dir = work.path().join("templates");

    netdeck(work.path())
        .args(["templates", "new", "access vlan", "--dir"])
        .arg(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("access_vlan.j2"));

    assert!(dir.join("access_vlan.j2").exists());
    assert!(dir.join("access_vlan_delete.j2").exists());

    netdeck(work.path())
        .args(["templates", "new", "access vlan", "--dir"])
        .arg(&dir)
        .assert()
        .failure();
}

#[test]
fn test_templates_list() {
    let work = tempfile::tempdir().unwrap();
    let dir = work.path().join("templates");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("vlan.j2"), "vlan {{ vlan_id }}\n").unwrap();

    netdeck(work.path())
        .env("NETDECK_TEMPLATE_DIR", &dir)
        .args(["templates", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vlan.j2"));
}

#[test]
fn test_stack_create_then_list() {
    let work = tempfile::tempdir().unwrap();
    let bundle = work.path().join("stacks.kdl");
    fs::write(
        &bundle,
        r#"
stack "core-vlans" {
    service "vlan-create" template="vlan.j2" order=0 {
        devices "sw1"
    }
}
"#,
    )
    .unwrap();

    netdeck(work.path())
        .args(["stack", "create"])
        .arg(&bundle)
        .assert()
        .success()
        .stdout(predicate::str::contains("core-vlans"));

    netdeck(work.path())
        .args(["stack", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("core-vlans"))
        .stdout(predicate::str::contains("pending"));

    assert!(work.path().join("state").join("store.json").exists());
}

#[test]
fn test_stack_reset_clears_deploying() {
    let work = tempfile::tempdir().unwrap();
    let stack = serde_json::json!({
        "id": "s1",
        "name": "edge",
        "services": [],
        "variables": {},
        "state": "deploying",
        "deployed_services": [],
        "deployment_errors": [],
        "created_at": "2026-01-01T00:00:00Z",
        "updated_at": "2026-01-01T00:00:00Z",
    });
    seed_store(work.path(), &[("stack:s1", &stack.to_string())]);

    netdeck(work.path())
        .args(["stack", "reset", "s1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("failed"));

    let store = fs::read_to_string(work.path().join("state").join("store.json")).unwrap();
    assert!(store.contains("interrupted"));
}

#[test]
fn test_stack_show_unknown_id() {
    let work = tempfile::tempdir().unwrap();
    netdeck(work.path())
        .args(["stack", "show", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_devices_requires_netbox_url() {
    let work = tempfile::tempdir().unwrap();
    netdeck(work.path())
        .arg("devices")
        .assert()
        .failure()
        .stderr(predicate::str::contains("NetBox URL is not configured"));
}

#[test]
fn test_store_purge_corrupt() {
    let work = tempfile::tempdir().unwrap();
    seed_store(
        work.path(),
        &[
            ("service_instance:a", r#"{"id":"a"}"#),
            ("service_instance:b", ""),
            ("service_instance:c", "not json"),
        ],
    );

    netdeck(work.path())
        .args(["store", "purge-corrupt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 removed, 1 valid"));
}

#[test]
fn test_store_clear_instances_keeps_stacks() {
    let work = tempfile::tempdir().unwrap();
    seed_store(
        work.path(),
        &[
            ("service_instance:a", r#"{"id":"a"}"#),
            ("service_instance:b", r#"{"id":"b"}"#),
            ("stack:s", r#"{"id":"s"}"#),
        ],
    );

    netdeck(work.path())
        .args(["store", "clear-instances", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 service instance records removed"));

    let store = fs::read_to_string(work.path().join("state").join("store.json")).unwrap();
    assert!(store.contains("stack:s"));
    assert!(!store.contains("service_instance:a"));
}
