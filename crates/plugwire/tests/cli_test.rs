//! Integration tests for the `plugwire` binary.
//!
//! Argument parsing, help, completions, config handling, and a few
//! device round-trips against an in-process fake device on loopback.
#![allow(clippy::unwrap_used)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};

use plugwire_api::cipher;

// ── Helpers ─────────────────────────────────────────────────────────

/// `plugwire` with the user's config and environment out of reach.
fn plugwire_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("plugwire");
    cmd.env("HOME", "/tmp/plugwire-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/plugwire-cli-test-nonexistent")
        .env("NO_COLOR", "1")
        .env_remove("PLUGWIRE_CONFIG_FILE")
        .env_remove("PLUGWIRE_DEFAULTS__TRANSPORT")
        .env_remove("PLUGWIRE_DEFAULTS__TIMEOUT_MS")
        .env_remove("PLUGWIRE_DEFAULTS__OUTPUT")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn sysinfo(relay_state: u8) -> Value {
    json!({
        "deviceId": "PLUG01",
        "alias": "Desk Lamp",
        "model": "HS100(US)",
        "sw_ver": "1.2.5",
        "hw_ver": "2.0",
        "type": "IOT.SMARTPLUGSWITCH",
        "mac": "50:C7:BF:0A:0B:0C",
        "relay_state": relay_state,
        "feature": "TIM",
    })
}

/// Serve framed TCP requests on a background thread until the test
/// process exits. Tracks the relay so `power on` is observable.
fn spawn_fake_plug() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        let mut relay = 0u8;
        for stream in listener.incoming() {
            let Ok(stream) = stream else { continue };
            serve(stream, &mut relay);
        }
    });
    port
}

fn serve(mut stream: TcpStream, relay: &mut u8) {
    loop {
        let mut header = [0u8; 4];
        if stream.read_exact(&mut header).is_err() {
            return;
        }
        let len = u32::from_be_bytes(header) as usize;
        let mut body = vec![0u8; len];
        if stream.read_exact(&mut body).is_err() {
            return;
        }
        let request: Value = serde_json::from_slice(&cipher::decode(&body, cipher::DEFAULT_KEY)).unwrap();

        let system = &request["system"];
        let reply = if let Some(params) = system.get("set_relay_state") {
            *relay = u8::try_from(params["state"].as_u64().unwrap()).unwrap();
            json!({ "system": { "set_relay_state": { "err_code": 0 } } })
        } else {
            let mut info = sysinfo(*relay);
            info["err_code"] = json!(0);
            json!({ "system": { "get_sysinfo": info } })
        };

        let framed = cipher::encode_framed(reply.to_string().as_bytes(), cipher::DEFAULT_KEY).unwrap();
        if stream.write_all(&framed).is_err() {
            return;
        }
    }
}

/// A loopback port with nothing listening on it.
fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn no_args_shows_usage() {
    let output = plugwire_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "expected usage text:\n{text}");
}

#[test]
fn help_lists_commands() {
    plugwire_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("search")
            .and(predicate::str::contains("power"))
            .and(predicate::str::contains("light"))
            .and(predicate::str::contains("sysinfo")),
    );
}

#[test]
fn version_flag() {
    plugwire_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("plugwire"));
}

#[test]
fn completions_for_common_shells() {
    for shell in ["bash", "zsh", "fish"] {
        plugwire_cmd()
            .args(["completions", shell])
            .assert()
            .success()
            .stdout(predicate::str::is_empty().not());
    }
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    plugwire_cmd().arg("frobnicate").assert().failure().code(2);
}

#[test]
fn invalid_output_format_is_rejected() {
    plugwire_cmd()
        .args(["-o", "xml", "sysinfo", "127.0.0.1"])
        .assert()
        .failure()
        .code(2);
}

// ── Device round-trips ──────────────────────────────────────────────

#[test]
fn unreachable_device_exits_with_connection_code() {
    let port = closed_port().to_string();
    let output = plugwire_cmd()
        .args(["-t", "1000", "sysinfo", "127.0.0.1", "-p", &port])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7), "{}", combined_output(&output));
}

#[test]
fn sysinfo_prints_descriptor_as_json() {
    let port = spawn_fake_plug().to_string();
    let output = plugwire_cmd()
        .args(["-o", "json", "sysinfo", "127.0.0.1", "-p", &port])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["deviceId"], "PLUG01");
    assert_eq!(value["alias"], "Desk Lamp");
}

#[test]
fn power_on_reports_new_state() {
    let port = spawn_fake_plug().to_string();
    let target = format!("127.0.0.1:{port}");
    let output = plugwire_cmd()
        .args(["-o", "json", "power", &target, "on"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["id"], "PLUG01");
    assert_eq!(value["on"], true);
}

#[test]
fn light_on_a_plug_is_unsupported() {
    let port = spawn_fake_plug().to_string();
    plugwire_cmd()
        .args(["light", "127.0.0.1", "-p", &port, "--on"])
        .assert()
        .failure()
        .code(5);
}

#[test]
fn reset_requires_yes() {
    let output = plugwire_cmd()
        .args(["reset", "127.0.0.1"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--yes"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn config_show_prints_defaults() {
    plugwire_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[defaults]").and(predicate::str::contains("9999")));
}

#[test]
fn added_device_is_saved_and_addressable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let path = path.to_str().unwrap();

    plugwire_cmd()
        .args(["--config", path, "config", "add-device", "desk", "127.0.0.1", "-p", "9998"])
        .assert()
        .success();

    plugwire_cmd()
        .args(["--config", path, "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[devices.desk]").and(predicate::str::contains("9998")));

    plugwire_cmd()
        .args(["--config", path, "config", "remove-device", "desk"])
        .assert()
        .success();

    plugwire_cmd()
        .args(["--config", path, "config", "remove-device", "desk"])
        .assert()
        .failure()
        .code(4);
}

#[test]
fn bad_device_transport_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    plugwire_cmd()
        .arg("--config")
        .arg(&path)
        .args(["config", "add-device", "desk", "127.0.0.1", "--transport", "carrier-pigeon"])
        .assert()
        .failure();
    assert!(!path.exists());
}
