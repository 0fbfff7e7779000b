#![allow(clippy::unwrap_used)]
// Layered loading: defaults, then the TOML file, then PLUGWIRE_* variables.
// Every test runs inside a figment `Jail` so environment changes made by
// one test never leak into another running in parallel.

use std::path::Path;
use std::time::Duration;

use figment::Jail;
use pretty_assertions::assert_eq;

use plugwire_config::{Config, ConfigError, DeviceEntry, load_config_from, save_config_to};
use plugwire_core::{DeviceKind, TransportKind};

const SAMPLE: &str = r#"
[defaults]
transport = "udp"
timeout_ms = 2500

[discovery]
broadcast = "192.168.1.255"
interval_ms = 5000
offline_tolerance = 5
device_types = ["plug"]
exclude_mac_addresses = ["50:C7:BF:*"]

[devices.kitchen]
host = "192.168.1.40"

[devices.strip-fan]
host = "192.168.1.41"
child_id = "1"
transport = "tcp"
"#;

#[test]
fn missing_file_yields_defaults() {
    Jail::expect_with(|_| {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
        Ok(())
    });
}

#[test]
fn file_values_override_defaults() {
    Jail::expect_with(|_| {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = load_config_from(&path).unwrap();
        config.validate().unwrap();

        let client = config.client_config().unwrap();
        assert_eq!(client.transport.kind, TransportKind::Udp);
        assert_eq!(client.transport.timeout, Duration::from_millis(2500));
        assert_eq!(client.default_port, 9999);

        let discovery = config.discovery_options().unwrap();
        assert_eq!(discovery.broadcast_target().to_string(), "192.168.1.255:9999");
        assert_eq!(discovery.interval, Duration::from_secs(5));
        assert_eq!(discovery.offline_tolerance, 5);
        assert_eq!(discovery.device_types, Some(vec![DeviceKind::Plug]));
        assert_eq!(discovery.exclude_mac_addresses, vec!["50:C7:BF:*".to_owned()]);

        let fan = config.device("strip-fan").unwrap();
        assert_eq!(fan.child_id.as_deref(), Some("1"));
        assert_eq!(fan.send.transport, Some(TransportKind::Tcp));
        assert_eq!(config.device("kitchen").unwrap().send.transport, None);
        Ok(())
    });
}

#[test]
fn environment_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", SAMPLE)?;
        jail.set_env("PLUGWIRE_DEFAULTS__TIMEOUT_MS", "750");
        jail.set_env("PLUGWIRE_DISCOVERY__OFFLINE_TOLERANCE", "2");

        let config = load_config_from(Path::new("config.toml")).unwrap();
        assert_eq!(config.defaults.timeout_ms, 750);
        assert_eq!(config.defaults.transport, "udp");
        assert_eq!(config.discovery.offline_tolerance, 2);
        Ok(())
    });
}

#[test]
fn invalid_values_surface_as_validation_errors() {
    Jail::expect_with(|_| {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[discovery]\noffline_tolerance = 0\n").unwrap();

        let config = load_config_from(&path).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
        assert!(err.to_string().contains("offline_tolerance"));
        Ok(())
    });
}

#[test]
fn malformed_toml_is_a_load_error() {
    Jail::expect_with(|_| {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[defaults\ntimeout_ms = ").unwrap();

        assert!(matches!(
            load_config_from(&path),
            Err(ConfigError::Figment(_))
        ));
        Ok(())
    });
}

#[test]
fn saved_config_loads_back() {
    Jail::expect_with(|_| {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.defaults.output = "json".into();
        config.devices.insert(
            "desk".into(),
            DeviceEntry {
                port: Some(9998),
                ..DeviceEntry::new("10.0.0.7")
            },
        );
        save_config_to(&config, &path).unwrap();

        assert_eq!(load_config_from(&path).unwrap(), config);
        Ok(())
    });
}
