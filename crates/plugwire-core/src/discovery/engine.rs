// ── Presence engine ──
//
// The discovery state machine without the socket: offline scan, sequence
// advance, and reply correlation. The session task drives it from a
// single loop, so scan and reply handling never interleave.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tracing::{debug, info, warn};

use plugwire_api::Datagram;

use super::filter::DiscoveryFilter;
use crate::config::{ClientConfig, DiscoveryOptions, SendOptions};
use crate::device::{Device, DeviceOptions, parse_realtime, parse_sys_info};
use crate::event::DiscoveryEvent;
use crate::model::{DeviceKind, DeviceStatus, Realtime, SysInfo};
use crate::protocol::normalize_child_id;
use crate::store::DeviceRegistry;

pub(crate) struct PresenceEngine {
    registry: Arc<DeviceRegistry>,
    config: ClientConfig,
    filter: DiscoveryFilter,
    device_options: SendOptions,
    break_out_children: bool,
    offline_tolerance: u64,
    /// Shared with the client so it survives across sessions.
    sequence: Arc<AtomicU64>,
}

impl PresenceEngine {
    pub(crate) fn new(
        registry: Arc<DeviceRegistry>,
        config: ClientConfig,
        options: &DiscoveryOptions,
        sequence: Arc<AtomicU64>,
    ) -> Self {
        Self {
            registry,
            config,
            filter: DiscoveryFilter::from_options(options),
            device_options: options.device_options,
            break_out_children: options.break_out_children,
            offline_tolerance: options.offline_tolerance,
            sequence,
        }
    }

    pub(crate) fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    /// Move to the next cycle. Wraps at `u64::MAX`.
    pub(crate) fn advance(&self) {
        let current = self.sequence();
        self.sequence
            .store(current.wrapping_add(1), Ordering::Release);
    }

    /// Mark online devices that missed `offline_tolerance` cycles offline.
    /// Runs before each probe is sent.
    pub(crate) fn scan_offline(&self) -> Vec<DiscoveryEvent> {
        let sequence = self.sequence();
        let mut events = Vec::new();

        for device in self.registry.snapshot().iter() {
            if !device.status().is_online() {
                continue;
            }
            let missed = sequence.wrapping_sub(device.last_seen());
            if missed >= self.offline_tolerance {
                info!(
                    id = %device.id().unwrap_or_default(),
                    address = %device.address(),
                    missed,
                    "device offline"
                );
                device.set_status(DeviceStatus::Offline);
                events.push(DiscoveryEvent::DeviceOffline(device.clone()));
            }
        }

        if !events.is_empty() {
            self.registry.touch();
        }
        events
    }

    /// Correlate one reply. Malformed replies are logged and dropped.
    pub(crate) fn handle_datagram(&self, datagram: &Datagram) -> Vec<DiscoveryEvent> {
        let from = datagram.from;
        let text = match std::str::from_utf8(&datagram.plaintext) {
            Ok(text) => text,
            Err(e) => {
                warn!(%from, error = %e, "discovery reply is not UTF-8, dropped");
                return Vec::new();
            }
        };
        let response: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                warn!(%from, error = %e, body = text, "discovery reply is not JSON, dropped");
                return Vec::new();
            }
        };
        let Some(raw) = response.pointer("/system/get_sysinfo").cloned() else {
            debug!(%from, "discovery reply without sysinfo, dropped");
            return Vec::new();
        };
        let info = match parse_sys_info(raw) {
            Ok(info) => info,
            Err(e) => {
                warn!(%from, error = %e, "discovery reply has unusable sysinfo, dropped");
                return Vec::new();
            }
        };

        if let Err(reason) = self.filter.check(&info) {
            debug!(%from, alias = %info.alias, ?reason, "discovery reply filtered out");
            return Vec::new();
        }

        let realtime = extract_realtime(&response, info.kind());
        self.register(from, &info, realtime.as_ref())
    }

    fn register(
        &self,
        from: SocketAddr,
        info: &SysInfo,
        realtime: Option<&Realtime>,
    ) -> Vec<DiscoveryEvent> {
        let sequence = self.sequence();
        let host = from.ip().to_string();
        let mut events = Vec::new();
        let mut refreshed = false;

        for (id, child_id) in self.units(info) {
            match self.registry.get(&id) {
                Some(device) => {
                    device.set_address(host.clone(), from.port());
                    if let Err(e) = device.set_sys_info(info.clone()) {
                        warn!(%id, %from, error = %e, "discovery reply conflicts with registered device");
                        continue;
                    }
                    if let (None, Some(rt)) = (&child_id, realtime) {
                        device.observe_realtime(rt.clone());
                    }
                    device.mark_seen(sequence);
                    debug!(%id, %from, sequence, "device online");
                    refreshed = true;
                    events.push(DiscoveryEvent::DeviceOnline(device));
                }
                None => {
                    let options = DeviceOptions {
                        host: host.clone(),
                        port: Some(from.port()),
                        child_id: child_id.clone(),
                        send: self.device_options,
                    };
                    let device = match Device::from_sys_info(info.clone(), options, &self.config) {
                        Ok(device) => device,
                        Err(e) => {
                            warn!(%id, %from, error = %e, "could not build discovered device");
                            continue;
                        }
                    };
                    if let (None, Some(rt)) = (&child_id, realtime) {
                        device.observe_realtime(rt.clone());
                    }
                    device.mark_seen(sequence);
                    info!(%id, alias = %device.alias().unwrap_or_default(), %from, "new device");
                    self.registry.upsert(id, device.clone());
                    events.push(DiscoveryEvent::DeviceNew(device));
                }
            }
        }

        if refreshed {
            self.registry.touch();
        }
        events
    }

    /// Registry keys for one reply: the unit itself, or one per outlet.
    fn units(&self, info: &SysInfo) -> Vec<(String, Option<String>)> {
        match info.children.as_deref() {
            Some(children) if self.break_out_children && !children.is_empty() => children
                .iter()
                .map(|child| {
                    let id = normalize_child_id(Some(&info.device_id), &child.id)
                        .unwrap_or_else(|_| child.id.clone());
                    (id, Some(child.id.clone()))
                })
                .collect(),
            _ => vec![(info.device_id.clone(), None)],
        }
    }
}

/// Metering piggybacked on the probe, when the module answered cleanly.
fn extract_realtime(response: &Value, kind: DeviceKind) -> Option<Realtime> {
    let result = response
        .get(kind.api_modules().emeter)?
        .get("get_realtime")?;
    if result.get("err_code").and_then(Value::as_i64) != Some(0) {
        return None;
    }
    parse_realtime(result.clone()).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine(options: &DiscoveryOptions) -> (PresenceEngine, Arc<DeviceRegistry>) {
        let registry = Arc::new(DeviceRegistry::new());
        let engine = PresenceEngine::new(
            Arc::clone(&registry),
            ClientConfig::default(),
            options,
            Arc::new(AtomicU64::new(0)),
        );
        (engine, registry)
    }

    fn reply(id: &str, kind: &str, extra: Value) -> Datagram {
        let mut sysinfo = json!({
            "err_code": 0, "deviceId": id, "alias": format!("dev {id}"), "model": "HS100",
            "sw_ver": "1", "hw_ver": "1", "type": kind, "mac": "50:c7:bf:00:00:01", "relay_state": 0
        });
        if let (Value::Object(base), Value::Object(more)) = (&mut sysinfo, extra) {
            base.extend(more);
        }
        let body = json!({
            "system": { "get_sysinfo": sysinfo },
            "emeter": { "get_realtime": { "err_code": 0, "power_mw": 4200 } }
        });
        Datagram {
            from: "192.168.1.20:9999".parse().unwrap(),
            plaintext: body.to_string().into_bytes(),
        }
    }

    /// One discovery cycle as the session runs it.
    fn cycle(engine: &PresenceEngine) -> Vec<DiscoveryEvent> {
        let events = engine.scan_offline();
        engine.advance();
        events
    }

    #[test]
    fn first_reply_registers_then_refreshes() {
        let (engine, registry) = engine(&DiscoveryOptions::default());
        cycle(&engine);

        let events = engine.handle_datagram(&reply("A", "IOT.SMARTPLUGSWITCH", json!({})));
        assert!(matches!(events.as_slice(), [DiscoveryEvent::DeviceNew(_)]));
        let device = registry.get("A").unwrap();
        assert_eq!(device.status(), DeviceStatus::Online);
        assert_eq!(device.host(), "192.168.1.20");
        assert!(device.realtime().is_some());

        let events = engine.handle_datagram(&reply("A", "IOT.SMARTPLUGSWITCH", json!({})));
        assert!(matches!(events.as_slice(), [DiscoveryEvent::DeviceOnline(_)]));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn offline_after_tolerance_cycles() {
        let (engine, registry) = engine(&DiscoveryOptions::default());
        cycle(&engine);
        engine.handle_datagram(&reply("A", "IOT.SMARTPLUGSWITCH", json!({})));

        // Three unanswered probes.
        for _ in 0..3 {
            assert!(cycle(&engine).is_empty());
        }
        let events = cycle(&engine);
        assert!(matches!(events.as_slice(), [DiscoveryEvent::DeviceOffline(_)]));
        assert_eq!(registry.get("A").unwrap().status(), DeviceStatus::Offline);

        // Reported once, not every cycle.
        assert!(cycle(&engine).is_empty());

        // Back online on the next reply; registry never dropped it.
        engine.handle_datagram(&reply("A", "IOT.SMARTPLUGSWITCH", json!({})));
        assert_eq!(registry.get("A").unwrap().status(), DeviceStatus::Online);
    }

    #[test]
    fn sequence_wraps_without_false_offline() {
        let (engine, registry) = engine(&DiscoveryOptions::default());
        engine.sequence.store(u64::MAX - 1, Ordering::Release);

        cycle(&engine);
        engine.handle_datagram(&reply("A", "IOT.SMARTPLUGSWITCH", json!({})));
        assert_eq!(engine.sequence(), u64::MAX);

        cycle(&engine);
        assert_eq!(engine.sequence(), 0);
        assert!(cycle(&engine).is_empty());
        assert_eq!(registry.get("A").unwrap().status(), DeviceStatus::Online);
    }

    #[test]
    fn malformed_replies_are_dropped() {
        let (engine, registry) = engine(&DiscoveryOptions::default());
        let from: SocketAddr = "192.168.1.9:9999".parse().unwrap();

        let bodies: [&[u8]; 4] = [
            b"\xff\xfe",
            b"not json",
            br#"{"system":{}}"#,
            br#"{"system":{"get_sysinfo":{"alias":"x"}}}"#,
        ];
        for body in bodies {
            let events = engine.handle_datagram(&Datagram { from, plaintext: body.to_vec() });
            assert!(events.is_empty());
        }
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn kind_filter_drops_other_classes() {
        let options = DiscoveryOptions {
            device_types: Some(vec![DeviceKind::Bulb]),
            ..DiscoveryOptions::default()
        };
        let (engine, registry) = engine(&options);
        assert!(engine.handle_datagram(&reply("A", "IOT.SMARTPLUGSWITCH", json!({}))).is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn children_are_broken_out() {
        let (engine, registry) = engine(&DiscoveryOptions::default());
        let children = json!({ "children": [
            { "id": "00", "state": 1, "alias": "left" },
            { "id": "STRIP01", "state": 0, "alias": "right" }
        ] });

        let events = engine.handle_datagram(&reply("STRIP", "IOT.SMARTPLUGSWITCH", children));
        assert_eq!(events.len(), 2);
        assert_eq!(registry.get("STRIP00").unwrap().alias().as_deref(), Some("left"));
        assert_eq!(registry.get("STRIP01").unwrap().alias().as_deref(), Some("right"));
        assert!(registry.get("STRIP").is_none());
    }

    #[test]
    fn children_stay_whole_when_disabled() {
        let options = DiscoveryOptions {
            break_out_children: false,
            ..DiscoveryOptions::default()
        };
        let (engine, registry) = engine(&options);
        let children = json!({ "children": [{ "id": "STRIP00", "state": 1, "alias": "left" }] });

        engine.handle_datagram(&reply("STRIP", "IOT.SMARTPLUGSWITCH", children));
        assert!(registry.get("STRIP").is_some());
        assert_eq!(registry.len(), 1);
    }
}
