// ── Device entity ──
//
// A cloneable handle over shared device state. The descriptor, address,
// and cached sub-states are swapped atomically so discovery, polling and
// callers can touch the same device concurrently without locks.

mod lighting;
mod polling;
mod switch;

pub use lighting::Light;
pub use polling::PollingHandle;
pub use switch::Switch;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use arc_swap::{ArcSwap, ArcSwapOption};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::{broadcast, watch};
use tracing::{debug, error};

use plugwire_api::TransportConfig;

use crate::config::{ClientConfig, SendOptions};
use crate::error::CoreError;
use crate::event::DeviceEvent;
use crate::model::{
    ApiModules, DeviceKind, DeviceStatus, LightState, MacAddress, Realtime, SysInfo,
};
use crate::protocol::{self, attach_child_ids, normalize_child_id, process_response};

const EVENT_CHANNEL_SIZE: usize = 64;

// Relay cache encoding.
const POWER_UNKNOWN: u8 = 0;
const POWER_OFF: u8 = 1;
const POWER_ON: u8 = 2;

// ── Construction ─────────────────────────────────────────────────────

/// Network location of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceAddress {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// How to reach a device and how to talk to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceOptions {
    pub host: String,
    pub port: Option<u16>,
    /// Outlet of a multi-outlet unit; short (`"1"`) or full form.
    pub child_id: Option<String>,
    /// Defaults for every call on this device.
    pub send: SendOptions,
}

impl DeviceOptions {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            child_id: None,
            send: SendOptions::default(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_child_id(mut self, child_id: impl Into<String>) -> Self {
        self.child_id = Some(child_id.into());
        self
    }

    pub fn with_send_options(mut self, send: SendOptions) -> Self {
        self.send = send;
        self
    }
}

/// Result of [`Device::get_info`].
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub sys_info: Arc<SysInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light_state: Option<LightState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realtime: Option<Realtime>,
}

// ── Device ───────────────────────────────────────────────────────────

/// A plug, bulb, or generic device.
///
/// Cheaply cloneable; all clones share the same cached state and event
/// channel. Variant-specific operations are reached through
/// [`as_switch`](Self::as_switch) and [`as_light`](Self::as_light).
#[derive(Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

struct DeviceInner {
    address: ArcSwap<DeviceAddress>,
    child_id: Option<String>,
    sys_info: ArcSwapOption<SysInfo>,
    transport: TransportConfig,
    status: watch::Sender<DeviceStatus>,
    /// Discovery sequence number of the last reply.
    last_seen: AtomicU64,
    last_seen_at: ArcSwapOption<DateTime<Utc>>,
    power: AtomicU8,
    light: ArcSwapOption<LightState>,
    realtime: ArcSwapOption<Realtime>,
    events: broadcast::Sender<DeviceEvent>,
}

impl Device {
    pub fn new(options: DeviceOptions, config: &ClientConfig) -> Self {
        let (status, _) = watch::channel(DeviceStatus::Unknown);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let address = DeviceAddress {
            host: options.host,
            port: options.port.unwrap_or(config.default_port),
        };

        Self {
            inner: Arc::new(DeviceInner {
                address: ArcSwap::from_pointee(address),
                child_id: options.child_id,
                sys_info: ArcSwapOption::empty(),
                transport: options.send.apply(config.transport),
                status,
                last_seen: AtomicU64::new(0),
                last_seen_at: ArcSwapOption::empty(),
                power: AtomicU8::new(POWER_UNKNOWN),
                light: ArcSwapOption::empty(),
                realtime: ArcSwapOption::empty(),
                events,
            }),
        }
    }

    /// Build from an already-fetched descriptor.
    pub fn from_sys_info(
        sys_info: SysInfo,
        options: DeviceOptions,
        config: &ClientConfig,
    ) -> Result<Self, CoreError> {
        let device = Self::new(options, config);
        device.set_sys_info(sys_info)?;
        Ok(device)
    }

    // ── Identity ─────────────────────────────────────────────────────

    /// Stable identifier: the descriptor's `deviceId`, or the full child
    /// id for an outlet. `None` until a descriptor is known.
    pub fn id(&self) -> Option<String> {
        let info = self.sys_info()?;
        match &self.inner.child_id {
            Some(child) => normalize_child_id(Some(&info.device_id), child).ok(),
            None => Some(info.device_id.clone()),
        }
    }

    /// `deviceId` of the physical unit (same as [`id`](Self::id) unless
    /// this is an outlet).
    pub fn parent_id(&self) -> Option<String> {
        self.sys_info().map(|info| info.device_id.clone())
    }

    pub fn child_id(&self) -> Option<&str> {
        self.inner.child_id.as_deref()
    }

    /// Alias of the outlet for child devices, of the unit otherwise.
    pub fn alias(&self) -> Option<String> {
        let info = self.sys_info()?;
        if let Some(id) = self.full_child_id(&info) {
            if let Some(child) = info.child(&id) {
                return Some(child.alias.clone());
            }
        }
        Some(info.alias.clone())
    }

    pub fn model(&self) -> Option<String> {
        self.sys_info().map(|info| info.model.clone())
    }

    pub fn software_version(&self) -> Option<String> {
        self.sys_info().map(|info| info.sw_ver.clone())
    }

    pub fn hardware_version(&self) -> Option<String> {
        self.sys_info().map(|info| info.hw_ver.clone())
    }

    pub fn kind(&self) -> DeviceKind {
        self.sys_info().map_or(DeviceKind::Generic, |info| info.kind())
    }

    pub fn api_modules(&self) -> &'static ApiModules {
        self.kind().api_modules()
    }

    pub fn mac(&self) -> MacAddress {
        self.sys_info()
            .map(|info| info.mac_address())
            .unwrap_or_default()
    }

    pub fn supports_emeter(&self) -> bool {
        self.sys_info().is_some_and(|info| info.supports_emeter())
    }

    /// Last fetched descriptor.
    pub fn sys_info(&self) -> Option<Arc<SysInfo>> {
        self.inner.sys_info.load_full()
    }

    // ── Address & presence ───────────────────────────────────────────

    pub fn address(&self) -> Arc<DeviceAddress> {
        self.inner.address.load_full()
    }

    pub fn host(&self) -> String {
        self.inner.address.load().host.clone()
    }

    pub fn port(&self) -> u16 {
        self.inner.address.load().port
    }

    pub(crate) fn set_address(&self, host: String, port: u16) {
        let current = self.inner.address.load();
        if current.host != host || current.port != port {
            debug!(from = %current, to = %format!("{host}:{port}"), "device address changed");
            self.inner.address.store(Arc::new(DeviceAddress { host, port }));
        }
    }

    pub fn status(&self) -> DeviceStatus {
        *self.inner.status.borrow()
    }

    /// Watch presence transitions.
    pub fn subscribe_status(&self) -> watch::Receiver<DeviceStatus> {
        self.inner.status.subscribe()
    }

    pub(crate) fn set_status(&self, status: DeviceStatus) {
        let _ = self.inner.status.send_replace(status);
    }

    /// Discovery sequence number of the last reply.
    pub fn last_seen(&self) -> u64 {
        self.inner.last_seen.load(Ordering::Acquire)
    }

    pub fn last_seen_at(&self) -> Option<DateTime<Utc>> {
        self.inner.last_seen_at.load_full().map(|t| *t)
    }

    pub(crate) fn mark_seen(&self, sequence: u64) {
        self.inner.last_seen.store(sequence, Ordering::Release);
        self.inner.last_seen_at.store(Some(Arc::new(Utc::now())));
        self.set_status(DeviceStatus::Online);
    }

    // ── Events ───────────────────────────────────────────────────────

    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn emit(&self, event: DeviceEvent) {
        let _ = self.inner.events.send(event);
    }

    // ── Variants ─────────────────────────────────────────────────────

    /// Relay operations. Fails unless the descriptor says plug.
    pub fn as_switch(&self) -> Result<Switch<'_>, CoreError> {
        match self.kind() {
            DeviceKind::Plug => Ok(Switch::new(self)),
            other => Err(unsupported("switch", DeviceKind::Plug, other)),
        }
    }

    /// Lighting operations. Fails unless the descriptor says bulb.
    pub fn as_light(&self) -> Result<Light<'_>, CoreError> {
        match self.kind() {
            DeviceKind::Bulb => Ok(Light::new(self)),
            other => Err(unsupported("light", DeviceKind::Bulb, other)),
        }
    }

    // ── Descriptor ───────────────────────────────────────────────────

    /// Replace the cached descriptor and refresh derived state.
    ///
    /// The device id and class are fixed once known; a descriptor for a
    /// different device fails with [`CoreError::IdentityMismatch`].
    pub fn set_sys_info(&self, info: SysInfo) -> Result<Arc<SysInfo>, CoreError> {
        let info = Arc::new(info);
        let mut mismatch = None;
        self.inner.sys_info.rcu(|current| {
            mismatch = current.as_deref().and_then(|current| identity_mismatch(current, &info));
            match mismatch {
                Some(_) => current.clone(),
                None => Some(Arc::clone(&info)),
            }
        });
        if let Some(err) = mismatch {
            return Err(err);
        }

        self.observe_sys_info(&info);
        Ok(info)
    }

    fn observe_sys_info(&self, info: &SysInfo) {
        match info.kind() {
            DeviceKind::Plug => {
                if let Some(on) = self.relay_state_in(info) {
                    self.observe_power(on);
                }
            }
            DeviceKind::Bulb => {
                if let Some(state) = &info.light_state {
                    self.observe_light(strip_err_code(state.clone()));
                }
            }
            DeviceKind::Generic => {}
        }
    }

    /// Apply `f` to a copy of the cached descriptor and swap it in.
    /// `f` reruns if another writer got there first.
    pub(crate) fn update_sys_info(&self, f: impl Fn(&mut SysInfo)) {
        self.inner.sys_info.rcu(|current| {
            current.as_ref().map(|current| {
                let mut next = SysInfo::clone(current);
                f(&mut next);
                Arc::new(next)
            })
        });
    }

    fn full_child_id(&self, info: &SysInfo) -> Option<String> {
        let child = self.inner.child_id.as_deref()?;
        normalize_child_id(Some(&info.device_id), child).ok()
    }

    pub(crate) fn relay_state_in(&self, info: &SysInfo) -> Option<bool> {
        match self.full_child_id(info) {
            Some(id) => info.child(&id).map(|c| c.state == 1),
            None => info.relay_state.map(|s| s == 1),
        }
    }

    // ── Change detection ─────────────────────────────────────────────

    pub(crate) fn cached_power(&self) -> Option<bool> {
        match self.inner.power.load(Ordering::Acquire) {
            POWER_ON => Some(true),
            POWER_OFF => Some(false),
            _ => None,
        }
    }

    pub(crate) fn observe_power(&self, on: bool) {
        let next = if on { POWER_ON } else { POWER_OFF };
        let previous = self.inner.power.swap(next, Ordering::AcqRel);
        if previous != next {
            self.emit(if on {
                DeviceEvent::PowerOn
            } else {
                DeviceEvent::PowerOff
            });
        }
        self.emit(DeviceEvent::PowerUpdate { on });
    }

    pub(crate) fn cached_light(&self) -> Option<LightState> {
        self.inner.light.load_full().map(|s| (*s).clone())
    }

    pub(crate) fn observe_light(&self, state: LightState) {
        let previous = self.inner.light.swap(Some(Arc::new(state.clone())));
        let was_on = previous.as_deref().map(LightState::is_on);

        if was_on != Some(state.is_on()) {
            self.emit(if state.is_on() {
                DeviceEvent::LightStateOn(state.clone())
            } else {
                DeviceEvent::LightStateOff(state.clone())
            });
        }
        if previous.as_deref() != Some(&state) {
            self.emit(DeviceEvent::LightStateChange(state.clone()));
        }
        self.emit(DeviceEvent::LightStateUpdate(state));
    }

    pub(crate) fn cached_realtime(&self) -> Option<Realtime> {
        self.inner.realtime.load_full().map(|r| (*r).clone())
    }

    pub(crate) fn observe_realtime(&self, realtime: Realtime) {
        self.inner.realtime.store(Some(Arc::new(realtime.clone())));
        self.emit(DeviceEvent::EmeterRealtimeUpdate(realtime));
    }

    // ── Transport ────────────────────────────────────────────────────

    fn transport_for(&self, options: SendOptions) -> TransportConfig {
        options.apply(self.inner.transport)
    }

    /// Send raw text and return the decoded reply, without envelope
    /// processing.
    pub async fn send(&self, payload: &str, options: SendOptions) -> Result<String, CoreError> {
        let address = self.address();
        let transport = self.transport_for(options);
        debug!(%address, transport = %transport.kind, "device send");

        transport
            .send(&address.host, address.port, payload)
            .await
            .map_err(|e| {
                error!(%address, error = %e, "device send failed");
                CoreError::from(e)
            })
    }

    // ── Command protocol ─────────────────────────────────────────────

    /// Send a command envelope and return the validated result.
    ///
    /// Scoped to this device's outlet when it has a child id. A single
    /// operation returns its result object; a batch returns the
    /// request-shaped envelope.
    pub async fn send_command(&self, command: Value, options: SendOptions) -> Result<Value, CoreError> {
        let child_ids = self.inner.child_id.iter().cloned().collect::<Vec<_>>();
        self.dispatch(command, &child_ids, options).await
    }

    /// Send a command scoped to explicit outlets (short or full ids).
    pub async fn send_command_to(
        &self,
        command: Value,
        child_ids: &[String],
        options: SendOptions,
    ) -> Result<Value, CoreError> {
        self.dispatch(command, child_ids, options).await
    }

    /// Send a command addressed to the whole unit.
    pub(crate) async fn send_unit_command(
        &self,
        command: Value,
        options: SendOptions,
    ) -> Result<Value, CoreError> {
        self.dispatch(command, &[], options).await
    }

    async fn dispatch(
        &self,
        mut command: Value,
        child_ids: &[String],
        options: SendOptions,
    ) -> Result<Value, CoreError> {
        protocol::validate_command(&command)?;

        if !child_ids.is_empty() {
            let parent = self.parent_id();
            let normalized = child_ids
                .iter()
                .map(|id| normalize_child_id(parent.as_deref(), id))
                .collect::<Result<Vec<_>, _>>()?;
            attach_child_ids(&mut command, normalized);
        }

        let reply = self.send(&command.to_string(), options).await?;
        let response = protocol::parse_response(&reply)?;
        process_response(&command, &response)
    }

    // ── Common operations ────────────────────────────────────────────

    /// Fetch and cache the descriptor.
    pub async fn get_sys_info(&self, options: SendOptions) -> Result<Arc<SysInfo>, CoreError> {
        debug!(host = %self.host(), "get_sys_info");
        let command = protocol::envelope("system", "get_sysinfo", json!({}));
        let result = self.send_unit_command(command, options).await?;
        self.set_sys_info(parse_sys_info(result)?)
    }

    pub async fn get_model(&self, options: SendOptions) -> Result<String, CoreError> {
        Ok(self.get_sys_info(options).await?.model.clone())
    }

    /// Rename the device (or outlet). The cached alias is updated on success.
    pub async fn set_alias(&self, alias: &str, options: SendOptions) -> Result<(), CoreError> {
        let command = protocol::envelope(
            self.api_modules().system,
            "set_dev_alias",
            json!({ "alias": alias }),
        );
        self.send_command(command, options).await?;

        let child = self.sys_info().and_then(|info| self.full_child_id(&info));
        self.update_sys_info(|info| match child.as_deref().and_then(|id| info.child_mut(id)) {
            Some(outlet) => outlet.alias = alias.to_owned(),
            None => info.alias = alias.to_owned(),
        });
        Ok(())
    }

    pub async fn set_location(
        &self,
        latitude: f64,
        longitude: f64,
        options: SendOptions,
    ) -> Result<Value, CoreError> {
        let command = protocol::envelope(
            self.api_modules().system,
            "set_dev_location",
            json!({
                "latitude": latitude,
                "longitude": longitude,
                "latitude_i": fixed_point(latitude),
                "longitude_i": fixed_point(longitude),
            }),
        );
        self.send_unit_command(command, options).await
    }

    /// Reboot after `delay` seconds.
    pub async fn reboot(&self, delay: u32, options: SendOptions) -> Result<Value, CoreError> {
        let command = protocol::envelope(self.api_modules().system, "reboot", json!({ "delay": delay }));
        self.send_unit_command(command, options).await
    }

    /// Factory reset after `delay` seconds.
    pub async fn reset(&self, delay: u32, options: SendOptions) -> Result<Value, CoreError> {
        let command = protocol::envelope(self.api_modules().system, "reset", json!({ "delay": delay }));
        self.send_unit_command(command, options).await
    }

    /// Refresh everything the variant caches: descriptor, light state for
    /// bulbs, and metering when supported.
    pub async fn get_info(&self, options: SendOptions) -> Result<DeviceInfo, CoreError> {
        let sys_info = self.get_sys_info(options).await?;

        let light_state = match self.as_light() {
            Ok(light) => Some(light.get_light_state(options).await?),
            Err(_) => None,
        };

        let realtime = if sys_info.supports_emeter() {
            Some(self.get_realtime(options).await?)
        } else {
            None
        };

        Ok(DeviceInfo {
            sys_info: self.sys_info().unwrap_or(sys_info),
            light_state,
            realtime,
        })
    }

    /// Read live metering from the class-appropriate emeter module.
    pub async fn get_realtime(&self, options: SendOptions) -> Result<Realtime, CoreError> {
        let command = protocol::envelope(self.api_modules().emeter, "get_realtime", json!({}));
        let result = self.send_command(command, options).await?;
        let realtime = parse_realtime(result)?;
        self.observe_realtime(realtime.clone());
        Ok(realtime)
    }

    /// Cached result of the last metering read.
    pub fn realtime(&self) -> Option<Realtime> {
        self.cached_realtime()
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id())
            .field("address", &*self.address())
            .field("kind", &self.kind())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn unsupported(operation: &str, required: DeviceKind, found: DeviceKind) -> CoreError {
    CoreError::Unsupported {
        operation: operation.to_owned(),
        required: format!("{required} device, found {found}"),
    }
}

/// Degrees to the 1e-4 fixed point the firmware stores.
#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
fn fixed_point(degrees: f64) -> i64 {
    (degrees * 10_000.0).round() as i64
}

pub(crate) fn parse_sys_info(value: Value) -> Result<SysInfo, CoreError> {
    decode_result(value, "sysinfo")
}

pub(crate) fn parse_realtime(value: Value) -> Result<Realtime, CoreError> {
    let mut realtime: Realtime = decode_result(value, "realtime")?;
    realtime.extra.remove("err_code");
    Ok(realtime)
}

pub(crate) fn parse_light_state(value: Value) -> Result<LightState, CoreError> {
    decode_result(value, "light state").map(strip_err_code)
}

fn strip_err_code(mut state: LightState) -> LightState {
    state.extra.remove("err_code");
    state
}

fn decode_result<T: serde::de::DeserializeOwned>(value: Value, what: &str) -> Result<T, CoreError> {
    let body = value.to_string();
    serde_json::from_value(value).map_err(|e| CoreError::Decode {
        message: format!("unexpected {what} shape: {e}"),
        body,
    })
}

/// Id or class differs from the cached descriptor.
fn identity_mismatch(current: &SysInfo, next: &SysInfo) -> Option<CoreError> {
    if current.device_id != next.device_id {
        return Some(CoreError::IdentityMismatch {
            expected: current.device_id.clone(),
            got: next.device_id.clone(),
        });
    }
    if current.kind() != next.kind() {
        return Some(CoreError::IdentityMismatch {
            expected: format!("{} ({})", current.device_id, current.kind()),
            got: format!("{} ({})", next.device_id, next.kind()),
        });
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use plugwire_api::DEFAULT_PORT;

    fn plug_info(id: &str, relay: u8) -> SysInfo {
        serde_json::from_value(json!({
            "deviceId": id,
            "alias": "Plug",
            "model": "HS100(US)",
            "sw_ver": "1.0",
            "hw_ver": "1.0",
            "type": "IOT.SMARTPLUGSWITCH",
            "mac": "aa:bb:cc:00:11:22",
            "feature": "TIM",
            "relay_state": relay
        }))
        .unwrap()
    }

    fn bulb_info(on: u8, brightness: u8) -> SysInfo {
        serde_json::from_value(json!({
            "deviceId": "BULB1",
            "alias": "Bulb",
            "model": "LB100",
            "sw_ver": "1.0",
            "hw_ver": "1.0",
            "mic_type": "IOT.SMARTBULB",
            "light_state": { "on_off": on, "brightness": brightness }
        }))
        .unwrap()
    }

    fn device() -> Device {
        Device::new(DeviceOptions::new("127.0.0.1"), &ClientConfig::default())
    }

    fn drain(rx: &mut broadcast::Receiver<DeviceEvent>) -> Vec<DeviceEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[test]
    fn attributes_unknown_until_descriptor() {
        let d = device();
        assert!(d.id().is_none());
        assert_eq!(d.kind(), DeviceKind::Generic);
        assert_eq!(d.status(), DeviceStatus::Unknown);
        assert_eq!(d.port(), DEFAULT_PORT);
    }

    #[test]
    fn identity_is_derived_from_descriptor() {
        let d = device();
        d.set_sys_info(plug_info("ABC", 0)).unwrap();
        assert_eq!(d.id().as_deref(), Some("ABC"));
        assert_eq!(d.mac().as_str(), "AABBCC001122");
        assert!(d.as_switch().is_ok());
        assert!(d.as_light().is_err());
    }

    #[test]
    fn reassigning_identity_fails() {
        let d = device();
        d.set_sys_info(plug_info("ABC", 0)).unwrap();
        let err = d.set_sys_info(plug_info("XYZ", 0)).unwrap_err();
        assert!(matches!(err, CoreError::IdentityMismatch { .. }));
        assert_eq!(d.id().as_deref(), Some("ABC"));
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let d = device();
        d.set_sys_info(plug_info("ABC", 0)).unwrap();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..200 {
                        d.update_sys_info(|info| info.alias.push('x'));
                    }
                });
            }
        });

        assert_eq!(d.sys_info().unwrap().alias.len(), "Plug".len() + 8 * 200);
    }

    #[test]
    fn update_without_descriptor_is_a_no_op() {
        let d = device();
        d.update_sys_info(|info| info.alias.push('x'));
        assert!(d.sys_info().is_none());
    }

    #[test]
    fn child_device_resolves_outlet() {
        let mut info = plug_info("UNIT", 0);
        info.children = Some(
            serde_json::from_value(json!([
                { "id": "UNIT00", "state": 0, "alias": "Left" },
                { "id": "UNIT01", "state": 1, "alias": "Right" }
            ]))
            .unwrap(),
        );
        let d = Device::from_sys_info(
            info,
            DeviceOptions::new("10.0.0.2").with_child_id("1"),
            &ClientConfig::default(),
        )
        .unwrap();

        assert_eq!(d.id().as_deref(), Some("UNIT01"));
        assert_eq!(d.parent_id().as_deref(), Some("UNIT"));
        assert_eq!(d.alias().as_deref(), Some("Right"));
        assert_eq!(d.as_switch().unwrap().relay_state(), Some(true));
    }

    #[test]
    fn relay_transitions_raise_power_events() {
        let d = device();
        let mut rx = d.subscribe();

        d.set_sys_info(plug_info("ABC", 1)).unwrap();
        let first = drain(&mut rx);
        assert!(matches!(first[0], DeviceEvent::PowerOn));
        assert!(matches!(first[1], DeviceEvent::PowerUpdate { on: true }));

        d.set_sys_info(plug_info("ABC", 1)).unwrap();
        let same = drain(&mut rx);
        assert_eq!(same.len(), 1);
        assert!(matches!(same[0], DeviceEvent::PowerUpdate { on: true }));

        d.set_sys_info(plug_info("ABC", 0)).unwrap();
        let off = drain(&mut rx);
        assert!(matches!(off[0], DeviceEvent::PowerOff));
    }

    #[test]
    fn light_change_without_transition_raises_only_change() {
        let d = device();
        d.set_sys_info(bulb_info(1, 50)).unwrap();
        let mut rx = d.subscribe();

        d.set_sys_info(bulb_info(1, 80)).unwrap();
        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], DeviceEvent::LightStateChange(_)));
        assert!(matches!(events[1], DeviceEvent::LightStateUpdate(_)));
    }

    #[test]
    fn light_transition_raises_binary_and_change() {
        let d = device();
        d.set_sys_info(bulb_info(1, 50)).unwrap();
        let mut rx = d.subscribe();

        d.set_sys_info(bulb_info(0, 50)).unwrap();
        let events = drain(&mut rx);
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], DeviceEvent::LightStateOff(_)));
        assert!(matches!(events[1], DeviceEvent::LightStateChange(_)));
        assert!(matches!(events[2], DeviceEvent::LightStateUpdate(_)));

        d.set_sys_info(bulb_info(0, 50)).unwrap();
        let unchanged = drain(&mut rx);
        assert_eq!(unchanged.len(), 1);
    }

    #[test]
    fn location_is_fixed_point() {
        assert_eq!(fixed_point(37.774_929), 377_749);
        assert_eq!(fixed_point(-122.419_416), -1_224_194);
    }
}
