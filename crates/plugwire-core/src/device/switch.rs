// ── Relay operations (plugs) ──

use serde_json::json;

use super::Device;
use crate::config::SendOptions;
use crate::error::CoreError;
use crate::model::Realtime;
use crate::protocol;

/// Plug-only view of a [`Device`]. Obtained via [`Device::as_switch`].
#[derive(Debug, Clone, Copy)]
pub struct Switch<'a> {
    device: &'a Device,
}

impl<'a> Switch<'a> {
    pub(super) fn new(device: &'a Device) -> Self {
        Self { device }
    }

    /// Relay state from the cached descriptor (the outlet's state for
    /// child devices).
    pub fn relay_state(&self) -> Option<bool> {
        let info = self.device.sys_info()?;
        self.device.relay_state_in(&info)
    }

    /// Last relay state observed by this handle, whether read or written.
    pub fn power_state(&self) -> Option<bool> {
        self.device.cached_power()
    }

    /// Re-read the descriptor and return the relay state.
    pub async fn get_power_state(&self, options: SendOptions) -> Result<bool, CoreError> {
        let info = self.device.get_sys_info(options).await?;
        self.device
            .relay_state_in(&info)
            .ok_or_else(|| CoreError::Decode {
                message: "descriptor has no relay state".into(),
                body: serde_json::to_string(&*info).unwrap_or_default(),
            })
    }

    /// Sends `system.set_relay_state`. Scoped to the outlet for child devices.
    pub async fn set_power_state(&self, on: bool, options: SendOptions) -> Result<(), CoreError> {
        let command = protocol::envelope(
            self.device.api_modules().system,
            "set_relay_state",
            json!({ "state": u8::from(on) }),
        );
        self.device.send_command(command, options).await?;

        let outlet = self.device.id().filter(|_| self.device.child_id().is_some());
        self.device.update_sys_info(|info| {
            match outlet.as_deref().and_then(|id| info.child_mut(id)) {
                Some(child) => child.state = u8::from(on),
                None => info.relay_state = Some(u8::from(on)),
            }
        });
        self.device.observe_power(on);
        Ok(())
    }

    /// Flip the relay; returns the new state.
    pub async fn toggle_power_state(&self, options: SendOptions) -> Result<bool, CoreError> {
        let on = !self.get_power_state(options).await?;
        self.set_power_state(on, options).await?;
        Ok(on)
    }

    pub async fn get_realtime(&self, options: SendOptions) -> Result<Realtime, CoreError> {
        self.device.get_realtime(options).await
    }
}
