// ── Lighting operations (bulbs) ──

use serde_json::json;

use super::{Device, parse_light_state};
use crate::config::SendOptions;
use crate::error::CoreError;
use crate::model::{LightState, LightStateInput};
use crate::protocol;

/// Bulb-only view of a [`Device`]. Obtained via [`Device::as_light`].
#[derive(Debug, Clone, Copy)]
pub struct Light<'a> {
    device: &'a Device,
    module: &'static str,
}

impl<'a> Light<'a> {
    pub(super) fn new(device: &'a Device) -> Self {
        let module = device
            .api_modules()
            .lightingservice
            .unwrap_or("smartlife.iot.smartbulb.lightingservice");
        Self { device, module }
    }

    /// Cached state from the last read, write, or descriptor refresh.
    pub fn light_state(&self) -> Option<LightState> {
        self.device.cached_light()
    }

    pub fn is_dimmable(&self) -> bool {
        self.flag(|i| i.is_dimmable)
    }

    pub fn is_color(&self) -> bool {
        self.flag(|i| i.is_color)
    }

    pub fn is_variable_color_temp(&self) -> bool {
        self.flag(|i| i.is_variable_color_temp)
    }

    fn flag(&self, f: impl Fn(&crate::model::SysInfo) -> Option<u8>) -> bool {
        self.device.sys_info().and_then(|i| f(i.as_ref())) == Some(1)
    }

    /// Sends `get_light_state` and caches the result.
    pub async fn get_light_state(&self, options: SendOptions) -> Result<LightState, CoreError> {
        let command = protocol::envelope(self.module, "get_light_state", json!({}));
        let result = self.device.send_unit_command(command, options).await?;
        let state = parse_light_state(result)?;
        self.device.observe_light(state.clone());
        Ok(state)
    }

    /// Sends `transition_light_state`; the reply is the new state.
    pub async fn set_light_state(
        &self,
        input: &LightStateInput,
        options: SendOptions,
    ) -> Result<LightState, CoreError> {
        let command = protocol::envelope(self.module, "transition_light_state", input.to_params());
        let result = self.device.send_unit_command(command, options).await?;
        let state = parse_light_state(result)?;
        self.device.observe_light(state.clone());
        Ok(state)
    }

    pub async fn get_power_state(&self, options: SendOptions) -> Result<bool, CoreError> {
        Ok(self.get_light_state(options).await?.is_on())
    }

    pub async fn set_power_state(&self, on: bool, options: SendOptions) -> Result<(), CoreError> {
        self.set_light_state(&LightStateInput::power(on), options)
            .await
            .map(|_| ())
    }

    /// Flip `on_off`; returns the new state.
    pub async fn toggle_power_state(&self, options: SendOptions) -> Result<bool, CoreError> {
        let on = !self.get_power_state(options).await?;
        self.set_power_state(on, options).await?;
        Ok(on)
    }
}
