// ── Discovery reply filter ──
//
// Decides which replying devices get registered. Kind filter first, then
// the MAC deny list, then the allow list.

use crate::config::DiscoveryOptions;
use crate::model::{DeviceKind, SysInfo};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryFilter {
    pub device_types: Option<Vec<DeviceKind>>,
    pub mac_addresses: Vec<String>,
    pub exclude_mac_addresses: Vec<String>,
}

/// Why a reply was filtered out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Kind(DeviceKind),
    Excluded,
    NotAllowed,
}

impl DiscoveryFilter {
    pub fn from_options(options: &DiscoveryOptions) -> Self {
        Self {
            device_types: options.device_types.clone(),
            mac_addresses: options.mac_addresses.clone(),
            exclude_mac_addresses: options.exclude_mac_addresses.clone(),
        }
    }

    pub fn check(&self, info: &SysInfo) -> Result<(), Rejection> {
        if let Some(types) = &self.device_types {
            let kind = info.kind();
            if !types.contains(&kind) {
                return Err(Rejection::Kind(kind));
            }
        }

        let mac = info.mac_address();
        if mac.matches_any(&self.exclude_mac_addresses) {
            return Err(Rejection::Excluded);
        }
        if !self.mac_addresses.is_empty() && !mac.matches_any(&self.mac_addresses) {
            return Err(Rejection::NotAllowed);
        }
        Ok(())
    }

    pub fn matches(&self, info: &SysInfo) -> bool {
        self.check(info).is_ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn info(kind: &str, mac: &str) -> SysInfo {
        serde_json::from_value(json!({
            "deviceId": "X", "alias": "a", "model": "m", "sw_ver": "1", "hw_ver": "1",
            "type": kind, "mac": mac
        }))
        .unwrap()
    }

    #[test]
    fn empty_filter_allows_everything() {
        assert!(DiscoveryFilter::default().matches(&info("IOT.SMARTBULB", "aa:bb:cc:00:00:01")));
    }

    #[test]
    fn kind_filter() {
        let filter = DiscoveryFilter {
            device_types: Some(vec![DeviceKind::Plug]),
            ..DiscoveryFilter::default()
        };
        assert!(filter.matches(&info("IOT.SMARTPLUGSWITCH", "aa")));
        assert_eq!(
            filter.check(&info("IOT.SMARTBULB", "aa")),
            Err(Rejection::Kind(DeviceKind::Bulb))
        );
    }

    #[test]
    fn deny_list_wins_over_allow_list() {
        let filter = DiscoveryFilter {
            device_types: None,
            mac_addresses: vec!["aa:bb:cc:*".into()],
            exclude_mac_addresses: vec!["*:ff".into()],
        };
        assert!(filter.matches(&info("IOT.SMARTPLUGSWITCH", "aa:bb:cc:00:00:01")));
        assert_eq!(
            filter.check(&info("IOT.SMARTPLUGSWITCH", "aa:bb:cc:00:00:ff")),
            Err(Rejection::Excluded)
        );
        assert_eq!(
            filter.check(&info("IOT.SMARTPLUGSWITCH", "11:22:33:00:00:01")),
            Err(Rejection::NotAllowed)
        );
    }
}
