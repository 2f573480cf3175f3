//! StatusAggregator: reduce a device fleet to one overall indicator.

use serde::{Deserialize, Serialize};

use crate::model::{DeviceRecord, DeviceStatus};

/// Indicator color shown on the fleet badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorColor {
    Gray,
    Green,
    Yellow,
    Red,
}

/// The aggregated fleet indicator: color plus icon name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FleetIndicator {
    pub color: IndicatorColor,
    pub icon: &'static str,
}

impl FleetIndicator {
    const fn new(color: IndicatorColor, icon: &'static str) -> Self {
        Self { color, icon }
    }
}

/// Reduce a set of device status records to one indicator.
///
/// Precedence, first match wins — the order is externally visible behavior
/// and must not be rearranged:
/// 1. empty fleet → gray
/// 2. any device in `error` → red, regardless of others
/// 3. all devices `online` → green
/// 4. at least one `online`, rest `offline` → yellow
/// 5. all devices `offline` → red
#[must_use]
pub fn aggregate(devices: &[DeviceRecord]) -> FleetIndicator {
    if devices.is_empty() {
        return FleetIndicator::new(IndicatorColor::Gray, "question-circle");
    }

    let mut online = 0usize;
    let mut offline = 0usize;
    for device in devices {
        match device.last_status {
            DeviceStatus::Error => {
                return FleetIndicator::new(IndicatorColor::Red, "exclamation-triangle");
            }
            DeviceStatus::Online => online += 1,
            DeviceStatus::Offline => offline += 1,
        }
    }

    if offline == 0 {
        FleetIndicator::new(IndicatorColor::Green, "check-circle")
    } else if online > 0 {
        FleetIndicator::new(IndicatorColor::Yellow, "exclamation-circle")
    } else {
        FleetIndicator::new(IndicatorColor::Red, "times-circle")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(status: DeviceStatus) -> DeviceRecord {
        DeviceRecord {
            id: 1,
            name: "rr".to_string(),
            ip_address: "10.0.0.1".to_string(),
            port: 40_000,
            device_ports: Some(16),
            port_descriptions: None,
            last_status: status,
            is_active: true,
        }
    }

    #[test]
    fn empty_fleet_is_gray() {
        assert_eq!(aggregate(&[]).color, IndicatorColor::Gray);
    }

    #[test]
    fn any_error_dominates_even_with_online_devices() {
        let fleet = vec![
            device(DeviceStatus::Online),
            device(DeviceStatus::Online),
            device(DeviceStatus::Error),
        ];
        assert_eq!(aggregate(&fleet).color, IndicatorColor::Red);
    }

    #[test]
    fn all_online_is_green() {
        let fleet = vec![device(DeviceStatus::Online), device(DeviceStatus::Online)];
        assert_eq!(aggregate(&fleet).color, IndicatorColor::Green);
    }

    #[test]
    fn mixed_online_offline_is_yellow() {
        let fleet = vec![device(DeviceStatus::Online), device(DeviceStatus::Offline)];
        assert_eq!(aggregate(&fleet).color, IndicatorColor::Yellow);
    }

    #[test]
    fn all_offline_is_red() {
        let fleet = vec![device(DeviceStatus::Offline), device(DeviceStatus::Offline)];
        assert_eq!(aggregate(&fleet).color, IndicatorColor::Red);
    }

    #[test]
    fn single_error_fleet_is_red() {
        assert_eq!(
            aggregate(&[device(DeviceStatus::Error)]).color,
            IndicatorColor::Red
        );
    }
}
