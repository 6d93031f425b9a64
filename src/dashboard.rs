//! Dashboard state: configuration plus live pin values.
//!
//! DESIGN
//! ======
//! Configuration (devices, tags, widgets, share token, active and shared
//! flags) is fixed once a dashboard is loaded. Live state is interior-mutable
//! so one `Arc<Dashboard>` can be shared by every connection task:
//! - pin values live in a lock-guarded map keyed by (device, pin type, pin).
//! - device-selector choices live in their own map keyed by widget id.
//!
//! Writes are "last write accepted": nothing here knows or cares whether the
//! value ever reached hardware.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{PoisonError, RwLock};

use serde::Deserialize;

use crate::codec::PinType;
use crate::target::{Target, TargetKind};

// =============================================================================
// CONFIGURATION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Device {
    pub id: i32,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Tag {
    pub id: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub device_ids: Vec<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    Button,
    Slider,
    Terminal,
    ValueDisplay,
    Gauge,
    DeviceSelector,
}

impl WidgetKind {
    /// Widgets that poll their pin on a schedule instead of on demand.
    #[must_use]
    pub fn is_frequency(self) -> bool {
        matches!(self, Self::ValueDisplay | Self::Gauge)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Widget {
    pub id: i64,
    pub kind: WidgetKind,
    /// Device or tag the widget is bound to.
    #[serde(default)]
    pub device_id: i32,
    #[serde(default)]
    pub pin_type: Option<PinType>,
    #[serde(default)]
    pub pin: Option<u8>,
    /// Initial choice for device-selector widgets.
    #[serde(default)]
    pub selected_device: Option<i32>,
}

impl Widget {
    fn is_bound_to(&self, device_id: i32, pin_type: PinType, pin: u8) -> bool {
        self.device_id == device_id && self.pin_type == Some(pin_type) && self.pin == Some(pin)
    }
}

/// Dashboard as described by the profile store.
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    pub id: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_shared: bool,
    #[serde(default)]
    pub share_token: Option<String>,
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub widgets: Vec<Widget>,
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no dashboard with id {0}")]
pub struct NoSuchDashboard(pub i32);

// =============================================================================
// PIN STATE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinKey {
    pub device_id: i32,
    pub pin_type: PinType,
    pub pin: u8,
}


// =============================================================================
// DASHBOARD
// =============================================================================

pub struct Dashboard {
    pub id: i32,
    pub name: String,
    pub share_token: Option<String>,
    pub devices: Vec<Device>,
    pub tags: Vec<Tag>,
    pub widgets: Vec<Widget>,
    active: bool,
    shared: bool,
    /// Milliseconds since Unix epoch of the last accepted pin write.
    updated_at: AtomicI64,
    pins: RwLock<HashMap<PinKey, String>>,
    selections: RwLock<HashMap<i64, i32>>,
}

impl Dashboard {
    #[must_use]
    pub fn from_config(config: DashboardConfig) -> Self {
        let selections = config
            .widgets
            .iter()
            .filter(|w| w.kind == WidgetKind::DeviceSelector)
            .filter_map(|w| w.selected_device.map(|device_id| (w.id, device_id)))
            .collect();

        Self {
            id: config.id,
            name: config.name,
            share_token: config.share_token,
            devices: config.devices,
            tags: config.tags,
            widgets: config.widgets,
            active: config.is_active,
            shared: config.is_shared,
            updated_at: AtomicI64::new(0),
            pins: RwLock::new(HashMap::new()),
            selections: RwLock::new(selections),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn is_shared(&self) -> bool {
        self.shared
    }

    /// Milliseconds since Unix epoch of the last accepted pin write, 0 if none.
    #[must_use]
    pub fn updated_at(&self) -> i64 {
        self.updated_at.load(Ordering::Acquire)
    }

    // -------------------------------------------------------------------------
    // Targets
    // -------------------------------------------------------------------------

    /// Resolve a target id. `None` when nothing with that id is configured.
    #[must_use]
    pub fn target(&self, target_id: i32) -> Option<Target> {
        match TargetKind::of(target_id) {
            TargetKind::Device => self
                .devices
                .iter()
                .any(|d| d.id == target_id)
                .then(|| Target::device(target_id)),
            TargetKind::Tag => self
                .tags
                .iter()
                .find(|t| t.id == target_id)
                .map(|t| Target::Tag { id: t.id, device_ids: t.device_ids.clone() }),
            TargetKind::DeviceSelector => {
                let widget = self.widget(i64::from(target_id))?;
                if widget.kind != WidgetKind::DeviceSelector {
                    return None;
                }
                Some(Target::device_selector(target_id, self.selected_device(widget.id)))
            }
        }
    }

    // -------------------------------------------------------------------------
    // Widgets
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn widget(&self, widget_id: i64) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.id == widget_id)
    }

    /// Widget bound to `(target_id, pin_type, pin)`, if any.
    #[must_use]
    pub fn find_widget_by_pin(&self, target_id: i32, pin_type: PinType, pin: u8) -> Option<&Widget> {
        self.widgets
            .iter()
            .find(|w| w.is_bound_to(target_id, pin_type, pin))
    }

    #[must_use]
    pub fn selected_device(&self, widget_id: i64) -> Option<i32> {
        self.selections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&widget_id)
            .copied()
    }

    /// Point a device-selector widget at `device_id`.
    pub fn select_device(&self, widget_id: i64, device_id: i32) {
        self.selections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(widget_id, device_id);
    }

    // -------------------------------------------------------------------------
    // Pin state
    // -------------------------------------------------------------------------

    /// Record the last value written to a device pin.
    pub fn update(&self, device_id: i32, pin_type: PinType, pin: u8, value: &str, now: i64) {
        let key = PinKey { device_id, pin_type, pin };
        self.pins
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value.to_owned());
        self.updated_at.fetch_max(now, Ordering::AcqRel);
    }

    #[cfg(test)]
    #[must_use]
    pub fn pin_value(&self, device_id: i32, pin_type: PinType, pin: u8) -> Option<String> {
        let key = PinKey { device_id, pin_type, pin };
        self.pins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    /// Stored values for one device, ordered by pin type then pin.
    #[must_use]
    pub fn device_pins(&self, device_id: i32) -> Vec<(PinKey, String)> {
        let pins = self.pins.read().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<(PinKey, String)> = pins
            .iter()
            .filter(|(key, _)| key.device_id == device_id)
            .map(|(key, value)| (*key, value.clone()))
            .collect();
        out.sort_by_key(|(key, _)| (key.pin_type.as_char(), key.pin));
        out
    }

    /// Number of stored pin values across all devices.
    #[cfg(test)]
    #[must_use]
    pub fn pin_count(&self) -> usize {
        self.pins.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("active", &self.is_active())
            .field("shared", &self.is_shared())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;
