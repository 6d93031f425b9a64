//! Command targets: the logical addressee of a pin command.
//!
//! Targets are resolved from a dashboard by id range. Plain ids address a
//! single device, ids from [`TAG_START_ID`] address tags, and ids from
//! [`DEVICE_SELECTOR_START_ID`] address device-selector widgets.

/// First id reserved for tags.
pub const TAG_START_ID: i32 = 100_000;

/// First id reserved for device-selector widgets.
pub const DEVICE_SELECTOR_START_ID: i32 = 200_000;

/// Device a selector addresses until a viewer picks one.
pub const DEFAULT_DEVICE_ID: i32 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Device { id: i32, device_ids: [i32; 1] },
    /// A named group of devices. Carries its own pin state under its own id.
    Tag { id: i32, device_ids: Vec<i32> },
    /// Resolves to whatever device the widget currently points at.
    DeviceSelector { id: i32, device_ids: [i32; 1] },
}

/// Where a target id falls in the id-range convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Device,
    Tag,
    DeviceSelector,
}

impl TargetKind {
    #[must_use]
    pub fn of(target_id: i32) -> Self {
        if target_id < TAG_START_ID {
            Self::Device
        } else if target_id < DEVICE_SELECTOR_START_ID {
            Self::Tag
        } else {
            Self::DeviceSelector
        }
    }
}

impl Target {
    #[must_use]
    pub fn device(id: i32) -> Self {
        Self::Device { id, device_ids: [id] }
    }

    /// Selector currently pointing at `selected`, or at the default device.
    #[must_use]
    pub fn device_selector(id: i32, selected: Option<i32>) -> Self {
        Self::DeviceSelector { id, device_ids: [selected.unwrap_or(DEFAULT_DEVICE_ID)] }
    }

    #[must_use]
    pub fn id(&self) -> i32 {
        match self {
            Self::Device { id, .. } | Self::Tag { id, .. } | Self::DeviceSelector { id, .. } => *id,
        }
    }

    /// Devices this target fans out to, in configured order. Empty means
    /// nothing is assigned right now.
    #[must_use]
    pub fn device_ids(&self) -> &[i32] {
        match self {
            Self::Device { device_ids, .. } | Self::DeviceSelector { device_ids, .. } => device_ids.as_slice(),
            Self::Tag { device_ids, .. } => device_ids.as_slice(),
        }
    }

    #[must_use]
    pub fn is_tag(&self) -> bool {
        matches!(self, Self::Tag { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_id_ranges() {
        assert_eq!(TargetKind::of(0), TargetKind::Device);
        assert_eq!(TargetKind::of(99_999), TargetKind::Device);
        assert_eq!(TargetKind::of(100_000), TargetKind::Tag);
        assert_eq!(TargetKind::of(199_999), TargetKind::Tag);
        assert_eq!(TargetKind::of(200_000), TargetKind::DeviceSelector);
    }

    #[test]
    fn device_target_addresses_itself() {
        let target = Target::device(7);
        assert_eq!(target.device_ids(), &[7]);
        assert_eq!(target.id(), 7);
        assert!(!target.is_tag());
    }

    #[test]
    fn tag_keeps_member_order() {
        let target = Target::Tag { id: 100_005, device_ids: vec![102, 101] };
        assert_eq!(target.device_ids(), &[102, 101]);
        assert!(target.is_tag());
    }

    #[test]
    fn unset_selector_addresses_default_device() {
        let target = Target::device_selector(200_000, None);
        assert_eq!(target.device_ids(), &[DEFAULT_DEVICE_ID]);
        let target = Target::device_selector(200_000, Some(3));
        assert_eq!(target.device_ids(), &[3]);
        assert!(!target.is_tag());
    }
}
