use crate::connection::{ModeMap, StateMap};

/// A named default profile for a device brand/model. Presets only contribute
/// the raw state/mode values a device reports; they never touch wiring fields
/// (hosts, registers, keys) the operator entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevicePreset {
    pub name: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub supports_priority: bool,
    state_cable_locked: &'static str,
    state_waiting_auth: &'static str,
    state_charging: &'static str,
    state_idle: &'static str,
    mode_normal: &'static str,
    mode_priority: &'static str,
}

impl DevicePreset {
    pub fn state_map(&self) -> StateMap {
        StateMap {
            cable_locked: self.state_cable_locked.into(),
            waiting_auth: self.state_waiting_auth.into(),
            charging: self.state_charging.into(),
            idle: self.state_idle.into(),
        }
    }

    pub fn mode_map(&self) -> ModeMap {
        ModeMap { normal: self.mode_normal.into(), priority: self.mode_priority.into() }
    }
}

// The fallback entry comes first; `lookup` relies on that.
pub const PRESETS: &[DevicePreset] = &[
    DevicePreset {
        name: "generic",
        label: "Generic",
        description: "Default profile for unlisted hardware",
        supports_priority: true,
        state_cable_locked: "1",
        state_waiting_auth: "2",
        state_charging: "3",
        state_idle: "0",
        mode_normal: "0",
        mode_priority: "1",
    },
    DevicePreset {
        name: "keba_p30",
        label: "KEBA P30",
        description: "KEBA KeContact P30 wallbox",
        supports_priority: false,
        state_cable_locked: "1",
        state_waiting_auth: "5",
        state_charging: "3",
        state_idle: "2",
        mode_normal: "0",
        mode_priority: "1",
    },
    DevicePreset {
        name: "easee_home",
        label: "Easee Home",
        description: "Easee Home wallbox",
        supports_priority: true,
        state_cable_locked: "4",
        state_waiting_auth: "2",
        state_charging: "3",
        state_idle: "1",
        mode_normal: "1",
        mode_priority: "2",
    },
    DevicePreset {
        name: "zaptec_go",
        label: "Zaptec Go",
        description: "Zaptec Go wallbox",
        supports_priority: false,
        state_cable_locked: "5",
        state_waiting_auth: "2",
        state_charging: "3",
        state_idle: "1",
        mode_normal: "0",
        mode_priority: "1",
    },
    DevicePreset {
        name: "weidmueller_ac_smart",
        label: "Weidmüller AC Smart",
        description: "Weidmüller AC Smart value/advanced wallbox",
        supports_priority: true,
        state_cable_locked: "66",
        state_waiting_auth: "67",
        state_charging: "68",
        state_idle: "65",
        mode_normal: "0",
        mode_priority: "2",
    },
];

/// Never fails: an unknown name resolves to the generic profile so a stale or
/// misspelled preset reference degrades to default mappings instead of
/// blocking the operator.
pub fn lookup(name: &str) -> &'static DevicePreset {
    PRESETS.iter().find(|p| p.name == name).unwrap_or(&PRESETS[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_known_preset() {
        let p = lookup("keba_p30");
        assert_eq!(p.label, "KEBA P30");
        assert!(!p.supports_priority);
        assert_eq!(p.state_map().waiting_auth, "5");
    }

    #[test]
    fn lookup_degrades_to_generic() {
        assert_eq!(lookup("no_such_brand").name, "generic");
        assert_eq!(lookup("").name, "generic");
    }

    #[test]
    fn preset_names_are_unique() {
        for (i, a) in PRESETS.iter().enumerate() {
            for b in &PRESETS[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }
}
