// SPDX-License-Identifier: MPL-2.0

//! Battery-saver gating.

use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

/// Where Linux exposes power supplies.
pub const SYSFS_POWER_SUPPLY: &str = "/sys/class/power_supply";

/// How long a power reading stays valid.
const REFRESH: Duration = Duration::from_secs(5);

/// Decides whether animation frames may be displayed right now.
pub trait PowerPolicy {
    fn is_display_allowed(&mut self) -> bool;
}

#[derive(Debug)]
pub enum Power {
    AlwaysOn,
    BatterySaver(BatteryMonitor),
}

impl Power {
    /// Battery saver if requested and the machine reports its charging state.
    #[must_use]
    pub fn new(power_save: bool, root: impl Into<PathBuf>) -> Self {
        if !power_save {
            return Self::AlwaysOn;
        }

        match BatteryMonitor::detect(root) {
            Some(monitor) => Self::BatterySaver(monitor),
            None => {
                tracing::warn!("cannot use battery saving mode, charging state is unknown");
                Self::AlwaysOn
            }
        }
    }
}

impl PowerPolicy for Power {
    fn is_display_allowed(&mut self) -> bool {
        match self {
            Self::AlwaysOn => true,
            Self::BatterySaver(monitor) => monitor.is_charging(),
        }
    }
}

/// Cached view of `/sys/class/power_supply`.
#[derive(Debug)]
pub struct BatteryMonitor {
    root: PathBuf,
    charging: bool,
    checked: Instant,
}

impl BatteryMonitor {
    /// `None` when no mains adapter or battery is listed under `root`.
    pub fn detect(root: impl Into<PathBuf>) -> Option<Self> {
        let root = root.into();
        let charging = read_charging(&root)?;

        tracing::debug!(root = %root.display(), charging, "battery saver enabled");

        Some(Self {
            root,
            charging,
            checked: Instant::now(),
        })
    }

    pub fn is_charging(&mut self) -> bool {
        if self.checked.elapsed() >= REFRESH {
            let charging = read_charging(&self.root).unwrap_or(self.charging);
            if charging != self.charging {
                tracing::info!(charging, "power state changed");
            }
            self.charging = charging;
            self.checked = Instant::now();
        }

        self.charging
    }
}

fn read_attribute(supply: &Path, name: &str) -> Option<String> {
    fs::read_to_string(supply.join(name))
        .ok()
        .map(|value| value.trim().to_owned())
}

/// Mains online or any battery charging. `None` if nothing reports either.
fn read_charging(root: &Path) -> Option<bool> {
    let mut found = false;
    let mut charging = false;

    for entry in fs::read_dir(root).ok()?.filter_map(Result::ok) {
        let supply = entry.path();

        match read_attribute(&supply, "type").as_deref() {
            Some("Mains") => {
                found = true;
                charging |= read_attribute(&supply, "online").as_deref() == Some("1");
            }
            Some("Battery") => {
                found = true;
                charging |= matches!(
                    read_attribute(&supply, "status").as_deref(),
                    Some("Charging" | "Full")
                );
            }
            _ => {}
        }
    }

    found.then_some(charging)
}
