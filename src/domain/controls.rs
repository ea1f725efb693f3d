// Actuator and auto-mode domain models
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Actuator {
    Fan,
    Light,
    WaterPump,
}

impl Actuator {
    pub const ALL: [Actuator; 3] = [Actuator::Fan, Actuator::Light, Actuator::WaterPump];

    /// Path segment of the control endpoint (`/api/controls/{name}`).
    pub fn endpoint(self) -> &'static str {
        match self {
            Actuator::Fan => "fan",
            Actuator::Light => "light",
            Actuator::WaterPump => "water",
        }
    }

    /// Key of the confirmed value in a control write response.
    pub fn state_key(self) -> &'static str {
        match self {
            Actuator::Fan => "fan_state",
            Actuator::Light => "light_state",
            Actuator::WaterPump => "water_pump_state",
        }
    }

    /// Settings key holding this device's auto-mode flag.
    pub fn auto_setting(self) -> &'static str {
        match self {
            Actuator::Fan => "fan_auto",
            Actuator::Light => "light_auto",
            Actuator::WaterPump => "water_auto",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Actuator::Fan => "fan",
            Actuator::Light => "light",
            Actuator::WaterPump => "water pump",
        }
    }
}

/// One independently mutable binary control on the operator console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Control {
    Actuator(Actuator),
    AutoMode(Actuator),
}

impl Control {
    pub const ALL: [Control; 6] = [
        Control::Actuator(Actuator::Fan),
        Control::Actuator(Actuator::Light),
        Control::Actuator(Actuator::WaterPump),
        Control::AutoMode(Actuator::Fan),
        Control::AutoMode(Actuator::Light),
        Control::AutoMode(Actuator::WaterPump),
    ];

    /// Badge text for a displayed value.
    pub fn badge(self, on: bool) -> &'static str {
        match (self, on) {
            (Control::Actuator(_), true) => "ON",
            (Control::Actuator(_), false) => "OFF",
            (Control::AutoMode(_), true) => "AUTO",
            (Control::AutoMode(_), false) => "MANUAL",
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Control::Actuator(a) => write!(f, "{}", a.display_name()),
            Control::AutoMode(a) => write!(f, "{} auto control", a.display_name()),
        }
    }
}

impl FromStr for Control {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (device, auto) = match s.strip_suffix("-auto") {
            Some(device) => (device, true),
            None => (s, false),
        };
        let actuator = match device {
            "fan" => Actuator::Fan,
            "light" => Actuator::Light,
            "pump" | "water" => Actuator::WaterPump,
            other => return Err(format!("unknown control '{}'", other)),
        };
        Ok(if auto {
            Control::AutoMode(actuator)
        } else {
            Control::Actuator(actuator)
        })
    }
}

/// Actuator state as reported by `/api/controls/status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ActuatorState {
    pub fan: bool,
    pub light: bool,
    pub water_pump: bool,
}

impl ActuatorState {
    pub fn get(&self, actuator: Actuator) -> bool {
        match actuator {
            Actuator::Fan => self.fan,
            Actuator::Light => self.light,
            Actuator::WaterPump => self.water_pump,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoModeState {
    pub fan_auto: bool,
    pub light_auto: bool,
    pub water_auto: bool,
}

impl AutoModeState {
    pub fn get(&self, actuator: Actuator) -> bool {
        match actuator {
            Actuator::Fan => self.fan_auto,
            Actuator::Light => self.light_auto,
            Actuator::WaterPump => self.water_auto,
        }
    }
}

/// Displayed value of a single control.
///
/// A cell only ever leaves `Pending` through `settle_*`; poll observations
/// are dropped while a write is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCell {
    Confirmed(bool),
    Pending { requested: bool, previous: bool },
}

impl Default for ControlCell {
    fn default() -> Self {
        ControlCell::Confirmed(false)
    }
}

impl ControlCell {
    pub fn displayed(&self) -> bool {
        match *self {
            ControlCell::Confirmed(value) => value,
            ControlCell::Pending { requested, .. } => requested,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ControlCell::Pending { .. })
    }

    /// Starts an optimistic write. Returns false if one is already in flight.
    pub fn request(&mut self, desired: bool) -> bool {
        match *self {
            ControlCell::Confirmed(previous) => {
                *self = ControlCell::Pending {
                    requested: desired,
                    previous,
                };
                true
            }
            ControlCell::Pending { .. } => false,
        }
    }

    pub fn confirm(&mut self, server_value: bool) {
        *self = ControlCell::Confirmed(server_value);
    }

    /// Reverts to the value confirmed before the request and returns it.
    pub fn roll_back(&mut self) -> bool {
        let restored = match *self {
            ControlCell::Pending { previous, .. } => previous,
            ControlCell::Confirmed(value) => value,
        };
        *self = ControlCell::Confirmed(restored);
        restored
    }

    /// Applies a polled value. Returns true if the displayed value changed.
    pub fn observe(&mut self, polled: bool) -> bool {
        match *self {
            ControlCell::Confirmed(current) => {
                *self = ControlCell::Confirmed(polled);
                current != polled
            }
            ControlCell::Pending { .. } => false,
        }
    }
}
