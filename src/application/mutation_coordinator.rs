// Optimistic mutation coordinator - one independent state machine per control
use crate::application::grow_box_api::{ControlSource, FetchError, FetchResult};
use crate::application::poll_scheduler::{Generation, Stream};
use crate::domain::controls::{Actuator, ActuatorState, AutoModeState, Control, ControlCell};
use crate::domain::settings::GrowSettings;
use std::collections::BTreeMap;

/// Outcome of a settled mutation, as the operator should see it.
#[derive(Debug)]
pub enum Settlement {
    Confirmed { value: bool },
    RolledBack { restored: bool, error: FetchError },
}

/// The poll stream that reports a control's state.
pub fn polled_by(control: Control) -> Stream {
    match control {
        Control::Actuator(_) => Stream::ControlStatus,
        Control::AutoMode(_) => Stream::Settings,
    }
}

#[derive(Debug, Clone)]
pub struct ControlBoard {
    cells: BTreeMap<Control, ControlCell>,
    /// Latest poll generation issued when each control last settled. Polls
    /// at or below it were started before the write landed.
    settled_after: BTreeMap<Control, Generation>,
}

impl Default for ControlBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlBoard {
    pub fn new() -> Self {
        Self {
            cells: Control::ALL
                .iter()
                .map(|&control| (control, ControlCell::default()))
                .collect(),
            settled_after: BTreeMap::new(),
        }
    }

    pub fn cell(&self, control: Control) -> ControlCell {
        self.cells.get(&control).copied().unwrap_or_default()
    }

    pub fn displayed(&self, control: Control) -> bool {
        self.cell(control).displayed()
    }

    pub fn is_pending(&self, control: Control) -> bool {
        self.cell(control).is_pending()
    }

    /// Shows `desired` immediately. Returns false (and changes nothing) if a
    /// write for this control is still outstanding.
    pub fn begin(&mut self, control: Control, desired: bool) -> bool {
        let accepted = self.cells.entry(control).or_default().request(desired);
        if accepted {
            tracing::debug!(%control, desired, "optimistic update applied");
        }
        accepted
    }

    /// Settles the outstanding write. `last_poll` is the newest generation
    /// issued on the control's poll stream at this point, if any.
    pub fn settle(
        &mut self,
        control: Control,
        outcome: FetchResult<bool>,
        last_poll: Option<Generation>,
    ) -> Settlement {
        if let Some(generation) = last_poll {
            self.settled_after.insert(control, generation);
        }
        let cell = self.cells.entry(control).or_default();
        match outcome {
            Ok(value) => {
                cell.confirm(value);
                Settlement::Confirmed { value }
            }
            Err(error) => {
                let restored = cell.roll_back();
                Settlement::RolledBack { restored, error }
            }
        }
    }

    /// Applies polled actuator state; pending controls keep their optimistic
    /// value. Returns the controls whose displayed value changed.
    pub fn observe_actuators(
        &mut self,
        polled: &ActuatorState,
        generation: Generation,
    ) -> Vec<Control> {
        let values = Actuator::ALL.map(|a| (Control::Actuator(a), polled.get(a)));
        self.observe(values, generation)
    }

    /// Applies polled auto-mode flags. Flags that failed to decode are
    /// skipped so their controls keep the last known value.
    pub fn observe_settings(
        &mut self,
        settings: &GrowSettings,
        generation: Generation,
    ) -> Vec<Control> {
        let values = Actuator::ALL
            .into_iter()
            .filter(|a| !settings.is_invalid(a.auto_setting()))
            .map(|a| (Control::AutoMode(a), settings.auto_modes.get(a)));
        self.observe(values, generation)
    }

    fn observe(
        &mut self,
        values: impl IntoIterator<Item = (Control, bool)>,
        generation: Generation,
    ) -> Vec<Control> {
        let mut changed = Vec::new();
        for (control, value) in values {
            if self.settled_after.get(&control).is_some_and(|mark| generation <= *mark) {
                tracing::debug!(
                    %control,
                    poll = generation.0,
                    "poll predates last write, ignored"
                );
                continue;
            }
            let cell = self.cells.entry(control).or_default();
            if cell.is_pending() {
                tracing::debug!(%control, "poll ignored while mutation is pending");
                continue;
            }
            if cell.observe(value) {
                changed.push(control);
            }
        }
        changed
    }

    pub fn actuator_state(&self) -> ActuatorState {
        ActuatorState {
            fan: self.displayed(Control::Actuator(Actuator::Fan)),
            light: self.displayed(Control::Actuator(Actuator::Light)),
            water_pump: self.displayed(Control::Actuator(Actuator::WaterPump)),
        }
    }

    pub fn auto_mode_state(&self) -> AutoModeState {
        AutoModeState {
            fan_auto: self.displayed(Control::AutoMode(Actuator::Fan)),
            light_auto: self.displayed(Control::AutoMode(Actuator::Light)),
            water_auto: self.displayed(Control::AutoMode(Actuator::WaterPump)),
        }
    }
}

/// Issues the remote write for a control.
pub async fn commit(
    source: &dyn ControlSource,
    control: Control,
    desired: bool,
) -> FetchResult<bool> {
    match control {
        Control::Actuator(actuator) => source.set_actuator(actuator, desired).await,
        Control::AutoMode(device) => source.set_auto_mode(device, desired).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAN: Control = Control::Actuator(Actuator::Fan);
    const LIGHT: Control = Control::Actuator(Actuator::Light);

    #[test]
    fn test_optimistic_value_shown_before_commit() {
        let mut board = ControlBoard::new();
        assert!(board.begin(FAN, true));
        assert!(board.displayed(FAN));
        assert!(board.is_pending(FAN));
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let mut board = ControlBoard::new();
        board.begin(FAN, true);

        let error = FetchError::network("/api/controls/fan", "503");
        let settlement = board.settle(FAN, Err(error), None);
        match settlement {
            Settlement::RolledBack { restored, .. } => assert!(!restored),
            other => panic!("expected rollback, got {:?}", other),
        }
        assert!(!board.displayed(FAN));
        assert!(!board.is_pending(FAN));
    }

    #[test]
    fn test_server_value_wins_on_success() {
        let mut board = ControlBoard::new();
        board.begin(FAN, true);
        board.settle(FAN, Ok(false), None);
        assert!(!board.displayed(FAN));
    }

    #[test]
    fn test_poll_does_not_override_pending_control() {
        let mut board = ControlBoard::new();
        board.begin(FAN, true);

        let polled = ActuatorState {
            fan: false,
            light: true,
            water_pump: false,
        };
        let changed = board.observe_actuators(&polled, Generation(1));

        // Other controls still follow the poll.
        assert_eq!(changed, vec![LIGHT]);
        assert!(board.displayed(FAN));
        assert!(board.displayed(LIGHT));

        board.settle(FAN, Ok(true), Some(Generation(1)));
        board.observe_actuators(&ActuatorState::default(), Generation(2));
        assert!(!board.displayed(FAN));
    }

    #[test]
    fn test_auto_modes_are_independent_of_actuators() {
        let mut board = ControlBoard::new();
        board.begin(Control::AutoMode(Actuator::Fan), true);
        let polled = ActuatorState {
            fan: true,
            light: false,
            water_pump: false,
        };
        board.observe_actuators(&polled, Generation(1));

        assert!(!board.is_pending(FAN));
        assert!(board.displayed(FAN));
        assert!(board.auto_mode_state().fan_auto);
        assert!(!board.auto_mode_state().light_auto);
    }

    #[test]
    fn test_poll_started_before_write_cannot_undo_it() {
        let mut board = ControlBoard::new();
        board.begin(FAN, true);
        board.settle(FAN, Ok(true), Some(Generation(3)));

        board.observe_actuators(&ActuatorState::default(), Generation(3));
        assert!(board.displayed(FAN));

        board.observe_actuators(&ActuatorState::default(), Generation(4));
        assert!(!board.displayed(FAN));
    }

    #[test]
    fn test_malformed_auto_flag_keeps_last_value() {
        let mut board = ControlBoard::new();
        let fan_auto = Control::AutoMode(Actuator::Fan);
        let mut raw = std::collections::HashMap::new();
        raw.insert("fan_auto".to_string(), "true".to_string());
        board.observe_settings(&GrowSettings::from_map(raw.clone()), Generation(1));
        assert!(board.displayed(fan_auto));

        raw.insert("fan_auto".to_string(), "maybe".to_string());
        raw.insert("light_auto".to_string(), "false".to_string());
        let changed = board.observe_settings(&GrowSettings::from_map(raw), Generation(2));

        assert_eq!(changed, Vec::<Control>::new());
        assert!(board.displayed(fan_auto));
        assert!(!board.displayed(Control::AutoMode(Actuator::Light)));
    }
}
