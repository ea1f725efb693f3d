// Operator command parsing
use crate::domain::controls::Control;
use crate::domain::telemetry::TimeWindow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `fan on`, `light-auto off`, ...
    Set { control: Control, on: bool },
    /// `window 7d`
    Window(TimeWindow),
    Export,
    Refresh,
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  fan|light|pump on|off            switch an actuator
  fan-auto|light-auto|water-auto on|off
                                   switch automatic control
  window 12h|24h|48h|7d            change the chart window
  refresh                          refetch telemetry now
  export                           write history CSV for the current window
  status                           print the current console state
  quit";

pub fn parse(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err("empty command".to_string());
    };
    let arg = words.next();
    if words.next().is_some() {
        return Err(format!("too many arguments for '{}'", head));
    }

    match (head, arg) {
        ("window", Some(w)) => Ok(Command::Window(w.parse()?)),
        ("export", None) => Ok(Command::Export),
        ("refresh", None) => Ok(Command::Refresh),
        ("status", None) => Ok(Command::Status),
        ("help", None) => Ok(Command::Help),
        ("quit" | "exit", None) => Ok(Command::Quit),
        (name, Some(state)) => {
            let control: Control = name.parse()?;
            let on = match state {
                "on" | "true" => true,
                "off" | "false" => false,
                other => return Err(format!("expected on or off, got '{}'", other)),
            };
            Ok(Command::Set { control, on })
        }
        (name, None) => Err(format!("unknown command '{}'", name)),
    }
}
