// Poll scheduler - per-stream in-flight guard and generation tokens
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Independent request streams. Each has at most one request the
/// session is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stream {
    /// Latest sensor reading.
    Current,
    /// Hourly + daily chart data for the selected window.
    History,
    ControlStatus,
    /// Thresholds and auto-mode flags.
    Settings,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stream::Current => "current",
            Stream::History => "history",
            Stream::ControlStatus => "control-status",
            Stream::Settings => "settings",
        })
    }
}

/// The two fixed-interval refresh loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollLoop {
    Telemetry,
    Control,
}

impl PollLoop {
    pub fn streams(self) -> &'static [Stream] {
        match self {
            PollLoop::Telemetry => &[Stream::Current, Stream::History],
            PollLoop::Control => &[Stream::ControlStatus, Stream::Settings],
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PollIntervals {
    pub telemetry: Duration,
    pub control: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            telemetry: Duration::from_secs(30),
            control: Duration::from_secs(5),
        }
    }
}

/// Monotonically increasing request tag, per stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(pub u64);

#[derive(Debug, Default, Clone, Copy)]
struct StreamState {
    issued: u64,
    in_flight: bool,
}

#[derive(Debug, Default)]
pub struct PollScheduler {
    streams: BTreeMap<Stream, StreamState>,
}

impl PollScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a generation for a timer tick, or `None` if the previous
    /// request on this stream has not completed. Ticks are never queued.
    pub fn try_begin(&mut self, stream: Stream) -> Option<Generation> {
        let state = self.streams.entry(stream).or_default();
        if state.in_flight {
            tracing::debug!(%stream, "previous request still in flight, skipping tick");
            return None;
        }
        Some(Self::issue(state))
    }

    /// Issues a generation regardless of what is in flight. Anything
    /// older that resolves later will be discarded by `complete`.
    pub fn force_begin(&mut self, stream: Stream) -> Generation {
        Self::issue(self.streams.entry(stream).or_default())
    }

    /// Records a completion. Returns true only if `generation` is the
    /// latest issued for the stream, i.e. its result should be applied.
    pub fn complete(&mut self, stream: Stream, generation: Generation) -> bool {
        let state = self.streams.entry(stream).or_default();
        if generation.0 != state.issued {
            tracing::debug!(
                %stream,
                stale = generation.0,
                latest = state.issued,
                "discarding stale completion"
            );
            return false;
        }
        state.in_flight = false;
        true
    }

    pub fn in_flight(&self, stream: Stream) -> bool {
        self.streams.get(&stream).is_some_and(|s| s.in_flight)
    }

    pub fn latest(&self, stream: Stream) -> Option<Generation> {
        self.streams
            .get(&stream)
            .filter(|s| s.issued > 0)
            .map(|s| Generation(s.issued))
    }

    fn issue(state: &mut StreamState) -> Generation {
        state.issued += 1;
        state.in_flight = true;
        Generation(state.issued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_skipped_while_in_flight() {
        let mut scheduler = PollScheduler::new();
        let first = scheduler.try_begin(Stream::ControlStatus).unwrap();
        assert_eq!(scheduler.try_begin(Stream::ControlStatus), None);

        assert!(scheduler.complete(Stream::ControlStatus, first));
        assert_eq!(scheduler.try_begin(Stream::ControlStatus), Some(Generation(2)));
    }

    #[test]
    fn test_streams_are_independent() {
        let mut scheduler = PollScheduler::new();
        scheduler.try_begin(Stream::Current).unwrap();
        assert!(scheduler.try_begin(Stream::History).is_some());
        assert!(scheduler.in_flight(Stream::Current));
        assert!(!scheduler.in_flight(Stream::Settings));
    }

    #[test]
    fn test_stale_generation_discarded() {
        let mut scheduler = PollScheduler::new();
        let old = scheduler.try_begin(Stream::History).unwrap();
        let new = scheduler.force_begin(Stream::History);

        assert!(scheduler.complete(Stream::History, new));
        assert!(!scheduler.complete(Stream::History, old));
        assert!(!scheduler.in_flight(Stream::History));
    }

    #[test]
    fn test_stale_completion_keeps_stream_busy() {
        let mut scheduler = PollScheduler::new();
        let old = scheduler.try_begin(Stream::History).unwrap();
        scheduler.force_begin(Stream::History);

        assert!(!scheduler.complete(Stream::History, old));
        assert!(scheduler.in_flight(Stream::History));
        assert_eq!(scheduler.try_begin(Stream::History), None);
    }

    #[test]
    fn test_latest_tracks_newest_issue() {
        let mut scheduler = PollScheduler::new();
        assert_eq!(scheduler.latest(Stream::Settings), None);

        scheduler.try_begin(Stream::Settings).unwrap();
        scheduler.force_begin(Stream::Settings);
        assert_eq!(scheduler.latest(Stream::Settings), Some(Generation(2)));
    }

    #[test]
    fn test_loop_streams() {
        assert_eq!(PollLoop::Telemetry.streams(), &[Stream::Current, Stream::History]);
        assert!(PollLoop::Control.streams().contains(&Stream::Settings));
    }
}
