// Operator console - session state and the single-threaded event loop
use crate::application::chart_manager::{ChartSeriesManager, ChartSurface};
use crate::application::export::{self, ExportError};
use crate::application::grow_box_api::{ControlSource, FetchError, FetchResult, TelemetrySource};
use crate::application::mutation_coordinator::{self, ControlBoard, Settlement, polled_by};
use crate::application::poll_scheduler::{
    Generation, PollIntervals, PollLoop, PollScheduler, Stream,
};
use crate::domain::chart::history_charts;
use crate::domain::controls::{ActuatorState, Control};
use crate::domain::settings::GrowSettings;
use crate::domain::telemetry::{AggregatedDay, SensorReading, TimeWindow};
use crate::presentation::commands::{Command, HELP};
use crate::presentation::display::OperatorDisplay;
use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

/// Chart data for one window, fetched as a unit.
#[derive(Debug, Clone)]
pub struct HistoryData {
    pub window: TimeWindow,
    pub hourly: Vec<SensorReading>,
    pub daily: Vec<AggregatedDay>,
}

/// A network call that has resolved, posted back to the event loop.
#[derive(Debug)]
pub enum Completion {
    Current(Generation, FetchResult<SensorReading>),
    History(Generation, FetchResult<HistoryData>),
    ControlStatus(Generation, FetchResult<ActuatorState>),
    Settings(Generation, FetchResult<GrowSettings>),
    Mutation(Control, FetchResult<bool>),
    Export(Result<PathBuf, ExportError>),
}

/// A read the event loop should issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub stream: Stream,
    pub generation: Generation,
    pub window: TimeWindow,
}

/// Everything the operator sees, updated only by whole completions.
pub struct ConsoleSession<S: ChartSurface> {
    board: ControlBoard,
    charts: ChartSeriesManager<S>,
    scheduler: PollScheduler,
    display: OperatorDisplay,
    settings: Option<GrowSettings>,
    last_reading: Option<SensorReading>,
    window: TimeWindow,
}

impl<S: ChartSurface> ConsoleSession<S> {
    pub fn new(surface: S, window: TimeWindow) -> Self {
        Self {
            board: ControlBoard::new(),
            charts: ChartSeriesManager::new(surface),
            scheduler: PollScheduler::new(),
            display: OperatorDisplay::new(window),
            settings: None,
            last_reading: None,
            window,
        }
    }

    /// Requests for a timer tick; streams still in flight are skipped.
    pub fn tick(&mut self, poll: PollLoop) -> Vec<Request> {
        let requests: Vec<Request> = poll
            .streams()
            .iter()
            .filter_map(|&stream| {
                self.scheduler.try_begin(stream).map(|generation| Request {
                    stream,
                    generation,
                    window: self.window,
                })
            })
            .collect();
        if requests.iter().any(|r| r.stream == Stream::History) {
            self.display.set_charts_loading(true);
        }
        requests
    }

    /// Switches the chart window and issues an out-of-band history read.
    pub fn select_window(&mut self, window: TimeWindow) -> Request {
        self.window = window;
        self.display.set_window(window);
        self.refetch_history()
    }

    pub fn refetch_history(&mut self) -> Request {
        self.display.set_charts_loading(true);
        Request {
            stream: Stream::History,
            generation: self.scheduler.force_begin(Stream::History),
            window: self.window,
        }
    }

    /// Applies the operator's request to the display. Returns false if a
    /// write for this control is still outstanding.
    pub fn request_control(&mut self, control: Control, on: bool) -> bool {
        let accepted = self.board.begin(control, on);
        self.display.show_control(control, self.board.cell(control));
        accepted
    }

    pub fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::Current(generation, result) => {
                if !self.scheduler.complete(Stream::Current, generation) {
                    return;
                }
                match result {
                    Ok(reading) => {
                        self.display.show_reading(&reading);
                        if let Some(settings) = &self.settings {
                            self.display.show_indicators(&reading, settings);
                        }
                        self.last_reading = Some(reading);
                    }
                    Err(e) => log_read_failure(Stream::Current, &e),
                }
            }
            Completion::History(generation, result) => {
                if !self.scheduler.complete(Stream::History, generation) {
                    return;
                }
                self.display.set_charts_loading(false);
                match result {
                    Ok(data) => {
                        let charts = history_charts(&data.hourly, &data.daily, data.window, &Local);
                        self.charts.render_all(&charts);
                    }
                    Err(e) => log_read_failure(Stream::History, &e),
                }
            }
            Completion::ControlStatus(generation, result) => {
                if !self.scheduler.complete(Stream::ControlStatus, generation) {
                    return;
                }
                match result {
                    Ok(state) => {
                        self.board.observe_actuators(&state, generation);
                        self.sync_controls();
                    }
                    Err(e) => log_read_failure(Stream::ControlStatus, &e),
                }
            }
            Completion::Settings(generation, result) => {
                if !self.scheduler.complete(Stream::Settings, generation) {
                    return;
                }
                match result {
                    Ok(mut settings) => {
                        if let Some(previous) = &self.settings {
                            settings.carry_thresholds(previous);
                        }
                        self.board.observe_settings(&settings, generation);
                        self.sync_controls();
                        if let Some(reading) = &self.last_reading {
                            self.display.show_indicators(reading, &settings);
                        }
                        self.settings = Some(settings);
                    }
                    Err(e) => log_read_failure(Stream::Settings, &e),
                }
            }
            Completion::Mutation(control, result) => {
                let last_poll = self.scheduler.latest(polled_by(control));
                match self.board.settle(control, result, last_poll) {
                    Settlement::Confirmed { value } => {
                        tracing::info!(%control, value, "change confirmed");
                    }
                    Settlement::RolledBack { restored, error } => {
                        tracing::error!(
                            %control,
                            restored,
                            error = %error,
                            "change failed, rolled back"
                        );
                        self.display.raise_notice(failure_notice(control));
                    }
                }
                self.display.show_control(control, self.board.cell(control));
            }
            Completion::Export(result) => match result {
                Ok(path) => tracing::info!(path = %path.display(), "export written"),
                Err(e) => {
                    tracing::error!(error = %e, "export failed");
                    self.display.raise_notice("Failed to export data. Please try again.");
                }
            },
        }
    }

    fn sync_controls(&mut self) {
        for control in Control::ALL {
            self.display.show_control(control, self.board.cell(control));
        }
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn board(&self) -> &ControlBoard {
        &self.board
    }

    pub fn charts(&self) -> &ChartSeriesManager<S> {
        &self.charts
    }

    pub fn display(&self) -> &OperatorDisplay {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut OperatorDisplay {
        &mut self.display
    }
}

fn log_read_failure(stream: Stream, error: &FetchError) {
    tracing::warn!(%stream, error = %error, "read failed, waiting for next poll");
}

fn failure_notice(control: Control) -> String {
    match control {
        Control::Actuator(actuator) => format!(
            "Failed to control {}. Please try again.",
            actuator.display_name()
        ),
        Control::AutoMode(device) => format!(
            "Failed to update {} auto control. Please try again.",
            device.display_name()
        ),
    }
}

/// Owns the session and the sources, and runs the polling loops.
pub struct Console<S: ChartSurface> {
    session: ConsoleSession<S>,
    telemetry: Arc<dyn TelemetrySource>,
    controls: Arc<dyn ControlSource>,
    intervals: PollIntervals,
    daily_days: u32,
    export_dir: PathBuf,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

pub struct ConsoleOptions {
    pub intervals: PollIntervals,
    pub window: TimeWindow,
    pub daily_days: u32,
    pub export_dir: PathBuf,
}

impl<S: ChartSurface> Console<S> {
    pub fn new(
        surface: S,
        telemetry: Arc<dyn TelemetrySource>,
        controls: Arc<dyn ControlSource>,
        options: ConsoleOptions,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            session: ConsoleSession::new(surface, options.window),
            telemetry,
            controls,
            intervals: options.intervals,
            daily_days: options.daily_days,
            export_dir: options.export_dir,
            completions_tx,
            completions_rx,
        }
    }

    pub fn session(&self) -> &ConsoleSession<S> {
        &self.session
    }

    /// Runs until `Quit` or the command channel closes.
    pub async fn run(&mut self, mut commands: mpsc::Receiver<Command>) -> anyhow::Result<()> {
        let mut telemetry_tick = tokio::time::interval(self.intervals.telemetry);
        let mut control_tick = tokio::time::interval(self.intervals.control);
        telemetry_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        control_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            telemetry_secs = self.intervals.telemetry.as_secs(),
            control_secs = self.intervals.control.as_secs(),
            window = %self.session.window(),
            "console started"
        );

        loop {
            tokio::select! {
                _ = telemetry_tick.tick() => self.poll(PollLoop::Telemetry),
                _ = control_tick.tick() => self.poll(PollLoop::Control),
                Some(completion) = self.completions_rx.recv() => {
                    self.session.apply(completion);
                }
                command = commands.recv() => match command {
                    None | Some(Command::Quit) => break,
                    Some(Command::Window(window)) => {
                        let request = self.session.select_window(window);
                        self.launch(request);
                        self.launch_current();
                        telemetry_tick.reset_at(Instant::now() + self.intervals.telemetry);
                    }
                    Some(Command::Refresh) => {
                        let request = self.session.refetch_history();
                        self.launch(request);
                        self.launch_current();
                        telemetry_tick.reset_at(Instant::now() + self.intervals.telemetry);
                    }
                    Some(Command::Set { control, on }) => self.mutate(control, on),
                    Some(Command::Export) => self.export(),
                    Some(Command::Status) => println!(
                        "{}\n  charts live: {}",
                        self.session.display(),
                        self.session.charts().live_count()
                    ),
                    Some(Command::Help) => println!("{}", HELP),
                },
            }
            self.flush_notices();
        }

        tracing::info!("console stopped");
        Ok(())
    }

    fn poll(&mut self, poll: PollLoop) {
        for request in self.session.tick(poll) {
            self.launch(request);
        }
    }

    fn launch_current(&mut self) {
        if let Some(generation) = self.session.scheduler.try_begin(Stream::Current) {
            self.launch(Request {
                stream: Stream::Current,
                generation,
                window: self.session.window(),
            });
        }
    }

    fn launch(&self, request: Request) {
        let tx = self.completions_tx.clone();
        let Request {
            stream,
            generation,
            window,
        } = request;

        match stream {
            Stream::Current => {
                let telemetry = self.telemetry.clone();
                tokio::spawn(async move {
                    let result = telemetry.fetch_current().await;
                    let _ = tx.send(Completion::Current(generation, result));
                });
            }
            Stream::History => {
                let telemetry = self.telemetry.clone();
                let days = self.daily_days;
                tokio::spawn(async move {
                    let result = futures::try_join!(
                        telemetry.fetch_hourly(window),
                        telemetry.fetch_daily(days)
                    )
                    .map(|(hourly, daily)| HistoryData {
                        window,
                        hourly,
                        daily,
                    });
                    let _ = tx.send(Completion::History(generation, result));
                });
            }
            Stream::ControlStatus => {
                let controls = self.controls.clone();
                tokio::spawn(async move {
                    let result = controls.read_control_status().await;
                    let _ = tx.send(Completion::ControlStatus(generation, result));
                });
            }
            Stream::Settings => {
                let controls = self.controls.clone();
                tokio::spawn(async move {
                    let result = controls.read_settings().await;
                    let _ = tx.send(Completion::Settings(generation, result));
                });
            }
        }
    }

    fn mutate(&mut self, control: Control, on: bool) {
        if !self.session.request_control(control, on) {
            println!("{} change already in progress", control);
            return;
        }

        let tx = self.completions_tx.clone();
        let controls = self.controls.clone();
        tokio::spawn(async move {
            let result = mutation_coordinator::commit(controls.as_ref(), control, on).await;
            let _ = tx.send(Completion::Mutation(control, result));
        });
    }

    fn export(&self) {
        let tx = self.completions_tx.clone();
        let telemetry = self.telemetry.clone();
        let window = self.session.window();
        let directory = self.export_dir.clone();
        tokio::spawn(async move {
            let result = match telemetry.fetch_raw_history(window).await {
                Ok(readings) => {
                    export::write_history(&directory, &readings, Local::now().date_naive()).await
                }
                Err(e) => Err(ExportError::Fetch(e)),
            };
            let _ = tx.send(Completion::Export(result));
        });
    }

    fn flush_notices(&mut self) {
        for notice in self.session.display_mut().take_notices() {
            println!("!! {}", notice.0);
        }
    }
}
