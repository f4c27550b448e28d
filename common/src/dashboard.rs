use dht_logger_model::{History, Sample};

use crate::chart::ChartPaths;
use crate::config::LoggerConfig;
use crate::port::PortOpenError;
use crate::sampler::Poll;

/// Which control the dashboard offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Controls {
    /// The port could not be opened, there is nothing to control.
    None,
    Start,
    Stop,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Status {
    pub text: String,
    pub is_error: bool,
}

impl Status {
    fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// Everything the dashboard shows, independent of the UI toolkit.
#[derive(Clone, Debug, PartialEq)]
pub struct DashboardView {
    pub title: String,
    pub port_open: bool,
    pub controls: Controls,
    pub status: Option<Status>,
    /// Subtitle of the latest-values region.
    pub refresh_note: String,
    pub latest: Option<Sample>,
    pub chart: Option<ChartPaths>,
}

impl DashboardView {
    pub const PORT_UNAVAILABLE: &'static str = "Could not open serial port.";

    pub fn new(config: &LoggerConfig, port: Result<(), &PortOpenError>) -> Self {
        let (port_open, controls, status) = match port {
            Ok(()) => (true, Controls::Start, None),
            Err(e) => (
                false,
                Controls::None,
                Some(Status::error(format!("{} Error: {e}", Self::PORT_UNAVAILABLE))),
            ),
        };

        Self {
            title: config.title.clone(),
            port_open,
            controls,
            status,
            refresh_note: format!(
                "Updated every {} seconds",
                config.timing().sample_interval().as_secs_f64()
            ),
            latest: None,
            chart: None,
        }
    }

    pub fn logging_started(&mut self) {
        if !self.port_open {
            return;
        }
        self.controls = Controls::Stop;
        self.status = None;
        self.latest = None;
        self.chart = None;
    }

    pub fn stop_requested(&mut self) {
        if self.controls == Controls::Stop {
            self.status = Some(Status::info("Stopping after the current reading..."));
        }
    }

    /// Update the regions affected by `poll`. `history` is the running session's history.
    pub fn apply(&mut self, poll: &Poll, history: Option<&History>) {
        if !self.port_open {
            return;
        }

        match poll {
            Poll::Idle | Poll::NoData => {}
            Poll::Stopped(session) => {
                self.controls = Controls::Start;
                self.latest = None;
                self.chart = None;
                self.status = Some(Status::info(format!(
                    "Logged {} samples.",
                    session.history.len()
                )));
            }
            Poll::Recorded { sample, redraw } => {
                self.latest = Some(*sample);
                if self.status.as_ref().is_some_and(|s| s.is_error) {
                    self.status = None;
                }
                if *redraw {
                    if let Some(history) = history {
                        log::debug!("Redrawing chart with {} samples", history.len());
                        self.chart = ChartPaths::from_history(history);
                    }
                }
            }
            Poll::Malformed(e) => self.status = Some(Status::error(e.to_string())),
            Poll::ReadFailed(e) => {
                self.status = Some(Status::error(format!("Could not read from the serial port: {e}")))
            }
        }
    }
}
