// Prevent console window in addition to Slint window in Windows release builds when, e.g., starting the app via file manager. Ignored on other platforms.
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

slint::include_modules!();

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use dht_logger_common::chart::ChartPaths;
use dht_logger_common::clock::{SystemClock, ThreadSleeper};
use dht_logger_common::config::LoggerConfig;
use dht_logger_common::dashboard::{Controls, DashboardView};
use dht_logger_common::model::Sample;
use dht_logger_common::port::{self, PortOpenError};
use dht_logger_common::sampler::{step, Sampler, Step};
use dht_logger_common::source::{DummyLineSource, LineSource};

/// The port, the sampling state machine and what the window should show.
///
/// Only touched from the UI thread, so it lives in an `Rc<RefCell<_>>` shared by
/// the button callbacks and the poll timer.
struct Logger {
    source: Option<Box<dyn LineSource>>,
    sampler: Sampler,
    view: DashboardView,
}

type SharedLogger = Rc<RefCell<Logger>>;

/// Our App struct that holds the UI and the logger.
///
/// Polling runs on the UI thread through one-shot Slint timers. Each poll
/// schedules the next one with the delay the sampler asks for, and the chain ends
/// when the session is stopped.
struct App {
    ui: AppWindow,
    logger: SharedLogger,
}

impl App {
    /// Create the window for an opened (or failed) port.
    fn new(config: &LoggerConfig, source: Result<Box<dyn LineSource>, PortOpenError>) -> anyhow::Result<Self> {
        let ui = AppWindow::new()?;

        let view = DashboardView::new(config, source.as_ref().map(|_| ()));
        let logger = Rc::new(RefCell::new(Logger {
            source: source.ok(),
            sampler: Sampler::new(config.timing()),
            view,
        }));

        let model = ui.global::<ViewModel>();

        let ui_handle = ui.as_weak();
        let start_logger = logger.clone();
        model.on_start_logging(move || {
            let started = {
                let mut logger = start_logger.borrow_mut();
                let started = logger.source.is_some() && logger.sampler.start(chrono::Local::now());
                if started {
                    logger.view.logging_started();
                    if let Some(ui) = ui_handle.upgrade() {
                        show(&ui, &logger.view);
                    }
                }
                started
            };

            if started {
                schedule_poll(start_logger.clone(), ui_handle.clone(), Duration::ZERO);
            }
        });

        let ui_handle = ui.as_weak();
        let stop_logger = logger.clone();
        model.on_stop_logging(move || {
            let mut logger = stop_logger.borrow_mut();
            log::info!("Stop requested");
            logger.sampler.stop_handle().request_stop();
            logger.view.stop_requested();
            if let Some(ui) = ui_handle.upgrade() {
                show(&ui, &logger.view);
            }
        });

        show(&ui, &logger.borrow().view);

        Ok(Self { ui, logger })
    }

    /// Run the App until the window is closed or Ctrl-C is pressed.
    fn run(&mut self) -> anyhow::Result<()> {
        // Run the UI (and map an error to an anyhow::Error).
        self.ui.run()?;

        if self.logger.borrow_mut().source.take().is_some() {
            log::info!("Port released");
        }
        Ok(())
    }
}

/// Poll the port once after `delay`, then reschedule as long as the session runs.
fn schedule_poll(logger: SharedLogger, ui_handle: slint::Weak<AppWindow>, delay: Duration) {
    slint::Timer::single_shot(delay, move || {
        let outcome = {
            let mut guard = logger.borrow_mut();
            let Logger { source, sampler, view } = &mut *guard;
            let Some(source) = source.as_mut() else {
                return;
            };

            step(sampler, &mut **source, &SystemClock, |poll, sampler| {
                view.apply(poll, sampler.history());
                if let Some(ui) = ui_handle.upgrade() {
                    show(&ui, view);
                }
            })
        };

        if let Step::Continue(delay) = outcome {
            schedule_poll(logger, ui_handle, delay);
        }
    });
}

/// Copy the view into the UI's global view model.
fn show(ui: &AppWindow, view: &DashboardView) {
    let model = ui.global::<ViewModel>();

    model.set_title(view.title.as_str().into());
    model.set_port_open(view.port_open);
    model.set_logging(view.controls == Controls::Stop);

    match &view.status {
        Some(status) => {
            model.set_status(status.text.as_str().into());
            model.set_status_is_error(status.is_error);
        }
        None => {
            model.set_status(slint::SharedString::default());
            model.set_status_is_error(false);
        }
    }

    model.set_refresh_note(view.refresh_note.as_str().into());
    model.set_have_data(view.latest.is_some());
    if let Some(sample) = &view.latest {
        model.set_current(sample.into());
    }

    model.set_have_chart(view.chart.is_some());
    if let Some(chart) = &view.chart {
        model.set_chart(chart.into());
    }
}

/// Convert a sample into the record shown in the latest-values region.
impl From<&Sample> for SampleRecord {
    fn from(sample: &Sample) -> Self {
        Self {
            temperature_celsius: sample.temperature_celsius as f32,
            humidity_percent: sample.humidity_percent as f32,
            timestamp: slint::SharedString::from(sample.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

impl From<&ChartPaths> for ChartRecord {
    fn from(chart: &ChartPaths) -> Self {
        let (t_min, t_max) = chart.temperature_range;
        let (h_min, h_max) = chart.humidity_range;
        Self {
            temperature_path: chart.temperature.as_str().into(),
            humidity_path: chart.humidity.as_str().into(),
            temperature_range: slint::format!("{t_min:.1} – {t_max:.1}"),
            humidity_range: slint::format!("{h_min:.1} – {h_max:.1}"),
            time_range: chart.time_label().into(),
        }
    }
}

/// Open the serial port, or the canned data source in demo builds.
fn open_source(config: &LoggerConfig) -> Result<Box<dyn LineSource>, PortOpenError> {
    if LoggerConfig::demo_build() {
        log::info!("Demo build, replaying canned samples instead of {}", config.port_path);
        let source = DummyLineSource::new().map_err(|e| PortOpenError::new(config, e.to_string()))?;
        return Ok(Box::new(source));
    }

    let source = port::acquire_serial(config, &mut ThreadSleeper)?;
    Ok(Box::new(source))
}

/// A minimal main function that opens the port and runs the App.
fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = LoggerConfig::from_build_env()?;
    log::debug!("{config:?}");

    // Leave the event loop on Ctrl-C so the port is released on the way out.
    ctrlc::set_handler(|| {
        if slint::invoke_from_event_loop(|| {
            let _ = slint::quit_event_loop();
        })
        .is_err()
        {
            std::process::exit(130);
        }
    })?;

    let source = open_source(&config);
    let mut app = App::new(&config, source)?;

    app.run()
}
