use chrono::{DateTime, Local};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dht_logger_model::{parse_line, History, MalformedSampleError, Sample};

use crate::clock::{Clock, Sleeper};
use crate::config::Timing;
use crate::source::LineSource;

/// Asks a running loop to stop. The request is seen at the start of the next poll,
/// a sleep or read that is in progress is never interrupted.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::Relaxed)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// One run from "Start Logging" to "Stop Logging".
#[derive(Clone, Debug)]
pub struct Session {
    pub started: DateTime<Local>,
    pub history: History,
    pub malformed_lines: usize,
}

/// What a single poll of the port did.
#[derive(Debug)]
pub enum Poll {
    /// Not logging, nothing was read.
    Idle,
    /// A stop was requested; this is the session that just ended.
    Stopped(Session),
    /// No complete line was waiting.
    NoData,
    /// A sample was appended to the history. `redraw` is set on every n-th sample.
    Recorded { sample: Sample, redraw: bool },
    /// A line arrived that is not a sample. It was dropped.
    Malformed(MalformedSampleError),
    /// The port reported an error other than a timeout.
    ReadFailed(io::Error),
}

impl Poll {
    /// How long to wait before polling again, `None` once the loop is over.
    pub fn next_delay(&self, timing: &Timing) -> Option<Duration> {
        match self {
            Poll::Idle | Poll::Stopped(_) => None,
            Poll::NoData => Some(timing.poll_interval()),
            Poll::Recorded { .. } | Poll::Malformed(_) | Poll::ReadFailed(_) => {
                Some(timing.sample_interval())
            }
        }
    }
}

/// The Idle/Logging state machine around a session's history.
#[derive(Debug)]
pub struct Sampler {
    timing: Timing,
    session: Option<Session>,
    stop: StopHandle,
}

impl Sampler {
    pub fn new(timing: Timing) -> Self {
        Self {
            timing,
            session: None,
            stop: StopHandle::default(),
        }
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn history(&self) -> Option<&History> {
        self.session.as_ref().map(|session| &session.history)
    }

    /// Begin a new session with an empty history. Returns false if already logging.
    pub fn start(&mut self, now: DateTime<Local>) -> bool {
        if self.session.is_some() {
            return false;
        }

        log::info!("Logging started");
        self.stop.reset();
        self.session = Some(Session {
            started: now,
            history: History::new(),
            malformed_lines: 0,
        });
        true
    }

    /// Check the port once and process at most one line.
    pub fn poll(&mut self, source: &mut dyn LineSource, clock: &dyn Clock) -> Poll {
        if self.session.is_none() {
            return Poll::Idle;
        }

        if self.stop.take() {
            return match self.session.take() {
                Some(session) => {
                    let started = session.started.format("%H:%M:%S");
                    if session.history.is_empty() {
                        log::info!("Logging stopped without samples (session started {started})");
                    } else {
                        log::info!(
                            "Logging stopped after {} samples ({} malformed lines, session started {started})",
                            session.history.len(),
                            session.malformed_lines
                        );
                    }
                    Poll::Stopped(session)
                }
                None => Poll::Idle,
            };
        }

        let Some(session) = self.session.as_mut() else {
            return Poll::Idle;
        };

        match source.bytes_available() {
            Ok(0) => return Poll::NoData,
            Ok(_) => {}
            Err(e) => {
                log::warn!("Could not query the port: {e}");
                return Poll::ReadFailed(e);
            }
        }

        let line = match source.read_line() {
            Ok(Some(line)) => line,
            Ok(None) => return Poll::NoData,
            Err(e) => {
                log::warn!("Could not read from the port: {e}");
                return Poll::ReadFailed(e);
            }
        };

        match parse_line(&line) {
            Ok(reading) => {
                let sample = session.history.record(reading, clock.now());
                let redraw = session.history.len() % self.timing.chart_redraw_every().get() == 0;
                log::debug!("#{} {}", session.history.len(), sample);
                Poll::Recorded { sample, redraw }
            }
            Err(e) => {
                session.malformed_lines += 1;
                log::warn!("{e}");
                Poll::Malformed(e)
            }
        }
    }
}

/// What the driver of the loop should do after a [`step`].
#[derive(Debug)]
pub enum Step {
    /// Poll again after this delay.
    Continue(Duration),
    /// The loop is over. Holds the finished session if a stop ended it.
    Finished(Option<Session>),
}

/// Poll once, report the poll to `on_poll` and work out when to poll next.
///
/// Both the UI timer and [`run`] are built from this.
pub fn step<F>(
    sampler: &mut Sampler,
    source: &mut dyn LineSource,
    clock: &dyn Clock,
    on_poll: F,
) -> Step
where
    F: FnOnce(&Poll, &Sampler),
{
    let poll = sampler.poll(source, clock);
    on_poll(&poll, sampler);

    match poll.next_delay(sampler.timing()) {
        Some(delay) => Step::Continue(delay),
        None => match poll {
            Poll::Stopped(session) => Step::Finished(Some(session)),
            _ => Step::Finished(None),
        },
    }
}

/// Drive `sampler` on the calling thread until the session is stopped.
///
/// Every poll is reported to `on_poll` before sleeping. Returns the finished
/// session, or `None` if the sampler was not logging.
pub fn run<F>(
    sampler: &mut Sampler,
    source: &mut dyn LineSource,
    clock: &dyn Clock,
    sleeper: &mut dyn Sleeper,
    mut on_poll: F,
) -> Option<Session>
where
    F: FnMut(&Poll, &Sampler),
{
    loop {
        match step(sampler, source, clock, &mut on_poll) {
            Step::Continue(delay) => sleeper.sleep(delay),
            Step::Finished(session) => return session,
        }
    }
}
