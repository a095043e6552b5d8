// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod input;
mod render;

pub use input::{Command, HELP_TEXT, is_affirmative, parse_command};
pub use render::{format_amount, render_frame, render_series_text, render_tabs, sparkline};

use anyhow::{Context, Result, anyhow};
use std::collections::VecDeque;
use std::io::Write;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Instant;
use tracing::debug;
use warden_app::{Applied, ConsoleState, Effect, Intent, Job, JobOutcome, PollingScheduler};

/// Backend seam for the console loop.
pub trait ConsoleRuntime {
    fn run_job(&mut self, job: &Job) -> JobOutcome;

    /// Runs `job` and reports on `tx`. The default runs inline, which is
    /// only safe for runtimes that never ask the loop for a secret.
    fn spawn_job(&mut self, job: Job, tx: Sender<InternalEvent>) -> Result<()> {
        let outcome = self.run_job(&job);
        tx.send(InternalEvent::Job(outcome))
            .map_err(|_| anyhow!("console event channel closed"))
    }
}

/// Terminal hook for hiding keystrokes while the admin secret is typed.
pub trait SecretEcho {
    fn set_masked(&mut self, masked: bool) -> Result<()>;
}

/// Leaves the terminal alone. Used when input is not a terminal.
#[derive(Debug, Default)]
pub struct VisibleInput;

impl SecretEcho for VisibleInput {
    fn set_masked(&mut self, _masked: bool) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
pub enum InternalEvent {
    Line(String),
    InputClosed,
    Job(JobOutcome),
    /// A worker needs the admin secret; the next input line answers it.
    SecretRequested(Sender<Option<String>>),
}

#[derive(Debug)]
enum Pending {
    Secret(Sender<Option<String>>),
    Confirm { prompt: String, job: Job },
}

impl Pending {
    fn prompt(&self) -> String {
        match self {
            Self::Secret(_) => "admin secret: ".to_owned(),
            Self::Confirm { prompt, .. } => format!("{prompt} [y/N] "),
        }
    }
}

/// Owns the console state and the polling timers, and runs the event loop.
pub struct Console {
    state: ConsoleState,
    scheduler: PollingScheduler,
    tx: Sender<InternalEvent>,
    rx: Receiver<InternalEvent>,
    pending: VecDeque<Pending>,
    echo: Box<dyn SecretEcho>,
    masked: bool,
    last_frame: String,
    quit: bool,
}

impl Console {
    pub fn new(state: ConsoleState, scheduler: PollingScheduler) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            state,
            scheduler,
            tx,
            rx,
            pending: VecDeque::new(),
            echo: Box::new(VisibleInput),
            masked: false,
            last_frame: String::new(),
            quit: false,
        }
    }

    pub fn with_secret_echo(mut self, echo: Box<dyn SecretEcho>) -> Self {
        self.echo = echo;
        self
    }

    /// Sender for input lines and secret requests.
    pub fn sender(&self) -> Sender<InternalEvent> {
        self.tx.clone()
    }

    pub fn state(&self) -> &ConsoleState {
        &self.state
    }

    pub fn scheduler(&self) -> &PollingScheduler {
        &self.scheduler
    }

    pub fn is_finished(&self) -> bool {
        self.quit
    }

    pub fn run<R: ConsoleRuntime, W: Write>(
        &mut self,
        runtime: &mut R,
        out: &mut W,
    ) -> Result<()> {
        self.start(runtime, out)?;
        let result = self.event_loop(runtime, out);
        if self.masked {
            self.echo.set_masked(false)?;
            self.masked = false;
        }
        result
    }

    fn event_loop<R: ConsoleRuntime, W: Write>(
        &mut self,
        runtime: &mut R,
        out: &mut W,
    ) -> Result<()> {
        while !self.quit {
            match self.next_event() {
                Some(event) => self.handle(event, runtime, out)?,
                None => self.fire_polls(Instant::now(), runtime, out)?,
            }
        }
        Ok(())
    }

    /// Issues the first load and arms the background overview timer.
    pub fn start<R: ConsoleRuntime, W: Write>(
        &mut self,
        runtime: &mut R,
        out: &mut W,
    ) -> Result<()> {
        self.scheduler.start_background(Instant::now());
        let effects = self.state.boot();
        self.execute(effects, runtime, out)?;
        self.present(out)
    }

    pub fn handle<R: ConsoleRuntime, W: Write>(
        &mut self,
        event: InternalEvent,
        runtime: &mut R,
        out: &mut W,
    ) -> Result<()> {
        match event {
            InternalEvent::Line(line) => self.handle_line(&line, runtime, out)?,
            InternalEvent::InputClosed => {
                self.quit = true;
                return Ok(());
            }
            InternalEvent::Job(outcome) => match self.state.apply(outcome) {
                Applied::Stale => debug!("discarding stale result"),
                Applied::Effects(effects) => self.execute(effects, runtime, out)?,
            },
            InternalEvent::SecretRequested(reply) => {
                self.push_pending(Pending::Secret(reply), out)?;
                return Ok(());
            }
        }
        self.present(out)
    }

    /// Handles every event already queued without blocking.
    pub fn drain<R: ConsoleRuntime, W: Write>(
        &mut self,
        runtime: &mut R,
        out: &mut W,
    ) -> Result<()> {
        while !self.quit {
            let Ok(event) = self.rx.try_recv() else {
                break;
            };
            self.handle(event, runtime, out)?;
        }
        Ok(())
    }

    pub fn fire_polls<R: ConsoleRuntime, W: Write>(
        &mut self,
        now: Instant,
        runtime: &mut R,
        out: &mut W,
    ) -> Result<()> {
        let fired = self.scheduler.fire_due(now, self.state.active_view());
        for fire in fired {
            let effects = self.state.dispatch(Intent::Poll(fire));
            self.execute(effects, runtime, out)?;
        }
        self.present(out)
    }

    fn next_event(&self) -> Option<InternalEvent> {
        let Some(deadline) = self.scheduler.next_deadline() else {
            return Some(self.rx.recv().unwrap_or(InternalEvent::InputClosed));
        };
        let wait = deadline.saturating_duration_since(Instant::now());
        match self.rx.recv_timeout(wait) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(InternalEvent::InputClosed),
        }
    }

    fn handle_line<R: ConsoleRuntime, W: Write>(
        &mut self,
        line: &str,
        runtime: &mut R,
        out: &mut W,
    ) -> Result<()> {
        if let Some(pending) = self.pending.pop_front() {
            self.sync_echo()?;
            self.answer(pending, line, runtime, out)?;
            self.sync_echo()?;
            if let Some(next) = self.pending.front() {
                write!(out, "{}", next.prompt()).context("write prompt")?;
                out.flush().context("flush prompt")?;
            }
            return Ok(());
        }

        match parse_command(line) {
            Ok(Command::Blank) => {}
            Ok(Command::Help) => writeln!(out, "{HELP_TEXT}").context("write help")?,
            Ok(Command::Intents(intents)) => {
                for intent in intents {
                    let effects = self.state.dispatch(intent);
                    self.execute(effects, runtime, out)?;
                }
            }
            Err(error) => writeln!(out, "{error:#}").context("write input error")?,
        }
        Ok(())
    }

    fn answer<R: ConsoleRuntime, W: Write>(
        &mut self,
        pending: Pending,
        line: &str,
        runtime: &mut R,
        out: &mut W,
    ) -> Result<()> {
        match pending {
            Pending::Secret(reply) => {
                // The worker may have given up; nothing to do then.
                let _ = reply.send(Some(line.to_owned()));
            }
            Pending::Confirm { job, .. } => {
                if is_affirmative(line) {
                    let effects = self.state.dispatch(Intent::Confirmed(job));
                    self.execute(effects, runtime, out)?;
                } else {
                    writeln!(out, "cancelled").context("write cancel notice")?;
                }
            }
        }
        Ok(())
    }

    fn execute<R: ConsoleRuntime, W: Write>(
        &mut self,
        effects: Vec<Effect>,
        runtime: &mut R,
        out: &mut W,
    ) -> Result<()> {
        for effect in effects {
            match effect {
                Effect::Run(job) => {
                    debug!(?job, "spawn job");
                    runtime.spawn_job(job, self.tx.clone())?;
                }
                Effect::Confirm { prompt, job } => {
                    self.push_pending(Pending::Confirm { prompt, job }, out)?;
                }
                Effect::StartPolling(view) => {
                    let timer = self.scheduler.start(view, Instant::now());
                    debug!(view = view.as_str(), timer = timer.get(), "polling started");
                }
                Effect::StopPolling(view) => {
                    if self.scheduler.stop(view) {
                        debug!(view = view.as_str(), "polling stopped");
                    }
                }
                Effect::Quit => self.quit = true,
            }
        }
        Ok(())
    }

    fn push_pending<W: Write>(&mut self, pending: Pending, out: &mut W) -> Result<()> {
        if self.pending.is_empty() {
            write!(out, "{}", pending.prompt()).context("write prompt")?;
            out.flush().context("flush prompt")?;
        }
        self.pending.push_back(pending);
        self.sync_echo()
    }

    // Keystrokes are hidden exactly while a secret prompt is first in line.
    fn sync_echo(&mut self) -> Result<()> {
        let want = matches!(self.pending.front(), Some(Pending::Secret(_)));
        if want != self.masked {
            self.echo.set_masked(want)?;
            self.masked = want;
        }
        Ok(())
    }

    // Prints the status line once, then the frame if it changed.
    fn present<W: Write>(&mut self, out: &mut W) -> Result<()> {
        if self.quit {
            return Ok(());
        }
        if let Some(status) = self.state.status_line() {
            writeln!(out, "-- {status}").context("write status")?;
            self.state.dispatch(Intent::ClearStatus);
        }
        let frame = render_frame(&self.state);
        if frame != self.last_frame {
            writeln!(out, "{frame}").context("write frame")?;
            self.last_frame = frame;
        }
        out.flush().context("flush frame")
    }
}

#[cfg(test)]
mod tests {
    use super::{Console, ConsoleRuntime, InternalEvent, SecretEcho};
    use anyhow::Result;
    use std::sync::{Arc, Mutex, mpsc};
    use std::time::{Duration, Instant};
    use warden_app::{
        AccountAction, ChartSeries, ChartSet, ConsoleState, Job, JobOutcome, OnlineUser, Overview,
        PageState, Panel, PollingScheduler, Provenance, SeriesKind, StatsSummary, UserDetail,
        UserId, UserPage, UserRow, ViewKind,
    };

    #[derive(Default)]
    struct TestRuntime {
        jobs: Vec<Job>,
        user_count: u64,
        fail_detail: bool,
    }

    fn empty_series(kind: SeriesKind) -> ChartSeries {
        ChartSeries {
            kind,
            points: Vec::new(),
            provenance: Provenance::Synthesized,
        }
    }

    fn detail(uid: &UserId) -> UserDetail {
        UserDetail {
            uid: uid.clone(),
            username: Some(format!("player-{uid}")),
            email: None,
            balance: Some(10.0),
            usage: Some(2),
            created_at: None,
            last_seen: None,
            extra: Default::default(),
        }
    }

    impl ConsoleRuntime for TestRuntime {
        fn run_job(&mut self, job: &Job) -> JobOutcome {
            self.jobs.push(job.clone());
            match job {
                Job::Overview { generation } => JobOutcome::Overview {
                    generation: *generation,
                    result: Ok(Overview {
                        stats: StatsSummary {
                            total_users: self.user_count,
                            ..StatsSummary::default()
                        },
                        charts: ChartSet {
                            growth: empty_series(SeriesKind::Growth),
                            daily: empty_series(SeriesKind::Daily),
                        },
                    }),
                },
                Job::UserPage { generation, query } => JobOutcome::UserPage {
                    generation: *generation,
                    query: query.clone(),
                    result: Ok(UserPage {
                        rows: vec![UserRow {
                            uid: UserId::new("u1"),
                            username: Some("ada".to_owned()),
                            balance: Some(4.0),
                            usage: None,
                            last_seen: None,
                        }],
                        count: self.user_count,
                        offset: query.offset,
                        limit: query.limit,
                    }),
                },
                Job::UserDetail(ticket) => JobOutcome::UserDetail {
                    ticket: ticket.clone(),
                    result: if self.fail_detail {
                        Err("server returned 404".to_owned())
                    } else {
                        Ok(detail(&ticket.uid))
                    },
                },
                Job::Online {
                    generation,
                    minutes,
                } => JobOutcome::Online {
                    generation: *generation,
                    minutes: *minutes,
                    result: Ok(vec![OnlineUser {
                        uid: UserId::new("u2"),
                        username: None,
                        last_seen: None,
                    }]),
                },
                Job::Account(action) => JobOutcome::Account {
                    action: action.clone(),
                    result: Ok(()),
                },
                Job::Payout(action) => JobOutcome::Payout {
                    action: action.clone(),
                    result: Ok(serde_json::json!({"ok": true, "raw": "done"})),
                },
            }
        }
    }

    fn console() -> Console {
        Console::new(
            ConsoleState::new(PageState::new(25), 5),
            PollingScheduler::new(Duration::from_secs(5), Duration::from_secs(60)),
        )
    }

    fn feed(
        console: &mut Console,
        runtime: &mut TestRuntime,
        out: &mut Vec<u8>,
        lines: &[&str],
    ) -> Result<()> {
        for line in lines {
            console.handle(InternalEvent::Line((*line).to_owned()), runtime, out)?;
            console.drain(runtime, out)?;
        }
        Ok(())
    }

    #[derive(Clone, Default)]
    struct RecordingEcho(Arc<Mutex<Vec<bool>>>);

    impl RecordingEcho {
        fn calls(&self) -> Vec<bool> {
            self.0.lock().map(|calls| calls.clone()).unwrap_or_default()
        }
    }

    impl SecretEcho for RecordingEcho {
        fn set_masked(&mut self, masked: bool) -> Result<()> {
            if let Ok(mut calls) = self.0.lock() {
                calls.push(masked);
            }
            Ok(())
        }
    }

    fn text(out: &[u8]) -> String {
        String::from_utf8_lossy(out).into_owned()
    }

    #[test]
    fn start_loads_overview_and_arms_background_timer() -> Result<()> {
        let mut console = console();
        let mut runtime = TestRuntime {
            user_count: 42,
            ..TestRuntime::default()
        };
        let mut out = Vec::new();

        console.start(&mut runtime, &mut out)?;
        console.drain(&mut runtime, &mut out)?;

        assert!(matches!(runtime.jobs.as_slice(), [Job::Overview { .. }]));
        assert_eq!(console.scheduler().active_timers(), 1);
        assert!(text(&out).contains("users: 42"));
        Ok(())
    }

    #[test]
    fn switching_views_moves_the_live_timer() -> Result<()> {
        let mut console = console();
        let mut runtime = TestRuntime::default();
        let mut out = Vec::new();
        console.start(&mut runtime, &mut out)?;

        feed(&mut console, &mut runtime, &mut out, &["users"])?;
        assert!(console.scheduler().timer_for(ViewKind::Users).is_some());

        feed(&mut console, &mut runtime, &mut out, &["online 10"])?;
        assert!(console.scheduler().timer_for(ViewKind::Users).is_none());
        assert!(console.scheduler().timer_for(ViewKind::Online).is_some());
        assert!(matches!(
            runtime.jobs.last(),
            Some(Job::Online { minutes: 10, .. })
        ));
        assert!(text(&out).contains("1 online in the last 10 min"));
        Ok(())
    }

    #[test]
    fn poll_refreshes_only_the_active_view() -> Result<()> {
        let mut console = console();
        let mut runtime = TestRuntime::default();
        let mut out = Vec::new();
        console.start(&mut runtime, &mut out)?;
        feed(&mut console, &mut runtime, &mut out, &["users"])?;
        let before = runtime.jobs.len();

        console.fire_polls(
            Instant::now() + Duration::from_secs(6),
            &mut runtime,
            &mut out,
        )?;
        console.drain(&mut runtime, &mut out)?;

        let fresh = &runtime.jobs[before..];
        assert_eq!(fresh.len(), 1);
        assert!(matches!(fresh[0], Job::UserPage { .. }));
        Ok(())
    }

    #[test]
    fn identical_poll_results_do_not_reprint() -> Result<()> {
        let mut console = console();
        let mut runtime = TestRuntime::default();
        let mut out = Vec::new();
        console.start(&mut runtime, &mut out)?;
        feed(&mut console, &mut runtime, &mut out, &["online"])?;
        let printed = out.len();

        console.fire_polls(
            Instant::now() + Duration::from_secs(6),
            &mut runtime,
            &mut out,
        )?;
        console.drain(&mut runtime, &mut out)?;
        assert_eq!(out.len(), printed);
        Ok(())
    }

    #[test]
    fn destructive_action_waits_for_confirmation() -> Result<()> {
        let mut console = console();
        let mut runtime = TestRuntime::default();
        let mut out = Vec::new();
        console.start(&mut runtime, &mut out)?;

        feed(&mut console, &mut runtime, &mut out, &["reset-balance u1"])?;
        assert!(!runtime.jobs.iter().any(|job| matches!(job, Job::Account(_))));
        assert!(text(&out).contains("reset balance of u1 to zero? [y/N] "));

        feed(&mut console, &mut runtime, &mut out, &["n"])?;
        assert!(text(&out).contains("cancelled"));
        assert!(!runtime.jobs.iter().any(|job| matches!(job, Job::Account(_))));

        feed(&mut console, &mut runtime, &mut out, &["reset-balance u1", "yes"])?;
        assert!(runtime.jobs.contains(&Job::Account(AccountAction::ResetBalance(
            UserId::new("u1")
        ))));
        assert!(text(&out).contains("-- balance of u1 reset"));
        Ok(())
    }

    #[test]
    fn secret_request_takes_the_next_line() -> Result<()> {
        let mut console = console();
        let mut runtime = TestRuntime::default();
        let mut out = Vec::new();
        let (reply_tx, reply_rx) = mpsc::channel();

        console.handle(InternalEvent::SecretRequested(reply_tx), &mut runtime, &mut out)?;
        assert!(text(&out).ends_with("admin secret: "));

        feed(&mut console, &mut runtime, &mut out, &["quit"])?;
        assert_eq!(reply_rx.recv()?, Some("quit".to_owned()));
        assert!(!console.is_finished());
        Ok(())
    }

    #[test]
    fn secret_is_typed_hidden_and_forwarded_verbatim() -> Result<()> {
        let echo = RecordingEcho::default();
        let mut console = console().with_secret_echo(Box::new(echo.clone()));
        let mut runtime = TestRuntime::default();
        let mut out = Vec::new();
        let (first_tx, first_rx) = mpsc::channel();
        let (second_tx, second_rx) = mpsc::channel();

        console.handle(InternalEvent::SecretRequested(first_tx), &mut runtime, &mut out)?;
        console.handle(InternalEvent::SecretRequested(second_tx), &mut runtime, &mut out)?;
        assert_eq!(echo.calls(), vec![true]);

        feed(&mut console, &mut runtime, &mut out, &["  pass word  "])?;
        assert_eq!(first_rx.recv()?, Some("  pass word  ".to_owned()));
        assert_eq!(echo.calls(), vec![true]);
        assert!(!text(&out).contains("pass word"));

        feed(&mut console, &mut runtime, &mut out, &["again"])?;
        assert_eq!(second_rx.recv()?, Some("again".to_owned()));
        assert_eq!(echo.calls(), vec![true, false]);

        feed(&mut console, &mut runtime, &mut out, &["users"])?;
        assert_eq!(echo.calls(), vec![true, false]);
        Ok(())
    }

    #[test]
    fn input_closing_mid_secret_restores_echo() -> Result<()> {
        let echo = RecordingEcho::default();
        let mut console = console().with_secret_echo(Box::new(echo.clone()));
        let mut runtime = TestRuntime::default();
        let mut out = Vec::new();
        let (reply_tx, _reply_rx) = mpsc::channel();
        let sender = console.sender();
        sender.send(InternalEvent::SecretRequested(reply_tx))?;
        sender.send(InternalEvent::InputClosed)?;

        console.run(&mut runtime, &mut out)?;
        assert_eq!(echo.calls(), vec![true, false]);
        Ok(())
    }

    #[test]
    fn failed_detail_lands_in_its_panel() -> Result<()> {
        let mut console = console();
        let mut runtime = TestRuntime {
            fail_detail: true,
            ..TestRuntime::default()
        };
        let mut out = Vec::new();
        console.start(&mut runtime, &mut out)?;

        feed(&mut console, &mut runtime, &mut out, &["select u5"])?;
        assert_eq!(
            console.state().panels().detail,
            Panel::Failed("server returned 404".to_owned())
        );
        assert!(text(&out).contains("error: server returned 404"));
        Ok(())
    }

    #[test]
    fn bad_input_prints_a_hint_and_quit_stops() -> Result<()> {
        let mut console = console();
        let mut runtime = TestRuntime::default();
        let mut out = Vec::new();
        console.start(&mut runtime, &mut out)?;

        feed(&mut console, &mut runtime, &mut out, &["frobnicate"])?;
        assert!(text(&out).contains("unknown command \"frobnicate\""));

        feed(&mut console, &mut runtime, &mut out, &["quit"])?;
        assert!(console.is_finished());
        Ok(())
    }

    #[test]
    fn run_returns_when_input_closes() -> Result<()> {
        let mut console = console();
        let mut runtime = TestRuntime::default();
        let mut out = Vec::new();
        let sender = console.sender();
        sender.send(InternalEvent::Line("users".to_owned()))?;
        sender.send(InternalEvent::InputClosed)?;

        console.run(&mut runtime, &mut out)?;
        assert!(console.is_finished());
        assert!(runtime.jobs.iter().any(|job| matches!(job, Job::UserPage { .. })));
        Ok(())
    }
}
