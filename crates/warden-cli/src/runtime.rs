// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread;
use time::{Date, OffsetDateTime};
use tracing::debug;
use warden_api::{AdminClient, ApiError, SecretPrompt};
use warden_app::{Job, JobOutcome};
use warden_console::{ConsoleRuntime, InternalEvent};

/// Runs console jobs against the admin API, one worker thread per job.
pub struct ApiRuntime {
    client: Arc<AdminClient>,
    window_days: u32,
}

impl ApiRuntime {
    pub fn new(client: AdminClient, window_days: u32) -> Self {
        Self {
            client: Arc::new(client),
            window_days,
        }
    }
}

impl ConsoleRuntime for ApiRuntime {
    fn run_job(&mut self, job: &Job) -> JobOutcome {
        execute_job(&self.client, self.window_days, today(), job)
    }

    fn spawn_job(&mut self, job: Job, tx: Sender<InternalEvent>) -> Result<()> {
        let client = Arc::clone(&self.client);
        let window_days = self.window_days;
        thread::Builder::new()
            .name("warden-job".to_owned())
            .spawn(move || {
                let outcome = execute_job(&client, window_days, today(), &job);
                // The console may already be gone on quit.
                let _ = tx.send(InternalEvent::Job(outcome));
            })
            .context("spawn worker thread")?;
        Ok(())
    }
}

pub fn execute_job(client: &AdminClient, window_days: u32, today: Date, job: &Job) -> JobOutcome {
    debug!(?job, "run job");
    match job {
        Job::Overview { generation } => JobOutcome::Overview {
            generation: *generation,
            result: client.overview(window_days, today).map_err(describe),
        },
        Job::UserPage { generation, query } => JobOutcome::UserPage {
            generation: *generation,
            query: query.clone(),
            result: client.list_users(query).map_err(describe),
        },
        Job::UserDetail(ticket) => JobOutcome::UserDetail {
            ticket: ticket.clone(),
            result: client.user_detail(&ticket.uid).map_err(describe),
        },
        Job::Online {
            generation,
            minutes,
        } => JobOutcome::Online {
            generation: *generation,
            minutes: *minutes,
            result: client.online_users(*minutes).map_err(describe),
        },
        Job::Account(action) => JobOutcome::Account {
            action: action.clone(),
            result: client.apply_account(action).map(|_| ()).map_err(describe),
        },
        Job::Payout(action) => JobOutcome::Payout {
            action: action.clone(),
            result: client.payout(action).map_err(describe),
        },
    }
}

fn describe(error: ApiError) -> String {
    if matches!(error, ApiError::Http { status: 401, .. }) {
        return format!("{error}; the admin secret was rejected twice");
    }
    error.to_string()
}

fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Forwards secret prompts to the console loop and waits for its answer.
pub struct ChannelPrompt {
    tx: Sender<InternalEvent>,
}

impl ChannelPrompt {
    pub fn new(tx: Sender<InternalEvent>) -> Self {
        Self { tx }
    }
}

impl SecretPrompt for ChannelPrompt {
    fn prompt_secret(&mut self) -> Option<String> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(InternalEvent::SecretRequested(reply_tx))
            .ok()?;
        reply_rx.recv().ok().flatten()
    }
}
