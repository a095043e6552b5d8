// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{
    AccountAction, Generation, OnlineSnapshot, OnlineUser, Overview, PageOutcome, PageQuery,
    PageState, Panel, PayoutAction, PayoutReceipt, PollFire, SortOrder, UserDetail, UserId,
    UserPage, ViewKind,
};
use serde_json::Value;

pub const DEFAULT_ONLINE_MINUTES: u32 = 5;

/// A named operator intent. Input handling maps keystrokes or typed commands
/// onto these; nothing else mutates [`ConsoleState`].
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    ShowView(ViewKind),
    Refresh,
    Poll(PollFire),
    Search {
        term: String,
        order: Option<SortOrder>,
    },
    NextPage,
    PrevPage,
    Select(UserId),
    SetOnlineWindow(u32),
    Account(AccountAction),
    Payout(PayoutAction),
    Confirmed(Job),
    ClearStatus,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailTicket {
    pub uid: UserId,
    pub generation: Generation,
}

/// Work the event loop hands to the runtime. Every read carries the
/// generation it was issued under.
#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    Overview { generation: Generation },
    UserPage { generation: Generation, query: PageQuery },
    UserDetail(DetailTicket),
    Online { generation: Generation, minutes: u32 },
    Account(AccountAction),
    Payout(PayoutAction),
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Overview {
        generation: Generation,
        result: Result<Overview, String>,
    },
    UserPage {
        generation: Generation,
        query: PageQuery,
        result: Result<UserPage, String>,
    },
    UserDetail {
        ticket: DetailTicket,
        result: Result<UserDetail, String>,
    },
    Online {
        generation: Generation,
        minutes: u32,
        result: Result<Vec<OnlineUser>, String>,
    },
    Account {
        action: AccountAction,
        result: Result<(), String>,
    },
    Payout {
        action: PayoutAction,
        result: Result<Value, String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Run(Job),
    Confirm { prompt: String, job: Job },
    StartPolling(ViewKind),
    StopPolling(ViewKind),
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// The result no longer matches the view or selection it was issued for.
    Stale,
    Effects(Vec<Effect>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Panels {
    pub overview: Panel<Overview>,
    pub users: Panel<UserPage>,
    pub detail: Panel<UserDetail>,
    pub online: Panel<OnlineSnapshot>,
    pub payout: Panel<PayoutReceipt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct ViewGenerations {
    overview: Generation,
    users: Generation,
    online: Generation,
}

impl ViewGenerations {
    fn get(&self, view: ViewKind) -> Generation {
        match view {
            ViewKind::Overview => self.overview,
            ViewKind::Users => self.users,
            ViewKind::Online => self.online,
        }
    }

    fn bump(&mut self, view: ViewKind) -> Generation {
        let slot = match view {
            ViewKind::Overview => &mut self.overview,
            ViewKind::Users => &mut self.users,
            ViewKind::Online => &mut self.online,
        };
        *slot = slot.next();
        *slot
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleState {
    active_view: ViewKind,
    page: PageState,
    selection: Option<UserId>,
    selection_generation: Generation,
    generations: ViewGenerations,
    online_minutes: u32,
    panels: Panels,
    status_line: Option<String>,
}

impl Default for ConsoleState {
    fn default() -> Self {
        Self::new(PageState::default(), DEFAULT_ONLINE_MINUTES)
    }
}

impl ConsoleState {
    pub fn new(page: PageState, online_minutes: u32) -> Self {
        Self {
            active_view: ViewKind::Overview,
            page,
            selection: None,
            selection_generation: Generation::default(),
            generations: ViewGenerations::default(),
            online_minutes: online_minutes.max(1),
            panels: Panels::default(),
            status_line: None,
        }
    }

    pub fn active_view(&self) -> ViewKind {
        self.active_view
    }

    pub fn page(&self) -> &PageState {
        &self.page
    }

    pub fn selection(&self) -> Option<&UserId> {
        self.selection.as_ref()
    }

    pub fn online_minutes(&self) -> u32 {
        self.online_minutes
    }

    pub fn panels(&self) -> &Panels {
        &self.panels
    }

    pub fn status_line(&self) -> Option<&str> {
        self.status_line.as_deref()
    }

    /// Effects for the first frame: load the active view and arm its timer.
    pub fn boot(&mut self) -> Vec<Effect> {
        let view = self.active_view;
        let mut effects = Vec::new();
        if view != ViewKind::Overview {
            effects.push(Effect::Run(self.refresh_job(ViewKind::Overview)));
        }
        effects.push(Effect::Run(self.refresh_job(view)));
        if view.is_pollable() {
            effects.push(Effect::StartPolling(view));
        }
        effects
    }

    pub fn dispatch(&mut self, intent: Intent) -> Vec<Effect> {
        match intent {
            Intent::ShowView(view) => {
                let mut effects = self.enter_view(view);
                effects.push(Effect::Run(self.refresh_job(view)));
                effects
            }
            Intent::Refresh => vec![Effect::Run(self.refresh_job(self.active_view))],
            Intent::Poll(PollFire::Overview) => {
                vec![Effect::Run(self.refresh_job(ViewKind::Overview))]
            }
            Intent::Poll(PollFire::View(view)) => {
                if view != self.active_view {
                    return Vec::new();
                }
                vec![Effect::Run(self.refresh_job(view))]
            }
            Intent::Search { term, order } => {
                let order = order.unwrap_or(self.page.order());
                let mut effects = self.enter_view(ViewKind::Users);
                let query = self.page.reset(&term, order);
                effects.push(Effect::Run(self.users_job(query)));
                effects
            }
            Intent::NextPage => {
                if self.active_view != ViewKind::Users {
                    self.set_status("paging applies to the users view");
                    return Vec::new();
                }
                match self.page.next() {
                    Some(query) => vec![Effect::Run(self.users_job(query))],
                    None => {
                        self.set_status("already on the last page");
                        Vec::new()
                    }
                }
            }
            Intent::PrevPage => {
                if self.active_view != ViewKind::Users {
                    self.set_status("paging applies to the users view");
                    return Vec::new();
                }
                let query = self.page.prev();
                vec![Effect::Run(self.users_job(query))]
            }
            Intent::Select(uid) => vec![Effect::Run(self.select(uid))],
            // Takes effect on the next online fetch; `ShowView` issues it.
            Intent::SetOnlineWindow(minutes) => {
                self.online_minutes = minutes.max(1);
                self.set_status(&format!("online window {} min", self.online_minutes));
                Vec::new()
            }
            Intent::Account(action) => match action.confirmation_prompt() {
                Some(prompt) => vec![Effect::Confirm {
                    prompt,
                    job: Job::Account(action),
                }],
                None => vec![Effect::Run(Job::Account(action))],
            },
            Intent::Payout(action) => match action.confirmation_prompt() {
                Some(prompt) => vec![Effect::Confirm {
                    prompt,
                    job: Job::Payout(action),
                }],
                None => vec![Effect::Run(self.payout_job(action))],
            },
            Intent::Confirmed(Job::Payout(action)) => vec![Effect::Run(self.payout_job(action))],
            Intent::Confirmed(job) => vec![Effect::Run(job)],
            Intent::ClearStatus => {
                self.status_line = None;
                Vec::new()
            }
            Intent::Quit => vec![Effect::Quit],
        }
    }

    pub fn apply(&mut self, outcome: JobOutcome) -> Applied {
        match outcome {
            JobOutcome::Overview { generation, result } => {
                if generation != self.generations.get(ViewKind::Overview) {
                    return Applied::Stale;
                }
                self.panels.overview = into_panel(result);
                Applied::Effects(Vec::new())
            }
            JobOutcome::UserPage {
                generation,
                query,
                result,
            } => {
                if generation != self.generations.get(ViewKind::Users) {
                    return Applied::Stale;
                }
                Applied::Effects(self.apply_user_page(&query, result))
            }
            JobOutcome::UserDetail { ticket, result } => {
                if ticket.generation != self.selection_generation
                    || self.selection.as_ref() != Some(&ticket.uid)
                {
                    return Applied::Stale;
                }
                self.panels.detail = into_panel(result);
                Applied::Effects(Vec::new())
            }
            JobOutcome::Online {
                generation,
                minutes,
                result,
            } => {
                if generation != self.generations.get(ViewKind::Online) {
                    return Applied::Stale;
                }
                self.panels.online =
                    into_panel(result.map(|users| OnlineSnapshot { minutes, users }));
                Applied::Effects(Vec::new())
            }
            JobOutcome::Account { action, result } => {
                Applied::Effects(self.apply_account(action, result))
            }
            JobOutcome::Payout { action, result } => {
                self.panels.payout = match result {
                    Ok(body) => Panel::Ready(PayoutReceipt { action, body }),
                    Err(error) => Panel::Failed(error),
                };
                Applied::Effects(Vec::new())
            }
        }
    }

    fn enter_view(&mut self, view: ViewKind) -> Vec<Effect> {
        let previous = self.active_view;
        if previous == view {
            return Vec::new();
        }

        let mut effects = Vec::new();
        if previous.is_pollable() {
            effects.push(Effect::StopPolling(previous));
            // Answers still in flight for the view being left are dropped.
            self.generations.bump(previous);
        }
        self.active_view = view;
        self.set_status(view.as_str());
        if view.is_pollable() {
            effects.push(Effect::StartPolling(view));
        }
        effects
    }

    fn refresh_job(&mut self, view: ViewKind) -> Job {
        match view {
            ViewKind::Overview => {
                self.panels.overview.begin_loading();
                Job::Overview {
                    generation: self.generations.bump(ViewKind::Overview),
                }
            }
            ViewKind::Users => {
                let query = self.page.query();
                self.users_job(query)
            }
            ViewKind::Online => {
                self.panels.online.begin_loading();
                Job::Online {
                    generation: self.generations.bump(ViewKind::Online),
                    minutes: self.online_minutes,
                }
            }
        }
    }

    fn users_job(&mut self, query: PageQuery) -> Job {
        self.panels.users.begin_loading();
        Job::UserPage {
            generation: self.generations.bump(ViewKind::Users),
            query,
        }
    }

    fn payout_job(&mut self, action: PayoutAction) -> Job {
        self.panels.payout = Panel::Loading;
        Job::Payout(action)
    }

    fn select(&mut self, uid: UserId) -> Job {
        self.selection_generation = self.selection_generation.next();
        self.selection = Some(uid.clone());
        self.panels.detail = Panel::Loading;
        Job::UserDetail(DetailTicket {
            uid,
            generation: self.selection_generation,
        })
    }

    fn apply_user_page(
        &mut self,
        query: &PageQuery,
        result: Result<UserPage, String>,
    ) -> Vec<Effect> {
        let page = match result {
            Ok(page) => page,
            Err(error) => {
                self.panels.users = Panel::Failed(error);
                return Vec::new();
            }
        };

        match self.page.apply_count(query, page.count) {
            PageOutcome::Accepted => {
                self.panels.users = Panel::Ready(page);
                Vec::new()
            }
            PageOutcome::Resnap(corrected) => vec![Effect::Run(self.users_job(corrected))],
            PageOutcome::Clamped => {
                self.panels.users = Panel::Ready(UserPage {
                    offset: self.page.offset(),
                    ..page
                });
                Vec::new()
            }
        }
    }

    fn apply_account(
        &mut self,
        action: AccountAction,
        result: Result<(), String>,
    ) -> Vec<Effect> {
        if let Err(error) = result {
            self.set_status(&format!("{} failed: {error}", action_label(&action)));
            return Vec::new();
        }

        self.set_status(&action.describe());
        let mut effects = Vec::new();
        if self.active_view == ViewKind::Users {
            effects.push(Effect::Run(self.refresh_job(ViewKind::Users)));
        }
        if self.selection.as_ref() == Some(action.uid()) {
            effects.push(Effect::Run(self.select(action.uid().clone())));
        }
        effects
    }

    fn set_status(&mut self, message: &str) {
        self.status_line = Some(message.to_owned());
    }
}

fn action_label(action: &AccountAction) -> &'static str {
    match action {
        AccountAction::AdjustBalance { .. } => "balance adjust",
        AccountAction::SetBalance { .. } => "balance set",
        AccountAction::ResetBalance(_) => "balance reset",
        AccountAction::ResetUsage(_) => "usage reset",
    }
}

fn into_panel<T>(result: Result<T, String>) -> Panel<T> {
    match result {
        Ok(value) => Panel::Ready(value),
        Err(error) => Panel::Failed(error),
    }
}
