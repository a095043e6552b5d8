// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{TimerId, ViewKind};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

pub const DEFAULT_LIVE_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_OVERVIEW_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Timer {
    id: TimerId,
    next_fire: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollFire {
    /// Refresh the named view; only emitted while it is the active view.
    View(ViewKind),
    /// Background overview refresh, independent of the active view.
    Overview,
}

/// Deadline-driven repeating timers: one per pollable view plus the
/// background overview timer. The event loop asks for the next deadline,
/// blocks until then, and calls [`PollingScheduler::fire_due`].
#[derive(Debug, Clone)]
pub struct PollingScheduler {
    live_interval: Duration,
    overview_interval: Duration,
    views: BTreeMap<ViewKind, Timer>,
    background: Option<Timer>,
    last_id: TimerId,
}

impl Default for PollingScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_LIVE_INTERVAL, DEFAULT_OVERVIEW_INTERVAL)
    }
}

impl PollingScheduler {
    pub fn new(live_interval: Duration, overview_interval: Duration) -> Self {
        Self {
            live_interval: live_interval.max(Duration::from_millis(1)),
            overview_interval: overview_interval.max(Duration::from_millis(1)),
            views: BTreeMap::new(),
            background: None,
            last_id: TimerId::default(),
        }
    }

    pub fn live_interval(&self) -> Duration {
        self.live_interval
    }

    /// Starts the live timer for `view`. Returns the running timer's id when
    /// one already exists.
    pub fn start(&mut self, view: ViewKind, now: Instant) -> TimerId {
        if let Some(timer) = self.views.get(&view) {
            return timer.id;
        }
        let timer = Timer {
            id: self.allocate_id(),
            next_fire: now + self.live_interval,
        };
        self.views.insert(view, timer);
        timer.id
    }

    pub fn stop(&mut self, view: ViewKind) -> bool {
        self.views.remove(&view).is_some()
    }

    pub fn start_background(&mut self, now: Instant) -> TimerId {
        if let Some(timer) = self.background {
            return timer.id;
        }
        let timer = Timer {
            id: self.allocate_id(),
            next_fire: now + self.overview_interval,
        };
        self.background = Some(timer);
        timer.id
    }

    pub fn stop_background(&mut self) -> bool {
        self.background.take().is_some()
    }

    pub fn timer_for(&self, view: ViewKind) -> Option<TimerId> {
        self.views.get(&view).map(|timer| timer.id)
    }

    pub fn active_timers(&self) -> usize {
        self.views.len() + usize::from(self.background.is_some())
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.views
            .values()
            .chain(self.background.iter())
            .map(|timer| timer.next_fire)
            .min()
    }

    /// Fires every timer whose deadline has passed. A view timer whose view
    /// is no longer `active` at fire time still reschedules but emits nothing.
    pub fn fire_due(&mut self, now: Instant, active: ViewKind) -> Vec<PollFire> {
        let mut fired = Vec::new();

        if let Some(timer) = self.background.as_mut()
            && timer.next_fire <= now
        {
            timer.next_fire = advance(timer.next_fire, self.overview_interval, now);
            fired.push(PollFire::Overview);
        }

        for (view, timer) in &mut self.views {
            if timer.next_fire > now {
                continue;
            }
            timer.next_fire = advance(timer.next_fire, self.live_interval, now);
            if *view == active {
                fired.push(PollFire::View(*view));
            }
        }

        fired
    }

    fn allocate_id(&mut self) -> TimerId {
        self.last_id = self.last_id.next();
        self.last_id
    }
}

// Skips missed ticks instead of replaying them back to back.
fn advance(deadline: Instant, interval: Duration, now: Instant) -> Instant {
    if deadline > now {
        return deadline;
    }
    let interval_nanos = interval.as_nanos().max(1);
    let lag_nanos = now.duration_since(deadline).as_nanos();
    let until_next = interval_nanos - lag_nanos % interval_nanos;
    // Below one interval, so it fits whenever the interval does.
    now + Duration::from_nanos(u64::try_from(until_next).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::{PollFire, PollingScheduler};
    use crate::ViewKind;
    use std::time::{Duration, Instant};

    fn scheduler() -> PollingScheduler {
        PollingScheduler::new(Duration::from_secs(5), Duration::from_secs(60))
    }

    #[test]
    fn start_is_idempotent_per_view() {
        let mut polling = scheduler();
        let now = Instant::now();

        let first = polling.start(ViewKind::Online, now);
        let second = polling.start(ViewKind::Online, now + Duration::from_secs(1));
        assert_eq!(first, second);
        assert_eq!(polling.active_timers(), 1);
    }

    #[test]
    fn stop_then_start_replaces_timer() {
        let mut polling = scheduler();
        let now = Instant::now();

        let first = polling.start(ViewKind::Online, now);
        assert!(polling.stop(ViewKind::Online));
        let second = polling.start(ViewKind::Online, now);
        assert_ne!(first, second);
        assert_eq!(polling.active_timers(), 1);

        // Only the replacement fires: one refresh per interval.
        let fired = polling.fire_due(now + Duration::from_secs(5), ViewKind::Online);
        assert_eq!(fired, vec![PollFire::View(ViewKind::Online)]);
    }

    #[test]
    fn stop_without_timer_is_safe() {
        let mut polling = scheduler();
        assert!(!polling.stop(ViewKind::Users));
        assert_eq!(polling.active_timers(), 0);
    }

    #[test]
    fn tick_for_inactive_view_is_noop() {
        let mut polling = scheduler();
        let now = Instant::now();
        polling.start(ViewKind::Users, now);

        let fired = polling.fire_due(now + Duration::from_secs(5), ViewKind::Online);
        assert!(fired.is_empty());
        // Rescheduled rather than left overdue.
        assert_eq!(
            polling.next_deadline(),
            Some(now + Duration::from_secs(10))
        );
    }

    #[test]
    fn background_overview_fires_regardless_of_active_view() {
        let mut polling = scheduler();
        let now = Instant::now();
        polling.start_background(now);
        polling.start(ViewKind::Online, now);

        let fired = polling.fire_due(now + Duration::from_secs(60), ViewKind::Users);
        assert_eq!(fired, vec![PollFire::Overview]);
    }

    #[test]
    fn missed_ticks_collapse_into_one_fire() {
        let mut polling = scheduler();
        let now = Instant::now();
        polling.start(ViewKind::Online, now);

        let fired = polling.fire_due(now + Duration::from_secs(23), ViewKind::Online);
        assert_eq!(fired, vec![PollFire::View(ViewKind::Online)]);
        assert_eq!(
            polling.next_deadline(),
            Some(now + Duration::from_secs(25))
        );
    }

    #[test]
    fn long_stall_on_a_short_interval_lands_on_the_next_tick() {
        let mut polling =
            PollingScheduler::new(Duration::from_millis(1), Duration::from_secs(60));
        let now = Instant::now();
        polling.start(ViewKind::Online, now);

        let woke = now + Duration::from_secs(8 * 60 * 60) + Duration::from_micros(400);
        let fired = polling.fire_due(woke, ViewKind::Online);
        assert_eq!(fired, vec![PollFire::View(ViewKind::Online)]);
        assert_eq!(
            polling.next_deadline(),
            Some(woke + Duration::from_micros(600))
        );
    }

    #[test]
    fn tick_exactly_on_the_deadline_moves_one_interval() {
        let mut polling = scheduler();
        let now = Instant::now();
        polling.start(ViewKind::Online, now);

        polling.fire_due(now + Duration::from_secs(5), ViewKind::Online);
        assert_eq!(
            polling.next_deadline(),
            Some(now + Duration::from_secs(10))
        );
    }

    #[test]
    fn next_deadline_is_none_without_timers() {
        assert_eq!(scheduler().next_deadline(), None);
    }
}
