//! Per-set rest countdown.
//!
//! [`RestTimer`] is the pure state machine. [`Ticker`] turns wall-clock time
//! into one-second ticks and is cancelled whenever the timer is not running.
//! [`TimerBoard`] owns the timers currently shown in the weekly view.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const TICK: Duration = Duration::from_secs(1);

/// Remaining time at or below which the display turns to a warning.
pub const WARNING_SECONDS: u32 = 30;

/// Selectable rest durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RestPreset {
    OneMinute,
    TwoMinutes,
    ThreeMinutes,
    FourMinutes,
    FiveMinutes,
}

pub const ALL_PRESETS: [RestPreset; 5] = [
    RestPreset::OneMinute,
    RestPreset::TwoMinutes,
    RestPreset::ThreeMinutes,
    RestPreset::FourMinutes,
    RestPreset::FiveMinutes,
];

impl RestPreset {
    pub fn minutes(self) -> u32 {
        match self {
            RestPreset::OneMinute => 1,
            RestPreset::TwoMinutes => 2,
            RestPreset::ThreeMinutes => 3,
            RestPreset::FourMinutes => 4,
            RestPreset::FiveMinutes => 5,
        }
    }

    pub fn seconds(self) -> u32 {
        self.minutes() * 60
    }
}

impl Default for RestPreset {
    fn default() -> Self {
        RestPreset::FiveMinutes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Running,
    Expired,
}

/// How the remaining time should be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerDisplay {
    Normal,
    Warning,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestTimer {
    preset: RestPreset,
    remaining_seconds: u32,
    running: bool,
}

impl Default for RestTimer {
    fn default() -> Self {
        Self::new(RestPreset::default())
    }
}

impl RestTimer {
    pub fn new(preset: RestPreset) -> Self {
        Self {
            preset,
            remaining_seconds: preset.seconds(),
            running: false,
        }
    }

    pub fn preset(&self) -> RestPreset {
        self.preset
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn phase(&self) -> TimerPhase {
        if self.remaining_seconds == 0 {
            TimerPhase::Expired
        } else if self.running {
            TimerPhase::Running
        } else {
            TimerPhase::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase() == TimerPhase::Running
    }

    /// Start or pause. Has no effect once expired.
    pub fn toggle(&mut self) {
        if self.remaining_seconds > 0 {
            self.running = !self.running;
        }
    }

    /// Advance by one second. Returns `true` if the tick changed anything.
    pub fn tick(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.remaining_seconds -= 1;
        if self.remaining_seconds == 0 {
            self.running = false;
        }
        true
    }

    pub fn reset(&mut self) {
        self.running = false;
        self.remaining_seconds = self.preset.seconds();
    }

    pub fn select_preset(&mut self, preset: RestPreset) {
        self.preset = preset;
        self.reset();
    }

    pub fn display(&self) -> TimerDisplay {
        match self.remaining_seconds {
            0 => TimerDisplay::Expired,
            s if s <= WARNING_SECONDS => TimerDisplay::Warning,
            _ => TimerDisplay::Normal,
        }
    }

    pub fn formatted(&self) -> String {
        format_mm_ss(self.remaining_seconds)
    }
}

pub fn format_mm_ss(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Next one-second deadline of a running timer.
#[derive(Debug, Default, Clone)]
pub struct Ticker {
    next: Option<Instant>,
}

impl Ticker {
    pub fn arm(&mut self, now: Instant) {
        self.next = Some(now + TICK);
    }

    pub fn cancel(&mut self) {
        self.next = None;
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.next.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.next
    }

    /// Number of whole ticks elapsed by `now`, moving the deadline forward.
    pub fn due(&mut self, now: Instant) -> u32 {
        let Some(mut next) = self.next else {
            return 0;
        };
        let mut ticks = 0;
        while next <= now {
            ticks += 1;
            next += TICK;
        }
        self.next = Some(next);
        ticks
    }
}

/// A rest timer bound to its schedule.
#[derive(Debug, Default, Clone)]
pub struct ScheduledTimer {
    timer: RestTimer,
    ticker: Ticker,
}

impl ScheduledTimer {
    pub fn new(preset: RestPreset) -> Self {
        Self {
            timer: RestTimer::new(preset),
            ticker: Ticker::default(),
        }
    }

    pub fn timer(&self) -> &RestTimer {
        &self.timer
    }

    #[cfg(test)]
    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn toggle(&mut self, now: Instant) {
        self.timer.toggle();
        self.sync_ticker(now);
    }

    pub fn reset(&mut self) {
        self.timer.reset();
        self.ticker.cancel();
    }

    pub fn select_preset(&mut self, preset: RestPreset) {
        self.timer.select_preset(preset);
        self.ticker.cancel();
    }

    /// Apply elapsed ticks. Returns the time of the next tick while running.
    pub fn advance(&mut self, now: Instant) -> Option<Instant> {
        for _ in 0..self.ticker.due(now) {
            if !self.timer.tick() {
                break;
            }
        }
        if !self.timer.is_running() {
            self.ticker.cancel();
        }
        self.ticker.deadline()
    }

    fn sync_ticker(&mut self, now: Instant) {
        if self.timer.is_running() {
            self.ticker.arm(now);
        } else {
            self.ticker.cancel();
        }
    }
}

/// Identifies the set a timer belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimerKey {
    pub exercise: String,
    pub set_index: usize,
}

impl TimerKey {
    pub fn new(exercise: &str, set_index: usize) -> Self {
        Self {
            exercise: exercise.to_string(),
            set_index,
        }
    }
}

/// Timers currently shown. Hiding a timer drops it; showing it again starts fresh.
#[derive(Debug, Default)]
pub struct TimerBoard {
    timers: HashMap<TimerKey, ScheduledTimer>,
    default_preset: RestPreset,
}

impl TimerBoard {
    pub fn new(default_preset: RestPreset) -> Self {
        Self {
            timers: HashMap::new(),
            default_preset,
        }
    }

    /// Show or hide the timer for `key`. Returns `true` if it is now visible.
    pub fn toggle(&mut self, key: TimerKey) -> bool {
        if self.timers.remove(&key).is_some() {
            false
        } else {
            self.timers
                .insert(key, ScheduledTimer::new(self.default_preset));
            true
        }
    }

    pub fn is_visible(&self, key: &TimerKey) -> bool {
        self.timers.contains_key(key)
    }

    pub fn get_mut(&mut self, key: &TimerKey) -> Option<&mut ScheduledTimer> {
        self.timers.get_mut(key)
    }

    pub fn get(&self, key: &TimerKey) -> Option<&ScheduledTimer> {
        self.timers.get(key)
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Advance every visible timer; returns the earliest pending tick.
    pub fn advance_all(&mut self, now: Instant) -> Option<Instant> {
        self.timers
            .values_mut()
            .filter_map(|t| t.advance(now))
            .min()
    }
}
