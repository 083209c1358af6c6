//! Game calendar. Every month has 30 days; listeners run on each day rollover.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::world::Map;

/// Elapsed units needed before a day can roll over.
pub const DAY_THRESHOLD: f32 = 3.0;
/// Units consumed by each rollover.
pub const DAY_LENGTH: f32 = 5.0;
pub const DAYS_PER_MONTH: u32 = 30;
pub const MONTHS_PER_YEAR: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GameDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl GameDate {
    pub const START: GameDate = GameDate::new(2000, 5, 27);

    pub const fn new(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }

    pub fn is_valid(&self) -> bool {
        (1..=MONTHS_PER_YEAR).contains(&self.month) && (1..=DAYS_PER_MONTH).contains(&self.day)
    }

    pub fn next_day(self) -> Self {
        let mut next = self;
        next.day += 1;
        if next.day > DAYS_PER_MONTH {
            next.day = 1;
            next.month += 1;
        }
        if next.month > MONTHS_PER_YEAR {
            next.month = 1;
            next.year += 1;
        }
        next
    }
}

impl Default for GameDate {
    fn default() -> Self {
        Self::START
    }
}

impl fmt::Display for GameDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}.{:02}", self.year, self.month, self.day)
    }
}

pub type DayListener = Box<dyn FnMut(&mut Map, GameDate)>;

pub struct Clock {
    date: GameDate,
    elapsed: f32,
    listeners: Vec<DayListener>,
}

impl Clock {
    pub fn new() -> Self {
        Self::starting_at(GameDate::START)
    }

    pub fn starting_at(date: GameDate) -> Self {
        Self {
            date,
            elapsed: 0.0,
            listeners: Vec::new(),
        }
    }

    pub fn date(&self) -> GameDate {
        self.date
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Listeners run in registration order.
    pub fn subscribe(&mut self, listener: impl FnMut(&mut Map, GameDate) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
    }

    /// Accumulates `elapsed` and rolls over as many days as it covers, firing
    /// the listeners once per day. Returns the number of days that passed.
    pub fn advance(&mut self, elapsed: f32, map: &mut Map) -> u32 {
        self.elapsed += elapsed;
        let mut days = 0;
        while self.elapsed >= DAY_THRESHOLD {
            self.elapsed -= DAY_LENGTH;
            self.date = self.date.next_day();
            days += 1;
            for listener in &mut self.listeners {
                listener(&mut *map, self.date);
            }
        }
        days
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clock")
            .field("date", &self.date)
            .field("elapsed", &self.elapsed)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
