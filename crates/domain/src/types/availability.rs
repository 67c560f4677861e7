//! Weekly recurring availability
//!
//! The week is a fixed Monday→Sunday array of slot lists. A day is available
//! exactly when it has at least one slot; there is no separate flag, so the
//! two can never disagree.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_SLOT_END, DEFAULT_SLOT_START};
use crate::errors::{Result, SecrelyError};

static HH_MM: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").ok());

/// Returns true when `value` is a 24h `HH:MM` wall-clock time.
pub fn is_hh_mm(value: &str) -> bool {
    HH_MM.as_ref().is_some_and(|re| re.is_match(value))
}

/// Day of the week, ordered Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// All days in serialization order.
    pub const ALL: [Self; 7] = [
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
        Self::Sunday,
    ];

    /// English day name, as the backend expects it
    pub const fn name(self) -> &'static str {
        match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
            Self::Saturday => "Saturday",
            Self::Sunday => "Sunday",
        }
    }

    /// Three-letter abbreviation used in the serialized week.
    pub const fn abbrev(self) -> &'static str {
        match self {
            Self::Monday => "Mon",
            Self::Tuesday => "Tue",
            Self::Wednesday => "Wed",
            Self::Thursday => "Thu",
            Self::Friday => "Fri",
            Self::Saturday => "Sat",
            Self::Sunday => "Sun",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        Self::ALL[day.num_days_from_monday() as usize]
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Weekday {
    type Err = SecrelyError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|day| day.abbrev().to_lowercase() == wanted || day.name().to_lowercase() == wanted)
            .ok_or_else(|| SecrelyError::InvalidInput(format!("unknown weekday '{s}'")))
    }
}

/// A wall-clock window within one day, `HH:MM` strings, no timezone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: String,
    pub end: String,
}

impl TimeSlot {
    /// Builds a slot after checking both ends are `HH:MM`.
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Result<Self> {
        let slot = Self { start: start.into(), end: end.into() };
        for value in [&slot.start, &slot.end] {
            if !is_hh_mm(value) {
                return Err(SecrelyError::InvalidInput(format!(
                    "time '{value}' is not in HH:MM format"
                )));
            }
        }
        Ok(slot)
    }
}

impl Default for TimeSlot {
    fn default() -> Self {
        Self { start: DEFAULT_SLOT_START.to_string(), end: DEFAULT_SLOT_END.to_string() }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for TimeSlot {
    type Err = SecrelyError;

    /// Parses `"09:00-12:00"`.
    fn from_str(s: &str) -> Result<Self> {
        let (start, end) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| SecrelyError::InvalidInput(format!("slot '{s}' must look like 09:00-17:00")))?;
        Self::new(start.trim(), end.trim())
    }
}

/// Which end of a slot [`AvailabilityWeek::update_slot`] edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotField {
    Start,
    End,
}

/// A user's weekly free windows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityWeek {
    days: [Vec<TimeSlot>; 7],
}

impl AvailabilityWeek {
    /// A week with every day unavailable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a default `09:00-17:00` slot, making the day available.
    pub fn add_slot(&mut self, day: Weekday) {
        self.days[day.index()].push(TimeSlot::default());
    }

    /// Appends an explicit slot.
    pub fn push_slot(&mut self, day: Weekday, slot: TimeSlot) {
        self.days[day.index()].push(slot);
    }

    /// Removes the slot at `index`. Removing the last slot leaves the day
    /// unavailable.
    pub fn remove_slot(&mut self, day: Weekday, index: usize) -> Result<TimeSlot> {
        let slots = &mut self.days[day.index()];
        if index >= slots.len() {
            return Err(out_of_range(day, index, slots.len()));
        }
        Ok(slots.remove(index))
    }

    /// Rewrites one end of a slot. The value must be `HH:MM`.
    pub fn update_slot(
        &mut self,
        day: Weekday,
        index: usize,
        field: SlotField,
        value: &str,
    ) -> Result<()> {
        if !is_hh_mm(value) {
            return Err(SecrelyError::InvalidInput(format!("time '{value}' is not in HH:MM format")));
        }
        let slots = &mut self.days[day.index()];
        let len = slots.len();
        let slot = slots.get_mut(index).ok_or_else(|| out_of_range(day, index, len))?;
        match field {
            SlotField::Start => slot.start = value.to_string(),
            SlotField::End => slot.end = value.to_string(),
        }
        Ok(())
    }

    /// Flips availability. Turning a day on gives it one default slot;
    /// turning it off drops its slots.
    pub fn toggle_day(&mut self, day: Weekday) {
        let slots = &mut self.days[day.index()];
        if slots.is_empty() {
            slots.push(TimeSlot::default());
        } else {
            slots.clear();
        }
    }

    /// A day is available when it has at least one slot
    pub fn is_available(&self, day: Weekday) -> bool {
        !self.days[day.index()].is_empty()
    }

    /// Slots of `day` in insertion order
    pub fn slots(&self, day: Weekday) -> &[TimeSlot] {
        &self.days[day.index()]
    }

    /// True when no day has a slot.
    pub fn is_empty(&self) -> bool {
        self.days.iter().all(Vec::is_empty)
    }

    /// Compact form consumed by the voice agent and the call request, e.g.
    /// `"Mon: [09:00-12:00]; Tue: [Unavailable]; ..."`.
    pub fn serialize(&self) -> String {
        Weekday::ALL
            .into_iter()
            .map(|day| {
                let slots = self.slots(day);
                if slots.is_empty() {
                    format!("{}: [Unavailable]", day.abbrev())
                } else {
                    let joined =
                        slots.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
                    format!("{}: [{joined}]", day.abbrev())
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

fn out_of_range(day: Weekday, index: usize, len: usize) -> SecrelyError {
    SecrelyError::InvalidInput(format!("{day} has {len} slot(s), no slot at index {index}"))
}
