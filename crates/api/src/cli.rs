//! Command-line surface of the `secrely` binary.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};
use secrely_domain::{Attendee, AvailabilityWeek, MeetingProposal, SecrelyError, TimeSlot, Weekday};

/// Secrely - schedule meetings by talking to a voice agent
#[derive(Parser, Debug)]
#[command(name = "secrely")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML or JSON). Without it, the environment is
    /// tried first, then the standard locations.
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true, env = "SECRELY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in to Google Calendar in the browser
    Login,

    /// Forget the stored calendar credentials
    Logout,

    /// Show the signed-in account and the calendars it can reach
    Whoami,

    /// Print the availability week as the agent receives it
    Availability(AvailabilityArgs),

    /// Text conversation with the scheduling agent; `/end` stops it
    Talk(TalkArgs),

    /// Have the agent phone someone and wait for the meeting it agrees on
    Call(CallArgs),

    /// Book a meeting directly
    Book(BookArgs),
}

impl Commands {
    /// Stable identifier for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Login => "auth::login",
            Self::Logout => "auth::logout",
            Self::Whoami => "auth::whoami",
            Self::Availability(_) => "availability::show",
            Self::Talk(_) => "session::talk",
            Self::Call(_) => "phone::call",
            Self::Book(_) => "booking::book",
        }
    }
}

/// Free windows of one day: `Mon=09:00-12:00` or `Tue=09:00-10:00,14:00-16:00`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySlots {
    pub day: Weekday,
    pub slots: Vec<TimeSlot>,
}

impl FromStr for DaySlots {
    type Err = SecrelyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (day, windows) = s.split_once('=').ok_or_else(|| {
            SecrelyError::InvalidInput(format!("'{s}' must look like Mon=09:00-12:00"))
        })?;
        let slots = windows
            .split(',')
            .filter(|w| !w.trim().is_empty())
            .map(TimeSlot::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        if slots.is_empty() {
            return Err(SecrelyError::InvalidInput(format!("'{s}' names no time window")));
        }
        Ok(Self { day: day.parse()?, slots })
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct AvailabilityArgs {
    /// Free window, repeatable: `Mon=09:00-12:00`
    #[arg(long = "slot", value_name = "DAY=HH:MM-HH:MM")]
    pub slots: Vec<DaySlots>,

    /// Day with no availability; wins over --slot
    #[arg(long = "unavailable", value_name = "DAY")]
    pub unavailable: Vec<Weekday>,
}

impl AvailabilityArgs {
    pub fn week(&self) -> AvailabilityWeek {
        let mut week = AvailabilityWeek::new();
        for entry in &self.slots {
            for slot in &entry.slots {
                week.push_slot(entry.day, slot.clone());
            }
        }
        for day in &self.unavailable {
            if week.is_available(*day) {
                week.toggle_day(*day);
            }
        }
        week
    }
}

#[derive(Args, Debug, Clone)]
pub struct TalkArgs {
    #[command(flatten)]
    pub availability: AvailabilityArgs,

    /// Grant microphone access without asking
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Book the extracted meeting without asking
    #[arg(long)]
    pub book: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CallArgs {
    /// Number to call, international format
    pub phone: String,

    #[command(flatten)]
    pub availability: AvailabilityArgs,

    /// How long to wait for the meeting details
    #[arg(long, default_value_t = 300, value_name = "SECS")]
    pub wait_secs: u64,

    /// Book the meeting once it arrives
    #[arg(long)]
    pub book: bool,
}

#[derive(Args, Debug, Clone)]
pub struct BookArgs {
    #[arg(long)]
    pub title: String,

    /// Start, ISO 8601 or a common date format
    #[arg(long)]
    pub start: String,

    #[arg(long)]
    pub end: String,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub location: Option<String>,

    /// Repeatable: `"Jane Doe <jane@example.com>"`
    #[arg(long = "attendee", value_name = "NAME <EMAIL>")]
    pub attendees: Vec<String>,

    /// IANA zone for dates without an offset
    #[arg(long)]
    pub timezone: Option<String>,
}

impl BookArgs {
    pub fn proposal(&self) -> MeetingProposal {
        let mut proposal = MeetingProposal::new(&self.title, &self.start, &self.end)
            .with_description(self.description.clone().unwrap_or_default());
        proposal.location = self.location.clone();
        proposal.timezone = self.timezone.clone();
        if !self.attendees.is_empty() {
            proposal.attendees =
                Some(self.attendees.iter().map(|a| Attendee::parse(a)).collect());
        }
        proposal
    }
}
