//! Subcommand implementations
//!
//! Each command prints its result to stdout; diagnostics go through
//! `tracing` to stderr.

pub mod auth;
pub mod availability;
pub mod book;
pub mod call;
pub mod talk;

use std::time::Instant;

use secrely_core::CreatedEvent;
use secrely_domain::{MeetingProposal, Result, SecrelyError};
use tracing::warn;

use crate::cli::Commands;
use crate::utils::logging::{error_label, log_command_execution};
use crate::AppContext;

/// Runs a command that needs the application context.
pub async fn run(ctx: &AppContext, command: Commands) -> Result<()> {
    let name = command.name();
    let start = Instant::now();

    let result = match command {
        Commands::Login => auth::login(ctx).await,
        Commands::Logout => auth::logout(ctx).await,
        Commands::Whoami => auth::whoami(ctx).await,
        Commands::Availability(args) => {
            availability::show(&args);
            Ok(())
        }
        Commands::Talk(args) => talk::run(ctx, &args).await,
        Commands::Call(args) => call::run(ctx, &args).await,
        Commands::Book(args) => book::run(ctx, &args).await,
    };

    log_command_execution(name, start.elapsed(), result.is_ok());
    if let Err(err) = &result {
        warn!(command = name, error_type = error_label(err), "Command failed");
    }
    result
}

/// One-line message for a failed command: the error category's headline
/// followed by the details.
pub fn describe_failure(err: &SecrelyError) -> String {
    format!("{}. {err}", err.headline())
}

pub(crate) fn print_proposal(proposal: &MeetingProposal) {
    println!("  Title:       {}", proposal.title);
    println!("  Start:       {}", proposal.start_date_time);
    println!("  End:         {}", proposal.end_date_time);
    if !proposal.description.is_empty() {
        println!("  Description: {}", proposal.description);
    }
    if let Some(location) = &proposal.location {
        println!("  Location:    {location}");
    }
    for attendee in proposal.attendees.iter().flatten() {
        match &attendee.email {
            Some(email) => println!("  Attendee:    {} <{email}>", attendee.name),
            None => println!("  Attendee:    {}", attendee.name),
        }
    }
}

pub(crate) fn print_booked(event: &CreatedEvent) {
    match &event.html_link {
        Some(link) => println!("Booked: {link}"),
        None => println!("Booked (event {})", event.id),
    }
}
