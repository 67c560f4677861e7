//! Outbound phone call: the agent calls someone on the host's behalf and the
//! extracted meeting comes back over the result channel.

use std::time::Duration;

use secrely_domain::Result;
use tokio::time::Instant;
use tracing::debug;

use super::{print_booked, print_proposal};
use crate::cli::CallArgs;
use crate::AppContext;

const POLL_WINDOW: Duration = Duration::from_secs(15);

pub async fn run(ctx: &AppContext, args: &CallArgs) -> Result<()> {
    let week = args.availability.week();
    let receipt = ctx.phone.place_call(&args.phone, &week).await?;
    match &receipt.call_sid {
        Some(sid) => println!("Calling {} (call {sid})", args.phone),
        None => println!("Calling {}", args.phone),
    }

    let deadline = Instant::now() + Duration::from_secs(args.wait_secs);
    let proposal = loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break None;
        }
        match ctx.phone.next_proposal(remaining.min(POLL_WINDOW)).await {
            Ok(Some(proposal)) => break Some(proposal),
            Ok(None) => debug!(remaining_secs = remaining.as_secs(), "Still waiting for meeting details"),
            Err(err) => {
                ctx.phone.teardown();
                return Err(err);
            }
        }
    };
    ctx.phone.teardown();

    let Some(proposal) = proposal else {
        println!("No meeting details yet after {}s.", args.wait_secs);
        return Ok(());
    };
    println!("Meeting details:");
    print_proposal(&proposal);
    if args.book {
        let event = ctx.booking.book(&proposal).await?;
        print_booked(&event);
    } else {
        println!("Not booked. Pass --book to add it to the calendar.");
    }
    Ok(())
}
