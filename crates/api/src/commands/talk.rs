//! Text-mode agent session.
//!
//! Typed lines go to the agent as user turns; agent replies are printed as
//! they land in the transcript. `/end`, end of input or Ctrl-C stops the
//! session, which hands the transcript to extraction.

use std::sync::Arc;
use std::time::Duration;

use secrely_core::{FinalizeTrigger, SessionCoordinator, SessionOutcome};
use secrely_domain::{MeetingProposal, Result, Role, SessionStatus, TranscriptEvent};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::warn;

use super::{print_booked, print_proposal};
use crate::adapters::{prompt_line, ConsoleMediaAccess};
use crate::cli::TalkArgs;
use crate::AppContext;

pub const END_COMMAND: &str = "/end";

const TRANSCRIPT_POLL: Duration = Duration::from_millis(200);

pub async fn run(ctx: &AppContext, args: &TalkArgs) -> Result<()> {
    let week = args.availability.week();
    let coordinator = ctx.coordinator(Arc::new(ConsoleMediaAccess::new(args.yes)));

    coordinator.start((!week.is_empty()).then_some(&week)).await?;
    println!("Connected. Type to talk, {END_COMMAND} to finish.");

    let outcome = drive(&coordinator, BufReader::new(tokio::io::stdin()), |event| {
        if event.role == Role::Agent {
            println!("{}", event.line());
        }
    })
    .await;

    let Some(proposal) = settle(&coordinator, outcome)? else {
        return Ok(());
    };

    println!("Meeting details:");
    print_proposal(&proposal);
    let book = args.book
        || prompt_line("Book this meeting? [y/N] ")
            .await?
            .is_some_and(|answer| matches!(answer.trim(), "y" | "Y" | "yes"));
    if !book {
        coordinator.discard_proposal();
        println!("Not booked.");
        return Ok(());
    }

    let event = ctx.booking.book(&proposal).await?;
    print_booked(&event);
    Ok(())
}

/// Feeds `input` to the session until it ends, reporting new transcript
/// lines through `on_event`.
pub async fn drive<R, F>(coordinator: &SessionCoordinator, input: R, mut on_event: F) -> SessionOutcome
where
    R: AsyncBufRead + Unpin,
    F: FnMut(&TranscriptEvent),
{
    let mut lines = input.lines();
    let mut status = coordinator.subscribe();
    let mut ticker = tokio::time::interval(TRANSCRIPT_POLL);
    let mut shown = 0;

    let outcome = loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let text = line.trim();
                    if text == END_COMMAND {
                        break coordinator.stop().await;
                    }
                    if text.is_empty() {
                        continue;
                    }
                    if let Err(err) = coordinator.send_text(text).await {
                        warn!(error = %err, "Could not send turn");
                    }
                }
                Ok(None) => break coordinator.stop().await,
                Err(err) => {
                    warn!(error = %err, "Input closed");
                    break coordinator.stop().await;
                }
            },
            changed = status.changed() => {
                let ended = changed.is_err() || *status.borrow_and_update() == SessionStatus::Ended;
                if ended {
                    break coordinator.finalize(FinalizeTrigger::StatusChange).await;
                }
            }
            _ = tokio::signal::ctrl_c() => break coordinator.stop().await,
            _ = ticker.tick() => shown = show_new(coordinator, shown, &mut on_event),
        }
    };
    show_new(coordinator, shown, &mut on_event);
    outcome
}

fn show_new<F: FnMut(&TranscriptEvent)>(
    coordinator: &SessionCoordinator,
    shown: usize,
    on_event: &mut F,
) -> usize {
    let events = coordinator.session().events;
    // The transcript restarts when the agent confirms the conversation.
    let from = if events.len() < shown { 0 } else { shown };
    events[from..].iter().for_each(|event| on_event(event));
    events.len()
}

/// The proposal a finished session produced, if any.
pub fn settle(coordinator: &SessionCoordinator, outcome: SessionOutcome) -> Result<Option<MeetingProposal>> {
    match outcome {
        SessionOutcome::Proposal(proposal) => Ok(Some(proposal)),
        SessionOutcome::AlreadyFinalized => match coordinator.proposal() {
            Some(proposal) => Ok(Some(proposal)),
            None => match coordinator.last_error() {
                Some(err) if err.is_user_visible() => Err(err),
                _ => {
                    println!("The session ended without a meeting.");
                    Ok(None)
                }
            },
        },
        SessionOutcome::NoTranscript => {
            println!("Nothing was said, so there is no meeting to extract.");
            Ok(None)
        }
        SessionOutcome::ExtractionFailed(err) => Err(err),
    }
}
