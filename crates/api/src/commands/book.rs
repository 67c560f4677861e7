use secrely_domain::Result;

use super::{print_booked, print_proposal};
use crate::cli::BookArgs;
use crate::AppContext;

pub async fn run(ctx: &AppContext, args: &BookArgs) -> Result<()> {
    let proposal = args.proposal();
    proposal.validate()?;
    println!("Booking on calendar '{}':", ctx.booking.calendar_id());
    print_proposal(&proposal);

    let event = ctx.booking.book(&proposal).await?;
    print_booked(&event);
    Ok(())
}
