//! Calendar sign-in commands

use secrely_core::booking::ports::token_error;
use secrely_domain::{Result, SecrelyError};
use tracing::info;

use crate::AppContext;

/// Interactive consent, then a calendar-list probe to prove the grant works.
pub async fn login(ctx: &AppContext) -> Result<()> {
    let consent = ctx.consent()?;
    let hint = ctx.tokens.identity();
    let grant = consent.obtain_consent(hint.as_deref()).await.map_err(SecrelyError::Auth)?;
    let account = grant.account.clone();
    ctx.tokens.sign_in(&grant.account, grant.tokens).await.map_err(token_error)?;
    info!("Calendar sign-in completed");
    println!("Signed in as {account}");

    let calendars = ctx.booking.check_access().await?;
    match calendars.iter().find(|c| c.primary) {
        Some(primary) => println!("Primary calendar: {} ({})", primary.summary, primary.id),
        None => println!("{} calendars reachable", calendars.len()),
    }
    Ok(())
}

pub async fn logout(ctx: &AppContext) -> Result<()> {
    let identity = ctx.tokens.identity();
    ctx.tokens.clear().await.map_err(token_error)?;
    match identity {
        Some(account) => println!("Signed out {account}"),
        None => println!("Not signed in"),
    }
    Ok(())
}

pub async fn whoami(ctx: &AppContext) -> Result<()> {
    let Some(account) = ctx.tokens.identity() else {
        println!("Not signed in. Run `secrely login`.");
        return Ok(());
    };
    println!("Account:  {account}");
    match ctx.tokens.seconds_until_expiry() {
        Some(secs) if secs > 0 => println!("Token:    valid for {} min", secs / 60),
        Some(_) => println!("Token:    expired, refreshed on next use"),
        None => println!("Token:    no expiry recorded"),
    }

    for calendar in ctx.booking.check_access().await? {
        let marker = if calendar.primary { "*" } else { " " };
        let role = calendar.access_role.as_deref().unwrap_or("unknown");
        println!("{marker} {:<40} {role}", calendar.summary);
    }
    Ok(())
}
