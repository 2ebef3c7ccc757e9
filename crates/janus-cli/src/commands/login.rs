//! login command - check credentials

use super::CommandContext;
use anyhow::Result;
use colored::Colorize;
use janus_core::types::LoginRequest;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

#[derive(Serialize)]
struct LoginResult<'a> {
    id: String,
    email: &'a str,
    strategy: &'a str,
}

pub async fn execute(ctx: &CommandContext, email: &str, password: &str) -> Result<()> {
    let auth = ctx.authenticator().await?;
    let request = LoginRequest::new(email, password);

    // Ctrl-C abandons the attempt instead of waiting out the directory timeout.
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    let id = auth
        .login_with_cancel(&request, &cancel)
        .await
        .map_err(|e| ctx.auth_failure(e))?;

    if ctx.is_json() {
        return ctx.json(&LoginResult {
            id,
            email: email.trim(),
            strategy: auth.strategy().as_str(),
        });
    }

    ctx.info(&format!("{}: {} ({})", "authenticated".green(), email.trim(), id));
    Ok(())
}
