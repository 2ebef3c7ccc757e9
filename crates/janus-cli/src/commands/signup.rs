//! signup command - create a local account

use super::CommandContext;
use anyhow::Result;
use colored::Colorize;
use janus_auth::AuthService;
use janus_core::types::SignupRequest;
use serde::Serialize;

#[derive(Serialize)]
struct SignupResult<'a> {
    id: String,
    email: &'a str,
    strategy: &'a str,
}

pub async fn execute(
    ctx: &CommandContext,
    email: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
) -> Result<()> {
    let auth = ctx.authenticator().await?;
    let request = SignupRequest::new(email, password, first_name, last_name);

    let id = auth.signup(&request).await.map_err(|e| ctx.auth_failure(e))?;

    if ctx.is_json() {
        return ctx.json(&SignupResult {
            id,
            email: email.trim(),
            strategy: auth.strategy().as_str(),
        });
    }

    ctx.info(&format!("{}: {} ({})", "created".green(), email.trim(), id));
    Ok(())
}
