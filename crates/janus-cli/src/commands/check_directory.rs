//! check-directory command - check the configured LDAP server

use super::CommandContext;
use anyhow::{Context, Result};
use colored::Colorize;
use janus_auth::LdapClient;

pub async fn execute(ctx: &CommandContext) -> Result<()> {
    let ldap = ctx.config.ldap.clone();
    let server_url = ldap.server_url.clone();
    let client = LdapClient::new(ldap).context("Invalid LDAP configuration")?;

    let info = client
        .check_connection()
        .await
        .with_context(|| format!("Directory check failed for {}", server_url))?;

    if ctx.is_json() {
        return ctx.json(&info);
    }

    ctx.info(&format!("{}: {}", "connected".green(), server_url));
    ctx.info(&format!(
        "  Vendor:          {}",
        info.vendor.as_deref().unwrap_or("unknown")
    ));
    ctx.info(&format!(
        "  Version:         {}",
        info.version.as_deref().unwrap_or("unknown")
    ));
    ctx.info(&format!(
        "  LDAP versions:   {}",
        info.supported_ldap_version.join(", ")
    ));
    for context in &info.naming_contexts {
        ctx.info(&format!("  Naming context:  {}", context));
    }

    Ok(())
}
