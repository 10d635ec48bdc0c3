use clap::Args;
use serde_json::json;

use crate::auth::{generate_session_token, SessionClaims};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;

#[derive(Args)]
pub struct TokenArgs {
    #[arg(help = "Identity provider user id to put in `sub`")]
    pub user_id: String,

    #[arg(long, help = "Lifetime in hours (defaults to SESSION_TOKEN_EXPIRY_HOURS)")]
    pub hours: Option<u64>,
}

/// Requires SESSION_HMAC_SECRET; the server must be configured with the same secret.
pub fn handle(args: TokenArgs, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let hours = args.hours.unwrap_or(config.security.session_token_expiry_hours);
    let claims = SessionClaims::new(args.user_id, hours);
    let token = generate_session_token(&claims, &config.security)
        .map_err(|e| anyhow::anyhow!("{} (is SESSION_HMAC_SECRET set?)", e))?;

    match output_format {
        OutputFormat::Json => output_success(
            &output_format,
            "Session token generated",
            Some(json!({ "token": token, "sub": claims.sub, "exp": claims.exp })),
        ),
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
    }
}
