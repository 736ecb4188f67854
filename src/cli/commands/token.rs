use anyhow::anyhow;
use serde_json::json;

use crate::auth::issue_admin_token;
use crate::cli::OutputFormat;
use crate::config::AppConfig;

pub fn sign(
    config: &AppConfig,
    email: Option<String>,
    ttl_hours: Option<u64>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let secret = config
        .security
        .admin_secret
        .as_deref()
        .ok_or_else(|| anyhow!("ADMIN_TOKEN_SECRET is not set"))?;
    let email = email
        .or_else(|| config.security.admin_email.clone())
        .unwrap_or_else(|| "admin".to_string());
    let ttl_hours = ttl_hours.unwrap_or(config.security.token_ttl_hours);

    let token = issue_admin_token(secret, &email, ttl_hours)?;
    match output_format {
        OutputFormat::Json => println!("{}", json!({ "token": token, "email": email, "ttlHours": ttl_hours })),
        OutputFormat::Text => println!("{}", token),
    }
    Ok(())
}
