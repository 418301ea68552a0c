//! CLI Module - Command implementations

use crate::auth::{generate_secret, SessionKeys};
use crate::config::Config;
use crate::store::Datastore;

/// Write the default configuration as TOML, with a freshly generated session secret
pub async fn run_init(output: &str) -> Result<(), Box<dyn std::error::Error>> {
    if tokio::fs::try_exists(output).await? {
        return Err(format!("{} already exists", output).into());
    }
    let mut config = Config::default();
    config.auth.jwt_secret = generate_secret()?;
    let text = config.export_toml()?;
    tokio::fs::write(output, text).await?;
    println!("Wrote default configuration to {}", output);
    Ok(())
}

/// Load the datastore and print its integrity report
pub async fn run_check(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = Datastore::from_config(&config.storage).await?;
    let report = store.integrity_report().await?;

    println!("Datastore: {}", report.path);
    println!("State:     {:?}", report.state);
    for (collection, count) in &report.counts {
        println!("  {:<18} {}", collection, count);
    }

    if report.is_clean() {
        println!("All collections present.");
        Ok(())
    } else {
        Err(format!(
            "Collections missing on disk, filled from seed: {}",
            report.backfilled.join(", ")
        )
        .into())
    }
}

pub fn generate_token(config: &Config, user: &str, roles_str: &str) -> Result<(), Box<dyn std::error::Error>> {
    let roles: Vec<String> = roles_str
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if config.auth.jwt_secret.is_empty() {
        return Err("auth.jwt_secret must be set (config file or JWT_SECRET) to issue tokens".into());
    }
    let keys = SessionKeys::new(&config.auth);
    let token = keys.issue(user, user, roles.clone())?;

    println!("Generated session token:");
    println!("Bearer {}", token);
    println!();
    println!("Token Details:");
    println!("  User:    {}", user);
    println!("  Roles:   {}", roles.join(", "));
    println!("  Expires: in {} hours", config.auth.session_ttl_hours);
    Ok(())
}
