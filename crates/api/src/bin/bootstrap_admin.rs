//! Bootstrap the first administrator.
//!
//! Promotes an existing user to `admin` inside the store's serialized
//! bootstrap transaction; refuses if any administrator already exists. The
//! `--confirm` value must name the target database (or its full
//! fingerprint) so the command cannot be pointed at the wrong environment by
//! accident.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, bail};
use serde_json::json;

use clavis_auth::{Scope, SecurityEvent, normalize_scopes};
use clavis_core::UserId;
use clavis_infra::{ClaimsStore, ClaimsStoreError, PostgresClaimsStore};

#[derive(Debug, Default)]
struct Args {
    user_id: Option<String>,
    scopes: Vec<String>,
    database_url: Option<String>,
    confirm: Option<String>,
    help: bool,
}

#[derive(Debug)]
struct DatabaseFingerprint {
    host: String,
    database: String,
    user: String,
    schema: String,
    value: String,
}

fn parse_args(argv: &[String]) -> anyhow::Result<Args> {
    let mut args = Args::default();
    let mut iter = argv.iter();

    while let Some(arg) = iter.next() {
        let mut take_value = |name: &str| -> anyhow::Result<String> {
            match iter.next() {
                Some(value) if !value.starts_with("--") => Ok(value.clone()),
                _ => bail!("{name} requires a value"),
            }
        };

        match arg.as_str() {
            "--help" | "-h" => args.help = true,
            "--user-id" => args.user_id = Some(take_value("--user-id")?),
            "--database-url" => args.database_url = Some(take_value("--database-url")?),
            "--confirm" => args.confirm = Some(take_value("--confirm")?),
            "--scope" => args.scopes.push(take_value("--scope")?),
            "--scopes" => {
                let values = take_value("--scopes")?;
                args.scopes.extend(values.split(',').map(str::to_string));
            }
            other => {
                if let Some(value) = other.strip_prefix("--user-id=") {
                    args.user_id = Some(value.to_string());
                } else if let Some(value) = other.strip_prefix("--database-url=") {
                    args.database_url = Some(value.to_string());
                } else if let Some(value) = other.strip_prefix("--confirm=") {
                    args.confirm = Some(value.to_string());
                } else if let Some(value) = other.strip_prefix("--scope=") {
                    args.scopes.push(value.to_string());
                } else if let Some(value) = other.strip_prefix("--scopes=") {
                    args.scopes.extend(value.split(',').map(str::to_string));
                } else {
                    bail!("unknown argument: {other}");
                }
            }
        }
    }

    Ok(args)
}

fn read_database_fingerprint(database_url: &str) -> anyhow::Result<DatabaseFingerprint> {
    if !database_url.starts_with("postgres://") && !database_url.starts_with("postgresql://") {
        bail!("--database-url must use postgres:// or postgresql:// scheme");
    }

    let rest = database_url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(database_url);
    let (rest, query) = match rest.split_once('?') {
        Some((rest, query)) => (rest, Some(query)),
        None => (rest, None),
    };
    let (credentials, host_and_db) = match rest.rsplit_once('@') {
        Some((credentials, host_and_db)) => (Some(credentials), host_and_db),
        None => (None, rest),
    };
    let (host, database) = match host_and_db.split_once('/') {
        Some((host, database)) => (host, database),
        None => (host_and_db, ""),
    };

    let user = credentials
        .map(|c| c.split(':').next().unwrap_or(""))
        .filter(|u| !u.is_empty())
        .unwrap_or("unknown")
        .to_string();
    let database = if database.is_empty() {
        "unknown".to_string()
    } else {
        database.to_string()
    };
    let schema = query
        .and_then(|q| q.split('&').find_map(|kv| kv.strip_prefix("schema=")))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("public")
        .to_string();
    let host = host.to_string();

    let value = format!("{host}/{database}/{user}/{schema}");
    Ok(DatabaseFingerprint {
        host,
        database,
        user,
        schema,
        value,
    })
}

fn assert_confirm_matches(
    confirm: Option<&str>,
    fingerprint: &DatabaseFingerprint,
) -> anyhow::Result<String> {
    let Some(confirm) = confirm.map(str::trim).filter(|c| !c.is_empty()) else {
        bail!(
            "missing required --confirm value; it must include database name {:?} or full fingerprint {:?}",
            fingerprint.database,
            fingerprint.value
        );
    };

    let confirm_lower = confirm.to_lowercase();
    if !confirm_lower.contains(&fingerprint.database.to_lowercase())
        && !confirm_lower.contains(&fingerprint.value.to_lowercase())
    {
        bail!(
            "--confirm must include database name {:?} or full fingerprint {:?}",
            fingerprint.database,
            fingerprint.value
        );
    }

    Ok(confirm.to_string())
}

fn validated_scopes(raw: &[String]) -> anyhow::Result<Vec<Scope>> {
    let trimmed: Vec<&str> = raw
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    let invalid: Vec<&&str> = trimmed.iter().filter(|s| !Scope::is_valid(s)).collect();
    if !invalid.is_empty() {
        let listed: Vec<String> = invalid.iter().map(|s| s.to_string()).collect();
        bail!("invalid scopes: {}", listed.join(", "));
    }
    Ok(normalize_scopes(trimmed.iter().copied()))
}

fn print_usage() {
    println!("Usage:");
    println!(
        "  clavis-bootstrap-admin --user-id <uuid> --database-url <postgres-url> --confirm <db-or-fingerprint> [--scopes auth:read,auth:write]"
    );
    println!(
        "  clavis-bootstrap-admin --user-id <uuid> --database-url <postgres-url> --confirm <db-or-fingerprint> --scope auth:read"
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    clavis_observability::init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = parse_args(&argv)?;

    if args.help {
        print_usage();
        return Ok(());
    }

    let Some(database_url) = args.database_url.as_deref().map(str::trim) else {
        bail!("missing required --database-url <postgres-url> argument");
    };
    let fingerprint = read_database_fingerprint(database_url)?;

    let Some(raw_user_id) = args.user_id.as_deref().map(str::trim) else {
        bail!("missing required --user-id <uuid> argument");
    };
    let user_id =
        UserId::from_str(raw_user_id).context("invalid --user-id value, expected UUID")?;

    let scopes = validated_scopes(&args.scopes)?;
    let confirm = assert_confirm_matches(args.confirm.as_deref(), &fingerprint)?;

    println!("Bootstrap target fingerprint:");
    println!("  host: {}", fingerprint.host);
    println!("  db: {}", fingerprint.database);
    println!("  user: {}", fingerprint.user);
    println!("  schema: {}", fingerprint.schema);
    println!("  fingerprint: {}", fingerprint.value);
    println!("  confirm: {confirm}");

    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect(database_url)
        .await
        .context("failed to connect to the database")?;
    let store = Arc::new(PostgresClaimsStore::new(pool));

    match store.bootstrap_first_admin(user_id, scopes.clone()).await {
        Ok(claims) => {
            SecurityEvent::BootstrapSuccess.emit(json!({
                "userId": user_id.to_string(),
                "role": claims.role,
                "scopesCount": claims.scopes.len(),
                "tokenVersion": claims.token_version,
                "source": "cli",
                "databaseFingerprint": fingerprint.value,
            }));
            println!("Bootstrap completed for user {user_id}");
            Ok(())
        }
        Err(ClaimsStoreError::AlreadyInitialized) => {
            SecurityEvent::BootstrapFail.emit(json!({
                "userId": user_id.to_string(),
                "scopesCount": scopes.len(),
                "reason": "already_initialized",
                "databaseFingerprint": fingerprint.value,
            }));
            bail!("bootstrap skipped: an admin user already exists");
        }
        Err(ClaimsStoreError::NotFound) => {
            SecurityEvent::BootstrapFail.emit(json!({
                "userId": user_id.to_string(),
                "scopesCount": scopes.len(),
                "reason": "user_not_found",
                "databaseFingerprint": fingerprint.value,
            }));
            bail!("bootstrap failed: target user was not found");
        }
        Err(err) => {
            SecurityEvent::BootstrapFail.emit(json!({
                "userId": user_id.to_string(),
                "scopesCount": scopes.len(),
                "reason": "runtime_error",
                "error": err.to_string(),
                "databaseFingerprint": fingerprint.value,
            }));
            Err(err.into())
        }
    }
}
