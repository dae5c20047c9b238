use clap::{Args, Parser, Subcommand};
use mayday::config::{AppConfig, AuthConfig, DEFAULT_PUSH_BODY, DEFAULT_PUSH_TITLE};
use mayday::push::vapid::{VapidConfigStatus, load_vapid_config, verify_key_pair};
use mayday::types::mayday::UserId;
use std::net::SocketAddr;
use std::path::PathBuf;
use time::Duration;

const DEFAULT_AUTH_COOKIE_NAME: &str = "mayday_auth";
const DEFAULT_DELIVERY_TIMEOUT_SECS: i64 = 30;

#[allow(clippy::large_enum_variant)]
pub(crate) enum RunOutcome {
    Serve(AppConfig),
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    match cli.command {
        Some(Command::Init(ref args)) => return RunOutcome::Exit(run_init(args)),
        Some(Command::AuthKey) => return RunOutcome::Exit(run_auth_key()),
        Some(Command::Token(ref args)) => return RunOutcome::Exit(run_token(&cli, args)),
        None => {}
    }

    match resolve_app_config(&cli) {
        Ok(config) => RunOutcome::Serve(config),
        Err(err) => {
            eprintln!("error: {err}");
            RunOutcome::Exit(2)
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "mayday",
    version,
    about = "Proximity distress alerts over Web Push"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[arg(long, env = "MAYDAY_BIND", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,
    #[arg(long, default_value = "Mayday")]
    app_name: String,
    #[arg(long, env = "MAYDAY_VAPID_CONTACT")]
    vapid_contact: Option<String>,
    #[arg(long, env = "MAYDAY_VAPID_PUBLIC_KEY")]
    vapid_public_key: Option<String>,
    #[arg(long, env = "MAYDAY_VAPID_PRIVATE_KEY")]
    vapid_private_key: Option<String>,
    #[arg(long, env = "MAYDAY_REGISTRY")]
    registry: Option<PathBuf>,
    #[arg(long, env = "MAYDAY_DELIVERY_TIMEOUT")]
    delivery_timeout: Option<String>,
    #[arg(long, default_value = DEFAULT_PUSH_TITLE)]
    push_title: String,
    #[arg(long, default_value = DEFAULT_PUSH_BODY)]
    push_body: String,
    #[arg(long, default_value_t = mayday::feed::DEFAULT_FEED_CAPACITY)]
    feed_capacity: usize,
    #[arg(long, env = "MAYDAY_AUTH_KEY")]
    auth_key: Option<String>,
    #[arg(long, env = "MAYDAY_AUTH_TOKEN_TTL")]
    auth_token_ttl: Option<String>,
    #[arg(long, env = "MAYDAY_AUTH_COOKIE_NAME")]
    auth_cookie_name: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a VAPID key pair.
    Init(InitArgs),
    /// Generate a token signing key.
    AuthKey,
    /// Mint a session token for a user id.
    Token(TokenArgs),
}

#[derive(Args, Debug)]
struct InitArgs {
    #[arg(long)]
    contact: Option<String>,
}

#[derive(Args, Debug)]
struct TokenArgs {
    #[arg(long)]
    user: String,
    #[arg(long)]
    ttl: Option<String>,
}

fn run_init(args: &InitArgs) -> i32 {
    let credentials = match mayday::generate_vapid_credentials() {
        Ok(credentials) => credentials,
        Err(err) => {
            eprintln!("failed to generate VAPID credentials: {err}");
            return 1;
        }
    };
    let (contact, show_contact_note) = match args.contact.as_deref() {
        Some(contact) => (contact.to_string(), false),
        None => ("mailto:you@example.com".to_string(), true),
    };

    println!("VAPID credentials generated.");
    println!();
    println!("MAYDAY_VAPID_PRIVATE_KEY=\"{}\"", credentials.private_key);
    println!("MAYDAY_VAPID_PUBLIC_KEY=\"{}\"", credentials.public_key);
    println!("MAYDAY_VAPID_CONTACT=\"{contact}\"");
    if show_contact_note {
        println!();
        println!("Note: replace MAYDAY_VAPID_CONTACT with a contact URI you control.");
    }
    println!();
    println!(
        "--vapid-private-key \"{}\" --vapid-public-key \"{}\" --vapid-contact \"{contact}\"",
        credentials.private_key, credentials.public_key
    );
    0
}

fn run_auth_key() -> i32 {
    let secret = match mayday::auth::generate_auth_key() {
        Ok(secret) => secret,
        Err(err) => {
            eprintln!("failed to generate auth key: {err}");
            return 1;
        }
    };
    println!("{secret}");
    0
}

fn run_token(cli: &Cli, args: &TokenArgs) -> i32 {
    match mint_token(cli, args) {
        Ok(token) => {
            println!("{token}");
            0
        }
        Err(err) => {
            eprintln!("error: {err}");
            2
        }
    }
}

fn mint_token(cli: &Cli, args: &TokenArgs) -> Result<String, String> {
    let auth = resolve_auth_config(cli)?.ok_or("--auth-key is required to mint tokens")?;
    let ttl = match args.ttl.as_deref() {
        Some(raw) => parse_duration("token ttl", raw)?,
        None => auth.token_ttl,
    };
    let state = mayday::auth::AuthState::new(&auth, &cli.app_name).map_err(|err| err.to_string())?;
    state
        .issue_token_with_ttl(&UserId::new(args.user.trim()), ttl)
        .map_err(|err| err.to_string())
}

fn resolve_app_config(cli: &Cli) -> Result<AppConfig, String> {
    let vapid = match load_vapid_config(
        cli.vapid_contact.as_deref(),
        cli.vapid_public_key.as_deref(),
        cli.vapid_private_key.as_deref(),
    ) {
        VapidConfigStatus::Ready(vapid) => vapid,
        VapidConfigStatus::Missing => {
            return Err(
                "VAPID keys are required; run `mayday init` and pass --vapid-contact, \
                 --vapid-public-key and --vapid-private-key"
                    .to_string(),
            );
        }
        VapidConfigStatus::Incomplete(missing) => {
            return Err(format!(
                "incomplete VAPID configuration; missing {}",
                missing.join(", ")
            ));
        }
    };
    verify_key_pair(&vapid)?;

    let delivery_timeout = match cli.delivery_timeout.as_deref() {
        Some(raw) => parse_duration("delivery timeout", raw)?,
        None => Duration::seconds(DEFAULT_DELIVERY_TIMEOUT_SECS),
    };
    let delivery_timeout = std::time::Duration::try_from(delivery_timeout)
        .map_err(|_| "delivery timeout is out of range".to_string())?;

    if cli.feed_capacity == 0 {
        return Err("feed capacity must be greater than 0".to_string());
    }

    Ok(AppConfig {
        bind: cli.bind,
        app_name: cli.app_name.clone(),
        vapid,
        auth: resolve_auth_config(cli)?,
        registry_path: cli.registry.clone(),
        delivery_timeout,
        push_title: cli.push_title.clone(),
        push_body: cli.push_body.clone(),
        feed_capacity: cli.feed_capacity,
    })
}

fn resolve_auth_config(cli: &Cli) -> Result<Option<AuthConfig>, String> {
    let has_any = cli.auth_key.is_some()
        || cli.auth_token_ttl.is_some()
        || cli.auth_cookie_name.is_some();

    if !has_any {
        return Ok(None);
    }

    let auth_key = cli
        .auth_key
        .as_ref()
        .ok_or("auth is configured but --auth-key is missing")?
        .trim();
    if auth_key.is_empty() {
        return Err("auth key cannot be empty".to_string());
    }

    if let Some(name) = cli.auth_cookie_name.as_deref()
        && name.trim().is_empty()
    {
        return Err("auth cookie name cannot be empty".to_string());
    }

    let token_ttl = match cli.auth_token_ttl.as_deref() {
        Some(raw) => parse_duration("auth token ttl", raw)?,
        None => default_auth_token_ttl(),
    };
    let cookie_name = cli
        .auth_cookie_name
        .as_deref()
        .map(|name| name.trim().to_string())
        .unwrap_or_else(|| DEFAULT_AUTH_COOKIE_NAME.to_string());

    Ok(Some(AuthConfig {
        key: auth_key.to_string(),
        token_ttl,
        cookie_name,
    }))
}

fn default_auth_token_ttl() -> Duration {
    Duration::days(14)
}

/// Parses `<number>[s|m|h|d]`; a bare number is seconds.
fn parse_duration(label: &str, raw: &str) -> Result<Duration, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(format!("{label} cannot be empty"));
    }

    let (amount, unit) = match value.chars().last() {
        Some(ch) if ch.is_ascii_alphabetic() => {
            (&value[..value.len() - 1], ch.to_ascii_lowercase())
        }
        _ => (value, 's'),
    };

    let amount: i64 = amount
        .parse()
        .map_err(|_| format!("invalid {label} '{value}'; expected <number>[s|m|h|d]"))?;

    if amount <= 0 {
        return Err(format!("{label} must be greater than 0"));
    }

    let scale = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3_600,
        'd' => 86_400,
        _ => {
            return Err(format!(
                "invalid {label} '{value}'; expected <number>[s|m|h|d]"
            ));
        }
    };
    amount
        .checked_mul(scale)
        .map(Duration::seconds)
        .ok_or_else(|| format!("{label} '{value}' is too large"))
}
