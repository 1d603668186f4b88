use crate::server;
use chrono::Duration;
use clap::{Args, Parser, Subcommand};
use flat_registry::auth::{Role, TokenError, TokenService, UserId};
use flat_registry::config::AppConfig;
use flat_registry::error::AppError;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(
    name = "flat-registry-api",
    about = "Serve the flat registry HTTP API or mint access tokens for it",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print a signed access token using the configured secret
    Token(TokenArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct TokenArgs {
    /// Role asserted by the token (client or moderator)
    #[arg(long)]
    pub(crate) role: Role,
    /// Subject of the token; a fresh id is generated when omitted
    #[arg(long)]
    pub(crate) user_id: Option<Uuid>,
    /// Lifetime in seconds; defaults to APP_TOKEN_TTL_SECS
    #[arg(long)]
    pub(crate) ttl_secs: Option<i64>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Token(args) => print_token(args),
    }
}

fn print_token(args: TokenArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let tokens = TokenService::from_config(&config.auth)?;
    let token = issue_token(&tokens, &args)?;
    println!("{token}");
    Ok(())
}

pub(crate) fn issue_token(tokens: &TokenService, args: &TokenArgs) -> Result<String, AppError> {
    let user_id = args.user_id.map(UserId).unwrap_or_else(UserId::generate);
    let ttl = match args.ttl_secs {
        Some(secs) => Duration::try_seconds(secs).ok_or(TokenError::ExpiryOutOfRange)?,
        None => tokens.default_ttl(),
    };
    Ok(tokens.issue(user_id, args.role, ttl)?)
}
