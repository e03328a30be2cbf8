use std::path::PathBuf;
use std::sync::Arc;

use bufete::session::RegisterRequest;
use bufete::{
    ApiClient, ApiError, ClientConfig, ConfigError, Failure, FileStore, GuardDecision, HistoryNavigator, Role,
    RouteGuard, SessionController, SessionPhase, SharedCredentials, post_login_destination,
};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("{0}")]
    Failed(#[from] Failure),
    #[error("not signed in; run `bufete login` first")]
    NotSignedIn,
    #[error("invalid JSON output: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "bufete", about = "Bufete portal session client")]
struct Cli {
    /// Base API URL; overrides `BUFETE_API_URL`.
    #[arg(long, env = "BUFETE_API_URL")]
    api_url: Option<String>,

    /// Credential file; overrides `BUFETE_CREDENTIALS_PATH`.
    #[arg(long, env = "BUFETE_CREDENTIALS_PATH")]
    credentials: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the token pair.
    Login {
        email: String,
        #[arg(long, env = "BUFETE_PASSWORD")]
        password: String,
        /// Location that sent you to login; printed back as the destination.
        #[arg(long)]
        next: Option<String>,
    },
    Register {
        email: String,
        #[arg(long, env = "BUFETE_PASSWORD")]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Restore the stored session and print the profile.
    Whoami,
    Logout,
    ForgotPassword {
        email: String,
    },
    ResetPassword {
        token: String,
        #[arg(long, env = "BUFETE_PASSWORD")]
        password: String,
    },
    VerifyEmail {
        token: String,
    },
    /// Authenticated GET of any API path.
    Get {
        path: String,
    },
    /// Show what the route guard decides for `path`.
    Guard {
        path: String,
        #[arg(long = "role", value_delimiter = ',')]
        roles: Vec<Role>,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.api_url.as_deref() {
        config = config.with_api_url(url)?;
    }
    if let Some(path) = cli.credentials {
        config.credentials_path = path;
    }
    tracing::debug!(api_url = %config.api_url, credentials = %config.credentials_path.display(), "config loaded");

    let credentials = SharedCredentials::new(Arc::new(FileStore::new(&config.credentials_path)));
    let client = ApiClient::from_config(&config, credentials, Arc::new(HistoryNavigator::default()))?;
    let session = SessionController::new(client);

    run(&session, cli.command).await
}

async fn run(session: &SessionController, command: Command) -> Result<(), CliError> {
    match command {
        Command::Login { email, password, next } => {
            let user = session.login(&email, &password).await?;
            println!("signed in as {} ({})", user.display_name(), user.role);
            println!("destination: {}", post_login_destination(&user, next.as_deref()));
            Ok(())
        }
        Command::Register { email, password, first_name, last_name, phone } => {
            let form = RegisterRequest { email, password, first_name, last_name, phone };
            println!("{}", session.register(&form).await?);
            Ok(())
        }
        Command::Whoami => {
            if session.bootstrap().await != SessionPhase::Authenticated {
                return Err(CliError::NotSignedIn);
            }
            let user = session.user().ok_or(CliError::NotSignedIn)?;
            print_json(&serde_json::to_value(user)?)
        }
        Command::Logout => {
            session.logout().await;
            println!("signed out");
            Ok(())
        }
        Command::ForgotPassword { email } => {
            println!("{}", session.forgot_password(&email).await?);
            Ok(())
        }
        Command::ResetPassword { token, password } => {
            println!("{}", session.reset_password(&token, &password).await?);
            Ok(())
        }
        Command::VerifyEmail { token } => {
            println!("{}", session.verify_email(&token).await?);
            Ok(())
        }
        Command::Get { path } => {
            let json = session.client().get_json::<Value>(&path).await?;
            print_json(&json)
        }
        Command::Guard { path, roles } => {
            session.bootstrap().await;
            match RouteGuard::roles(roles).check(&session.state(), &path) {
                GuardDecision::Loading => println!("loading"),
                GuardDecision::Allow => println!("allow"),
                GuardDecision::Redirect { to, from: Some(from) } => println!("redirect {to} (return to {from})"),
                GuardDecision::Redirect { to, from: None } => println!("redirect {to}"),
            }
            Ok(())
        }
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
