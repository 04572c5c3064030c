//! Send a message through a WeCom application from the command line.
//!
//! The application's identity is read from `~/.config/wxwork.json` unless
//! `--config` or `$WXWORK_CONFIG` say otherwise. See [wxwork::config].

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::{path::PathBuf, process::ExitCode};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;
use wxwork::{config::Config, WeComClient, WeComError};

#[derive(Parser)]
#[command(name = "wxwork")]
#[command(about = "Send messages through a WeCom application")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level, unless overridden by $RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send a plain text message to the given users, or to everyone
    Text { content: String, users: Vec<String> },
    /// Send a markdown message to the given users, or to everyone
    Markdown { content: String, users: Vec<String> },
    /// Send a previously uploaded image to the given users, or to everyone
    Image { media_id: String, users: Vec<String> },
    /// Fetch and print a fresh access token
    Token,
}

fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// Application entrypoint. Initialises tracing, loads the config, and runs
/// the requested command.
#[tokio::main]
async fn main() -> ExitCode {
    let has_dotenv = dotenv().is_ok();
    let args = Args::parse();

    setup_logging(&args.log_level);

    if !has_dotenv {
        debug!("No .env found");
    }

    let config = match &args.config {
        Some(path) => Config::load(path),
        None => Config::load_default(),
    };

    let config = match config {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut client = WeComClient::new(config.into_account());

    match run(&mut client, args.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(client: &mut WeComClient, command: Command) -> Result<(), WeComError> {
    match command {
        Command::Text { content, users } => {
            client.send_text_to_users(content, &as_strs(&users)).await?;
        }
        Command::Markdown { content, users } => {
            client
                .send_markdown_to_users(content, &as_strs(&users))
                .await?;
        }
        Command::Image { media_id, users } => {
            client
                .send_image_to_users(media_id, &as_strs(&users))
                .await?;
        }
        Command::Token => {
            println!("{}", client.fetch_token().await?);
        }
    }

    Ok(())
}

fn as_strs(xs: &[String]) -> Vec<&str> {
    xs.iter().map(String::as_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_text_with_users() {
        let args = Args::parse_from(["wxwork", "text", "hello", "alice", "bob"]);

        assert!(args.config.is_none());
        assert!(matches!(
            args.command,
            Command::Text { content, users } if content == "hello" && users == ["alice", "bob"]
        ));
    }

    #[test]
    fn test_parse_markdown_to_everyone() {
        let args = Args::parse_from(["wxwork", "--config", "/tmp/wx.json", "markdown", "# hi"]);

        assert_eq!(args.config, Some(PathBuf::from("/tmp/wx.json")));
        assert!(matches!(
            args.command,
            Command::Markdown { users, .. } if users.is_empty()
        ));
    }
}
