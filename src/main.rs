use clap::{Parser, Subcommand};
use deckchat::client::AgentEndpoint;
use deckchat::export::{DEFAULT_THEME, export_slide, share_slide};
use deckchat::protocol::{ExportFormat, ModelType};
use deckchat::{server, ui};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "deckchat", about = "Chat with a slide-generation agent from your terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    endpoint: EndpointArgs,
}

#[derive(clap::Args)]
struct EndpointArgs {
    /// Agent endpoint URL
    #[arg(long, env = "DECKCHAT_ENDPOINT", global = true)]
    endpoint: Option<String>,

    /// Bearer token for the agent endpoint
    #[arg(long, env = "DECKCHAT_TOKEN", global = true)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive chat session (the default)
    Chat {
        /// Model to drive the agent with
        #[arg(long, value_enum, default_value_t = ModelType::Claude)]
        model: ModelType,
    },
    /// Render a deck markdown file to PDF or PPTX via the agent
    Export {
        /// Deck markdown file
        input: PathBuf,

        #[arg(long, value_enum, default_value_t = ExportFormat::Pdf)]
        format: ExportFormat,

        /// Output file (defaults to the input with the format's extension)
        #[arg(long)]
        out: Option<PathBuf>,

        #[arg(long, default_value = DEFAULT_THEME)]
        theme: String,
    },
    /// Publish a deck markdown file and print its share link
    Share {
        /// Deck markdown file
        input: PathBuf,

        #[arg(long, default_value = DEFAULT_THEME)]
        theme: String,
    },
    /// Run a local mock agent for development
    Serve {
        #[arg(long, default_value = "127.0.0.1:8787")]
        listen: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Chat {
        model: ModelType::Claude,
    }) {
        Command::Chat { model } => {
            let endpoint = AgentEndpoint::resolve(cli.endpoint.endpoint, cli.endpoint.token)?;
            ui::run_chat(endpoint, model)
        }
        Command::Export {
            input,
            format,
            out,
            theme,
        } => {
            let endpoint = AgentEndpoint::resolve(cli.endpoint.endpoint, cli.endpoint.token)?;
            let markdown = std::fs::read_to_string(&input)?;
            let file = export_slide(&endpoint, &markdown, format, &theme).await?;
            let out = out.unwrap_or_else(|| input.with_extension(format.extension()));
            std::fs::write(&out, &file.bytes)?;
            println!("wrote {} ({}, {} bytes)", out.display(), file.mime, file.bytes.len());
            Ok(())
        }
        Command::Share { input, theme } => {
            let endpoint = AgentEndpoint::resolve(cli.endpoint.endpoint, cli.endpoint.token)?;
            let markdown = std::fs::read_to_string(&input)?;
            let share = share_slide(&endpoint, &markdown, &theme).await?;
            println!("{}", share.url);
            println!("expires at (unix): {}", share.expires_at);
            Ok(())
        }
        Command::Serve { listen } => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| "deckchat=debug,tower_http=info".into()),
                )
                .init();
            let auth_token = server::resolve_token(cli.endpoint.token)?;
            println!("auth token: {auth_token}");
            server::run(server::ServerConfig {
                listen,
                auth_token,
            })
            .await
        }
    }
}
