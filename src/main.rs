//! Flow Agent CLI
//!
//! Command-line interface for the agent's Flow account and tools.

use clap::{Parser, Subcommand};
use flow_agent::interceptors::AuditLogInterceptor;
use flow_agent::tools::{
    GetAccountTool, GetProfileTool, MessageEncoding, ProfileField, ProfileFieldInput,
    SignUserMessageInput, SignUserMessageTool, ToolRegistry,
};
use flow_agent::tools::{AccountInput, EmptyArgs, FlowTool, SetProfileFieldTool};
use flow_agent::{ClientContext, Config, Error, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "flow-agent")]
#[command(about = "Sign, submit and track Flow transactions for an agent")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current configuration
    Config,

    /// Show an account's balance and keys
    Account {
        /// Account address (defaults to the configured account)
        #[arg(short, long)]
        address: Option<String>,
    },

    /// Show the configured account's profile
    Profile,

    /// Set the profile info and wait until sealed
    SetInfo { info: String },

    /// Set the profile name and wait until sealed
    SetName { name: String },

    /// Set the profile avatar URL and wait until sealed
    SetAvatar { avatar: String },

    /// Sign a message under the user domain tag
    SignMessage {
        message: String,

        /// Treat the message as hex-encoded bytes
        #[arg(long)]
        hex: bool,
    },

    /// List the available tools and their input schemas
    Tools,

    /// Invoke a tool with JSON input, as an agent would
    Invoke {
        /// Tool name, e.g. flow/get_profile
        tool: String,

        /// JSON input
        #[arg(default_value = "{}")]
        input: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    // Load config
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.apply_env()?;

    let audit_log_path = config.audit_log_path.clone();
    let ctx = Arc::new(ClientContext::from_config(config)?);

    match cli.command {
        Commands::Config => print_json(ctx.config()),
        Commands::Account { address } => {
            let out = GetAccountTool::new(ctx).execute(AccountInput { address }).await?;
            print_json(&out)
        }
        Commands::Profile => {
            let out = GetProfileTool::new(ctx).execute(EmptyArgs {}).await?;
            print_json(&out)
        }
        Commands::SetInfo { info } => set_profile_field(ctx, ProfileField::Info, info).await,
        Commands::SetName { name } => set_profile_field(ctx, ProfileField::Name, name).await,
        Commands::SetAvatar { avatar } => {
            set_profile_field(ctx, ProfileField::Avatar, avatar).await
        }
        Commands::SignMessage { message, hex } => {
            let encoding = if hex {
                MessageEncoding::Hex
            } else {
                MessageEncoding::Utf8
            };
            let out = SignUserMessageTool::new(ctx)
                .execute(SignUserMessageInput { message, encoding })
                .await?;
            print_json(&out)
        }
        Commands::Tools => print_json(&ToolRegistry::with_flow_tools(ctx).describe()),
        Commands::Invoke { tool, input } => {
            let mut registry = ToolRegistry::with_flow_tools(ctx);
            if let Some(path) = audit_log_path {
                registry.add_interceptor(Arc::new(AuditLogInterceptor::new(path)));
            }
            println!("{}", registry.invoke(&tool, &input).await);
            Ok(())
        }
    }
}

async fn set_profile_field(
    ctx: Arc<ClientContext>,
    field: ProfileField,
    value: String,
) -> Result<()> {
    let out = SetProfileFieldTool::new(ctx, field)
        .execute(ProfileFieldInput { value })
        .await?;
    print_json(&out)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).map_err(Error::from)?;
    println!("{}", rendered);
    Ok(())
}
