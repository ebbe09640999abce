//! Gmail Assistant MCP Server
//!
//! A Model Context Protocol (MCP) server exposing Gmail tools for reading
//! unread mail and drafting threaded replies.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;

use gmail_assistant_mcp::config::Config;
use gmail_assistant_mcp::mcp::server::McpServer;
use gmail_assistant_mcp::mcp::tools::ToolHandler;

/// Gmail Assistant MCP Server
#[derive(Parser)]
#[command(name = "gmail-assistant-mcp")]
#[command(author, version, about = "Gmail Assistant MCP Server - Gmail tools over the Model Context Protocol")]
struct Cli {
    /// KEY=VALUE settings file (default: ./.env, then the user config dir)
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tool catalog as JSON
    Tools,

    /// Run a single tool call and print the result
    Call {
        /// Tool name
        name: String,

        /// Tool arguments as a JSON object
        #[arg(default_value = "{}")]
        arguments: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries protocol traffic
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let env_file = cli.env_file.or_else(Config::default_env_file);
    let config = Config::load(env_file.as_deref()).context("Failed to load configuration")?;
    let handler = ToolHandler::new(config);

    match cli.command {
        Some(Commands::Tools) => {
            println!("{}", serde_json::to_string_pretty(&handler.list_tools())?);
        }
        Some(Commands::Call { name, arguments }) => {
            let arguments: Value = serde_json::from_str(&arguments)
                .with_context(|| format!("Tool arguments are not valid JSON: {}", arguments))?;
            let result = handler.call_tool(&name, arguments).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if result.is_error {
                std::process::exit(1);
            }
        }
        None => {
            let mut server = McpServer::new(handler);
            server.run_stdio().await?;
        }
    }

    Ok(())
}
