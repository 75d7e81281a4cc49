pub mod agent;
pub mod cli;
pub mod config;
pub mod history;
pub mod kernel;
pub mod llm;
pub mod models;
pub mod server;
pub mod store;
pub mod tools;

use agent::CallAgent;
use cli::Args;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Record Store Type: {}", args.store_type);
    info!("Database: {}", args.db_name);
    info!("Container: {}", args.db_container);
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Max Tool Rounds: {}", args.max_tool_rounds);
    info!("Prompts Path: {}", args.prompts_path.as_deref().unwrap_or("built-in"));
    info!("Knowledge Search: {}", if args.search_endpoint.is_some() { "enabled" } else { "disabled" });
    info!("Benefits Search: {}", if args.benefits_endpoint.is_some() { "enabled" } else { "disabled" });
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let agent = Arc::new(CallAgent::from_args(&args)?);
    let server = Server::new(args.server_addr.clone(), agent, args.clone());
    server.run().await?;

    Ok(())
}
