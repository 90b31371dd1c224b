pub mod broker;
pub mod cli;
pub mod client;
pub mod error;
pub mod history;
pub mod llm;
pub mod models;
pub mod render;
pub mod server;

use cli::{ Args, Command, ServeArgs };
use log::info;
use server::Server;
use std::error::Error;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    match args.command {
        Command::Serve(serve_args) => serve(serve_args).await,
        Command::Ask(ask_args) => client::run_ask(ask_args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}:{}", args.host, args.port);
    info!("Primary Provider: groq model={} base_url={}", args.groq_model, args.groq_base_url);
    info!("Vision/Fallback Provider: gemini model={} base_url={}", args.gemini_model, args.gemini_base_url);
    info!("Temperature: {}", args.temperature);
    info!("History Capacity: {}", args.history_capacity);
    info!("Minimum Request Interval: {}ms", args.min_interval_ms);
    info!("Provider Timeout: {}s", args.provider_timeout_secs);
    info!("Session Scope: {:?}", args.session_scope);
    info!("Session Limits: max={} idle={}s", args.max_sessions, args.session_idle_secs);
    info!("Static Dir: {}", args.static_dir);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let server = Server::new(args)?;
    server.run().await?;

    Ok(())
}
