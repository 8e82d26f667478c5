use anyhow::Result;
use axum::Router;
use clap::Parser;
use filmquery_core::{MatchPolicy, QueryConfig, TitleResolution};
use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};
use server::build_app;
use tokio::net::TcpListener;

#[derive(Parser)]
struct Args {
    /// Snapshot directory written by `indexer build`
    #[arg(long, default_value = "./index")]
    index: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// How actor/director names are matched: substring or exact
    #[arg(long, default_value = "substring")]
    match_policy: MatchPolicy,
    /// Which row a repeated title resolves to: first or last
    #[arg(long, default_value = "first")]
    duplicate_titles: TitleResolution,
    /// Minimum vote count for title vote queries
    #[arg(long, default_value_t = 2000)]
    vote_threshold: u64,
    /// Number of recommendations returned
    #[arg(long, default_value_t = 5)]
    recommend_k: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = QueryConfig {
        match_policy: args.match_policy,
        duplicate_titles: args.duplicate_titles,
        vote_threshold: args.vote_threshold,
        recommend_k: args.recommend_k,
    };
    let app: Router = build_app(args.index.clone(), config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, index = %args.index, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
