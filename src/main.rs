use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = smartfarm::cli::Cli::parse();
    smartfarm::run(cli).await?;
    Ok(())
}
