use clap::Parser;
use pusaka_ingest::IngestArgs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = IngestArgs::parse();

    pusaka_ingest::ingest(args).await
}
