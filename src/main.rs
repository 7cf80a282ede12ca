use clap::Parser;
use shiplog::{cli, logging};

#[tokio::main]
async fn main() -> shiplog::Result<()> {
    let args = cli::Args::parse();
    let _logging = logging::init(&args.command)?;
    cli::run(args).await
}
