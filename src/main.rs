use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    blogflow::logging::init().context("init logging")?;

    let cli = blogflow::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    let config = blogflow::config::AppConfig::from_env()
        .context("load config")?
        .with_data_dir(cli.data_dir);

    match cli.command {
        blogflow::cli::Command::Outline { command } => {
            blogflow::commands::outline(command, &config)
                .await
                .context("outline")?;
        }
        blogflow::cli::Command::Cache { command } => {
            blogflow::commands::cache(command, &config).context("cache")?;
        }
        blogflow::cli::Command::Search(args) => {
            blogflow::commands::search(args, &config)
                .await
                .context("search")?;
        }
        blogflow::cli::Command::Topics(args) => {
            blogflow::commands::topics(args, &config)
                .await
                .context("topics")?;
        }
        blogflow::cli::Command::Content(args) => {
            blogflow::commands::content(args, &config)
                .await
                .context("content")?;
        }
        blogflow::cli::Command::Elaborate(args) => {
            blogflow::commands::elaborate(args, &config)
                .await
                .context("elaborate")?;
        }
    }

    Ok(())
}
