mod picker;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "clvp")]
#[command(about = "Drive a combined-listing variant picker against a storefront")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the color × size matrix of every picker on a product page
    Combos {
        /// Product page URL, or a path resolved against `CLVP_STORE_URL`
        url: String,
        /// Print the combinations as JSON
        #[arg(long)]
        json: bool,
    },
    /// Apply picks on a product page and print the resulting URL and events
    Pick {
        /// Product page URL, or a path resolved against `CLVP_STORE_URL`
        url: String,
        /// Picker instance id (defaults to the picker that owns the URL)
        #[arg(long)]
        instance: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        size: Option<String>,
    },
    /// Perform successive picks, then walk back through history
    Walk {
        /// Product page URL, or a path resolved against `CLVP_STORE_URL`
        url: String,
        /// A `<color>/<size>` pair to pick; repeatable
        #[arg(long = "to", value_name = "COLOR/SIZE")]
        to: Vec<String>,
        /// Number of back navigations after the picks
        #[arg(long, default_value = "0")]
        back: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = clvp_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Combos { url, json }) => picker::run_combos(&config, &url, json).await?,
        Some(Commands::Pick {
            url,
            instance,
            color,
            size,
        }) => {
            picker::run_pick(
                &config,
                &url,
                instance.as_deref(),
                color.as_deref(),
                size.as_deref(),
            )
            .await?;
        }
        Some(Commands::Walk { url, to, back }) => {
            picker::run_walk(&config, &url, &to, back).await?;
        }
        None => println!("clvp: run `clvp --help` for commands"),
    }

    Ok(())
}

#[cfg(test)]
mod tests;
