use crate::config::Config;
use crate::render::{ItemTemplate, DEFAULT_TEMPLATE};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use pocket_api::{
    acquire, AccessCredential, FlowOptions, Origin, PocketApi, PocketAuth, RetrieveOptions,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "pocket", version, about = "A Pocket <getpocket.com> client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Credential cache file
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List saved items
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output template for each item, e.g. '{{.ResolvedTitle}} <{{.ResolvedURL}}>'
    #[arg(long)]
    pub format: Option<String>,

    /// Only items from this domain
    #[arg(long)]
    pub domain: Option<String>,

    /// Only items whose title or URL contains this query
    #[arg(long)]
    pub search: Option<String>,
}

pub async fn run(cli: Cli, cancel: CancellationToken) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_default(&config_path)?;
    if let Some(store) = cli.store {
        config.auth.store_path = Some(store);
    }

    // Bad templates should fail before the user is sent to a browser.
    let template = match &cli.command {
        Some(Command::List(args)) => Some(ItemTemplate::parse(
            args.format.as_deref().unwrap_or(DEFAULT_TEMPLATE),
        )?),
        None => None,
    };

    let credential = authorize(&config, cancel.clone()).await?;

    match (cli.command, template) {
        (Some(Command::List(args)), Some(template)) => {
            list(&config, &credential, args, &template, &cancel).await
        }
        _ => Ok(()),
    }
}

async fn authorize(config: &Config, cancel: CancellationToken) -> Result<AccessCredential> {
    let store = config.store()?;
    let authorizer = PocketAuth::new(config.consumer_key()?, config.api_base()?);
    let options = FlowOptions {
        bind_addr: SocketAddr::new(config.auth.callback_host, 0),
        deadline: config.auth_deadline(),
        cancel,
    };

    let acquired = acquire(&store, &authorizer, options, |url| println!("{url}")).await?;
    if acquired.origin == Origin::Store {
        debug!(path = %store.path().display(), "Using cached credential");
    }
    Ok(acquired.credential)
}

async fn list(
    config: &Config,
    credential: &AccessCredential,
    args: ListArgs,
    template: &ItemTemplate,
    cancel: &CancellationToken,
) -> Result<()> {
    let api = PocketApi::new(config.consumer_key()?, config.api_base()?);
    let options = RetrieveOptions {
        domain: args.domain,
        search: args.search,
    };

    let items = tokio::select! {
        result = api.retrieve(credential, &options) => result.context("Failed to list items")?,
        _ = cancel.cancelled() => bail!("Interrupted"),
    };

    for item in &items {
        println!("{}", template.render(item));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_list_with_filters() {
        let cli = Cli::try_parse_from([
            "pocket",
            "list",
            "--format={{.ResolvedURL}}",
            "--domain=example.com",
            "--search",
            "rust",
        ])
        .unwrap();

        match cli.command {
            Some(Command::List(args)) => {
                assert_eq!(args.format.as_deref(), Some("{{.ResolvedURL}}"));
                assert_eq!(args.domain.as_deref(), Some("example.com"));
                assert_eq!(args.search.as_deref(), Some("rust"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn no_subcommand_means_bootstrap_only() {
        let cli = Cli::try_parse_from(["pocket", "--store", "/tmp/cache.json"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/cache.json")));
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["pocket", "add", "https://example.com"]).is_err());
    }

    #[tokio::test]
    async fn bad_template_fails_before_authorization() {
        let dir = tempfile::TempDir::new().unwrap();
        let cli = Cli::try_parse_from([
            "pocket".to_string(),
            "--config".to_string(),
            dir.path().join("missing.toml").display().to_string(),
            "--store".to_string(),
            dir.path().join("cache.json").display().to_string(),
            "list".to_string(),
            "--format={{.Bogus}}".to_string(),
        ])
        .unwrap();

        let err = run(cli, CancellationToken::new()).await.unwrap_err();

        assert!(err.to_string().contains("Bogus"));
        assert!(!dir.path().join("cache.json").exists());
    }
}
