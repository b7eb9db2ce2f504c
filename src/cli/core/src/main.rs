/* src/cli/core/src/main.rs */

mod config;
mod extract;
mod listing;
mod logging;
mod preview;
mod render;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cms_api::{ApiConfig, CachedSource, ContentSource, HttpContentSource, PageId, SiteId};

use config::{CmsConfig, apply_api_override, resolve_config};
use render::RenderOptions;

#[derive(Parser)]
#[command(name = "cms", about = "Render and preview CMS pages", version)]
struct Cli {
  /// Path to cms.toml (auto-detected if omitted)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,
  /// Base URL of the CMS API, overrides [api].base_url
  #[arg(long, global = true)]
  api: Option<String>,
  /// Log debug output to stderr
  #[arg(short, long, global = true)]
  verbose: bool,
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// List the sites known to the CMS
  Sites,
  /// List a site's pages in menu order
  Pages {
    /// Site id (defaults to [render].site_id)
    #[arg(short, long)]
    site: Option<SiteId>,
  },
  /// Show the component placeholders in a page's stored HTML
  Extract {
    /// Page id
    #[arg(short, long)]
    page: PageId,
    /// Print the placeholders as JSON
    #[arg(long)]
    json: bool,
  },
  /// Render a page through the full pipeline
  Render {
    /// Page id
    #[arg(short, long)]
    page: PageId,
    /// Output file path (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
    /// Leave mounted components in their loading state
    #[arg(long)]
    no_components: bool,
    /// Emit the rendered body only, without the document head
    #[arg(long)]
    body_only: bool,
  },
  /// Start a preview server that renders pages on request
  Serve {
    /// Port to listen on (defaults to [serve].port)
    #[arg(short, long)]
    port: Option<u16>,
    /// Address to bind (defaults to [serve].host)
    #[arg(long)]
    host: Option<String>,
  },
}

/// Config file (explicit or discovered) with command-line overrides applied
fn load_config(cli: &Cli) -> Result<CmsConfig> {
  let cwd = std::env::current_dir().context("failed to get cwd")?;
  let (path, mut config) = resolve_config(cli.config.as_deref(), &cwd)?;
  match &path {
    Some(p) => tracing::debug!(path = %p.display(), "loaded config"),
    None => tracing::debug!("no cms.toml found, using defaults"),
  }
  if let Some(api) = &cli.api {
    apply_api_override(&mut config, api)?;
  }
  Ok(config)
}

fn http_source(api: &ApiConfig) -> Result<HttpContentSource> {
  HttpContentSource::new(api).with_context(|| format!("invalid API endpoint {}", api.base_url))
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  logging::init_logging(cli.verbose);
  let config = load_config(&cli)?;

  match cli.command {
    Command::Sites => {
      let source = http_source(&config.api)?;
      listing::run_sites(&source).await?;
    }
    Command::Pages { site } => {
      let site_id = site
        .or(config.render.site_id)
        .context("no site given: pass --site or set [render].site_id in cms.toml")?;
      let source = http_source(&config.api)?;
      listing::run_pages(&source, site_id).await?;
    }
    Command::Extract { page, json } => {
      let source = http_source(&config.api)?;
      extract::run_extract(&source, page, json).await?;
    }
    Command::Render { page, out, no_components, body_only } => {
      let source = http_source(&config.api)?;
      let mut options = RenderOptions::from(&config.render);
      options.resolve_components &= !no_components;
      options.document &= !body_only;
      render::run_render(&source, page, out.as_deref(), options).await?;
    }
    Command::Serve { port, host } => {
      let port = port.unwrap_or(config.serve.port);
      let host = host.unwrap_or_else(|| config.serve.host.clone());
      ui::banner("serve");
      ui::arrow(&format!("content from {}", config.api.base_url));
      let http = http_source(&config.api)?;
      let source: Arc<dyn ContentSource> =
        if config.serve.cache { Arc::new(CachedSource::new(http)) } else { Arc::new(http) };
      let state = preview::PreviewState::new(source, RenderOptions::from(&config.render));
      preview::serve(state, &host, port).await?;
    }
  }

  Ok(())
}
