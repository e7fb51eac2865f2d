//! CLI entry point for the markup agent.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use bytes::Bytes;
use clap::Parser;
use markup_agent::config::AgentConfig;
use markup_agent::document::Document;
use markup_agent::download::{
    BytesDecoder, CssValue, DownloadError, DownloadListener, FontFaceRule, ResourceDownloader,
};
use markup_agent::origin::{DefaultOriginPolicy, OriginPolicy, registrable_domain};
use markup_agent::retriever::DocumentRetriever;
use markup_agent::{ConnectionOpener, HttpConnectionOpener};
use tracing::{debug, info, warn};
use url::Url;

mod cli;

use cli::{Args, Command};

/// Reports the outcome of a command-line download.
struct ReportingListener {
    document: Option<Arc<Document>>,
}

impl DownloadListener<Bytes> for ReportingListener {
    fn on_content_downloaded(&self, content: Arc<Bytes>) {
        info!(bytes = content.len(), "content downloaded");
    }

    fn on_failed_download(&self, error: &DownloadError) {
        warn!(error = %error, "download failed");
    }

    fn native_content(&self) -> Option<Arc<Bytes>> {
        None
    }

    fn owning_document(&self) -> Option<Arc<Document>> {
        self.document.clone()
    }
}

fn load_config(args: &Args) -> Result<AgentConfig> {
    let mut config = match &args.config {
        Some(path) => AgentConfig::from_json_file(path)?,
        None => AgentConfig::default(),
    };
    if let Some(secs) = args.connect_timeout {
        config.connect_timeout_secs = secs;
    }
    if let Some(secs) = args.read_timeout {
        config.read_timeout_secs = secs;
    }
    if let Some(path) = &args.suffix_list {
        config.suffix_list_path = Some(path.clone());
    }
    config.validate()?;
    Ok(config)
}

async fn fetch(retriever: &DocumentRetriever, url: &Url, json: bool) -> Result<()> {
    let document = retriever.read_url(url).await?;
    let summary = serde_json::json!({
        "url": document.document_uri().as_str(),
        "kind": format!("{:?}", document.kind()),
        "loading_time": document.loading_time(),
        "title": document.title(),
        "base_uri": document.base_uri().as_str(),
        "referrer_policy": document.effective_referrer_policy().as_str(),
        "style_sheet_sets": document.style_sheet_sets(),
        "preferred_style_sheet_set": document.preferred_style_sheet_set(),
        "selected_style_sheet_set": document.selected_style_sheet_set(),
    });
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}  {:?}", document.document_uri(), document.kind());
        if let Some(title) = document.title() {
            println!("  title:      {title}");
        }
        println!("  referrer:   {}", document.effective_referrer_policy());
        println!("  style sets: {}", document.style_sheet_sets().join(", "));
        if let Some(selected) = document.selected_style_sheet_set() {
            println!("  selected:   {selected}");
        }
    }
    Ok(())
}

async fn download(
    downloader: ResourceDownloader<Bytes>,
    document: Option<Arc<Document>>,
) -> Result<()> {
    downloader.add_listener(Arc::new(ReportingListener { document }));
    downloader.run().await;
    if let Some(error) = downloader.error() {
        bail!("cannot download {}: {error}", downloader.url());
    }
    let size = downloader.native_content().map_or(0, |content| content.len());
    println!(
        "{}  {} bytes  {}",
        downloader.url(),
        size,
        downloader.content_type().as_deref().unwrap_or("-")
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");
    let config = load_config(&args)?;

    match &args.command {
        Command::Fetch { url, json } => {
            let retriever = DocumentRetriever::new(&config)?;
            fetch(&retriever, url, *json).await?;
        }
        Command::Domain { hosts } => {
            let policy: Arc<dyn OriginPolicy> = match &config.suffix_list_path {
                Some(path) => Arc::new(DefaultOriginPolicy::from_path(path)?),
                None => DefaultOriginPolicy::shared(),
            };
            for host in hosts {
                let url = Url::parse(&format!("http://{host}/"))
                    .with_context(|| format!("invalid host name {host:?}"))?;
                let domain = registrable_domain(policy.as_ref(), &url).unwrap_or_default();
                println!("{host}\t{domain}");
            }
        }
        Command::Get { url, document } => {
            let retriever = DocumentRetriever::new(&config)?;
            let owner = match document {
                Some(document_url) => Some(Arc::new(retriever.read_url(document_url).await?)),
                None => None,
            };
            let downloader = ResourceDownloader::new(
                url.clone(),
                Arc::clone(retriever.opener()),
                Arc::new(BytesDecoder),
            );
            download(downloader, owner).await?;
        }
        Command::Font { src, base } => {
            let opener: Arc<dyn ConnectionOpener> = Arc::new(HttpConnectionOpener::new(&config)?);
            let rule = FontFaceRule::with_src(CssValue::parse_src(src));
            let downloader = ResourceDownloader::from_font_face(
                &rule,
                base.as_ref(),
                opener,
                Arc::new(BytesDecoder),
            )?;
            download(downloader, None).await?;
        }
    }

    Ok(())
}
