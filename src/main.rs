use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sitesearch::api::{create_router, AppState};
use sitesearch::config::{DEFAULT_CORPUS_URL, DEFAULT_MAX_RESULTS};
use sitesearch::fixer::fix_directory;
use sitesearch::linkcheck::LinkChecker;
use sitesearch::loader::{CorpusLoader, CorpusSource, HttpSource, SiteDirSource};
use sitesearch::render::ResultsView;
use sitesearch::widget::SearchSession;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

// CLI Arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Search and HTML tooling for static documentation sites", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the site's search data and run one query against it
    Search {
        #[command(flatten)]
        corpus: CorpusArgs,

        #[arg(short, long, default_value_t = DEFAULT_MAX_RESULTS)]
        limit: usize,

        query: String,
    },
    /// Serve the search pipeline over HTTP for previewing
    Serve {
        #[command(flatten)]
        corpus: CorpusArgs,

        #[arg(short, long, default_value = "127.0.0.1:4000")]
        addr: String,
    },
    /// Remove trailing slashes from void elements in every HTML file
    FixHtml { dir: PathBuf },
    /// Validate internal links (and optionally anchors) in Markdown docs
    CheckLinks {
        docs_dir: PathBuf,

        #[arg(short, long, default_value = "/help")]
        prefix: String,

        #[arg(long)]
        anchors: bool,
    },
}

#[derive(clap::Args, Debug)]
struct CorpusArgs {
    /// Built site directory holding the search data
    #[arg(short, long, conflicts_with = "base_url", required_unless_present = "base_url")]
    site: Option<PathBuf>,

    /// Base URL of the deployed site
    #[arg(short, long)]
    base_url: Option<String>,

    #[arg(short, long, default_value = DEFAULT_CORPUS_URL)]
    corpus_url: String,
}

impl CorpusArgs {
    async fn session(&self) -> Result<SearchSession> {
        let corpus = match (&self.site, &self.base_url) {
            (Some(site), _) => load(SiteDirSource::new(site), &self.corpus_url).await?,
            (None, Some(base)) => load(HttpSource::new(base)?, &self.corpus_url).await?,
            (None, None) => bail!("either --site or --base-url is required"),
        };
        Ok(SearchSession::new(corpus)?)
    }
}

async fn load<S: CorpusSource>(source: S, url: &str) -> Result<sitesearch::Corpus> {
    let start = Instant::now();
    let corpus = CorpusLoader::new(source)
        .load(url)
        .await
        .with_context(|| format!("Failed to load search data from {}", url))?;
    println!("Loaded {} documents in {:?}", corpus.len(), start.elapsed());
    Ok(corpus)
}

async fn do_search(corpus: &CorpusArgs, limit: usize, query: &str) -> Result<()> {
    let session = corpus.session().await?;

    let start = Instant::now();
    let mut hits = session.index().search(query)?;
    let duration = start.elapsed();
    println!("Search found {} documents in {:?}", hits.len(), duration);
    println!();

    hits.truncate(limit);
    for hit in &hits {
        if let Some(doc) = session.corpus().get(&hit.doc_ref) {
            println!("{:>8.3}\t{}\t{}", hit.score, doc.title, doc.url);
        }
    }

    let mut view = ResultsView::default();
    view.render(&hits, session.corpus());
    println!();
    println!("{}", view.html());
    Ok(())
}

async fn serve(corpus: &CorpusArgs, addr: &str) -> Result<()> {
    let session = corpus.session().await?;
    let state = Arc::new(AppState {
        session: Arc::new(session),
        max_results: DEFAULT_MAX_RESULTS,
    });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(addr, "preview server listening");
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}

fn fix_html(dir: &Path) -> Result<bool> {
    let report = fix_directory(dir)?;
    println!(
        "Done! Processed {} files, rewrote {}.",
        report.scanned,
        report.rewritten.len()
    );
    Ok(true)
}

fn check_links(docs_dir: &Path, prefix: &str, anchors: bool) -> Result<bool> {
    let checker = LinkChecker::new(docs_dir, prefix)?;
    println!("Checking links in {}", docs_dir.display());

    let report = checker.check_links()?;
    println!("Total links found: {}", report.total);
    println!("Valid internal links: {}", report.valid);
    println!("Broken internal links: {}", report.broken.len());
    println!("External/other links: {}", report.external);
    for broken in &report.broken {
        println!("  ✗ {}", broken);
    }
    let mut ok = report.broken.is_empty();

    if anchors {
        let report = checker.check_anchors()?;
        println!();
        println!("Total anchor links found: {}", report.total);
        println!("Valid anchor links: {}", report.valid);
        println!("Broken anchor links: {}", report.broken.len());
        for broken in &report.broken {
            println!("  ✗ {}", broken);
        }
        ok &= report.broken.is_empty();
    }

    println!();
    if ok {
        println!("✓ All links are valid!");
    } else {
        println!("Please fix the broken links above.");
    }
    Ok(ok)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let ok = match &args.command {
        Command::Search {
            corpus,
            limit,
            query,
        } => do_search(corpus, *limit, query).await.map(|_| true)?,
        Command::Serve { corpus, addr } => serve(corpus, addr).await.map(|_| true)?,
        Command::FixHtml { dir } => fix_html(dir)?,
        Command::CheckLinks {
            docs_dir,
            prefix,
            anchors,
        } => check_links(docs_dir, prefix, *anchors)?,
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
