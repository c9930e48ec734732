use crate::document::Corpus;
use crate::error::SearchError;
use reqwest::{Client, Url};
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Raw outcome of the single GET issued for the corpus
#[derive(Debug, Clone)]
pub struct FetchedBody {
    pub status: u16,
    pub text: String,
}

impl FetchedBody {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            status: 200,
            text: text.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Where the corpus file comes from
pub trait CorpusSource {
    /// Issue one GET for `url`. Only transport failures are errors; any
    /// response, whatever its status, is returned as a `FetchedBody`.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedBody, SearchError>> + Send;
}

/// Fetches the corpus over HTTP, resolving relative paths against a base URL
pub struct HttpSource {
    client: Client,
    base: Url,
}

impl HttpSource {
    pub fn new(base: &str) -> Result<Self, SearchError> {
        let base = Url::parse(base).map_err(|e| SearchError::CorpusFetch {
            url: base.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            client: Client::new(),
            base,
        })
    }

    pub fn resolve(&self, url: &str) -> Result<Url, SearchError> {
        self.base.join(url).map_err(|e| SearchError::CorpusFetch {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

impl CorpusSource for HttpSource {
    async fn fetch(&self, url: &str) -> Result<FetchedBody, SearchError> {
        let target = self.resolve(url)?;
        let fetch_error = |e: reqwest::Error| SearchError::CorpusFetch {
            url: target.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .get(target.clone())
            .send()
            .await
            .map_err(fetch_error)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(fetch_error)?;
        debug!(url = %target, status, bytes = text.len(), "search data fetched");

        Ok(FetchedBody { status, text })
    }
}

/// Serves the corpus out of a built site directory, the way a static file
/// server would: the URL path is mapped under `root`, missing files are 404.
pub struct SiteDirSource {
    root: PathBuf,
}

impl SiteDirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a URL path onto the site directory; `None` for paths escaping it
    pub fn resolve(&self, url: &str) -> Option<PathBuf> {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

impl CorpusSource for SiteDirSource {
    async fn fetch(&self, url: &str) -> Result<FetchedBody, SearchError> {
        let Some(path) = self.resolve(url) else {
            return Ok(FetchedBody {
                status: 404,
                text: String::new(),
            });
        };

        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                debug!(path = %path.display(), bytes = text.len(), "search data read");
                Ok(FetchedBody::ok(text))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(FetchedBody {
                status: 404,
                text: String::new(),
            }),
            Err(e) => Err(SearchError::CorpusFetch {
                url: url.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

/// Fetch + parse, nothing else
pub struct CorpusLoader<S> {
    source: S,
}

impl<S: CorpusSource> CorpusLoader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub async fn load(&self, url: &str) -> Result<Corpus, SearchError> {
        let body = self.source.fetch(url).await?;
        if !body.is_success() {
            return Err(SearchError::CorpusStatus {
                url: url.to_string(),
                status: body.status,
            });
        }
        Corpus::from_json(&body.text)
    }
}
