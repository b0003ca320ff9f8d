//! Reference tables: the blacklist and the category map.
//!
//! Both are flat CSV published at a fixed location (a spreadsheet export URL
//! or a local file). They are read once per run and turned into immutable
//! rule sets; nothing here mutates them afterwards.

mod blacklist;
mod categories;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use leadsift_shared::{LeadSiftError, Result};
use leadsift_table::{LoadOptions, load_str, read_text};
use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

pub use blacklist::{Blacklist, DOMAIN_COLUMN, EXACT_EMAIL_COLUMN, REDACT_COLUMN};
pub use categories::CategoryMap;

/// Maximum number of redirects to follow (spreadsheet exports redirect once or twice).
const MAX_REDIRECTS: usize = 5;

/// Default timeout in seconds for fetching a remote table.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum response size we consider valid (10 MB).
const MAX_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;

/// User-Agent string for reference requests.
const USER_AGENT: &str = concat!("LeadSift/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// ReferenceSource
// ---------------------------------------------------------------------------

/// Where a reference table lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceSource {
    /// Fetched over HTTP(S).
    Remote(Url),
    /// Read from disk.
    Local(PathBuf),
}

impl FromStr for ReferenceSource {
    type Err = LeadSiftError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(LeadSiftError::config("empty reference source"));
        }
        if s.starts_with("http://") || s.starts_with("https://") {
            let url = Url::parse(s)
                .map_err(|e| LeadSiftError::config(format!("invalid reference URL '{s}': {e}")))?;
            Ok(Self::Remote(url))
        } else {
            Ok(Self::Local(PathBuf::from(s)))
        }
    }
}

impl fmt::Display for ReferenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(url) => write!(f, "{url}"),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

// ---------------------------------------------------------------------------
// Fetch options
// ---------------------------------------------------------------------------

/// Configuration for reference retrieval.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Timeout for HTTP requests in seconds.
    pub timeout_secs: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// ReferenceTables
// ---------------------------------------------------------------------------

/// Everything the cleaning pipeline needs from outside the input file.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub blacklist: Blacklist,
    /// Empty when no category source was requested.
    pub categories: CategoryMap,
}

/// Load the blacklist and, when given, the category map (concurrently).
#[instrument(skip_all, fields(blacklist = %blacklist))]
pub async fn load_reference_tables(
    blacklist: &ReferenceSource,
    categories: Option<&ReferenceSource>,
    opts: &FetchOptions,
) -> Result<ReferenceTables> {
    let client = build_client(opts)?;

    let (blacklist, categories) = tokio::join!(
        load_blacklist_with(&client, blacklist),
        async {
            match categories {
                Some(source) => load_categories_with(&client, source).await,
                None => Ok(CategoryMap::default()),
            }
        },
    );

    let tables = ReferenceTables {
        blacklist: blacklist?,
        categories: categories?,
    };

    info!(
        exact_emails = tables.blacklist.exact_emails().len(),
        excluded_domains = tables.blacklist.excluded_domains().len(),
        redact_substrings = tables.blacklist.redact_substrings().len(),
        groups = tables.categories.len(),
        "reference tables loaded"
    );
    Ok(tables)
}

/// Load and derive the blacklist from `source`.
pub async fn load_blacklist(source: &ReferenceSource, opts: &FetchOptions) -> Result<Blacklist> {
    let client = build_client(opts)?;
    load_blacklist_with(&client, source).await
}

/// Load and derive the category map from `source`.
pub async fn load_categories(source: &ReferenceSource, opts: &FetchOptions) -> Result<CategoryMap> {
    let client = build_client(opts)?;
    load_categories_with(&client, source).await
}

async fn load_blacklist_with(client: &Client, source: &ReferenceSource) -> Result<Blacklist> {
    let text = fetch_text(client, source).await?;
    let loaded = load_str(&text, &LoadOptions::default().with_trim_cells(true))
        .map_err(|e| LeadSiftError::reference(format!("blacklist {source}: {e}")))?;
    Blacklist::from_table(&loaded.table)
}

async fn load_categories_with(client: &Client, source: &ReferenceSource) -> Result<CategoryMap> {
    let text = fetch_text(client, source).await?;
    let loaded = load_str(&text, &LoadOptions::default().with_trim_cells(true))
        .map_err(|e| LeadSiftError::reference(format!("categories {source}: {e}")))?;
    CategoryMap::from_table(&loaded.table)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a reqwest client with appropriate settings.
fn build_client(opts: &FetchOptions) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(std::time::Duration::from_secs(opts.timeout_secs))
        .build()
        .map_err(|e| LeadSiftError::reference(format!("failed to build HTTP client: {e}")))
}

/// Read the raw text of a reference table.
async fn fetch_text(client: &Client, source: &ReferenceSource) -> Result<String> {
    match source {
        ReferenceSource::Local(path) => {
            debug!(path = %path.display(), "reading reference table");
            read_text(path).map_err(|e| LeadSiftError::reference(format!("{source}: {e}")))
        }
        ReferenceSource::Remote(url) => fetch_remote(client, url).await,
    }
}

async fn fetch_remote(client: &Client, url: &Url) -> Result<String> {
    debug!(%url, "fetching reference table");
    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| LeadSiftError::reference(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(LeadSiftError::reference(format!("{url}: HTTP {status}")));
    }

    if let Some(len) = response.content_length() {
        if len > MAX_RESPONSE_SIZE {
            return Err(LeadSiftError::reference(format!(
                "{url}: response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
            )));
        }
    }

    response
        .text()
        .await
        .map_err(|e| LeadSiftError::reference(format!("{url}: failed to read body: {e}")))
}
