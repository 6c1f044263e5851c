//! Cursor-based paging over a company's latest filing.
//!
//! One [`PageRequest`] names a ticker, a form type and a cursor. The pager
//! resolves the ticker, fetches the company's filing history, selects the
//! latest filing of that form and returns the single requested chunk of its
//! primary document. The chunked document is computed once per filing and
//! served from the [`FilingCache`] for every further cursor.

use crate::cache::{CacheKey, FilingCache};
use crate::chunk::{ChunkSet, Chunker};
use crate::config::FolioConfig;
use crate::error::{FolioError, Result};
use crate::normalize::DocumentNormalizer;
use crate::response::{PageRequest, PaginationResponse, ToolOutput};
use folio_data::edgar::{
    EdgarClient, FilingDocumentFetcher, FilingIndexFetcher, FilingRecord, FormType,
    TickerResolver, UserAgent, select_latest,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Tracing target for pager operations.
pub const TRACING_TARGET: &str = "folio::pager";

/// A request that passed validation.
#[derive(Debug)]
struct ValidRequest {
    ticker: String,
    form: FormType,
    cursor: usize,
    user_agent: UserAgent,
}

impl ValidRequest {
    /// Checks that need no network access, in a fixed order.
    fn parse(request: &PageRequest) -> Result<Self> {
        let user_agent = UserAgent::parse(&request.user_agent)?;
        let form = request
            .form
            .parse::<FormType>()
            .map_err(|_| FolioError::UnknownForm(request.form.clone()))?;
        let cursor =
            usize::try_from(request.cursor).map_err(|_| FolioError::NegativeCursor(request.cursor))?;
        let ticker = request.company_ticker.trim();
        if ticker.is_empty() {
            return Err(FolioError::EmptyTicker);
        }

        Ok(Self {
            ticker: ticker.to_string(),
            form,
            cursor,
            user_agent,
        })
    }
}

/// Serves chunked filings one cursor at a time.
#[derive(Debug)]
pub struct FilingPager {
    resolver: TickerResolver,
    index: FilingIndexFetcher,
    documents: FilingDocumentFetcher,
    normalizer: DocumentNormalizer,
    chunker: Arc<Chunker>,
    cache: Arc<FilingCache>,
    cache_ttl: Duration,
}

impl FilingPager {
    /// Create a pager talking to SEC over HTTPS.
    ///
    /// # Errors
    /// Returns `FolioError::Config` if the HTTP client or the chunker cannot
    /// be built from `config`.
    pub fn new(config: &FolioConfig) -> Result<Self> {
        let client = config
            .build_client()
            .map_err(|e| FolioError::Config(e.to_string()))?;
        let cache = Arc::new(FilingCache::new(config.cache_ttl));
        Self::from_parts(client, cache, config)
    }

    /// Create a pager from an existing client and cache.
    ///
    /// The cache may be shared between pagers.
    ///
    /// # Errors
    /// Returns `FolioError::Config` for a zero chunk capacity.
    pub fn from_parts(
        client: EdgarClient,
        cache: Arc<FilingCache>,
        config: &FolioConfig,
    ) -> Result<Self> {
        Ok(Self {
            resolver: TickerResolver::with_ttl(client.clone(), config.catalog_ttl),
            index: FilingIndexFetcher::new(client.clone()),
            documents: FilingDocumentFetcher::new(client),
            normalizer: DocumentNormalizer::new(),
            chunker: Arc::new(Chunker::new(config.chunk_capacity)?),
            cache,
            cache_ttl: config.cache_ttl,
        })
    }

    /// The chunk cache.
    pub const fn cache(&self) -> &Arc<FilingCache> {
        &self.cache
    }

    /// The ticker resolver.
    pub const fn resolver(&self) -> &TickerResolver {
        &self.resolver
    }

    /// Serve one cursor request.
    ///
    /// # Errors
    /// - Validation failures (user agent, form, cursor, ticker) before any
    ///   network access
    /// - `TickerNotFound`, `NoFilings`, `FormNotFound` after lookup
    /// - `Upstream` when SEC fails after retries
    /// - `Conversion` when the document yields no text
    /// - `CursorOutOfRange` when the cursor is past the last chunk
    pub async fn page(&self, request: &PageRequest) -> Result<PaginationResponse> {
        let span = tracing::info_span!(
            target: TRACING_TARGET,
            "page",
            ticker = %request.company_ticker,
            form = %request.form,
            cursor = request.cursor,
        );
        self.page_inner(request).instrument(span).await
    }

    async fn page_inner(&self, request: &PageRequest) -> Result<PaginationResponse> {
        let started = Instant::now();
        let valid = ValidRequest::parse(request)?;

        let company = self.resolver.resolve(&valid.ticker, &valid.user_agent).await?;
        let submissions = self.index.fetch(&company.cik, &valid.user_agent).await;
        if submissions.history.is_empty() {
            return Err(FolioError::NoFilings { cik: company.cik });
        }

        let index = select_latest(&submissions.history, valid.form)?;
        let filing = FilingRecord::from_history(&submissions.history, index, &company.cik)?;

        let key = CacheKey::for_filing(&filing);
        let (chunks, lookup) = self
            .cache
            .get_or_try_insert_with(&key, self.cache_ttl, || {
                self.build_chunks(&filing, &valid.user_agent)
            })
            .await?;

        let max_cursor = chunks.max_cursor().unwrap_or_default();
        let chunk = chunks
            .get(valid.cursor)
            .ok_or(FolioError::CursorOutOfRange {
                cursor: valid.cursor,
                max_cursor,
            })?
            .to_string();

        tracing::info!(
            target: TRACING_TARGET,
            cik = %filing.cik,
            accession = %filing.accession,
            cache = ?lookup,
            max_cursor,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Served chunk"
        );

        Ok(PaginationResponse {
            company_cik: filing.cik,
            filing_accession: filing.accession,
            filing_report_date: filing.report_date,
            filing_form: filing.form,
            company_context_1: submissions.core,
            company_context_2: submissions.supplemental,
            filing_filename: filing.primary_document,
            max_cursor,
            cursor: valid.cursor,
            chunk,
        })
    }

    /// Download, normalize and chunk one filing.
    async fn build_chunks(&self, filing: &FilingRecord, user_agent: &UserAgent) -> Result<ChunkSet> {
        let document = self.documents.fetch(filing, user_agent).await?;
        let normalizer = self.normalizer;
        let chunker = Arc::clone(&self.chunker);

        let chunks = tokio::task::spawn_blocking(move || {
            normalizer
                .normalize(&document)
                .map(|text| chunker.split(&text))
        })
        .await
        .map_err(|e| FolioError::Internal(format!("conversion task failed: {}", e)))??;

        if chunks.is_empty() {
            return Err(FolioError::Conversion(
                "document produced no chunks".to_string(),
            ));
        }

        tracing::debug!(
            target: TRACING_TARGET,
            cik = %filing.cik,
            accession = %filing.accession,
            chunks = chunks.len(),
            "Chunked filing"
        );
        Ok(chunks)
    }

    /// Serve one request, returning failures as data.
    pub async fn invoke(&self, request: PageRequest) -> ToolOutput {
        match self.page(&request).await {
            Ok(response) => ToolOutput::Page(response),
            Err(err) => {
                let payload = err.to_payload();
                tracing::warn!(
                    target: TRACING_TARGET,
                    ticker = %request.company_ticker,
                    form = %request.form,
                    cursor = request.cursor,
                    status = payload.status,
                    error = %err,
                    "Request failed"
                );
                ToolOutput::Error(payload)
            }
        }
    }

    /// Read every chunk of the filing, starting at cursor 0.
    ///
    /// The cursor of `request` is ignored.
    ///
    /// # Errors
    /// Fails on the first page that fails.
    pub async fn sweep(&self, request: &PageRequest) -> Result<Vec<PaginationResponse>> {
        let first = self.page(&request.at(0)).await?;
        let max_cursor = first.max_cursor;

        let mut pages = Vec::with_capacity(max_cursor + 1);
        pages.push(first);
        for cursor in 1..=max_cursor {
            let cursor = i64::try_from(cursor)
                .map_err(|_| FolioError::Internal(format!("cursor {} overflows", cursor)))?;
            pages.push(self.page(&request.at(cursor)).await?);
        }
        Ok(pages)
    }
}
