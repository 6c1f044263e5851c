//! Integration tests for the filing pager against a mocked EDGAR

use folio::data::edgar::RetryPolicy;
use folio::data::mock::{MockReply, MockTransport};
use folio::{
    CacheKey, ChunkSet, DocumentNormalizer, FilingCache, FilingPager, FolioConfig, FolioError,
    ManualClock, PageRequest, ToolOutput,
};
use folio_data::edgar::{ContentHint, RawDocument};
use rstest::rstest;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const UA: &str = "Jane Doe jane@example.com";
const CATALOG_URL: &str = "https://www.sec.gov/files/company_tickers.json";
const SUBMISSIONS_URL: &str = "https://data.sec.gov/submissions/CIK0000789019.json";
const DOC_URL: &str =
    "https://www.sec.gov/Archives/edgar/data/789019/000095017024087843/msft-20240630.htm";
const CAPACITY: usize = 100;
const TTL: Duration = Duration::from_secs(900);

fn paragraph(i: usize) -> String {
    format!("Section {} {}", i, "lorem ipsum dolor sit amet ".repeat(3).trim())
}

/// Three paragraphs that each fit in one chunk but no two of which do.
fn filing_html() -> String {
    let body: String = (0..3).map(|i| format!("<p>{}</p>", paragraph(i))).collect();
    format!(
        "<html><head><title>msft-20240630</title><style>p {{ margin: 0 }}</style></head>\
         <body>{}</body></html>",
        body
    )
}

fn catalog() -> serde_json::Value {
    json!({
        "0": {"cik_str": 789019, "ticker": "MSFT", "title": "MICROSOFT CORP"},
        "1": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."}
    })
}

fn submissions() -> serde_json::Value {
    json!({
        "cik": "789019",
        "name": "MICROSOFT CORP",
        "tickers": ["MSFT"],
        "exchanges": ["Nasdaq"],
        "sicDescription": "Services-Prepackaged Software",
        "fiscalYearEnd": "0630",
        "stateOfIncorporation": "WA",
        "category": "Large accelerated filer",
        "filings": {
            "recent": {
                "accessionNumber": ["0000950170-24-100000", "0000950170-24-087843", "0000950170-24-048288"],
                "reportDate": ["", "2024-06-30", "2024-03-31"],
                "form": ["SC 13G", "10-K", "10-Q"],
                "primaryDocument": ["xslSC13G/doc.xml", "msft-20240630.htm", "msft-20240331.htm"]
            },
            "files": []
        }
    })
}

fn mock() -> MockTransport {
    MockTransport::new()
        .with_json(CATALOG_URL, catalog())
        .with_json(SUBMISSIONS_URL, submissions())
        .with_body(DOC_URL, filing_html().into_bytes())
}

fn config() -> FolioConfig {
    FolioConfig::default()
        .with_chunk_capacity(CAPACITY)
        .with_rate_limit(Duration::ZERO)
        .with_cache_ttl(TTL)
        .with_retry(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        })
}

fn pager_with_cache(mock: &Arc<MockTransport>, cache: Arc<FilingCache>) -> FilingPager {
    let config = config();
    let client = config.client_with_transport(mock.clone());
    FilingPager::from_parts(client, cache, &config).unwrap()
}

fn pager(mock: &Arc<MockTransport>) -> FilingPager {
    pager_with_cache(mock, Arc::new(FilingCache::new(TTL)))
}

fn request(ticker: &str, form: &str, cursor: i64) -> PageRequest {
    PageRequest::new(ticker, form, cursor, UA)
}

#[tokio::test]
async fn test_first_page_of_latest_annual_report() {
    let mock = Arc::new(mock());
    let pager = pager(&mock);

    let page = pager.page(&request("MSFT", "10-K", 0)).await.unwrap();
    assert_eq!(page.max_cursor, 2);
    assert_eq!(page.chunk, paragraph(0));
    assert_eq!(page.company_cik, "0000789019");
    assert_eq!(page.filing_accession, "000095017024087843");
    assert_eq!(page.filing_report_date, "2024-06-30");
    assert_eq!(page.filing_filename, "msft-20240630.htm");
    assert_eq!(page.company_context_1["name"], json!("MICROSOFT CORP"));
    assert_eq!(page.company_context_1["website"], json!("N/A"));
    assert_eq!(page.company_context_2["stateOfIncorporation"], json!("WA"));

    let value = serde_json::to_value(&page).unwrap();
    assert_eq!(value["filing_chunk_0"], json!(paragraph(0)));
    assert_eq!(value["filing_form"], json!("10-K"));
    assert_eq!(value["max_cursor"], json!(2));
}

#[tokio::test]
async fn test_cursor_bounds() {
    let mock = Arc::new(mock());
    let pager = pager(&mock);

    for cursor in 0..=2 {
        let page = pager.page(&request("MSFT", "10-K", cursor)).await.unwrap();
        assert_eq!(page.chunk, paragraph(cursor as usize));
    }

    let err = pager.page(&request("MSFT", "10-K", 3)).await.unwrap_err();
    assert!(matches!(
        err,
        FolioError::CursorOutOfRange {
            cursor: 3,
            max_cursor: 2
        }
    ));
    assert_eq!(err.status(), 400);

    let err = pager.page(&request("MSFT", "10-K", -1)).await.unwrap_err();
    assert_eq!(err.status(), 400);

    assert_eq!(mock.request_count(DOC_URL), 1);
}

#[tokio::test]
async fn test_unknown_ticker_payload() {
    let mock = Arc::new(mock());
    let output = pager(&mock).invoke(request("ZZZZ", "10-K", 0)).await;

    assert_eq!(output.status(), 404);
    assert_eq!(
        serde_json::to_value(&output).unwrap(),
        json!({"error": "Ticker not found", "ticker": "ZZZZ", "status": 404})
    );
    assert_eq!(mock.request_count(SUBMISSIONS_URL), 0);
}

#[rstest]
#[case("MyApp/1.0")]
#[case("Jane\nDoe jane@example.com")]
#[tokio::test]
async fn test_invalid_user_agent_never_reaches_network(#[case] user_agent: &str) {
    let mock = Arc::new(mock());
    let output = pager(&mock)
        .invoke(PageRequest::new("MSFT", "10-K", 0, user_agent))
        .await;

    assert_eq!(output.status(), 400);
    assert_eq!(mock.total_requests(), 0);
}

#[tokio::test]
async fn test_form_absent_from_history() {
    let mock = Arc::new(mock());
    let output = pager(&mock).invoke(request("MSFT", "13G", 0)).await;

    let ToolOutput::Error(payload) = output else {
        panic!("expected an error payload");
    };
    assert_eq!(payload.status, 404);
    assert_eq!(payload.error, "No filing found for form 13G");
    assert_eq!(payload.context["form"], json!("13G"));
    assert_eq!(mock.request_count(DOC_URL), 0);
}

#[tokio::test]
async fn test_unknown_form_is_validation_error() {
    let mock = Arc::new(mock());
    let output = pager(&mock).invoke(request("MSFT", "10-k", 0)).await;

    assert_eq!(output.status(), 400);
    assert_eq!(mock.total_requests(), 0);
}

#[tokio::test]
async fn test_ticker_is_case_insensitive() {
    let mock = Arc::new(mock());
    let pager = pager(&mock);

    let upper = pager.page(&request("MSFT", "10-K", 1)).await.unwrap();
    let lower = pager.page(&request(" msft ", "10-K", 1)).await.unwrap();
    assert_eq!(upper, lower);
}

#[tokio::test]
async fn test_user_agent_sent_on_every_request() {
    let mock = Arc::new(mock());
    pager(&mock).page(&request("MSFT", "10-K", 0)).await.unwrap();

    let requests = mock.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|r| r.user_agent == UA));
}

#[tokio::test]
async fn test_cache_expires_after_ttl() {
    let mock = Arc::new(mock());
    let clock = Arc::new(ManualClock::default());
    let cache = Arc::new(FilingCache::with_clock(TTL, clock.clone()));
    let pager = pager_with_cache(&mock, cache);

    pager.page(&request("MSFT", "10-K", 0)).await.unwrap();
    pager.page(&request("MSFT", "10-K", 1)).await.unwrap();
    assert_eq!(mock.request_count(DOC_URL), 1);

    clock.advance(TTL - Duration::from_secs(1));
    pager.page(&request("MSFT", "10-K", 2)).await.unwrap();
    assert_eq!(mock.request_count(DOC_URL), 1);

    clock.advance(Duration::from_secs(1));
    pager.page(&request("MSFT", "10-K", 0)).await.unwrap();
    assert_eq!(mock.request_count(DOC_URL), 2);
}

#[tokio::test]
async fn test_concurrent_requests_download_once() {
    let mock = Arc::new(mock().with_delay(Duration::from_millis(20)));
    let pager = Arc::new(pager(&mock));

    let requests: Vec<_> = (0..9).map(|i| request("MSFT", "10-K", i % 3)).collect();
    let pages = futures::future::join_all(requests.iter().map(|r| pager.page(r))).await;

    for (i, page) in pages.into_iter().enumerate() {
        assert_eq!(page.unwrap().chunk, paragraph(i % 3));
    }
    assert_eq!(mock.request_count(DOC_URL), 1);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let mock = Arc::new(mock().with_status(DOC_URL, 404));
    let pager = pager(&mock);

    let err = pager.page(&request("MSFT", "10-K", 0)).await.unwrap_err();
    assert_eq!(err.status(), 502);
    assert_eq!(mock.request_count(DOC_URL), 1);
    assert!(pager.cache().is_empty().await);
}

#[tokio::test]
async fn test_server_error_retried_up_to_limit() {
    let mock = Arc::new(mock().with_status(DOC_URL, 503));
    let pager = pager(&mock);

    let err = pager.page(&request("MSFT", "10-K", 0)).await.unwrap_err();
    assert_eq!(err.status(), 502);
    assert_eq!(mock.request_count(DOC_URL), 3);
    assert!(pager.cache().is_empty().await);
}

#[tokio::test]
async fn test_transient_failure_recovers() {
    let mock = Arc::new(mock().with_sequence(
        DOC_URL,
        vec![
            MockReply::status(503),
            MockReply::Timeout,
            MockReply::body(200, filing_html().into_bytes()),
        ],
    ));
    let page = pager(&mock).page(&request("MSFT", "10-K", 0)).await.unwrap();

    assert_eq!(page.chunk, paragraph(0));
    assert_eq!(mock.request_count(DOC_URL), 3);
}

#[tokio::test]
async fn test_timeouts_map_to_gateway_timeout() {
    let mock = Arc::new(mock().with_sequence(DOC_URL, vec![MockReply::Timeout]));
    let output = pager(&mock).invoke(request("MSFT", "10-K", 0)).await;

    assert_eq!(output.status(), 504);
    assert_eq!(mock.request_count(DOC_URL), 3);
}

#[tokio::test]
async fn test_failed_build_is_retried_on_next_request() {
    let mock = Arc::new(mock().with_status(DOC_URL, 404));
    let pager = pager(&mock);

    assert!(pager.page(&request("MSFT", "10-K", 0)).await.is_err());
    mock.set_replies(DOC_URL, vec![MockReply::body(200, filing_html().into_bytes())]);

    let page = pager.page(&request("MSFT", "10-K", 0)).await.unwrap();
    assert_eq!(page.max_cursor, 2);
    assert_eq!(pager.cache().len().await, 1);
}

#[tokio::test]
async fn test_expired_and_failed_filings_are_released() {
    let mock = Arc::new(mock());
    let clock = Arc::new(ManualClock::default());
    let cache = Arc::new(FilingCache::with_clock(TTL, clock.clone()));
    let pager = pager_with_cache(&mock, cache.clone());

    pager.page(&request("MSFT", "10-K", 0)).await.unwrap();
    assert!(pager.page(&request("MSFT", "10-Q", 0)).await.is_err());
    assert_eq!(cache.len().await, 1);
    assert_eq!(cache.slot_count(), 1);

    let stale = CacheKey::new("0000320193", "10-K", "000032019324000123");
    cache.put(&stale, ChunkSet::from(vec!["Apple".to_string()]), None).await;
    clock.advance(TTL);

    pager.page(&request("MSFT", "10-K", 1)).await.unwrap();
    assert!(cache.get(&stale).await.is_none());
    assert_eq!(cache.len().await, 1);
    assert_eq!(cache.slot_count(), 1);
}

#[tokio::test]
async fn test_script_and_stray_brackets_keep_text() {
    let mock = Arc::new(mock().with_body(
        DOC_URL,
        b"<html><body><script>for(i=0;i<n;i++){}</script>\
          <p>Operating margin < 5%</p></body></html>"
            .to_vec(),
    ));
    let page = pager(&mock).page(&request("MSFT", "10-K", 0)).await.unwrap();

    assert_eq!(page.max_cursor, 0);
    assert_eq!(page.chunk, "Operating margin < 5%");
}

#[tokio::test]
async fn test_missing_history_is_not_found() {
    let mock = Arc::new(mock().with_status(SUBMISSIONS_URL, 500));
    let err = pager(&mock)
        .page(&request("MSFT", "10-K", 0))
        .await
        .unwrap_err();

    assert!(matches!(err, FolioError::NoFilings { .. }));
    assert_eq!(err.status(), 404);
    assert_eq!(mock.request_count(DOC_URL), 0);
}

#[tokio::test]
async fn test_document_without_text_is_conversion_error() {
    let mock = Arc::new(mock().with_body(
        DOC_URL,
        b"<html><head><script>track()</script></head><body></body></html>".to_vec(),
    ));
    let pager = pager(&mock);

    let output = pager.invoke(request("MSFT", "10-K", 0)).await;
    assert_eq!(output.status(), 500);
    assert!(pager.cache().is_empty().await);
}

#[tokio::test]
async fn test_sweep_reconstructs_document() {
    let mock = Arc::new(mock());
    let pages = pager(&mock)
        .sweep(&request("MSFT", "10-K", 7))
        .await
        .unwrap();

    assert_eq!(pages.len(), 3);
    assert!(pages.iter().enumerate().all(|(i, p)| p.cursor == i));

    let normalized = DocumentNormalizer::new()
        .normalize(&RawDocument {
            bytes: filing_html().into_bytes(),
            hint: ContentHint::Html,
        })
        .unwrap();
    let squash = |s: &str| s.split_whitespace().collect::<String>();
    let joined: String = pages.iter().map(|p| p.chunk.as_str()).collect();
    assert_eq!(squash(&joined), squash(normalized.as_str()));
    assert_eq!(mock.request_count(DOC_URL), 1);
}
