//! Lazy paging against a mock E-utilities server

mod common;

use entrez_client::{EntrezError, PageWindow, QueryParameters};
use futures_util::{StreamExt, TryStreamExt};
use tracing_test::traced_test;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use common::{create_mock_client, create_mock_client_with_batch, form, load_fixture};

/// One `<Id>` line per record in `[retstart, retstart + retmax)`, capped at `records`
fn id_page(request: &Request, records: u64) -> ResponseTemplate {
    let params = form(request);
    let number = |name: &str| params.get(name).and_then(|v| v.parse::<u64>().ok());
    let start = number("retstart").unwrap_or(0);
    let end = (start + number("retmax").unwrap_or(20)).min(records);

    let body = (start..end)
        .map(|n| format!("<Id>{n}</Id>"))
        .collect::<Vec<_>>()
        .join("\n");
    ResponseTemplate::new(200).set_body_string(body)
}

async fn windows_requested(mock_server: &MockServer) -> Vec<(Option<String>, Option<String>)> {
    mock_server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(form)
        .map(|params| {
            (
                params.get("retstart").map(str::to_string),
                params.get("retmax").map(str::to_string),
            )
        })
        .collect()
}

#[tokio::test]
#[traced_test]
async fn test_single_record_fetch_is_one_call() {
    let mock_server = MockServer::start().await;
    let fixture = load_fixture("efetch_snp_3000.xml");

    Mock::given(method("POST"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(fixture.clone()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let lines: Vec<String> = client
        .paginated_query("fetch", QueryParameters::from([("db", "snp"), ("id", "3000")]))
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    let expected: Vec<&str> = fixture.lines().collect();
    assert_eq!(lines, expected);

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(
        form(&requests[0]),
        QueryParameters::from([("db", "snp"), ("email", "test@example.org"), ("id", "3000")])
    );
}

#[tokio::test]
#[traced_test]
async fn test_retmax_is_split_into_windows() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/esearch.fcgi"))
        .respond_with(|request: &Request| id_page(request, 100))
        .mount(&mock_server)
        .await;

    let client = create_mock_client_with_batch(&mock_server, 3);
    let lines: Vec<String> = client
        .paginated_query(
            "search",
            QueryParameters::from([("db", "pubmed"), ("term", "asthma"), ("retmax", "7")]),
        )
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    let expected: Vec<String> = (0..7).map(|n| format!("<Id>{n}</Id>")).collect();
    assert_eq!(lines, expected);
    assert_eq!(
        windows_requested(&mock_server).await,
        vec![
            (Some("0".to_string()), Some("3".to_string())),
            (Some("3".to_string()), Some("3".to_string())),
            (Some("6".to_string()), Some("1".to_string())),
        ]
    );
}

#[tokio::test]
#[traced_test]
async fn test_short_page_ends_the_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/esummary.fcgi"))
        .respond_with(|request: &Request| id_page(request, 4))
        .mount(&mock_server)
        .await;

    let client = create_mock_client_with_batch(&mock_server, 3);
    let lines: Vec<String> = client
        .paginated_query(
            "summary",
            QueryParameters::from([("db", "nucleotide"), ("WebEnv", "ABC"), ("query_key", "1"), ("retmax", "10")]),
        )
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    assert_eq!(lines.len(), 4);
    assert_eq!(windows_requested(&mock_server).await.len(), 2);
}

#[tokio::test]
#[traced_test]
async fn test_no_call_before_first_line_is_pulled() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/esearch.fcgi"))
        .respond_with(|request: &Request| id_page(request, 100))
        .mount(&mock_server)
        .await;

    let client = create_mock_client_with_batch(&mock_server, 2);
    let mut lines = client
        .paginated_query(
            "search",
            QueryParameters::from([("db", "pubmed"), ("term", "asthma"), ("retmax", "10")]),
        )
        .unwrap();

    assert!(mock_server.received_requests().await.unwrap().is_empty());

    assert_eq!(lines.next().await.unwrap().unwrap(), "<Id>0</Id>");
    assert_eq!(lines.next().await.unwrap().unwrap(), "<Id>1</Id>");
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 1);

    assert_eq!(lines.next().await.unwrap().unwrap(), "<Id>2</Id>");
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
#[traced_test]
async fn test_failing_page_reports_its_window() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/efetch.fcgi"))
        .respond_with(|request: &Request| {
            if form(request).get("retstart") == Some("3") {
                ResponseTemplate::new(500)
            } else {
                id_page(request, 100)
            }
        })
        .mount(&mock_server)
        .await;

    let client = create_mock_client_with_batch(&mock_server, 3);
    let results: Vec<_> = client
        .paginated_query(
            "fetch",
            QueryParameters::from([("db", "protein"), ("WebEnv", "ABC"), ("query_key", "1"), ("retmax", "9")]),
        )
        .unwrap()
        .collect()
        .await;

    assert_eq!(results.len(), 4);
    assert!(results[..3].iter().all(Result::is_ok));
    match &results[3] {
        Err(EntrezError::FetchError { window, .. }) => {
            assert_eq!(*window, Some(PageWindow { start: 3, size: 3 }));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
#[traced_test]
async fn test_search_without_retmax_probes_the_count() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/esearch.fcgi"))
        .respond_with(|request: &Request| {
            if form(request).get("rettype") == Some("count") {
                ResponseTemplate::new(200)
                    .set_body_string("<eSearchResult>\n<Count>5</Count>\n</eSearchResult>")
            } else {
                id_page(request, 5)
            }
        })
        .mount(&mock_server)
        .await;

    let client = create_mock_client_with_batch(&mock_server, 2);
    let lines: Vec<String> = client
        .paginated_query("search", QueryParameters::from([("db", "pubmed"), ("term", "asthma")]))
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    assert_eq!(lines.len(), 5);

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 4);
    let probe = form(&requests[0]);
    assert_eq!(probe.get("rettype"), Some("count"));
    assert!(!probe.contains("retmax"));
    assert_eq!(
        windows_requested(&mock_server).await[1..],
        [
            (Some("0".to_string()), Some("2".to_string())),
            (Some("2".to_string()), Some("2".to_string())),
            (Some("4".to_string()), Some("1".to_string())),
        ]
    );
}

#[tokio::test]
#[traced_test]
async fn test_id_list_is_sliced_per_window() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/efetch.fcgi"))
        .respond_with(|request: &Request| {
            let params = form(request);
            let body = params
                .get("id")
                .unwrap_or_default()
                .split(',')
                .map(|id| format!("<Record>{id}</Record>"))
                .collect::<Vec<_>>()
                .join("\n");
            ResponseTemplate::new(200).set_body_string(body)
        })
        .mount(&mock_server)
        .await;

    let client = create_mock_client_with_batch(&mock_server, 2);
    let lines: Vec<String> = client
        .paginated_query("fetch", QueryParameters::from([("db", "protein"), ("id", "11,12,13,14,15")]))
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    assert_eq!(
        lines,
        ["11", "12", "13", "14", "15"].map(|id| format!("<Record>{id}</Record>"))
    );

    let ids: Vec<String> = mock_server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| form(request).get("id").unwrap_or_default().to_string())
        .collect();
    assert_eq!(ids, ["11,12", "13,14", "15"]);
}

#[tokio::test]
#[traced_test]
async fn test_latin1_bytes_do_not_end_the_download() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"<r>\n<t>caf\xE9</t>\n</r>\n".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let lines: Vec<String> = client
        .paginated_query("fetch", QueryParameters::from([("db", "pubmed"), ("id", "1")]))
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    assert_eq!(lines, ["<r>", "<t>caf\u{FFFD}</t>", "</r>"]);
}

#[tokio::test]
#[traced_test]
async fn test_history_fetch_without_retmax_pages_over_the_selection() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<eSearchResult><Count>5</Count><RetMax>0</RetMax><RetStart>0</RetStart><IdList/></eSearchResult>",
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/efetch.fcgi"))
        .respond_with(|request: &Request| id_page(request, 5))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = create_mock_client_with_batch(&mock_server, 2);
    let lines: Vec<String> = client
        .paginated_query(
            "fetch",
            QueryParameters::from([("db", "protein"), ("WebEnv", "ABC"), ("query_key", "1")]),
        )
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    assert_eq!(lines.len(), 5);

    let requests = mock_server.received_requests().await.unwrap();
    let count = form(&requests[0]);
    assert_eq!(count.get("term"), Some("#1"));
    assert_eq!(count.get("WebEnv"), Some("ABC"));
}
