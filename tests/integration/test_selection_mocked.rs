//! History server selections against a mock E-utilities server

mod common;

use entrez_client::xml::{self, Node};
use entrez_client::{EntrezError, QueryParameters, Selection, Tool};
use futures_util::TryStreamExt;
use tracing_test::traced_test;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use common::{create_mock_client, form, load_fixture};

const STORED_IDS: [&str; 3] = ["11", "12", "13"];

const EPOST: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n\
<ePostResult>\n\
\t<QueryKey>1</QueryKey>\n\
\t<WebEnv>XYZ</WebEnv>\n\
</ePostResult>";

/// `efetch` that resolves either an id list or the stored selection
fn protein_records(request: &Request) -> ResponseTemplate {
    let params = form(request);
    let ids: Vec<&str> = match params.get("id") {
        Some(ids) => ids.split(',').collect(),
        None => {
            let number = |name: &str| params.get(name).and_then(|v| v.parse::<usize>().ok());
            let start = number("retstart").unwrap_or(0);
            let end = (start + number("retmax").unwrap_or(20)).min(STORED_IDS.len());
            STORED_IDS[start..end].to_vec()
        }
    };
    let body = ids
        .iter()
        .map(|id| format!("<Protein id=\"{id}\"/>"))
        .collect::<Vec<_>>()
        .join("\n");
    ResponseTemplate::new(200).set_body_string(body)
}

#[tokio::test]
#[traced_test]
async fn test_summary_on_search_results() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("esearch_history.xml")))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/esummary.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("esummary_nucleotide.xml")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let lines = client
        .on_search(
            "U49845[accn] OR AF339445[accn]",
            "nucleotide",
            "summary",
            QueryParameters::new(),
            None,
        )
        .await
        .unwrap();
    let tree = xml::collect_lines(lines).await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let search = form(&requests[0]);
    assert_eq!(search.get("usehistory"), Some("y"));
    assert_eq!(search.get("term"), Some("U49845[accn] OR AF339445[accn]"));

    let summary = form(&requests[1]);
    assert_eq!(summary.get("db"), Some("nucleotide"));
    assert_eq!(summary.get("WebEnv"), Some("ABC"));
    assert_eq!(summary.get("query_key"), Some("1"));
    assert_eq!(summary.get("retstart"), Some("0"));
    assert_eq!(summary.get("retmax"), Some("2"));

    let docs = tree.get("eSummaryResult").unwrap().as_sequence().unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(tree.select("eSummaryResult 0 DocSum Id"), Some(&Node::scalar("1293613")));
    assert_eq!(tree.select("eSummaryResult 1 DocSum Id"), Some(&Node::scalar("13383245")));
}

#[tokio::test]
#[traced_test]
async fn test_fetch_over_posted_ids_matches_direct_fetch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/epost.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EPOST))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/efetch.fcgi"))
        .respond_with(protein_records)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let ids = STORED_IDS.join(",");

    let selection = client
        .select("post", "protein", QueryParameters::from([("id", ids.as_str())]))
        .await
        .unwrap();
    assert_eq!(
        selection,
        Selection {
            webenv: "XYZ".to_string(),
            query_key: 1,
            db: "protein".to_string(),
            count: 3,
        }
    );

    let via_history: Vec<String> = client
        .apply("fetch", &selection, QueryParameters::from([("rettype", "fasta")]), None)
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    let direct: Vec<String> = client
        .paginated_query(
            "fetch",
            QueryParameters::from([("db", "protein"), ("id", ids.as_str()), ("rettype", "fasta")]),
        )
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    assert_eq!(via_history.len(), 3);
    assert_eq!(via_history, direct);

    let requests = mock_server.received_requests().await.unwrap();
    let history_fetch = form(&requests[1]);
    assert!(!history_fetch.contains("id"));
    assert_eq!(history_fetch.get("WebEnv"), Some("XYZ"));
}

#[tokio::test]
#[traced_test]
async fn test_retmax_limits_applied_tool() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/efetch.fcgi"))
        .respond_with(protein_records)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let selection = Selection {
        webenv: "XYZ".to_string(),
        query_key: 1,
        db: "protein".to_string(),
        count: 3,
    };

    let lines: Vec<String> = client
        .apply("fetch", &selection, QueryParameters::new(), Some(2))
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    assert_eq!(lines, ["<Protein id=\"11\"/>", "<Protein id=\"12\"/>"]);
}

#[tokio::test]
#[traced_test]
async fn test_server_error_message_is_not_a_selection() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<eSearchResult>\n<ERROR>Invalid query: [[[</ERROR>\n</eSearchResult>",
        ))
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let err = client
        .select("search", "pubmed", QueryParameters::from([("term", "[[[")]))
        .await
        .unwrap_err();

    match err {
        EntrezError::SelectionParseError { tool, reason } => {
            assert_eq!(tool, Tool::Search);
            assert!(reason.contains("Invalid query"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
#[traced_test]
async fn test_incompatible_tool_fails_before_any_call() {
    let mock_server = MockServer::start().await;
    let client = create_mock_client(&mock_server);

    let err = client
        .on_search("asthma", "pubmed", "spell", QueryParameters::new(), None)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, EntrezError::IncompatibleTool { tool: Tool::Spell, .. }));

    let err = client
        .select("summary", "pubmed", QueryParameters::from([("id", "1")]))
        .await
        .unwrap_err();
    assert!(matches!(err, EntrezError::IncompatibleTool { tool: Tool::Summary, .. }));

    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
#[traced_test]
async fn test_selection_is_tied_to_its_database() {
    let mock_server = MockServer::start().await;
    let client = create_mock_client(&mock_server);
    let selection = Selection {
        webenv: "XYZ".to_string(),
        query_key: 1,
        db: "protein".to_string(),
        count: 3,
    };

    let err = client
        .apply("summary", &selection, QueryParameters::from([("db", "nucleotide")]), None)
        .err()
        .unwrap();

    match err {
        EntrezError::DatabaseMismatch {
            selection_db,
            requested_db,
        } => {
            assert_eq!(selection_db, "protein");
            assert_eq!(requested_db, "nucleotide");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}
