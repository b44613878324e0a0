//! Parsing recorded E-utility responses into node trees

mod common;

use entrez_client::EntrezError;
use entrez_client::xml::{Node, parse, parse_lines};
use rstest::rstest;

use common::load_fixture;

#[test]
fn test_esummary_docsums_become_a_sequence() {
    let tree = parse(&load_fixture("esummary_nucleotide.xml")).unwrap();

    let docs = tree.get("eSummaryResult").unwrap().as_sequence().unwrap();
    assert_eq!(docs.len(), 2);

    let first = docs[0].get("DocSum").unwrap();
    assert_eq!(first.keys(), vec!["Id", "Item-group"]);

    let items = first.get("Item-group").unwrap().as_sequence().unwrap();
    assert_eq!(items.len(), 13);
    let caption = items[0].get("Item").unwrap();
    assert_eq!(caption.get("@Name"), Some(&Node::scalar("Caption")));
    assert_eq!(caption.get("@Type"), Some(&Node::scalar("String")));
    assert_eq!(caption.get("#text"), Some(&Node::scalar("U49845")));
}

#[test]
fn test_esearch_history_fields() {
    let tree = parse(&load_fixture("esearch_history.xml")).unwrap();
    let result = tree.get("eSearchResult").unwrap();

    assert_eq!(result.get("Count"), Some(&Node::scalar("2")));
    assert_eq!(result.get("QueryKey"), Some(&Node::scalar("1")));
    assert_eq!(result.get("WebEnv"), Some(&Node::scalar("ABC")));
    assert_eq!(
        result.select("IdList 1 Id").and_then(Node::as_str),
        Some("13383245")
    );
    assert_eq!(result.get("TranslationSet"), Some(&Node::scalar("")));
    assert_eq!(
        result.select("TranslationStack OP").and_then(Node::as_str),
        Some("OR")
    );
}

#[test]
fn test_snp_record_keeps_unescaped_text() {
    let tree = parse(&load_fixture("efetch_snp_3000.xml")).unwrap();
    let record = tree.select("ExchangeSet DocumentSummary").unwrap();

    assert_eq!(record.get("@uid"), Some(&Node::scalar("3000")));
    assert!(
        record
            .get("DOCSUM")
            .and_then(Node::as_str)
            .unwrap()
            .starts_with("HGVS=NC_000008.11:g.19956018A>G")
    );
    assert_eq!(
        record.select("GLOBAL_MAFS 2 MAF STUDY").and_then(Node::as_str),
        Some("GnomAD")
    );
}

#[rstest]
#[case("esearch_history.xml")]
#[case("esummary_nucleotide.xml")]
#[case("efetch_snp_3000.xml")]
fn test_written_xml_parses_to_the_same_tree(#[case] fixture: &str) {
    let tree = parse(&load_fixture(fixture)).unwrap();
    let written = tree.to_xml();

    assert_eq!(parse(&written).unwrap(), tree);
    assert_eq!(parse(&written).unwrap().to_xml(), written);
}

#[test]
fn test_concatenated_pages_become_a_sequence() {
    let page = load_fixture("esearch_history.xml");
    let body = page.lines().skip(2).collect::<Vec<_>>().join("\n");

    let tree = parse_lines([body.as_str(), body.as_str()]).unwrap();
    let pages = tree.as_sequence().unwrap();
    assert_eq!(pages.len(), 2);
    assert!(pages.iter().all(|page| page.get("eSearchResult").is_some()));
}

#[test]
fn test_truncated_response_reports_line() {
    let fixture = load_fixture("esummary_nucleotide.xml");
    let truncated: Vec<&str> = fixture.lines().take(10).collect();

    match parse_lines(truncated) {
        Err(EntrezError::XmlParseError { line, message, .. }) => {
            assert!(line >= 10, "line {line}");
            assert!(message.contains("DocSum"), "{message}");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
