use dept_mapper::config::toml_config::{DiscoveryConfig, HttpConfig};
use dept_mapper::config::MapperConfig;
use dept_mapper::core::discovery::{BoardDiscoverer, DiscoveryTimeouts};
use dept_mapper::domain::model::{DepartmentRef, ReviewReason};
use dept_mapper::{HttpFetcher, SelectorDetector};
use httpmock::prelude::*;
use std::time::Duration;

fn discoverer(config: &MapperConfig) -> BoardDiscoverer<HttpFetcher> {
    BoardDiscoverer::new(
        HttpFetcher::new("dept-mapper-test").unwrap(),
        SelectorDetector::new(config.cms_rules.clone()),
        config.keywords.clone(),
        &config.discovery,
        DiscoveryTimeouts {
            homepage: Duration::from_secs(2),
            sitemap: Duration::from_millis(300),
        },
    )
}

fn dept() -> DepartmentRef {
    DepartmentRef::new("신촌캠퍼스", "경영학과")
}

#[tokio::test]
async fn test_slow_sitemap_falls_back_to_homepage() {
    let server = MockServer::start();
    let home = server.mock(|when, then| {
        when.method(GET).path("/biz/");
        then.status(200).body(
            r#"<a href="/biz/sitemap.do">Site Map</a>
               <a href="/biz/sitemap2.do">SITEMAP</a>
               <a href="/biz/notice/list.do">공지사항</a>"#,
        );
    });
    server.mock(|when, then| {
        when.method(GET).path("/biz/sitemap2.do");
        then.status(200)
            .delay(Duration::from_secs(2))
            .body(r#"<a href="/biz/academic/list.do">학사공지</a>"#);
    });

    let result = discoverer(&MapperConfig::default())
        .discover(&dept(), &server.url("/biz/"))
        .await;

    home.assert();
    assert!(result.manual_review.is_none());
    assert_eq!(result.boards.len(), 1);
    assert_eq!(result.boards[0].id, "notice");
}

#[tokio::test]
async fn test_homepage_error_status_goes_to_review() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/biz/");
        then.status(500);
    });

    let url = server.url("/biz/");
    let result = discoverer(&MapperConfig::default())
        .discover(&dept(), &url)
        .await;

    assert!(result.boards.is_empty());
    let review = result.manual_review.unwrap();
    assert_eq!(review.reason, ReviewReason::HomepageFetchFailed);
    assert_eq!(review.url, url);
}

#[tokio::test]
async fn test_configured_keywords_and_rules_replace_defaults() {
    let toml = r##"
[[campuses]]
url = "https://www.example.ac.kr/campus"
name = "본교"

[[keywords]]
keyword = "세미나"
id = "seminar"
name = "세미나"

[[keywords]]
keyword = "공지"
id = "notice"
name = "공지사항"

[[cms_rules]]
name = "gnuboard"
markup_markers = ["gnuboard"]
row_selector = "#bo_list tbody tr"
title_selector = ".td_subject a"
date_selector = ".td_datetime"
attr_name = "href"
"##;
    let config = MapperConfig::from_toml_str(toml).unwrap();
    assert_eq!(config.http, HttpConfig::default());
    assert_eq!(config.discovery, DiscoveryConfig::default());

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200).body(
            r#"<div id="gnuboard"></div>
               <a href="/bbs/board.php?bo_table=seminar">세미나 공지</a>
               <a href="/bbs/board.php?bo_table=notice">공지</a>
               <a href="/bbs/board.php?bo_table=free">취업</a>"#,
        );
    });

    let result = discoverer(&config).discover(&dept(), &server.url("/")).await;

    let ids: Vec<&str> = result.boards.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, vec!["seminar", "notice"]);
    assert_eq!(result.boards[0].selectors.row_selector, "#bo_list tbody tr");
}
