use crate::config::CmsRule;
use crate::domain::model::SelectorBundle;
use scraper::Html;
use url::Url;

/// Fingerprints a page against the configured CMS rules.
///
/// Rules are tried in configured order and the first match wins. A rule matches when the URL
/// path contains one of its `url_markers`, or the lower-cased markup contains one of its
/// `markup_markers`. No bundle is ever assembled from a partial match.
#[derive(Debug, Clone)]
pub struct SelectorDetector {
    rules: Vec<CmsRule>,
}

impl SelectorDetector {
    pub fn new(rules: Vec<CmsRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|mut rule| {
                for marker in &mut rule.markup_markers {
                    *marker = marker.to_lowercase();
                }
                rule
            })
            .collect();
        Self { rules }
    }

    pub fn detect(&self, document: &Html, url: &str) -> Option<SelectorBundle> {
        let markup = document.html().to_lowercase();
        self.detect_in_markup(&markup, url)
    }

    /// Same as [`detect`](Self::detect) for callers that already serialized the page once.
    /// `lowered_markup` must be lower-cased.
    pub fn detect_in_markup(&self, lowered_markup: &str, url: &str) -> Option<SelectorBundle> {
        self.matching_rule(lowered_markup, url)
            .map(|rule| rule.selectors.clone())
    }

    pub fn matching_rule(&self, lowered_markup: &str, url: &str) -> Option<&CmsRule> {
        let path = url_path(url);
        self.rules.iter().find(|rule| {
            rule.url_markers.iter().any(|m| path.contains(m.as_str()))
                || rule
                    .markup_markers
                    .iter()
                    .any(|m| lowered_markup.contains(m.as_str()))
        })
    }
}

// 無法解析的 URL 直接以原字串比對
fn url_path(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::default_cms_rules;

    fn detector() -> SelectorDetector {
        SelectorDetector::new(default_cms_rules())
    }

    #[test]
    fn test_do_path_selects_primary_cms() {
        let doc = Html::parse_document("<html><body><p>plain</p></body></html>");
        let bundle = detector()
            .detect(&doc, "https://econ.yonsei.ac.kr/econ/board/list.do?id=1")
            .unwrap();
        assert_eq!(bundle.row_selector, "tr:has(a.c-board-title)");
        assert_eq!(bundle.title_selector, "a.c-board-title");
        assert_eq!(bundle.date_selector, "td:nth-last-child(1)");
        assert_eq!(bundle.attr_name, "href");
    }

    #[test]
    fn test_do_in_host_does_not_match() {
        let doc = Html::parse_document("<html><body></body></html>");
        assert!(detector().detect(&doc, "https://www.donga.ac.kr/notice").is_none());
    }

    #[test]
    fn test_board_title_class_selects_primary_cms() {
        let doc = Html::parse_document(
            r#"<table><tr><td><a class="C-Board-Title" href="/n/1">공지</a></td></tr></table>"#,
        );
        let bundle = detector().detect(&doc, "https://x.yonsei.ac.kr/notice").unwrap();
        assert_eq!(bundle.title_selector, "a.c-board-title");
    }

    #[test]
    fn test_xe_markup_selects_secondary_cms() {
        let doc = Html::parse_document(
            r#"<ul class="xe-list-board-list"><li class="xe-list-board-list--item"></li></ul>"#,
        );
        let bundle = detector().detect(&doc, "https://x.yonsei.ac.kr/notice").unwrap();
        assert_eq!(
            bundle.row_selector,
            "li.xe-list-board-list--item:not(.xe-list-board-list--header)"
        );
        assert_eq!(bundle.date_selector, ".xe-list-board-list__created_at");
    }

    #[test]
    fn test_primary_rule_wins_when_both_match() {
        let markup = r#"<div class="xe_board"><a class="c-board-title">x</a></div>"#.to_lowercase();
        let detector = detector();
        let rule = detector
            .matching_rule(&markup, "https://x.yonsei.ac.kr/")
            .unwrap();
        assert_eq!(rule.name, "yonsei");
    }

    #[test]
    fn test_unknown_layout() {
        let doc = Html::parse_document(r#"<div class="board"><a href="/a">공지</a></div>"#);
        assert!(detector().detect(&doc, "https://x.yonsei.ac.kr/board").is_none());
    }
}
