use crate::config::toml_config::{DiscoveryConfig, HttpConfig};
use crate::config::KeywordRule;
use crate::core::hierarchy::element_text;
use crate::core::selectors::SelectorDetector;
use crate::domain::model::{Board, DepartmentRef, DiscoveryResult, ReviewReason, SelectorBundle};
use crate::domain::ports::PageFetcher;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

static LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("link selector is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryTimeouts {
    pub homepage: Duration,
    pub sitemap: Duration,
}

impl From<&HttpConfig> for DiscoveryTimeouts {
    fn from(http: &HttpConfig) -> Self {
        Self {
            homepage: http.homepage_timeout(),
            sitemap: http.sitemap_timeout(),
        }
    }
}

/// Finds notice boards on a department homepage.
///
/// A sitemap page linked from the homepage is searched first; the homepage itself is only
/// scanned when there is no sitemap, it cannot be fetched, or it yields no boards.
pub struct BoardDiscoverer<F: PageFetcher> {
    fetcher: F,
    detector: SelectorDetector,
    keywords: Vec<KeywordRule>,
    sitemap_markers: Vec<String>,
    href_blacklist: Vec<String>,
    max_link_text_chars: usize,
    timeouts: DiscoveryTimeouts,
}

impl<F: PageFetcher> BoardDiscoverer<F> {
    pub fn new(
        fetcher: F,
        detector: SelectorDetector,
        keywords: Vec<KeywordRule>,
        config: &DiscoveryConfig,
        timeouts: DiscoveryTimeouts,
    ) -> Self {
        Self {
            fetcher,
            detector,
            keywords,
            sitemap_markers: config
                .sitemap_markers
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
            href_blacklist: config.href_blacklist.clone(),
            max_link_text_chars: config.max_link_text_chars,
            timeouts,
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn detector(&self) -> &SelectorDetector {
        &self.detector
    }

    pub async fn discover(&self, department: &DepartmentRef, homepage: &str) -> DiscoveryResult {
        if !is_web_url(homepage) {
            tracing::info!("Invalid homepage URL for {}: {}", department.name, homepage);
            return DiscoveryResult::review(
                department.review(homepage, ReviewReason::InvalidHomepageUrl),
            );
        }

        let page = match self.fetcher.fetch(homepage, self.timeouts.homepage).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("❌ Failed to fetch homepage of {}: {}", department.name, e);
                return DiscoveryResult::review(
                    department.review(homepage, ReviewReason::HomepageFetchFailed),
                );
            }
        };
        tracing::debug!("Accessed: {}", homepage);

        // Html 不跨越 await
        let (defaults, sitemap_url) = {
            let document = Html::parse_document(&page.body);
            (
                self.detector.detect(&document, homepage),
                self.find_sitemap_link(&document, homepage),
            )
        };

        if let Some(sitemap_url) = sitemap_url {
            match self.fetcher.fetch(&sitemap_url, self.timeouts.sitemap).await {
                Ok(sitemap) => {
                    tracing::info!("Found sitemap: {}", sitemap_url);
                    let document = Html::parse_document(&sitemap.body);
                    // 網站地圖的連結仍以學系首頁為基準，跨站連結一律排除
                    let boards = self.extract_boards(&document, homepage, defaults.as_ref());
                    if !boards.is_empty() {
                        return DiscoveryResult::with_boards(boards).with_layout(defaults);
                    }
                    tracing::info!("Sitemap yielded no results, falling back to homepage");
                }
                Err(e) => {
                    tracing::debug!("Sitemap fetch failed, falling back to homepage: {}", e);
                }
            }
        }

        let boards = {
            let document = Html::parse_document(&page.body);
            self.extract_boards(&document, homepage, defaults.as_ref())
        };
        DiscoveryResult::with_boards(boards).with_layout(defaults)
    }

    /// First anchor whose text carries a sitemap marker, resolved against `base_url`.
    pub fn find_sitemap_link(&self, document: &Html, base_url: &str) -> Option<String> {
        let base = Url::parse(base_url).ok()?;

        document.select(&LINKS).find_map(|link| {
            let text = element_text(link).to_lowercase();
            if !self.sitemap_markers.iter().any(|m| text.contains(m.as_str())) {
                return None;
            }
            let href = link.value().attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            let url = base.join(href).ok()?;
            matches!(url.scheme(), "http" | "https").then(|| url.to_string())
        })
    }

    /// Scans every link of `document` for board listings.
    ///
    /// Ids are disambiguated per call: the first board of a category keeps the bare category
    /// id, later ones get `_2`, `_3`, ... in document order.
    pub fn extract_boards(
        &self,
        document: &Html,
        base_url: &str,
        defaults: Option<&SelectorBundle>,
    ) -> Vec<Board> {
        let base = match Url::parse(base_url) {
            Ok(base) => base,
            Err(e) => {
                tracing::warn!("Cannot resolve links against {}: {}", base_url, e);
                return Vec::new();
            }
        };
        let markup = document.html().to_lowercase();
        let mut collector = BoardCollector::default();

        for link in document.select(&LINKS) {
            let Some(href) = link.value().attr("href").map(str::trim) else {
                continue;
            };
            if href.is_empty() {
                continue;
            }

            let text = element_text(link);
            if !self.is_listing_link(&text, href) {
                continue;
            }

            let Ok(resolved) = base.join(href) else {
                continue;
            };
            let full_url = resolved.to_string();
            if collector.has_seen(&full_url)
                || href.to_ascii_lowercase().contains("javascript")
                || href.contains('#')
            {
                continue;
            }
            if !same_host(&base, &resolved) {
                continue;
            }

            let Some(rule) = self.classify(&text) else {
                continue;
            };

            let selectors = match self
                .detector
                .detect_in_markup(&markup, &full_url)
                .or_else(|| defaults.cloned())
            {
                Some(selectors) => selectors,
                None => {
                    tracing::debug!("No known CMS for {}, skipping", full_url);
                    continue;
                }
            };

            let id = collector.next_id(&rule.id);
            let name = if text.is_empty() {
                rule.name.clone()
            } else {
                text
            };
            collector.push(Board {
                id,
                name,
                url: full_url,
                selectors,
            });
        }

        collector.into_boards()
    }

    // 文章內頁或過長的文字（公告標題）不是看板入口
    fn is_listing_link(&self, text: &str, href: &str) -> bool {
        if self.href_blacklist.iter().any(|b| href.contains(b.as_str())) {
            return false;
        }
        text.chars().count() <= self.max_link_text_chars
    }

    fn classify(&self, text: &str) -> Option<&KeywordRule> {
        self.keywords
            .iter()
            .find(|rule| text.contains(rule.keyword.as_str()))
    }
}

#[derive(Default)]
struct BoardCollector {
    boards: Vec<Board>,
    seen: HashSet<String>,
    id_counts: HashMap<String, usize>,
}

impl BoardCollector {
    fn has_seen(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    fn next_id(&mut self, category: &str) -> String {
        let count = self.id_counts.entry(category.to_string()).or_insert(0);
        *count += 1;
        if *count > 1 {
            format!("{}_{}", category, count)
        } else {
            category.to_string()
        }
    }

    fn push(&mut self, board: Board) {
        self.seen.insert(board.url.clone());
        self.boards.push(board);
    }

    fn into_boards(self) -> Vec<Board> {
        self.boards
    }
}

pub fn is_web_url(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn same_host(base: &Url, other: &Url) -> bool {
    match (base.host_str(), other.host_str()) {
        (Some(a), Some(b)) => {
            a.eq_ignore_ascii_case(b) && base.port_or_known_default() == other.port_or_known_default()
        }
        _ => false,
    }
}
