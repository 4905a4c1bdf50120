use crate::domain::model::SelectorBundle;
use crate::utils::error::{MapperError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    pub http: HttpConfig,
    pub institution: InstitutionConfig,
    pub hierarchy: HierarchyConfig,
    pub discovery: DiscoveryConfig,
    pub output: OutputConfig,
    pub campuses: Vec<CampusSource>,
    pub keywords: Vec<KeywordRule>,
    pub cms_rules: Vec<CmsRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub campus_timeout_secs: u64,
    pub homepage_timeout_secs: u64,
    pub sitemap_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstitutionConfig {
    /// 部門子網域所屬的學校網域，例如 `yonsei.ac.kr`
    pub domain: String,
    pub id_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyConfig {
    pub content_selector: String,
    pub heading_selector: String,
    pub college_suffix: String,
    /// 標題中此標記之後的文字全部移除
    pub noise_markers: Vec<String>,
    pub homepage_marker: String,
    pub sibling_tags: Vec<String>,
    pub sibling_window: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub sitemap_markers: Vec<String>,
    pub href_blacklist: Vec<String>,
    pub max_link_text_chars: usize,
    pub review_empty_departments: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
    pub departments_file: String,
    pub boards_file: String,
    pub manual_review_file: String,
    pub summary_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampusSource {
    pub url: String,
    pub name: String,
}

/// Anchor text containing `keyword` becomes a board of category `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub keyword: String,
    pub id: String,
    pub name: String,
}

/// Fingerprint of a known board CMS and the selectors its listings use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CmsRule {
    pub name: String,
    #[serde(default)]
    pub url_markers: Vec<String>,
    #[serde(default)]
    pub markup_markers: Vec<String>,
    #[serde(flatten)]
    pub selectors: SelectorBundle,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            institution: InstitutionConfig::default(),
            hierarchy: HierarchyConfig::default(),
            discovery: DiscoveryConfig::default(),
            output: OutputConfig::default(),
            campuses: default_campuses(),
            keywords: default_keywords(),
            cms_rules: default_cms_rules(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            campus_timeout_secs: 10,
            homepage_timeout_secs: 7,
            sitemap_timeout_secs: 5,
        }
    }
}

impl HttpConfig {
    pub fn campus_timeout(&self) -> Duration {
        Duration::from_secs(self.campus_timeout_secs)
    }

    pub fn homepage_timeout(&self) -> Duration {
        Duration::from_secs(self.homepage_timeout_secs)
    }

    pub fn sitemap_timeout(&self) -> Duration {
        Duration::from_secs(self.sitemap_timeout_secs)
    }
}

impl Default for InstitutionConfig {
    fn default() -> Self {
        Self {
            domain: "yonsei.ac.kr".to_string(),
            id_prefix: "yonsei".to_string(),
        }
    }
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            content_selector: "main".to_string(),
            heading_selector: "h1".to_string(),
            college_suffix: "대학".to_string(),
            noise_markers: vec!["교수진".to_string(), "홈페이지".to_string()],
            homepage_marker: "홈페이지".to_string(),
            sibling_tags: vec!["div".to_string(), "p".to_string(), "span".to_string()],
            sibling_window: 3,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            sitemap_markers: vec!["사이트맵".to_string(), "sitemap".to_string()],
            href_blacklist: ["articleNo", "article_no", "mode=view", "seq", "view.do", "board_seq"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_link_text_chars: 20,
            review_empty_departments: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "./data".to_string(),
            departments_file: "yonsei_departments.json".to_string(),
            boards_file: "yonsei_departments_boards.json".to_string(),
            manual_review_file: "manual_review_needed.json".to_string(),
            summary_file: "run_summary.json".to_string(),
        }
    }
}

fn default_campuses() -> Vec<CampusSource> {
    vec![
        CampusSource {
            url: "https://www.yonsei.ac.kr/sc/186/subview.do".to_string(),
            name: "신촌캠퍼스".to_string(),
        },
        CampusSource {
            url: "https://mirae.yonsei.ac.kr/wj/1413/subview.do".to_string(),
            name: "미래캠퍼스".to_string(),
        },
    ]
}

fn keyword(keyword: &str, id: &str, name: &str) -> KeywordRule {
    KeywordRule {
        keyword: keyword.to_string(),
        id: id.to_string(),
        name: name.to_string(),
    }
}

// 順序即優先順序：第一個命中的關鍵字決定分類
pub fn default_keywords() -> Vec<KeywordRule> {
    vec![
        keyword("학부공지", "academic", "학사공지"),
        keyword("대학원공지", "grad_notice", "대학원공지"),
        keyword("장학", "scholarship", "장학공지"),
        keyword("취업", "career", "취업/진로"),
        keyword("공지사항", "notice", "일반공지"),
        keyword("학사공지", "academic", "학사공지"),
    ]
}

pub fn default_cms_rules() -> Vec<CmsRule> {
    vec![
        CmsRule {
            name: "yonsei".to_string(),
            url_markers: vec![".do".to_string()],
            markup_markers: vec!["c-board-title".to_string()],
            selectors: SelectorBundle {
                row_selector: "tr:has(a.c-board-title)".to_string(),
                title_selector: "a.c-board-title".to_string(),
                date_selector: "td:nth-last-child(1)".to_string(),
                attr_name: "href".to_string(),
            },
        },
        CmsRule {
            name: "xe".to_string(),
            url_markers: vec![],
            markup_markers: vec!["xe-list-board".to_string(), "xe_board".to_string()],
            selectors: SelectorBundle {
                row_selector: "li.xe-list-board-list--item:not(.xe-list-board-list--header)"
                    .to_string(),
                title_selector: "a.xe-list-board-list__title-link".to_string(),
                date_selector: ".xe-list-board-list__created_at".to_string(),
                attr_name: "href".to_string(),
            },
        },
    ]
}

impl MapperConfig {
    /// 內建的延世大學設定
    pub fn yonsei() -> Self {
        Self::default()
    }

    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(MapperError::Io)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置；未提供的區段使用內建預設值
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| MapperError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Loads `path` when given; otherwise falls back to `dept-mapper.toml` if present, then to
    /// the built-in defaults.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new("dept-mapper.toml").exists() => Self::from_file("dept-mapper.toml"),
            None => Ok(Self::yonsei()),
        }
    }

    /// 替換環境變數 (例如 ${OUTPUT_DIR})
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn validate_config(&self) -> Result<()> {
        if self.campuses.is_empty() {
            return Err(MapperError::NoCampusesConfigured);
        }
        for campus in &self.campuses {
            validation::validate_url("campuses.url", &campus.url)?;
            validation::validate_non_empty_string("campuses.name", &campus.name)?;
        }
        validation::validate_unique(
            "campuses.name",
            self.campuses.iter().map(|c| c.name.as_str()),
        )?;

        validation::validate_non_empty_string("http.user_agent", &self.http.user_agent)?;
        validation::validate_positive_number(
            "http.campus_timeout_secs",
            self.http.campus_timeout_secs,
            1,
        )?;
        validation::validate_positive_number(
            "http.homepage_timeout_secs",
            self.http.homepage_timeout_secs,
            1,
        )?;
        validation::validate_positive_number(
            "http.sitemap_timeout_secs",
            self.http.sitemap_timeout_secs,
            1,
        )?;

        validation::validate_non_empty_string("institution.domain", &self.institution.domain)?;
        validation::validate_non_empty_string("institution.id_prefix", &self.institution.id_prefix)?;

        validation::validate_selector("hierarchy.content_selector", &self.hierarchy.content_selector)?;
        validation::validate_selector("hierarchy.heading_selector", &self.hierarchy.heading_selector)?;
        validation::validate_non_empty_string("hierarchy.college_suffix", &self.hierarchy.college_suffix)?;
        validation::validate_non_empty_string("hierarchy.homepage_marker", &self.hierarchy.homepage_marker)?;
        validation::validate_positive_number(
            "hierarchy.sibling_window",
            self.hierarchy.sibling_window as u64,
            1,
        )?;

        validation::validate_positive_number(
            "discovery.max_link_text_chars",
            self.discovery.max_link_text_chars as u64,
            1,
        )?;

        if self.keywords.is_empty() {
            return Err(MapperError::MissingConfigError {
                field: "keywords".to_string(),
            });
        }
        for rule in &self.keywords {
            validation::validate_non_empty_string("keywords.keyword", &rule.keyword)?;
            validation::validate_non_empty_string("keywords.id", &rule.id)?;
        }

        validation::validate_unique("cms_rules.name", self.cms_rules.iter().map(|r| r.name.as_str()))?;
        for rule in &self.cms_rules {
            if rule.url_markers.is_empty() && rule.markup_markers.is_empty() {
                return Err(MapperError::InvalidConfigValueError {
                    field: "cms_rules".to_string(),
                    value: rule.name.clone(),
                    reason: "A CMS rule needs at least one url or markup marker".to_string(),
                });
            }
            // 選擇器字串交由下游爬蟲解析，這裡只檢查非空
            validation::validate_non_empty_string("cms_rules.row_selector", &rule.selectors.row_selector)?;
            validation::validate_non_empty_string("cms_rules.title_selector", &rule.selectors.title_selector)?;
            validation::validate_non_empty_string("cms_rules.date_selector", &rule.selectors.date_selector)?;
            validation::validate_non_empty_string("cms_rules.attr_name", &rule.selectors.attr_name)?;
        }

        validation::validate_path("output.dir", &self.output.dir)?;
        validation::validate_path("output.departments_file", &self.output.departments_file)?;
        validation::validate_path("output.boards_file", &self.output.boards_file)?;
        validation::validate_path("output.manual_review_file", &self.output.manual_review_file)?;
        validation::validate_path("output.summary_file", &self.output.summary_file)?;

        Ok(())
    }

    /// Keeps only the named campuses, preserving configured order.
    pub fn retain_campuses(&mut self, names: &[String]) {
        if names.is_empty() {
            return;
        }
        self.campuses.retain(|c| names.iter().any(|n| n == &c.name));
    }
}

impl Validate for MapperConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MapperConfig::yonsei();
        assert!(config.validate().is_ok());
        assert_eq!(config.campuses.len(), 2);
        assert_eq!(config.keywords[0].keyword, "학부공지");
        assert_eq!(config.cms_rules[0].name, "yonsei");
        assert!(config.http.sitemap_timeout() < config.http.homepage_timeout());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = MapperConfig::from_toml_str("").unwrap();
        assert_eq!(config.campuses, default_campuses());
        assert_eq!(config.keywords, default_keywords());
        assert_eq!(config.output.boards_file, "yonsei_departments_boards.json");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_content = r#"
[http]
homepage_timeout_secs = 3

[institution]
domain = "korea.ac.kr"
id_prefix = "korea"

[[campuses]]
url = "https://www.korea.ac.kr/colleges.do"
name = "안암캠퍼스"

[[keywords]]
keyword = "공지"
id = "notice"
name = "공지"

[[cms_rules]]
name = "custom"
markup_markers = ["board-list"]
row_selector = "ul.board-list > li"
title_selector = "a.subject"
date_selector = "span.date"
attr_name = "href"
"#;

        let config = MapperConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.http.homepage_timeout_secs, 3);
        assert_eq!(config.http.sitemap_timeout_secs, 5);
        assert_eq!(config.institution.id_prefix, "korea");
        assert_eq!(config.campuses.len(), 1);
        assert_eq!(config.keywords.len(), 1);
        assert_eq!(config.cms_rules[0].selectors.row_selector, "ul.board-list > li");
        assert!(config.cms_rules[0].url_markers.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("DEPT_MAPPER_TEST_OUTPUT", "/tmp/mapper-out");

        let config = MapperConfig::from_toml_str(
            r#"
[output]
dir = "${DEPT_MAPPER_TEST_OUTPUT}"
"#,
        )
        .unwrap();
        assert_eq!(config.output.dir, "/tmp/mapper-out");

        std::env::remove_var("DEPT_MAPPER_TEST_OUTPUT");
    }

    #[test]
    fn test_zero_campuses_is_fatal() {
        let config = MapperConfig::from_toml_str("campuses = []").unwrap();
        assert!(matches!(
            config.validate(),
            Err(MapperError::NoCampusesConfigured)
        ));
    }

    #[test]
    fn test_invalid_campus_url_rejected() {
        let config = MapperConfig::from_toml_str(
            r#"
[[campuses]]
url = "not-a-url"
name = "x"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retain_campuses() {
        let mut config = MapperConfig::yonsei();
        config.retain_campuses(&["미래캠퍼스".to_string()]);
        assert_eq!(config.campuses.len(), 1);
        assert_eq!(config.campuses[0].name, "미래캠퍼스");
    }
}
