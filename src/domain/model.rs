use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 無法解析首頁時寫入輸出檔的哨兵值
pub const UNRESOLVED_URL: &str = "NOT_FOUND";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campus {
    pub campus: String,
    pub colleges: Vec<College>,
}

impl Campus {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            campus: name.into(),
            colleges: Vec::new(),
        }
    }

    pub fn department_count(&self) -> usize {
        self.colleges.iter().map(|c| c.departments.len()).sum()
    }

    pub fn board_count(&self) -> usize {
        self.departments().map(|d| d.boards.len()).sum()
    }

    pub fn departments(&self) -> impl Iterator<Item = &Department> {
        self.colleges.iter().flat_map(|c| c.departments.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct College {
    pub name: String,
    pub departments: Vec<Department>,
}

impl College {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            departments: Vec::new(),
        }
    }

    pub fn has_department(&self, name: &str) -> bool {
        self.departments.iter().any(|d| d.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    pub name: String,
    pub url: DepartmentUrl,
    #[serde(default)]
    pub boards: Vec<Board>,
}

/// Department homepage as found on the campus page.
///
/// Serialized as a plain string so existing consumers keep reading `"url": "NOT_FOUND"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DepartmentUrl {
    Resolved(String),
    Unresolved,
}

impl DepartmentUrl {
    pub fn as_str(&self) -> &str {
        match self {
            DepartmentUrl::Resolved(url) => url,
            DepartmentUrl::Unresolved => UNRESOLVED_URL,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, DepartmentUrl::Resolved(_))
    }
}

impl From<String> for DepartmentUrl {
    fn from(value: String) -> Self {
        if value == UNRESOLVED_URL {
            DepartmentUrl::Unresolved
        } else {
            DepartmentUrl::Resolved(value)
        }
    }
}

impl From<DepartmentUrl> for String {
    fn from(value: DepartmentUrl) -> Self {
        match value {
            DepartmentUrl::Resolved(url) => url,
            DepartmentUrl::Unresolved => UNRESOLVED_URL.to_string(),
        }
    }
}

impl fmt::Display for DepartmentUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four coordinates a crawler needs to scrape a board listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorBundle {
    pub row_selector: String,
    pub title_selector: String,
    pub date_selector: String,
    pub attr_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(flatten)]
    pub selectors: SelectorBundle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewReason {
    #[serde(rename = "invalid homepage URL")]
    InvalidHomepageUrl,
    #[serde(rename = "homepage fetch failed")]
    HomepageFetchFailed,
    #[serde(rename = "no boards discovered")]
    NoBoardsDiscovered,
}

impl ReviewReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewReason::InvalidHomepageUrl => "invalid homepage URL",
            ReviewReason::HomepageFetchFailed => "homepage fetch failed",
            ReviewReason::NoBoardsDiscovered => "no boards discovered",
        }
    }
}

impl fmt::Display for ReviewReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualReviewItem {
    pub campus: String,
    pub name: String,
    pub url: String,
    pub reason: ReviewReason,
}

/// 發現流程所需的部門識別資訊
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentRef {
    pub campus: String,
    pub name: String,
}

impl DepartmentRef {
    pub fn new(campus: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            campus: campus.into(),
            name: name.into(),
        }
    }

    pub fn review(&self, url: &str, reason: ReviewReason) -> ManualReviewItem {
        ManualReviewItem {
            campus: self.campus.clone(),
            name: self.name.clone(),
            url: url.to_string(),
            reason,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryResult {
    pub boards: Vec<Board>,
    pub manual_review: Option<ManualReviewItem>,
    /// 首頁判定出的 CMS 版型，未取得首頁時為 `None`
    pub layout: Option<SelectorBundle>,
}

impl DiscoveryResult {
    pub fn review(item: ManualReviewItem) -> Self {
        Self {
            boards: Vec::new(),
            manual_review: Some(item),
            layout: None,
        }
    }

    pub fn with_boards(boards: Vec<Board>) -> Self {
        Self {
            boards,
            manual_review: None,
            layout: None,
        }
    }

    pub fn with_layout(mut self, layout: Option<SelectorBundle>) -> Self {
        self.layout = layout;
        self
    }
}

/// Output of the discovery phase: the enriched tree plus everything queued for a human.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingOutcome {
    pub enriched: Vec<Campus>,
    pub manual_review: Vec<ManualReviewItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub campuses: usize,
    pub departments: usize,
    pub boards: usize,
    pub manual_review: usize,
}

impl RunSummary {
    pub fn from_outcome(started_at: DateTime<Utc>, outcome: &MappingOutcome) -> Self {
        Self {
            started_at,
            finished_at: Utc::now(),
            campuses: outcome.enriched.len(),
            departments: outcome.enriched.iter().map(Campus::department_count).sum(),
            boards: outcome.enriched.iter().map(Campus::board_count).sum(),
            manual_review: outcome.manual_review.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_campus() -> Campus {
        Campus {
            campus: "신촌캠퍼스".to_string(),
            colleges: vec![College {
                name: "상경대학".to_string(),
                departments: vec![
                    Department {
                        id: "yonsei_econ".to_string(),
                        name: "경제학부".to_string(),
                        url: DepartmentUrl::Resolved("https://econ.yonsei.ac.kr/".to_string()),
                        boards: vec![Board {
                            id: "academic".to_string(),
                            name: "학사공지".to_string(),
                            url: "https://econ.yonsei.ac.kr/board/list.do".to_string(),
                            selectors: SelectorBundle {
                                row_selector: "tr:has(a.c-board-title)".to_string(),
                                title_selector: "a.c-board-title".to_string(),
                                date_selector: "td:nth-last-child(1)".to_string(),
                                attr_name: "href".to_string(),
                            },
                        }],
                    },
                    Department {
                        id: "yonsei_응용통계학과".to_string(),
                        name: "응용통계학과".to_string(),
                        url: DepartmentUrl::Unresolved,
                        boards: vec![],
                    },
                ],
            }],
        }
    }

    #[test]
    fn test_campus_json_round_trip() {
        let campus = sample_campus();
        let json = serde_json::to_string_pretty(&campus).unwrap();
        let parsed: Campus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, campus);
    }

    #[test]
    fn test_json_keys_match_output_shape() {
        let value = serde_json::to_value(sample_campus()).unwrap();

        assert_eq!(value["campus"], "신촌캠퍼스");
        let dept = &value["colleges"][0]["departments"][0];
        assert_eq!(dept["id"], "yonsei_econ");
        assert_eq!(dept["url"], "https://econ.yonsei.ac.kr/");

        let board = &dept["boards"][0];
        let mut keys: Vec<&str> = board.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "attr_name",
                "date_selector",
                "id",
                "name",
                "row_selector",
                "title_selector",
                "url"
            ]
        );
    }

    #[test]
    fn test_unresolved_url_serializes_as_sentinel() {
        let value = serde_json::to_value(&sample_campus().colleges[0].departments[1]).unwrap();
        assert_eq!(value["url"], UNRESOLVED_URL);
        assert_eq!(value["boards"], serde_json::json!([]));
    }

    #[test]
    fn test_review_reason_serializes_as_text() {
        let item = DepartmentRef::new("미래캠퍼스", "디자인예술학부")
            .review("https://design.yonsei.ac.kr", ReviewReason::HomepageFetchFailed);
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["reason"], "homepage fetch failed");
        assert_eq!(value["campus"], "미래캠퍼스");
    }
}
