use crate::config::toml_config::{HierarchyConfig, InstitutionConfig};
use crate::domain::model::{Campus, College, Department, DepartmentUrl};
use crate::utils::error::{MapperError, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("anchor selector is valid"));

/// Derives stable department ids from a homepage subdomain, or from the display name when the
/// homepage is not on the institution's domain.
#[derive(Debug, Clone)]
pub struct DepartmentIdScheme {
    prefix: String,
    subdomain_re: Regex,
}

impl DepartmentIdScheme {
    pub fn new(institution: &InstitutionConfig) -> Result<Self> {
        let pattern = format!(r"(?i)^https?://([^.]+)\.{}", regex::escape(&institution.domain));
        let subdomain_re = Regex::new(&pattern).map_err(|e| MapperError::ConfigValidationError {
            field: "institution.domain".to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            prefix: institution.id_prefix.clone(),
            subdomain_re,
        })
    }

    pub fn department_id(&self, name: &str, url: &DepartmentUrl) -> String {
        if let DepartmentUrl::Resolved(url) = url {
            if let Some(caps) = self.subdomain_re.captures(url) {
                return format!("{}_{}", self.prefix, caps[1].to_lowercase());
            }
        }
        format!("{}_{}", self.prefix, name.to_lowercase().replace(' ', "_"))
    }
}

/// Segments a campus page's flat heading stream into colleges and departments.
pub struct HierarchyExtractor {
    content: Selector,
    heading: Selector,
    college_re: Regex,
    college_suffix: String,
    noise_markers: Vec<String>,
    homepage_marker: String,
    sibling_tags: Vec<String>,
    sibling_window: usize,
    ids: DepartmentIdScheme,
}

impl HierarchyExtractor {
    pub fn new(config: &HierarchyConfig, institution: &InstitutionConfig) -> Result<Self> {
        let college_re = Regex::new(&format!(
            r"[가-힣]+{}$",
            regex::escape(&config.college_suffix)
        ))
        .map_err(|e| MapperError::ConfigValidationError {
            field: "hierarchy.college_suffix".to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            content: parse_selector(&config.content_selector)?,
            heading: parse_selector(&config.heading_selector)?,
            college_re,
            college_suffix: config.college_suffix.clone(),
            noise_markers: config.noise_markers.clone(),
            homepage_marker: config.homepage_marker.clone(),
            sibling_tags: config.sibling_tags.clone(),
            sibling_window: config.sibling_window,
            ids: DepartmentIdScheme::new(institution)?,
        })
    }

    /// 解析原始 HTML 後擷取；呼叫端不需持有 `Html`
    pub fn extract_html(&self, html: &str, campus_name: &str) -> Result<Campus> {
        let document = Html::parse_document(html);
        self.extract(&document, campus_name)
    }

    pub fn extract(&self, document: &Html, campus_name: &str) -> Result<Campus> {
        let main = document
            .select(&self.content)
            .next()
            .ok_or_else(|| MapperError::StructureNotFound {
                campus: campus_name.to_string(),
            })?;

        let mut campus = Campus::new(campus_name);
        let mut current: Option<usize> = None;

        for heading in main.select(&self.heading) {
            let text = self.clean_heading(&element_text(heading));
            if text.is_empty() {
                continue;
            }

            if self.college_re.is_match(&text) {
                current = Some(self.open_college(&mut campus, current, text));
                continue;
            }

            let Some(index) = current else {
                tracing::debug!("Skipping heading before any college: {}", text);
                continue;
            };
            if text.contains(self.college_suffix.as_str()) {
                continue;
            }

            let college = &mut campus.colleges[index];
            if college.has_department(&text) {
                continue;
            }

            let url = self.resolve_homepage(heading);
            if !url.is_resolved() {
                tracing::warn!("⚠️ No homepage URL found for {}", text);
            }
            let id = self.ids.department_id(&text, &url);

            college.departments.push(Department {
                id,
                name: text,
                url,
                boards: Vec::new(),
            });
        }

        Ok(campus)
    }

    // 連續重複的學院標題不另開新學院；先前出現過的學院則重新成為目前學院
    fn open_college(&self, campus: &mut Campus, current: Option<usize>, name: String) -> usize {
        if let Some(index) = current {
            if campus.colleges[index].name == name {
                return index;
            }
        }
        if let Some(index) = campus.colleges.iter().position(|c| c.name == name) {
            tracing::debug!("College header repeated out of order: {}", name);
            return index;
        }
        campus.colleges.push(College::new(name));
        campus.colleges.len() - 1
    }

    fn clean_heading(&self, text: &str) -> String {
        let mut cleaned = text;
        for marker in &self.noise_markers {
            if let Some(idx) = cleaned.find(marker.as_str()) {
                cleaned = &cleaned[..idx];
            }
        }
        cleaned.trim().to_string()
    }

    /// Looks at the first `sibling_window` matching siblings after the heading's container for
    /// an anchor labelled with the homepage marker.
    fn resolve_homepage(&self, heading: ElementRef) -> DepartmentUrl {
        let Some(container) = heading.parent() else {
            return DepartmentUrl::Unresolved;
        };

        container
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .filter(|el| {
                self.sibling_tags.is_empty()
                    || self.sibling_tags.iter().any(|t| t == el.value().name())
            })
            .take(self.sibling_window)
            .find_map(|sibling| self.homepage_href(sibling))
            .map(DepartmentUrl::Resolved)
            .unwrap_or(DepartmentUrl::Unresolved)
    }

    fn homepage_href(&self, sibling: ElementRef) -> Option<String> {
        let link = sibling
            .select(&ANCHOR)
            .find(|a| a.text().collect::<String>().contains(self.homepage_marker.as_str()))?;
        let href = link.value().attr("href")?.trim();
        if href.is_empty() || href.starts_with('#') {
            return None;
        }
        Some(href.to_string())
    }
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| MapperError::Selector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// Concatenated text of an element with every text node trimmed.
pub(crate) fn element_text(element: ElementRef) -> String {
    element.text().map(str::trim).collect()
}
