//! Filtering, sorting and paging of the resource list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{Privacy, ResourceType};
use crate::stats::ResourceStats;

pub const DEFAULT_PER_PAGE: usize = 12;
pub const MAX_PER_PAGE: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// Newest uploads first
    #[default]
    Latest,
    /// Best average rating first
    Highest,
}

/// Browse parameters as they arrive from the query string
///
/// Any filter that is absent, empty or `"All"` matches every resource.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub semester: Option<String>,
    #[serde(default, rename = "type")]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub privacy: Option<String>,
    #[serde(default)]
    pub sort: SortBy,
    #[serde(default)]
    pub exam_mode: Option<bool>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub per_page: Option<usize>,
}

fn active_filter(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

impl ResourceQuery {
    /// Does this resource pass the search text and every active filter?
    pub fn matches(&self, stats: &ResourceStats, exam_mode: bool) -> bool {
        let resource = &stats.resource;

        if exam_mode && !(stats.is_top_rated && stats.is_exam_oriented) {
            return false;
        }

        if let Some(query) = active_search(&self.search) {
            let tags = resource.tags.join(" ").to_lowercase();
            let hit = resource.title.to_lowercase().contains(&query)
                || resource.subject.to_lowercase().contains(&query)
                || tags.contains(&query);
            if !hit {
                return false;
            }
        }

        if let Some(subject) = active_filter(&self.subject) {
            if resource.subject != subject {
                return false;
            }
        }
        if let Some(semester) = active_filter(&self.semester) {
            if resource.semester != semester {
                return false;
            }
        }
        if let Some(kind) = active_filter(&self.resource_type) {
            if ResourceType::parse(kind) != Some(resource.resource_type) {
                return false;
            }
        }
        if let Some(privacy) = active_filter(&self.privacy) {
            if Privacy::parse(privacy) != Some(resource.privacy) {
                return false;
            }
        }

        true
    }
}

fn active_search(search: &Option<String>) -> Option<String> {
    search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
}

/// Apply filters and ordering. `exam_mode` is the effective exam-mode flag.
pub fn filter_resources(
    resources: &[ResourceStats],
    query: &ResourceQuery,
    exam_mode: bool,
) -> Vec<ResourceStats> {
    let mut hits: Vec<ResourceStats> = resources
        .iter()
        .filter(|stats| query.matches(stats, exam_mode))
        .cloned()
        .collect();

    match query.sort {
        SortBy::Highest => hits.sort_by(|a, b| b.average_rating.total_cmp(&a.average_rating)),
        SortBy::Latest => hits.sort_by(|a, b| b.resource.created_at.cmp(&a.resource.created_at)),
    }

    hits
}

/// One page of a longer list
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// Cut `items` into 1-based pages
///
/// `per_page` is clamped to `1..=MAX_PER_PAGE`. A page past the end comes back
/// empty but still reports the totals.
pub fn paginate<T>(items: Vec<T>, page: Option<usize>, per_page: Option<usize>) -> Page<T> {
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    let page = page.unwrap_or(1).max(1);
    let total = items.len();
    let total_pages = total.div_ceil(per_page);

    let start = (page - 1).saturating_mul(per_page);
    let items = items.into_iter().skip(start).take(per_page).collect();

    Page {
        items,
        page,
        per_page,
        total,
        total_pages,
    }
}

/// Distinct subjects, sorted
pub fn subjects(resources: &[ResourceStats]) -> Vec<String> {
    let mut all: Vec<String> = resources.iter().map(|r| r.resource.subject.clone()).collect();
    all.sort();
    all.dedup();
    all
}

pub fn group_by_subject(resources: &[ResourceStats]) -> BTreeMap<String, Vec<ResourceStats>> {
    let mut grouped: BTreeMap<String, Vec<ResourceStats>> = BTreeMap::new();
    for stats in resources {
        grouped
            .entry(stats.resource.subject.clone())
            .or_default()
            .push(stats.clone());
    }
    grouped
}
