// Catalog record types and query helpers
// Records mirror the persisted tables; queries are simple substring
// filters with no relevance ranking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named grouping for software packages or tutorials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Category {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
        }
    }
}

/// A downloadable package in the public catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Software {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub publisher: String,
    pub version: String,
    pub size: String,
    pub release_date: String,
    pub download_url: Option<String>,
    pub installer_path: Option<String>,
    pub logo: Option<String>,
    #[serde(default)]
    pub screenshots: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Form payload for creating or updating a software record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SoftwareDraft {
    pub name: String,
    pub description: String,
    pub category: String,
    pub publisher: String,
    pub version: String,
    pub size: String,
    pub release_date: String,
    pub download_url: Option<String>,
    pub logo: Option<String>,
    pub screenshots: Vec<String>,
}

impl Software {
    /// Create a new record from form data with a generated id and
    /// fresh timestamps
    pub fn create(draft: SoftwareDraft) -> Self {
        let now = Utc::now();
        Software {
            id: Uuid::new_v4().to_string(),
            name: draft.name,
            description: draft.description,
            category: draft.category,
            publisher: draft.publisher,
            version: draft.version,
            size: draft.size,
            release_date: draft.release_date,
            download_url: draft.download_url,
            installer_path: None,
            logo: draft.logo,
            screenshots: draft.screenshots,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the editable fields from form data, refreshing the
    /// updated-at timestamp
    pub fn apply(&mut self, draft: SoftwareDraft) {
        self.name = draft.name;
        self.description = draft.description;
        self.category = draft.category;
        self.publisher = draft.publisher;
        self.version = draft.version;
        self.size = draft.size;
        self.release_date = draft.release_date;
        self.download_url = draft.download_url;
        self.logo = draft.logo;
        self.screenshots = draft.screenshots;
        self.updated_at = Utc::now();
    }

    /// Case-insensitive substring match over name, description and
    /// publisher
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.name.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
            || self.publisher.to_lowercase().contains(&query)
    }
}

/// A tutorial with markup content and a shared like/dislike counter pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tutorial {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category_id: Option<String>,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub dislikes: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tutorial {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Tutorial {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            content: content.into(),
            category_id: None,
            likes: 0,
            dislikes: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Case-insensitive substring match over the title
    pub fn matches(&self, query: &str) -> bool {
        self.title.to_lowercase().contains(&query.to_lowercase())
    }

    /// Estimated reading time in minutes at 200 words per minute,
    /// never less than one minute
    pub fn reading_time_minutes(&self) -> u64 {
        let words = self.content.split_whitespace().count() as u64;
        words.div_ceil(200).max(1)
    }

    /// Refresh the updated-at timestamp after a content change
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

pub fn search_software<'a>(items: &'a [Software], query: &str) -> Vec<&'a Software> {
    items.iter().filter(|s| s.matches(query)).collect()
}

pub fn filter_software_by_category<'a>(items: &'a [Software], category: &str) -> Vec<&'a Software> {
    items
        .iter()
        .filter(|s| s.category.eq_ignore_ascii_case(category))
        .collect()
}

pub fn search_tutorials<'a>(items: &'a [Tutorial], query: &str) -> Vec<&'a Tutorial> {
    items.iter().filter(|t| t.matches(query)).collect()
}

/// Group tutorials under their category names, in category list order,
/// with uncategorized tutorials in a trailing group
pub fn group_tutorials_by_category<'a>(
    tutorials: &'a [Tutorial],
    categories: &[Category],
) -> Vec<(String, Vec<&'a Tutorial>)> {
    let mut groups: Vec<(String, Vec<&Tutorial>)> = Vec::new();

    for category in categories {
        let members: Vec<&Tutorial> = tutorials
            .iter()
            .filter(|t| t.category_id.as_deref() == Some(category.id.as_str()))
            .collect();
        if !members.is_empty() {
            groups.push((category.name.clone(), members));
        }
    }

    let known: Vec<&str> = categories.iter().map(|c| c.id.as_str()).collect();
    let orphans: Vec<&Tutorial> = tutorials
        .iter()
        .filter(|t| match t.category_id.as_deref() {
            Some(id) => !known.contains(&id),
            None => true,
        })
        .collect();
    if !orphans.is_empty() {
        groups.push(("Uncategorized".to_string(), orphans));
    }

    groups
}
