//! Record extraction from server-rendered portal pages.
//!
//! Pages are never parsed into a tree. Every extraction is the same shape:
//! find all matches of a pattern within a scope, map each match to a record,
//! and skip the match when a required field is missing.
//!
//! # Architecture
//!
//! - [`RecordExtractor`] - Trait the service depends on; swap it to change matching technology
//! - [`PatternExtractor`] - Default regex-based implementation
//! - [`extract_courses`] - Course links on the dashboard or a category page
//! - [`extract_course_details`] - Course heading, sections and their resources
//! - [`extract_file_link`] - The file URL on a resource view page

mod courses;
mod details;
mod files;
pub(crate) mod markup;

pub use courses::extract_courses;
pub use details::{extract_course_details, extract_heading};
pub use files::extract_file_link;

use regex::{Captures, Regex};
use tracing::debug;

use crate::model::{CategoryListing, Course, CourseDetails};

/// Turns portal markup into typed records.
///
/// Implementations must be best-effort: malformed optional fields degrade to
/// placeholders, and matches missing a required field are skipped.
pub trait RecordExtractor: Send + Sync {
    /// Course links in document order, one record per matching anchor.
    fn extract_courses(&self, html: &str) -> Vec<Course>;

    /// Course name and sections from a course page; `None` when `course_id` is empty.
    fn extract_course_details(&self, html: &str, course_id: &str) -> Option<CourseDetails>;

    /// The page's main heading, if any.
    fn extract_heading(&self, html: &str) -> Option<String>;

    /// Category heading plus the courses listed on a category page.
    fn extract_category(&self, html: &str, category_id: &str) -> CategoryListing {
        CategoryListing {
            id: category_id.to_string(),
            name: self
                .extract_heading(html)
                .unwrap_or_else(|| format!("Category {category_id}")),
            courses: self.extract_courses(html),
        }
    }

    /// The first file URL on a resource view page, as written in the markup.
    fn extract_file_link(&self, html: &str) -> Option<String> {
        extract_file_link(html)
    }
}

/// Regex-based extractor tuned for Moodle markup.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternExtractor;

impl PatternExtractor {
    /// Creates the default extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RecordExtractor for PatternExtractor {
    fn extract_courses(&self, html: &str) -> Vec<Course> {
        extract_courses(html)
    }

    fn extract_course_details(&self, html: &str, course_id: &str) -> Option<CourseDetails> {
        extract_course_details(html, course_id)
    }

    fn extract_heading(&self, html: &str) -> Option<String> {
        extract_heading(html)
    }
}

/// Maps every match of `pattern` in `scope` to a record, skipping `None`s.
fn collect_records<R>(
    pattern: &Regex,
    scope: &str,
    kind: &'static str,
    mut map: impl FnMut(&Captures<'_>) -> Option<R>,
) -> Vec<R> {
    let mut records = Vec::new();
    for captures in pattern.captures_iter(scope) {
        match map(&captures) {
            Some(record) => records.push(record),
            None => debug!(kind, "skipping match without required field"),
        }
    }
    records
}
