//! Typed course graph produced by record extraction.
//!
//! Constructors refuse empty identifiers (course/section id, resource url), so a
//! record that exists always carries its required fields. Extraction skips any
//! match that cannot satisfy this.

use serde::Serialize;

/// Module name given to direct `pluginfile.php` links, which have no view page.
pub const PLUGINFILE_MODULE: &str = "pluginfile";

/// Module names whose links deliver downloadable files.
const FILE_MODULES: &[&str] = &["resource", "folder", PLUGINFILE_MODULE];

/// A course as listed on the dashboard or a category page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Course {
    id: String,
    name: String,
}

impl Course {
    /// Creates a course record; `None` when `id` is empty.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return None;
        }
        Some(Self {
            id,
            name: name.into().trim().to_string(),
        })
    }

    /// Portal course identifier (numeric, stringified).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name, trimmed.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A linked learning item inside a section (file, folder, link or activity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    url: String,
    name: String,
    module: String,
}

impl Resource {
    /// Creates a resource record; `None` when `url` is empty.
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        name: impl Into<String>,
        module: impl Into<String>,
    ) -> Option<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return None;
        }
        Some(Self {
            url,
            name: name.into().trim().to_string(),
            module: module.into(),
        })
    }

    /// A resource for a bare URL, as given on the command line.
    ///
    /// The module comes from a `/mod/<module>/` path segment, or is
    /// [`PLUGINFILE_MODULE`] otherwise. The name is the last path segment.
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        let url = url.trim();
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let module = path
            .split_once("/mod/")
            .and_then(|(_, rest)| rest.split('/').next())
            .filter(|module| !module.is_empty())
            .unwrap_or(PLUGINFILE_MODULE);
        let name = path.rsplit('/').next().unwrap_or_default();
        let name = urlencoding::decode(name).map_or_else(|_| name.to_string(), |n| n.into_owned());
        Self::new(url, name, module)
    }

    /// Link target as it appeared in the page (entities unescaped).
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Visible link text, trimmed.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Moodle module name from the link path (`resource`, `folder`, `url`, ...).
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// True for modules that serve files rather than activities.
    #[must_use]
    pub fn is_file(&self) -> bool {
        FILE_MODULES.contains(&self.module.as_str())
    }
}

/// A course section; resources are kept in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    id: String,
    name: String,
    resources: Vec<Resource>,
}

impl Section {
    /// Creates a section record; `None` when `id` is empty.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        resources: Vec<Resource>,
    ) -> Option<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return None;
        }
        Some(Self {
            id,
            name: name.into().trim().to_string(),
            resources,
        })
    }

    /// Section identifier, unique within a course page.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Section heading, trimmed.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resources in document order.
    #[must_use]
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }
}

/// A course page: the course plus its sections in curriculum order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseDetails {
    /// The course this page describes.
    pub course: Course,
    /// Sections in document order.
    pub sections: Vec<Section>,
}

impl CourseDetails {
    /// Iterates every resource across all sections, in document order.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.sections.iter().flat_map(|section| section.resources.iter())
    }
}

/// The courses listed under one portal category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryListing {
    /// Category identifier as requested.
    pub id: String,
    /// Category heading, or `Category <id>`.
    pub name: String,
    /// Courses in document order.
    pub courses: Vec<Course>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_course_new_rejects_empty_id() {
        assert!(Course::new("", "Algorithms").is_none());
        assert!(Course::new("   ", "Algorithms").is_none());
    }

    #[test]
    fn test_course_new_trims_name() {
        let course = Course::new("5", "  Algorithms \n").unwrap();
        assert_eq!(course.id(), "5");
        assert_eq!(course.name(), "Algorithms");
    }

    #[test]
    fn test_resource_new_rejects_empty_url() {
        assert!(Resource::new("", "Slides", "resource").is_none());
    }

    #[test]
    fn test_resource_is_file_by_module() {
        let file = Resource::new("https://lms/mod/resource/view.php?id=1", "a", "resource").unwrap();
        let folder = Resource::new("https://lms/mod/folder/view.php?id=2", "b", "folder").unwrap();
        let forum = Resource::new("https://lms/mod/forum/view.php?id=3", "c", "forum").unwrap();
        assert!(file.is_file());
        assert!(folder.is_file());
        assert!(!forum.is_file());
    }

    #[test]
    fn test_resource_from_url_infers_module() {
        let view = Resource::from_url("https://lms.example.edu/mod/resource/view.php?id=4").unwrap();
        assert_eq!(view.module(), "resource");
        assert_eq!(view.name(), "view.php");

        let file = Resource::from_url(
            "https://lms.example.edu/pluginfile.php/7/mod_folder/content/0/Lab%201.pdf?forcedownload=1",
        )
        .unwrap();
        assert_eq!(file.module(), PLUGINFILE_MODULE);
        assert_eq!(file.name(), "Lab 1.pdf");
        assert!(file.is_file());

        assert!(Resource::from_url("  ").is_none());
    }

    #[test]
    fn test_course_details_resources_flattens_in_order() {
        let r1 = Resource::new("u1", "one", "resource").unwrap();
        let r2 = Resource::new("u2", "two", "url").unwrap();
        let details = CourseDetails {
            course: Course::new("7", "Databases").unwrap(),
            sections: vec![
                Section::new("0", "General", vec![r1.clone()]).unwrap(),
                Section::new("1", "Week 1", vec![]).unwrap(),
                Section::new("2", "Week 2", vec![r2.clone()]).unwrap(),
            ],
        };
        let all: Vec<_> = details.resources().cloned().collect();
        assert_eq!(all, vec![r1, r2]);
    }

    #[test]
    fn test_course_serializes_to_json() {
        let course = Course::new("9", "Databases").unwrap();
        let json = serde_json::to_value(&course).unwrap();
        assert_eq!(json, serde_json::json!({"id": "9", "name": "Databases"}));
    }
}
