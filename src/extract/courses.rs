//! Course link extraction (dashboard and category pages).

use std::sync::LazyLock;

use regex::Regex;
use tracing::instrument;

use super::collect_records;
use super::markup::{compile_static_regex, visible_text};
use crate::model::Course;

static COURSE_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"(?is)<a\b[^>]*\bhref\s*=\s*["'][^"']*/course/view\.php\?id=(\d+)["'][^>]*>(.*?)</a>"#,
    )
});

/// Returns one [`Course`] per anchor linking to `/course/view.php?id=<digits>`.
///
/// Repeated links to the same course are not de-duplicated. Anchors whose id is
/// not purely numeric (or that carry extra query parameters) do not match. An
/// anchor with no visible text is named `Course <id>`.
#[instrument(level = "debug", skip(html), fields(bytes = html.len()))]
pub fn extract_courses(html: &str) -> Vec<Course> {
    collect_records(&COURSE_LINK_RE, html, "course", |captures| {
        let id = captures.get(1)?.as_str();
        let name = captures
            .get(2)
            .map(|m| visible_text(m.as_str()))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("Course {id}"));
        Course::new(id, name)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ids_and_names(courses: &[Course]) -> Vec<(&str, &str)> {
        courses.iter().map(|c| (c.id(), c.name())).collect()
    }

    #[test]
    fn test_extract_courses_three_anchors_in_document_order() {
        let html = r#"
            <ul>
              <li><a href="https://lms.example.edu/course/view.php?id=5">Algorithms</a></li>
              <li><a class="aalink" href="https://lms.example.edu/course/view.php?id=9"> Databases </a></li>
              <li><a href="/course/view.php?id=14">Operating Systems</a></li>
            </ul>
        "#;
        let courses = extract_courses(html);
        assert_eq!(
            ids_and_names(&courses),
            vec![
                ("5", "Algorithms"),
                ("9", "Databases"),
                ("14", "Operating Systems")
            ]
        );
    }

    #[test]
    fn test_extract_courses_non_numeric_id_not_matched() {
        let html = r#"
            <a href="https://lms.example.edu/course/view.php?id=abc">Broken</a>
            <a href="https://lms.example.edu/course/view.php?id=3">Valid</a>
        "#;
        let courses = extract_courses(html);
        assert_eq!(ids_and_names(&courses), vec![("3", "Valid")]);
    }

    #[test]
    fn test_extract_courses_keeps_duplicates() {
        let html = r#"
            <a href="https://lms.example.edu/course/view.php?id=5">Algorithms</a>
            <a href="https://lms.example.edu/course/view.php?id=5">Algorithms</a>
        "#;
        assert_eq!(extract_courses(html).len(), 2);
    }

    #[test]
    fn test_extract_courses_nested_markup_and_entities() {
        let html = r#"<a href="https://lms.example.edu/course/view.php?id=21"><span class="multiline">Signals &amp; Systems</span></a>"#;
        let courses = extract_courses(html);
        assert_eq!(ids_and_names(&courses), vec![("21", "Signals & Systems")]);
    }

    #[test]
    fn test_extract_courses_empty_text_gets_placeholder() {
        let html = r#"<a href="https://lms.example.edu/course/view.php?id=8"><img src="x.png"></a>"#;
        let courses = extract_courses(html);
        assert_eq!(ids_and_names(&courses), vec![("8", "Course 8")]);
    }

    #[test]
    fn test_extract_courses_ignores_section_links() {
        let html = r#"<a href="https://lms.example.edu/course/view.php?id=8&amp;section=2">Week 2</a>"#;
        assert!(extract_courses(html).is_empty());
    }

    #[test]
    fn test_extract_courses_no_links() {
        assert!(extract_courses("<html><body>No courses</body></html>").is_empty());
    }
}
