//! Text and JSON rendering of command results (stdout only; logs go to stderr).

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;
use moodle_core::{CategoryListing, Course, CourseDetails, DownloadedFile, Resource, Session};
use serde::Serialize;

use super::config::OutputFormat;

#[derive(Serialize)]
struct SessionExport<'a> {
    base_url: &'a str,
    cookie_header: String,
}

pub(crate) fn render_session(session: &Session, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(session.cookie_header()),
        OutputFormat::Json => to_json(&SessionExport {
            base_url: session.base_url(),
            cookie_header: session.cookie_header(),
        }),
    }
}

pub(crate) fn render_courses(courses: &[Course], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(course_lines(courses)),
        OutputFormat::Json => to_json(courses),
    }
}

pub(crate) fn render_details(details: &CourseDetails, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return to_json(details);
    }
    let mut out = format!("{} (id {})", details.course.name(), details.course.id());
    for section in &details.sections {
        let _ = write!(out, "\n  [{}] {}", section.id(), section.name());
        for resource in section.resources() {
            let marker = if resource.is_file() { '*' } else { '-' };
            let _ = write!(
                out,
                "\n    {marker} {} <{}> ({})",
                resource.name(),
                resource.url(),
                resource.module()
            );
        }
    }
    Ok(out)
}

pub(crate) fn render_category(listing: &CategoryListing, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => {
            let header = format!("{} (category {})", listing.name, listing.id);
            if listing.courses.is_empty() {
                Ok(header)
            } else {
                Ok(format!("{header}\n{}", course_lines(&listing.courses)))
            }
        }
        OutputFormat::Json => to_json(listing),
    }
}

pub(crate) fn render_files(files: &[Resource], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(files
            .iter()
            .map(|file| format!("{}\t{}", file.name(), file.url()))
            .collect::<Vec<_>>()
            .join("\n")),
        OutputFormat::Json => to_json(files),
    }
}

#[derive(Serialize)]
struct ResolvedExport<'a> {
    url: &'a str,
    file_url: &'a str,
}

pub(crate) fn render_resolved(url: &str, file_url: &str, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(file_url.to_string()),
        OutputFormat::Json => to_json(&ResolvedExport { url, file_url }),
    }
}

#[derive(Serialize)]
struct SavedExport<'a> {
    #[serde(flatten)]
    file: &'a DownloadedFile,
    path: String,
    bytes: usize,
}

pub(crate) fn render_saved(file: &DownloadedFile, path: &Path, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(path.display().to_string()),
        OutputFormat::Json => to_json(&SavedExport {
            file,
            path: path.display().to_string(),
            bytes: file.len(),
        }),
    }
}

fn course_lines(courses: &[Course]) -> String {
    courses
        .iter()
        .map(|course| format!("{}\t{}", course.id(), course.name()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
