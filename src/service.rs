//! Course operations against an authenticated portal session.
//!
//! [`CourseService`] is the single entry point callers use: it runs the login
//! handshake, resumes exported sessions, answers course queries by fetching
//! pages with the session's cookies and handing the bodies to a
//! [`RecordExtractor`], and retrieves the files behind resources.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::auth::{
    AuthSession, Credentials, LoginClassifier, MarkerClassifier, PortalEndpoints, Session,
};
use crate::download::{DownloadedFile, file_name_for, is_direct_file_url, is_html, with_force_download};
use crate::error::{PortalError, TransportError};
use crate::extract::{PatternExtractor, RecordExtractor};
use crate::model::{CategoryListing, Course, CourseDetails, Resource};
use crate::transport::{ExchangeRequest, ExchangeResponse, Transport};

/// Module whose view page honours `forcedownload=1`.
const RESOURCE_MODULE: &str = "resource";

/// Login and course queries for one portal technology.
///
/// Holds no per-session state; one service can drive many sessions.
#[derive(Clone)]
pub struct CourseService {
    transport: Arc<dyn Transport>,
    classifier: Arc<dyn LoginClassifier>,
    extractor: Arc<dyn RecordExtractor>,
}

impl std::fmt::Debug for CourseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CourseService").finish_non_exhaustive()
    }
}

/// Where a resource's file was found.
enum FileLocation {
    /// A URL still to be fetched.
    Url(String),
    /// The resolving request already returned the file.
    Fetched(ExchangeResponse<Vec<u8>>),
}

impl CourseService {
    /// Creates a service with the default classifier and extractor.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            classifier: Arc::new(MarkerClassifier::default()),
            extractor: Arc::new(PatternExtractor::new()),
        }
    }

    /// Replaces the record extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn RecordExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Replaces the login outcome classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn LoginClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Logs in and returns an authenticated session.
    ///
    /// Each call uses a fresh [`AuthSession`] and an empty cookie jar.
    ///
    /// # Errors
    ///
    /// Returns the handshake's terminal error; see [`AuthSession::login`].
    pub async fn login(
        &self,
        credentials: &Credentials,
        base_url: &str,
    ) -> Result<Session, PortalError> {
        AuthSession::new(self.transport.clone(), self.classifier.clone(), base_url)?
            .login(credentials)
            .await
    }

    /// Rebuilds a session from an exported cookie header and checks it.
    ///
    /// The dashboard is fetched with the cookies. The session is marked
    /// authenticated only when the portal serves it instead of bouncing to the
    /// login form.
    ///
    /// # Errors
    ///
    /// - [`PortalError::InvalidBaseUrl`] for a malformed base URL
    /// - [`PortalError::NotAuthenticated`] when the header holds no cookies (no request is sent)
    /// - [`PortalError::SessionExpired`] when the portal bounces to the login form
    /// - [`PortalError::Transport`] on exchange faults or non-2xx statuses
    #[instrument(skip(self, cookie_header))]
    pub async fn resume(&self, base_url: &str, cookie_header: &str) -> Result<Session, PortalError> {
        let mut session = Session::from_cookie_header(base_url, cookie_header)?;
        if session.cookies().is_empty() {
            return Err(PortalError::NotAuthenticated);
        }

        let url = session.endpoints().dashboard_url();
        let request = ExchangeRequest::get(&url).with_cookies(&session.cookie_header());
        let response = self.transport.exchange(request).await?;
        accept_response(&mut session, &url, response)?;

        session.mark_authenticated();
        info!(cookies = session.cookies().len(), "session resumed");
        Ok(session)
    }

    /// Lists the courses on the session's dashboard, in page order.
    ///
    /// # Errors
    ///
    /// - [`PortalError::NotAuthenticated`] before login
    /// - [`PortalError::SessionExpired`] when the portal bounces to the login form
    /// - [`PortalError::Transport`] on exchange faults or non-2xx statuses
    #[instrument(skip(self, session), fields(base_url = %session.base_url()))]
    pub async fn list_courses(&self, session: &mut Session) -> Result<Vec<Course>, PortalError> {
        let url = session.endpoints().dashboard_url();
        let response = self.fetch_authenticated(session, &url).await?;
        let courses = self.extractor.extract_courses(&response.body);
        info!(count = courses.len(), "listed courses");
        Ok(courses)
    }

    /// Fetches a course page and extracts its sections and resources.
    ///
    /// The id is not checked against [`CourseService::list_courses`]; an
    /// unknown id yields whatever the portal renders, often no sections.
    ///
    /// # Errors
    ///
    /// As [`CourseService::list_courses`], plus
    /// [`PortalError::InvalidIdentifier`] for an empty id.
    #[instrument(skip(self, session), fields(base_url = %session.base_url()))]
    pub async fn get_course_details(
        &self,
        session: &mut Session,
        course_id: &str,
    ) -> Result<CourseDetails, PortalError> {
        let course_id = require_id("course", course_id)?;
        let url = session.endpoints().course_url(course_id);
        let response = self.fetch_authenticated(session, &url).await?;
        let details = self
            .extractor
            .extract_course_details(&response.body, course_id)
            .ok_or_else(|| PortalError::InvalidIdentifier {
                kind: "course",
                id: course_id.to_string(),
            })?;
        info!(
            sections = details.sections.len(),
            resources = details.resources().count(),
            "fetched course details"
        );
        Ok(details)
    }

    /// Lists the courses under one portal category.
    ///
    /// # Errors
    ///
    /// As [`CourseService::get_course_details`].
    #[instrument(skip(self, session), fields(base_url = %session.base_url()))]
    pub async fn list_category_courses(
        &self,
        session: &mut Session,
        category_id: &str,
    ) -> Result<CategoryListing, PortalError> {
        let category_id = require_id("category", category_id)?;
        let url = session.endpoints().category_url(category_id);
        let response = self.fetch_authenticated(session, &url).await?;
        let listing = self.extractor.extract_category(&response.body, category_id);
        info!(count = listing.courses.len(), "listed category courses");
        Ok(listing)
    }

    /// The file-bearing resources of a course, in page order, without duplicates.
    ///
    /// # Errors
    ///
    /// As [`CourseService::get_course_details`].
    pub async fn list_course_files(
        &self,
        session: &mut Session,
        course_id: &str,
    ) -> Result<Vec<Resource>, PortalError> {
        let details = self.get_course_details(session, course_id).await?;
        let mut files: Vec<Resource> = Vec::new();
        for resource in details.resources().filter(|resource| resource.is_file()) {
            if !files.iter().any(|seen| seen.url() == resource.url()) {
                files.push(resource.clone());
            }
        }
        Ok(files)
    }

    /// Returns the URL that serves the file behind `resource`.
    ///
    /// Direct `pluginfile.php` links are returned as-is. Other links are
    /// fetched (`resource` view pages with `forcedownload=1`); a redirect to a
    /// file or a non-HTML answer yields the final URL, and an HTML page is
    /// searched for a file link.
    ///
    /// # Errors
    ///
    /// As [`CourseService::list_courses`], plus [`PortalError::FileNotFound`]
    /// when the page links to no file.
    #[instrument(skip(self, session, resource), fields(url = %resource.url()))]
    pub async fn resolve_file_url(
        &self,
        session: &mut Session,
        resource: &Resource,
    ) -> Result<String, PortalError> {
        match self.locate_file(session, resource).await? {
            FileLocation::Url(url) => Ok(url),
            FileLocation::Fetched(response) => Ok(response.final_url),
        }
    }

    /// Downloads the file behind `resource`.
    ///
    /// The response that resolved the resource is reused when it already
    /// carried the file, so most resources cost one request.
    ///
    /// # Errors
    ///
    /// As [`CourseService::resolve_file_url`].
    #[instrument(skip(self, session, resource), fields(url = %resource.url()))]
    pub async fn download_resource(
        &self,
        session: &mut Session,
        resource: &Resource,
    ) -> Result<DownloadedFile, PortalError> {
        let response = match self.locate_file(session, resource).await? {
            FileLocation::Fetched(response) => response,
            FileLocation::Url(url) => self.download_authenticated(session, &url).await?,
        };
        let file = downloaded_file(resource.url(), response);
        info!(
            file_name = %file.file_name,
            bytes = file.len(),
            "downloaded file"
        );
        Ok(file)
    }

    /// Downloads the file behind a resource or file URL.
    ///
    /// # Errors
    ///
    /// [`PortalError::InvalidIdentifier`] for an empty URL, otherwise as
    /// [`CourseService::download_resource`].
    pub async fn download_file(
        &self,
        session: &mut Session,
        url: &str,
    ) -> Result<DownloadedFile, PortalError> {
        let resource = Resource::from_url(url).ok_or_else(|| PortalError::InvalidIdentifier {
            kind: "file",
            id: url.to_string(),
        })?;
        self.download_resource(session, &resource).await
    }

    async fn locate_file(
        &self,
        session: &mut Session,
        resource: &Resource,
    ) -> Result<FileLocation, PortalError> {
        let url = session
            .endpoints()
            .absolute_url(resource.url())
            .ok_or_else(|| TransportError::InvalidUrl {
                url: resource.url().to_string(),
            })?;
        if is_direct_file_url(&url) {
            debug!("resource links to the file directly");
            return Ok(FileLocation::Url(url));
        }

        let request_url = if resource.module() == RESOURCE_MODULE {
            with_force_download(&url)
        } else {
            url.clone()
        };
        let response = self.download_authenticated(session, &request_url).await?;
        if is_direct_file_url(&response.final_url) || !is_html(response.content_type()) {
            debug!(final_url = %response.final_url, "resource served the file");
            return Ok(FileLocation::Fetched(response));
        }

        let page = String::from_utf8_lossy(&response.body);
        let link = self
            .extractor
            .extract_file_link(&page)
            .and_then(|href| Url::parse(&response.final_url).ok()?.join(&href).ok());
        match link {
            Some(link) => {
                debug!(%link, "found file link on resource page");
                Ok(FileLocation::Url(link.into()))
            }
            None => {
                warn!("resource page links to no file");
                Err(PortalError::FileNotFound { url })
            }
        }
    }

    /// GETs `url` with the session's cookies and merges returned cookies.
    async fn fetch_authenticated(
        &self,
        session: &mut Session,
        url: &str,
    ) -> Result<ExchangeResponse, PortalError> {
        if !session.is_authenticated() {
            return Err(PortalError::NotAuthenticated);
        }
        let request = ExchangeRequest::get(url).with_cookies(&session.cookie_header());
        let response = self.transport.exchange(request).await?;
        accept_response(session, url, response)
    }

    /// As [`CourseService::fetch_authenticated`], keeping the body as bytes.
    async fn download_authenticated(
        &self,
        session: &mut Session,
        url: &str,
    ) -> Result<ExchangeResponse<Vec<u8>>, PortalError> {
        if !session.is_authenticated() {
            return Err(PortalError::NotAuthenticated);
        }
        let request = ExchangeRequest::get(url).with_cookies(&session.cookie_header());
        let response = self.transport.download(request).await?;
        accept_response(session, url, response)
    }
}

/// Records the response's cookies and rejects login bounces and error statuses.
fn accept_response<B>(
    session: &mut Session,
    url: &str,
    response: ExchangeResponse<B>,
) -> Result<ExchangeResponse<B>, PortalError> {
    let recorded = session.record_cookies(&response);
    debug!(
        status = response.status,
        final_url = %response.final_url,
        recorded,
        "authenticated fetch"
    );

    if PortalEndpoints::is_login_page(&response.final_url) {
        return Err(PortalError::SessionExpired {
            url: url.to_string(),
        });
    }
    if !response.is_success() {
        return Err(TransportError::http_status(url, response.status).into());
    }
    Ok(response)
}

fn downloaded_file(source_url: &str, response: ExchangeResponse<Vec<u8>>) -> DownloadedFile {
    let content_type = response.content_type().map(str::to_string);
    let file_name = file_name_for(
        &response.final_url,
        response.header_values("content-disposition").last(),
        content_type.as_deref(),
    );
    DownloadedFile {
        source_url: source_url.to_string(),
        final_url: response.final_url,
        file_name,
        content_type,
        bytes: response.body,
    }
}

fn require_id<'a>(kind: &'static str, id: &'a str) -> Result<&'a str, PortalError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(PortalError::InvalidIdentifier {
            kind,
            id: id.to_string(),
        });
    }
    Ok(trimmed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::CookieJar;
    use crate::model::PLUGINFILE_MODULE;
    use crate::test_support::{
        BASE_URL, LOGIN_URL, ScriptedTransport, file, login_form, page, page_with_cookies, status,
    };

    const DASHBOARD_URL: &str = "https://lms.example.edu/my/";
    const DASHBOARD: &str = r#"
        <div class="course-info-container">
          <a href="https://lms.example.edu/course/view.php?id=5">Algorithms</a>
        </div>
        <div class="course-info-container">
          <a href="https://lms.example.edu/course/view.php?id=9">Databases</a>
        </div>
    "#;

    const RESOURCE_URL: &str = "https://lms.example.edu/mod/resource/view.php?id=101";
    const FORCED_URL: &str = "https://lms.example.edu/mod/resource/view.php?id=101&forcedownload=1";
    const FILE_URL: &str = "https://lms.example.edu/pluginfile.php/55/mod_resource/content/1/Syllabus.pdf";

    fn service(transport: &Arc<ScriptedTransport>) -> CourseService {
        CourseService::new(transport.clone())
    }

    fn session() -> Session {
        Session::authenticated(
            PortalEndpoints::parse(BASE_URL).unwrap(),
            CookieJar::from_header("MoodleSession=s1"),
        )
    }

    fn syllabus() -> Resource {
        Resource::new(RESOURCE_URL, "Syllabus", "resource").unwrap()
    }

    #[tokio::test]
    async fn test_login_then_list_courses_end_to_end() {
        let transport = Arc::new(ScriptedTransport::new([
            Ok(page_with_cookies(LOGIN_URL, &login_form("abc123"), &["MoodleSession=pre"])),
            Ok(page_with_cookies(DASHBOARD_URL, "<h1>Dashboard</h1>", &["MoodleSession=post"])),
            Ok(page(DASHBOARD_URL, DASHBOARD)),
        ]));
        let service = service(&transport);
        let mut session = service
            .login(&Credentials::new("student", "pw"), BASE_URL)
            .await
            .unwrap();

        let courses = service.list_courses(&mut session).await.unwrap();
        let pairs: Vec<_> = courses.iter().map(|c| (c.id(), c.name())).collect();
        assert_eq!(pairs, vec![("5", "Algorithms"), ("9", "Databases")]);

        let requests = transport.requests();
        assert!(requests[1].body.as_deref().unwrap().contains("logintoken=abc123"));
        assert_eq!(requests[2].url, DASHBOARD_URL);
        assert_eq!(requests[2].header("Cookie"), Some("MoodleSession=post"));
    }

    #[tokio::test]
    async fn test_list_courses_requires_authentication() {
        let transport = Arc::new(ScriptedTransport::default());
        let mut session = Session::anonymous(BASE_URL).unwrap();
        let err = service(&transport)
            .list_courses(&mut session)
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::NotAuthenticated));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_list_courses_is_idempotent() {
        let transport = Arc::new(ScriptedTransport::new([
            Ok(page(DASHBOARD_URL, DASHBOARD)),
            Ok(page(DASHBOARD_URL, DASHBOARD)),
        ]));
        let service = service(&transport);
        let mut session = session();
        let first = service.list_courses(&mut session).await.unwrap();
        let second = service.list_courses(&mut session).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[tokio::test]
    async fn test_authenticated_fetch_merges_new_cookies() {
        let transport = Arc::new(ScriptedTransport::new([
            Ok(page_with_cookies(DASHBOARD_URL, DASHBOARD, &["MoodleSession=rotated; path=/"])),
            Ok(page(DASHBOARD_URL, DASHBOARD)),
        ]));
        let service = service(&transport);
        let mut session = session();
        service.list_courses(&mut session).await.unwrap();
        assert_eq!(session.cookie_header(), "MoodleSession=rotated");

        service.list_courses(&mut session).await.unwrap();
        assert_eq!(
            transport.requests()[1].header("Cookie"),
            Some("MoodleSession=rotated")
        );
    }

    #[tokio::test]
    async fn test_redirect_to_login_is_session_expired() {
        let transport = Arc::new(ScriptedTransport::new([Ok(page(
            "https://lms.example.edu/login/index.php",
            &login_form("fresh"),
        ))]));
        let mut session = session();
        let err = service(&transport)
            .list_courses(&mut session)
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::SessionExpired { ref url } if url == DASHBOARD_URL));
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_error_status_is_transport_error() {
        let transport = Arc::new(ScriptedTransport::new([Ok(status(DASHBOARD_URL, 502))]));
        let mut session = session();
        let err = service(&transport)
            .list_courses(&mut session)
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert_eq!(err.transport_error().and_then(TransportError::status), Some(502));
    }

    #[tokio::test]
    async fn test_get_course_details_requests_course_page() {
        let body = r#"
            <h1>Algorithms</h1>
            <li id="section-0"><h3>General</h3>
              <a href="https://lms.example.edu/mod/resource/view.php?id=101">Syllabus</a>
            </li>
            <li id="section-1"><h3>Week 1</h3></li>
        "#;
        let transport = Arc::new(ScriptedTransport::new([Ok(page(
            "https://lms.example.edu/course/view.php?id=5",
            body,
        ))]));
        let mut session = session();
        let details = service(&transport)
            .get_course_details(&mut session, "5")
            .await
            .unwrap();
        assert_eq!(details.course.id(), "5");
        assert_eq!(details.course.name(), "Algorithms");
        assert_eq!(details.sections.len(), 2);
        assert_eq!(details.sections[0].resources().len(), 1);
        assert!(details.sections[1].resources().is_empty());
        assert_eq!(
            transport.requests()[0].url,
            "https://lms.example.edu/course/view.php?id=5"
        );
    }

    #[tokio::test]
    async fn test_get_course_details_rejects_empty_id_without_request() {
        let transport = Arc::new(ScriptedTransport::default());
        let mut session = session();
        let err = service(&transport)
            .get_course_details(&mut session, "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::InvalidIdentifier { kind: "course", .. }));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_list_category_courses() {
        let body = r#"
            <h1>Computer Science</h1>
            <h3 class="coursename"><a href="https://lms.example.edu/course/view.php?id=12">Compilers</a></h3>
            <h3 class="coursename"><a href="https://lms.example.edu/course/view.php?id=13">Networks</a></h3>
        "#;
        let transport = Arc::new(ScriptedTransport::new([Ok(page(
            "https://lms.example.edu/course/index.php?categoryid=4",
            body,
        ))]));
        let mut session = session();
        let listing = service(&transport)
            .list_category_courses(&mut session, "4")
            .await
            .unwrap();
        assert_eq!(listing.id, "4");
        assert_eq!(listing.name, "Computer Science");
        assert_eq!(listing.courses.len(), 2);
        assert_eq!(
            transport.requests()[0].url,
            "https://lms.example.edu/course/index.php?categoryid=4"
        );
        assert_eq!(transport.remaining(), 0);
    }

    #[tokio::test]
    async fn test_custom_extractor_is_used() {
        struct FixedExtractor;

        impl RecordExtractor for FixedExtractor {
            fn extract_courses(&self, _html: &str) -> Vec<Course> {
                vec![Course::new("1", "Fixed").unwrap()]
            }

            fn extract_course_details(&self, _html: &str, _id: &str) -> Option<CourseDetails> {
                None
            }

            fn extract_heading(&self, _html: &str) -> Option<String> {
                None
            }
        }

        let transport = Arc::new(ScriptedTransport::new([Ok(page(DASHBOARD_URL, ""))]));
        let service = service(&transport).with_extractor(Arc::new(FixedExtractor));
        let mut session = session();
        let courses = service.list_courses(&mut session).await.unwrap();
        assert_eq!(courses[0].name(), "Fixed");
    }

    #[tokio::test]
    async fn test_resume_checks_cookies_against_dashboard() {
        let transport = Arc::new(ScriptedTransport::new([Ok(page_with_cookies(
            DASHBOARD_URL,
            DASHBOARD,
            &["MoodleSession=rotated; path=/"],
        ))]));
        let session = service(&transport)
            .resume(BASE_URL, "MoodleSession=s1")
            .await
            .unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.cookie_header(), "MoodleSession=rotated");

        let requests = transport.requests();
        assert_eq!(requests[0].url, DASHBOARD_URL);
        assert_eq!(requests[0].header("Cookie"), Some("MoodleSession=s1"));
    }

    #[tokio::test]
    async fn test_resume_with_unknown_cookie_is_session_expired() {
        let transport = Arc::new(ScriptedTransport::new([Ok(page(LOGIN_URL, &login_form("t")))]));
        let err = service(&transport)
            .resume(BASE_URL, "garbage=1")
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::SessionExpired { ref url } if url == DASHBOARD_URL));
    }

    #[tokio::test]
    async fn test_resume_without_cookies_sends_nothing() {
        let transport = Arc::new(ScriptedTransport::default());
        let err = service(&transport).resume(BASE_URL, " ; ").await.unwrap_err();
        assert!(matches!(err, PortalError::NotAuthenticated));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_resume_error_status_is_transport_error() {
        let transport = Arc::new(ScriptedTransport::new([Ok(status(DASHBOARD_URL, 500))]));
        let err = service(&transport)
            .resume(BASE_URL, "MoodleSession=s1")
            .await
            .unwrap_err();
        assert_eq!(err.transport_error().and_then(TransportError::status), Some(500));
    }

    #[tokio::test]
    async fn test_resolve_direct_file_link_sends_nothing() {
        let transport = Arc::new(ScriptedTransport::default());
        let resource = Resource::new(
            "/pluginfile.php/55/mod_resource/content/1/Syllabus.pdf",
            "Syllabus.pdf",
            PLUGINFILE_MODULE,
        )
        .unwrap();
        let url = service(&transport)
            .resolve_file_url(&mut session(), &resource)
            .await
            .unwrap();
        assert_eq!(url, FILE_URL);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_forces_download_and_follows_redirect() {
        let transport = Arc::new(ScriptedTransport::new([Ok(file(
            FILE_URL,
            "application/pdf",
            None,
            "%PDF-1.4",
        ))]));
        let url = service(&transport)
            .resolve_file_url(&mut session(), &syllabus())
            .await
            .unwrap();
        assert_eq!(url, FILE_URL);

        let requests = transport.requests();
        assert_eq!(requests[0].url, FORCED_URL);
        assert_eq!(requests[0].header("Cookie"), Some("MoodleSession=s1"));
    }

    #[tokio::test]
    async fn test_resolve_scans_embedding_page() {
        let body = r#"
            <div role="main"><h2>Syllabus</h2>
              <iframe id="resourceobject" src="/pluginfile.php/55/mod_resource/content/1/Syllabus.pdf"></iframe>
            </div>
        "#;
        let transport = Arc::new(ScriptedTransport::new([Ok(page(FORCED_URL, body))]));
        let url = service(&transport)
            .resolve_file_url(&mut session(), &syllabus())
            .await
            .unwrap();
        assert_eq!(url, FILE_URL);
    }

    #[tokio::test]
    async fn test_resolve_page_without_file_is_file_not_found() {
        let transport = Arc::new(ScriptedTransport::new([Ok(page(
            FORCED_URL,
            "<p>This resource is not available.</p>",
        ))]));
        let err = service(&transport)
            .resolve_file_url(&mut session(), &syllabus())
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::FileNotFound { ref url } if url == RESOURCE_URL));
    }

    #[tokio::test]
    async fn test_download_reuses_resolving_response() {
        let transport = Arc::new(ScriptedTransport::new([Ok(file(
            FILE_URL,
            "application/pdf",
            Some(r#"inline; filename="Course Syllabus.pdf""#),
            "%PDF-1.4",
        ))]));
        let downloaded = service(&transport)
            .download_resource(&mut session(), &syllabus())
            .await
            .unwrap();
        assert_eq!(downloaded.file_name, "Course Syllabus.pdf");
        assert_eq!(downloaded.bytes, b"%PDF-1.4".to_vec());
        assert_eq!(downloaded.source_url, RESOURCE_URL);
        assert_eq!(downloaded.final_url, FILE_URL);
        assert_eq!(downloaded.content_type.as_deref(), Some("application/pdf"));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_download_follows_link_from_embedding_page() {
        let body = r#"<div class="resourceworkaround">Click <a href="/pluginfile.php/55/mod_resource/content/1/Syllabus.pdf">Syllabus.pdf</a> to view the file.</div>"#;
        let transport = Arc::new(ScriptedTransport::new([
            Ok(page_with_cookies(FORCED_URL, body, &["MoodleSession=rotated"])),
            Ok(file(FILE_URL, "application/pdf", None, "%PDF")),
        ]));
        let downloaded = service(&transport)
            .download_resource(&mut session(), &syllabus())
            .await
            .unwrap();
        assert_eq!(downloaded.file_name, "Syllabus.pdf");

        let requests = transport.requests();
        assert_eq!(requests[1].url, FILE_URL);
        assert_eq!(requests[1].header("Cookie"), Some("MoodleSession=rotated"));
    }

    #[tokio::test]
    async fn test_download_bounced_to_login_is_session_expired() {
        let transport = Arc::new(ScriptedTransport::new([Ok(page(LOGIN_URL, &login_form("t")))]));
        let err = service(&transport)
            .download_file(&mut session(), FILE_URL)
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::SessionExpired { .. }));
    }

    #[tokio::test]
    async fn test_download_requires_authentication() {
        let transport = Arc::new(ScriptedTransport::default());
        let mut anonymous = Session::anonymous(BASE_URL).unwrap();
        let err = service(&transport)
            .download_file(&mut anonymous, FILE_URL)
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::NotAuthenticated));

        let err = service(&transport)
            .download_file(&mut session(), "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::InvalidIdentifier { kind: "file", .. }));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_list_course_files_dedups_in_order() {
        let body = r#"
            <h1>Algorithms</h1>
            <li id="section-0"><h3>General</h3>
              <a href="https://lms.example.edu/mod/resource/view.php?id=101">Syllabus</a>
              <a href="https://lms.example.edu/mod/forum/view.php?id=102">Announcements</a>
            </li>
            <li id="section-1"><h3>Week 1</h3>
              <a href="https://lms.example.edu/mod/folder/view.php?id=103">Lab files</a>
              <a href="https://lms.example.edu/mod/resource/view.php?id=101">Syllabus (again)</a>
            </li>
        "#;
        let transport = Arc::new(ScriptedTransport::new([Ok(page(
            "https://lms.example.edu/course/view.php?id=5",
            body,
        ))]));
        let files = service(&transport)
            .list_course_files(&mut session(), "5")
            .await
            .unwrap();
        let names: Vec<_> = files.iter().map(Resource::name).collect();
        assert_eq!(names, vec!["Syllabus", "Lab files"]);
    }
}
