//! Portal URL layout.

use url::Url;

use crate::error::PortalError;

const LOGIN_PATH: &str = "/login/index.php";

/// Endpoint URLs derived from one portal base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalEndpoints {
    base_url: String,
}

impl PortalEndpoints {
    /// Validates `base_url` and strips trailing slashes.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::InvalidBaseUrl`] unless `base_url` is an
    /// absolute http(s) URL with a host.
    pub fn parse(base_url: &str) -> Result<Self, PortalError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let valid = Url::parse(trimmed).is_ok_and(|url| {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some_and(|host| !host.is_empty())
                && url.query().is_none()
                && url.fragment().is_none()
        });
        if !valid {
            return Err(PortalError::InvalidBaseUrl {
                url: base_url.to_string(),
            });
        }
        Ok(Self {
            base_url: trimmed.to_string(),
        })
    }

    /// The normalized base URL, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/login/index.php`
    #[must_use]
    pub fn login_url(&self) -> String {
        format!("{}{LOGIN_PATH}", self.base_url)
    }

    /// `{base}/my/`
    #[must_use]
    pub fn dashboard_url(&self) -> String {
        format!("{}/my/", self.base_url)
    }

    /// `{base}/course/view.php?id={id}`
    #[must_use]
    pub fn course_url(&self, course_id: &str) -> String {
        format!(
            "{}/course/view.php?id={}",
            self.base_url,
            urlencoding::encode(course_id)
        )
    }

    /// `{base}/course/index.php?categoryid={id}`
    #[must_use]
    pub fn category_url(&self, category_id: &str) -> String {
        format!(
            "{}/course/index.php?categoryid={}",
            self.base_url,
            urlencoding::encode(category_id)
        )
    }

    /// Resolves `href` against the base URL; absolute hrefs pass through.
    #[must_use]
    pub fn absolute_url(&self, href: &str) -> Option<String> {
        Url::parse(&format!("{}/", self.base_url))
            .and_then(|base| base.join(href.trim()))
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .map(String::from)
    }

    /// True when `url`'s path is the portal login form.
    #[must_use]
    pub fn is_login_page(url: &str) -> bool {
        Url::parse(url).map_or_else(
            |_| url.split(['?', '#']).next().unwrap_or(url).ends_with(LOGIN_PATH),
            |parsed| parsed.path().ends_with(LOGIN_PATH),
        )
    }
}
