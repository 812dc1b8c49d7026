//! Portal authentication: cookie accumulation, login token harvesting,
//! outcome classification and the login state machine.

mod classifier;
mod cookies;
mod endpoints;
mod session;
mod token;

pub use classifier::{
    INVALID_LOGIN_MARKER, LOGIN_ERRORS_MARKER, LoginClassifier, LoginSignals, MarkerClassifier,
};
pub use cookies::{CookieJar, SessionCookie};
pub use endpoints::PortalEndpoints;
pub use session::{AuthSession, AuthState, Credentials, Session};
pub use token::{LOGIN_TOKEN_FIELD, TokenNotFound, extract_token};
