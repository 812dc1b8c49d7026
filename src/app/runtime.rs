//! Command execution: settings resolution, session setup and dispatch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use moodle_core::{
    CourseService, Credentials, DownloadedFile, ReqwestTransport, Resource, Session,
    TransportTimeouts, resolve_unique_path,
};
use tracing::{debug, info};

use super::config::{FileConfig, OutputFormat, load_default_file_config};
use super::output;
use super::retry::{DEFAULT_MAX_RETRIES, RetryPolicy, classify_login_error, with_retry};
use crate::cli::{Cli, Command};

/// Effective settings after merging flags, environment and the config file.
pub(crate) struct Settings {
    pub(crate) base_url: String,
    pub(crate) username: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) session: Option<String>,
    pub(crate) timeouts: TransportTimeouts,
    pub(crate) max_attempts: u32,
    pub(crate) output: OutputFormat,
}

/// Flags win over the config file; the file wins over built-in defaults.
pub(crate) fn resolve_settings(cli: &Cli, file: &FileConfig) -> Result<Settings> {
    let Some(base_url) = cli.base_url.clone().or_else(|| file.base_url.clone()) else {
        bail!(
            "No portal base URL configured\n  Suggestion: Pass --base-url, set MOODLE_BASE_URL, or add base_url to the config file"
        );
    };
    let defaults = TransportTimeouts::default();
    let output = if cli.json {
        OutputFormat::Json
    } else {
        file.output.unwrap_or_default()
    };
    Ok(Settings {
        base_url,
        username: cli.username.clone().or_else(|| file.username.clone()),
        password: cli.password.clone(),
        session: cli.session.clone().filter(|value| !value.trim().is_empty()),
        timeouts: TransportTimeouts {
            connect_timeout_secs: file
                .connect_timeout_secs
                .unwrap_or(defaults.connect_timeout_secs),
            read_timeout_secs: file.read_timeout_secs.unwrap_or(defaults.read_timeout_secs),
        },
        max_attempts: u32::from(
            cli.max_retries
                .or(file.max_retries)
                .unwrap_or(DEFAULT_MAX_RETRIES),
        ),
        output,
    })
}

/// Priority: `--quiet` > `-v` count > config verbosity > `info`.
///
/// `RUST_LOG`, when set, overrides the returned level in [`init_tracing`].
pub(crate) fn resolve_default_log_level(cli: &Cli, file: &FileConfig) -> &'static str {
    if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => file.verbosity.map_or("info", |setting| setting.log_level()),
            1 => "debug",
            _ => "trace",
        }
    }
}

pub(crate) fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

/// Loads configuration, initializes logging and runs the selected command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let file = load_default_file_config()?;
    init_tracing(resolve_default_log_level(&cli, &file));
    debug!(?cli, "CLI arguments parsed");

    let settings = resolve_settings(&cli, &file)?;
    let transport = ReqwestTransport::with_timeouts(settings.timeouts)
        .context("Failed to initialize HTTP client")?;
    let service = CourseService::new(Arc::new(transport));
    let policy = RetryPolicy::with_max_attempts(settings.max_attempts);

    let rendered = match &cli.command {
        Command::Login => {
            let session = login(&service, &policy, &settings).await?;
            output::render_session(&session, settings.output)?
        }
        Command::Courses => {
            let mut session = open_session(&service, &policy, &settings).await?;
            let courses = with_retry!(policy, "list_courses", service.list_courses(&mut session))
                .context("Failed to list courses")?;
            output::render_courses(&courses, settings.output)?
        }
        Command::Course { id } => {
            let mut session = open_session(&service, &policy, &settings).await?;
            let details = with_retry!(
                policy,
                "get_course_details",
                service.get_course_details(&mut session, id)
            )
            .with_context(|| format!("Failed to fetch course {id}"))?;
            output::render_details(&details, settings.output)?
        }
        Command::Category { id } => {
            let mut session = open_session(&service, &policy, &settings).await?;
            let listing = with_retry!(
                policy,
                "list_category_courses",
                service.list_category_courses(&mut session, id)
            )
            .with_context(|| format!("Failed to list category {id}"))?;
            output::render_category(&listing, settings.output)?
        }
        Command::Files { id } => {
            let mut session = open_session(&service, &policy, &settings).await?;
            let files = with_retry!(
                policy,
                "list_course_files",
                service.list_course_files(&mut session, id)
            )
            .with_context(|| format!("Failed to list files of course {id}"))?;
            output::render_files(&files, settings.output)?
        }
        Command::File {
            url,
            output_dir,
            resolve_only,
        } => {
            let mut session = open_session(&service, &policy, &settings).await?;
            if *resolve_only {
                let resource = Resource::from_url(url)
                    .with_context(|| format!("Invalid file URL '{url}'"))?;
                let file_url = with_retry!(
                    policy,
                    "resolve_file_url",
                    service.resolve_file_url(&mut session, &resource)
                )
                .with_context(|| format!("Failed to resolve {url}"))?;
                output::render_resolved(url, &file_url, settings.output)?
            } else {
                let file = with_retry!(
                    policy,
                    "download_file",
                    service.download_file(&mut session, url)
                )
                .with_context(|| format!("Failed to download {url}"))?;
                let path = save_file(output_dir, &file).await?;
                output::render_saved(&file, &path, settings.output)?
            }
        }
    };

    println!("{rendered}");
    Ok(())
}

/// Resumes `--session` when given, otherwise logs in.
async fn open_session(
    service: &CourseService,
    policy: &RetryPolicy,
    settings: &Settings,
) -> Result<Session> {
    if let Some(cookie_header) = settings.session.as_deref() {
        info!("Reusing session cookies");
        return with_retry!(
            policy,
            "resume",
            service.resume(&settings.base_url, cookie_header)
        )
        .context("Saved session was not accepted");
    }
    login(service, policy, settings).await
}

async fn login(service: &CourseService, policy: &RetryPolicy, settings: &Settings) -> Result<Session> {
    let credentials = credentials(settings)?;
    info!(base_url = %settings.base_url, "Logging in");
    with_retry!(
        policy,
        "login",
        service.login(&credentials, &settings.base_url),
        classify = classify_login_error
    )
    .context("Login failed")
}

/// Writes `file` under `dir` without overwriting existing files.
async fn save_file(dir: &Path, file: &DownloadedFile) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let path = resolve_unique_path(dir, &file.file_name);
    tokio::fs::write(&path, &file.bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), bytes = file.len(), "Saved file");
    Ok(path)
}

fn credentials(settings: &Settings) -> Result<Credentials> {
    let Some(username) = settings.username.as_deref() else {
        bail!(
            "No username configured\n  Suggestion: Pass --username, set MOODLE_USERNAME, or add username to the config file"
        );
    };
    let Some(password) = settings.password.as_deref() else {
        bail!("No password given\n  Suggestion: Pass --password or set MOODLE_PASSWORD");
    };
    Ok(Credentials::new(username, password))
}
