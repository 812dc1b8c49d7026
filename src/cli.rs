//! CLI argument definitions using clap derive macros.

use std::fmt;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Log into a Moodle portal and list courses, sections and resources.
///
/// Settings come from flags, then environment variables, then
/// `$XDG_CONFIG_HOME/moodle-fetch/config.toml`.
#[derive(Parser)]
#[command(name = "moodle-fetch")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Portal base URL, e.g. https://elearning.example.edu
    #[arg(long, env = "MOODLE_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Login name
    #[arg(short, long, env = "MOODLE_USERNAME", global = true)]
    pub username: Option<String>,

    /// Login password
    #[arg(long, env = "MOODLE_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// Reuse a cookie header printed by `login` instead of logging in
    #[arg(long, env = "MOODLE_SESSION", hide_env_values = true, global = true)]
    pub session: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Maximum attempts for transient network failures (0-10)
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u8).range(0..=10), global = true)]
    pub max_retries: Option<u8>,

    #[command(subcommand)]
    pub command: Command,
}

// Password and session values stay out of debug logs.
impl fmt::Debug for Cli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cli")
            .field("verbose", &self.verbose)
            .field("quiet", &self.quiet)
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("session", &self.session.as_ref().map(|_| "[REDACTED]"))
            .field("json", &self.json)
            .field("max_retries", &self.max_retries)
            .field("command", &self.command)
            .finish()
    }
}

/// Portal operations.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Log in and print the session cookie header for reuse with --session
    Login,
    /// List courses on the dashboard
    Courses,
    /// Show sections and resources of one course
    Course {
        /// Numeric course id (from /course/view.php?id=...)
        id: String,
    },
    /// List courses in one category
    Category {
        /// Numeric category id (from /course/index.php?categoryid=...)
        id: String,
    },
    /// List the downloadable resources of one course
    Files {
        /// Numeric course id (from /course/view.php?id=...)
        id: String,
    },
    /// Download the file behind a resource link
    File {
        /// Resource view URL (/mod/resource/view.php?id=...) or pluginfile.php URL
        url: String,
        /// Directory the file is saved into
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
        /// Print the resolved file URL instead of downloading
        #[arg(long)]
        resolve_only: bool,
    },
}
