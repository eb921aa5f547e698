//! Command-line interface definitions for the news crawler.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! All arguments can be provided via command-line flags or environment variables.

use clap::Parser;

/// Command-line arguments for the crawler.
///
/// Box credentials are environment-only (see `Credentials::from_env`);
/// the flags here cover where output lands on disk and in the remote
/// folder tree.
///
/// # Examples
///
/// ```sh
/// # Defaults: ./out locally, folder 0 (root) remotely
/// newscrawler
///
/// # Archive into a dedicated folder and a custom local mirror
/// newscrawler -o ./archive --folder-id 318642975
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Local directory that mirrors the archived articles
    #[arg(short, long, env = "ARTICLES_DIR", default_value = "out")]
    pub out_dir: String,

    /// Box folder id to archive into
    #[arg(long, env = "BOX_FOLDER_ID", default_value = "0")]
    pub folder_id: String,
}
