use clap::{Parser, Subcommand};

/// CLI front end for the medley media discovery client
#[derive(Parser)]
#[command(name = "medley")]
#[command(about = "Search, browse, and favorite images and videos", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Log out and clear the stored session
    Logout,
    /// Create a new account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Show the currently logged-in user
    Whoami,
    /// Change the account password
    UpdatePassword {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
        /// Must match --new
        #[arg(long)]
        confirm: String,
    },
    /// Request a password reset email
    ForgotPassword {
        #[arg(long)]
        email: String,
    },
    /// Complete a password reset with the emailed token
    ResetPassword {
        #[arg(long)]
        token: String,
        #[arg(long)]
        password: String,
        /// Must match --password
        #[arg(long)]
        confirm: String,
    },
    /// Verify an email address with the emailed token
    VerifyEmail {
        #[arg(long)]
        token: String,
    },
    /// Search for images or videos
    Search {
        /// Query text
        query: String,
        /// Search videos instead of images
        #[arg(long)]
        videos: bool,
        /// Image filter: landscape, portrait, or squarish
        #[arg(long)]
        orientation: Option<String>,
        /// Image filter: e.g. black_and_white, yellow, blue
        #[arg(long)]
        color: Option<String>,
        /// Image filter: minimum width in pixels
        #[arg(long)]
        min_width: Option<u32>,
        /// How many result pages to fetch
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Browse trending photos
    Trending {
        /// How many pages to fetch
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Show trending search keywords
    Keywords,
    /// Manage favorites
    Favorites {
        #[command(subcommand)]
        command: FavoritesCommands,
    },
}

#[derive(Subcommand)]
pub enum FavoritesCommands {
    /// List the logged-in user's favorites
    List,
    /// Toggle the favorite for a search result
    Toggle {
        /// Query text to search with
        #[arg(long)]
        query: String,
        /// Search videos instead of images
        #[arg(long)]
        videos: bool,
        /// Zero-based index into the first result page
        #[arg(long, default_value_t = 0)]
        index: usize,
    },
}
