mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, FavoritesCommands};
use medley::error::Error;
use medley::media::{MediaItem, MediaKind};
use medley::search::{PageOutcome, SearchFilters};
use medley::{config::MedleyConfig, Medley};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let config = MedleyConfig::load()?;
    let medley = Medley::init(config).await?;

    if let Err(e) = run(&medley, cli.command).await {
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
    Ok(())
}

async fn run(medley: &Medley, command: Commands) -> Result<(), Error> {
    match command {
        Commands::Login { email, password } => {
            if medley.auth().login_with_credentials(&email, &password).await? {
                // favorites become loadable once the user is known
                medley.favorites().load().await?;
                if let Some(user) = medley.current_user() {
                    println!("Logged in as {} <{}>", user.username, user.email);
                }
            } else {
                println!("Login failed; please check your credentials.");
            }
        }
        Commands::Logout => {
            medley.auth().logout();
            println!("Logged out.");
        }
        Commands::Register { username, email, password } => {
            medley.auth().register(&username, &email, &password).await?;
            println!("Account created. Check your inbox to verify your email.");
        }
        Commands::Whoami => match medley.current_user() {
            Some(user) => println!("{} <{}>", user.username, user.email),
            None => println!("Not logged in."),
        },
        Commands::UpdatePassword { current, new, confirm } => {
            medley.auth().update_password(&current, &new, &confirm).await?;
            println!("Password updated.");
        }
        Commands::ForgotPassword { email } => {
            let message = medley.auth().forgot_password(&email).await?;
            println!("{message}");
        }
        Commands::ResetPassword { token, password, confirm } => {
            medley.auth().reset_password(&token, &password, &confirm).await?;
            println!("Password reset. You can log in now.");
        }
        Commands::VerifyEmail { token } => {
            medley.auth().verify_email(&token).await?;
            println!("Email verified.");
        }
        Commands::Search { query, videos, orientation, color, min_width, pages } => {
            let kind = if videos { MediaKind::Video } else { MediaKind::Image };
            let filters = if videos {
                SearchFilters::default()
            } else {
                SearchFilters { orientation, color, min_width }
            };
            search_pages(medley, &query, kind, filters, pages).await?;
        }
        Commands::Trending { pages } => {
            let mut shown = 0usize;
            for page in 1..=pages {
                let (items, has_more) = medley.trending(page).await?;
                for item in &items {
                    shown += 1;
                    print_item(medley, shown, item);
                }
                if !has_more {
                    break;
                }
            }
        }
        Commands::Keywords => {
            for keyword in medley.trending_keywords().await? {
                println!("{keyword}");
            }
        }
        Commands::Favorites { command } => match command {
            FavoritesCommands::List => {
                let records = medley.favorites().records();
                if records.is_empty() {
                    println!("No favorites yet.");
                }
                for (i, record) in records.iter().enumerate() {
                    print_item(medley, i + 1, &record.media);
                }
            }
            FavoritesCommands::Toggle { query, videos, index } => {
                let kind = if videos { MediaKind::Video } else { MediaKind::Image };
                medley.search().begin(&query, kind, SearchFilters::default());
                medley.search().load_next_page().await?;
                let results = medley.search().results();
                let Some(item) = results.get(index) else {
                    println!("No result at index {index}.");
                    return Ok(());
                };
                match medley.favorites().toggle(item).await? {
                    medley::favorites::Toggle::Added(record) => {
                        println!("Favorited {} (id {})", item.id, record.id);
                    }
                    medley::favorites::Toggle::Removed(id) => {
                        println!("Removed favorite {id}");
                    }
                }
            }
        },
    }
    Ok(())
}

/// Drive the search session through up to `pages` pages, printing as they
/// accumulate.
async fn search_pages(
    medley: &Medley,
    query: &str,
    kind: MediaKind,
    filters: SearchFilters,
    pages: u32,
) -> Result<(), Error> {
    medley.search().begin(query, kind, filters);
    let mut shown = 0usize;
    for _ in 0..pages {
        match medley.search().load_next_page().await? {
            PageOutcome::Appended { .. } => {
                let results = medley.search().results();
                for item in &results[shown..] {
                    shown += 1;
                    print_item(medley, shown, item);
                }
            }
            PageOutcome::NoMatches => {
                println!("No results found. Try different keywords.");
                return Ok(());
            }
            PageOutcome::Exhausted => break,
            PageOutcome::EmptyQuery => {
                println!("Nothing to search for.");
                return Ok(());
            }
            PageOutcome::Busy | PageOutcome::Stale => {}
        }
        if !medley.search().has_more() {
            break;
        }
    }
    Ok(())
}

fn print_item(medley: &Medley, index: usize, item: &MediaItem) {
    let marker = if medley.favorites().is_favorited(&item.id) { "*" } else { " " };
    let label = if item.alt_description.is_empty() { "(untitled)" } else { &item.alt_description };
    println!(
        "{marker} {index:>3}. [{}] {} by {} ({})",
        item.kind(),
        label,
        item.author_name,
        item.urls.display_url()
    );
}
