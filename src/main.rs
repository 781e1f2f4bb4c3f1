use anistream::{
    AbortSignal, AniStream, AnimeDetail, Config, ListedAnime, ProgressEvent, ServerResource,
};
use clap::{ArgAction, Parser, Subcommand};
use dialoguer::Select;
use futures::StreamExt;
use humansize::{DECIMAL, format_size};
use serde::Serialize;
use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "anistream", version)]
#[command(about = "Browse anime from a streaming site with AniList metadata and download episodes")]
struct Cli {
    /// Root URL of the streaming site
    #[arg(long, global = true)]
    site_url: Option<String>,

    /// AniList GraphQL endpoint
    #[arg(long, global = true)]
    catalog_url: Option<String>,

    /// Minimum title similarity (0.0-1.0) for a catalog match
    #[arg(long, global = true)]
    threshold: Option<f64>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the site's top ten
    Top,

    /// Show the latest episode updates
    Latest,

    /// Show the most popular anime in all of the given genres
    Genre {
        #[arg(required = true)]
        genres: Vec<String>,
    },

    /// Search the site
    Search { keyword: String },

    /// Show an anime with its episodes
    Anime {
        /// Anime slug or path, e.g. one-piece or /anime/one-piece/
        anime_id: String,
    },

    /// List the video servers of an episode
    Servers {
        /// Episode path as shown by the anime command
        video_id: String,
    },

    /// Download an episode
    Download {
        /// Episode path as shown by the anime command
        video_id: String,

        /// File to write the video to
        #[arg(short, long)]
        output: PathBuf,

        /// Server number as shown by the servers command; asks when omitted
        #[arg(short, long)]
        server: Option<usize>,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("anistream={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles progress events and prints them to stderr
fn handle_progress_event(event: ProgressEvent) {
    match event {
        ProgressEvent::FetchingPage { anime_id } => {
            eprintln!("Fetching anime page {}...", anime_id);
        }
        ProgressEvent::PageFetched {
            title,
            episode_count,
        } => {
            eprintln!("Found '{}' with {} episode(s) on the site", title, episode_count);
        }
        ProgressEvent::ResolvingTitle { title } => {
            eprintln!("Looking up '{}' in the catalog...", title);
        }
        ProgressEvent::TitleResolved { catalog_id, .. } => {
            eprintln!("Matched catalog entry #{}", catalog_id);
        }
        ProgressEvent::FetchingDetail { .. } => {
            eprintln!("Fetching catalog details...");
        }
        ProgressEvent::Reconciled {
            episode_count,
            is_movie,
        } => {
            if is_movie {
                eprintln!("Reconciled {} episode(s), movie or special\n", episode_count);
            } else {
                eprintln!("Reconciled {} episode(s)\n", episode_count);
            }
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn show_listing(listed: &[ListedAnime], json: bool) -> Result<(), Box<dyn Error>> {
    if json {
        return print_json(&listed);
    }

    if listed.is_empty() {
        println!("No anime found.");
        return Ok(());
    }

    for (index, anime) in listed.iter().enumerate() {
        let year = anime
            .summary
            .year
            .map(|y| format!(" ({})", y))
            .unwrap_or_default();
        let score = anime
            .summary
            .average_score
            .map(|s| format!(" [{}%]", s))
            .unwrap_or_default();
        println!("{:>2}. {}{}{}", index + 1, anime.summary.title, year, score);
        println!("    {}", anime.anime_id);
    }
    Ok(())
}

fn print_anime(anime: &AnimeDetail) {
    let detail = &anime.detail;
    println!("=== {} ===", detail.title);

    if let Some(status) = detail.status {
        println!("Status:   {:?}", status);
    }
    if let Some(start) = detail.start_date {
        match detail.end_date {
            Some(end) => println!("Aired:    {} to {}", start, end),
            None => println!("Aired:    {}", start),
        }
    }
    if let Some(minutes) = detail.duration_minutes {
        println!("Duration: {} min per episode", minutes);
    }
    if !detail.genres.is_empty() {
        println!("Genres:   {}", detail.genres.join(", "));
    }
    if !detail.studios.is_empty() {
        println!("Studios:  {}", detail.studios.join(", "));
    }
    if !detail.description.is_empty() {
        println!("\n{}", detail.description);
    }

    println!();
    if let Some(movie_id) = &anime.movie_id {
        println!("Movie: {}", movie_id);
    }
    for (index, episode) in anime.episodes.iter().enumerate() {
        println!("{:>4}. {}", index + 1, episode.title);
        println!("      {}", episode.video_id);
    }
}

fn print_servers(servers: &[ServerResource]) {
    if servers.is_empty() {
        println!("No servers found.");
        return;
    }

    for (index, server) in servers.iter().enumerate() {
        println!("{:>2}. {}", index + 1, server.name);
    }
}

/// Picks a server by its 1-based number, or asks interactively
fn choose_server(servers: &[ServerResource], number: Option<usize>) -> Result<usize, Box<dyn Error>> {
    if servers.is_empty() {
        return Err("the episode offers no servers".into());
    }

    match number {
        Some(n) if (1..=servers.len()).contains(&n) => Ok(n - 1),
        Some(n) => Err(format!("server {} does not exist, choose 1 to {}", n, servers.len()).into()),
        None => {
            let names: Vec<&str> = servers.iter().map(|s| s.name.as_str()).collect();
            Ok(Select::new()
                .with_prompt("Select a server")
                .items(&names)
                .default(0)
                .interact()?)
        }
    }
}

async fn download(
    app: &AniStream,
    video_id: &str,
    output: &Path,
    server: Option<usize>,
) -> Result<(), Box<dyn Error>> {
    let servers = app.server_list(video_id).await?;
    let server = &servers[choose_server(&servers, server)?];

    // Ctrl-C cancels both the resolution and the transfer
    let signal = AbortSignal::new();
    let watcher = {
        let signal = signal.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                signal.abort();
            }
        })
    };

    eprintln!("Opening stream from {}...", server.name);
    let mut handle = app.open_stream_with_signal(server, signal.clone()).await?;
    let total = handle.content_length();
    let mut file = tokio::fs::File::create(output).await?;
    let mut written: u64 = 0;

    while let Some(chunk) = handle.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;

        match total {
            Some(total) if total > 0 => eprint!(
                "\r{} / {} ({:.1}%)   ",
                format_size(written, DECIMAL),
                format_size(total, DECIMAL),
                written as f64 * 100.0 / total as f64
            ),
            _ => eprint!("\r{}   ", format_size(written, DECIMAL)),
        }
        std::io::stderr().flush()?;
    }
    file.flush().await?;
    watcher.abort();
    eprintln!();

    if signal.is_aborted() {
        return Err(format!(
            "download aborted after {}, partial file left at {}",
            format_size(written, DECIMAL),
            output.display()
        )
        .into());
    }

    eprintln!("Saved {} to {}", format_size(written, DECIMAL), output.display());
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = Config::from_env()?;
    if let Some(site_url) = cli.site_url {
        config.site.base_url = site_url;
    }
    if let Some(catalog_url) = cli.catalog_url {
        config.catalog.endpoint = catalog_url;
    }
    if let Some(threshold) = cli.threshold {
        config.matching.similarity_threshold = threshold;
    }

    let app = AniStream::from_config(&config)?;

    match cli.command {
        Command::Top => show_listing(&app.top_anime().await?, cli.json)?,
        Command::Latest => show_listing(&app.latest_updates().await?, cli.json)?,
        Command::Genre { genres } => show_listing(&app.top_by_genre(&genres).await?, cli.json)?,
        Command::Search { keyword } => show_listing(&app.search(&keyword).await?, cli.json)?,
        Command::Anime { anime_id } => {
            let anime = if cli.json {
                app.get_anime(&anime_id).await?
            } else {
                app.get_anime_with_progress(&anime_id, handle_progress_event)
                    .await?
            };
            if cli.json {
                print_json(&anime)?;
            } else {
                print_anime(&anime);
            }
        }
        Command::Servers { video_id } => {
            let servers = app.server_list(&video_id).await?;
            if cli.json {
                print_json(&servers)?;
            } else {
                print_servers(&servers);
            }
        }
        Command::Download {
            video_id,
            output,
            server,
        } => download(&app, &video_id, &output, server).await?,
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("\nError: {}", e);
        process::exit(1);
    }
}
