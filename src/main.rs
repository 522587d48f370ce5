use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use moodtune::capture::{CaptureError, DisplaySink, Frame, ReplayLog};
use moodtune::config::AppConfig;
use moodtune::emotion::{Emotion, FaceBox};
use moodtune::knowledge::MusicKnowledge;
use moodtune::observer::Observation;
use moodtune::prefs::{self, PreferenceProfile, PreferenceStore};
use moodtune::selector::RecommendationSet;
use moodtune::youtube::{SearchResult, YouTubeClient};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "moodtune", version, about = "Emotion-aware music recommender")]
struct Cli {
    /// Path to the preference file
    #[arg(long, global = true)]
    prefs_path: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a capture log, detect the majority emotion, and recommend music
    Observe {
        /// Capture log to replay (JSONL; "-" reads stdin)
        replay: PathBuf,

        /// Observation window in seconds (defaults to config observe_secs)
        #[arg(long)]
        secs: Option<u64>,

        /// Also search YouTube for matching music videos
        #[arg(long)]
        search: bool,

        /// YouTube API key (overrides config)
        #[arg(long)]
        api_key: Option<String>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Seed for the random picks (reproducible output)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Recommend music for an emotion without observing
    Recommend {
        /// Emotion label (happy, sad, angry, neutral, surprise, fear, disgust)
        emotion: Emotion,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Seed for the random picks (reproducible output)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Search YouTube for music videos matching an emotion
    Search {
        /// Emotion label (happy, sad, angry, neutral, surprise, fear, disgust)
        emotion: Emotion,

        /// YouTube API key (overrides config)
        #[arg(long)]
        api_key: Option<String>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or edit the saved preference profile
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },

    /// Print the emotion-to-music knowledge table
    Profiles,
}

#[derive(Subcommand)]
enum PrefsAction {
    /// Print the current profile
    Show,

    /// Update the profile (each flag replaces that list wholesale)
    Set {
        /// Favorite genres, comma-separated
        #[arg(long, value_delimiter = ',')]
        favorite_genres: Option<Vec<String>>,

        /// Disliked genres, comma-separated
        #[arg(long, value_delimiter = ',')]
        disliked_genres: Option<Vec<String>>,

        /// Favorite artists, comma-separated
        #[arg(long, value_delimiter = ',')]
        favorite_artists: Option<Vec<String>>,

        /// Preferred tempo range in BPM, e.g. "90-140"
        #[arg(long)]
        tempo: Option<String>,
    },

    /// Reset the profile to empty defaults
    Clear,
}

/// JSON payload for `observe --json`.
#[derive(Serialize)]
struct ObserveReport {
    majority: Option<Emotion>,
    frames_seen: u64,
    samples: usize,
    recommendations: Option<RecommendationSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    videos: Option<SearchResult>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = AppConfig::load();

    // Validate the static emotion-music table before any command runs
    let knowledge = MusicKnowledge::builtin().context("Invalid emotion-music table")?;

    // Resolve preference path: CLI > config > XDG default
    let prefs_path = cli
        .prefs_path
        .or_else(|| config.prefs_path.clone())
        .unwrap_or_else(PreferenceStore::default_path);
    log::info!("Preferences: {}", prefs_path.display());
    let store = PreferenceStore::new(prefs_path);

    match cli.command {
        Commands::Observe { replay, secs, search, api_key, json, seed } => {
            let profile = store.load().context("Failed to load preferences")?;
            let capture_log = load_replay(&replay)?;
            if capture_log.is_empty() {
                log::warn!("Capture log {} has no frames", replay.display());
            }
            let (mut frames, mut detector) = capture_log.into_parts();

            let secs = secs.unwrap_or(config.observe_secs);
            let mut display = TerminalDisplay::new();
            let observation = moodtune::observer::observe(
                &mut frames,
                &mut detector,
                Some(&mut display),
                Duration::from_secs(secs),
            )
            .context("Observation failed")?;
            display.finish();

            let mut rng = make_rng(seed);
            let recommendations = observation
                .majority
                .map(|emotion| RecommendationSet::generate(emotion, &knowledge, &profile, &mut rng));
            let videos = match (&recommendations, search) {
                (Some(set), true) => {
                    let client = youtube_client(&config, api_key)?;
                    Some(client.search_for_emotion(set.emotion, &knowledge, &profile))
                }
                _ => None,
            };

            if json {
                let report = ObserveReport {
                    majority: observation.majority,
                    frames_seen: observation.frames_seen,
                    samples: observation.samples,
                    recommendations,
                    videos,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            print_observation(&observation);
            match recommendations {
                Some(set) => {
                    println!();
                    print_recommendations(&set);
                }
                None => {
                    println!("No consistent emotion detected. Try a longer window or better lighting.");
                    return Ok(());
                }
            }
            if let Some(result) = videos {
                println!();
                print_videos(&result);
            }
        }

        Commands::Recommend { emotion, json, seed } => {
            let profile = store.load().context("Failed to load preferences")?;
            let mut rng = make_rng(seed);
            let set = RecommendationSet::generate(emotion, &knowledge, &profile, &mut rng);

            if json {
                println!("{}", serde_json::to_string_pretty(&set)?);
                return Ok(());
            }
            if set.recommendations.is_empty() {
                if knowledge.profile(emotion).is_none() {
                    println!(
                        "No music profile for \"{emotion}\". Covered emotions: {}.",
                        covered_list(&knowledge)
                    );
                } else {
                    println!("All {emotion} genres are on your disliked list. Nothing to recommend.");
                }
                return Ok(());
            }
            print_recommendations(&set);
        }

        Commands::Search { emotion, api_key, json } => {
            let profile = store.load().context("Failed to load preferences")?;
            if knowledge.profile(emotion).is_none() {
                println!(
                    "No music profile for \"{emotion}\". Covered emotions: {}.",
                    covered_list(&knowledge)
                );
                return Ok(());
            }

            let client = youtube_client(&config, api_key)?;
            let result = client.search_for_emotion(emotion, &knowledge, &profile);
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_videos(&result);
            }
        }

        Commands::Prefs { action } => match action {
            PrefsAction::Show => {
                let profile = store.load().context("Failed to load preferences")?;
                println!("Preference file: {}", store.path().display());
                println!();
                print_profile(&profile);
            }

            PrefsAction::Set { favorite_genres, disliked_genres, favorite_artists, tempo } => {
                let mut profile = store.load().context("Failed to load preferences")?;
                if let Some(genres) = favorite_genres {
                    profile.favorite_genres = clean_list(genres);
                }
                if let Some(genres) = disliked_genres {
                    profile.disliked_genres = clean_list(genres);
                }
                if let Some(artists) = favorite_artists {
                    profile.favorite_artists = clean_list(artists);
                }
                if let Some(ref range) = tempo {
                    profile.preferred_tempo_range = Some(prefs::parse_tempo_range(range)?);
                }
                store.save(&profile).context("Failed to save preferences")?;
                println!("Saved {}", store.path().display());
                println!();
                print_profile(&profile);
            }

            PrefsAction::Clear => {
                store
                    .save(&PreferenceProfile::default())
                    .context("Failed to save preferences")?;
                println!("Preferences cleared.");
            }
        },

        Commands::Profiles => {
            for emotion in knowledge.covered_emotions() {
                let Some(music) = knowledge.profile(emotion) else {
                    continue;
                };
                println!(
                    "{emotion} ({}-{} BPM)",
                    music.tempo_range.0, music.tempo_range.1
                );
                println!("  Keywords: {}", music.mood_keywords.join(", "));
                println!("  Themes:   {}", music.playlist_themes.join(", "));
                println!("  Search:   {}", music.search_terms.join(", "));
                for genre in &music.genres {
                    let artists = music
                        .artists_by_genre
                        .get(genre)
                        .map(|a| a.join(", "))
                        .unwrap_or_default();
                    println!("    {:<20} {}", genre, artists);
                }
                println!();
            }
        }
    }

    Ok(())
}

/// Spinner standing in for the live preview: ticks once per frame and shows
/// the latest detection.
struct TerminalDisplay {
    bar: ProgressBar,
}

impl TerminalDisplay {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}").unwrap(),
        );
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl DisplaySink for TerminalDisplay {
    fn show(&mut self, frame: &Frame, face: Option<&FaceBox>) -> Result<(), CaptureError> {
        self.bar.inc(1);
        match face {
            Some(face) => self.bar.set_message(format!(
                "frame {}: face {}x{} at ({}, {})",
                frame.index, face.width, face.height, face.x, face.y
            )),
            None => self.bar.set_message(format!("frame {}: no face", frame.index)),
        }
        Ok(())
    }
}

/// Read a capture log from a file, or stdin when the path is "-".
fn load_replay(path: &Path) -> Result<ReplayLog> {
    if path.as_os_str() == "-" {
        let stdin = io::stdin();
        return ReplayLog::read(stdin.lock()).context("Failed to read capture log from stdin");
    }
    let file = File::open(path)
        .with_context(|| format!("Failed to open capture log {}", path.display()))?;
    ReplayLog::read(BufReader::new(file))
        .with_context(|| format!("Failed to parse capture log {}", path.display()))
}

/// Seeded for reproducible picks, OS entropy otherwise.
fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Build the YouTube client, requiring an API key from the CLI or config.
fn youtube_client(config: &AppConfig, cli_key: Option<String>) -> Result<YouTubeClient> {
    let Some(key) = cli_key.or_else(|| config.youtube.api_key.clone()) else {
        anyhow::bail!(
            "No YouTube API key. Add [youtube] api_key to the config file or pass --api-key."
        );
    };
    Ok(YouTubeClient::new(key, config.youtube.rate_limit_ms))
}

fn clean_list(items: Vec<String>) -> BTreeSet<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn covered_list(knowledge: &MusicKnowledge) -> String {
    knowledge
        .covered_emotions()
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_observation(observation: &Observation) {
    println!(
        "Observed {} frames in {:.1}s ({} with a face)",
        observation.frames_seen,
        observation.elapsed.as_secs_f64(),
        observation.samples
    );
    if observation.samples > 0 {
        let breakdown: Vec<String> = Emotion::ALL
            .iter()
            .zip(observation.counts)
            .filter(|(_, count)| *count > 0)
            .map(|(emotion, count)| format!("{emotion} x{count}"))
            .collect();
        println!("Breakdown: {}", breakdown.join(", "));
    }
    if let Some(emotion) = observation.majority {
        println!("Detected emotion: {emotion}");
    }
}

fn print_recommendations(set: &RecommendationSet) {
    println!("Music for your {} mood:", set.emotion);
    println!();
    for rec in &set.recommendations {
        println!("{}", rec.genre);
        println!("  Artists:  {}", rec.artists.join(", "));
        println!("  Mood:     {}", rec.mood_keywords.join(", "));
        println!("  Tempo:    ~{} BPM", rec.suggested_tempo);
        println!("  Playlist: {}", rec.playlist_theme);
        println!();
    }
}

fn print_videos(result: &SearchResult) {
    if result.videos.is_empty() {
        println!("No videos found for \"{}\".", result.emotion);
        if result.terms_failed > 0 {
            println!(
                "({} of {} search terms failed)",
                result.terms_failed, result.terms_searched
            );
        }
        return;
    }

    println!("Top videos for your {} mood:", result.emotion);
    println!();
    println!(
        "{:<45} {:<20} {:>12} {:>9}",
        "Title", "Channel", "Views", "Likes"
    );
    println!("{}", "-".repeat(89));

    for video in &result.videos {
        println!(
            "{:<45} {:<20} {:>12} {:>9}",
            truncate(&video.title, 45),
            truncate(&video.channel, 20),
            group_digits(video.views),
            group_digits(video.likes),
        );
        println!("  {}", video.url);
    }

    if result.terms_failed > 0 {
        println!();
        println!(
            "Partial results: {} of {} search terms failed.",
            result.terms_failed, result.terms_searched
        );
    }
}

fn print_profile(profile: &PreferenceProfile) {
    if profile.is_empty() {
        println!("No preferences set.");
        return;
    }
    println!("Favorite genres:  {}", join_or_none(&profile.favorite_genres));
    println!("Disliked genres:  {}", join_or_none(&profile.disliked_genres));
    println!("Favorite artists: {}", join_or_none(&profile.favorite_artists));
    match profile.preferred_tempo_range {
        Some((low, high)) => println!("Tempo range:      {low}-{high} BPM"),
        None => println!("Tempo range:      (unset)"),
    }
}

fn join_or_none(set: &BTreeSet<String>) -> String {
    if set.is_empty() {
        "(none)".to_string()
    } else {
        set.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
    }
}

/// Truncate long display strings on a char boundary.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}

/// Insert thousands separators: 1234567 → "1,234,567".
fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
