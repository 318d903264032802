use clap::{Parser, Subcommand};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::Utc;
use tracing_subscriber::EnvFilter;

use softcenter::catalog::{self, Category, Software, SoftwareDraft, Tutorial};
use softcenter::config;
use softcenter::richtext::commands::TutorialEditor;
use softcenter::richtext::structured_document::DocumentPosition;
use softcenter::stats::{self, UsageEvent};
use softcenter::store::dir::DirStore;
use softcenter::store::{SoftwareStore, TutorialStore, UsageLog};
use softcenter::uploads::{self, FileBlob, StorageKeys};
use softcenter::votes::{VoteBox, VoteKind, VoteState};

#[derive(Parser, Debug)]
#[command(name = "softcenter")]
#[command(about = "A university software center", long_about = None)]
#[command(arg_required_else_help = true)]
struct Args {
    /// Override the data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List software, optionally filtered by a search query
    Apps {
        /// Case-insensitive search over name, description and publisher
        query: Option<String>,
        /// Only show software in this category
        #[arg(long)]
        category: Option<String>,
    },
    /// Show details for one software package
    App {
        /// Software id
        id: String,
    },
    /// Record a download and print the download URL
    Download {
        /// Software id
        id: String,
    },
    /// Replace a software package's installer binary
    SetInstaller {
        /// Software id
        id: String,
        /// Path to the installer file
        file: PathBuf,
    },
    /// List tutorials grouped by category
    Tutorials {
        /// Case-insensitive search over titles
        query: Option<String>,
    },
    /// Show a tutorial
    Tutorial {
        /// Tutorial id
        id: String,
    },
    /// Edit a tutorial's content in $EDITOR
    Edit {
        /// Tutorial id
        id: String,
    },
    /// Insert an image file at the end of a tutorial
    AttachImage {
        /// Tutorial id
        id: String,
        /// Path to the image file
        file: PathBuf,
    },
    /// Like or dislike a tutorial
    Vote {
        /// Tutorial id
        id: String,
        /// "like" or "dislike"
        kind: String,
    },
    /// Show dashboard statistics
    Stats,
    /// Create sample catalog data
    Seed,
}

fn get_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| "vim".to_string())
}

fn guess_mime(path: &Path) -> String {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png".to_string(),
        Some("jpg" | "jpeg") => "image/jpeg".to_string(),
        Some("gif") => "image/gif".to_string(),
        Some("webp") => "image/webp".to_string(),
        Some("svg") => "image/svg+xml".to_string(),
        _ => "application/octet-stream".to_string(),
    }
}

fn read_blob(path: &Path) -> Result<FileBlob, String> {
    let bytes =
        fs::read(path).map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file")
        .to_string();
    Ok(FileBlob::new(name, guess_mime(path), bytes))
}

fn vote_label(state: VoteState) -> &'static str {
    match state {
        VoteState::None => "no vote",
        VoteState::Liked => "liked",
        VoteState::Disliked => "disliked",
    }
}

fn print_software_line(software: &Software) {
    println!(
        "{}  {} {} [{}] by {}",
        software.id, software.name, software.version, software.category, software.publisher
    );
}

fn cmd_apps(
    query: Option<String>,
    category: Option<String>,
    store: &DirStore,
) -> Result<(), String> {
    stats::track(store, UsageEvent::page_view("apps"));

    let all = store.list_software().map_err(|e| e.to_string())?;
    let mut shown: Vec<&Software> = match &query {
        Some(query) => catalog::search_software(&all, query),
        None => all.iter().collect(),
    };
    if let Some(category) = &category {
        shown.retain(|s| s.category.eq_ignore_ascii_case(category));
    }

    if shown.is_empty() {
        println!("No software found.");
        return Ok(());
    }
    for software in shown {
        print_software_line(software);
    }
    Ok(())
}

fn cmd_app(id: &str, store: &DirStore) -> Result<(), String> {
    let software = match store.get_software(id) {
        Ok(software) => software,
        Err(err) if err.is_not_found() => {
            println!("Software not found.");
            return Ok(());
        }
        Err(err) => return Err(err.to_string()),
    };

    println!("{} {}", software.name, software.version);
    println!("Publisher:    {}", software.publisher);
    println!("Category:     {}", software.category);
    println!("Size:         {}", software.size);
    println!("Released:     {}", software.release_date);
    match &software.download_url {
        Some(url) => println!("Download:     {}", url),
        None => println!("Download:     (none)"),
    }
    if !software.screenshots.is_empty() {
        println!("Screenshots:  {}", software.screenshots.join(", "));
    }
    println!();
    println!("{}", software.description);
    Ok(())
}

fn cmd_download(id: &str, store: &DirStore) -> Result<(), String> {
    let software = match store.get_software(id) {
        Ok(software) => software,
        Err(err) if err.is_not_found() => {
            println!("Software not found.");
            return Ok(());
        }
        Err(err) => return Err(err.to_string()),
    };

    let Some(url) = &software.download_url else {
        return Err(format!("'{}' has no download link", software.name));
    };

    stats::track(store, UsageEvent::software_download(&software.id));
    println!("{}", url);
    Ok(())
}

fn cmd_set_installer(id: &str, file: &Path, store: &DirStore) -> Result<(), String> {
    let mut software = store.get_software(id).map_err(|e| e.to_string())?;
    let blob = read_blob(file)?;
    let keys = StorageKeys::new();

    uploads::replace_installer(&mut software, store, &keys, &blob)
        .map_err(|e| format!("Installer upload failed: {}", e))?;
    store.save_software(&software).map_err(|e| e.to_string())?;

    match &software.download_url {
        Some(url) => println!("Installer stored, download URL: {}", url),
        None => println!("Installer stored."),
    }
    Ok(())
}

fn cmd_tutorials(query: Option<String>, store: &DirStore) -> Result<(), String> {
    let all = store.list_tutorials().map_err(|e| e.to_string())?;
    let categories = store.list_tutorial_categories().map_err(|e| e.to_string())?;

    let shown: Vec<Tutorial> = match &query {
        Some(query) => catalog::search_tutorials(&all, query)
            .into_iter()
            .cloned()
            .collect(),
        None => all,
    };

    if shown.is_empty() {
        println!("No tutorials found.");
        return Ok(());
    }

    for (name, members) in catalog::group_tutorials_by_category(&shown, &categories) {
        println!("{}:", name);
        for tutorial in members {
            println!(
                "  {}  {} ({} min)",
                tutorial.id,
                tutorial.title,
                tutorial.reading_time_minutes()
            );
        }
        println!();
    }
    Ok(())
}

fn cmd_tutorial(id: &str, store: &DirStore) -> Result<(), String> {
    let tutorial = match store.get_tutorial(id) {
        Ok(tutorial) => tutorial,
        Err(err) if err.is_not_found() => {
            println!("Tutorial not found.");
            return Ok(());
        }
        Err(err) => return Err(err.to_string()),
    };

    stats::track(store, UsageEvent::tutorial_view(&tutorial.id));

    println!("{}", tutorial.title);
    println!(
        "{} min read, {} likes, {} dislikes, updated {}",
        tutorial.reading_time_minutes(),
        tutorial.likes,
        tutorial.dislikes,
        tutorial.updated_at.format("%Y-%m-%d")
    );
    println!();
    println!("{}", tutorial.content);
    Ok(())
}

fn cmd_edit(id: &str, store: &DirStore) -> Result<(), String> {
    let mut tutorial = store.get_tutorial(id).map_err(|e| e.to_string())?;

    let mut doc = TutorialEditor::from_markup(&tutorial.content);
    let temp_path = env::temp_dir().join(format!("softcenter-edit-{}.md", tutorial.id));
    fs::write(&temp_path, doc.serialize())
        .map_err(|e| format!("Failed to write temp file: {}", e))?;

    let editor = get_editor();
    let status = Command::new(&editor)
        .arg(&temp_path)
        .status()
        .map_err(|e| format!("Failed to open editor '{}': {}", editor, e))?;
    if !status.success() {
        return Err(format!("Editor exited with status: {}", status));
    }

    let edited = fs::read_to_string(&temp_path)
        .map_err(|e| format!("Failed to read edited file: {}", e))?;
    fs::remove_file(&temp_path).ok();

    // Round-trip the text through the document model so what we store
    // is exactly what the editor will reproduce
    doc.replace_content(&edited);
    tutorial.content = doc.serialize();
    tutorial.touch();
    store
        .save_tutorial(&tutorial)
        .map_err(|e| format!("Failed to save tutorial: {}", e))?;

    println!("Saved '{}'", tutorial.title);
    Ok(())
}

fn cmd_attach_image(id: &str, file: &Path, store: &DirStore) -> Result<(), String> {
    let mut tutorial = store.get_tutorial(id).map_err(|e| e.to_string())?;
    let blob = read_blob(file)?;
    let keys = StorageKeys::new();

    let mut doc = TutorialEditor::from_markup(&tutorial.content);
    let last = doc.document().block_count().saturating_sub(1);
    let end = doc.document().blocks()[last].text_len();
    doc.set_cursor(DocumentPosition::new(last, end));

    let url = uploads::ingest_image(&mut doc, store, &keys, &blob)
        .map_err(|e| format!("Image not inserted: {}", e))?;

    tutorial.content = doc.serialize();
    tutorial.touch();
    store
        .save_tutorial(&tutorial)
        .map_err(|e| format!("Failed to save tutorial: {}", e))?;

    println!("Inserted {}", url);
    Ok(())
}

fn cmd_vote(id: &str, kind: &str, store: &DirStore) -> Result<(), String> {
    let kind = match kind {
        "like" => VoteKind::Like,
        "dislike" => VoteKind::Dislike,
        other => {
            return Err(format!(
                "Unknown vote '{}', expected 'like' or 'dislike'",
                other
            ));
        }
    };

    let mut vote = VoteBox::open(store, store, id).map_err(|e| e.to_string())?;
    let state = vote
        .click(kind)
        .map_err(|e| format!("Vote not counted: {}", e))?;

    println!(
        "{} likes, {} dislikes (you: {})",
        vote.likes(),
        vote.dislikes(),
        vote_label(state)
    );
    Ok(())
}

fn cmd_stats(store: &DirStore) -> Result<(), String> {
    let events = store.events().map_err(|e| e.to_string())?;
    let software = store.list_software().map_err(|e| e.to_string())?;
    let tutorials = store.list_tutorials().map_err(|e| e.to_string())?;

    let stats = stats::dashboard_stats(&events, software.len(), tutorials.len(), Utc::now());
    println!(
        "Visits:          {} today / {} last 7 days / {} last 30 days",
        stats.visits_today, stats.visits_week, stats.visits_month
    );
    println!("Software:        {}", stats.software_count);
    println!("Tutorials:       {}", stats.tutorial_count);
    println!("Downloads:       {}", stats.downloads);
    println!("Tutorial views:  {}", stats.tutorial_views);
    Ok(())
}

fn cmd_seed(store: &DirStore) -> Result<(), String> {
    let networking = Category::new("Networking");
    let office = Category::new("Office");
    store
        .save_tutorial_category(&networking)
        .map_err(|e| e.to_string())?;
    store
        .save_tutorial_category(&office)
        .map_err(|e| e.to_string())?;

    for name in ["Statistics", "Graphics", "Networking"] {
        store
            .save_software_category(&Category::new(name))
            .map_err(|e| e.to_string())?;
    }

    let packages = [
        SoftwareDraft {
            name: "MATLAB".to_string(),
            description: "Numerical computing environment for engineering courses".to_string(),
            category: "Statistics".to_string(),
            publisher: "MathWorks".to_string(),
            version: "R2024a".to_string(),
            size: "21 GB".to_string(),
            release_date: "2024-03-20".to_string(),
            download_url: Some("https://downloads.example.edu/matlab-r2024a.iso".to_string()),
            ..Default::default()
        },
        SoftwareDraft {
            name: "GIMP".to_string(),
            description: "Free and open source image editor".to_string(),
            category: "Graphics".to_string(),
            publisher: "GIMP Team".to_string(),
            version: "2.10.38".to_string(),
            size: "250 MB".to_string(),
            release_date: "2024-05-05".to_string(),
            download_url: Some("https://downloads.example.edu/gimp-2.10.38.exe".to_string()),
            ..Default::default()
        },
        SoftwareDraft {
            name: "eduVPN".to_string(),
            description: "VPN client for secure access to the campus network".to_string(),
            category: "Networking".to_string(),
            publisher: "The Commons Conservancy".to_string(),
            version: "3.4".to_string(),
            size: "40 MB".to_string(),
            release_date: "2024-01-15".to_string(),
            ..Default::default()
        },
    ];
    let software_count = packages.len();
    for draft in packages {
        store
            .save_software(&Software::create(draft))
            .map_err(|e| e.to_string())?;
    }

    let mut vpn = Tutorial::new(
        "VPN Setup",
        "# VPN Setup\n\nThe campus VPN gives you access to licensed software and \
         journals from home.\n\n1. Download the **eduVPN** client\n\n2. Sign in with \
         your university account\n\n3. Choose the *Full tunnel* profile\n\n> Contact \
         the helpdesk if your account is locked.",
    );
    vpn.category_id = Some(networking.id.clone());
    store.save_tutorial(&vpn).map_err(|e| e.to_string())?;

    let mut eduroam = Tutorial::new(
        "Eduroam WiFi",
        "# Eduroam WiFi\n\nEduroam works at every participating university.\n\n- Use \
         your full university mail address as the login\n\n- Install the \
         [configuration tool](https://cat.eduroam.org)\n\n- Forget and re-add the \
         network after a password change",
    );
    eduroam.category_id = Some(networking.id.clone());
    store.save_tutorial(&eduroam).map_err(|e| e.to_string())?;

    let mut citations = Tutorial::new(
        "Citing with Word",
        "# Citing with Word\n\nWord's built-in citation manager covers the common \
         styles.\n\nPick a style under *References*, then **Insert Citation** for \
         every source you quote.",
    );
    citations.category_id = Some(office.id.clone());
    store.save_tutorial(&citations).map_err(|e| e.to_string())?;

    println!("Seeded {} software packages and 3 tutorials", software_count);
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let data_dir = config::resolve_data_dir(args.data_dir.clone());

    let store = match DirStore::open(&data_dir) {
        Ok(store) => store,
        Err(err) => {
            eprintln!(
                "Error: failed to open data directory '{}': {}",
                data_dir.display(),
                err
            );
            std::process::exit(1);
        }
    };

    let result = match args.command {
        Commands::Apps { query, category } => cmd_apps(query, category, &store),
        Commands::App { id } => cmd_app(&id, &store),
        Commands::Download { id } => cmd_download(&id, &store),
        Commands::SetInstaller { id, file } => cmd_set_installer(&id, &file, &store),
        Commands::Tutorials { query } => cmd_tutorials(query, &store),
        Commands::Tutorial { id } => cmd_tutorial(&id, &store),
        Commands::Edit { id } => cmd_edit(&id, &store),
        Commands::AttachImage { id, file } => cmd_attach_image(&id, &file, &store),
        Commands::Vote { id, kind } => cmd_vote(&id, &kind, &store),
        Commands::Stats => cmd_stats(&store),
        Commands::Seed => cmd_seed(&store),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
