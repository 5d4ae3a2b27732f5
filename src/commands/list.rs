use crate::error::Result;
use crate::storage::{get_meta, query_summaries};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Profile info extracted from a database file
pub struct ProfileInfo {
    pub path: PathBuf,
    pub queries: usize,
    pub samples: u64,
    pub created: String,
}

/// Find all profile databases in a directory
pub fn find_profiles(dir: &Path) -> Result<Vec<ProfileInfo>> {
    let mut profiles = Vec::new();

    let entries = std::fs::read_dir(dir)?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().map(|e| e == "db").unwrap_or(false)
            && let Ok(info) = get_profile_info(&path)
        {
            profiles.push(info);
        }
    }

    // Most recent first
    profiles.sort_by(|a, b| b.created.cmp(&a.created));

    Ok(profiles)
}

/// Get the most recent profile in a directory
pub fn most_recent_profile(dir: &Path) -> Result<Option<PathBuf>> {
    let profiles = find_profiles(dir)?;
    Ok(profiles.into_iter().next().map(|p| p.path))
}

/// Extract metadata from a profile database; fails for non-profile files
fn get_profile_info(path: &Path) -> Result<ProfileInfo> {
    let conn = Connection::open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let summaries = query_summaries(&conn)?;
    let created = get_meta(&conn, "created")?.unwrap_or_else(|| "unknown".to_string());

    Ok(ProfileInfo {
        path: path.to_path_buf(),
        queries: summaries.len(),
        samples: summaries.iter().map(|s| s.samples).sum(),
        created,
    })
}

/// Run the list command
pub fn run(dir: Option<&Path>) -> Result<()> {
    let search_dir = dir.unwrap_or_else(|| Path::new("."));
    let profiles = find_profiles(search_dir)?;

    if profiles.is_empty() {
        println!("No profiles found in {}", search_dir.display());
        return Ok(());
    }

    println!(
        "{:<40} {:>8} {:>12} {:<25}",
        "FILE", "QUERIES", "SAMPLES", "CREATED"
    );
    println!("{}", "-".repeat(88));

    for profile in profiles {
        let filename = profile
            .path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        println!(
            "{:<40} {:>8} {:>12} {:<25}",
            filename, profile.queries, profile.samples, profile.created
        );
    }

    Ok(())
}
