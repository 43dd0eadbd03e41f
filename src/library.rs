use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::orchestrator::{Orchestrator, RunMode};
use crate::prompt::Prompt;
use crate::rename_engine::RenameJob;

/// Show name as used in filenames plus the library folder it lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowInfo {
    pub show_name: String,
    /// `Show (2020)` or `Show (2020) [tvdb-123456]`
    pub folder_name: String,
}

impl ShowInfo {
    pub fn new(show_name: &str, year: &str, db_id: Option<&str>) -> Result<Self> {
        let year = year.trim();
        if year.is_empty() || !year.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::InvalidYear(year.to_string()));
        }

        let mut folder_name = format!("{show_name} ({year})");
        if let Some(id) = db_id.map(str::trim).filter(|id| !id.is_empty()) {
            folder_name = format!("{folder_name} [{id}]");
        }

        Ok(Self {
            show_name: show_name.to_string(),
            folder_name,
        })
    }

    pub fn season_dir(&self, library_root: &Path, season_name: &str) -> PathBuf {
        library_root.join(&self.folder_name).join(season_name)
    }
}

/// Ask the operator for whatever show metadata is not known yet.
pub fn collect_show_info<P: Prompt + ?Sized>(prompt: &mut P, show_name: Option<&str>) -> Result<ShowInfo> {
    let show_name = match show_name {
        Some(name) => name.to_string(),
        None => prompt.ask("Please enter the show name: ")?,
    };
    let year = prompt.ask("Please enter the show year: ")?;

    let force_id = prompt.ask("Force db id? [y/n]")?;
    let db_id = if force_id.trim().eq_ignore_ascii_case("y") {
        Some(prompt.ask("Please enter db show id: i.e tvdb-123456, anidb-12345, tmdb-xxxx")?)
    } else {
        None
    };

    ShowInfo::new(&show_name, &year, db_id.as_deref())
}

/// Create `<root>/<show folder>/<season>` and interactively move `source` into it.
pub fn populate_season<P: Prompt + ?Sized>(
    prompt: &mut P,
    source: &Path,
    library_root: &Path,
    show: &ShowInfo,
    season_name: &str,
) -> Result<PathBuf> {
    let destination = show.season_dir(library_root, season_name);
    let job = RenameJob::new(source, &destination, &show.show_name, season_name)?;

    prompt.tell(&format!("Copied files will be saved in {}", destination.display()));
    fs::create_dir_all(&destination)?;
    tracing::info!(
        source = %source.display(),
        destination = %destination.display(),
        show = %show.show_name,
        season = %season_name,
        "populating season"
    );

    let report = Orchestrator::new(RunMode::Interactive, &mut *prompt)?.run(&job)?;
    tracing::info!(destination = %destination.display(), moved = report.moved.len(), "season populated");

    Ok(destination)
}

/// First-time population of a whole download. A source whose top level
/// holds directories is treated as one season per directory.
pub fn populate_library<P: Prompt + ?Sized>(
    prompt: &mut P,
    source: &Path,
    library_root: &Path,
    show: &ShowInfo,
) -> Result<Vec<PathBuf>> {
    if !source.is_dir() {
        return Err(Error::SourceMissing(source.to_path_buf()));
    }

    let mut season_dirs: Vec<PathBuf> = fs::read_dir(source)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect();
    season_dirs.sort();

    prompt.tell(&format!("Show folder name: {}", show.folder_name));

    if season_dirs.is_empty() {
        let season_name = prompt.ask("Please enter the season name: i.e Season 01, Specials, Extras")?;
        let destination = populate_season(prompt, source, library_root, show, season_name.trim())?;
        return Ok(vec![destination]);
    }

    prompt.tell("Multiple seasons found now processing each directory");
    let mut destinations = Vec::with_capacity(season_dirs.len());
    for dir in &season_dirs {
        let folder = dir
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let season_name = prompt.ask(&format!(
            "Processing {folder}, please enter the season name: i.e Season 01, Specials, Extras"
        ))?;
        destinations.push(populate_season(prompt, dir, library_root, show, season_name.trim())?);
    }

    Ok(destinations)
}

/// Remove directories below `root` that are empty once their children are
/// gone. `root` itself is kept. Returns how many were removed.
pub fn remove_empty_dirs(root: &Path) -> Result<usize> {
    let mut removed = 0;

    for entry in WalkDir::new(root).min_depth(1).contents_first(true) {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        if fs::read_dir(entry.path())?.next().is_none() {
            fs::remove_dir(entry.path())?;
            tracing::info!(dir = %entry.path().display(), "removed empty directory");
            removed += 1;
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompt;
    use pretty_assertions::assert_eq;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_show_info_folder_name() {
        assert_eq!(
            ShowInfo::new("Show", "2020", None).unwrap().folder_name,
            "Show (2020)"
        );
        assert_eq!(
            ShowInfo::new("Show", "2020", Some("tvdb-123456")).unwrap().folder_name,
            "Show (2020) [tvdb-123456]"
        );
        assert!(matches!(ShowInfo::new("Show", "20x0", None), Err(Error::InvalidYear(_))));
    }

    #[test]
    fn test_collect_show_info_with_db_id() {
        let mut prompt = ScriptedPrompt::new(["Koukyuu no Karasu", "2022", "y", "anidb-16932"]);
        let info = collect_show_info(&mut prompt, None).unwrap();

        assert_eq!(info.show_name, "Koukyuu no Karasu");
        assert_eq!(info.folder_name, "Koukyuu no Karasu (2022) [anidb-16932]");
    }

    #[test]
    fn test_collect_show_info_known_name() {
        let mut prompt = ScriptedPrompt::new(["2019", "n"]);
        let info = collect_show_info(&mut prompt, Some("Show")).unwrap();
        assert_eq!(info.folder_name, "Show (2019)");
        assert_eq!(prompt.remaining(), 0);
    }

    #[test]
    fn test_populate_library_one_season_per_directory() {
        let root = TempDir::new().unwrap();
        let source = root.path().join("download");
        let library = root.path().join("library");
        fs::create_dir_all(source.join("s1")).unwrap();
        fs::create_dir_all(source.join("sp")).unwrap();
        File::create(source.join("s1").join("Show [01].mkv")).unwrap();
        File::create(source.join("sp").join("Show OVA.mkv")).unwrap();

        let show = ShowInfo::new("Show", "2020", None).unwrap();
        let mut prompt = ScriptedPrompt::new(["Season 01", "y", "Specials", "1", "y"]);
        let destinations = populate_library(&mut prompt, &source, &library, &show).unwrap();

        assert_eq!(
            destinations,
            vec![
                library.join("Show (2020)").join("Season 01"),
                library.join("Show (2020)").join("Specials"),
            ]
        );
        assert!(destinations[0].join("Show S01E01.mkv").is_file());
        assert!(destinations[1].join("Show S00E01.mkv").is_file());
    }

    #[test]
    fn test_remove_empty_dirs_keeps_root() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("a").join("b")).unwrap();
        fs::create_dir_all(root.path().join("c")).unwrap();
        File::create(root.path().join("c").join("keep.txt")).unwrap();

        assert_eq!(remove_empty_dirs(root.path()).unwrap(), 2);
        assert!(root.path().is_dir());
        assert!(!root.path().join("a").exists());
        assert!(root.path().join("c").join("keep.txt").is_file());
    }
}
