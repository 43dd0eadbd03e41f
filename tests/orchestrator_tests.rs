// Integration tests for the interactive and unattended rename workflows

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use plex_watch::Error;
use plex_watch::orchestrator::{Orchestrator, RunMode};
use plex_watch::prompt::{NoPrompt, ScriptedPrompt};
use plex_watch::rename_engine::RenameJob;
use tempfile::TempDir;

struct Fixture {
    _root: TempDir,
    source: PathBuf,
    destination: PathBuf,
}

impl Fixture {
    fn new(files: &[&str]) -> Self {
        let root = TempDir::new().unwrap();
        let source = root.path().join("download");
        let destination = root.path().join("library").join("Show (2020)").join("Season 01");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&destination).unwrap();
        for file in files {
            let path = source.join(file);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            File::create(path).unwrap();
        }
        Self {
            _root: root,
            source,
            destination,
        }
    }

    fn job(&self, season: &str) -> RenameJob {
        RenameJob::new(&self.source, &self.destination, "Show", season).unwrap()
    }

    fn destination_files(&self) -> Vec<String> {
        list(&self.destination)
    }
}

fn list(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

fn run_interactive(fixture: &Fixture, season: &str, answers: &[&str]) -> (Result<usize, Error>, ScriptedPrompt) {
    let mut prompt = ScriptedPrompt::new(answers.iter().copied());
    let result = Orchestrator::new(RunMode::Interactive, &mut prompt)
        .unwrap()
        .run(&fixture.job(season))
        .map(|report| report.moved.len());
    (result, prompt)
}

#[test]
fn test_confirm_each_file() {
    let fixture = Fixture::new(&["Show [01].mkv", "Show [02].mkv"]);
    let (result, prompt) = run_interactive(&fixture, "Season 01", &["y", "y"]);

    assert_eq!(result.unwrap(), 2);
    assert_eq!(fixture.destination_files(), vec!["Show S01E01.mkv", "Show S01E02.mkv"]);
    assert_eq!(prompt.remaining(), 0);
    assert!(prompt.messages.iter().any(|m| m.contains("Old: Show [01].mkv")));
}

#[test]
fn test_correct_with_episode_number() {
    let fixture = Fixture::new(&["Show [05].en.ass"]);
    let (result, _prompt) = run_interactive(&fixture, "Season 01", &["n", "6"]);

    assert_eq!(result.unwrap(), 1);
    assert_eq!(fixture.destination_files(), vec!["Show S01E06.en.ass"]);
}

#[test]
fn test_correct_with_whole_filename() {
    let fixture = Fixture::new(&["Show [05].mkv"]);
    let (result, prompt) = run_interactive(&fixture, "Season 01", &["n", "Show S01E05 Director's Cut.mkv"]);

    assert_eq!(result.unwrap(), 1);
    assert_eq!(fixture.destination_files(), vec!["Show S01E05 Director's Cut.mkv"]);
    // a correction is not confirmed again
    assert_eq!(prompt.questions.len(), 2);
}

#[test]
fn test_accept_all_moves_current_and_remaining_files() {
    let fixture = Fixture::new(&["Show [01].mkv", "Show [02].mkv", "Show [03].mkv"]);
    let (result, prompt) = run_interactive(&fixture, "Season 01", &["A"]);

    assert_eq!(result.unwrap(), 3);
    assert_eq!(prompt.questions.len(), 1);
    assert_eq!(
        fixture.destination_files(),
        vec!["Show S01E01.mkv", "Show S01E02.mkv", "Show S01E03.mkv"]
    );
}

#[test]
fn test_quit_aborts_without_moving() {
    let fixture = Fixture::new(&["Show [01].mkv", "Show [02].mkv"]);
    let (result, _prompt) = run_interactive(&fixture, "Season 01", &["q"]);

    assert!(matches!(result, Err(Error::Quit)));
    assert!(fixture.destination_files().is_empty());
    assert_eq!(list(&fixture.source).len(), 2);
}

#[test]
fn test_unmatched_file_asks_for_episode() {
    let fixture = Fixture::new(&["notes.txt"]);
    let (result, prompt) = run_interactive(&fixture, "Season 01", &["3", "y"]);

    assert_eq!(result.unwrap(), 1);
    assert_eq!(fixture.destination_files(), vec!["Show S01E03.txt"]);
    assert!(prompt.messages.iter().any(|m| m == "Could not find episode number for notes.txt"));
}

#[test]
fn test_non_numeric_episode_is_rejected() {
    let fixture = Fixture::new(&["notes.txt"]);
    let (result, _prompt) = run_interactive(&fixture, "Season 01", &["three"]);

    assert!(matches!(result, Err(Error::InvalidEpisode(_))));
}

#[test]
fn test_nested_directories_use_callers_season() {
    let fixture = Fixture::new(&["batch/Show [01].mkv", "batch/Season 09/Show [02].mkv"]);
    let mut prompt = NoPrompt;
    let report = Orchestrator::new(RunMode::Unattended, &mut prompt)
        .unwrap()
        .run(&fixture.job("Season 01"))
        .unwrap();

    assert_eq!(report.moved.len(), 2);
    assert_eq!(fixture.destination_files(), vec!["Show S01E01.mkv", "Show S01E02.mkv"]);
}

#[test]
fn test_unattended_uses_lenient_language_threshold() {
    let fixture = Fixture::new(&["Show [01].chs.ass", "Show [01].en.ass"]);
    let mut prompt = NoPrompt;
    Orchestrator::new(RunMode::Unattended, &mut prompt)
        .unwrap()
        .run(&fixture.job("Season 01"))
        .unwrap();

    assert_eq!(fixture.destination_files(), vec!["Show S01E01.ass", "Show S01E01.en.ass"]);
}

#[test]
fn test_interactive_missing_destination_is_fatal() {
    let fixture = Fixture::new(&["Show [01].mkv"]);
    fs::remove_dir(&fixture.destination).unwrap();
    let (result, _prompt) = run_interactive(&fixture, "Season 01", &["y"]);

    assert!(matches!(result, Err(Error::DestinationMissing(_))));
    assert_eq!(list(&fixture.source), vec!["Show [01].mkv"]);
}
