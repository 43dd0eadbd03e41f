use std::fs;
use std::path::PathBuf;

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::prompt::Prompt;
use crate::rename_engine::{EpisodeNumber, LangTagThreshold, RenameDecision, RenameEngine, RenameJob};

const CONFIRM_QUESTION: &str = "Is this correct? [y/n/A(ll)/q(uit)]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// First-time population, every rename is confirmed by the operator.
    Interactive,
    /// Watch refresh, nobody is there to answer.
    Unattended,
}

impl RunMode {
    fn lang_threshold(self) -> LangTagThreshold {
        match self {
            RunMode::Interactive => LangTagThreshold::Strict,
            RunMode::Unattended => LangTagThreshold::Lenient,
        }
    }

    fn initial_confirm(self) -> ConfirmMode {
        match self {
            RunMode::Interactive => ConfirmMode::ConfirmEach,
            RunMode::Unattended => ConfirmMode::AcceptAll,
        }
    }
}

/// Whether the next file still needs the operator's approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmMode {
    ConfirmEach,
    AcceptAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Response {
    Confirm,
    Correct,
    AcceptAll,
    Quit,
}

impl Response {
    fn parse(answer: &str) -> Option<Self> {
        match answer.trim().to_lowercase().as_str() {
            "y" => Some(Response::Confirm),
            "n" => Some(Response::Correct),
            "a" => Some(Response::AcceptAll),
            "q" => Some(Response::Quit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedFile {
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Debug, Default)]
pub struct MoveReport {
    pub moved: Vec<MovedFile>,
}

/// Walks a source tree and moves every file into the job's destination
/// under its canonical name.
pub struct Orchestrator<'p, P: Prompt + ?Sized> {
    engine: RenameEngine,
    mode: RunMode,
    prompt: &'p mut P,
}

impl<'p, P: Prompt + ?Sized> Orchestrator<'p, P> {
    pub fn new(mode: RunMode, prompt: &'p mut P) -> Result<Self> {
        Ok(Self {
            engine: RenameEngine::new(mode.lang_threshold())?,
            mode,
            prompt,
        })
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Process every regular file below `job.source`. Stops at the first
    /// fatal error; files moved before it stay moved.
    pub fn run(&mut self, job: &RenameJob) -> Result<MoveReport> {
        if !job.source.exists() {
            tracing::error!(source = %job.source.display(), show = %job.show_name, season = %job.season_name, "source does not exist");
            return Err(Error::SourceMissing(job.source.clone()));
        }

        let mut report = MoveReport::default();
        let mut confirm = self.mode.initial_confirm();

        for entry in WalkDir::new(&job.source).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let mut decision = self.engine.decide(entry.path(), job);
            if decision.new_name.is_none() {
                let episode = self.ask_episode(&decision, job)?;
                self.engine.apply_episode(&mut decision, job, episode);
            }

            if confirm == ConfirmMode::ConfirmEach {
                confirm = self.confirm(&mut decision, job)?;
            }

            report.moved.push(self.move_file(&decision, job)?);
        }

        Ok(report)
    }

    fn ask_episode(&mut self, decision: &RenameDecision, job: &RenameJob) -> Result<EpisodeNumber> {
        let file = &decision.original_name;
        if job.season.allows_extraction() {
            self.prompt.tell(&format!("Could not find episode number for {file}"));
        }

        match self.prompt.ask(&format!("Please enter the episode number for {file}")) {
            Ok(answer) => EpisodeNumber::parse_input(&answer),
            Err(Error::PromptUnavailable(_)) => {
                tracing::error!(
                    file = %file,
                    source = %job.source.display(),
                    show = %job.show_name,
                    season = %job.season_name,
                    "could not find episode number"
                );
                Err(Error::ExtractionFailed {
                    file: file.clone(),
                    source_dir: job.source.display().to_string(),
                    show: job.show_name.clone(),
                    season: job.season_name.clone(),
                })
            }
            Err(e) => Err(e),
        }
    }

    fn confirm(&mut self, decision: &mut RenameDecision, job: &RenameJob) -> Result<ConfirmMode> {
        let proposed = decision.new_name.clone().unwrap_or_default();
        self.prompt.show_rename(&decision.original_name, &proposed);

        loop {
            let answer = self.prompt.ask(CONFIRM_QUESTION)?;
            match Response::parse(&answer) {
                Some(Response::Confirm) => return Ok(ConfirmMode::ConfirmEach),
                Some(Response::Correct) => {
                    self.correct(decision, job)?;
                    return Ok(ConfirmMode::ConfirmEach);
                }
                Some(Response::AcceptAll) => {
                    tracing::info!(source = %job.source.display(), "accepting all remaining renames");
                    return Ok(ConfirmMode::AcceptAll);
                }
                Some(Response::Quit) => {
                    self.prompt.tell("Quitting");
                    tracing::info!(file = %decision.original_name, source = %job.source.display(), "operator quit");
                    return Err(Error::Quit);
                }
                None => continue,
            }
        }
    }

    /// Digits replace the episode number, anything else replaces the whole name.
    fn correct(&mut self, decision: &mut RenameDecision, job: &RenameJob) -> Result<()> {
        let answer = self.prompt.ask(&format!(
            "Please enter the episode number or the new file name for {}",
            decision.original_name
        ))?;
        let answer = answer.trim();

        if answer.is_empty() || answer.chars().all(|c| c.is_ascii_digit()) {
            let episode = EpisodeNumber::parse_input(answer)?;
            self.engine.apply_episode(decision, job, episode);
        } else {
            decision.new_name = Some(answer.to_string());
        }

        tracing::info!(
            file = %decision.original_name,
            new_name = decision.new_name.as_deref().unwrap_or_default(),
            "rename corrected by operator"
        );
        Ok(())
    }

    fn move_file(&mut self, decision: &RenameDecision, job: &RenameJob) -> Result<MovedFile> {
        let new_name = decision.new_name.as_deref().unwrap_or(&decision.original_name);
        let target = job.destination.join(new_name);
        let target_dir = target.parent().unwrap_or(&job.destination);

        if !target_dir.is_dir() {
            self.prompt.tell(&format!(
                "Failed moving, {} parent dir does not exist",
                target.display()
            ));
            tracing::error!(
                file = %decision.original_name,
                source = %job.source.display(),
                show = %job.show_name,
                season = %job.season_name,
                destination = %target_dir.display(),
                "destination does not exist"
            );
            return Err(Error::DestinationMissing(target_dir.to_path_buf()));
        }

        self.prompt.tell(&format!(
            "Moving {} to {}",
            decision.original_path.display(),
            target.display()
        ));
        tracing::info!(from = %decision.original_path.display(), to = %target.display(), "moving file");

        if let Err(e) = fs::rename(&decision.original_path, &target) {
            tracing::error!(
                file = %decision.original_name,
                source = %job.source.display(),
                show = %job.show_name,
                season = %job.season_name,
                error = %e,
                "move failed"
            );
            return Err(Error::Io(e));
        }

        Ok(MovedFile {
            from: decision.original_path.clone(),
            to: target,
        })
    }
}
