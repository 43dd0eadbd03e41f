use std::fmt;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{Error, Result};

/// Release-name conventions for the episode number, highest priority first.
/// The first pattern that matches with a usable number wins, its first group is the episode.
const EPISODE_PATTERNS: [(&str, &str); 6] = [
    // Koukyuu no Karasu [02][Ma10p_1080p][x265_flac]
    ("bracketed", r"\[(\d+)\]"),
    ("dash", r"-\s(\d+)\s"),
    ("ep_token", r"EP(\d+)"),
    ("season_episode", r"S\d+E(\d+)"),
    ("spaced_prefix", r"\s(\d+)."),
    ("spaced", r"\s(\d+)\s"),
];

/// Season folder as given by the operator: "Season 01", "Specials" or "Extras".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeasonDescriptor {
    /// `label` is the second token of the descriptor, kept verbatim for the filename.
    Numbered { number: u32, label: String },
    Specials,
    Extras,
}

impl SeasonDescriptor {
    pub fn parse(season: &str) -> Result<Self> {
        let lower = season.to_lowercase();

        if lower.contains("season") {
            let label = season
                .split_whitespace()
                .nth(1)
                .ok_or_else(|| Error::InvalidSeason(season.to_string()))?;
            let number = label
                .parse::<u32>()
                .map_err(|_| Error::InvalidSeason(season.to_string()))?;
            Ok(SeasonDescriptor::Numbered {
                number,
                label: label.to_string(),
            })
        } else if lower.contains("special") {
            Ok(SeasonDescriptor::Specials)
        } else if lower.contains("extra") {
            Ok(SeasonDescriptor::Extras)
        } else {
            Err(Error::InvalidSeason(season.to_string()))
        }
    }

    /// The `Sxx` part of the canonical name.
    pub fn season_number(&self) -> &str {
        match self {
            SeasonDescriptor::Numbered { label, .. } => label,
            SeasonDescriptor::Specials | SeasonDescriptor::Extras => "00",
        }
    }

    /// Specials and extras never carry a guessable episode number.
    pub fn allows_extraction(&self) -> bool {
        matches!(self, SeasonDescriptor::Numbered { .. })
    }
}

/// How long a `.xx.ass` segment may be before it is treated as part of the
/// release name instead of a language code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LangTagThreshold {
    /// Tags of up to three characters are kept (interactive population).
    Strict,
    /// Only tags shorter than three characters are kept (watch refresh).
    Lenient,
}

impl LangTagThreshold {
    pub fn keeps(&self, tag: &str) -> bool {
        let len = tag.chars().count();
        match self {
            LangTagThreshold::Strict => len <= 3,
            LangTagThreshold::Lenient => len < 3,
        }
    }
}

/// Episode number as found in a filename or typed by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeNumber {
    value: u64,
    digits: String,
}

impl EpisodeNumber {
    /// ASCII or full-width decimal digits; `None` for anything else or when the
    /// number does not fit.
    pub fn from_digits(digits: &str) -> Option<Self> {
        let ascii = digits.chars().map(ascii_digit).collect::<Option<String>>()?;
        if ascii.is_empty() {
            return None;
        }
        let value = ascii.parse::<u64>().ok()?;
        Some(Self { value, digits: ascii })
    }

    /// Parse operator input, surrounding whitespace ignored.
    pub fn parse_input(input: &str) -> Result<Self> {
        Self::from_digits(input.trim()).ok_or_else(|| Error::InvalidEpisode(input.trim().to_string()))
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    /// Single digit episodes get a leading zero, everything else is left as found.
    pub fn padded(&self) -> String {
        if self.value < 10 {
            format!("0{}", self.value)
        } else {
            self.digits.clone()
        }
    }
}

fn ascii_digit(c: char) -> Option<char> {
    match c {
        '0'..='9' => Some(c),
        '\u{FF10}'..='\u{FF19}' => char::from_digit(c as u32 - 0xFF10, 10),
        _ => None,
    }
}

impl fmt::Display for EpisodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.padded())
    }
}

/// One source directory to rename into one destination directory.
#[derive(Debug, Clone)]
pub struct RenameJob {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub show_name: String,
    /// Descriptor exactly as the operator wrote it, used for logging.
    pub season_name: String,
    pub season: SeasonDescriptor,
}

impl RenameJob {
    pub fn new<S: AsRef<Path>, D: AsRef<Path>>(
        source: S,
        destination: D,
        show_name: &str,
        season_name: &str,
    ) -> Result<Self> {
        Ok(Self {
            source: source.as_ref().to_path_buf(),
            destination: destination.as_ref().to_path_buf(),
            show_name: show_name.to_string(),
            season_name: season_name.to_string(),
            season: SeasonDescriptor::parse(season_name)?,
        })
    }
}

/// Proposed rename for a single file.
#[derive(Debug, Clone)]
pub struct RenameDecision {
    pub original_path: PathBuf,
    pub original_name: String,
    pub episode: Option<EpisodeNumber>,
    /// `None` while no episode number is known.
    pub new_name: Option<String>,
}

#[derive(Debug)]
struct EpisodeRule {
    name: &'static str,
    pattern: Regex,
}

#[derive(Debug)]
pub struct RenameEngine {
    rules: Vec<EpisodeRule>,
    lang_threshold: LangTagThreshold,
}

impl RenameEngine {
    pub fn new(lang_threshold: LangTagThreshold) -> Result<Self> {
        let rules = EPISODE_PATTERNS
            .iter()
            .map(|&(name, pattern)| -> Result<EpisodeRule> {
                Ok(EpisodeRule {
                    name,
                    pattern: Regex::new(pattern)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rules,
            lang_threshold,
        })
    }

    pub fn lang_threshold(&self) -> LangTagThreshold {
        self.lang_threshold
    }

    /// First matching rule decides. A match whose digits cannot be read as a
    /// number falls through to the next rule.
    pub fn extract_episode(&self, filename: &str, season: &SeasonDescriptor) -> Option<EpisodeNumber> {
        if !season.allows_extraction() {
            return None;
        }

        for rule in &self.rules {
            if let Some(captures) = rule.pattern.captures(filename) {
                let Some(digits) = captures.get(1).map(|m| m.as_str()) else {
                    continue;
                };
                match EpisodeNumber::from_digits(digits) {
                    Some(episode) => {
                        tracing::debug!(file = filename, rule = rule.name, episode = digits, "episode rule matched");
                        return Some(episode);
                    }
                    None => {
                        tracing::debug!(file = filename, rule = rule.name, digits, "unusable episode digits, trying next rule");
                    }
                }
            }
        }

        None
    }

    /// `<show> S<season>E<episode>.<ext>`, with the language tag kept for `.ass` subtitles.
    pub fn canonical_name(
        &self,
        original_name: &str,
        show_name: &str,
        season: &SeasonDescriptor,
        episode: &EpisodeNumber,
    ) -> String {
        let stem = format!("{} S{}E{}", show_name, season.season_number(), episode.padded());
        let extension = file_extension(original_name);

        match subtitle_lang_tag(original_name) {
            Some(lang) if self.lang_threshold.keeps(lang) => format!("{stem}.{lang}.{extension}"),
            _ => format!("{stem}.{extension}"),
        }
    }

    pub fn decide(&self, path: &Path, job: &RenameJob) -> RenameDecision {
        let original_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let episode = self.extract_episode(&original_name, &job.season);
        let new_name = episode
            .as_ref()
            .map(|episode| self.canonical_name(&original_name, &job.show_name, &job.season, episode));

        RenameDecision {
            original_path: path.to_path_buf(),
            original_name,
            episode,
            new_name,
        }
    }

    /// Replace the episode number of a decision and rebuild its name.
    pub fn apply_episode(&self, decision: &mut RenameDecision, job: &RenameJob, episode: EpisodeNumber) {
        decision.new_name = Some(self.canonical_name(
            &decision.original_name,
            &job.show_name,
            &job.season,
            &episode,
        ));
        decision.episode = Some(episode);
    }
}

/// Everything after the last `.`; the whole name when there is none.
pub fn file_extension(filename: &str) -> &str {
    filename.rsplit('.').next().unwrap_or(filename)
}

/// The segment before `.ass`, if the file is an `.ass` subtitle.
pub fn subtitle_lang_tag(filename: &str) -> Option<&str> {
    let mut segments = filename.rsplit('.');
    match segments.next() {
        Some("ass") => segments.next(),
        _ => None,
    }
}
