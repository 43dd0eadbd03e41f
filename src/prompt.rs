use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use crossterm::style::Stylize;

use crate::error::{Error, Result};

/// Blocking question/answer channel to the operator.
pub trait Prompt {
    /// Print `question` and wait for one line of input, without the line ending.
    fn ask(&mut self, question: &str) -> Result<String>;

    /// Print an informational line; nothing is expected back.
    fn tell(&mut self, message: &str);

    /// Show a proposed rename.
    fn show_rename(&mut self, old_name: &str, new_name: &str) {
        self.tell(&format!("Renaming \n\tOld: {old_name} \n\tNew: {new_name}"));
    }
}

/// Operator at a terminal.
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompt<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Prompt for TerminalPrompt<R, W> {
    fn ask(&mut self, question: &str) -> Result<String> {
        writeln!(self.output, "{}", question.cyan())?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(Error::PromptUnavailable(question.to_string()));
        }

        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn tell(&mut self, message: &str) {
        if let Err(e) = writeln!(self.output, "{message}") {
            tracing::debug!(error = %e, message, "could not write to the terminal");
        }
    }

    fn show_rename(&mut self, old_name: &str, new_name: &str) {
        let written = writeln!(
            self.output,
            "Renaming \n\t{} {} \n\t{} {}",
            "Old:".red(),
            old_name,
            "New:".green(),
            new_name.bold()
        );
        if let Err(e) = written {
            tracing::debug!(error = %e, old_name, new_name, "could not write to the terminal");
        }
    }
}

/// Unattended runs: every question fails immediately instead of blocking.
#[derive(Debug, Default)]
pub struct NoPrompt;

impl Prompt for NoPrompt {
    fn ask(&mut self, question: &str) -> Result<String> {
        Err(Error::PromptUnavailable(question.to_string()))
    }

    fn tell(&mut self, message: &str) {
        println!("{message}");
    }
}

/// Answers queued in advance; used to drive interactive workflows without a terminal.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    pub questions: Vec<String>,
    pub messages: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            questions: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&mut self, question: &str) -> Result<String> {
        self.questions.push(question.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| Error::PromptUnavailable(question.to_string()))
    }

    fn tell(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}
