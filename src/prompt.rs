//! Operator interaction: pickers, confirmations and progress.

use std::io::{self, BufRead, Stderr, StdinLock, Write};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const PROGRESS_TEMPLATE: &str =
    "  Inserting  {bar:40.cyan/blue} {pos}/{len} rows [{elapsed_precise}, ETA {eta_precise}]";
const SPINNER_TEMPLATE: &str = "  Inserting  {spinner} {pos} rows [{elapsed_precise}]";

pub trait Prompter {
    /// Index of the chosen option.
    fn select_one(&mut self, prompt: &str, options: &[String]) -> io::Result<usize>;
    /// Indexes of the chosen options, ascending.
    fn select_many(&mut self, prompt: &str, options: &[String]) -> io::Result<Vec<usize>>;
    fn confirm(&mut self, prompt: &str, default: bool) -> io::Result<bool>;
    /// Starts progress reporting for `total` rows, when known.
    fn start_progress(&mut self, total: Option<u64>);
    /// Total rows inserted so far.
    fn report_progress(&mut self, count: usize);
    fn finish_progress(&mut self);
}

/// Line-oriented prompter; options are numbered from 1. Progress is an
/// `indicatif` bar on stderr.
pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
    draw_progress: bool,
    progress: Option<ProgressBar>,
}

impl TerminalPrompter<StdinLock<'static>, Stderr> {
    pub fn stdio() -> Self {
        let mut prompter = Self::new(io::stdin().lock(), io::stderr());
        prompter.draw_progress = true;
        prompter
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    /// The progress bar stays hidden for prompters built here.
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            draw_progress: false,
            progress: None,
        }
    }

    /// The bar currently reporting progress, if any.
    pub fn progress(&self) -> Option<&ProgressBar> {
        self.progress.as_ref()
    }

    fn ask(&mut self, question: &str) -> io::Result<String> {
        write!(self.output, "{question}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed while waiting for an answer",
            ));
        }
        Ok(line.trim().to_string())
    }

    fn list(&mut self, prompt: &str, options: &[String], marked: bool) -> io::Result<()> {
        if options.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("nothing to choose for '{prompt}'"),
            ));
        }
        writeln!(self.output, "{prompt}")?;
        for (idx, option) in options.iter().enumerate() {
            let mark = if marked { "[x] " } else { "" };
            writeln!(self.output, "  {:>3}) {mark}{option}", idx + 1)?;
        }
        Ok(())
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn select_one(&mut self, prompt: &str, options: &[String]) -> io::Result<usize> {
        self.list(prompt, options, false)?;
        loop {
            let answer = self.ask("> ")?;
            match parse_choice(&answer, options.len()) {
                Some(choice) => return Ok(choice),
                None => writeln!(
                    self.output,
                    "Enter a number between 1 and {}",
                    options.len()
                )?,
            }
        }
    }

    fn select_many(&mut self, prompt: &str, options: &[String]) -> io::Result<Vec<usize>> {
        self.list(prompt, options, true)?;
        loop {
            let answer = self.ask("numbers separated by commas, blank keeps all > ")?;
            if answer.is_empty() {
                return Ok((0..options.len()).collect());
            }
            let parsed: Option<Vec<usize>> = answer
                .split([',', ' '])
                .filter(|part| !part.is_empty())
                .map(|part| parse_choice(part, options.len()))
                .collect();
            match parsed {
                Some(mut choices) => {
                    choices.sort_unstable();
                    choices.dedup();
                    return Ok(choices);
                }
                None => writeln!(
                    self.output,
                    "Use numbers between 1 and {}",
                    options.len()
                )?,
            }
        }
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> io::Result<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            let answer = self.ask(&format!("{prompt} {hint} "))?;
            match answer.to_ascii_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.output, "Please answer y or n")?,
            }
        }
    }

    fn start_progress(&mut self, total: Option<u64>) {
        let target = if self.draw_progress {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };
        let (bar, template) = match total {
            Some(len) => (ProgressBar::with_draw_target(Some(len), target), PROGRESS_TEMPLATE),
            None => (ProgressBar::with_draw_target(None, target), SPINNER_TEMPLATE),
        };
        let style = ProgressStyle::with_template(template)
            .map(|style| style.progress_chars("##-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        if let Some(previous) = self.progress.replace(bar) {
            previous.abandon();
        }
    }

    fn report_progress(&mut self, count: usize) {
        if let Some(bar) = &self.progress {
            bar.set_position(count as u64);
        }
    }

    fn finish_progress(&mut self) {
        if let Some(bar) = self.progress.take() {
            bar.finish();
        }
    }
}

impl<R, W> Drop for TerminalPrompter<R, W> {
    fn drop(&mut self) {
        if let Some(bar) = self.progress.take() {
            bar.abandon();
        }
    }
}

fn parse_choice(answer: &str, len: usize) -> Option<usize> {
    match answer.trim().parse::<usize>() {
        Ok(choice) if (1..=len).contains(&choice) => Some(choice - 1),
        _ => None,
    }
}
