use colored::*;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, MultiSelect};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::error::{DocForgeError, Result};
use crate::pipeline::PipelineState;
use crate::queue::{Instruction, InstructionQueue};
use crate::sources::FileNode;

/// Prints a colorful banner at the start of the CLI.
pub fn print_banner() {
    println!("{}", "docforge".bold().green());
    println!("{}", "Documentation generated from your source code".bright_blue());
    println!("{}\n", "==============================================".bright_yellow());
}

pub fn print_info(message: &str) {
    println!("{}", message.green());
}

pub fn print_warning(message: &str) {
    println!("{}", message.yellow());
}

pub fn print_error(message: &str) {
    eprintln!("{}", message.red());
}

/// Prints a project tree, directories first
pub fn print_file_tree(nodes: &[FileNode]) {
    print_level(nodes, 0);
}

fn print_level(nodes: &[FileNode], depth: usize) {
    let indent = "  ".repeat(depth);
    for node in nodes {
        match &node.children {
            Some(children) => {
                println!("{}{}/", indent, node.label.bright_blue().bold());
                print_level(children, depth + 1);
            }
            None => println!("{}{}", indent, node.label),
        }
    }
}

/// Asks for instructions, one per line, until an empty line
///
/// Each line may end with `[markdown]`, `[pdf]`, `[word]`, `[html]` or `[zip]`.
pub fn prompt_instructions() -> Result<InstructionQueue> {
    let theme = ColorfulTheme::default();
    println!(
        "{}",
        "Write one instruction per line, optionally ending with [markdown], [pdf], [word], [html] or [zip]. Leave the line empty to finish."
            .bright_cyan()
    );

    let mut queue = InstructionQueue::new();
    loop {
        let line: String = Input::with_theme(&theme)
            .with_prompt(format!("Instruction {}", queue.len() + 1))
            .allow_empty(true)
            .interact_text()
            .map_err(|e| DocForgeError::new(&e.to_string()))?;
        if line.trim().is_empty() {
            break;
        }
        match Instruction::parse(&line) {
            Some(instruction) => queue.push(instruction),
            None => print_warning("Nothing to ask in that line, skipped"),
        }
    }
    Ok(queue)
}

/// Lets the user pick files; an empty pick means every supported file
pub fn select_files(files: &[String]) -> Result<Vec<String>> {
    if files.is_empty() {
        return Ok(Vec::new());
    }
    let theme = ColorfulTheme::default();
    let pick = Confirm::with_theme(&theme)
        .with_prompt("Pick individual files? (otherwise every supported file is analyzed)")
        .default(false)
        .interact()
        .map_err(|e| DocForgeError::new(&e.to_string()))?;
    if !pick {
        return Ok(Vec::new());
    }

    let chosen = MultiSelect::with_theme(&theme)
        .with_prompt("Files to analyze (space to toggle, enter to confirm)")
        .items(files)
        .interact()
        .map_err(|e| DocForgeError::new(&e.to_string()))?;
    Ok(chosen.into_iter().map(|i| files[i].clone()).collect())
}

/// Progress bar for one instruction, advanced by pipeline states
pub fn create_progress_bar(label: &str) -> ProgressBar {
    let pb = ProgressBar::new(1);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb.set_message(label.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Progress display for a queue run
///
/// A fresh bar starts on every `Collecting` state, which opens each run, so
/// repeated instructions never share a finished bar.
#[derive(Default)]
pub struct QueueProgress {
    current: Option<(String, ProgressBar)>,
    started: usize,
}

impl QueueProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forwards one state of `instruction` to its bar
    pub fn observe(&mut self, instruction: &Instruction, state: &PipelineState) {
        if self.current.is_none() || matches!(state, PipelineState::Collecting { .. }) {
            self.current = Some((instruction.text.clone(), create_progress_bar(&instruction.text)));
            self.started += 1;
        }
        if let Some((label, pb)) = &self.current {
            update_progress(pb, label, state);
        }
    }

    /// Number of bars started so far
    pub fn started(&self) -> usize {
        self.started
    }
}

/// Moves `pb` to reflect `state`
///
/// Multi-chunk requests count one extra step for the consolidation call.
pub fn update_progress(pb: &ProgressBar, label: &str, state: &PipelineState) {
    match state {
        PipelineState::Collecting { files } => {
            pb.set_message(format!("{} ({} file(s))", label, files));
        }
        PipelineState::Processing { chunk, total } => {
            let steps = if *total > 1 { total + 1 } else { *total };
            pb.set_length(steps as u64);
            pb.set_position((*chunk - 1) as u64);
            pb.set_message(format!("{}: part {} of {}", label, chunk, total));
        }
        PipelineState::Consolidating { partials } => {
            pb.set_position(*partials as u64);
            pb.set_message(format!("{}: consolidating", label));
        }
        PipelineState::Done { .. } => {
            pb.set_position(pb.length().unwrap_or(1));
            pb.finish_with_message(format!("{} {}", "[OK]".green(), label));
        }
        PipelineState::Failed { reason } => {
            pb.abandon_with_message(format!("{} {}: {}", "[ERROR]".red(), label, reason));
        }
    }
}
