//! Instruction queue: one documentation request per input line, processed
//! strictly one at a time.

use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::VecDeque;

use crate::corpus::SourceFile;
use crate::documents::OutputFormat;
use crate::error::Result;
use crate::llm::CompletionBackend;
use crate::pipeline::{DocumentationPipeline, FinalDocument, PipelineState};

static FORMAT_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*\[(markdown|pdf|word|html|zip)\]\s*$").unwrap()
});

/// A single user instruction and the format its answer is exported in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Text sent to the model, without the format tag
    pub text: String,
    pub format: OutputFormat,
}

impl Instruction {
    /// Parses one line; a trailing `[markdown|pdf|word|html|zip]` picks the format
    ///
    /// Returns `None` for lines with nothing to ask.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (text, format) = match FORMAT_TAG.captures(line) {
            Some(caps) => {
                let format = OutputFormat::from_tag(&caps[1]).unwrap_or_default();
                let start = caps.get(0).map(|m| m.start()).unwrap_or(line.len());
                (line[..start].trim(), format)
            }
            None => (line, OutputFormat::Markdown),
        };
        if text.is_empty() {
            return None;
        }
        Some(Self { text: text.to_string(), format })
    }
}

/// Result of one queued instruction
#[derive(Debug)]
pub struct QueueOutcome {
    pub instruction: Instruction,
    pub result: Result<FinalDocument>,
}

/// FIFO of pending instructions with at most one in flight
#[derive(Debug, Default)]
pub struct InstructionQueue {
    pending: VecDeque<Instruction>,
    in_flight: bool,
}

impl InstructionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// One instruction per non-blank line of `input`
    pub fn from_input(input: &str) -> Self {
        let mut queue = Self::new();
        for instruction in input.lines().filter_map(Instruction::parse) {
            queue.push(instruction);
        }
        queue
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.pending.push_back(instruction);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// Marks the head as in flight and returns it
    ///
    /// Returns `None` while another instruction is still running or when
    /// the queue is empty.
    pub fn begin_next(&mut self) -> Option<&Instruction> {
        if self.in_flight {
            return None;
        }
        let head = self.pending.front()?;
        self.in_flight = true;
        Some(head)
    }

    /// Removes the in-flight instruction, pairing it with its outcome
    pub fn complete<T>(&mut self, outcome: T) -> Option<(Instruction, T)> {
        if !self.in_flight {
            return None;
        }
        self.in_flight = false;
        self.pending.pop_front().map(|instruction| (instruction, outcome))
    }

    /// Runs every pending instruction in order against `files`
    ///
    /// A failed instruction is recorded and the next one still runs.
    /// `observe` sees each pipeline state together with the instruction it
    /// belongs to.
    pub async fn run_all<B, F>(
        &mut self,
        pipeline: &DocumentationPipeline<B>,
        files: &[SourceFile],
        model: Option<&str>,
        mut observe: F,
    ) -> Vec<QueueOutcome>
    where
        B: CompletionBackend,
        F: FnMut(&Instruction, &PipelineState) + Send,
    {
        let mut outcomes = Vec::with_capacity(self.len());
        while let Some(current) = self.begin_next().cloned() {
            info!("Running instruction ({} left): {}", self.len(), current.text);
            let result = pipeline
                .run_observed(files, &current.text, model, |state| observe(&current, state))
                .await;
            if let Err(e) = &result {
                warn!("Instruction failed: {}", e);
            }
            if let Some((instruction, result)) = self.complete(result) {
                outcomes.push(QueueOutcome { instruction, result });
            }
        }
        outcomes
    }
}
