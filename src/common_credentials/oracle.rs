//! Operator decisions for the common-credential pass.
//!
//! The resolver never talks to a terminal directly; it asks a
//! [`DecisionOracle`]. [`TerminalOracle`] prompts a human, [`DeclineOracle`]
//! answers "no" to everything, and [`ScriptedOracle`] plays back canned answers.

use std::collections::VecDeque;
use std::io::{self, BufRead, StdinLock, Stdout, Write};
use tracing::debug;

use crate::error::{VaultError, VaultResult};

/// A record as shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    /// Position in the group; the value `choose_index` returns
    pub index: usize,
    pub id: String,
    pub name: String,
    /// Sorted unique domains of the record's URIs
    pub domains: Vec<String>,
}

/// Answers the questions of the common-credential pass.
pub trait DecisionOracle {
    /// Show the records that share one credential.
    fn present_group(&mut self, members: &[GroupMember]) -> VaultResult<()>;

    /// Ask a yes/no question; `default` is used for an empty answer.
    fn ask_yes_no(&mut self, prompt: &str, default: bool) -> VaultResult<bool>;

    /// Ask for an index in `0..count`.
    fn choose_index(&mut self, prompt: &str, count: usize) -> VaultResult<usize>;
}

/// Interactive prompts on a line-based terminal.
pub struct TerminalOracle<R, W> {
    input: R,
    output: W,
}

impl TerminalOracle<StdinLock<'static>, Stdout> {
    /// Prompt on the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalOracle<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn read_answer(&mut self, prompt: &str) -> VaultResult<String> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(VaultError::Prompt("input closed before an answer was given".to_string()));
        }
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> DecisionOracle for TerminalOracle<R, W> {
    fn present_group(&mut self, members: &[GroupMember]) -> VaultResult<()> {
        let rows: Vec<[String; 4]> = members
            .iter()
            .map(|m| {
                let domains = if m.domains.is_empty() {
                    "<no uri>".to_string()
                } else {
                    m.domains.join(", ")
                };
                [m.index.to_string(), m.id.clone(), m.name.clone(), domains]
            })
            .collect();

        let header = ["Idx", "ID", "Name", "Domains"];
        let mut widths = header.map(|h| h.chars().count());
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        writeln!(self.output)?;
        writeln!(self.output, "Shared credentials")?;
        write_row(&mut self.output, &header.map(String::from), &widths)?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(self.output, "{}", rule.join("-+-"))?;
        for row in &rows {
            write_row(&mut self.output, row, &widths)?;
        }
        Ok(())
    }

    fn ask_yes_no(&mut self, prompt: &str, default: bool) -> VaultResult<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            let answer = self.read_answer(&format!("{} {}: ", prompt, hint))?;
            match answer.to_ascii_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.output, "Please answer y or n.")?,
            }
        }
    }

    fn choose_index(&mut self, prompt: &str, count: usize) -> VaultResult<usize> {
        if count == 0 {
            return Err(VaultError::Prompt("nothing to choose from".to_string()));
        }
        loop {
            let answer = self.read_answer(&format!("{} [0-{}]: ", prompt, count - 1))?;
            match answer.parse::<usize>() {
                Ok(index) if index < count => return Ok(index),
                _ => writeln!(self.output, "Please enter a number between 0 and {}.", count - 1)?,
            }
        }
    }
}

fn write_row<W: Write>(output: &mut W, cells: &[String; 4], widths: &[usize; 4]) -> io::Result<()> {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (cell, width))| {
            // Index column is right-aligned
            if i == 0 {
                format!("{:>width$}", cell, width = *width)
            } else {
                format!("{:<width$}", cell, width = *width)
            }
        })
        .collect();
    writeln!(output, "{}", padded.join(" | ").trim_end())
}

/// Declines every merge. Used for non-interactive runs, where only cached
/// decisions are applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclineOracle;

impl DecisionOracle for DeclineOracle {
    fn present_group(&mut self, members: &[GroupMember]) -> VaultResult<()> {
        debug!(entries = members.len(), "skipping shared-credential group without prompting");
        Ok(())
    }

    fn ask_yes_no(&mut self, _prompt: &str, _default: bool) -> VaultResult<bool> {
        Ok(false)
    }

    fn choose_index(&mut self, _prompt: &str, _count: usize) -> VaultResult<usize> {
        Ok(0)
    }
}

/// A canned answer for [`ScriptedOracle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    YesNo(bool),
    /// Take the prompt's default
    Default,
    Index(usize),
}

/// Plays back a fixed list of answers and records what it was asked.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOracle {
    answers: VecDeque<Answer>,
    /// Every prompt received, in order
    pub prompts: Vec<String>,
    /// Every group presented, in order
    pub groups: Vec<Vec<GroupMember>>,
}

impl ScriptedOracle {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Answers not consumed yet.
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next(&mut self, prompt: &str) -> VaultResult<Answer> {
        self.prompts.push(prompt.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| VaultError::Prompt(format!("no scripted answer for {:?}", prompt)))
    }
}

impl DecisionOracle for ScriptedOracle {
    fn present_group(&mut self, members: &[GroupMember]) -> VaultResult<()> {
        self.groups.push(members.to_vec());
        Ok(())
    }

    fn ask_yes_no(&mut self, prompt: &str, default: bool) -> VaultResult<bool> {
        match self.next(prompt)? {
            Answer::YesNo(answer) => Ok(answer),
            Answer::Default => Ok(default),
            Answer::Index(_) => Err(VaultError::Prompt(format!("expected yes/no answer for {:?}", prompt))),
        }
    }

    fn choose_index(&mut self, prompt: &str, count: usize) -> VaultResult<usize> {
        match self.next(prompt)? {
            Answer::Index(index) if index < count => Ok(index),
            other => Err(VaultError::Prompt(format!(
                "expected index below {} for {:?}, got {:?}",
                count, prompt, other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn terminal(input: &str) -> TerminalOracle<Cursor<Vec<u8>>, Vec<u8>> {
        TerminalOracle::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn output(oracle: TerminalOracle<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(oracle.into_output()).unwrap()
    }

    #[test]
    fn test_yes_no_uses_default_on_empty_answer() {
        let mut oracle = terminal("\n\n");
        assert!(!oracle.ask_yes_no("Merge this group?", false).unwrap());
        assert!(oracle.ask_yes_no("Merge idx 1 into target?", true).unwrap());
        let out = output(oracle);
        assert!(out.contains("Merge this group? [y/N]: "));
        assert!(out.contains("Merge idx 1 into target? [Y/n]: "));
    }

    #[test]
    fn test_yes_no_reasks_on_invalid_answer() {
        let mut oracle = terminal("maybe\nYES\n");
        assert!(oracle.ask_yes_no("Merge?", false).unwrap());
        assert!(output(oracle).contains("Please answer y or n."));
    }

    #[test]
    fn test_choose_index_validates_range() {
        let mut oracle = terminal("7\nx\n2\n");
        assert_eq!(oracle.choose_index("Choose target idx", 3).unwrap(), 2);
        let out = output(oracle);
        assert!(out.contains("Choose target idx [0-2]: "));
        assert_eq!(out.matches("Please enter a number between 0 and 2.").count(), 2);
    }

    #[test]
    fn test_closed_input_is_an_error() {
        let mut oracle = terminal("");
        assert!(matches!(oracle.ask_yes_no("Merge?", true), Err(VaultError::Prompt(_))));
    }

    #[test]
    fn test_present_group_renders_table() {
        let mut oracle = terminal("");
        oracle
            .present_group(&[
                GroupMember {
                    index: 0,
                    id: "id-a".to_string(),
                    name: "Alpha".to_string(),
                    domains: vec!["a.com".to_string(), "b.com".to_string()],
                },
                GroupMember {
                    index: 1,
                    id: "id-b".to_string(),
                    name: "Beta".to_string(),
                    domains: vec![],
                },
            ])
            .unwrap();

        let out = output(oracle);
        assert!(out.contains("Shared credentials"));
        assert!(out.contains("Idx | ID   | Name  | Domains"));
        assert!(out.contains("  0 | id-a | Alpha | a.com, b.com"));
        assert!(out.contains("  1 | id-b | Beta  | <no uri>"));
    }

    #[test]
    fn test_scripted_oracle_records_prompts() {
        let mut oracle = ScriptedOracle::new([Answer::Default, Answer::Index(1)]);
        assert!(oracle.ask_yes_no("Merge idx 1 into target?", true).unwrap());
        assert_eq!(oracle.choose_index("Choose target idx", 2).unwrap(), 1);
        assert!(oracle.ask_yes_no("again", false).is_err());
        assert_eq!(oracle.prompts.len(), 3);
        assert_eq!(oracle.remaining(), 0);
    }
}
