use std::io;
use std::process::{Command, Stdio};

#[cfg(test)]
use std::{cell::RefCell, collections::VecDeque};

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Trimmed stderr, else stdout, else the exit status
    pub fn message(&self) -> String {
        let stderr = self.stderr.trim();
        let stdout = self.stdout.trim();
        if !stderr.is_empty() {
            stderr.to_string()
        } else if !stdout.is_empty() {
            stdout.to_string()
        } else {
            match self.code {
                Some(code) => format!("exited with status {code}"),
                None => "terminated by signal".to_string(),
            }
        }
    }
}

/// Runs external commands and captures their output
pub trait CommandRunner {
    fn run(&self, cmd: &str, args: &[&str], env: &[(&str, &str)]) -> io::Result<CommandOutput>;
}

/// Spawns real processes. Stdin is closed so nothing can prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &str, args: &[&str], env: &[(&str, &str)]) -> io::Result<CommandOutput> {
        log::debug!("Running: {} {}", cmd, args.join(" "));
        let output = Command::new(cmd)
            .args(args)
            .envs(env.iter().copied())
            .stdin(Stdio::null())
            .output()?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Replays scripted outputs and records every command line
#[cfg(test)]
#[derive(Default)]
pub struct ScriptedRunner {
    outputs: RefCell<VecDeque<CommandOutput>>,
    pub calls: RefCell<Vec<String>>,
}

#[cfg(test)]
impl ScriptedRunner {
    pub fn ok(&self, stdout: &str) -> &Self {
        self.push(true, 0, stdout, "")
    }

    pub fn fail(&self, code: i32, stderr: &str) -> &Self {
        self.push(false, code, "", stderr)
    }

    fn push(&self, success: bool, code: i32, stdout: &str, stderr: &str) -> &Self {
        self.outputs.borrow_mut().push_back(CommandOutput {
            success,
            code: Some(code),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        });
        self
    }
}

#[cfg(test)]
impl CommandRunner for ScriptedRunner {
    fn run(&self, cmd: &str, args: &[&str], _env: &[(&str, &str)]) -> io::Result<CommandOutput> {
        self.calls
            .borrow_mut()
            .push(format!("{} {}", cmd, args.join(" ")));
        // Unscripted commands succeed silently
        Ok(self.outputs.borrow_mut().pop_front().unwrap_or(CommandOutput {
            success: true,
            code: Some(0),
            ..CommandOutput::default()
        }))
    }
}
