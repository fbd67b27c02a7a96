//! How shell scripts reach a location.
//!
//! Every operation is a POSIX shell script. Locally it runs under `sh -c`;
//! remotely the same script is passed to ssh as a single argument and runs
//! under the remote login shell.

use std::io::{self, Write};
use std::process::{Child, Command, Output, Stdio};
use std::thread;

use snappush_core::SshConfig;

use crate::error::{io_err, LocationError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    Local,
    Ssh {
        user: Option<String>,
        host: String,
        program: String,
        options: Vec<String>,
    },
}

impl Transport {
    pub fn ssh(user: Option<String>, host: String, config: &SshConfig) -> Self {
        Self::Ssh {
            user,
            host,
            program: config.program.clone(),
            options: config.options.clone(),
        }
    }

    /// The exact argv used to run `script`.
    pub fn argv(&self, script: &str) -> Vec<String> {
        match self {
            Self::Local => vec!["sh".to_string(), "-c".to_string(), script.to_string()],
            Self::Ssh {
                user,
                host,
                program,
                options,
            } => {
                let destination = match user {
                    Some(user) => format!("{user}@{host}"),
                    None => host.clone(),
                };
                let mut argv = Vec::with_capacity(options.len() + 4);
                argv.push(program.clone());
                argv.extend(options.iter().cloned());
                argv.push("--".to_string());
                argv.push(destination);
                argv.push(script.to_string());
                argv
            }
        }
    }

    fn command(&self, script: &str) -> Command {
        let argv = self.argv(script);
        tracing::debug!("CMD: {}", shell_words::join(&argv));
        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..]);
        cmd
    }

    /// Run `script` to completion and return its stdout.
    pub fn capture(&self, script: &str) -> Result<Vec<u8>, LocationError> {
        let output = self
            .command(script)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| io_err(script, e))?;
        check(script, output).map(|o| o.stdout)
    }

    /// Run `script` to completion, discarding stdout.
    pub fn run(&self, script: &str) -> Result<(), LocationError> {
        self.capture(script).map(|_| ())
    }

    /// Run `script` with `input` on its stdin.
    ///
    /// Stdin is written from a scoped thread while stderr is drained, so a
    /// command that reports before reading cannot stall on a full pipe.
    pub fn feed(&self, script: &str, input: &[u8]) -> Result<(), LocationError> {
        let mut child = self
            .command(script)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| io_err(script, e))?;
        let stdin = child.stdin.take();
        let (written, output) = thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(input),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")));
            (written, output)
        });
        let output = output.map_err(|e| io_err(script, e))?;
        check(script, output)?;
        written.map_err(|e| io_err(script, e))
    }

    /// Start `script` with stdout piped back to the caller. Stderr is
    /// inherited so progress from long transfers stays visible.
    pub fn spawn_reader(&self, script: &str) -> Result<Child, LocationError> {
        self.command(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| io_err(script, e))
    }

    /// Start `script` with stdin piped from the caller.
    pub fn spawn_writer(&self, script: &str) -> Result<Child, LocationError> {
        self.command(script)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| io_err(script, e))
    }
}

fn check(script: &str, output: Output) -> Result<Output, LocationError> {
    if output.status.success() {
        return Ok(output);
    }
    Err(LocationError::CommandFailed {
        command: script.to_string(),
        status: output.status,
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}
