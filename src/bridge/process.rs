//! Process bridge
//!
//! Wraps a debugger's stdio (or a TCP connection to one) as a line stream:
//! `send` writes a line and returns, `expect` waits for a line starting with
//! a prefix. Pairing the two is up to the caller, usually by putting a unique
//! numeric token at the start of each command.

use std::collections::HashSet;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::time::Instant;

use crate::common::{Error, Result};
use crate::record::{MiParser, Record, RecordParser};
use crate::testing::Transcript;

use super::queue::{Next, OutputLineQueue};

/// Default time between closing input and killing the debugger
pub const DEFAULT_CLOSE_GRACE: Duration = Duration::from_millis(500);

type LineWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// A live debugger connection
pub struct ProcessBridge {
    /// Command line or address, for messages
    description: String,
    /// Spawned debugger; `None` when attached over TCP
    child: Option<Child>,
    /// Process group of the spawned shell and everything it starts
    process_group: Option<u32>,
    /// Debugger input; `None` once closed
    writer: Option<LineWriter>,
    queue: OutputLineQueue,
    parser: Arc<dyn RecordParser>,
    transcript: Transcript,
    /// Tokens sent and not yet matched by an expect
    in_flight: HashSet<u64>,
    close_grace: Duration,
    closed: bool,
}

impl ProcessBridge {
    /// Start `command` through the platform shell
    pub fn spawn(command: &str, transcript: Transcript) -> Result<Self> {
        if command.trim().is_empty() {
            return Err(Error::Config("debugger command is empty".to_string()));
        }

        let mut cmd = debugger_command(command);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::process_start(command, e))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::process_start(command, "failed to get stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::process_start(command, "failed to get stdout"))?;

        let pid = child.id();
        tracing::info!(pid = ?pid, "Started debugger: {}", command);

        Ok(Self {
            description: command.to_string(),
            child: Some(child),
            process_group: pid,
            writer: Some(Box::new(stdin)),
            queue: OutputLineQueue::pump(stdout, transcript.clone()),
            parser: Arc::new(MiParser),
            transcript,
            in_flight: HashSet::new(),
            close_grace: DEFAULT_CLOSE_GRACE,
            closed: false,
        })
    }

    /// Attach to a debugger listening on a TCP address
    pub async fn connect(addr: &str, timeout: Duration, transcript: Transcript) -> Result<Self> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| Error::process_start(addr, format!("connect timed out after {timeout:?}")))?
            .map_err(|e| Error::process_start(addr, e))?;

        tracing::info!("Connected to debugger at {}", addr);

        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            description: addr.to_string(),
            child: None,
            process_group: None,
            writer: Some(Box::new(write_half)),
            queue: OutputLineQueue::pump(read_half, transcript.clone()),
            parser: Arc::new(MiParser),
            transcript,
            in_flight: HashSet::new(),
            close_grace: DEFAULT_CLOSE_GRACE,
            closed: false,
        })
    }

    /// Use a different record parser for matched lines
    pub fn with_parser(mut self, parser: Arc<dyn RecordParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Change the grace period used by [`close`](Self::close)
    pub fn with_close_grace(mut self, grace: Duration) -> Self {
        self.close_grace = grace;
        self
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Write one line to the debugger without waiting for any answer
    pub async fn send(&mut self, text: &str) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(Error::InputClosed)?;

        if let Some(token) = leading_token(text) {
            if !self.in_flight.insert(token) {
                tracing::warn!(
                    "Token {} reused while a command with the same token is still unanswered",
                    token
                );
                self.transcript
                    .write_line(format!("warning: token {token} reused while in flight"));
            }
        }

        tracing::debug!(">>> {}", text);
        self.transcript.sent(text);

        writer.write_all(text.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    /// Wait for a line starting with `prefix` and parse it
    ///
    /// Lines that do not match are consumed and dropped. A dropped result
    /// line still answers its token. Fails when the timeout passes or the
    /// output ends first.
    pub async fn expect(&mut self, prefix: &str, timeout: Duration) -> Result<Record> {
        let started = Instant::now();
        let deadline = started + timeout;

        loop {
            match self.queue.next_before(deadline).await {
                Next::Line(line) => {
                    if let Some(token) = answered_token(&line) {
                        self.in_flight.remove(&token);
                    }
                    if !line.starts_with(prefix) {
                        tracing::trace!("Skipping '{}' while expecting '{}'", line, prefix);
                        continue;
                    }
                    let record = self.parser.parse(&line)?;
                    if let Some(token) = record.token {
                        self.in_flight.remove(&token);
                    }
                    return Ok(record);
                }
                Next::Closed => {
                    return Err(Error::StreamClosed {
                        prefix: prefix.to_string(),
                        elapsed: started.elapsed(),
                    });
                }
                Next::TimedOut => {
                    return Err(Error::ExpectTimeout {
                        prefix: prefix.to_string(),
                        timeout,
                    });
                }
            }
        }
    }

    /// Shut the debugger down
    ///
    /// Closes its input, gives it the grace period to exit, then kills it and
    /// cancels the output reader. Runs once; later calls do nothing.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Some(mut writer) = self.writer.take() {
            let _ = writer.shutdown().await;
        }

        let grace = self.close_grace;
        match self.child.as_mut() {
            Some(child) => match tokio::time::timeout(grace, child.wait()).await {
                Ok(Ok(status)) => {
                    tracing::info!("Debugger exited: {}", status);
                    self.queue.stop(grace).await;
                }
                Ok(Err(e)) => {
                    tracing::warn!("Failed waiting for debugger: {}", e);
                    self.queue.abort();
                }
                Err(_) => {
                    tracing::warn!(
                        "Debugger '{}' did not exit within {:?}, killing it",
                        self.description,
                        grace
                    );
                    self.queue.abort();
                    if let Some(group) = self.process_group {
                        kill_process_group(group);
                    }
                    let _ = child.kill().await;
                }
            },
            None => self.queue.stop(grace).await,
        }
    }
}

impl Drop for ProcessBridge {
    fn drop(&mut self) {
        // Best effort; close() is the real shutdown path
        if let Some(child) = self.child.as_mut() {
            if child.id().is_some() {
                if let Some(group) = self.process_group {
                    kill_process_group(group);
                }
            }
            let _ = child.start_kill();
        }
    }
}

/// Kill the shell's whole process group, so commands it forked die with it
#[cfg(unix)]
fn kill_process_group(group: u32) {
    let result = unsafe { libc::killpg(group as libc::pid_t, libc::SIGKILL) };
    if result != 0 {
        tracing::debug!(
            "killpg({}) failed: {}",
            group,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn kill_process_group(_group: u32) {}

#[cfg(unix)]
pub(crate) fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
pub(crate) fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

/// Shell command leading a new process group
#[cfg(unix)]
fn debugger_command(command: &str) -> Command {
    use std::os::unix::process::CommandExt;

    let mut cmd = std::process::Command::new("sh");
    cmd.arg("-c").arg(command).process_group(0);
    Command::from(cmd)
}

#[cfg(not(unix))]
fn debugger_command(command: &str) -> Command {
    shell_command(command)
}

/// Numeric token at the start of a command, as in `12-exec-run`
fn leading_token(text: &str) -> Option<u64> {
    let digits = text.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    text[..digits].parse().ok()
}

/// Token of a result record such as `12^done`
fn answered_token(line: &str) -> Option<u64> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || line.as_bytes().get(digits) != Some(&b'^') {
        return None;
    }
    line[..digits].parse().ok()
}
