//! Frame sink: the write end of the frame pipe plus the encoder process.

use std::io::{PipeReader, PipeWriter, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;

use framepipe_common::error::{FramepipeError, FramepipeResult};

use crate::args::EncoderCommand;
use crate::pipe::PipeHandle;

/// How an encoder run ended.
#[derive(Debug, Clone)]
pub struct EncoderExit {
    pub status: ExitStatus,

    /// Tail of the encoder's stderr.
    pub stderr: String,
}

impl EncoderExit {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Turn a non-zero exit into [`FramepipeError::EncoderExit`].
    pub fn into_result(self) -> FramepipeResult<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(FramepipeError::EncoderExit {
                code: self.status.code(),
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Owns the write end of the frame pipe and the encoder child process.
///
/// The encoder holds the only read end. Closing the write end (explicitly,
/// or by dropping the sink) is what signals end-of-stream.
#[derive(Debug)]
pub struct FrameSink {
    program: String,
    writer: Option<PipeWriter>,
    child: Option<Child>,
    stderr_task: Option<JoinHandle<String>>,
    exit: Option<EncoderExit>,
    frames_written: u64,
    bytes_written: u64,
}

impl FrameSink {
    /// Create the pipe and start the encoder reading from it.
    ///
    /// On failure every descriptor opened so far is closed before returning.
    pub fn spawn(command: &EncoderCommand, stderr_tail_bytes: usize) -> FramepipeResult<Self> {
        let PipeHandle { read, write } = PipeHandle::open()?;

        let mut child = spawn_encoder(command, read)?;
        tracing::info!(
            pid = child.id(),
            program = %command.program,
            args_len = command.args.len(),
            "Encoder process started"
        );

        let stderr_task = child.stderr.take().map(|stderr| {
            // Drain stderr concurrently so the encoder never blocks on it.
            std::thread::spawn(move || read_tail(stderr, stderr_tail_bytes))
        });

        Ok(Self {
            program: command.program.clone(),
            writer: Some(write),
            child: Some(child),
            stderr_task,
            exit: None,
            frames_written: 0,
            bytes_written: 0,
        })
    }

    /// Write one whole frame.
    ///
    /// Blocks while the pipe is full, which throttles rendering to the
    /// encoder's pace. A short write is continued until the frame is done.
    pub fn write_frame(&mut self, frame: &[u8]) -> FramepipeResult<()> {
        let index = self.frames_written;
        let writer = self.writer.as_mut().ok_or_else(|| FramepipeError::Write {
            frame: index,
            source: std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "frame sink is already closed",
            ),
        })?;

        writer
            .write_all(frame)
            .map_err(|source| FramepipeError::Write {
                frame: index,
                source,
            })?;

        self.frames_written += 1;
        self.bytes_written += frame.len() as u64;
        Ok(())
    }

    /// Close the write end. Idempotent; returns whether this call closed it.
    ///
    /// Never blocks on the encoder: data still buffered in the pipe stays
    /// readable after the write end is gone.
    pub fn close(&mut self) -> bool {
        match self.writer.take() {
            Some(writer) => {
                drop(writer);
                tracing::debug!(
                    frames = self.frames_written,
                    bytes = self.bytes_written,
                    "Frame pipe closed"
                );
                true
            }
            None => false,
        }
    }

    /// Whether the write end is still open.
    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /// Close the write end and block until the encoder exits.
    ///
    /// Calling this again returns the recorded exit.
    pub fn wait(&mut self) -> FramepipeResult<EncoderExit> {
        self.close();
        if let Some(exit) = &self.exit {
            return Ok(exit.clone());
        }

        let Some(mut child) = self.child.take() else {
            return Err(std::io::Error::other("encoder process already reaped").into());
        };
        let status = child.wait()?;
        let stderr = self.join_stderr();

        tracing::info!(
            program = %self.program,
            status = %status,
            frames = self.frames_written,
            "Encoder process exited"
        );

        let exit = EncoderExit { status, stderr };
        self.exit = Some(exit.clone());
        Ok(exit)
    }

    /// Close the write end, kill the encoder and reap it.
    pub fn terminate(&mut self) -> FramepipeResult<EncoderExit> {
        self.close();
        if let Some(child) = self.child.as_mut() {
            if let Err(err) = child.kill() {
                // Already exited; `wait` below still reaps it.
                tracing::debug!(error = %err, "Encoder kill failed");
            }
        }
        self.wait()
    }

    /// OS process id of the encoder, while it has not been reaped.
    pub fn encoder_pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn join_stderr(&mut self) -> String {
        self.stderr_task
            .take()
            .map(|task| {
                task.join()
                    .unwrap_or_else(|_| "<failed to join encoder stderr reader>".to_string())
            })
            .unwrap_or_default()
    }
}

impl Drop for FrameSink {
    fn drop(&mut self) {
        if self.child.is_some() {
            tracing::warn!(
                program = %self.program,
                "Frame sink dropped with a live encoder; terminating it"
            );
            let _ = self.terminate();
        } else {
            self.close();
        }
    }
}

/// Spawn `command` with `read_end` as its standard input.
fn spawn_encoder(command: &EncoderCommand, read_end: PipeReader) -> FramepipeResult<Child> {
    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .stdin(Stdio::from(read_end))
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    // Keep the encoder out of the terminal's foreground group: a Ctrl-C meant
    // for us must not reach it, or it finalizes a truncated file on its own.
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let child = cmd.spawn().map_err(|source| FramepipeError::EncoderSpawn {
        program: command.program.clone(),
        source,
    });

    // `cmd` holds this process's copy of the read end. It must be closed
    // now, or the encoder never sees end-of-stream after the write end closes.
    drop(cmd);
    child
}

/// Read `reader` to the end, keeping only the last `limit` bytes.
fn read_tail(mut reader: impl Read, limit: usize) -> String {
    let mut tail: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                tail.extend_from_slice(&chunk[..n]);
                if tail.len() > limit.saturating_mul(2).max(chunk.len()) {
                    let excess = tail.len() - limit;
                    tail.drain(..excess);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => {
                return format!("<failed to read encoder stderr: {err}>");
            }
        }
    }
    if tail.len() > limit {
        let excess = tail.len() - limit;
        tail.drain(..excess);
    }
    String::from_utf8_lossy(&tail).into_owned()
}
