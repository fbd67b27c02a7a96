//! Byte stream produced by a snapshot send.

use std::io::{self, Cursor, Read};
use std::process::{Child, ChildStdout};

use crate::error::{io_err, LocationError};

/// A send stream, read by the receiving location.
///
/// Process-backed streams must be closed with [`finish`](Self::finish)
/// once fully consumed, or [`abort`](Self::abort) when the consumer gave up.
pub struct SnapshotStream {
    inner: Inner,
    label: String,
}

enum Inner {
    Process { child: Child, stdout: ChildStdout },
    Memory(Cursor<Vec<u8>>),
}

impl SnapshotStream {
    /// Wrap a spawned sender whose stdout is piped.
    pub fn from_child(mut child: Child, label: impl Into<String>) -> Result<Self, LocationError> {
        let label = label.into();
        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(io_err(
                label,
                io::Error::other("sender stdout was not piped"),
            ));
        };
        Ok(Self {
            inner: Inner::Process { child, stdout },
            label,
        })
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>, label: impl Into<String>) -> Self {
        Self {
            inner: Inner::Memory(Cursor::new(bytes.into())),
            label: label.into(),
        }
    }

    /// The command (or description) that produced this stream.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Wait for the sender and fail if it did not exit cleanly.
    pub fn finish(self) -> Result<(), LocationError> {
        match self.inner {
            Inner::Memory(_) => Ok(()),
            Inner::Process { mut child, stdout } => {
                drop(stdout);
                let status = child.wait().map_err(|e| io_err(self.label.as_str(), e))?;
                if status.success() {
                    Ok(())
                } else {
                    Err(LocationError::CommandFailed {
                        command: self.label,
                        status,
                        stderr: String::new(),
                    })
                }
            }
        }
    }

    /// Stop the sender without checking its outcome.
    pub fn abort(self) {
        if let Inner::Process { mut child, stdout } = self.inner {
            drop(stdout);
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Read for SnapshotStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            Inner::Process { stdout, .. } => stdout.read(buf),
            Inner::Memory(cursor) => cursor.read(buf),
        }
    }
}

impl std::fmt::Debug for SnapshotStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStream")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}
