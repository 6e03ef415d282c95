use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::trace;

use crate::error::SubjectError;
use crate::subject::{RawReply, SubjectEngine};

/// An executable started fresh for every request: no arguments, request
/// written in one go, stdin closed, stdout and stderr read until exit.
#[derive(Debug, Clone)]
pub struct ProcessSubject {
    path: PathBuf,
}

impl ProcessSubject {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SubjectEngine for ProcessSubject {
    fn exchange(&mut self, request: &str) -> Result<RawReply, SubjectError> {
        let mut child = Command::new(&self.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SubjectError::Spawn {
                path: self.path.display().to_string(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(request.as_bytes()) {
                // a subject may exit without reading its input
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
                Err(e) => {
                    drop(stdin);
                    // reap the child before reporting
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(SubjectError::Io(e));
                }
                Ok(()) => {}
            }
            // dropping stdin here closes it
        }

        let output = child.wait_with_output()?;
        trace!(
            "{} exited with {:?}, {} bytes of output",
            self.path.display(),
            output.status.code(),
            output.stdout.len()
        );
        Ok(RawReply {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
            code: output.status.code(),
        })
    }
}
