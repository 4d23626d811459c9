//! PDF conversion through an external office suite.

use crate::common::error::{Error, Result};
use crate::config::PdfConfig;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Bytes of converter stderr kept in error messages.
const STDERR_TAIL: usize = 2048;

/// Converts a document file to PDF.
pub trait PdfConverter {
    /// Convert `input` into the PDF file `output`, returning its path.
    fn convert(&self, input: &Path, output: &Path) -> Result<PathBuf>;
}

/// Runs `<program> --headless --convert-to pdf` and waits up to a timeout.
#[derive(Debug, Clone)]
pub struct OfficeConverter {
    program: String,
    timeout: Duration,
}

impl OfficeConverter {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn from_config(config: &PdfConfig) -> Self {
        Self::new(config.program.clone(), Duration::from_secs(config.timeout_secs))
    }
}

impl PdfConverter for OfficeConverter {
    fn convert(&self, input: &Path, output: &Path) -> Result<PathBuf> {
        let out_dir = match output.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut child = Command::new(&self.program)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(&out_dir)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Conversion(format!("cannot start {}: {}", self.program, e)))?;

        // Drained concurrently so a chatty converter cannot fill the pipe and stall.
        let stderr_reader = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut text = String::new();
                let _ = std::io::Read::read_to_string(&mut pipe, &mut text);
                text
            })
        });
        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if started.elapsed() >= self.timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(Error::Conversion(format!(
                        "{} did not finish within {}s",
                        self.program,
                        self.timeout.as_secs()
                    )));
                },
                Ok(None) => std::thread::sleep(Duration::from_millis(100)),
                Err(e) => return Err(Error::Conversion(format!("waiting for {}: {}", self.program, e))),
            }
        };
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        if !status.success() {
            return Err(Error::Conversion(format!(
                "{} exited with {}: {}",
                self.program,
                status,
                tail(stderr.trim(), STDERR_TAIL)
            )));
        }

        // The converter names its output after the input stem.
        let stem = input
            .file_stem()
            .ok_or_else(|| Error::Conversion(format!("{} has no file name", input.display())))?;
        let produced = out_dir.join(format!("{}.pdf", stem.to_string_lossy()));
        if !produced.is_file() {
            return Err(Error::Conversion(format!(
                "{} reported success but produced no {}",
                self.program,
                produced.display()
            )));
        }
        if produced != output {
            std::fs::rename(&produced, output).map_err(|e| Error::write(output, e))?;
        }
        log::info!("converted {} to {}", input.display(), output.display());
        Ok(output.to_path_buf())
    }
}

/// The last `max` bytes of `text`, cut on a char boundary.
fn tail(text: &str, max: usize) -> &str {
    let mut start = text.len().saturating_sub(max);
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_conversion_error() {
        let dir = tempfile::tempdir().unwrap();
        let converter = OfficeConverter::new("docsmith-no-such-office", Duration::from_secs(1));
        let err = converter.convert(&dir.path().join("a.docx"), &dir.path().join("a.pdf"));
        assert!(matches!(err, Err(Error::Conversion(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_program_is_conversion_error() {
        let dir = tempfile::tempdir().unwrap();
        let converter = OfficeConverter::new("false", Duration::from_secs(5));
        let err = converter.convert(&dir.path().join("a.docx"), &dir.path().join("a.pdf"));
        assert!(matches!(err, Err(Error::Conversion(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_noisy_failure_is_not_a_timeout() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("noisy-office");
        std::fs::write(
            &script,
            "#!/bin/sh\nhead -c 1000000 /dev/zero | tr '\\0' x >&2\necho bad input >&2\nexit 3\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let converter = OfficeConverter::new(script.to_string_lossy(), Duration::from_secs(20));
        let err = converter
            .convert(&dir.path().join("a.docx"), &dir.path().join("a.pdf"))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("exited with"), "{}", message);
        assert!(message.ends_with("bad input"), "{}", message);
        assert!(message.len() < 4096);
    }

    #[test]
    fn test_tail_respects_char_boundaries() {
        assert_eq!(tail("abc", 10), "abc");
        assert_eq!(tail("abcdef", 2), "ef");
        assert_eq!(tail("aé", 1), "");
    }
}
