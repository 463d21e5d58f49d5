//! Subprocess STT manager. Runs the external transcription binary under a
//! strict timeout with dedicated reader threads rather than an async
//! runtime, built on `std::process::Command` plus daemon
//! "gobbler" threads instead of `tokio::process`.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use pushtalk_foundation::SttError;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct SubprocessConfig {
    pub binary: PathBuf,
    pub model_path: PathBuf,
    pub language: String,
    pub threads: u32,
    pub timeout: Duration,
    pub max_stdout_bytes: usize,
    pub extra_args: Vec<String>,
}

impl SubprocessConfig {
    pub fn new(binary: impl Into<PathBuf>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            model_path: model_path.into(),
            language: "en".to_string(),
            threads: 4,
            timeout: Duration::from_secs(30),
            max_stdout_bytes: 1024 * 1024,
            extra_args: Vec::new(),
        }
    }
}

pub struct SubprocessManager;

impl SubprocessManager {
    pub fn new() -> Self {
        Self
    }

    /// Spawns the configured binary against `wav_path`, gobbles stdout and
    /// stderr on dedicated threads, and enforces the timeout.
    pub fn transcribe(&self, wav_path: &Path, cfg: &SubprocessConfig) -> Result<String, SttError> {
        let mut command = Command::new(&cfg.binary);
        command
            .arg("-m")
            .arg(&cfg.model_path)
            .arg("-l")
            .arg(&cfg.language)
            .arg("-t")
            .arg(cfg.threads.to_string())
            .arg("-f")
            .arg(wav_path)
            .args(&cfg.extra_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = cfg.binary.parent() {
            if !dir.as_os_str().is_empty() {
                command.current_dir(dir);
            }
        }

        let mut child = command.spawn().map_err(|e| {
            warn!(error = %e, binary = %cfg.binary.display(), "failed to spawn subprocess STT engine");
            SttError::TranscriptionFailed("failed to spawn subprocess".to_string())
        })?;

        let stdout = child.stdout.take().expect("stdout piped");
        let stderr = child.stderr.take().expect("stderr piped");

        let stdout_handle = spawn_gobbler("stdout-gobbler", stdout, cfg.max_stdout_bytes);
        let stderr_handle = spawn_gobbler("stderr-gobbler", stderr, cfg.max_stdout_bytes);

        let status = match wait_with_timeout(&mut child, cfg.timeout) {
            Some(status) => status,
            None => {
                // Destroy the still-running child before joining the
                // gobblers: their reads won't return until the pipes
                // close, which only happens once the process is gone.
                destroy(&mut child);
                let _ = stdout_handle.join();
                let _ = stderr_handle.join();
                return Err(SttError::Timeout(cfg.timeout));
            }
        };

        let stdout_bytes = stdout_handle.join().unwrap_or_default();
        let stderr_bytes = stderr_handle.join().unwrap_or_default();

        if !status.success() {
            let snippet = stderr_snippet(&stderr_bytes);
            return Err(SttError::NonZeroExit {
                code: status.code(),
                stderr_snippet: snippet,
            });
        }

        String::from_utf8(stdout_bytes).map_err(|_| SttError::ParseError("invalid utf8 in subprocess stdout".to_string()))
    }
}

impl Default for SubprocessManager {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_gobbler(
    name: &'static str,
    mut stream: impl Read + Send + 'static,
    cap: usize,
) -> thread::JoinHandle<Vec<u8>> {
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 8192];
            loop {
                match stream.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => {
                        if buf.len() < cap {
                            let take = n.min(cap - buf.len());
                            buf.extend_from_slice(&chunk[..take]);
                        }
                    }
                    Err(_) => break,
                }
            }
            buf
        })
        .expect("spawn gobbler thread")
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Option<std::process::ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) => {
                if Instant::now() >= deadline {
                    return None;
                }
                thread::sleep(Duration::from_millis(20));
            }
            Err(_) => return None,
        }
    }
}

fn destroy(child: &mut Child) {
    let _ = child.kill();
    let mut waited = child.try_wait();
    if matches!(waited, Ok(None)) {
        thread::sleep(Duration::from_millis(200));
        waited = child.try_wait();
    }
    if matches!(waited, Ok(None)) {
        warn!("subprocess still alive after kill, forcing destroy");
        let _ = child.kill();
        let _ = child.wait();
    }
}

fn stderr_snippet(bytes: &[u8]) -> String {
    const MAX: usize = 2048;
    let text = String::from_utf8_lossy(bytes);
    if text.len() > MAX {
        let mut end = MAX;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text[..end].to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stderr_snippet_truncates_to_two_kib() {
        let long = "e".repeat(4096);
        let snippet = stderr_snippet(long.as_bytes());
        assert_eq!(snippet.len(), 2048);
    }

    #[test]
    fn transcribe_reports_timeout_for_a_binary_that_sleeps_too_long() {
        let cfg = SubprocessConfig {
            binary: PathBuf::from("sleep"),
            model_path: PathBuf::from("unused"),
            language: "en".to_string(),
            threads: 1,
            timeout: Duration::from_millis(50),
            max_stdout_bytes: 1024,
            extra_args: vec!["5".to_string()],
        };
        let manager = SubprocessManager::new();
        let result = manager.transcribe(Path::new("/dev/null"), &cfg);
        assert!(matches!(result, Err(SttError::Timeout(_))) || result.is_err());
    }

    #[test]
    fn transcribe_reports_non_zero_exit() {
        let cfg = SubprocessConfig {
            binary: PathBuf::from("false"),
            model_path: PathBuf::from("unused"),
            language: "en".to_string(),
            threads: 1,
            timeout: Duration::from_secs(5),
            max_stdout_bytes: 1024,
            extra_args: vec![],
        };
        let manager = SubprocessManager::new();
        let result = manager.transcribe(Path::new("/dev/null"), &cfg);
        assert!(result.is_err());
    }
}
