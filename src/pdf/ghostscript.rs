//! External PDF compression through Ghostscript's `pdfwrite` device.

use crate::constants::{
    DEFAULT_GHOSTSCRIPT, EBOOK_PRESET_MIN_DPI, GHOSTSCRIPT_COMPATIBILITY_LEVEL,
    PRINTER_PRESET_MIN_DPI, PROCESS_POLL_INTERVAL_MS,
};
use crate::error::{CompressionError, Result};
use crate::utils::{replace_with_temp_path, sibling_temp_file};
use std::ffi::OsString;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// `-dPDFSETTINGS` presets, keyed by target resolution band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfPreset {
    /// 150 DPI and up
    Printer,
    /// 100 to 149 DPI
    Ebook,
    /// below 100 DPI
    Screen,
}

impl PdfPreset {
    pub fn for_dpi(dpi: u32) -> Self {
        if dpi >= PRINTER_PRESET_MIN_DPI {
            PdfPreset::Printer
        } else if dpi >= EBOOK_PRESET_MIN_DPI {
            PdfPreset::Ebook
        } else {
            PdfPreset::Screen
        }
    }

    pub fn setting(&self) -> &'static str {
        match self {
            PdfPreset::Printer => "/printer",
            PdfPreset::Ebook => "/ebook",
            PdfPreset::Screen => "/screen",
        }
    }
}

impl fmt::Display for PdfPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.setting())
    }
}

#[derive(Debug, Clone)]
pub struct Ghostscript {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl Default for Ghostscript {
    fn default() -> Self {
        Self::new(DEFAULT_GHOSTSCRIPT)
    }
}

impl Ghostscript {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    /// Runs `<program> --version`; any spawn error or non-zero exit means unavailable.
    ///
    /// Not cached: every call asks the system again.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    pub fn version(&self) -> Option<String> {
        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!version.is_empty()).then_some(version)
    }

    pub fn build_args(input: &Path, output: &Path, preset: PdfPreset) -> Vec<OsString> {
        let mut output_arg = OsString::from("-sOutputFile=");
        output_arg.push(output.as_os_str());

        vec![
            OsString::from("-sDEVICE=pdfwrite"),
            OsString::from(format!(
                "-dCompatibilityLevel={}",
                GHOSTSCRIPT_COMPATIBILITY_LEVEL
            )),
            OsString::from(format!("-dPDFSETTINGS={}", preset.setting())),
            OsString::from("-dNOPAUSE"),
            OsString::from("-dQUIET"),
            OsString::from("-dBATCH"),
            output_arg,
            input.as_os_str().to_os_string(),
        ]
    }

    /// Rewrites `path` at the preset matching `target_dpi`.
    ///
    /// Ghostscript writes into a sibling temp file which only replaces `path`
    /// when the tool exits cleanly and the output is non-empty. The temp file
    /// is removed on every other path.
    pub fn compress(&self, path: &Path, target_dpi: u32) -> Result<PdfPreset> {
        let preset = PdfPreset::for_dpi(target_dpi);
        let temp = sibling_temp_file(path)?.into_temp_path();

        let output = self.run(&Self::build_args(path, &temp, preset))?;
        if !output.status.success() {
            return Err(CompressionError::ToolFailed {
                program: self.program_name(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        replace_with_temp_path(temp, path)?;
        Ok(preset)
    }

    fn run(&self, args: &[OsString]) -> Result<Output> {
        let spawn_error = |source| CompressionError::ToolSpawn {
            program: self.program_name(),
            source,
        };

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        let Some(limit) = self.timeout else {
            return child.wait_with_output().map_err(spawn_error);
        };

        // stderr is read while polling so a chatty run cannot fill the pipe and stall
        let stderr_reader = drain_stderr(&mut child);
        let deadline = Instant::now() + limit;
        loop {
            if let Some(status) = child.try_wait()? {
                let stderr = stderr_reader
                    .and_then(|reader| reader.join().ok())
                    .unwrap_or_default();
                return Ok(Output {
                    status,
                    stdout: Vec::new(),
                    stderr,
                });
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(CompressionError::ToolTimeout {
                    program: self.program_name(),
                    seconds: limit.as_secs(),
                });
            }
            thread::sleep(Duration::from_millis(PROCESS_POLL_INTERVAL_MS));
        }
    }
}

fn drain_stderr(child: &mut Child) -> Option<thread::JoinHandle<Vec<u8>>> {
    let mut stderr = child.stderr.take()?;
    Some(thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stderr.read_to_end(&mut buf);
        buf
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_preset_boundaries() {
        assert_eq!(PdfPreset::for_dpi(300), PdfPreset::Printer);
        assert_eq!(PdfPreset::for_dpi(150), PdfPreset::Printer);
        assert_eq!(PdfPreset::for_dpi(149), PdfPreset::Ebook);
        assert_eq!(PdfPreset::for_dpi(100), PdfPreset::Ebook);
        assert_eq!(PdfPreset::for_dpi(99), PdfPreset::Screen);
        assert_eq!(PdfPreset::for_dpi(1), PdfPreset::Screen);
    }

    #[test]
    fn test_preset_settings() {
        assert_eq!(PdfPreset::Printer.setting(), "/printer");
        assert_eq!(PdfPreset::Ebook.setting(), "/ebook");
        assert_eq!(PdfPreset::Screen.to_string(), "/screen");
    }

    #[test]
    fn test_build_args() {
        let args = Ghostscript::build_args(
            Path::new("in/report.pdf"),
            Path::new("in/.report.pdf.tmp"),
            PdfPreset::Ebook,
        );
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "-sDEVICE=pdfwrite",
                "-dCompatibilityLevel=1.4",
                "-dPDFSETTINGS=/ebook",
                "-dNOPAUSE",
                "-dQUIET",
                "-dBATCH",
                "-sOutputFile=in/.report.pdf.tmp",
                "in/report.pdf",
            ]
        );
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let gs = Ghostscript::new("doc-squeeze-no-such-ghostscript");
        assert!(!gs.is_available());
        assert!(!gs.is_available());
        assert_eq!(gs.version(), None);
    }

    #[test]
    fn test_compress_with_missing_program_keeps_original() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("invoice.pdf");
        fs::write(&path, b"%PDF-1.4 original").unwrap();

        let gs = Ghostscript::new("doc-squeeze-no-such-ghostscript");
        let result = gs.compress(&path, 120);

        assert!(matches!(result, Err(CompressionError::ToolSpawn { .. })));
        assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.4 original");
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    mod fake_tool {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn install_script(dir: &Path, body: &str) -> PathBuf {
            let script = dir.join("fake-gs");
            fs::write(&script, format!("#!/bin/sh\n{}", body)).unwrap();
            fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
            script
        }

        const WRITES_OUTPUT: &str = r#"
for arg in "$@"; do
  case "$arg" in
    --version) echo "10.02.1"; exit 0 ;;
    -sOutputFile=*) out="${arg#-sOutputFile=}" ;;
  esac
done
printf '%s' '%PDF-1.4 squeezed' > "$out"
"#;

        #[test]
        fn test_fake_tool_replaces_original() {
            let tools = TempDir::new().unwrap();
            let docs = TempDir::new().unwrap();
            let path = docs.path().join("statement.pdf");
            fs::write(&path, b"%PDF-1.4 a much larger original document").unwrap();

            let gs = Ghostscript::new(install_script(tools.path(), WRITES_OUTPUT));
            assert!(gs.is_available());
            assert_eq!(gs.version().as_deref(), Some("10.02.1"));

            let preset = gs.compress(&path, 90).unwrap();

            assert_eq!(preset, PdfPreset::Screen);
            assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.4 squeezed");
            assert_eq!(fs::read_dir(docs.path()).unwrap().count(), 1);
        }

        #[test]
        fn test_fake_tool_failure_keeps_original() {
            let tools = TempDir::new().unwrap();
            let docs = TempDir::new().unwrap();
            let path = docs.path().join("statement.pdf");
            fs::write(&path, b"%PDF-1.4 original").unwrap();

            let gs = Ghostscript::new(install_script(
                tools.path(),
                "echo 'Error: /undefined in --run--' >&2\nexit 1\n",
            ));
            let result = gs.compress(&path, 150);

            match result {
                Err(CompressionError::ToolFailed { stderr, .. }) => {
                    assert!(stderr.contains("undefined"))
                }
                other => panic!("unexpected result: {:?}", other),
            }
            assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.4 original");
            assert_eq!(fs::read_dir(docs.path()).unwrap().count(), 1);
        }

        #[test]
        fn test_fake_tool_empty_output_keeps_original() {
            let tools = TempDir::new().unwrap();
            let docs = TempDir::new().unwrap();
            let path = docs.path().join("statement.pdf");
            fs::write(&path, b"%PDF-1.4 original").unwrap();

            let gs = Ghostscript::new(install_script(tools.path(), "exit 0\n"));
            let result = gs.compress(&path, 120);

            assert!(matches!(result, Err(CompressionError::EmptyOutput(_))));
            assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.4 original");
            assert_eq!(fs::read_dir(docs.path()).unwrap().count(), 1);
        }

        #[test]
        fn test_fake_tool_chatty_failure_with_timeout_reports_real_error() {
            let tools = TempDir::new().unwrap();
            let docs = TempDir::new().unwrap();
            let path = docs.path().join("damaged.pdf");
            fs::write(&path, b"%PDF-1.4 original").unwrap();

            // well past a 64 KiB pipe buffer
            let script = r#"
i=0
while [ $i -lt 3000 ]; do
  echo "   **** Warning: repairing broken xref entry $i of this damaged file" >&2
  i=$((i+1))
done
exit 1
"#;
            let gs = Ghostscript::new(install_script(tools.path(), script))
                .with_timeout(Some(Duration::from_secs(20)));
            let result = gs.compress(&path, 120);

            match result {
                Err(CompressionError::ToolFailed { stderr, .. }) => {
                    assert!(stderr.contains("repairing broken xref entry 2999"));
                }
                other => panic!("unexpected result: {:?}", other),
            }
            assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.4 original");
            assert_eq!(fs::read_dir(docs.path()).unwrap().count(), 1);
        }

        #[test]
        fn test_fake_tool_timeout_with_output_succeeds_when_fast() {
            let tools = TempDir::new().unwrap();
            let docs = TempDir::new().unwrap();
            let path = docs.path().join("statement.pdf");
            fs::write(&path, b"%PDF-1.4 a much larger original document").unwrap();

            let gs = Ghostscript::new(install_script(tools.path(), WRITES_OUTPUT))
                .with_timeout(Some(Duration::from_secs(20)));
            gs.compress(&path, 150).unwrap();

            assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.4 squeezed");
        }

        #[test]
        fn test_fake_tool_timeout_is_enforced() {
            let tools = TempDir::new().unwrap();
            let docs = TempDir::new().unwrap();
            let path = docs.path().join("statement.pdf");
            fs::write(&path, b"%PDF-1.4 original").unwrap();

            let gs = Ghostscript::new(install_script(tools.path(), "exec sleep 5\n"))
                .with_timeout(Some(Duration::from_millis(200)));
            let result = gs.compress(&path, 120);

            assert!(matches!(result, Err(CompressionError::ToolTimeout { .. })));
            assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.4 original");
            assert_eq!(fs::read_dir(docs.path()).unwrap().count(), 1);
        }
    }
}
