/*!
Fake `crm` executables for end-to-end sampler tests

Each helper writes a small `/bin/sh` script into a private temp directory and
returns its path, ready to be used as the sampler's status command.
Unix only.
*/

use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const HEREDOC_MARK: &str = "CLUMON_FAKE_CRM_EOF";

/// Directory of generated fake status commands, removed on drop
pub struct FakeCrm {
    dir: TempDir,
}

impl FakeCrm {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("Failed to create fake crm directory")?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Script printing `stdout`, then `stderr` on stderr, then exiting with `exit_code`
    pub fn printing(&self, name: &str, stdout: &str, stderr: &str, exit_code: i32) -> Result<PathBuf> {
        let mut body = heredoc("cat", stdout);
        if !stderr.is_empty() {
            body.push_str(&heredoc("cat >&2", stderr));
        }
        body.push_str(&format!("exit {}\n", exit_code));
        self.write_script(name, &body)
    }

    /// Script that records its pid and then sleeps for `secs`
    pub fn hanging(&self, name: &str, secs: u64) -> Result<PathBuf> {
        let pid_file = self.pid_file(name);
        let body = format!("echo $$ > '{}'\nexec sleep {}\n", pid_file.display(), secs);
        self.write_script(name, &body)
    }

    /// Script that starts `sleep secs` in the background, records the
    /// sleeper's pid and waits for it, like crmsh waiting on `crm_mon`
    pub fn hanging_in_child(&self, name: &str, secs: u64) -> Result<PathBuf> {
        let pid_file = self.pid_file(name);
        let body = format!("sleep {} &\necho $! > '{}'\nwait\n", secs, pid_file.display());
        self.write_script(name, &body)
    }

    /// Where hanging scripts write the pid of the process that hangs
    pub fn pid_file(&self, name: &str) -> PathBuf {
        self.dir.path().join(format!("{}.pid", name))
    }

    /// Script printing `outputs[n]` on its n-th invocation, then nothing
    pub fn sequence(&self, name: &str, outputs: &[&str]) -> Result<PathBuf> {
        let counter = self.counter_file(name);
        let mut body = format!(
            "n=$(cat '{counter}' 2>/dev/null || echo 0)\necho $((n + 1)) > '{counter}'\ncase \"$n\" in\n",
            counter = counter.display()
        );
        for (index, output) in outputs.iter().enumerate() {
            body.push_str(&format!("{})\n", index));
            body.push_str(&heredoc("cat", output));
            body.push_str(";;\n");
        }
        body.push_str("esac\n");
        self.write_script(name, &body)
    }

    /// Number of times a [`FakeCrm::sequence`] script has run
    pub fn invocations(&self, name: &str) -> usize {
        fs::read_to_string(self.counter_file(name))
            .ok()
            .and_then(|n| n.trim().parse().ok())
            .unwrap_or(0)
    }

    fn counter_file(&self, name: &str) -> PathBuf {
        self.dir.path().join(format!("{}.count", name))
    }

    fn write_script(&self, name: &str, body: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{}", body))
            .with_context(|| format!("Failed to write fake crm script {}", path.display()))?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .with_context(|| format!("Failed to make {} executable", path.display()))?;
        Ok(path)
    }
}

fn heredoc(command: &str, text: &str) -> String {
    let mut out = format!("{} <<'{}'\n{}", command, HEREDOC_MARK, text);
    if !text.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(HEREDOC_MARK);
    out.push('\n');
    out
}
