//! Shared sandbox for tests that drive real processes.
//!
//! A sandbox is a temporary fixture root with two shell scripts standing in
//! for the toolchain:
//! - `rcc` copies the source file to the `-o` output and fails when the
//!   source contains `COMPILE_ERROR`, or `OPTI_ERROR` under
//!   `--opti-const-op`;
//! - `msm` echoes its stdin and exits 3 when it contains `RUNTIME_ERROR`.
//!
//! Both append their argv to `calls.log` in the suite directory.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rcc_harness::color::{ColorMode, Colorizer};
use rcc_harness::config::HarnessConfig;
use rcc_harness::report::Reporter;
use tempfile::TempDir;

const FAKE_RCC: &str = r#"#!/bin/sh
echo "rcc $*" >> calls.log
out=""
src=""
opti=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    --stage) shift 2 ;;
    --opti-const-op) opti=1; shift ;;
    --*) shift ;;
    *) src="$1"; shift ;;
  esac
done
echo "compiling $src"
if grep -q COMPILE_ERROR "$src"; then
  echo "error: cannot compile $src" >&2
  exit 1
fi
if [ -n "$opti" ] && grep -q OPTI_ERROR "$src"; then
  echo "error: cannot fold constants in $src" >&2
  exit 1
fi
cp "$src" "$out"
"#;

const FAKE_MSM: &str = r#"#!/bin/sh
echo "msm $*" >> calls.log
data=$(cat)
printf '%s\n' "$data"
case "$data" in
  *RUNTIME_ERROR*) echo "runtime error" >&2; exit 3 ;;
esac
"#;

// Writing an executable while another test thread forks can make the exec
// fail with ETXTBSY; process tests take this lock for their whole body.
static PROCESS_LOCK: Mutex<()> = Mutex::new(());

pub fn lock() -> MutexGuard<'static, ()> {
    PROCESS_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct Sandbox {
    pub root: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let bin = root.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        write_script(&bin.join("rcc"), FAKE_RCC);
        write_script(&bin.join("msm"), FAKE_MSM);
        Self { root }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn config(&self) -> HarnessConfig {
        HarnessConfig {
            compiler: self.path().join("bin/rcc"),
            vm: self.path().join("bin/msm"),
            fixture_root: self.path().to_path_buf(),
            color: ColorMode::Never,
            ..HarnessConfig::default()
        }
    }

    pub fn suite_dir(&self, dir: &str) -> PathBuf {
        let path = self.path().join(dir);
        fs::create_dir_all(&path).unwrap();
        path
    }

    pub fn write(&self, dir: &str, name: &str, content: &str) {
        fs::write(self.suite_dir(dir).join(name), content).unwrap();
    }

    pub fn read(&self, dir: &str, name: &str) -> String {
        fs::read_to_string(self.path().join(dir).join(name)).unwrap()
    }

    pub fn exists(&self, dir: &str, name: &str) -> bool {
        self.path().join(dir).join(name).exists()
    }

    /// The argv lines the fake tools recorded in `dir`.
    pub fn calls(&self, dir: &str) -> Vec<String> {
        fs::read_to_string(self.path().join(dir).join("calls.log"))
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

pub fn plain_reporter() -> Reporter<Vec<u8>> {
    Reporter::new(Vec::new(), Colorizer::plain())
}

pub fn output(reporter: Reporter<Vec<u8>>) -> String {
    String::from_utf8(reporter.into_inner()).unwrap()
}

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
}
