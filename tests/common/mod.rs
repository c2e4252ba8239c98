#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Fresh directory under the system temp dir, unique per process and call.
pub fn temp_dir(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!(
        "mysql-entrypoint-{label}-{}-{}",
        std::process::id(),
        nanos
    ));
    fs::create_dir_all(&path).expect("failed to create temp dir");
    path
}

pub fn write_file(path: &Path, contents: &str, mode: u32) {
    fs::write(path, contents).expect("failed to write file");
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).expect("failed to chmod");
}

pub fn write_script(path: &Path, body: &str) {
    write_file(path, &format!("#!/bin/sh\n{body}\n"), 0o755);
}

/// Stand-in server binary. Records every invocation in `<root>/calls.log`,
/// answers `--verbose --help` with a realistic variables table, creates the system
/// schema on `--initialize-insecure` and exits with `daemonize_status` on `--daemonize`.
pub struct FakeServer {
    pub root: PathBuf,
    pub program: PathBuf,
    pub data_dir: PathBuf,
    pub socket: PathBuf,
    pub default_socket: PathBuf,
    pub pid_file: PathBuf,
    pub calls: PathBuf,
}

impl FakeServer {
    pub fn new(label: &str, daemonize_status: i32) -> Self {
        let root = temp_dir(label);
        let program = root.join("mysqld");
        let data_dir = root.join("data");
        let socket = root.join("run").join("mysqld.sock");
        let default_socket = root.join("default.sock");
        let pid_file = root.join("pid").join("mysqld.pid");
        let calls = root.join("calls.log");

        let body = format!(
            r#"echo "$*" >> "{calls}"
help=; nodefaults=; init=; daemon=
for a in "$@"; do
  case "$a" in
    --help) help=1 ;;
    --no-defaults) nodefaults=1 ;;
    --initialize-insecure) init=1 ;;
    --daemonize) daemon=1 ;;
  esac
done
if [ -n "$help" ]; then
  sock="{socket}"
  if [ -n "$nodefaults" ]; then sock="{default_socket}"; fi
  cat <<EOT
mysqld  Ver 8.0.36 for Linux on x86_64 (MySQL Community Server - GPL)
Usage: mysqld [OPTIONS]
  --datadir=name      Path to the database root directory

Variables (--variable-name=value)
and boolean options {{FALSE|TRUE}}  Value (after reading options)
--------------------------------- ----------------------------------------
datadir                           {data_dir}/
general-log-file                  {data_dir}/host.log
pid-file                          {pid_file}
secure-file-priv                  NULL
slow-query-log-file               (No default value)
socket                            $sock
EOT
  exit 0
fi
if [ -n "$init" ]; then mkdir -p "{data_dir}/mysql"; exit 0; fi
if [ -n "$daemon" ]; then exit {daemonize_status}; fi
exit 0"#,
            calls = calls.display(),
            socket = socket.display(),
            default_socket = default_socket.display(),
            data_dir = data_dir.display(),
            pid_file = pid_file.display(),
        );
        write_script(&program, &body);

        Self {
            root,
            program,
            data_dir,
            socket,
            default_socket,
            pid_file,
            calls,
        }
    }

    pub fn calls(&self) -> String {
        fs::read_to_string(&self.calls).unwrap_or_default()
    }

    pub fn program_str(&self) -> String {
        self.program.display().to_string()
    }
}
