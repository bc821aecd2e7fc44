// ABOUTME: Shell script templates run inside a sandbox's primary container
// ABOUTME: Every interpolated value is quoted; output markers are shared with the parsers

use std::fmt;

use crate::error::{Result, SandboxError};

/// Directory receiving background command logs.
pub const EXEC_LOG_DIR: &str = "/tmp/exec-logs";

/// Marker file prefix written by an interactive terminal session.
pub const SESSION_MARKER_PREFIX: &str = "/tmp/.terminal-session-";

pub(crate) const LISTENING: &str = "LISTENING";
pub(crate) const NOT_LISTENING: &str = "NOT_LISTENING";
pub(crate) const NO_PROCESS: &str = "NO_PROCESS";
pub(crate) const KILLED: &str = "KILLED";
pub(crate) const KILL_FAILED: &str = "KILL_FAILED";
pub(crate) const SESSION_FOUND: &str = "FOUND";
pub(crate) const SESSION_NOT_FOUND: &str = "SESSION_NOT_FOUND";
pub(crate) const PROCESS_NOT_FOUND: &str = "PROCESS_NOT_FOUND";
pub(crate) const CWD_UNREADABLE: &str = "CWD_UNREADABLE";

/// Opaque terminal session id, restricted to characters safe in a file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(String);

impl SessionId {
    pub fn parse(raw: &str) -> Result<Self> {
        let valid = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(SandboxError::InvalidSessionId(raw.to_string()))
        }
    }

    pub fn marker_path(&self) -> String {
        format!("{}{}", SESSION_MARKER_PREFIX, self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Produces the scripts the exec bridge runs with `sh -c`.
///
/// Implementations must keep the stdout contract the bridge parses:
/// a bare PID for background launches, the `LISTENING`/`NOT_LISTENING`
/// markers for port checks, `NO_PROCESS`/`KILLED <pid>`/`KILL_FAILED <pid>` for
/// kills, and NUL-terminated fields led by a status tag for session lookups
/// (`FOUND <pid> <cwd> <home>`, `SESSION_NOT_FOUND`, `PROCESS_NOT_FOUND <pid>`,
/// `CWD_UNREADABLE <pid>`). Paths are printed raw.
pub trait ScriptBuilder: Send + Sync {
    fn background_launch(&self, workdir: &str, command: &str, log_file: &str) -> String;

    fn port_check(&self, port: u16) -> String;

    fn port_kill(&self, port: u16) -> String;

    fn session_lookup(&self, session: &SessionId) -> String;
}

/// POSIX shell templates built on `ss` and `/proc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellScripts;

impl ScriptBuilder for ShellScripts {
    fn background_launch(&self, workdir: &str, command: &str, log_file: &str) -> String {
        let workdir = shell_quote(workdir);
        format!(
            "cd {workdir} || {{ echo \"working directory not found: \"{workdir} >&2; exit 1; }}\n\
             mkdir -p {log_dir}\n\
             nohup sh -c {command} >> {log_file} 2>&1 < /dev/null &\n\
             echo $!\n",
            log_dir = shell_quote(EXEC_LOG_DIR),
            command = shell_quote(command),
            log_file = shell_quote(log_file),
        )
    }

    fn port_check(&self, port: u16) -> String {
        format!(
            "if ss -tln 2>/dev/null | awk '{{print $4}}' | grep -Eq '[:.]{port}$'; \
             then echo {LISTENING}; else echo {NOT_LISTENING}; fi\n"
        )
    }

    fn port_kill(&self, port: u16) -> String {
        format!(
            "pid=$(ss -tlnp 2>/dev/null | awk '$4 ~ /[:.]{port}$/' | grep -o 'pid=[0-9]*' | head -n 1 | cut -d= -f2)\n\
             if [ -z \"$pid\" ]; then echo {NO_PROCESS}; exit 0; fi\n\
             if kill \"$pid\" 2>/dev/null; then echo \"{KILLED} $pid\"; else echo \"{KILL_FAILED} $pid\"; fi\n"
        )
    }

    fn session_lookup(&self, session: &SessionId) -> String {
        format!(
            "marker={marker}\n\
             if [ ! -f \"$marker\" ]; then printf '%s\\0' {SESSION_NOT_FOUND}; exit 0; fi\n\
             pid=$(tr -cd '0-9' < \"$marker\")\n\
             if [ -z \"$pid\" ] || [ ! -d \"/proc/$pid\" ]; then \
             printf '%s\\0' {PROCESS_NOT_FOUND} \"$pid\"; exit 0; fi\n\
             cwd=$(readlink \"/proc/$pid/cwd\" 2>/dev/null)\n\
             if [ -z \"$cwd\" ]; then printf '%s\\0' {CWD_UNREADABLE} \"$pid\"; exit 0; fi\n\
             uid=$(awk '/^Uid:/ {{print $2}}' \"/proc/$pid/status\")\n\
             home=$(getent passwd \"$uid\" 2>/dev/null | cut -d: -f6)\n\
             [ -n \"$home\" ] || home=\"$HOME\"\n\
             printf '%s\\0' {SESSION_FOUND} \"$pid\" \"$cwd\" \"$home\"\n",
            marker = shell_quote(&session.marker_path()),
        )
    }
}

/// Wrap `value` in single quotes so the shell reads it as one literal word.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r#"'\''"#))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("plain", "'plain'")]
    #[case("", "''")]
    #[case("with space", "'with space'")]
    #[case("it's", r#"'it'\''s'"#)]
    #[case("$(rm -rf /)", "'$(rm -rf /)'")]
    #[case("a; b && c", "'a; b && c'")]
    fn test_shell_quote(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(shell_quote(input), expected);
    }

    #[rstest]
    #[case("abc-123_XYZ", true)]
    #[case("", false)]
    #[case("../etc/passwd", false)]
    #[case("id with space", false)]
    #[case("id;rm", false)]
    fn test_session_id_validation(#[case] raw: &str, #[case] valid: bool) {
        assert_eq!(SessionId::parse(raw).is_ok(), valid);
    }

    #[test]
    fn test_session_marker_path() {
        let session = SessionId::parse("term-7").unwrap();
        assert_eq!(session.marker_path(), "/tmp/.terminal-session-term-7");
    }

    #[test]
    fn test_background_launch_quotes_every_value() {
        let script = ShellScripts.background_launch(
            "/home/dev/my project",
            "npm run dev -- --port 3000 && echo 'up'",
            "/tmp/exec-logs/1700000000000.log",
        );

        assert!(script.starts_with("cd '/home/dev/my project' || {"));
        assert!(script.contains("mkdir -p '/tmp/exec-logs'"));
        assert!(script.contains(
            r#"nohup sh -c 'npm run dev -- --port 3000 && echo '\''up'\''' >> '/tmp/exec-logs/1700000000000.log' 2>&1"#
        ));
        assert!(script.trim_end().ends_with("echo $!"));
    }

    #[test]
    fn test_port_scripts_embed_port() {
        let check = ShellScripts.port_check(3000);
        assert!(check.contains("[:.]3000$"));
        assert!(check.contains(LISTENING));

        let kill = ShellScripts.port_kill(8080);
        assert!(kill.contains("[:.]8080$"));
        assert!(kill.contains(NO_PROCESS));
    }

    #[test]
    fn test_session_lookup_reads_marker() {
        let session = SessionId::parse("abc").unwrap();
        let script = ShellScripts.session_lookup(&session);

        assert!(script.starts_with("marker='/tmp/.terminal-session-abc'\n"));
        assert!(script.contains("printf '%s\\0' SESSION_NOT_FOUND;"));
        assert!(script.contains("printf '%s\\0' PROCESS_NOT_FOUND \"$pid\""));
        assert!(script.contains("printf '%s\\0' CWD_UNREADABLE \"$pid\""));
        assert!(script.contains(r#"printf '%s\0' FOUND "$pid" "$cwd" "$home""#));
    }
}
