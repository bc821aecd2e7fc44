// ABOUTME: Init phase script that prepares the persistent workspace volume
// ABOUTME: Never overwrites a user profile and only seeds an absent or empty project dir

/// Mount point of the persistent workspace claim; the sandbox user's home.
pub const HOME_DIR: &str = "/home/dev";
pub const PROJECT_DIR: &str = "/home/dev/project";
/// Project template shipped inside the runtime image.
pub const TEMPLATE_DIR: &str = "/opt/kubedev/template";

const SANDBOX_UID: u32 = 1000;

/// Profile written on first boot. The terminal session records its shell PID
/// in the session marker file so the exec bridge can resolve its directory.
const DEFAULT_PROFILE: &str = r#"# kubedev default profile
export PS1='\u@\h:\w\$ '
cd "$HOME/project" 2>/dev/null || true
if [ -n "$TERMINAL_SESSION_ID" ]; then
  echo $$ > "/tmp/.terminal-session-$TERMINAL_SESSION_ID"
fi
"#;

pub(crate) fn init_script() -> String {
    format!(
        r#"set -e
if [ ! -f "{home}/.bashrc" ]; then
  cat > "{home}/.bashrc" <<'KUBEDEV_PROFILE'
{profile}KUBEDEV_PROFILE
fi
if [ ! -d "{project}" ] || [ -z "$(ls -A "{project}" 2>/dev/null)" ]; then
  mkdir -p "{project}"
  if [ -d "{template}" ]; then
    cp -a "{template}/." "{project}/"
  fi
fi
chown -R {uid}:{uid} "{home}" || true
"#,
        home = HOME_DIR,
        project = PROJECT_DIR,
        template = TEMPLATE_DIR,
        profile = DEFAULT_PROFILE,
        uid = SANDBOX_UID,
    )
}
