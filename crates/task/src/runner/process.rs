use memoexec_core::{Error, Invocation, Result};
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};

/// Build the command for `invocation` with both output streams piped
pub(crate) fn build_command(invocation: &Invocation) -> Command {
    let mut cmd = if invocation.use_shell() {
        shell_command(&invocation.shell_command_line())
    } else {
        let mut cmd = Command::new(invocation.program().executable());
        cmd.args(invocation.argv_tail());
        cmd
    };

    configure_stdio(&mut cmd);
    cmd.envs(invocation.environment_overrides());
    if let Some(dir) = invocation.working_dir() {
        cmd.current_dir(dir);
    }
    // A child must not outlive a run that bailed out on a read error
    cmd.kill_on_drop(true);

    cmd
}

#[cfg(unix)]
fn shell_command(command_line: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command_line);
    cmd
}

#[cfg(windows)]
fn shell_command(command_line: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").raw_arg(command_line);
    cmd
}

fn configure_stdio(cmd: &mut Command) {
    // Never inherit output: the runner must see every byte, and echoing is
    // its job. No stdin either, so a cached command cannot depend on input.
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
}

/// Spawn the child, surfacing a missing or non-executable program as
/// [`Error::Spawn`]
pub(crate) fn spawn_child(invocation: &Invocation) -> Result<Child> {
    let program = spawn_label(invocation);
    build_command(invocation)
        .spawn()
        .map_err(|e| Error::spawn(program, e))
}

fn spawn_label(invocation: &Invocation) -> String {
    if invocation.use_shell() {
        invocation.shell_command_line()
    } else {
        invocation.program().executable().to_string()
    }
}

/// Exit code reported for a finished child.
///
/// Signal termination on Unix maps to `128 + signal`, like a POSIX shell.
pub(crate) fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}
