use std::env;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::ptr;
use std::sync::atomic::{AtomicI32, Ordering};

use crate::command::{Invocation, SSH_PROGRAM};
use crate::error::TunnelError;

// ─── Client discovery ───────────────────────────────────────

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Find an executable by name in $PATH.
pub fn find_program(name: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

/// Fail early when the ssh client is not installed.
pub fn require_ssh() -> Result<PathBuf, TunnelError> {
    find_program(SSH_PROGRAM).ok_or_else(|| TunnelError::SshMissing(SSH_PROGRAM.to_string()))
}

// ─── Signal relay ───────────────────────────────────────────

/// PID of the child that relayed signals go to; 0 while no relay is active.
static CHILD_PID: AtomicI32 = AtomicI32::new(0);

const RELAYED_SIGNALS: [libc::c_int; 2] = [libc::SIGINT, libc::SIGTERM];

extern "C" fn relay_signal(sig: libc::c_int) {
    let pid = CHILD_PID.load(Ordering::SeqCst);
    if pid > 0 {
        // ESRCH here just means the child already exited.
        unsafe { libc::kill(pid, sig) };
    }
}

/// Forwards SIGINT/SIGTERM to one child while alive. Dropping it puts the
/// previous dispositions back.
struct SignalRelay {
    previous: Vec<(libc::c_int, libc::sigaction)>,
}

impl SignalRelay {
    fn install(pid: u32) -> Self {
        CHILD_PID.store(pid as i32, Ordering::SeqCst);
        let mut relay = Self {
            previous: Vec::with_capacity(RELAYED_SIGNALS.len()),
        };
        for sig in RELAYED_SIGNALS {
            unsafe {
                let mut action: libc::sigaction = std::mem::zeroed();
                action.sa_sigaction = relay_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
                action.sa_flags = libc::SA_RESTART;
                libc::sigemptyset(&mut action.sa_mask);
                let mut old: libc::sigaction = std::mem::zeroed();
                if libc::sigaction(sig, &action, &mut old) == 0 {
                    relay.previous.push((sig, old));
                }
            }
        }
        relay
    }
}

impl Drop for SignalRelay {
    fn drop(&mut self) {
        for (sig, old) in self.previous.iter().rev() {
            unsafe { libc::sigaction(*sig, old, ptr::null_mut()) };
        }
        CHILD_PID.store(0, Ordering::SeqCst);
    }
}

// ─── Runner ─────────────────────────────────────────────────

/// Exit code as a shell would report it: the child's own code, or
/// 128 + signal number when it was killed.
fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .unwrap_or_else(|| 128 + status.signal().unwrap_or(0))
}

/// Process exit status for a child's exit code; codes outside 0..=255 become 1.
pub fn exit_byte(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

/// Block until `pid` has exited but leave it unreaped, so the PID cannot be
/// recycled while the relay may still signal it.
fn wait_exited(pid: libc::pid_t) -> io::Result<()> {
    loop {
        let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
        let rc = unsafe {
            libc::waitid(
                libc::P_PID,
                pid as libc::id_t,
                &mut info,
                libc::WEXITED | libc::WNOWAIT,
            )
        };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// Launch the invocation with inherited stdio, relay termination signals to
/// it, and block until it exits.
pub fn run(invocation: &Invocation) -> Result<i32, TunnelError> {
    let mut child = Command::new(invocation.program())
        .args(invocation.args())
        .spawn()
        .map_err(|source| TunnelError::Launch {
            program: invocation.program().to_string(),
            source,
        })?;

    let pid = child.id();
    let relay = SignalRelay::install(pid);
    let exited = wait_exited(pid as libc::pid_t);
    drop(relay);
    exited.map_err(TunnelError::Wait)?;

    let status = child.wait().map_err(TunnelError::Wait)?;
    Ok(exit_code(status))
}
