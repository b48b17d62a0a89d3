//! Default seccomp profile written to `workDir/seccomp.json` and bound
//! into the agent container via `security_opt` (spec.md §4.5).
//!
//! A curated allowlist rather than the upstream engine's full default
//! profile: broad enough for a shell-driven coding agent (file I/O,
//! process management, ordinary socket use) while leaving the
//! dangerous syscalls (`ptrace`, kernel module loading, raw sockets)
//! denied, reinforcing the `cap_drop` set the container spec builder
//! already applies.

use crate::error::Result;
use awf_types::workspace::write_with_mode;
use std::path::Path;

const ALLOWED_SYSCALLS: &[&str] = &[
    "accept", "accept4", "access", "arch_prctl", "bind", "brk", "chdir", "chmod", "chown",
    "clock_gettime", "clone", "clone3", "close", "connect", "dup", "dup2", "dup3",
    "epoll_create1", "epoll_ctl", "epoll_wait", "execve", "execveat", "exit", "exit_group",
    "fchdir", "fchmod", "fchown", "fcntl", "fork", "fstat", "fstatfs", "futex", "getcwd",
    "getdents64", "getegid", "geteuid", "getgid", "getpid", "getppid", "getrandom",
    "getrlimit", "getsockname", "getsockopt", "gettid", "gettimeofday", "getuid", "ioctl",
    "kill", "listen", "lseek", "lstat", "madvise", "mkdir", "mmap", "mprotect", "munmap",
    "nanosleep", "open", "openat", "pipe", "pipe2", "poll", "prctl", "pread64", "pwrite64",
    "read", "readlink", "readv", "recvfrom", "recvmsg", "rename", "rmdir", "rt_sigaction",
    "rt_sigprocmask", "rt_sigreturn", "sched_yield", "select", "sendmsg", "sendto",
    "set_robust_list", "set_tid_address", "setsockopt", "sigaltstack", "socket",
    "socketpair", "stat", "statfs", "symlink", "sysinfo", "umask", "uname", "unlink",
    "utime", "utimensat", "wait4", "waitid", "write", "writev",
];

pub fn write_default_profile(path: &Path) -> Result<()> {
    let profile = serde_json::json!({
        "defaultAction": "SCMP_ACT_ERRNO",
        "archMap": [
            {
                "architecture": "SCMP_ARCH_X86_64",
                "subArchitectures": ["SCMP_ARCH_X86", "SCMP_ARCH_X32"]
            },
            {
                "architecture": "SCMP_ARCH_AARCH64",
                "subArchitectures": ["SCMP_ARCH_ARM"]
            }
        ],
        "syscalls": [
            {
                "names": ALLOWED_SYSCALLS,
                "action": "SCMP_ACT_ALLOW"
            }
        ]
    });
    let text = serde_json::to_string_pretty(&profile)?;
    write_with_mode(path, &text, 0o600)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_valid_json_with_restrictive_mode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seccomp.json");
        write_default_profile(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["defaultAction"], "SCMP_ACT_ERRNO");
        assert!(parsed["syscalls"][0]["names"]
            .as_array()
            .unwrap()
            .iter()
            .any(|n| n == "execve"));
        assert!(!parsed["syscalls"][0]["names"]
            .as_array()
            .unwrap()
            .iter()
            .any(|n| n == "ptrace"));

        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
