//! UID/GID policy for the agent image's `USER_UID`/`USER_GID` build args
//! (spec.md §4.5 "UID policy").
//!
//! Avoids writing files from inside the sandbox that land on the host
//! owned by a system account: a system UID (<1000), or an elevated
//! process that lost its invoking user's identity (`sudo` without
//! `SUDO_UID` in its environment — i.e. logged in as root directly),
//! both collapse to `1000:1000`.

pub fn resolve_uid_gid(
    process_uid: u32,
    process_gid: u32,
    sudo_uid: Option<u32>,
    sudo_gid: Option<u32>,
) -> (u32, u32) {
    const FALLBACK: u32 = 1000;

    let (uid, gid) = if process_uid == 0 {
        match (sudo_uid, sudo_gid) {
            (Some(u), Some(g)) => (u, g),
            _ => (FALLBACK, FALLBACK),
        }
    } else {
        (process_uid, process_gid)
    };

    if uid < 1000 {
        (FALLBACK, FALLBACK)
    } else {
        (uid, gid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinary_user_identity_is_kept() {
        assert_eq!(resolve_uid_gid(1001, 1001, None, None), (1001, 1001));
    }

    #[test]
    fn system_account_collapses_to_1000() {
        assert_eq!(resolve_uid_gid(33, 33, None, None), (1000, 1000));
    }

    #[test]
    fn root_without_sudo_env_collapses_to_1000() {
        assert_eq!(resolve_uid_gid(0, 0, None, None), (1000, 1000));
    }

    #[test]
    fn sudo_with_env_uses_real_invoking_user() {
        assert_eq!(resolve_uid_gid(0, 0, Some(1001), Some(1001)), (1001, 1001));
    }

    #[test]
    fn sudo_env_pointing_at_a_system_account_still_collapses() {
        assert_eq!(resolve_uid_gid(0, 0, Some(33), Some(33)), (1000, 1000));
    }
}
