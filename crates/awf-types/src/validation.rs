//! Small, focused validators used while turning raw CLI strings into a
//! [`crate::config::Config`].

use crate::error::{CommonError, Result};
use std::path::{Path, PathBuf};

/// Port number validation (syntactic only; the dangerous-ports policy
/// lives in `awf-proxy`, since it only applies to `--allow-host-ports`).
pub struct PortValidator;

impl PortValidator {
    pub fn validate(port: u16) -> Result<()> {
        if port == 0 {
            return Err(CommonError::Validation("port number cannot be 0".into()));
        }
        Ok(())
    }

    pub fn validate_range(start: u16, end: u16) -> Result<()> {
        if start == 0 || end == 0 {
            return Err(CommonError::Validation("port numbers cannot be 0".into()));
        }
        if start > end {
            return Err(CommonError::Validation(format!(
                "invalid port range: {start} is greater than {end}"
            )));
        }
        Ok(())
    }
}

/// Guards against a `workDir` or mount source escaping via `..` before it
/// is canonicalized.
pub struct PathValidator;

impl PathValidator {
    pub fn reject_traversal(path: &Path) -> Result<()> {
        let s = path.to_string_lossy();
        if s.contains("..") {
            return Err(CommonError::Validation(format!(
                "path contains a directory traversal segment: {s}"
            )));
        }
        Ok(())
    }

    /// Expand a leading `~` to the invoking user's home directory.
    pub fn expand_home(path: &str) -> Result<PathBuf> {
        if let Some(rest) = path.strip_prefix("~/") {
            let home = std::env::var("HOME")
                .map_err(|_| CommonError::Validation("HOME is not set, cannot expand ~".into()))?;
            return Ok(PathBuf::from(home).join(rest));
        }
        if path == "~" {
            let home = std::env::var("HOME")
                .map_err(|_| CommonError::Validation("HOME is not set, cannot expand ~".into()))?;
            return Ok(PathBuf::from(home));
        }
        Ok(PathBuf::from(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_zero_rejected() {
        assert!(PortValidator::validate(0).is_err());
        assert!(PortValidator::validate(8080).is_ok());
    }

    #[test]
    fn inverted_range_rejected() {
        assert!(PortValidator::validate_range(100, 50).is_err());
        assert!(PortValidator::validate_range(100, 200).is_ok());
    }

    #[test]
    fn traversal_rejected() {
        assert!(PathValidator::reject_traversal(Path::new("/a/../b")).is_err());
        assert!(PathValidator::reject_traversal(Path::new("/a/b")).is_ok());
    }

    #[test]
    fn home_expansion() {
        std::env::set_var("HOME", "/home/tester");
        assert_eq!(
            PathValidator::expand_home("~/work").unwrap(),
            PathBuf::from("/home/tester/work")
        );
        assert_eq!(
            PathValidator::expand_home("/abs/path").unwrap(),
            PathBuf::from("/abs/path")
        );
    }
}
