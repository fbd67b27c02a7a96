//! Location specifier parsing.
//!
//! - `/mnt/pool/@snapshots`: local path
//! - `host:/mnt/backup/@snapshots`: remote, ssh default user
//! - `root@host:/mnt/backup/@snapshots`: remote with user
//! - `root@[fe80::1]:/backup`: bracketed IPv6 host
//!
//! A `:` that appears after a `/` belongs to a local path.

use std::fmt;
use std::path::PathBuf;

use crate::error::LocationError;

/// Where a set of snapshots lives, before any connection is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationSpec {
    Local {
        root: PathBuf,
    },
    Remote {
        user: Option<String>,
        host: String,
        root: PathBuf,
    },
}

impl LocationSpec {
    pub fn parse(spec: &str) -> Result<Self, LocationError> {
        let invalid = |reason| LocationError::InvalidSpec {
            spec: spec.to_string(),
            reason,
        };
        if spec.is_empty() {
            return Err(invalid("empty location"));
        }

        let Some((authority, root)) = split_remote(spec) else {
            return Ok(Self::Local {
                root: PathBuf::from(spec),
            });
        };

        let (user, host) = match authority.rsplit_once('@') {
            Some((user, host)) if !user.is_empty() => (Some(user.to_string()), host),
            Some(_) => return Err(invalid("empty user before '@'")),
            None => (None, authority),
        };
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        if host.is_empty() {
            return Err(invalid("empty host"));
        }
        if root.is_empty() {
            return Err(invalid("empty remote path"));
        }

        Ok(Self::Remote {
            user,
            host: host.to_string(),
            root: PathBuf::from(root),
        })
    }

    pub fn root(&self) -> &PathBuf {
        match self {
            Self::Local { root } | Self::Remote { root, .. } => root,
        }
    }
}

impl fmt::Display for LocationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local { root } => write!(f, "{}", root.display()),
            Self::Remote { user, host, root } => {
                if let Some(user) = user {
                    write!(f, "{user}@")?;
                }
                if host.contains(':') {
                    write!(f, "[{host}]:{}", root.display())
                } else {
                    write!(f, "{host}:{}", root.display())
                }
            }
        }
    }
}

/// Split `authority:path`, honouring bracketed IPv6 hosts. `None` means the
/// specifier is a local path.
fn split_remote(spec: &str) -> Option<(&str, &str)> {
    let bracket_end = match spec.find('[') {
        Some(open) if !spec[..open].contains('/') => open + spec[open..].find(']')?,
        _ => 0,
    };
    let colon = bracket_end + spec[bracket_end..].find(':')?;
    if spec[..colon].contains('/') {
        return None;
    }
    Some((&spec[..colon], &spec[colon + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/mnt/pool/@snapshots")]
    #[case("relative/snaps")]
    #[case("./odd:name")]
    #[case("/mnt/with:colon")]
    fn local_specs(#[case] spec: &str) {
        let parsed = LocationSpec::parse(spec).expect("parse");
        assert_eq!(parsed, LocationSpec::Local { root: PathBuf::from(spec) });
    }

    #[test]
    fn remote_with_user() {
        let parsed = LocationSpec::parse("root@backup.lan:/mnt/backup/@snaps").expect("parse");
        assert_eq!(
            parsed,
            LocationSpec::Remote {
                user: Some("root".to_string()),
                host: "backup.lan".to_string(),
                root: PathBuf::from("/mnt/backup/@snaps"),
            }
        );
        assert_eq!(parsed.to_string(), "root@backup.lan:/mnt/backup/@snaps");
    }

    #[test]
    fn remote_without_user() {
        let parsed = LocationSpec::parse("nas:/volume1/snaps").expect("parse");
        assert!(matches!(parsed, LocationSpec::Remote { user: None, .. }));
        assert_eq!(parsed.root(), &PathBuf::from("/volume1/snaps"));
    }

    #[test]
    fn remote_ipv6_host() {
        let parsed = LocationSpec::parse("root@[fe80::1]:/backup").expect("parse");
        match &parsed {
            LocationSpec::Remote { host, .. } => assert_eq!(host, "fe80::1"),
            other => panic!("expected remote, got {other:?}"),
        }
        assert_eq!(parsed.to_string(), "root@[fe80::1]:/backup");
    }

    #[rstest]
    #[case("")]
    #[case(":/path")]
    #[case("host:")]
    #[case("@host:/path")]
    fn invalid_specs(#[case] spec: &str) {
        let err = LocationSpec::parse(spec).unwrap_err();
        assert!(matches!(err, LocationError::InvalidSpec { .. }), "got: {err}");
    }
}
