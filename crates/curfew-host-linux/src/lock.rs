//! Session locking through systemd-logind
//!
//! Uses `loginctl`, so the agent needs to run as root (or be granted the
//! `org.freedesktop.login1.lock-sessions` polkit action).

use async_trait::async_trait;
use curfew_host_api::{ControlError, ControlResult, Enforcer, LockController};
use tracing::{debug, info};

use crate::command::run;

const LOGINCTL: &str = "loginctl";

/// Session name meaning "every graphical user session"
pub const AUTO_SESSION: &str = "auto";

/// Which sessions the lock applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTarget {
    /// Every lockable session known to logind
    All,
    /// A single session id
    Session(String),
}

impl SessionTarget {
    pub fn from_name(name: &str) -> Self {
        if name == AUTO_SESSION {
            Self::All
        } else {
            Self::Session(name.to_string())
        }
    }
}

/// Locks sessions with `loginctl lock-session(s)`
pub struct LoginctlSessionLock {
    target: SessionTarget,
}

impl LoginctlSessionLock {
    pub fn new(target: SessionTarget) -> Self {
        Self { target }
    }

    /// Build from the configured session name (`auto` for all sessions)
    pub fn for_session(name: &str) -> Self {
        Self::new(SessionTarget::from_name(name))
    }

    async fn session_locked(session: &str) -> ControlResult<bool> {
        let output = run(
            LOGINCTL,
            &["show-session", session, "-p", "LockedHint", "--value"],
        )
        .await?;
        parse_locked_hint(&output.stdout)
    }

    async fn list_sessions() -> ControlResult<Vec<String>> {
        let output = run(LOGINCTL, &["list-sessions", "--no-legend"]).await?;
        Ok(parse_session_ids(&output.stdout))
    }

    async fn session_info(session: &str) -> ControlResult<SessionInfo> {
        let output = run(
            LOGINCTL,
            &[
                "show-session",
                session,
                "-p",
                "Class",
                "-p",
                "Type",
                "-p",
                "LockedHint",
            ],
        )
        .await?;
        SessionInfo::parse(session, &output.stdout)
    }
}

/// Properties of one logind session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: String,
    pub class: String,
    pub session_type: String,
    pub locked: bool,
}

impl SessionInfo {
    /// Parse `show-session -p Class -p Type -p LockedHint` output
    pub fn parse(id: &str, output: &str) -> ControlResult<Self> {
        let mut class = String::new();
        let mut session_type = String::new();
        let mut locked = None;

        for line in output.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key.trim() {
                "Class" => class = value.trim().to_string(),
                "Type" => session_type = value.trim().to_string(),
                "LockedHint" => locked = Some(parse_locked_hint(value)?),
                _ => {}
            }
        }

        let locked = locked.ok_or_else(|| {
            ControlError::system(format!("no LockedHint reported for session {}", id))
        })?;

        Ok(Self {
            id: id.to_string(),
            class,
            session_type,
            locked,
        })
    }

    /// Greeter, tty and ssh sessions never report a lock state
    pub fn is_lockable(&self) -> bool {
        self.class == "user" && matches!(self.session_type.as_str(), "x11" | "wayland")
    }
}

/// Every lockable session is locked; no lockable session counts as locked
pub fn all_lockable_locked(sessions: &[SessionInfo]) -> bool {
    sessions
        .iter()
        .filter(|session| session.is_lockable())
        .all(|session| session.locked)
}

#[async_trait]
impl Enforcer for LoginctlSessionLock {
    fn name(&self) -> &'static str {
        "session_lock"
    }

    async fn is_enforced(&self) -> ControlResult<bool> {
        match &self.target {
            SessionTarget::Session(id) => Self::session_locked(id).await,
            SessionTarget::All => {
                let mut sessions = Vec::new();
                for id in Self::list_sessions().await? {
                    let info = Self::session_info(&id).await?;
                    debug!(
                        session = %info.id,
                        class = %info.class,
                        session_type = %info.session_type,
                        locked = info.locked,
                        lockable = info.is_lockable(),
                        "Session state"
                    );
                    sessions.push(info);
                }
                Ok(all_lockable_locked(&sessions))
            }
        }
    }

    async fn enforce(&self) -> ControlResult<()> {
        match &self.target {
            SessionTarget::Session(id) => run(LOGINCTL, &["lock-session", id.as_str()]).await?,
            SessionTarget::All => run(LOGINCTL, &["lock-sessions"]).await?,
        };
        info!(target_sessions = ?self.target, "Session locked");
        Ok(())
    }

    async fn release(&self) -> ControlResult<()> {
        match &self.target {
            SessionTarget::Session(id) => run(LOGINCTL, &["unlock-session", id.as_str()]).await?,
            SessionTarget::All => run(LOGINCTL, &["unlock-sessions"]).await?,
        };
        info!(target_sessions = ?self.target, "Session unlocked");
        Ok(())
    }
}

impl LockController for LoginctlSessionLock {}

/// Parse `loginctl show-session -p LockedHint --value`
pub fn parse_locked_hint(output: &str) -> ControlResult<bool> {
    match output.trim() {
        "yes" => Ok(true),
        "no" => Ok(false),
        other => Err(ControlError::system(format!(
            "unexpected LockedHint value '{}'",
            other
        ))),
    }
}

/// Session ids from `loginctl list-sessions --no-legend`
pub fn parse_session_ids(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_target_from_name() {
        assert_eq!(SessionTarget::from_name("auto"), SessionTarget::All);
        assert_eq!(
            SessionTarget::from_name("3"),
            SessionTarget::Session("3".into())
        );
    }

    #[test]
    fn parses_locked_hint() {
        assert!(parse_locked_hint("yes\n").unwrap());
        assert!(!parse_locked_hint("no").unwrap());
        assert!(parse_locked_hint("").is_err());
    }

    #[test]
    fn parses_session_list() {
        let output = "      2 1000 alice seat0 tty2\n     c1  120 gdm   seat0 tty1\n";
        assert_eq!(parse_session_ids(output), vec!["2", "c1"]);
        assert!(parse_session_ids("").is_empty());
    }

    fn session(id: &str, output: &str) -> SessionInfo {
        SessionInfo::parse(id, output).unwrap()
    }

    #[test]
    fn parses_session_properties() {
        let info = session("2", "Class=user\nType=wayland\nLockedHint=yes\n");
        assert_eq!(info.class, "user");
        assert_eq!(info.session_type, "wayland");
        assert!(info.locked);
        assert!(info.is_lockable());

        assert!(SessionInfo::parse("2", "Class=user\nType=x11\n").is_err());
    }

    #[test]
    fn greeter_and_remote_sessions_are_ignored() {
        let sessions = vec![
            session("2", "Class=user\nType=wayland\nLockedHint=yes\n"),
            session("c1", "Class=greeter\nType=wayland\nLockedHint=no\n"),
            session("5", "Class=user\nType=tty\nLockedHint=no\n"),
            session("7", "Class=user\nType=unspecified\nLockedHint=no\n"),
        ];
        assert!(all_lockable_locked(&sessions));

        let mut unlocked = sessions.clone();
        unlocked[0].locked = false;
        assert!(!all_lockable_locked(&unlocked));
    }

    #[test]
    fn no_lockable_sessions_counts_as_locked() {
        let sessions = vec![session("c1", "Class=greeter\nType=x11\nLockedHint=no\n")];
        assert!(all_lockable_locked(&sessions));
        assert!(all_lockable_locked(&[]));
    }
}
