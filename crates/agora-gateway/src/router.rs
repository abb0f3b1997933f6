//! Delivery-set computation. Pure over a snapshot of sessions.

use agora_types::models::{ChatMode, Region};

use crate::registry::{ConnId, Session};

/// Who a frame is meant for.
#[derive(Debug, Clone, PartialEq)]
pub enum Audience<'a> {
    /// Control and metadata frames (users, room counts, join/leave, reactions).
    Everyone,
    /// Chat or voice content from a sender in the given scope.
    Content { mode: ChatMode, region: Region },
    /// Private content: the recipient's session plus an echo to the sender.
    Private { sender: ConnId, recipient: &'a str },
}

impl<'a> Audience<'a> {
    pub fn content_from(sender: &Session) -> Self {
        Self::Content {
            mode: sender.mode,
            region: sender.region,
        }
    }

    pub fn private(sender: &Session, recipient: &'a str) -> Self {
        Self::Private {
            sender: sender.conn_id,
            recipient,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delivery {
    pub targets: Vec<ConnId>,
    /// Private only: no live session holds the recipient's username.
    pub recipient_offline: bool,
}

/// Pick the sessions that receive a frame for `audience`.
///
/// - `Everyone` reaches every session regardless of scope.
/// - Global-mode content reaches every global-mode session; local-mode
///   sessions never see it.
/// - Local-mode content reaches every session in the sender's region,
///   whatever that session's own mode.
/// - Private content reaches the recipient and always echoes to the sender.
pub fn route<'s, I>(audience: &Audience<'_>, sessions: I) -> Delivery
where
    I: IntoIterator<Item = &'s Session>,
{
    let sessions = sessions.into_iter();

    match audience {
        Audience::Everyone => Delivery {
            targets: sessions.map(|s| s.conn_id).collect(),
            recipient_offline: false,
        },

        Audience::Content { mode: ChatMode::Global, .. } => Delivery {
            targets: sessions
                .filter(|s| s.mode == ChatMode::Global)
                .map(|s| s.conn_id)
                .collect(),
            recipient_offline: false,
        },

        Audience::Content { mode: ChatMode::Local, region } => Delivery {
            targets: sessions
                .filter(|s| s.region == *region)
                .map(|s| s.conn_id)
                .collect(),
            recipient_offline: false,
        },

        Audience::Private { sender, recipient } => {
            let recipient_conn = sessions
                .filter(|s| s.username.eq_ignore_ascii_case(recipient))
                .map(|s| s.conn_id)
                .next();

            let mut targets = vec![*sender];
            if let Some(conn) = recipient_conn {
                if conn != *sender {
                    targets.push(conn);
                }
            }
            Delivery {
                targets,
                recipient_offline: recipient_conn.is_none(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_types::models::{Avatar, Room};
    use uuid::Uuid;

    fn session(name: &str, mode: ChatMode, region: Region) -> Session {
        Session {
            conn_id: Uuid::new_v4(),
            username: name.into(),
            mode,
            region,
            room: Room::General,
            avatar: Avatar::default_for(name),
        }
    }

    fn names(delivery: &Delivery, sessions: &[Session]) -> Vec<String> {
        let mut out: Vec<String> = sessions
            .iter()
            .filter(|s| delivery.targets.contains(&s.conn_id))
            .map(|s| s.username.clone())
            .collect();
        out.sort();
        out
    }

    fn mixed() -> Vec<Session> {
        vec![
            session("a", ChatMode::Local, Region::Europe),
            session("b", ChatMode::Local, Region::Europe),
            session("c", ChatMode::Local, Region::NorthAmerica),
            session("d", ChatMode::Global, Region::Global),
        ]
    }

    #[test]
    fn local_content_stays_in_region() {
        let sessions = mixed();
        let delivery = route(&Audience::content_from(&sessions[0]), &sessions);
        assert_eq!(names(&delivery, &sessions), vec!["a", "b"]);
    }

    #[test]
    fn global_content_skips_local_sessions() {
        let sessions = mixed();
        let delivery = route(&Audience::content_from(&sessions[3]), &sessions);
        assert_eq!(names(&delivery, &sessions), vec!["d"]);
    }

    #[test]
    fn local_content_reaches_global_mode_sessions_in_region() {
        let mut sessions = mixed();
        sessions[3].region = Region::Europe;
        let delivery = route(&Audience::content_from(&sessions[0]), &sessions);
        assert_eq!(names(&delivery, &sessions), vec!["a", "b", "d"]);
    }

    #[test]
    fn control_frames_reach_everyone() {
        let sessions = mixed();
        let delivery = route(&Audience::Everyone, &sessions);
        assert_eq!(delivery.targets.len(), 4);
    }

    #[test]
    fn private_reaches_recipient_and_echoes_sender() {
        let sessions = mixed();
        let delivery = route(&Audience::private(&sessions[0], "C"), &sessions);
        assert_eq!(names(&delivery, &sessions), vec!["a", "c"]);
        assert!(!delivery.recipient_offline);
    }

    #[test]
    fn private_to_offline_user_only_echoes() {
        let sessions = mixed();
        let delivery = route(&Audience::private(&sessions[1], "zed"), &sessions);
        assert_eq!(delivery.targets, vec![sessions[1].conn_id]);
        assert!(delivery.recipient_offline);
    }
}
