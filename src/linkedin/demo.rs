use crate::{
    error::{PostGenError, Result},
    linkedin::oauth::generate_state,
};
use uuid::Uuid;

/// Offline stand-in for the LinkedIn connection, for dry runs and walkthroughs.
/// Transitions happen only when an event is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemoConnection {
    Disconnected,
    AwaitingApproval { state: String },
    Connected { member: String },
    Posted { member: String, post_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemoEvent {
    Connect,
    Approve { state: String },
    Deny,
    Post,
    Disconnect,
}

impl Default for DemoConnection {
    fn default() -> Self {
        DemoConnection::Disconnected
    }
}

impl DemoConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(&self) -> &'static str {
        match self {
            DemoConnection::Disconnected => "disconnected",
            DemoConnection::AwaitingApproval { .. } => "awaiting approval",
            DemoConnection::Connected { .. } => "connected",
            DemoConnection::Posted { .. } => "posted",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            DemoConnection::Connected { .. } | DemoConnection::Posted { .. }
        )
    }

    pub fn apply(self, event: DemoEvent) -> Result<Self> {
        let next = match (self, event) {
            (_, DemoEvent::Disconnect) => DemoConnection::Disconnected,
            (DemoConnection::Disconnected, DemoEvent::Connect) => {
                DemoConnection::AwaitingApproval {
                    state: generate_state(),
                }
            }
            // reconnecting keeps the already issued state
            (current @ DemoConnection::AwaitingApproval { .. }, DemoEvent::Connect) => current,
            (DemoConnection::AwaitingApproval { state }, DemoEvent::Approve { state: returned }) => {
                if state != returned {
                    return Err(PostGenError::StateMismatch);
                }
                DemoConnection::Connected {
                    member: "urn:li:person:demo".to_string(),
                }
            }
            (DemoConnection::AwaitingApproval { .. }, DemoEvent::Deny) => {
                DemoConnection::Disconnected
            }
            (DemoConnection::Connected { member }, DemoEvent::Post)
            | (DemoConnection::Posted { member, .. }, DemoEvent::Post) => DemoConnection::Posted {
                member,
                post_id: format!("urn:li:share:demo-{}", Uuid::new_v4().simple()),
            },
            (current, event) => {
                return Err(PostGenError::InvalidTransition {
                    from: current.label().to_string(),
                    action: format!("{:?}", event).to_lowercase(),
                })
            }
        };

        log::debug!("Demo connection is now {}", next.label());
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn awaiting() -> (DemoConnection, String) {
        let connection = DemoConnection::new().apply(DemoEvent::Connect).unwrap();
        let state = match &connection {
            DemoConnection::AwaitingApproval { state } => state.clone(),
            other => panic!("unexpected {:?}", other),
        };
        (connection, state)
    }

    #[test]
    fn test_full_demo_flow() {
        let (connection, state) = awaiting();
        let connection = connection.apply(DemoEvent::Approve { state }).unwrap();
        assert!(connection.is_connected());

        let connection = connection.apply(DemoEvent::Post).unwrap();
        assert_eq!(connection.label(), "posted");

        let connection = connection.apply(DemoEvent::Disconnect).unwrap();
        assert_eq!(connection, DemoConnection::Disconnected);
    }

    #[test]
    fn test_reconnect_keeps_state() {
        let (connection, state) = awaiting();
        let again = connection.apply(DemoEvent::Connect).unwrap();
        assert_eq!(again, DemoConnection::AwaitingApproval { state });
    }

    #[test]
    fn test_approve_with_wrong_state() {
        let (connection, _) = awaiting();
        let result = connection.apply(DemoEvent::Approve {
            state: "wrong".to_string(),
        });
        assert!(matches!(result, Err(PostGenError::StateMismatch)));
    }

    #[test]
    fn test_post_requires_connection() {
        let result = DemoConnection::new().apply(DemoEvent::Post);
        assert!(matches!(
            result,
            Err(PostGenError::InvalidTransition { .. })
        ));
    }
}
