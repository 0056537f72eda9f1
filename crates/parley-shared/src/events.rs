use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{RoomName, Username};

/// Events sent by clients over the WebSocket.
///
/// Wire framing is one JSON object per text frame, `{"event": ..., "data": ...}`.
/// Event names and payload field names are frozen for interop with deployed
/// clients; renaming any of them is a breaking protocol change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Bind this connection to a username. Payload is the bare name string.
    #[serde(rename = "registerUser")]
    RegisterUser(Username),

    /// Enter a room, implicitly leaving the current one.
    #[serde(rename = "joinRoom")]
    JoinRoom { room: RoomName, username: Username },

    /// Leave the current room, if any.
    #[serde(rename = "leaveRoom")]
    LeaveRoom,

    /// Typing indicator for the sender's room.
    #[serde(rename = "typing")]
    Typing { room: RoomName, username: Username },

    /// Explicit end of a room typing indicator.
    #[serde(rename = "stopTyping")]
    StopTyping { room: RoomName },

    /// Typing indicator aimed at one user.
    #[serde(rename = "typingPrivate")]
    TypingPrivate {
        from_user: Username,
        to_user: Username,
    },

    /// Explicit end of a private typing indicator.
    #[serde(rename = "stopTypingPrivate")]
    StopTypingPrivate {
        from_user: Username,
        to_user: Username,
    },

    /// Post a message to a room.
    #[serde(rename = "sendMessage")]
    SendMessage {
        room: RoomName,
        username: Username,
        message: String,
    },

    /// Send a direct message to one user.
    #[serde(rename = "sendPrivate")]
    SendPrivate {
        from_user: Username,
        to_user: Username,
        message: String,
    },
}

/// Whether a typing indicator refers to a room or a direct conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TypingScope {
    Room,
    Private,
}

/// Events pushed by the server to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Human-readable room notice ("alice joined general"). Payload is the
    /// bare text string.
    #[serde(rename = "systemMessage")]
    SystemMessage(String),

    /// Someone started typing. Room scope carries `room`; private scope
    /// carries only `from`.
    #[serde(rename = "typing")]
    Typing {
        #[serde(rename = "type")]
        scope: TypingScope,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room: Option<RoomName>,
        from: Username,
    },

    /// A typing indicator ended (explicitly or by server timeout).
    #[serde(rename = "stopTyping")]
    StopTyping {
        #[serde(rename = "type")]
        scope: TypingScope,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room: Option<RoomName>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<Username>,
    },

    /// A persisted room message, fanned out to every member.
    #[serde(rename = "receiveMessage")]
    ReceiveMessage {
        from_user: Username,
        room: RoomName,
        message: String,
        date_sent: DateTime<Utc>,
    },

    /// A persisted direct message, delivered to the recipient and echoed to
    /// the sender.
    #[serde(rename = "receivePrivate")]
    ReceivePrivate {
        from_user: Username,
        to_user: Username,
        message: String,
        date_sent: DateTime<Utc>,
    },
}

impl ClientEvent {
    /// Parse one inbound text frame.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Serialize for sending (used by test clients).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ServerEvent {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn register_user_takes_bare_string_payload() {
        let event =
            ClientEvent::from_json(r#"{"event":"registerUser","data":"alice"}"#).unwrap();
        assert_eq!(event, ClientEvent::RegisterUser(Username::from("alice")));
    }

    #[test]
    fn join_room_wire_shape() {
        let event = ClientEvent::JoinRoom {
            room: RoomName::from("general"),
            username: Username::from("alice"),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"event": "joinRoom", "data": {"room": "general", "username": "alice"}})
        );
    }

    #[test]
    fn leave_room_has_no_payload() {
        let event = ClientEvent::from_json(r#"{"event":"leaveRoom"}"#).unwrap();
        assert_eq!(event, ClientEvent::LeaveRoom);
    }

    #[test]
    fn send_private_field_names() {
        let event = ClientEvent::from_json(
            r#"{"event":"sendPrivate","data":{"from_user":"a","to_user":"b","message":"hi"}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::SendPrivate {
                from_user: Username::from("a"),
                to_user: Username::from("b"),
                message: "hi".to_string(),
            }
        );
    }

    #[test]
    fn room_typing_payload_carries_room_and_from() {
        let event = ServerEvent::Typing {
            scope: TypingScope::Room,
            room: Some(RoomName::from("general")),
            from: Username::from("alice"),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"event": "typing", "data": {"type": "room", "room": "general", "from": "alice"}})
        );
    }

    #[test]
    fn private_stop_typing_omits_room() {
        let event = ServerEvent::StopTyping {
            scope: TypingScope::Private,
            room: None,
            from: Some(Username::from("bob")),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"event": "stopTyping", "data": {"type": "private", "from": "bob"}})
        );
    }

    #[test]
    fn room_stop_typing_omits_from() {
        let event = ServerEvent::StopTyping {
            scope: TypingScope::Room,
            room: Some(RoomName::from("general")),
            from: None,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"event": "stopTyping", "data": {"type": "room", "room": "general"}})
        );
    }

    #[test]
    fn receive_message_wire_shape() {
        let date_sent: DateTime<Utc> = "2026-01-05T09:30:00Z".parse().unwrap();
        let event = ServerEvent::ReceiveMessage {
            from_user: Username::from("alice"),
            room: RoomName::from("general"),
            message: "hi".to_string(),
            date_sent,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "receiveMessage",
                "data": {
                    "from_user": "alice",
                    "room": "general",
                    "message": "hi",
                    "date_sent": "2026-01-05T09:30:00Z"
                }
            })
        );
    }

    #[test]
    fn system_message_is_bare_text() {
        let event = ServerEvent::SystemMessage("alice joined general".to_string());
        assert_eq!(
            event.to_json().unwrap(),
            r#"{"event":"systemMessage","data":"alice joined general"}"#
        );
    }
}
