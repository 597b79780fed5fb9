//! Line protocol message definitions
//! These are the wire types for client-server communication.
//!
//! Every message is one line of space-separated ASCII tokens:
//!
//! ```text
//! JOIN <name>
//! WELCOME <participant>
//! INPUT <seq> <dx> <dy>
//! STATE <tick> <p1x> <p1y> <p1score> <p2x> <p2y> <p2score> <coinx> <coiny> <coin_active> <server_time>
//! ```

use std::str::FromStr;

use crate::game::physics::{Direction, Vec2};
use crate::game::snapshot::{ParticipantSnapshot, WorldSnapshot};
use crate::game::state::Pickup;

/// Protocol decode errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Empty line")]
    Empty,

    #[error("Unknown message type: {0}")]
    Unknown(String),

    #[error("Malformed {0} message")]
    Malformed(&'static str),
}

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMsg {
    /// Advisory hello; the server assigns slots by connection order
    Join { name: String },

    /// Directional key state changed
    Input { seq: i32, direction: Direction },
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMsg {
    /// Slot assignment, sent once per connection (participant 1 or 2)
    Welcome { participant: u8 },

    /// World snapshot, sent every tick
    State(WorldSnapshot),
}

impl ClientMsg {
    pub fn encode(&self) -> String {
        match self {
            ClientMsg::Join { name } => format!("JOIN {}", name),
            ClientMsg::Input { seq, direction } => {
                format!("INPUT {} {} {}", seq, direction.dx, direction.dy)
            }
        }
    }

    pub fn decode(line: &str) -> Result<Self, ProtocolError> {
        let mut tokens = line.split_ascii_whitespace();
        let tag = tokens.next().ok_or(ProtocolError::Empty)?;

        match tag {
            "JOIN" => Ok(ClientMsg::Join {
                name: tokens.collect::<Vec<_>>().join(" "),
            }),
            "INPUT" => {
                const TAG: &str = "INPUT";
                let fields = collect_exact::<3>(tokens, TAG)?;
                let seq = parse::<i32>(fields[0], TAG)?;
                let dx = parse::<i8>(fields[1], TAG)?;
                let dy = parse::<i8>(fields[2], TAG)?;
                let direction = Direction::new(dx, dy).ok_or(ProtocolError::Malformed(TAG))?;
                Ok(ClientMsg::Input { seq, direction })
            }
            other => Err(ProtocolError::Unknown(other.to_string())),
        }
    }
}

impl ServerMsg {
    pub fn encode(&self) -> String {
        match self {
            ServerMsg::Welcome { participant } => format!("WELCOME {}", participant),
            ServerMsg::State(s) => {
                let [p1, p2] = &s.participants;
                format!(
                    "STATE {} {} {} {} {} {} {} {} {} {} {:.6}",
                    s.tick,
                    p1.position.x,
                    p1.position.y,
                    p1.score,
                    p2.position.x,
                    p2.position.y,
                    p2.score,
                    s.pickup.position.x,
                    s.pickup.position.y,
                    u8::from(s.pickup.active),
                    s.server_time,
                )
            }
        }
    }

    pub fn decode(line: &str) -> Result<Self, ProtocolError> {
        let mut tokens = line.split_ascii_whitespace();
        let tag = tokens.next().ok_or(ProtocolError::Empty)?;

        match tag {
            "WELCOME" => {
                const TAG: &str = "WELCOME";
                let [n] = collect_exact::<1>(tokens, TAG)?;
                match parse::<u8>(n, TAG)? {
                    participant @ 1..=2 => Ok(ServerMsg::Welcome { participant }),
                    _ => Err(ProtocolError::Malformed(TAG)),
                }
            }
            "STATE" => decode_state(tokens).map(ServerMsg::State),
            other => Err(ProtocolError::Unknown(other.to_string())),
        }
    }
}

fn decode_state<'a>(tokens: impl Iterator<Item = &'a str>) -> Result<WorldSnapshot, ProtocolError> {
    const TAG: &str = "STATE";
    let f = collect_exact::<11>(tokens, TAG)?;

    let participant = |x: &str, y: &str, score: &str| -> Result<ParticipantSnapshot, ProtocolError> {
        Ok(ParticipantSnapshot {
            position: Vec2::new(parse(x, TAG)?, parse(y, TAG)?),
            score: parse(score, TAG)?,
        })
    };

    let active = match f[9] {
        "0" => false,
        "1" => true,
        _ => return Err(ProtocolError::Malformed(TAG)),
    };

    Ok(WorldSnapshot {
        tick: parse(f[0], TAG)?,
        participants: [participant(f[1], f[2], f[3])?, participant(f[4], f[5], f[6])?],
        pickup: Pickup {
            position: Vec2::new(parse(f[7], TAG)?, parse(f[8], TAG)?),
            active,
        },
        server_time: parse(f[10], TAG)?,
    })
}

/// Strip the `\n` / `\r\n` terminator from a raw line and check it is text.
///
/// Bytes that are not UTF-8 make the line malformed; the connection itself is fine.
pub fn line_text(raw: &[u8]) -> Result<&str, ProtocolError> {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    std::str::from_utf8(raw).map_err(|_| ProtocolError::Malformed("UTF-8"))
}

/// Take exactly `N` remaining tokens, rejecting short and long lines
fn collect_exact<'a, const N: usize>(
    mut tokens: impl Iterator<Item = &'a str>,
    tag: &'static str,
) -> Result<[&'a str; N], ProtocolError> {
    let mut out = [""; N];
    for slot in out.iter_mut() {
        *slot = tokens.next().ok_or(ProtocolError::Malformed(tag))?;
    }
    if tokens.next().is_some() {
        return Err(ProtocolError::Malformed(tag));
    }
    Ok(out)
}

fn parse<T: FromStr>(token: &str, tag: &'static str) -> Result<T, ProtocolError> {
    token.parse().map_err(|_| ProtocolError::Malformed(tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> WorldSnapshot {
        WorldSnapshot {
            tick: 42,
            server_time: 12345.678_9,
            participants: [
                ParticipantSnapshot {
                    position: Vec2::new(206.666_67, 300.0),
                    score: 1,
                },
                ParticipantSnapshot {
                    position: Vec2::new(600.0, 15.0),
                    score: 0,
                },
            ],
            pickup: Pickup {
                position: Vec2::new(150.25, 149.5),
                active: true,
            },
        }
    }

    #[test]
    fn state_line_matches_wire_format() {
        let mut snapshot = sample_snapshot();
        snapshot.participants[0].position = Vec2::new(100.0, 200.0);
        snapshot.participants[1].position = Vec2::new(300.0, 200.0);
        snapshot.pickup.position = Vec2::new(150.0, 150.0);
        snapshot.server_time = 12345.6789;

        assert_eq!(
            ServerMsg::State(snapshot).encode(),
            "STATE 42 100 200 1 300 200 0 150 150 1 12345.678900"
        );
    }

    #[test]
    fn state_encode_decode_preserves_fields() {
        let snapshot = sample_snapshot();
        let line = ServerMsg::State(snapshot.clone()).encode();

        let ServerMsg::State(decoded) = ServerMsg::decode(&line).unwrap() else {
            panic!("expected STATE");
        };
        assert_eq!(decoded.tick, 42);
        assert!(decoded.pickup.active);
        assert_eq!(decoded.scores(), [1, 0]);
        for (a, b) in decoded.participants.iter().zip(snapshot.participants.iter()) {
            assert!((a.position.x - b.position.x).abs() < 1e-3);
            assert!((a.position.y - b.position.y).abs() < 1e-3);
        }
        assert!((decoded.server_time - snapshot.server_time).abs() < 1e-6);
    }

    #[test]
    fn state_rejects_wrong_token_count_and_bad_numbers() {
        assert_eq!(
            ServerMsg::decode("STATE 1 2 3"),
            Err(ProtocolError::Malformed("STATE"))
        );
        assert_eq!(
            ServerMsg::decode("STATE 1 100 200 0 300 200 0 150 150 1 0.5 extra"),
            Err(ProtocolError::Malformed("STATE"))
        );
        assert_eq!(
            ServerMsg::decode("STATE 1 abc 200 0 300 200 0 150 150 1 0.5"),
            Err(ProtocolError::Malformed("STATE"))
        );
        assert_eq!(
            ServerMsg::decode("STATE 1 100 200 0 300 200 0 150 150 2 0.5"),
            Err(ProtocolError::Malformed("STATE"))
        );
    }

    #[test]
    fn welcome_only_for_slots_one_and_two() {
        assert_eq!(
            ServerMsg::decode("WELCOME 2"),
            Ok(ServerMsg::Welcome { participant: 2 })
        );
        assert_eq!(ServerMsg::Welcome { participant: 1 }.encode(), "WELCOME 1");
        assert!(ServerMsg::decode("WELCOME 3").is_err());
        assert!(ServerMsg::decode("WELCOME").is_err());
    }

    #[test]
    fn input_decode() {
        assert_eq!(
            ClientMsg::decode("INPUT 1 1 0\r"),
            Ok(ClientMsg::Input {
                seq: 1,
                direction: Direction { dx: 1, dy: 0 },
            })
        );
        assert_eq!(
            ClientMsg::Input {
                seq: 7,
                direction: Direction { dx: -1, dy: 1 },
            }
            .encode(),
            "INPUT 7 -1 1"
        );
        assert_eq!(ClientMsg::decode("INPUT 1 2 0"), Err(ProtocolError::Malformed("INPUT")));
        assert_eq!(
            ClientMsg::decode("INPUT -1 0 0"),
            Ok(ClientMsg::Input {
                seq: -1,
                direction: Direction::NONE,
            })
        );
        assert_eq!(ClientMsg::decode("INPUT x 0 0"), Err(ProtocolError::Malformed("INPUT")));
        assert_eq!(ClientMsg::decode("INPUT 1 0"), Err(ProtocolError::Malformed("INPUT")));
    }

    #[test]
    fn raw_lines() {
        assert_eq!(line_text(b"WELCOME 1\r\n"), Ok("WELCOME 1"));
        assert_eq!(line_text(b"INPUT 1 0 1"), Ok("INPUT 1 0 1"));
        assert_eq!(line_text(b"\n"), Ok(""));
        assert_eq!(line_text(b"JOIN caf\xe9\n"), Err(ProtocolError::Malformed("UTF-8")));
    }

    #[test]
    fn join_and_unknown() {
        assert_eq!(
            ClientMsg::decode("JOIN alice"),
            Ok(ClientMsg::Join {
                name: "alice".to_string()
            })
        );
        assert_eq!(
            ClientMsg::decode("JOIN"),
            Ok(ClientMsg::Join {
                name: String::new()
            })
        );
        assert_eq!(
            ClientMsg::decode("PING 5"),
            Err(ProtocolError::Unknown("PING".to_string()))
        );
        assert_eq!(ClientMsg::decode("   "), Err(ProtocolError::Empty));
    }
}
