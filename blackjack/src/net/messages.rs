//! Wire frames exchanged between blackjack clients and servers.
//!
//! Every frame is fixed width and starts with the magic cookie and a type
//! byte; all integers are big-endian.
//!
//! | Frame   | Bytes | Body after magic + type                               |
//! |---------|-------|-------------------------------------------------------|
//! | Offer   | 39    | tcp port (2), server name (32)                        |
//! | Request | 38    | rounds (1), team name (32)                            |
//! | Payload | 14    | decision (5), result (1), card rank (2), card suit (1)|

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::game::{
    constants::MAX_NAME_LEN,
    entities::{Card, Decision, Outcome, Suit},
    state_machine::Update,
};

/// Prefix of every frame.
pub const MAGIC_COOKIE: u32 = 0xabcd_dcba;

pub const OFFER_LEN: usize = 39;
pub const REQUEST_LEN: usize = 38;
pub const PAYLOAD_LEN: usize = 14;

const HEADER_LEN: usize = 5;
const DECISION_LEN: usize = 5;

/// Legacy decision tokens. Both are five bytes so the payload stays fixed
/// width.
pub const HIT_TOKEN: [u8; DECISION_LEN] = *b"Hittt";
pub const STAND_TOKEN: [u8; DECISION_LEN] = *b"Stand";

/// Result byte of a payload that carries a card.
const ROUND_NOT_OVER: u8 = 0;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[repr(u8)]
pub enum MessageType {
    Offer = 0x2,
    Request = 0x3,
    Payload = 0x4,
}

impl MessageType {
    #[must_use]
    pub fn frame_len(self) -> usize {
        match self {
            Self::Offer => OFFER_LEN,
            Self::Request => REQUEST_LEN,
            Self::Payload => PAYLOAD_LEN,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Offer => "offer",
            Self::Request => "request",
            Self::Payload => "payload",
        };
        write!(f, "{repr}")
    }
}

/// Reasons a frame can't be decoded or a message can't be built.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum CodecError {
    #[error("{kind} frame needs {len} bytes, got {actual}", len = .kind.frame_len())]
    Truncated { kind: MessageType, actual: usize },
    #[error("bad magic cookie {0:#010x}")]
    BadMagic(u32),
    #[error("expected {expected} frame, got type {actual:#04x}")]
    WrongType { expected: MessageType, actual: u8 },
    #[error("unknown decision token {0:?}")]
    InvalidDecision([u8; DECISION_LEN]),
    #[error("unknown result code {0}")]
    InvalidResult(u8),
    #[error("invalid card (rank {rank}, suit {suit})")]
    InvalidCard { rank: u16, suit: u8 },
    #[error("round count must be between 1 and 255")]
    ZeroRounds,
    #[error("team name is empty")]
    EmptyTeamName,
}

/// Longest prefix of `name` that fits the name field without splitting a
/// character.
#[must_use]
pub fn truncate_name(name: &str) -> &str {
    if name.len() <= MAX_NAME_LEN {
        return name;
    }
    let mut end = MAX_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

fn encode_name(name: &str) -> [u8; MAX_NAME_LEN] {
    let name = truncate_name(name).as_bytes();
    let mut field = [0; MAX_NAME_LEN];
    field[..name.len()].copy_from_slice(name);
    field
}

fn decode_name(field: &[u8]) -> String {
    let end = field.iter().rposition(|&b| b != 0).map_or(0, |idx| idx + 1);
    field[..end]
        .utf8_chunks()
        .map(|chunk| chunk.valid())
        .collect()
}

fn header(kind: MessageType) -> [u8; HEADER_LEN] {
    let mut header = [0; HEADER_LEN];
    header[..4].copy_from_slice(&MAGIC_COOKIE.to_be_bytes());
    header[4] = kind as u8;
    header
}

/// Check length, magic, and type, returning the frame body.
fn check_header(buf: &[u8], kind: MessageType) -> Result<&[u8], CodecError> {
    if buf.len() < kind.frame_len() {
        return Err(CodecError::Truncated {
            kind,
            actual: buf.len(),
        });
    }
    let magic = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if magic != MAGIC_COOKIE {
        return Err(CodecError::BadMagic(magic));
    }
    if buf[4] != kind as u8 {
        return Err(CodecError::WrongType {
            expected: kind,
            actual: buf[4],
        });
    }
    Ok(&buf[HEADER_LEN..kind.frame_len()])
}

/// UDP advertisement of a server's TCP port and name.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Offer {
    pub tcp_port: u16,
    pub server_name: String,
}

impl Offer {
    #[must_use]
    pub fn new(tcp_port: u16, server_name: &str) -> Self {
        Self {
            tcp_port,
            server_name: truncate_name(server_name).to_string(),
        }
    }

    #[must_use]
    pub fn encode(&self) -> [u8; OFFER_LEN] {
        let mut buf = [0; OFFER_LEN];
        buf[..HEADER_LEN].copy_from_slice(&header(MessageType::Offer));
        buf[5..7].copy_from_slice(&self.tcp_port.to_be_bytes());
        buf[7..].copy_from_slice(&encode_name(&self.server_name));
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let body = check_header(buf, MessageType::Offer)?;
        Ok(Self {
            tcp_port: u16::from_be_bytes([body[0], body[1]]),
            server_name: decode_name(&body[2..]),
        })
    }
}

impl fmt::Display for Offer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "offer from {:?} on port {}", self.server_name, self.tcp_port)
    }
}

/// The first frame of a session: who is playing and for how many rounds.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Request {
    rounds: u8,
    team_name: String,
}

impl Request {
    /// Build a request, truncating the team name to the wire width.
    pub fn new(rounds: u8, team_name: &str) -> Result<Self, CodecError> {
        if rounds == 0 {
            return Err(CodecError::ZeroRounds);
        }
        let team_name = truncate_name(team_name);
        if team_name.is_empty() {
            return Err(CodecError::EmptyTeamName);
        }
        Ok(Self {
            rounds,
            team_name: team_name.to_string(),
        })
    }

    #[must_use]
    pub fn rounds(&self) -> u8 {
        self.rounds
    }

    #[must_use]
    pub fn team_name(&self) -> &str {
        &self.team_name
    }

    #[must_use]
    pub fn encode(&self) -> [u8; REQUEST_LEN] {
        let mut buf = [0; REQUEST_LEN];
        buf[..HEADER_LEN].copy_from_slice(&header(MessageType::Request));
        buf[5] = self.rounds;
        buf[6..].copy_from_slice(&encode_name(&self.team_name));
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let body = check_header(buf, MessageType::Request)?;
        Self::new(body[0], &decode_name(&body[1..]))
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} wants {} rounds", self.team_name, self.rounds)
    }
}

/// The fixed-shape gameplay frame. Which fields matter depends on the
/// direction, so decoding always states what it expects.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Payload {
    /// Client to server.
    Decision(Decision),
    /// Server to client.
    Update(Update),
}

impl Payload {
    #[must_use]
    pub fn encode(&self) -> [u8; PAYLOAD_LEN] {
        let mut buf = [0; PAYLOAD_LEN];
        buf[..HEADER_LEN].copy_from_slice(&header(MessageType::Payload));
        match self {
            Self::Decision(decision) => {
                let token = match decision {
                    Decision::Hit => HIT_TOKEN,
                    Decision::Stand => STAND_TOKEN,
                };
                buf[5..10].copy_from_slice(&token);
            }
            Self::Update(Update::Card(card)) => {
                buf[10] = ROUND_NOT_OVER;
                buf[11..13].copy_from_slice(&u16::from(card.rank()).to_be_bytes());
                buf[13] = card.suit().index();
            }
            Self::Update(Update::Result(outcome)) => {
                buf[10] = outcome.code();
            }
        }
        buf
    }

    /// Decode a client's decision. Result and card bytes are filler and
    /// ignored.
    pub fn decode_decision(buf: &[u8]) -> Result<Decision, CodecError> {
        let body = check_header(buf, MessageType::Payload)?;
        let mut token = [0; DECISION_LEN];
        token.copy_from_slice(&body[..DECISION_LEN]);
        match token {
            HIT_TOKEN => Ok(Decision::Hit),
            STAND_TOKEN => Ok(Decision::Stand),
            other => Err(CodecError::InvalidDecision(other)),
        }
    }

    /// Decode a server update: a card while the result byte is zero,
    /// otherwise the round result.
    pub fn decode_update(buf: &[u8]) -> Result<Update, CodecError> {
        let body = check_header(buf, MessageType::Payload)?;
        match body[5] {
            ROUND_NOT_OVER => {
                let rank = u16::from_be_bytes([body[6], body[7]]);
                let suit = body[8];
                u8::try_from(rank)
                    .ok()
                    .zip(Suit::from_index(suit))
                    .and_then(|(rank, suit)| Card::new(rank, suit))
                    .map(Update::Card)
                    .ok_or(CodecError::InvalidCard { rank, suit })
            }
            code => Outcome::from_code(code)
                .map(Update::Result)
                .ok_or(CodecError::InvalidResult(code)),
        }
    }
}

impl From<Decision> for Payload {
    fn from(value: Decision) -> Self {
        Self::Decision(value)
    }
}

impl From<Update> for Payload {
    fn from(value: Update) -> Self {
        Self::Update(value)
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Decision(decision) => write!(f, "player {decision}"),
            Self::Update(Update::Card(card)) => write!(f, "card {card}"),
            Self::Update(Update::Result(outcome)) => write!(f, "result {outcome}"),
        }
    }
}

/// Any frame of the protocol.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Message {
    Offer(Offer),
    Request(Request),
    Payload(Payload),
}

impl Message {
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Offer(_) => MessageType::Offer,
            Self::Request(_) => MessageType::Request,
            Self::Payload(_) => MessageType::Payload,
        }
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Offer(offer) => offer.encode().to_vec(),
            Self::Request(request) => request.encode().to_vec(),
            Self::Payload(payload) => payload.encode().to_vec(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Offer(offer) => write!(f, "{offer}"),
            Self::Request(request) => write!(f, "{request}"),
            Self::Payload(payload) => write!(f, "{payload}"),
        }
    }
}

impl From<Offer> for Message {
    fn from(value: Offer) -> Self {
        Self::Offer(value)
    }
}

impl From<Request> for Message {
    fn from(value: Request) -> Self {
        Self::Request(value)
    }
}

impl From<Payload> for Message {
    fn from(value: Payload) -> Self {
        Self::Payload(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(rank: u8, suit: Suit) -> Card {
        Card::new(rank, suit).unwrap()
    }

    // === Offer Tests ===

    #[test]
    fn test_offer_layout() {
        let buf = Offer::new(0x1234, "Blackijecky").encode();
        assert_eq!(buf.len(), OFFER_LEN);
        assert_eq!(&buf[..5], &[0xab, 0xcd, 0xdc, 0xba, 0x02]);
        assert_eq!(&buf[5..7], &[0x12, 0x34]);
        assert_eq!(&buf[7..18], b"Blackijecky");
        assert!(buf[18..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_offer_round_trip() {
        let offer = Offer::new(40_000, "Dealer Dan");
        assert_eq!(Offer::decode(&offer.encode()), Ok(offer));
    }

    #[test]
    fn test_offer_long_name_is_truncated() {
        let name = "n".repeat(40);
        let decoded = Offer::decode(&Offer::new(1, &name).encode()).unwrap();
        assert_eq!(decoded.server_name, "n".repeat(32));
    }

    #[test]
    fn test_offer_decode_ignores_trailing_bytes() {
        let mut buf = Offer::new(7, "x").encode().to_vec();
        buf.extend_from_slice(b"junk");
        assert_eq!(Offer::decode(&buf), Ok(Offer::new(7, "x")));
    }

    #[test]
    fn test_offer_decode_drops_invalid_utf8() {
        let mut buf = Offer::new(7, "").encode();
        buf[7..12].copy_from_slice(&[b'a', 0xff, b'b', 0xfe, b'c']);
        assert_eq!(Offer::decode(&buf).unwrap().server_name, "abc");
    }

    // === Request Tests ===

    #[test]
    fn test_request_layout() {
        let buf = Request::new(1, "x").unwrap().encode();
        let mut expected = vec![0xab, 0xcd, 0xdc, 0xba, 0x03, 0x01, b'x'];
        expected.resize(REQUEST_LEN, 0);
        assert_eq!(buf.to_vec(), expected);
    }

    #[test]
    fn test_request_round_trip() {
        let request = Request::new(255, "Team Rocket").unwrap();
        let decoded = Request::decode(&request.encode()).unwrap();
        assert_eq!(decoded.rounds(), 255);
        assert_eq!(decoded.team_name(), "Team Rocket");
    }

    #[test]
    fn test_request_validation() {
        assert_eq!(Request::new(0, "x"), Err(CodecError::ZeroRounds));
        assert_eq!(Request::new(3, ""), Err(CodecError::EmptyTeamName));
    }

    #[test]
    fn test_request_decode_rejects_zero_rounds() {
        let mut buf = Request::new(1, "x").unwrap().encode();
        buf[5] = 0;
        assert_eq!(Request::decode(&buf), Err(CodecError::ZeroRounds));
    }

    #[test]
    fn test_request_decode_rejects_blank_name() {
        let mut buf = Request::new(1, "x").unwrap().encode();
        buf[6] = 0;
        assert_eq!(Request::decode(&buf), Err(CodecError::EmptyTeamName));
    }

    #[test]
    fn test_truncate_name_respects_char_boundary() {
        // 31 ASCII bytes followed by a 3-byte character straddling byte 32.
        let name = format!("{}€", "a".repeat(31));
        assert_eq!(truncate_name(&name), "a".repeat(31));
        assert_eq!(truncate_name("short"), "short");
    }

    // === Payload Tests ===

    #[test]
    fn test_payload_decision_layout() {
        let buf = Payload::Decision(Decision::Stand).encode();
        assert_eq!(&buf[..5], &[0xab, 0xcd, 0xdc, 0xba, 0x04]);
        assert_eq!(&buf[5..10], b"Stand");
        assert!(buf[10..].iter().all(|&b| b == 0));

        let buf = Payload::Decision(Decision::Hit).encode();
        assert_eq!(&buf[5..10], b"Hittt");
    }

    #[test]
    fn test_payload_card_layout() {
        let buf = Payload::Update(Update::Card(card(12, Suit::Spade))).encode();
        assert!(buf[5..10].iter().all(|&b| b == 0));
        assert_eq!(&buf[10..], &[0, 0, 12, 3]);
    }

    #[test]
    fn test_payload_result_layout() {
        let buf = Payload::Update(Update::Result(Outcome::Win)).encode();
        assert_eq!(&buf[10..], &[3, 0, 0, 0]);
    }

    #[test]
    fn test_payload_decode_decision() {
        for decision in [Decision::Hit, Decision::Stand] {
            let buf = Payload::from(decision).encode();
            assert_eq!(Payload::decode_decision(&buf), Ok(decision));
        }
    }

    #[test]
    fn test_payload_decode_unknown_decision() {
        let mut buf = Payload::Decision(Decision::Hit).encode();
        buf[5..10].copy_from_slice(b"hit!!");
        assert_eq!(
            Payload::decode_decision(&buf),
            Err(CodecError::InvalidDecision(*b"hit!!"))
        );
    }

    #[test]
    fn test_payload_decode_update() {
        for update in [
            Update::Card(card(1, Suit::Heart)),
            Update::Card(card(13, Suit::Club)),
            Update::Result(Outcome::Tie),
            Update::Result(Outcome::Loss),
            Update::Result(Outcome::Win),
        ] {
            assert_eq!(
                Payload::decode_update(&Payload::from(update).encode()),
                Ok(update)
            );
        }
    }

    #[test]
    fn test_payload_decode_update_invalid_fields() {
        let mut buf = Payload::Update(Update::Card(card(1, Suit::Heart))).encode();
        buf[10] = 9;
        assert_eq!(Payload::decode_update(&buf), Err(CodecError::InvalidResult(9)));

        let mut buf = Payload::Update(Update::Card(card(1, Suit::Heart))).encode();
        buf[11..13].copy_from_slice(&300u16.to_be_bytes());
        assert_eq!(
            Payload::decode_update(&buf),
            Err(CodecError::InvalidCard { rank: 300, suit: 0 })
        );

        let mut buf = Payload::Update(Update::Card(card(1, Suit::Heart))).encode();
        buf[13] = 4;
        assert_eq!(
            Payload::decode_update(&buf),
            Err(CodecError::InvalidCard { rank: 1, suit: 4 })
        );
    }

    // === Header Tests ===

    #[test]
    fn test_decode_short_frames_fail() {
        let offer = Offer::new(1, "x").encode();
        let request = Request::new(1, "x").unwrap().encode();
        let payload = Payload::Decision(Decision::Hit).encode();
        assert_eq!(
            Offer::decode(&offer[..OFFER_LEN - 1]),
            Err(CodecError::Truncated {
                kind: MessageType::Offer,
                actual: OFFER_LEN - 1
            })
        );
        assert!(Request::decode(&request[..10]).is_err());
        assert!(Payload::decode_decision(&payload[..13]).is_err());
        assert!(Payload::decode_update(&[]).is_err());
    }

    #[test]
    fn test_decode_bad_magic() {
        let mut buf = Offer::new(1, "x").encode();
        buf[0] = 0;
        assert_eq!(Offer::decode(&buf), Err(CodecError::BadMagic(0x00cd_dcba)));
    }

    #[test]
    fn test_decode_wrong_type() {
        let mut buf = Request::new(1, "x").unwrap().encode().to_vec();
        buf.push(0);
        assert_eq!(
            Offer::decode(&buf),
            Err(CodecError::WrongType {
                expected: MessageType::Offer,
                actual: 0x03
            })
        );
    }

    // === Message Tests ===

    #[test]
    fn test_message_encode_lengths() {
        let messages: [Message; 3] = [
            Offer::new(1, "x").into(),
            Request::new(1, "x").unwrap().into(),
            Payload::from(Decision::Hit).into(),
        ];
        for message in messages {
            assert_eq!(
                message.encode().len(),
                message.message_type().frame_len()
            );
        }
    }

    #[test]
    fn test_codec_error_display() {
        let error = CodecError::Truncated {
            kind: MessageType::Payload,
            actual: 3,
        };
        assert_eq!(error.to_string(), "payload frame needs 14 bytes, got 3");
    }
}
