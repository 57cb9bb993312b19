use blackjack::{
    constants::{MAX_NAME_LEN, MAX_ROUNDS},
    entities::Decision,
};
use std::fmt;

/// Errors that can occur while parsing console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Neither hit nor stand.
    InvalidDecision(String),
    EmptyTeamName,
    /// Team name longer than the wire field, in bytes.
    TeamNameTooLong(usize),
    /// Round count that is not a number at all.
    InvalidRounds(String),
    /// Round count outside 1-255.
    RoundsOutOfRange(u64),
    /// Neither yes nor no.
    InvalidAnswer(String),
    /// Server number that is not in the listed range.
    InvalidChoice { input: String, max: usize },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDecision(value) => write!(
                f,
                "Unrecognized decision '{}'. Enter 'h' for Hit or 's' for Stand",
                value
            ),
            Self::EmptyTeamName => write!(f, "Team name must not be empty"),
            Self::TeamNameTooLong(len) => write!(
                f,
                "Team name is {} bytes long. It must be 1-{} bytes",
                len, MAX_NAME_LEN
            ),
            Self::InvalidRounds(value) => {
                write!(f, "'{}' is not a number. Enter a number of rounds", value)
            }
            Self::RoundsOutOfRange(value) => write!(
                f,
                "Cannot play {} rounds. Number must be between 1 and {}",
                value, MAX_ROUNDS
            ),
            Self::InvalidAnswer(value) => write!(
                f,
                "Unrecognized answer '{}'. Enter 'y' for yes or 'n' for no",
                value
            ),
            Self::InvalidChoice { input, max } => {
                write!(f, "Invalid choice '{}'. Please enter 0-{}", input, max)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// What the user picked from the server list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerChoice {
    Refresh,
    /// Zero-based index into the listed servers.
    Pick(usize),
}

/// Parse a hit-or-stand answer.
///
/// # Examples
///
/// ```
/// use bj_client::commands::parse_decision;
/// use blackjack::entities::Decision;
///
/// assert_eq!(parse_decision("h"), Ok(Decision::Hit));
/// assert_eq!(parse_decision(" Stand "), Ok(Decision::Stand));
/// assert!(parse_decision("double").is_err());
/// ```
pub fn parse_decision(input: &str) -> Result<Decision, ParseError> {
    let trimmed = input.trim();
    match trimmed.to_lowercase().as_str() {
        "h" | "hit" => Ok(Decision::Hit),
        "s" | "stand" => Ok(Decision::Stand),
        _ => Err(ParseError::InvalidDecision(trimmed.to_string())),
    }
}

/// Parse a team name. Surrounding whitespace is dropped and the rest must
/// fit the wire field untruncated.
pub fn parse_team_name(input: &str) -> Result<String, ParseError> {
    let trimmed = input.trim();
    match trimmed.len() {
        0 => Err(ParseError::EmptyTeamName),
        len if len > MAX_NAME_LEN => Err(ParseError::TeamNameTooLong(len)),
        _ => Ok(trimmed.to_string()),
    }
}

pub fn parse_rounds(input: &str) -> Result<u8, ParseError> {
    let trimmed = input.trim();
    let rounds = trimmed
        .parse::<u64>()
        .map_err(|_| ParseError::InvalidRounds(trimmed.to_string()))?;
    match u8::try_from(rounds) {
        Ok(rounds) if rounds > 0 => Ok(rounds),
        _ => Err(ParseError::RoundsOutOfRange(rounds)),
    }
}

pub fn parse_yes_no(input: &str) -> Result<bool, ParseError> {
    let trimmed = input.trim();
    match trimmed.to_lowercase().as_str() {
        "y" | "yes" => Ok(true),
        "n" | "no" => Ok(false),
        _ => Err(ParseError::InvalidAnswer(trimmed.to_string())),
    }
}

/// Parse a server number from a list of `count` servers. `0` refreshes the
/// list; `1..=count` picks a server.
pub fn parse_server_choice(input: &str, count: usize) -> Result<ServerChoice, ParseError> {
    let trimmed = input.trim();
    let invalid = || ParseError::InvalidChoice {
        input: trimmed.to_string(),
        max: count,
    };
    match trimmed.parse::<usize>().map_err(|_| invalid())? {
        0 => Ok(ServerChoice::Refresh),
        n if n <= count => Ok(ServerChoice::Pick(n - 1)),
        _ => Err(invalid()),
    }
}
