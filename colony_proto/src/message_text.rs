use std::num::ParseIntError;

use thiserror::Error;

use crate::{ParameterKey, ServerMessage};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageParseError {
    #[error("empty message")]
    Empty,
    #[error("unknown message: {0}")]
    UnknownMessage(String),
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("unexpected trailing argument '{0}'")]
    TrailingArgument(String),
    #[error("invalid integer '{value}' for {context}: {source}")]
    InvalidInteger {
        value: String,
        context: &'static str,
        source: ParseIntError,
    },
}

pub fn parse_message_line(input: &str) -> Result<ServerMessage, MessageParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(MessageParseError::Empty);
    }

    let mut parts = trimmed.split_whitespace();
    let verb = parts.next().ok_or(MessageParseError::Empty)?;

    let message = match verb {
        "ready" => ServerMessage::Ready,
        "go" => ServerMessage::Go,
        "end" => ServerMessage::End,
        "turn" => {
            let number_str = parts
                .next()
                .ok_or(MessageParseError::MissingArgument("turn number"))?;
            ServerMessage::Turn {
                number: parse_u64(number_str, "turn number")?,
            }
        }
        "w" => {
            let (row, col) = parse_cell(&mut parts)?;
            ServerMessage::Water { row, col }
        }
        "f" => {
            let (row, col) = parse_cell(&mut parts)?;
            ServerMessage::Food { row, col }
        }
        "h" => {
            let (row, col) = parse_cell(&mut parts)?;
            let owner = parse_owner(&mut parts)?;
            ServerMessage::Hill { row, col, owner }
        }
        "a" => {
            let (row, col) = parse_cell(&mut parts)?;
            let owner = parse_owner(&mut parts)?;
            ServerMessage::Ant { row, col, owner }
        }
        "d" => {
            let (row, col) = parse_cell(&mut parts)?;
            let owner = parse_owner(&mut parts)?;
            ServerMessage::Dead { row, col, owner }
        }
        other => match ParameterKey::from_token(other) {
            Some(key) => {
                let value_str = parts
                    .next()
                    .ok_or(MessageParseError::MissingArgument("parameter value"))?;
                ServerMessage::Parameter {
                    key,
                    value: parse_u64(value_str, key.as_token())?,
                }
            }
            None => return Err(MessageParseError::UnknownMessage(other.to_string())),
        },
    };

    if let Some(extra) = parts.next() {
        return Err(MessageParseError::TrailingArgument(extra.to_string()));
    }
    Ok(message)
}

fn parse_cell<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
) -> Result<(i32, i32), MessageParseError> {
    let row_str = parts
        .next()
        .ok_or(MessageParseError::MissingArgument("row"))?;
    let col_str = parts
        .next()
        .ok_or(MessageParseError::MissingArgument("col"))?;
    Ok((parse_i32(row_str, "row")?, parse_i32(col_str, "col")?))
}

fn parse_owner<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Result<u32, MessageParseError> {
    let owner_str = parts
        .next()
        .ok_or(MessageParseError::MissingArgument("owner"))?;
    parse_u32(owner_str, "owner")
}

fn parse_i32(value: &str, context: &'static str) -> Result<i32, MessageParseError> {
    value
        .parse::<i32>()
        .map_err(|source| MessageParseError::InvalidInteger {
            value: value.to_string(),
            context,
            source,
        })
}

fn parse_u32(value: &str, context: &'static str) -> Result<u32, MessageParseError> {
    value
        .parse::<u32>()
        .map_err(|source| MessageParseError::InvalidInteger {
            value: value.to_string(),
            context,
            source,
        })
}

fn parse_u64(value: &str, context: &'static str) -> Result<u64, MessageParseError> {
    value
        .parse::<u64>()
        .map_err(|source| MessageParseError::InvalidInteger {
            value: value.to_string(),
            context,
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_control_messages() {
        assert_eq!(parse_message_line("ready"), Ok(ServerMessage::Ready));
        assert_eq!(parse_message_line("go\n"), Ok(ServerMessage::Go));
        assert_eq!(parse_message_line("end"), Ok(ServerMessage::End));
        assert_eq!(
            parse_message_line("turn 12"),
            Ok(ServerMessage::Turn { number: 12 })
        );
    }

    #[test]
    fn parses_parameters() {
        assert_eq!(
            parse_message_line("viewradius2 77"),
            Ok(ServerMessage::Parameter {
                key: ParameterKey::ViewRadius2,
                value: 77
            })
        );
        assert_eq!(
            parse_message_line("player_seed 7"),
            Ok(ServerMessage::Parameter {
                key: ParameterKey::PlayerSeed,
                value: 7
            })
        );
    }

    #[test]
    fn parses_sensor_facts() {
        assert_eq!(
            parse_message_line("w 3 4"),
            Ok(ServerMessage::Water { row: 3, col: 4 })
        );
        assert_eq!(
            parse_message_line("f 0 9"),
            Ok(ServerMessage::Food { row: 0, col: 9 })
        );
        assert_eq!(
            parse_message_line("h 5 5 1"),
            Ok(ServerMessage::Hill {
                row: 5,
                col: 5,
                owner: 1
            })
        );
        assert_eq!(
            parse_message_line("a 1 2 0"),
            Ok(ServerMessage::Ant {
                row: 1,
                col: 2,
                owner: 0
            })
        );
        assert_eq!(
            parse_message_line("d 7 8 0"),
            Ok(ServerMessage::Dead {
                row: 7,
                col: 8,
                owner: 0
            })
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(parse_message_line("   "), Err(MessageParseError::Empty));
        assert_eq!(
            parse_message_line("score 1 2"),
            Err(MessageParseError::UnknownMessage("score".to_string()))
        );
        assert_eq!(
            parse_message_line("a 1 2"),
            Err(MessageParseError::MissingArgument("owner"))
        );
        assert_eq!(
            parse_message_line("w 1 2 3"),
            Err(MessageParseError::TrailingArgument("3".to_string()))
        );
        assert!(matches!(
            parse_message_line("rows -4"),
            Err(MessageParseError::InvalidInteger { context: "rows", .. })
        ));
    }
}
