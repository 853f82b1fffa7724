//! Parsing for the single-line commands of the interactive loop.

use std::net::IpAddr;

use lanscope_common::error::InputError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// `<ip> [b]`
    Lookup { ip: IpAddr, bypass: bool },
    /// `c [ip]`
    Clear(Option<IpAddr>),
    /// `f <text>`
    Find(String),
    /// `h`
    Help,
    /// `l [ip]`
    List(Option<IpAddr>),
    /// `q`
    Quit,
    Empty,
}

impl ShellCommand {
    pub fn parse(line: &str) -> Result<Self, InputError> {
        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else {
            return Ok(ShellCommand::Empty);
        };

        let command = match first.to_ascii_lowercase().as_str() {
            "q" => ShellCommand::Quit,
            "h" => ShellCommand::Help,
            "c" => ShellCommand::Clear(optional_ip(tokens.next())?),
            "l" => ShellCommand::List(optional_ip(tokens.next())?),
            "f" => {
                let search = tokens.collect::<Vec<_>>().join(" ");
                if search.is_empty() {
                    return Err(InputError::MissingSearch);
                }
                ShellCommand::Find(search)
            }
            _ => ShellCommand::Lookup {
                ip: parse_ip(first)?,
                bypass: tokens.next().is_some_and(|t| t.eq_ignore_ascii_case("b")),
            },
        };

        Ok(command)
    }
}

fn parse_ip(token: &str) -> Result<IpAddr, InputError> {
    token
        .parse()
        .map_err(|_| InputError::InvalidAddress(token.to_string()))
}

fn optional_ip(token: Option<&str>) -> Result<Option<IpAddr>, InputError> {
    token.map(parse_ip).transpose()
}
