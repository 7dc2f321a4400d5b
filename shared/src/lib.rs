//! Wire protocol shared between the Pong server and its clients.
//!
//! The protocol is newline-delimited UTF-8 text. Each line is one message of
//! the form `COMMAND|payload` (or a bare `COMMAND` when there is no payload),
//! with integer payload fields joined by commas. TCP is a byte stream, so a
//! single read may carry zero, one, or several complete lines; [`LineBuffer`]
//! does the re-framing.

use std::fmt;

/// Playing field width in cells.
pub const BOARD_WIDTH: i32 = 80;
/// Playing field height in cells.
pub const BOARD_HEIGHT: i32 = 24;
/// Paddle height in cells.
pub const PADDLE_HEIGHT: i32 = 5;
/// First player to reach this score wins the match.
pub const WINNING_SCORE: u32 = 5;
/// Default TCP port the server listens on.
pub const DEFAULT_PORT: u16 = 5000;

/// Longest line the framing buffer will accumulate before discarding
/// garbage input that never terminates with a newline.
const MAX_LINE_BYTES: usize = 4096;

/// The full command set of the wire protocol. Command text is case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Id,
    Wait,
    Room,
    Ready,
    ReadyStatus,
    Start,
    Update,
    Move,
    Quit,
    Over,
    OpponentDisconnected,
    OpponentReconnected,
    Reconnected,
    Resume,
}

impl Command {
    /// Every command in the protocol, for exhaustive round-trip testing.
    pub const ALL: [Command; 14] = [
        Command::Id,
        Command::Wait,
        Command::Room,
        Command::Ready,
        Command::ReadyStatus,
        Command::Start,
        Command::Update,
        Command::Move,
        Command::Quit,
        Command::Over,
        Command::OpponentDisconnected,
        Command::OpponentReconnected,
        Command::Reconnected,
        Command::Resume,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Command::Id => "ID",
            Command::Wait => "WAIT",
            Command::Room => "ROOM",
            Command::Ready => "READY",
            Command::ReadyStatus => "READY_STATUS",
            Command::Start => "START",
            Command::Update => "UPDATE",
            Command::Move => "MOVE",
            Command::Quit => "QUIT",
            Command::Over => "OVER",
            Command::OpponentDisconnected => "OPPONENT_DISCONNECTED",
            Command::OpponentReconnected => "OPPONENT_RECONNECTED",
            Command::Reconnected => "RECONNECTED",
            Command::Resume => "RESUME",
        }
    }

    pub fn parse(text: &str) -> Option<Command> {
        Command::ALL.iter().copied().find(|c| c.as_str() == text)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub command: Command,
    pub payload: Option<String>,
}

/// Decodes a single line into a message.
///
/// The line is split on the first `|`: text before it is the command, text
/// after it the payload. Blank or whitespace-only input is invalid, as is an
/// unknown command. An empty payload decodes as `None`, matching what
/// [`encode`] produces for a payload-less message.
pub fn decode(line: &str) -> Option<Message> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (command_text, payload) = match trimmed.split_once('|') {
        Some((command, payload)) if !payload.is_empty() => (command, Some(payload.to_string())),
        Some((command, _)) => (command, None),
        None => (trimmed, None),
    };

    let command = Command::parse(command_text)?;
    Some(Message { command, payload })
}

/// Encodes a command and optional payload as one protocol line (without the
/// trailing newline). The `|` separator is omitted entirely when the payload
/// is absent or empty, so `decode(encode(c, None))` yields a `None` payload.
pub fn encode(command: Command, payload: Option<&str>) -> String {
    match payload {
        Some(payload) if !payload.is_empty() => format!("{}|{}", command.as_str(), payload),
        _ => command.as_str().to_string(),
    }
}

/// Parses the first `N` comma-separated integers out of a payload.
///
/// Fields are trimmed before parsing and fields beyond the first `N` are
/// ignored. Returns `None` when fewer than `N` fields are present or any of
/// the first `N` fails to parse.
pub fn parse_csv_ints<const N: usize>(payload: &str) -> Option<[i32; N]> {
    let mut fields = payload.split(',');
    let mut values = [0i32; N];
    for value in &mut values {
        *value = fields.next()?.trim().parse().ok()?;
    }
    Some(values)
}

/// Joins integers into a comma-separated payload, the inverse of
/// [`parse_csv_ints`].
pub fn csv(values: &[i32]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Re-frames a TCP byte stream into complete protocol lines.
///
/// Push each received chunk; complete `\n`-terminated lines come back in
/// arrival order while a trailing partial line is held until the rest of it
/// arrives. Empty fragments (consecutive newlines, lone `\r`) are dropped.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        LineBuffer { buf: Vec::new() }
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&raw);
            let line = text.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }

        // A peer streaming bytes with no newline at all gets its partial
        // line dropped once it exceeds any plausible message length.
        if self.buf.len() > MAX_LINE_BYTES {
            self.buf.clear();
        }

        lines
    }
}

/// One of the two fixed player identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerId {
    One,
    Two,
}

impl PlayerId {
    pub const BOTH: [PlayerId; 2] = [PlayerId::One, PlayerId::Two];

    /// Zero-based slot index.
    pub fn index(self) -> usize {
        match self {
            PlayerId::One => 0,
            PlayerId::Two => 1,
        }
    }

    /// Wire identity, 1 or 2.
    pub fn number(self) -> i32 {
        match self {
            PlayerId::One => 1,
            PlayerId::Two => 2,
        }
    }

    pub fn opponent(self) -> PlayerId {
        match self {
            PlayerId::One => PlayerId::Two,
            PlayerId::Two => PlayerId::One,
        }
    }

    pub fn from_number(number: i32) -> Option<PlayerId> {
        match number {
            1 => Some(PlayerId::One),
            2 => Some(PlayerId::Two),
            _ => None,
        }
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Paddle movement direction as carried in a `MOVE` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Parses a `MOVE` payload. Case-sensitive; anything but `UP`/`DOWN`
    /// is rejected.
    pub fn parse(text: &str) -> Option<Direction> {
        match text {
            "UP" => Some(Direction::Up),
            "DOWN" => Some(Direction::Down),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_all_commands_without_payload() {
        for command in Command::ALL {
            let line = encode(command, None);
            let message = decode(&line).unwrap();
            assert_eq!(message.command, command);
            assert_eq!(message.payload, None);
        }
    }

    #[test]
    fn test_roundtrip_all_commands_with_payload() {
        for command in Command::ALL {
            let line = encode(command, Some("1,2"));
            let message = decode(&line).unwrap();
            assert_eq!(message.command, command);
            assert_eq!(message.payload.as_deref(), Some("1,2"));
        }
    }

    #[test]
    fn test_encode_omits_separator_for_empty_payload() {
        assert_eq!(encode(Command::Ready, None), "READY");
        assert_eq!(encode(Command::Ready, Some("")), "READY");
        assert_eq!(encode(Command::Id, Some("1")), "ID|1");
    }

    #[test]
    fn test_decode_empty_payload_collapses_to_none() {
        let message = decode("QUIT|").unwrap();
        assert_eq!(message.command, Command::Quit);
        assert_eq!(message.payload, None);
    }

    #[test]
    fn test_decode_rejects_blank_input() {
        assert_eq!(decode(""), None);
        assert_eq!(decode("   "), None);
        assert_eq!(decode("\r\n"), None);
    }

    #[test]
    fn test_decode_rejects_unknown_command() {
        assert_eq!(decode("JUMP"), None);
        assert_eq!(decode("move|UP"), None); // case-sensitive
        assert_eq!(decode("|payload"), None);
    }

    #[test]
    fn test_decode_splits_on_first_separator_only() {
        let message = decode("MOVE|UP|extra").unwrap();
        assert_eq!(message.command, Command::Move);
        assert_eq!(message.payload.as_deref(), Some("UP|extra"));
    }

    #[test]
    fn test_parse_csv_ints_exact() {
        assert_eq!(parse_csv_ints::<2>("80,24"), Some([80, 24]));
        assert_eq!(
            parse_csv_ints::<6>("40,12,9,9,0,0"),
            Some([40, 12, 9, 9, 0, 0])
        );
    }

    #[test]
    fn test_parse_csv_ints_trims_fields() {
        assert_eq!(parse_csv_ints::<2>(" 80 , 24 "), Some([80, 24]));
    }

    #[test]
    fn test_parse_csv_ints_ignores_extra_fields() {
        assert_eq!(parse_csv_ints::<2>("80,24,99,100"), Some([80, 24]));
    }

    #[test]
    fn test_parse_csv_ints_rejects_missing_or_bad_fields() {
        assert_eq!(parse_csv_ints::<2>("80"), None);
        assert_eq!(parse_csv_ints::<2>("80,abc"), None);
        assert_eq!(parse_csv_ints::<2>(""), None);
        assert_eq!(parse_csv_ints::<6>("1,2,3,4,5"), None);
    }

    #[test]
    fn test_csv_roundtrip() {
        let values = [40, 12, 9, 9, 3, 4];
        assert_eq!(parse_csv_ints::<6>(&csv(&values)), Some(values));
    }

    #[test]
    fn test_line_buffer_multiple_messages_in_one_chunk() {
        let mut buffer = LineBuffer::new();
        let lines = buffer.push(b"ID|1\nWAIT\nROOM|80,24\n");
        assert_eq!(lines, vec!["ID|1", "WAIT", "ROOM|80,24"]);
    }

    #[test]
    fn test_line_buffer_message_split_across_chunks() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(b"UPDATE|40,").is_empty());
        assert!(buffer.push(b"12,9,9,").is_empty());
        let lines = buffer.push(b"0,0\nMOVE");
        assert_eq!(lines, vec!["UPDATE|40,12,9,9,0,0"]);
        let lines = buffer.push(b"|UP\n");
        assert_eq!(lines, vec!["MOVE|UP"]);
    }

    #[test]
    fn test_line_buffer_discards_empty_fragments() {
        let mut buffer = LineBuffer::new();
        let lines = buffer.push(b"\n\nREADY\r\n\n  \nQUIT\n");
        assert_eq!(lines, vec!["READY", "QUIT"]);
    }

    #[test]
    fn test_line_buffer_preserves_arrival_order() {
        let mut buffer = LineBuffer::new();
        let mut lines = buffer.push(b"MOVE|UP\nMOVE|DOWN\n");
        lines.extend(buffer.push(b"MOVE|UP\n"));
        assert_eq!(lines, vec!["MOVE|UP", "MOVE|DOWN", "MOVE|UP"]);
    }

    #[test]
    fn test_line_buffer_drops_oversized_partial_line() {
        let mut buffer = LineBuffer::new();
        let garbage = vec![b'x'; MAX_LINE_BYTES + 1];
        assert!(buffer.push(&garbage).is_empty());
        // The garbage was discarded, so a fresh message still decodes.
        let lines = buffer.push(b"READY\n");
        assert_eq!(lines, vec!["READY"]);
    }

    #[test]
    fn test_player_id_identity() {
        assert_eq!(PlayerId::One.number(), 1);
        assert_eq!(PlayerId::Two.number(), 2);
        assert_eq!(PlayerId::One.opponent(), PlayerId::Two);
        assert_eq!(PlayerId::Two.opponent(), PlayerId::One);
        assert_eq!(PlayerId::from_number(1), Some(PlayerId::One));
        assert_eq!(PlayerId::from_number(2), Some(PlayerId::Two));
        assert_eq!(PlayerId::from_number(3), None);
        assert_eq!(PlayerId::One.to_string(), "1");
    }

    #[test]
    fn test_direction_parse_is_case_sensitive() {
        assert_eq!(Direction::parse("UP"), Some(Direction::Up));
        assert_eq!(Direction::parse("DOWN"), Some(Direction::Down));
        assert_eq!(Direction::parse("up"), None);
        assert_eq!(Direction::parse("LEFT"), None);
        assert_eq!(Direction::parse(""), None);
    }
}
