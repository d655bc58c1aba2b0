//! RESP2 framing.
//!
//! Commands go out as arrays of bulk strings. Replies are parsed
//! incrementally: `parse_reply` returns `Ok(None)` until a whole frame is
//! buffered.

use std::fmt;
use thiserror::Error;

/// Largest bulk string accepted from a peer (matches the server default).
const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Deepest array nesting accepted in one reply.
pub const MAX_DEPTH: usize = 32;

/// Most array elements, summed over every nesting level, in one reply.
pub const MAX_ELEMENTS: usize = 1024 * 1024;

/// Malformed RESP input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("unknown reply type byte 0x{0:02x}")]
    InvalidPrefix(u8),

    #[error("invalid integer in reply header")]
    InvalidInteger,

    #[error("invalid length {0}")]
    InvalidLength(i64),

    #[error("bulk string is not terminated by CRLF")]
    MissingCrlf,

    #[error("nesting too deep: depth {0} exceeds limit")]
    TooDeep(usize),

    #[error("reply too large: {0} elements exceeds limit")]
    TooManyElements(usize),
}

/// A command: the command name followed by its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    args: Vec<Vec<u8>>,
}

impl Command {
    pub fn new(name: impl AsRef<[u8]>) -> Self {
        Self {
            args: vec![name.as_ref().to_vec()],
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl AsRef<[u8]>) -> Self {
        self.args.push(arg.as_ref().to_vec());
        self
    }

    /// Build a command from raw words, e.g. command line arguments.
    pub fn from_args<I, S>(words: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let args: Vec<Vec<u8>> = words.into_iter().map(|w| w.as_ref().to_vec()).collect();
        if args.is_empty() {
            None
        } else {
            Some(Self { args })
        }
    }

    /// Upper-cased command name, for logging.
    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.args[0]).to_ascii_uppercase()
    }

    pub fn args(&self) -> &[Vec<u8>] {
        &self.args
    }

    pub fn ping() -> Self {
        Self::new("PING")
    }

    pub fn get(key: impl AsRef<[u8]>) -> Self {
        Self::new("GET").arg(key)
    }

    pub fn set(key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        Self::new("SET").arg(key).arg(value)
    }

    /// SET with an expiry in seconds.
    pub fn set_ex(key: impl AsRef<[u8]>, value: impl AsRef<[u8]>, secs: u64) -> Self {
        Self::set(key, value).arg("EX").arg(secs.to_string())
    }

    pub fn del(key: impl AsRef<[u8]>) -> Self {
        Self::new("DEL").arg(key)
    }

    pub fn auth(username: Option<&str>, password: &str) -> Self {
        match username {
            Some(user) => Self::new("AUTH").arg(user).arg(password),
            None => Self::new("AUTH").arg(password),
        }
    }

    pub fn select(db: u32) -> Self {
        Self::new("SELECT").arg(db.to_string())
    }
}

/// A reply frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Vec<u8>),
    Array(Vec<Reply>),
    Nil,
}

impl Reply {
    /// Bytes of a simple or bulk string reply.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Reply::Simple(s) => Some(s.as_bytes()),
            Reply::Bulk(b) => Some(b),
            _ => None,
        }
    }

    /// True for the `+OK` status reply.
    pub fn is_ok(&self) -> bool {
        matches!(self, Reply::Simple(s) if s == "OK")
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Simple(s) => f.write_str(s),
            Reply::Error(e) => write!(f, "(error) {e}"),
            Reply::Integer(n) => write!(f, "(integer) {n}"),
            Reply::Bulk(b) => write!(f, "\"{}\"", String::from_utf8_lossy(b)),
            Reply::Nil => f.write_str("(nil)"),
            Reply::Array(items) if items.is_empty() => f.write_str("(empty array)"),
            Reply::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) {}", i + 1, item)?;
                }
                Ok(())
            }
        }
    }
}

/// Append the wire form of `command` to `out`.
pub fn encode_command(command: &Command, out: &mut Vec<u8>) {
    out.extend_from_slice(format!("*{}\r\n", command.args.len()).as_bytes());
    for arg in &command.args {
        encode_bulk(arg, out);
    }
}

/// Append the wire form of `reply` to `out`.
pub fn encode_reply(reply: &Reply, out: &mut Vec<u8>) {
    match reply {
        Reply::Simple(s) => {
            out.push(b'+');
            out.extend_from_slice(s.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        Reply::Error(e) => {
            out.push(b'-');
            out.extend_from_slice(e.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        Reply::Integer(n) => out.extend_from_slice(format!(":{n}\r\n").as_bytes()),
        Reply::Bulk(b) => encode_bulk(b, out),
        Reply::Nil => out.extend_from_slice(b"$-1\r\n"),
        Reply::Array(items) => {
            out.extend_from_slice(format!("*{}\r\n", items.len()).as_bytes());
            for item in items {
                encode_reply(item, out);
            }
        }
    }
}

fn encode_bulk(data: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(format!("${}\r\n", data.len()).as_bytes());
    out.extend_from_slice(data);
    out.extend_from_slice(b"\r\n");
}

/// Parse one reply from the front of `buf`.
///
/// Returns the reply and the number of bytes it occupied, or `None` if the
/// buffer does not yet hold a complete frame.
pub fn parse_reply(buf: &[u8]) -> Result<Option<(Reply, usize)>, ProtocolError> {
    let mut total = 0;
    parse_at(buf, 0, 0, &mut total)
}

fn parse_at(
    buf: &[u8],
    pos: usize,
    depth: usize,
    total: &mut usize,
) -> Result<Option<(Reply, usize)>, ProtocolError> {
    let Some((line, next)) = read_line(buf, pos) else {
        return Ok(None);
    };
    let Some((&prefix, body)) = line.split_first() else {
        return Err(ProtocolError::InvalidPrefix(b'\r'));
    };

    match prefix {
        b'+' => Ok(Some((Reply::Simple(String::from_utf8_lossy(body).into_owned()), next))),
        b'-' => Ok(Some((Reply::Error(String::from_utf8_lossy(body).into_owned()), next))),
        b':' => Ok(Some((Reply::Integer(parse_int(body)?), next))),
        b'$' => {
            let len = parse_int(body)?;
            if len == -1 {
                return Ok(Some((Reply::Nil, next)));
            }
            match bulk_end(buf, next, len)? {
                Some(end) => Ok(Some((Reply::Bulk(buf[next..end - 2].to_vec()), end))),
                None => Ok(None),
            }
        }
        b'*' => {
            let count = parse_int(body)?;
            if count == -1 {
                return Ok(Some((Reply::Nil, next)));
            }
            let count = checked_len(count)?;
            check_array(depth, count, total)?;
            let mut items = Vec::with_capacity(count.min(1024));
            let mut cursor = next;
            for _ in 0..count {
                match parse_at(buf, cursor, depth + 1, total)? {
                    Some((item, after)) => {
                        items.push(item);
                        cursor = after;
                    }
                    None => return Ok(None),
                }
            }
            Ok(Some((Reply::Array(items), cursor)))
        }
        other => Err(ProtocolError::InvalidPrefix(other)),
    }
}

/// Finds where the next reply frame ends, resuming across partial reads.
///
/// Each call starts from the last complete element, so a large reply that
/// arrives in many chunks is scanned once rather than once per chunk. The
/// same depth and size limits as [`parse_reply`] apply.
#[derive(Debug, Default)]
pub struct FrameScanner {
    pos: usize,
    open: Vec<usize>,
    total: usize,
}

impl FrameScanner {
    /// Length of the first complete frame in `buf`, if it is all there.
    ///
    /// `buf` must only grow between calls. The scanner resets itself once it
    /// reports a frame.
    pub fn scan(&mut self, buf: &[u8]) -> Result<Option<usize>, ProtocolError> {
        loop {
            let Some((line, next)) = read_line(buf, self.pos) else {
                return Ok(None);
            };
            let Some((&prefix, body)) = line.split_first() else {
                return Err(ProtocolError::InvalidPrefix(b'\r'));
            };

            let end = match prefix {
                b'+' | b'-' => next,
                b':' => {
                    parse_int(body)?;
                    next
                }
                b'$' => match parse_int(body)? {
                    -1 => next,
                    len => match bulk_end(buf, next, len)? {
                        Some(end) => end,
                        None => return Ok(None),
                    },
                },
                b'*' => match parse_int(body)? {
                    -1 => next,
                    count => {
                        let count = checked_len(count)?;
                        check_array(self.open.len(), count, &mut self.total)?;
                        if count > 0 {
                            self.open.push(count);
                            self.pos = next;
                            continue;
                        }
                        next
                    }
                },
                other => return Err(ProtocolError::InvalidPrefix(other)),
            };

            self.pos = end;
            if self.close_element() {
                *self = Self::default();
                return Ok(Some(end));
            }
        }
    }

    /// Count one finished element against the open arrays. True once the
    /// outermost frame is complete.
    fn close_element(&mut self) -> bool {
        while let Some(remaining) = self.open.last_mut() {
            *remaining -= 1;
            if *remaining > 0 {
                return false;
            }
            self.open.pop();
        }
        true
    }
}

/// Offset just past a bulk payload of `len` bytes starting at `start`, or
/// `None` if it is not fully buffered yet.
fn bulk_end(buf: &[u8], start: usize, len: i64) -> Result<Option<usize>, ProtocolError> {
    let end = start + checked_len(len)?;
    if buf.len() < end + 2 {
        return Ok(None);
    }
    if &buf[end..end + 2] != b"\r\n" {
        return Err(ProtocolError::MissingCrlf);
    }
    Ok(Some(end + 2))
}

fn check_array(depth: usize, count: usize, total: &mut usize) -> Result<(), ProtocolError> {
    if depth >= MAX_DEPTH {
        return Err(ProtocolError::TooDeep(depth + 1));
    }
    *total += count;
    if *total > MAX_ELEMENTS {
        return Err(ProtocolError::TooManyElements(*total));
    }
    Ok(())
}

/// The line starting at `pos` without its CRLF, and the offset after it.
fn read_line(buf: &[u8], pos: usize) -> Option<(&[u8], usize)> {
    let rest = buf.get(pos..)?;
    let idx = rest.windows(2).position(|w| w == b"\r\n")?;
    Some((&rest[..idx], pos + idx + 2))
}

fn parse_int(digits: &[u8]) -> Result<i64, ProtocolError> {
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(ProtocolError::InvalidInteger)
}

fn checked_len(len: i64) -> Result<usize, ProtocolError> {
    usize::try_from(len)
        .ok()
        .filter(|&n| n <= MAX_BULK_LEN)
        .ok_or(ProtocolError::InvalidLength(len))
}
