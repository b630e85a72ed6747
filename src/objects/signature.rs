//! Author/committer/tagger value objects.
//!
//! The textual form is Git's `Name <email> <seconds> <±HHMM>`. Parsing is
//! lenient about spacing around the angle brackets; formatting is canonical.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A person, as `name <email>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Parse `name <email>`: the name is the trimmed text left of the first
    /// `<`, the email the text between `<` and `>`.
    pub fn parse(text: &str) -> Option<Self> {
        let open = text.find('<')?;
        let close = text[open..].find('>')? + open;
        Some(Self {
            name: text[..open].trim().to_string(),
            email: text[open + 1..close].to_string(),
        })
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// A point in time with its recording timezone, as `<seconds> ±HHMM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Time {
    pub seconds: i64,
    pub offset_minutes: i16,
}

impl Time {
    pub fn new(seconds: i64, offset_minutes: i16) -> Self {
        Self {
            seconds,
            offset_minutes,
        }
    }

    pub fn parse(seconds: &str, offset: &str) -> Option<Self> {
        let seconds: i64 = seconds.parse().ok()?;
        let bytes = offset.as_bytes();
        if bytes.len() != 5 || !offset.is_ascii() {
            return None;
        }
        let sign: i16 = match bytes[0] {
            b'+' => 1,
            b'-' => -1,
            _ => return None,
        };
        let hours: i16 = offset[1..3].parse().ok()?;
        let minutes: i16 = offset[3..5].parse().ok()?;
        Some(Self {
            seconds,
            offset_minutes: sign * (hours * 60 + minutes),
        })
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.offset_minutes < 0 { '-' } else { '+' };
        let magnitude = self.offset_minutes.unsigned_abs();
        write!(
            f,
            "{} {}{:02}{:02}",
            self.seconds,
            sign,
            magnitude / 60,
            magnitude % 60
        )
    }
}

/// An identity plus the time it acted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub identity: Identity,
    pub time: Time,
}

impl Signature {
    pub fn new(identity: Identity, time: Time) -> Self {
        Self { identity, time }
    }

    /// Parse the full `Name <email> <seconds> <±HHMM>` form.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(bytes).ok()?;
        let close = text.find('>')?;
        let identity = Identity::parse(&text[..=close])?;
        let mut rest = text[close + 1..].split_whitespace();
        let time = Time::parse(rest.next()?, rest.next()?)?;
        if rest.next().is_some() {
            return None;
        }
        Some(Self { identity, time })
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.identity, self.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format() {
        let sig = Signature::parse(b"Test Author <author@example.com> 1640995200 +0200").unwrap();
        assert_eq!(sig.identity.name, "Test Author");
        assert_eq!(sig.identity.email, "author@example.com");
        assert_eq!(sig.time.seconds, 1640995200);
        assert_eq!(sig.time.offset_minutes, 120);
        assert_eq!(
            sig.to_string(),
            "Test Author <author@example.com> 1640995200 +0200"
        );
    }

    #[test]
    fn test_negative_offset() {
        let time = Time::parse("1754330635", "-0430").unwrap();
        assert_eq!(time.offset_minutes, -270);
        assert_eq!(time.to_string(), "1754330635 -0430");
    }

    #[test]
    fn test_pre_epoch_seconds() {
        let time = Time::parse("-7200", "+0000").unwrap();
        assert_eq!(time.seconds, -7200);
        assert_eq!(time.to_string(), "-7200 +0000");
    }

    #[test]
    fn test_identity_trimming() {
        let id = Identity::parse("  spaced out   <so@example.com>").unwrap();
        assert_eq!(id.name, "spaced out");
        assert_eq!(id.email, "so@example.com");
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(Signature::parse(b"no email 1640995200 +0200").is_none());
        assert!(Signature::parse(b"A <a@b> 1640995200").is_none());
        assert!(Signature::parse(b"A <a@b> 1640995200 0200").is_none());
        assert!(Signature::parse(b"A <a@b> 1640995200 +0200 extra").is_none());
        assert!(Time::parse("xyz", "+0200").is_none());
    }
}
