use crate::error::{DataLinkError, Result};

/// Server-assigned packet identifier.
///
/// Real ids are positive and increase monotonically within a ring buffer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PacketId(i64);

impl PacketId {
    /// Sentinel: position at the oldest packet in the ring.
    pub const EARLIEST: Self = Self(-2);

    /// Sentinel: position at the newest packet in the ring.
    pub const LATEST: Self = Self(-3);

    /// No id: `read` continues an in-flight exchange instead of sending READ.
    pub const NONE: Self = Self(0);

    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(self) -> i64 {
        self.0
    }

    /// Returns true for a concrete server id (as opposed to 0 or a sentinel).
    pub fn is_real(self) -> bool {
        self.0 > 0
    }

    /// Returns true if this is a positioning sentinel (EARLIEST or LATEST).
    pub fn is_special(self) -> bool {
        self == Self::EARLIEST || self == Self::LATEST
    }

    /// Parse the decimal wire form.
    pub fn parse(s: &str) -> Result<Self> {
        let value: i64 = s
            .parse()
            .map_err(|_| DataLinkError::InvalidResponse(format!("invalid packet id: {s:?}")))?;
        Ok(Self(value))
    }
}

impl From<i64> for PacketId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for PacketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if *self == Self::EARLIEST {
            write!(f, "EARLIEST")
        } else if *self == Self::LATEST {
            write!(f, "LATEST")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid() {
        assert_eq!(PacketId::parse("42").unwrap().value(), 42);
        assert_eq!(PacketId::parse("-2").unwrap(), PacketId::EARLIEST);
    }

    #[test]
    fn parse_invalid() {
        assert!(PacketId::parse("abc").is_err());
        assert!(PacketId::parse("").is_err());
        assert!(PacketId::parse("1.5").is_err());
    }

    #[test]
    fn sentinels() {
        assert!(PacketId::EARLIEST.is_special());
        assert!(PacketId::LATEST.is_special());
        assert!(!PacketId::new(7).is_special());

        assert!(PacketId::new(1).is_real());
        assert!(!PacketId::NONE.is_real());
        assert!(!PacketId::EARLIEST.is_real());
    }

    #[test]
    fn ordering() {
        assert!(PacketId::new(10) < PacketId::new(20));
    }

    #[test]
    fn display() {
        assert_eq!(PacketId::EARLIEST.to_string(), "EARLIEST");
        assert_eq!(PacketId::LATEST.to_string(), "LATEST");
        assert_eq!(PacketId::new(42).to_string(), "42");
    }
}
