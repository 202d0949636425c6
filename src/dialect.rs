//! Target dialects
//!
//! The builder records every construct unconditionally. Whether a dialect
//! can express it is only asked at render time.

use std::fmt;

/// A MySQL server version, compared lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MySqlVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl MySqlVersion {
    /// Optimizer hints (`/*+ ... */`) first appeared here.
    pub const V5_7_7: Self = Self::new(5, 7, 7);
    /// WITH, FOR SHARE, NOWAIT, SKIP LOCKED, locking OF.
    pub const V8_0_1: Self = Self::new(8, 0, 1);
    /// Window functions and the WINDOW clause.
    pub const V8_0_2: Self = Self::new(8, 0, 2);
    /// LATERAL derived tables.
    pub const V8_0_14: Self = Self::new(8, 0, 14);

    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse `8`, `8.0` or `8.0.32`.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.trim().split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = match parts.next() {
            Some(p) => p.parse().ok()?,
            None => 0,
        };
        let patch = match parts.next() {
            Some(p) => p.parse().ok()?,
            None => 0,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(major, minor, patch))
    }
}

impl fmt::Display for MySqlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// The SQL flavor a renderer targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// ANSI-style output: double-quoted identifiers, no vendor extensions.
    Standard,
    /// MySQL at a given server version.
    MySql(MySqlVersion),
}

impl Dialect {
    pub fn mysql8() -> Self {
        Self::MySql(MySqlVersion::new(8, 0, 32))
    }

    pub fn mysql57() -> Self {
        Self::MySql(MySqlVersion::new(5, 7, 44))
    }

    pub fn is_mysql(&self) -> bool {
        matches!(self, Self::MySql(_))
    }

    pub fn mysql_version(&self) -> Option<MySqlVersion> {
        match self {
            Self::MySql(v) => Some(*v),
            Self::Standard => None,
        }
    }

    /// Whether this is MySQL at `min` or later.
    pub fn mysql_at_least(&self, min: MySqlVersion) -> bool {
        self.mysql_version().is_some_and(|v| v >= min)
    }

    /// Parse `standard`, `mysql`, `mysql-5.7`, `mysql-8.0.32`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "standard" | "ansi" => Some(Self::Standard),
            "mysql" => Some(Self::mysql8()),
            _ => {
                let version = s.strip_prefix("mysql-")?;
                MySqlVersion::parse(version).map(Self::MySql)
            }
        }
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Self::mysql8()
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "standard SQL"),
            Self::MySql(v) => write!(f, "MySQL {}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse_and_order() {
        assert_eq!(MySqlVersion::parse("8.0.32"), Some(MySqlVersion::new(8, 0, 32)));
        assert_eq!(MySqlVersion::parse("5.7"), Some(MySqlVersion::new(5, 7, 0)));
        assert_eq!(MySqlVersion::parse("8.x"), None);
        assert_eq!(MySqlVersion::parse("8.0.1.2"), None);
        assert!(MySqlVersion::V5_7_7 < MySqlVersion::V8_0_1);
        assert!(MySqlVersion::V8_0_2 < MySqlVersion::V8_0_14);
    }

    #[test]
    fn test_dialect_parse() {
        assert_eq!(Dialect::parse("standard"), Some(Dialect::Standard));
        assert_eq!(Dialect::parse("MySQL"), Some(Dialect::mysql8()));
        assert_eq!(
            Dialect::parse("mysql-5.7.40"),
            Some(Dialect::MySql(MySqlVersion::new(5, 7, 40)))
        );
        assert_eq!(Dialect::parse("oracle"), None);
    }

    #[test]
    fn test_version_gate() {
        assert!(Dialect::mysql8().mysql_at_least(MySqlVersion::V8_0_14));
        assert!(!Dialect::mysql57().mysql_at_least(MySqlVersion::V8_0_1));
        assert!(!Dialect::Standard.mysql_at_least(MySqlVersion::V5_7_7));
    }
}
