//! LED color pattern.

use std::fmt::{self, Display, Formatter};

/// Bitmask of lit LED color channels.
#[derive(Default, PartialEq, Eq, Debug, Copy, Clone)]
pub struct LedMask(u8);

impl LedMask {
    pub const NONE: Self = Self(0x0);
    pub const GREEN: Self = Self(0x1);
    pub const RED: Self = Self(0x2);
    pub const BLUE: Self = Self(0x4);

    /// Raw value written to the device.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Interpret a `-c` pattern token.
    ///
    /// Every one of `r`, `g` and `b` found anywhere in the token lights its channel, so
    /// `"bgr"` and `"green"` are both accepted. Only tokens without any channel character
    /// are compared against `none`.
    pub fn from_pattern(pattern: &str) -> Option<Self> {
        let mut mask = Self::NONE;

        if pattern.contains('r') {
            mask.0 |= Self::RED.0;
        }
        if pattern.contains('g') {
            mask.0 |= Self::GREEN.0;
        }
        if pattern.contains('b') {
            mask.0 |= Self::BLUE.0;
        }

        if mask != Self::NONE {
            Some(mask)
        } else if pattern.starts_with("none") {
            Some(Self::NONE)
        } else {
            None
        }
    }

    /// Fold all `-c` values in order of appearance.
    ///
    /// Later usable values replace earlier ones, unusable values are skipped.
    pub fn from_patterns<'a, I>(patterns: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        patterns.into_iter().fold(None, |mask, pattern| Self::from_pattern(pattern).or(mask))
    }

    fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Display for LedMask {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if *self == Self::NONE {
            return write!(f, "none");
        }

        for (channel, name) in &[(Self::RED, 'r'), (Self::GREEN, 'g'), (Self::BLUE, 'b')] {
            if self.contains(*channel) {
                write!(f, "{}", name)?;
            }
        }

        Ok(())
    }
}
