//! Device breakpoints and their grid column counts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the three device breakpoints a page is laid out for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    /// Wide screens, 12 columns.
    #[default]
    Desktop,
    /// Medium screens, 8 columns.
    Tablet,
    /// Narrow screens, 4 columns.
    Mobile,
}

impl Breakpoint {
    /// All breakpoints in canonical order (desktop, tablet, mobile).
    pub const ALL: [Self; 3] = [Self::Desktop, Self::Tablet, Self::Mobile];

    /// Number of grid columns at this breakpoint.
    #[must_use]
    pub const fn columns(self) -> u32 {
        match self {
            Self::Desktop => 12,
            Self::Tablet => 8,
            Self::Mobile => 4,
        }
    }

    /// Widest item the layout store accepts when placing an item that was
    /// dropped on a different breakpoint.
    ///
    /// Desktop is left unclamped.
    #[must_use]
    pub const fn width_limit(self) -> Option<u32> {
        match self {
            Self::Desktop => None,
            Self::Tablet => Some(8),
            Self::Mobile => Some(4),
        }
    }

    /// Lowercase identifier used in documents and URLs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Tablet => "tablet",
            Self::Mobile => "mobile",
        }
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Breakpoint {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "desktop" | "lg" => Ok(Self::Desktop),
            "tablet" | "md" => Ok(Self::Tablet),
            "mobile" | "sm" | "xs" => Ok(Self::Mobile),
            other => anyhow::bail!(
                "Unknown breakpoint '{other}'. Expected one of: desktop, tablet, mobile"
            ),
        }
    }
}
