use std::fmt;

use serde::{Serialize, Serializer};

/// Competition year; the natural partition for every artifact.
pub type Season = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Outcome::Home => "Home",
            Outcome::Draw => "Draw",
            Outcome::Away => "Away",
        }
    }

    /// Code table shared by every label column: single-letter and single-digit
    /// codes plus the canonical names themselves.
    pub fn from_code(raw: &str) -> Option<Self> {
        match raw.trim() {
            "H" | "1" | "Home" => Some(Outcome::Home),
            "D" | "0" | "Draw" => Some(Outcome::Draw),
            "A" | "2" | "Away" => Some(Outcome::Away),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A label after code-table mapping. Values outside the table are kept verbatim
/// so bad source data stays visible in the artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeLabel {
    Known(Outcome),
    Raw(String),
}

impl OutcomeLabel {
    pub fn normalize(raw: &str) -> Self {
        match Outcome::from_code(raw) {
            Some(o) => OutcomeLabel::Known(o),
            None => OutcomeLabel::Raw(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OutcomeLabel::Known(o) => o.as_str(),
            OutcomeLabel::Raw(s) => s.as_str(),
        }
    }
}

impl Default for OutcomeLabel {
    fn default() -> Self {
        OutcomeLabel::Raw(String::new())
    }
}

impl fmt::Display for OutcomeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OutcomeLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
