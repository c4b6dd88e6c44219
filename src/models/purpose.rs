use serde::{Deserialize, Serialize};
use std::fmt;

/// Purpose code of an advance. Known codes get their own variant; any other
/// code is kept verbatim so that new purposes need no code change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AdvancePurpose {
    #[default]
    Advance,
    SafetyShoes,
    Tools,
    Other,
    Unrecognized(String),
}

impl AdvancePurpose {
    /// Normalizes a raw code (trimmed, upper-cased). An empty code is a
    /// plain advance.
    pub fn from_code(raw: &str) -> Self {
        let code = raw.trim().to_ascii_uppercase();
        match code.as_str() {
            "" | "ADVANCE" => AdvancePurpose::Advance,
            "SAFETY_SHOES" => AdvancePurpose::SafetyShoes,
            "TOOLS" => AdvancePurpose::Tools,
            "OTHER" => AdvancePurpose::Other,
            _ => AdvancePurpose::Unrecognized(code),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            AdvancePurpose::Advance => "ADVANCE",
            AdvancePurpose::SafetyShoes => "SAFETY_SHOES",
            AdvancePurpose::Tools => "TOOLS",
            AdvancePurpose::Other => "OTHER",
            AdvancePurpose::Unrecognized(code) => code,
        }
    }
}

impl fmt::Display for AdvancePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl From<String> for AdvancePurpose {
    fn from(value: String) -> Self {
        AdvancePurpose::from_code(&value)
    }
}

impl From<&str> for AdvancePurpose {
    fn from(value: &str) -> Self {
        AdvancePurpose::from_code(value)
    }
}

impl From<AdvancePurpose> for String {
    fn from(value: AdvancePurpose) -> Self {
        value.code().to_string()
    }
}
