use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The string form doubles as the serde representation.
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ParseEnumError {
                        kind: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(
    /// What kind of input a form field expects. Drives classification and rendering.
    FieldType {
        Text => "text",
        Checkbox => "checkbox",
        Signature => "signature",
        Date => "date",
    }
);

str_enum!(
    /// Which matching strategy produced a keypath binding.
    MatchMethod {
        SynonymExact => "synonym-exact",
        SynonymContains => "synonym-contains",
        SynonymPartial => "synonym-partial",
        SynonymReverse => "synonym-reverse",
        Token => "token",
        Embedding => "embedding",
    }
);

impl Default for FieldType {
    fn default() -> Self {
        FieldType::Text
    }
}
