//! The static persona registry.
//!
//! Every persona maps to a system prompt and default sampling parameters.
//! The set is closed; unknown keys resolve to [`Persona::General`].

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A named system-prompt and parameter preset.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    /// A helpful, concise assistant.
    #[default]
    General,
    /// A senior software engineer.
    Swe,
    /// A senior frontend engineer.
    Frontend,
    /// A DevOps/SRE expert.
    Devops,
    /// A data/ML engineer.
    Data,
}

/// Default generation parameters of a persona.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PersonaDefaults {
    /// Sampling temperature.
    pub temperature: f32,
}

const SWE_PROMPT: &str = "You are a senior software engineer.
- Prioritize correctness and best practices.
- Provide complete, minimal runnable examples with language tags (js, ts, py, bash, sql).
- State assumptions briefly and proceed.
- Mention edge cases, tests, and security implications when helpful.";

impl Persona {
    /// All personas, in display order.
    pub const ALL: [Persona; 5] = [
        Persona::General,
        Persona::Swe,
        Persona::Frontend,
        Persona::Devops,
        Persona::Data,
    ];

    /// Returns the persona for `key`, if it names one.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.key() == key)
    }

    /// Resolves an optional, possibly unknown key. Anything that is not a
    /// known key falls back to [`Persona::General`].
    #[inline]
    pub fn resolve(key: Option<&str>) -> Self {
        key.and_then(Self::from_key).unwrap_or_default()
    }

    /// Returns the stable key of this persona.
    pub const fn key(self) -> &'static str {
        match self {
            Persona::General => "general",
            Persona::Swe => "swe",
            Persona::Frontend => "frontend",
            Persona::Devops => "devops",
            Persona::Data => "data",
        }
    }

    /// Returns the system prompt of this persona.
    pub const fn system_prompt(self) -> &'static str {
        match self {
            Persona::General => "You are a helpful, concise assistant.",
            Persona::Swe => SWE_PROMPT,
            Persona::Frontend => {
                "You are a senior frontend engineer (HTML/CSS/JS, Angular/React/Vue). \
                 Provide modern, accessible solutions with clean UI/UX."
            }
            Persona::Devops => {
                "You are a DevOps/SRE expert. Prefer reproducible CLI steps \
                 (Linux, Docker, systemd, Nginx), IaC hints, and rollback safety."
            }
            Persona::Data => {
                "You are a data/ML engineer. Provide clear pipelines, evaluation \
                 metrics, and well-commented code (pandas, numpy, sklearn)."
            }
        }
    }

    /// Returns the default generation parameters of this persona.
    pub const fn defaults(self) -> PersonaDefaults {
        let temperature = match self {
            Persona::General => 0.7,
            Persona::Swe | Persona::Frontend => 0.3,
            Persona::Devops | Persona::Data => 0.25,
        };
        PersonaDefaults { temperature }
    }
}

impl Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Error returned when parsing an unknown persona key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownPersona(pub String);

impl Display for UnknownPersona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown persona: {}", self.0)
    }
}

impl std::error::Error for UnknownPersona {}

impl FromStr for Persona {
    type Err = UnknownPersona;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| UnknownPersona(s.to_owned()))
    }
}
