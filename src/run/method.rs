use std::fmt;
use std::str::FromStr;

use crate::foundation::core::SampleIndex;
use crate::foundation::error::FoldError;

/// Render method selected on the command line, handed to the renderer as `METHOD`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Standard multi-sample accumulation.
    Input,
    /// Like `Input`, with disjoint seeds and a `2` channel suffix.
    #[serde(rename = "secondinput")]
    SecondInput,
    /// Single render; the renderer accumulates internally.
    Ref,
    /// Resumable multi-thousand-sample reference accumulation.
    RefRestir,
    #[serde(rename = "centergbuf")]
    CenterGbuf,
    #[serde(rename = "multigbuf")]
    MultiGbuf,
}

/// How many renders a method issues and how they are numbered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleLoop {
    /// Samples `0..count`, each folded into the merged artifacts.
    Standard,
    /// Resumed from the staged reference state.
    Reference,
    /// One render, no accumulation.
    Single,
}

impl Method {
    pub const ALL: [Method; 6] = [
        Method::Input,
        Method::SecondInput,
        Method::Ref,
        Method::RefRestir,
        Method::CenterGbuf,
        Method::MultiGbuf,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::SecondInput => "secondinput",
            Self::Ref => "ref",
            Self::RefRestir => "ref_restir",
            Self::CenterGbuf => "centergbuf",
            Self::MultiGbuf => "multigbuf",
        }
    }

    pub fn sample_loop(self) -> SampleLoop {
        match self {
            Self::Input | Self::SecondInput => SampleLoop::Standard,
            Self::RefRestir => SampleLoop::Reference,
            Self::Ref | Self::CenterGbuf | Self::MultiGbuf => SampleLoop::Single,
        }
    }

    /// Seed handed to the renderer for `sample`. Distinct samples of one method never share a seed.
    pub fn seed(self, sample: SampleIndex, second_input_offset: u64) -> u64 {
        match self {
            Self::SecondInput => u64::from(sample.0) + second_input_offset,
            _ => u64::from(sample.0),
        }
    }

    /// Suffix appended to raw channel names before accumulation.
    pub fn channel_suffix(self) -> Option<&'static str> {
        match self {
            Self::SecondInput => Some("2"),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = FoldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|m| m.name()).collect();
                FoldError::validation(format!(
                    "unknown method '{s}' (expected one of: {})",
                    names.join(", ")
                ))
            })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/run/method.rs"]
mod tests;
