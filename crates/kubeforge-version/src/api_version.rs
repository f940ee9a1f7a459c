use std::{cmp::Ordering, fmt::Display, str::FromStr};

use snafu::{ResultExt, Snafu};

use crate::{ParseReleaseDateError, ReleaseDate};

/// The tag of the experimental, continuously evolving API version.
pub const LABS_TAG: &str = "vlabs";

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum ApiVersionParseError {
    #[snafu(display("API version cannot be empty"))]
    Empty,

    #[snafu(display("failed to parse {input:?} as dated API version"))]
    ParseReleaseDate {
        source: ParseReleaseDateError,
        input: String,
    },
}

/// An API model version tag, either `vlabs` or a dated release such as
/// `2017-07-01`.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum ApiVersion {
    /// The experimental `vlabs` schema.
    Labs,

    /// A frozen, dated schema release.
    Dated(ReleaseDate),
}

impl ApiVersion {
    pub fn is_labs(&self) -> bool {
        matches!(self, Self::Labs)
    }
}

impl FromStr for ApiVersion {
    type Err = ApiVersionParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "" => EmptySnafu.fail(),
            LABS_TAG => Ok(Self::Labs),
            dated => {
                let date = ReleaseDate::from_str(dated)
                    .context(ParseReleaseDateSnafu { input: dated })?;
                Ok(Self::Dated(date))
            }
        }
    }
}

impl PartialOrd for ApiVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ApiVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Labs, Self::Labs) => Ordering::Equal,
            (Self::Labs, Self::Dated(_)) => Ordering::Greater,
            (Self::Dated(_), Self::Labs) => Ordering::Less,
            (Self::Dated(lhs), Self::Dated(rhs)) => lhs.cmp(rhs),
        }
    }
}

impl Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Labs => f.write_str(LABS_TAG),
            Self::Dated(date) => date.fmt(f),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ApiVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ApiVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let input = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        Self::from_str(&input).map_err(serde::de::Error::custom)
    }
}
