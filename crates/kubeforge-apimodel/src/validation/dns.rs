//! DNS name checks, adapted from the Kubernetes apimachinery validation
//! helpers.
use std::{fmt::Display, sync::LazyLock};

use const_format::concatcp;
use regex::Regex;
use snafu::Snafu;

/// Minimal length required by RFC 1123 is 63.
pub const RFC_1123_LABEL_MAX_LENGTH: usize = 63;
pub const RFC_1123_LABEL_FMT: &str = "[a-zA-Z0-9]([-a-zA-Z0-9]*[a-zA-Z0-9])?";
const RFC_1123_LABEL_ERROR_MSG: &str = "a RFC 1123 label must consist of alphanumeric characters or '-', and must start and end with an alphanumeric character";

/// Agent pool names end up in VM and NIC names, which limits their length.
pub const AGENT_POOL_NAME_MAX_LENGTH: usize = 12;
const AGENT_POOL_NAME_FMT: &str = "[a-z][a-z0-9]*";
const AGENT_POOL_NAME_ERROR_MSG: &str =
    "an agent pool name must consist of lower case alphanumeric characters and start with a letter";

static RFC_1123_LABEL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concatcp!("^", RFC_1123_LABEL_FMT, "$"))
        .expect("failed to compile RFC 1123 label regex")
});

static AGENT_POOL_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concatcp!("^", AGENT_POOL_NAME_FMT, "$"))
        .expect("failed to compile agent pool name regex")
});

type Result<T = (), E = Errors> = std::result::Result<T, E>;

/// All problems found with a single name.
#[derive(Debug, PartialEq, Eq)]
pub struct Errors(Vec<Error>);

impl Display for Errors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            let prefix = match i {
                0 => "",
                _ => ", ",
            };
            write!(f, "{prefix}{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Errors {}

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum Error {
    #[snafu(display("input must not be empty"))]
    Empty,

    #[snafu(transparent)]
    Regex { source: RegexError },

    #[snafu(display("input is {length} bytes long but must be no more than {max_length}"))]
    TooLong { length: usize, max_length: usize },
}

#[derive(Debug, PartialEq, Eq)]
pub struct RegexError {
    msg: &'static str,
    regex: &'static str,
    examples: &'static [&'static str],
}

impl Display for RegexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self {
            msg,
            regex,
            examples,
        } = self;
        write!(f, "{msg} (")?;
        for (i, example) in examples.iter().enumerate() {
            let prefix = match i {
                0 => "e.g.",
                _ => "or",
            };
            write!(f, "{prefix} {example:?}, ")?;
        }
        write!(f, "regex used for validation is {regex:?})")
    }
}

impl std::error::Error for RegexError {}

fn validate_str_length(value: &str, max_length: usize) -> Result<(), Error> {
    if value.len() > max_length {
        TooLongSnafu {
            length: value.len(),
            max_length,
        }
        .fail()
    } else {
        Ok(())
    }
}

fn validate_str_regex(
    value: &str,
    regex: &'static Regex,
    error_msg: &'static str,
    examples: &'static [&'static str],
) -> Result<(), Error> {
    if regex.is_match(value) {
        Ok(())
    } else {
        Err(RegexError {
            msg: error_msg,
            regex: regex
                .as_str()
                .trim_start_matches('^')
                .trim_end_matches('$'),
            examples,
        }
        .into())
    }
}

/// Runs all `validations`, an empty `value` short-circuits with a single
/// [`Error::Empty`].
fn validate_all(value: &str, validations: impl IntoIterator<Item = Result<(), Error>>) -> Result {
    if value.is_empty() {
        return Err(Errors(vec![Error::Empty]));
    }

    let errors = validations
        .into_iter()
        .filter_map(Result::err)
        .collect::<Vec<_>>();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Errors(errors))
    }
}

/// Tests for a string that conforms to the definition of a label in DNS
/// (RFC 1123). Upper case characters are accepted, DNS is case insensitive.
pub fn is_rfc_1123_label(value: &str) -> Result {
    validate_all(value, [
        validate_str_length(value, RFC_1123_LABEL_MAX_LENGTH),
        validate_str_regex(
            value,
            &RFC_1123_LABEL_REGEX,
            RFC_1123_LABEL_ERROR_MSG,
            &["mycluster", "my-cluster-1"],
        ),
    ])
}

pub fn is_agent_pool_name(value: &str) -> Result {
    validate_all(value, [
        validate_str_length(value, AGENT_POOL_NAME_MAX_LENGTH),
        validate_str_regex(
            value,
            &AGENT_POOL_NAME_REGEX,
            AGENT_POOL_NAME_ERROR_MSG,
            &["agentpool1", "linuxpool"],
        ),
    ])
}
