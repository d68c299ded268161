//! Manager tree configuration.
//!
//! ```toml
//! separator = "|"
//! count = true
//! counter_alphabet = "!#$%&*+-.:;=?@^_~"
//! max_token_len = 100
//! ```

use serde::Deserialize;
use thiserror::Error;

/// ASCII punctuation usable as counter suffixes, before separator characters
/// are removed.
const PUNCTUATION: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
	#[error("invalid manager config: {0}")]
	Toml(#[from] toml::de::Error),
	#[error("separator must not be empty")]
	EmptySeparator,
	#[error("counter character {0:?} is also a separator character")]
	CounterOverlapsSeparator(char),
	#[error("counter character {0:?} appears more than once")]
	DuplicateCounterChar(char),
	#[error("counting is enabled but the counter alphabet is empty")]
	EmptyCounterAlphabet,
	#[error("max_token_len must be positive")]
	ZeroTokenLen,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerConfig {
	/// Separator between the identifier and each field.
	pub separator: String,
	/// Append a rotating counter character to issued identifiers, so that
	/// several live instances of one record type get distinct tokens.
	pub count: bool,
	/// Characters used for the counter suffix. Defaults to ASCII punctuation
	/// minus the separator characters.
	pub counter_alphabet: Option<String>,
	/// Longest token the host accepts, in characters.
	pub max_token_len: usize,
}

impl Default for ManagerConfig {
	fn default() -> Self {
		Self {
			separator: compid_token::DEFAULT_SEPARATOR.to_string(),
			count: true,
			counter_alphabet: None,
			max_token_len: 100,
		}
	}
}

impl ManagerConfig {
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigLoadError> {
		let config: Self = toml::from_str(text)?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<(), ConfigLoadError> {
		if self.separator.is_empty() {
			return Err(ConfigLoadError::EmptySeparator);
		}
		if self.max_token_len == 0 {
			return Err(ConfigLoadError::ZeroTokenLen);
		}
		if let Some(alphabet) = &self.counter_alphabet {
			let mut seen = Vec::new();
			for c in alphabet.chars() {
				if self.separator.contains(c) {
					return Err(ConfigLoadError::CounterOverlapsSeparator(c));
				}
				if seen.contains(&c) {
					return Err(ConfigLoadError::DuplicateCounterChar(c));
				}
				seen.push(c);
			}
		}
		if self.count && self.counter_chars().is_empty() {
			return Err(ConfigLoadError::EmptyCounterAlphabet);
		}
		Ok(())
	}

	/// The effective counter alphabet, in rotation order.
	pub fn counter_chars(&self) -> Vec<char> {
		match &self.counter_alphabet {
			Some(alphabet) => alphabet.chars().collect(),
			None => PUNCTUATION
				.chars()
				.filter(|c| !self.separator.contains(*c))
				.collect(),
		}
	}
}
