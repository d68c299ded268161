use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::error::TokenError;

/// A compiled token layout.
///
/// The template reads `name{sep}{field1}{sep}{field2}...` and the pattern
/// is its exact inverse: the name and separators are matched literally and
/// every placeholder becomes one capture group over characters that are not
/// part of the separator. Field values containing a separator character are
/// refused at encode time, so every string the pattern accepts is one the
/// template can produce.
#[derive(Clone)]
pub struct TokenSpec {
	name: Arc<str>,
	sep: Arc<str>,
	fields: Arc<[Arc<str>]>,
	template: String,
	pattern: Regex,
}

impl TokenSpec {
	pub fn compile<I, S>(name: &str, sep: &str, fields: I) -> Result<Self, TokenError>
	where
		I: IntoIterator<Item = S>,
		S: Into<Arc<str>>,
	{
		if sep.is_empty() {
			return Err(TokenError::EmptySeparator);
		}
		check_name(name, sep)?;

		let mut names: Vec<Arc<str>> = Vec::new();
		for field in fields {
			let field = field.into();
			if field.is_empty() || field.contains(['{', '}']) {
				return Err(TokenError::InvalidFieldName(field.to_string()));
			}
			if names.contains(&field) {
				return Err(TokenError::DuplicateField(field.to_string()));
			}
			names.push(field);
		}

		let template = build_template(name, sep, &names);
		let pattern = Regex::new(&build_pattern(name, sep, names.len()))?;

		Ok(Self {
			name: name.into(),
			sep: sep.into(),
			fields: names.into(),
			template,
			pattern,
		})
	}

	/// The same layout under a different name.
	pub fn renamed(&self, name: &str) -> Result<Self, TokenError> {
		check_name(name, &self.sep)?;
		Ok(Self {
			name: name.into(),
			sep: self.sep.clone(),
			fields: self.fields.clone(),
			template: build_template(name, &self.sep, &self.fields),
			pattern: Regex::new(&build_pattern(name, &self.sep, self.fields.len()))?,
		})
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn separator(&self) -> &str {
		&self.sep
	}

	pub fn fields(&self) -> &[Arc<str>] {
		&self.fields
	}

	pub fn field_count(&self) -> usize {
		self.fields.len()
	}

	/// The format template, e.g. `vote|{choice}|{round}`.
	pub fn template(&self) -> &str {
		&self.template
	}

	pub fn pattern(&self) -> &Regex {
		&self.pattern
	}

	/// Returns true if `c` may not appear inside field values or suffixes.
	pub fn is_separator_char(&self, c: char) -> bool {
		self.sep.contains(c)
	}

	/// Interleaves the name, the separator and the already dumped field
	/// values. A spec without fields encodes to its bare name.
	pub fn encode<S: AsRef<str>>(&self, values: &[S]) -> Result<String, TokenError> {
		self.encode_with_suffix(values, None)
	}

	/// Like [`encode`](Self::encode), but appends `suffix` directly to the
	/// name portion.
	pub fn encode_with_suffix<S: AsRef<str>>(
		&self,
		values: &[S],
		suffix: Option<char>,
	) -> Result<String, TokenError> {
		if values.len() != self.fields.len() {
			return Err(TokenError::FieldCount {
				expected: self.fields.len(),
				got: values.len(),
			});
		}
		if let Some(c) = suffix
			&& self.is_separator_char(c)
		{
			return Err(TokenError::InvalidSuffix(c));
		}

		let mut token = String::from(&*self.name);
		token.extend(suffix);
		for (field, value) in self.fields.iter().zip(values) {
			let value = value.as_ref();
			if value.contains(|c: char| self.is_separator_char(c)) {
				return Err(TokenError::SeparatorInField {
					field: field.to_string(),
					value: value.to_string(),
					sep: self.sep.to_string(),
				});
			}
			token.push_str(&self.sep);
			token.push_str(value);
		}
		Ok(token)
	}

	/// Splits a token back into its raw field segments, in field order.
	///
	/// The token must carry exactly this spec's name; a counter suffix must
	/// be stripped first.
	pub fn decode<'t>(&self, token: &'t str) -> Result<Vec<&'t str>, TokenError> {
		let mismatch = || TokenError::Mismatch {
			token: token.to_string(),
			pattern: self.pattern.as_str().to_string(),
		};

		let caps = self.pattern.captures(token).ok_or_else(mismatch)?;
		let segments: Vec<&str> = caps
			.iter()
			.skip(1)
			.map(|m| m.map_or("", |m| m.as_str()))
			.collect();
		if segments.len() != self.fields.len() {
			return Err(TokenError::FieldCount {
				expected: self.fields.len(),
				got: segments.len(),
			});
		}
		Ok(segments)
	}

	pub fn matches(&self, token: &str) -> bool {
		self.pattern.is_match(token)
	}
}

impl fmt::Debug for TokenSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TokenSpec")
			.field("template", &self.template)
			.finish()
	}
}

impl fmt::Display for TokenSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.template)
	}
}

impl PartialEq for TokenSpec {
	fn eq(&self, other: &Self) -> bool {
		self.template == other.template
	}
}

impl Eq for TokenSpec {}

/// Splits a token into its name portion and the remainder after the first
/// separator.
///
/// The name portion may still carry a counter suffix.
pub fn split_name<'t>(token: &'t str, sep: &str) -> (&'t str, Option<&'t str>) {
	match token.split_once(sep) {
		Some((name, rest)) => (name, Some(rest)),
		None => (token, None),
	}
}

fn check_name(name: &str, sep: &str) -> Result<(), TokenError> {
	if name.is_empty() {
		return Err(TokenError::EmptyName);
	}
	if name.contains(|c: char| sep.contains(c)) {
		return Err(TokenError::NameContainsSeparator {
			name: name.to_string(),
			sep: sep.to_string(),
		});
	}
	Ok(())
}

fn build_template(name: &str, sep: &str, fields: &[Arc<str>]) -> String {
	let mut template = String::from(name);
	for field in fields {
		template.push_str(sep);
		template.push('{');
		template.push_str(field);
		template.push('}');
	}
	template
}

fn build_pattern(name: &str, sep: &str, count: usize) -> String {
	let mut class = String::new();
	for c in sep.chars() {
		class.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
	}
	let sep = regex::escape(sep);
	let group = format!("{sep}([^{class}]*)");

	let mut pattern = format!("^{}", regex::escape(name));
	for _ in 0..count {
		pattern.push_str(&group);
	}
	pattern.push('$');
	pattern
}

#[cfg(test)]
mod tests;
