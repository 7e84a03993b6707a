//! # Parser
//!
//! Recursive-descent parsing of the compact key notations.
//!
//! ## Supported Syntax
//!
//! ```text
//! key        = type ("-" qualifier)? (":" branch)? ("(" version ")")?
//! hyphenated = type ("-" ident? ("-" token? ("-" token?)?)?)?
//! type       = "*" | ident
//! qualifier  = ident
//! branch     = token
//! version    = token
//! ident      = alpha (alnum | "_")*
//! token      = alnum (alnum | "_" | ".")*
//! ```
//!
//! A `*` type denotes a key whose type is unset. Empty segments in the
//! hyphenated notation denote unset fields.

use crate::error::{KeyError, Result};
use crate::trait_key::{KeyField, TraitKey};

#[cfg(test)]
mod tests;

/// Marker for a key whose type is left open.
pub(crate) const ANY_TYPE: char = '*';

/// Represents an error that occurred during parsing.
#[derive(Debug, PartialEq, Clone)]
struct ParseError {
	/// Human-readable description of the parse error.
	message: String,
	/// Byte offset in the input where the error occurred.
	position: usize,
}

impl ParseError {
	fn into_key_error(self, input: &str) -> KeyError {
		KeyError::InvalidKeyFormat {
			input: input.to_string(),
			position: self.position,
			message: self.message,
		}
	}
}

/// Maintains the parser's state for recursive descent parsing.
struct Parser<'a> {
	/// Remaining input.
	input: &'a str,
	/// Current byte position in the input.
	position: usize,
}

impl<'a> Parser<'a> {
	fn new(input: &'a str) -> Self {
		Self { input, position: 0 }
	}

	/// Peeks at the next character without consuming it.
	fn peek(&self) -> Option<char> {
		self.input.chars().next()
	}

	/// Consumes and returns the next character, advancing the parser.
	fn next(&mut self) -> Option<char> {
		let ch = self.peek()?;
		self.position += ch.len_utf8();
		self.input = &self.input[ch.len_utf8()..];
		Some(ch)
	}

	/// Consumes the next character if it equals `expected`.
	fn eat(&mut self, expected: char) -> bool {
		if self.peek() == Some(expected) {
			self.next();
			true
		} else {
			false
		}
	}

	/// Consumes the next character, failing if it doesn't match.
	fn take(&mut self, expected: char) -> std::result::Result<(), ParseError> {
		match self.peek() {
			Some(ch) if ch == expected => {
				self.next();
				Ok(())
			}
			Some(ch) => Err(self.error(format!("expected '{expected}', found '{ch}'"))),
			None => Err(self.error(format!("expected '{expected}', found end of input"))),
		}
	}

	/// Consumes and returns characters that satisfy a predicate.
	fn take_while<F>(&mut self, predicate: F) -> String
	where
		F: Fn(char) -> bool,
	{
		let mut result = String::new();
		while let Some(ch) = self.peek() {
			if !predicate(ch) {
				break;
			}
			result.push(ch);
			self.next();
		}
		result
	}

	/// Parses `alpha (alnum | "_")*`.
	fn ident(&mut self, what: &str) -> std::result::Result<String, ParseError> {
		match self.peek() {
			Some(ch) if ch.is_ascii_alphabetic() => {}
			Some(ch) => return Err(self.error(format!("{what} must start with a letter, found '{ch}'"))),
			None => return Err(self.error(format!("expected {what}, found end of input"))),
		}
		Ok(self.take_while(|ch| ch.is_ascii_alphanumeric() || ch == '_'))
	}

	/// Parses `alnum (alnum | "_" | ".")*`.
	fn token(&mut self, what: &str) -> std::result::Result<String, ParseError> {
		match self.peek() {
			Some(ch) if ch.is_ascii_alphanumeric() => {}
			Some(ch) => {
				return Err(self.error(format!("{what} must start with a letter or digit, found '{ch}'")));
			}
			None => return Err(self.error(format!("expected {what}, found end of input"))),
		}
		Ok(self.take_while(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '.'))
	}

	/// Parses whichever production the field uses.
	fn field(&mut self, field: KeyField) -> std::result::Result<String, ParseError> {
		match field {
			KeyField::Type | KeyField::Qualifier => self.ident(field.label()),
			KeyField::Branch | KeyField::Version => self.token(field.label()),
		}
	}

	fn expect_end(&self) -> std::result::Result<(), ParseError> {
		match self.peek() {
			None => Ok(()),
			Some(ch) => Err(self.error(format!("expected end of input, found '{ch}'"))),
		}
	}

	/// Creates a [`ParseError`] with the current parser position.
	fn error(&self, message: String) -> ParseError {
		ParseError {
			message,
			position: self.position,
		}
	}
}

/// Parses the canonical `type-qualifier:branch(version)` notation.
pub(crate) fn parse_key(input: &str) -> Result<TraitKey> {
	let mut parser = Parser::new(input);
	parse_canonical(&mut parser).map_err(|e| e.into_key_error(input))
}

fn parse_canonical(parser: &mut Parser<'_>) -> std::result::Result<TraitKey, ParseError> {
	let trait_type = if parser.eat(ANY_TYPE) {
		None
	} else {
		Some(parser.field(KeyField::Type)?)
	};
	let qualifier = if parser.eat('-') {
		Some(parser.field(KeyField::Qualifier)?)
	} else {
		None
	};
	let branch = if parser.eat(':') {
		Some(parser.field(KeyField::Branch)?)
	} else {
		None
	};
	let version = if parser.eat('(') {
		let version = parser.field(KeyField::Version)?;
		parser.take(')')?;
		Some(version)
	} else {
		None
	};
	parser.expect_end()?;
	Ok(TraitKey::from_validated(trait_type, qualifier, branch, version))
}

/// Parses the hyphen-only `type-qualifier-branch-version` notation.
pub(crate) fn parse_hyphenated(input: &str) -> Result<TraitKey> {
	let mut parser = Parser::new(input);
	parse_hyphen_segments(&mut parser).map_err(|e| e.into_key_error(input))
}

fn parse_hyphen_segments(parser: &mut Parser<'_>) -> std::result::Result<TraitKey, ParseError> {
	let trait_type = if parser.eat(ANY_TYPE) {
		None
	} else {
		Some(parser.field(KeyField::Type)?)
	};
	let mut segments: [Option<String>; 3] = Default::default();
	let fields = [KeyField::Qualifier, KeyField::Branch, KeyField::Version];
	for (slot, field) in segments.iter_mut().zip(fields) {
		if !parser.eat('-') {
			break;
		}
		if matches!(parser.peek(), None | Some('-')) {
			continue;
		}
		*slot = Some(parser.field(field)?);
	}
	parser.expect_end()?;
	let [qualifier, branch, version] = segments;
	Ok(TraitKey::from_validated(trait_type, qualifier, branch, version))
}

/// Checks a single field value against its production.
pub(crate) fn validate_field(field: KeyField, value: &str) -> Result<()> {
	let mut parser = Parser::new(value);
	parser
		.field(field)
		.and_then(|_| parser.expect_end())
		.map_err(|e| e.into_key_error(value))
}
