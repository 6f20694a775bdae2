//! Stylesheet parser per [§ 5 Parsing](https://www.w3.org/TR/css-syntax-3/#parsing).
//!
//! The scan only needs rule structure, selector text and raw declaration
//! values, so this parser works on characters directly instead of a token
//! stream. Strings, comments, escapes and bracket nesting are honored so
//! that a `;` or `{` inside them does not end a declaration or a prelude.
//!
//! Parse errors are recovered from as the syntax spec describes, with one
//! exception: a block, comment or string still open at the end of the input
//! is reported as a [`CssError`] so truncated sheets are noticed.

use pinlayer_dom::StyleDeclaration;

use crate::CssError;
use crate::cssom::{CssRule, StyleRule};

/// [§ 5.3.3 Parse a stylesheet](https://www.w3.org/TR/css-syntax-3/#parse-stylesheet)
///
/// # Errors
///
/// Returns [`CssError::UnterminatedBlock`], [`CssError::UnterminatedComment`]
/// or [`CssError::UnterminatedString`] for input that ends inside one of them.
pub fn parse_stylesheet(input: &str) -> Result<Vec<CssRule>, CssError> {
    // "Consume a list of rules from input, with the top-level flag set."
    CssParser::new(input).consume_list_of_rules(None)
}

/// CSS parser
struct CssParser<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> CssParser<'a> {
    const fn new(input: &'a str) -> Self {
        Self { input, position: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.input[self.position..].chars().nth(1)
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.position += c.len_utf8();
        }
    }

    fn at_comment(&self) -> bool {
        self.peek() == Some('/') && self.peek_second() == Some('*')
    }

    /// [§ 4.3.2 Consume comments](https://www.w3.org/TR/css-syntax-3/#consume-comment)
    fn skip_comment(&mut self) -> Result<(), CssError> {
        let start = self.position;
        self.position += 2;
        match self.input[self.position..].find("*/") {
            Some(end) => {
                self.position += end + 2;
                Ok(())
            }
            // "If the preceding paragraph ended by consuming an EOF code
            // point, this is a parse error."
            None => Err(CssError::UnterminatedComment(start)),
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), CssError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => self.bump(),
                Some('/') if self.peek_second() == Some('*') => self.skip_comment()?,
                _ => return Ok(()),
            }
        }
    }

    /// [§ 5.4.1 Consume a list of rules](https://www.w3.org/TR/css-syntax-3/#consume-list-of-rules)
    ///
    /// `block_start` is the offset of the `{` that opened a nested list, or
    /// `None` at the top level.
    fn consume_list_of_rules(&mut self, block_start: Option<usize>) -> Result<Vec<CssRule>, CssError> {
        // "Create an initially empty list of rules."
        let mut rules = Vec::new();

        loop {
            self.skip_whitespace_and_comments()?;
            match self.peek() {
                // "<EOF-token>"
                // "Return the list of rules."
                None => {
                    return match block_start {
                        None => Ok(rules),
                        Some(open) => Err(CssError::UnterminatedBlock(open)),
                    };
                }

                // The closing brace of the enclosing group. A stray one at
                // the top level is a parse error and is dropped.
                Some('}') => {
                    self.bump();
                    if block_start.is_some() {
                        return Ok(rules);
                    }
                }

                // "<at-keyword-token>"
                // "Reconsume the current input token. Consume an at-rule, and
                // append the returned value to the list of rules."
                Some('@') => rules.push(self.consume_at_rule()?),

                // "anything else"
                // "Reconsume the current input token. Consume a qualified rule.
                // If anything is returned, append it to the list of rules."
                Some(_) => {
                    if let Some(rule) = self.consume_qualified_rule()? {
                        rules.push(CssRule::Style(rule));
                    }
                }
            }
        }
    }

    /// [§ 5.4.2 Consume an at-rule](https://www.w3.org/TR/css-syntax-3/#consume-at-rule)
    fn consume_at_rule(&mut self) -> Result<CssRule, CssError> {
        self.bump(); // '@'
        let name = self.consume_ident().to_ascii_lowercase();
        let (prelude, stop) = self.consume_until(&['{', ';', '}'])?;

        match stop {
            // "<{-token>"
            // "Consume a simple block and assign it to the at-rule's block."
            Some('{') => {
                let open = self.position;
                self.bump();
                let condition = collapse_whitespace(&prelude);
                match name.as_str() {
                    "media" => Ok(CssRule::Media {
                        condition,
                        rules: self.consume_list_of_rules(Some(open))?,
                    }),
                    "supports" => Ok(CssRule::Supports {
                        condition,
                        rules: self.consume_list_of_rules(Some(open))?,
                    }),
                    _ => {
                        self.skip_block(open)?;
                        Ok(CssRule::Other { name })
                    }
                }
            }
            // "<semicolon-token>"
            // "Return the at-rule."
            Some(';') => {
                self.bump();
                Ok(CssRule::Other { name })
            }
            // "<EOF-token>"
            // "This is a parse error. Return the at-rule."
            // A '}' belongs to the enclosing block and is left for it.
            _ => Ok(CssRule::Other { name }),
        }
    }

    /// [§ 5.4.3 Consume a qualified rule](https://www.w3.org/TR/css-syntax-3/#consume-qualified-rule)
    fn consume_qualified_rule(&mut self) -> Result<Option<StyleRule>, CssError> {
        let (prelude, stop) = self.consume_until(&['{', '}'])?;
        if stop != Some('{') {
            // "<EOF-token>"
            // "This is a parse error. Return nothing."
            return Ok(None);
        }

        let open = self.position;
        self.bump();
        let style = self.consume_declaration_block(open)?;
        Ok(Some(StyleRule {
            selector_text: collapse_whitespace(&prelude),
            style,
        }))
    }

    /// [§ 5.4.5 Consume a list of declarations](https://www.w3.org/TR/css-syntax-3/#consume-list-of-declarations)
    ///
    /// Consumes through the closing `}`. Nested blocks are skipped.
    fn consume_declaration_block(&mut self, open: usize) -> Result<StyleDeclaration, CssError> {
        let mut style = StyleDeclaration::new();
        loop {
            let (text, stop) = self.consume_until(&[';', '{', '}'])?;
            match stop {
                None => return Err(CssError::UnterminatedBlock(open)),
                Some(';') => {
                    self.bump();
                    apply_declaration(&mut style, &text);
                }
                Some('{') => {
                    let nested = self.position;
                    self.bump();
                    self.skip_block(nested)?;
                }
                Some(_) => {
                    self.bump();
                    apply_declaration(&mut style, &text);
                    return Ok(style);
                }
            }
        }
    }

    /// Skip the rest of a `{}` block whose opening brace is already consumed.
    fn skip_block(&mut self, open: usize) -> Result<(), CssError> {
        loop {
            let (_, stop) = self.consume_until(&['{', '}'])?;
            match stop {
                Some('{') => {
                    let nested = self.position;
                    self.bump();
                    self.skip_block(nested)?;
                }
                Some(_) => {
                    self.bump();
                    return Ok(());
                }
                None => return Err(CssError::UnterminatedBlock(open)),
            }
        }
    }

    /// [§ 4.3.11 Consume an ident sequence](https://www.w3.org/TR/css-syntax-3/#consume-name)
    fn consume_ident(&mut self) -> String {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()) {
                break;
            }
            ident.push(c);
            self.bump();
        }
        ident
    }

    /// Consume raw text up to, not including, one of `stops` at bracket
    /// depth zero. Returns the text and the stop found (`None` at EOF).
    /// Comments are replaced by a single space.
    fn consume_until(&mut self, stops: &[char]) -> Result<(String, Option<char>), CssError> {
        let mut text = String::new();
        let mut depth = 0usize;
        loop {
            let Some(c) = self.peek() else {
                return Ok((text, None));
            };
            if depth == 0 && stops.contains(&c) {
                return Ok((text, Some(c)));
            }
            if self.at_comment() {
                self.skip_comment()?;
                text.push(' ');
                continue;
            }
            match c {
                '"' | '\'' => text.push_str(&self.consume_string(c)?),
                '\\' => {
                    text.push(c);
                    self.bump();
                    if let Some(escaped) = self.peek() {
                        text.push(escaped);
                        self.bump();
                    }
                }
                _ => {
                    match c {
                        '(' | '[' => depth += 1,
                        ')' | ']' => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                    text.push(c);
                    self.bump();
                }
            }
        }
    }

    /// [§ 4.3.5 Consume a string token](https://www.w3.org/TR/css-syntax-3/#consume-string-token)
    ///
    /// Returns the string including its quotes.
    fn consume_string(&mut self, quote: char) -> Result<String, CssError> {
        let start = self.position;
        let mut text = String::from(quote);
        self.bump();
        while let Some(c) = self.peek() {
            text.push(c);
            self.bump();
            if c == '\\' {
                if let Some(escaped) = self.peek() {
                    text.push(escaped);
                    self.bump();
                }
            } else if c == quote {
                return Ok(text);
            }
        }
        Err(CssError::UnterminatedString(start))
    }
}

/// [§ 5.4.6 Consume a declaration](https://www.w3.org/TR/css-syntax-3/#consume-declaration)
///
/// Declarations without a colon or with an empty value are dropped.
fn apply_declaration(style: &mut StyleDeclaration, text: &str) {
    let Some((name, value)) = text.split_once(':') else {
        return;
    };
    let name = name.trim();
    let value = value.trim();
    if name.is_empty() {
        return;
    }

    // "If the last two non-<whitespace-token>s in the declaration's value are
    // a <delim-token> with the value "!" followed by an <ident-token> with a
    // value that is an ASCII case-insensitive match for "important", remove
    // them from the declaration's value and set the declaration's important
    // flag to true."
    let (value, important) = match value.rfind('!') {
        Some(bang) if value[bang + 1..].trim().eq_ignore_ascii_case("important") => {
            (value[..bang].trim_end(), true)
        }
        _ => (value, false),
    };

    if !value.is_empty() {
        style.set_property(name, value, important);
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
