//! Compound selector matching for the in-memory document
//!
//! Supports selector lists of compound selectors: `tag`, `*`, `#id`,
//! `.class`, `[attr]` and `[attr=value]` (quoted or bare). Combinators and
//! pseudo-classes are rejected with `EmbedError::InvalidSelector`.
//! Tokenizing is left to `cssparser`.

use cssparser::{ParseError, Parser, ParserInput, Token};

use crate::error::{EmbedError, EmbedResult};

/// Read access to an element for matching
pub(crate) trait ElementView {
    fn tag(&self) -> &str;
    fn attribute(&self, name: &str) -> Option<&str>;
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

/// Parsed comma-separated selector list
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct SelectorList(Vec<Compound>);

impl SelectorList {
    pub(crate) fn parse(selector: &str) -> EmbedResult<Self> {
        let mut input = ParserInput::new(selector);
        let mut parser = Parser::new(&mut input);
        parser
            .parse_comma_separated(parse_compound)
            .map(Self)
            .map_err(|_| EmbedError::InvalidSelector(selector.to_string()))
    }

    pub(crate) fn matches(&self, element: &impl ElementView) -> bool {
        self.0.iter().any(|compound| compound.matches(element))
    }
}

impl Compound {
    fn matches(&self, element: &impl ElementView) -> bool {
        if let Some(tag) = &self.tag {
            if !tag.eq_ignore_ascii_case(element.tag()) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.attribute("id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let class_attr = element.attribute("class").unwrap_or_default();
            if !self
                .classes
                .iter()
                .all(|class| class_attr.split_whitespace().any(|c| c == class))
            {
                return false;
            }
        }
        self.attributes
            .iter()
            .all(|(name, expected)| match (element.attribute(name), expected) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == expected,
            })
    }
}

/// One compound selector; whitespace may only trail it
fn parse_compound<'i>(input: &mut Parser<'i, '_>) -> Result<Compound, ParseError<'i, ()>> {
    let mut compound = Compound::default();
    let mut empty = true;
    loop {
        let Ok(token) = input.next_including_whitespace().cloned() else {
            break;
        };
        match token {
            Token::Ident(tag) if empty => compound.tag = Some(tag.to_ascii_lowercase()),
            Token::Delim('*') if empty => {}
            Token::IDHash(id) => compound.id = Some(id.to_string()),
            Token::Delim('.') => match input.next_including_whitespace()?.clone() {
                Token::Ident(class) => compound.classes.push(class.to_string()),
                _ => return Err(input.new_custom_error::<(), ()>(())),
            },
            Token::SquareBracketBlock => {
                compound.attributes.push(input.parse_nested_block(parse_attribute)?);
            }
            // 不支持组合器
            Token::WhiteSpace(_) if !empty && input.is_exhausted() => break,
            _ => return Err(input.new_custom_error::<(), ()>(())),
        }
        empty = false;
    }
    if empty {
        return Err(input.new_custom_error::<(), ()>(()));
    }
    Ok(compound)
}

/// Inside `[...]`: `name` or `name=value`
fn parse_attribute<'i>(
    input: &mut Parser<'i, '_>,
) -> Result<(String, Option<String>), ParseError<'i, ()>> {
    let name = input.expect_ident()?.to_string();
    if input.is_exhausted() {
        return Ok((name, None));
    }
    input.expect_delim('=')?;
    let value = input.expect_ident_or_string()?.to_string();
    Ok((name, Some(value)))
}
