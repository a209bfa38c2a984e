//! Selector matching for the snapshot host.
//!
//! Supports type and universal selectors, `#id`, `.class`, attribute
//! conditions (`[a]`, `=`, `~=`, `|=`, `^=`, `$=`, `*=`), `:first-child`,
//! `:last-child`, the four combinators and comma-separated groups.

use super::{NodeId, SnapshotDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
    Adjacent,
    Sibling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrCondition {
    name: String,
    op: AttrOp,
    value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pseudo {
    FirstChild,
    LastChild,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCondition>,
    pseudos: Vec<Pseudo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Part {
    compound: Compound,
    // relation to the part on the left
    combinator: Option<Combinator>,
}

/// A parsed selector group list
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorList {
    groups: Vec<Vec<Part>>,
}

impl SelectorList {
    pub(crate) fn matches(&self, doc: &SnapshotDocument, node: NodeId) -> bool {
        self.groups
            .iter()
            .any(|parts| !parts.is_empty() && matches_at(doc, parts, parts.len() - 1, node))
    }
}

fn matches_at(doc: &SnapshotDocument, parts: &[Part], idx: usize, node: NodeId) -> bool {
    if !matches_compound(doc, &parts[idx].compound, node) {
        return false;
    }
    if idx == 0 {
        return true;
    }
    let combinator = parts[idx].combinator.unwrap_or(Combinator::Descendant);
    match combinator {
        Combinator::Child => doc
            .parent(node)
            .filter(|&p| doc.is_element(p))
            .is_some_and(|p| matches_at(doc, parts, idx - 1, p)),
        Combinator::Descendant => {
            let mut cursor = doc.parent(node);
            while let Some(ancestor) = cursor.filter(|&p| doc.is_element(p)) {
                if matches_at(doc, parts, idx - 1, ancestor) {
                    return true;
                }
                cursor = doc.parent(ancestor);
            }
            false
        }
        Combinator::Adjacent => doc
            .element_siblings(node)
            .0
            .first()
            .is_some_and(|&s| matches_at(doc, parts, idx - 1, s)),
        Combinator::Sibling => doc
            .element_siblings(node)
            .0
            .iter()
            .any(|&s| matches_at(doc, parts, idx - 1, s)),
    }
}

fn matches_compound(doc: &SnapshotDocument, compound: &Compound, node: NodeId) -> bool {
    let Some(tag) = doc.tag(node) else {
        return false;
    };
    if let Some(expected) = &compound.tag {
        if !tag.eq_ignore_ascii_case(expected) {
            return false;
        }
    }
    if let Some(id) = &compound.id {
        if doc.attr(node, "id") != Some(id.as_str()) {
            return false;
        }
    }
    let class_attr = doc.attr(node, "class").unwrap_or("");
    if !compound
        .classes
        .iter()
        .all(|c| class_attr.split_whitespace().any(|token| token == c))
    {
        return false;
    }
    for cond in &compound.attrs {
        let Some(actual) = doc.attr(node, &cond.name) else {
            return false;
        };
        let value = cond.value.as_str();
        let ok = match cond.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == value,
            AttrOp::Includes => actual.split_whitespace().any(|t| t == value),
            AttrOp::DashMatch => actual == value || actual.starts_with(&format!("{value}-")),
            AttrOp::Prefix => !value.is_empty() && actual.starts_with(value),
            AttrOp::Suffix => !value.is_empty() && actual.ends_with(value),
            AttrOp::Substring => !value.is_empty() && actual.contains(value),
        };
        if !ok {
            return false;
        }
    }
    compound.pseudos.iter().all(|pseudo| {
        let (before, after) = doc.element_siblings(node);
        match pseudo {
            Pseudo::FirstChild => before.is_empty(),
            Pseudo::LastChild => after.is_empty(),
        }
    })
}

/// Parse a selector list
pub(crate) fn parse(selector: &str) -> Result<SelectorList, String> {
    let groups = split_outside_brackets(selector, |c| c == ',')?
        .into_iter()
        .map(|group| parse_chain(&group))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SelectorList { groups })
}

fn split_outside_brackets(source: &str, is_split: impl Fn(char) -> bool) -> Result<Vec<String>, String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in source.chars() {
        if let Some(q) = quote {
            current.push(ch);
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' if depth > 0 => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' => {
                depth += 1;
                current.push(ch);
            }
            ']' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "unbalanced ']'".to_string())?;
                current.push(ch);
            }
            c if depth == 0 && is_split(c) => {
                if current.trim().is_empty() {
                    return Err("empty selector group".to_string());
                }
                pieces.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if depth != 0 || quote.is_some() {
        return Err("unterminated attribute condition".to_string());
    }
    if current.trim().is_empty() {
        return Err("empty selector".to_string());
    }
    pieces.push(current.trim().to_string());
    Ok(pieces)
}

fn tokenize_chain(chain: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    let flush = |current: &mut String, tokens: &mut Vec<String>| {
        if !current.is_empty() {
            tokens.push(std::mem::take(current));
        }
    };

    for ch in chain.chars() {
        if let Some(q) = quote {
            current.push(ch);
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' if depth > 0 => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' => {
                depth += 1;
                current.push(ch);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            '>' | '+' | '~' if depth == 0 => {
                flush(&mut current, &mut tokens);
                tokens.push(ch.to_string());
            }
            c if c.is_whitespace() && depth == 0 => flush(&mut current, &mut tokens),
            _ => current.push(ch),
        }
    }
    flush(&mut current, &mut tokens);
    Ok(tokens)
}

fn parse_chain(chain: &str) -> Result<Vec<Part>, String> {
    let mut parts: Vec<Part> = Vec::new();
    let mut pending: Option<Combinator> = None;

    for token in tokenize_chain(chain)? {
        let combinator = match token.as_str() {
            ">" => Some(Combinator::Child),
            "+" => Some(Combinator::Adjacent),
            "~" => Some(Combinator::Sibling),
            _ => None,
        };
        if let Some(combinator) = combinator {
            if pending.is_some() || parts.is_empty() {
                return Err(format!("misplaced combinator '{token}'"));
            }
            pending = Some(combinator);
            continue;
        }
        let compound = parse_compound(&token)?;
        let combinator = if parts.is_empty() {
            None
        } else {
            Some(pending.take().unwrap_or(Combinator::Descendant))
        };
        parts.push(Part {
            compound,
            combinator,
        });
    }
    if parts.is_empty() || pending.is_some() {
        return Err("selector ends with a combinator".to_string());
    }
    Ok(parts)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

fn take_ident(chars: &[char], start: usize) -> Option<(String, usize)> {
    let end = chars[start..]
        .iter()
        .position(|&c| !is_ident_char(c))
        .map_or(chars.len(), |offset| start + offset);
    (end > start).then(|| (chars[start..end].iter().collect(), end))
}

fn parse_compound(token: &str) -> Result<Compound, String> {
    let chars: Vec<char> = token.chars().collect();
    let mut compound = Compound::default();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if i == 0 => i += 1,
            '#' => {
                let (id, next) =
                    take_ident(&chars, i + 1).ok_or_else(|| format!("expected id in {token:?}"))?;
                if compound.id.replace(id).is_some() {
                    return Err(format!("two ids in {token:?}"));
                }
                i = next;
            }
            '.' => {
                let (class, next) = take_ident(&chars, i + 1)
                    .ok_or_else(|| format!("expected class in {token:?}"))?;
                compound.classes.push(class);
                i = next;
            }
            '[' => {
                let close = find_closing_bracket(&chars, i)
                    .ok_or_else(|| format!("unterminated '[' in {token:?}"))?;
                let inner: String = chars[i + 1..close].iter().collect();
                compound.attrs.push(parse_attr_condition(&inner)?);
                i = close + 1;
            }
            ':' => {
                let (name, next) = take_ident(&chars, i + 1)
                    .ok_or_else(|| format!("expected pseudo-class in {token:?}"))?;
                let pseudo = match name.as_str() {
                    "first-child" => Pseudo::FirstChild,
                    "last-child" => Pseudo::LastChild,
                    other => return Err(format!("unsupported pseudo-class ':{other}'")),
                };
                compound.pseudos.push(pseudo);
                i = next;
            }
            c if i == 0 && is_ident_char(c) => {
                let (tag, next) =
                    take_ident(&chars, i).ok_or_else(|| format!("expected tag in {token:?}"))?;
                compound.tag = Some(tag);
                i = next;
            }
            c => return Err(format!("unexpected '{c}' in {token:?}")),
        }
    }
    Ok(compound)
}

fn find_closing_bracket(chars: &[char], open: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (offset, &c) in chars[open + 1..].iter().enumerate() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, ']') => return Some(open + 1 + offset),
            _ => {}
        }
    }
    None
}

fn parse_attr_condition(inner: &str) -> Result<AttrCondition, String> {
    let inner = inner.trim();
    let ops = [
        ("~=", AttrOp::Includes),
        ("|=", AttrOp::DashMatch),
        ("^=", AttrOp::Prefix),
        ("$=", AttrOp::Suffix),
        ("*=", AttrOp::Substring),
        ("=", AttrOp::Equals),
    ];
    let found = ops
        .iter()
        .filter_map(|(symbol, op)| inner.find(symbol).map(|pos| (pos, *symbol, *op)))
        .min_by_key(|(pos, symbol, _)| (*pos, std::cmp::Reverse(symbol.len())));

    let (name, op, raw_value) = match found {
        Some((pos, symbol, op)) => (&inner[..pos], op, &inner[pos + symbol.len()..]),
        None => (inner, AttrOp::Exists, ""),
    };
    let name = name.trim();
    if name.is_empty() || !name.chars().all(is_ident_char) {
        return Err(format!("invalid attribute name in [{inner}]"));
    }
    let value = unquote(raw_value.trim())?;
    Ok(AttrCondition {
        name: name.to_string(),
        op,
        value,
    })
}

fn unquote(raw: &str) -> Result<String, String> {
    let mut chars = raw.chars();
    match chars.next() {
        Some(q @ ('"' | '\'')) => {
            if raw.len() < 2 || !raw.ends_with(q) {
                return Err(format!("unterminated string {raw:?}"));
            }
            Ok(raw[1..raw.len() - 1].to_string())
        }
        _ => Ok(raw.to_string()),
    }
}
