//! Path-expression evaluation for the snapshot host.
//!
//! An XPath 1.0 subset: absolute and `//` paths, `.` and `..`, the common
//! axes, name tests, `*`, `text()`, `node()`, predicates with positions,
//! `last()`, `position()`, attribute tests, `=`/`!=`, `and`/`or`,
//! `contains`, `starts-with`, `normalize-space`, `not`, and `|` unions.
//! Results are de-duplicated and returned in document order.

use std::collections::{HashMap, HashSet};

use super::{NodeId, SnapshotDocument};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    Dot,
    DotDot,
    At,
    Star,
    Pipe,
    Comma,
    Eq,
    NotEq,
    LBracket,
    RBracket,
    LParen,
    RParen,
    ColonColon,
    Name(String),
    Literal(String),
    Number(f64),
}

fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            c if c.is_whitespace() => i += 1,
            '/' if next == Some('/') => {
                tokens.push(Token::DoubleSlash);
                i += 2;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '.' if next == Some('.') => {
                tokens.push(Token::DotDot);
                i += 2;
            }
            '.' if next.is_some_and(|n| n.is_ascii_digit()) => {
                let (number, end) = take_number(&chars, i)?;
                tokens.push(Token::Number(number));
                i = end;
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            ':' if next == Some(':') => {
                tokens.push(Token::ColonColon);
                i += 2;
            }
            '!' if next == Some('=') => {
                tokens.push(Token::NotEq);
                i += 2;
            }
            '@' => {
                tokens.push(Token::At);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '|' => {
                tokens.push(Token::Pipe);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Eq);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '"' | '\'' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == c)
                    .ok_or_else(|| "unterminated string literal".to_string())?;
                tokens.push(Token::Literal(chars[i + 1..i + 1 + close].iter().collect()));
                i += close + 2;
            }
            c if c.is_ascii_digit() => {
                let (number, end) = take_number(&chars, i)?;
                tokens.push(Token::Number(number));
                i = end;
            }
            c if is_name_start(c) => {
                let end = chars[i..]
                    .iter()
                    .position(|&ch| !is_name_char(ch))
                    .map_or(chars.len(), |offset| i + offset);
                tokens.push(Token::Name(chars[i..end].iter().collect()));
                i = end;
            }
            c => return Err(format!("unexpected character '{c}'")),
        }
    }
    Ok(tokens)
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

fn take_number(chars: &[char], start: usize) -> Result<(f64, usize), String> {
    let end = chars[start..]
        .iter()
        .position(|&c| !(c.is_ascii_digit() || c == '.'))
        .map_or(chars.len(), |offset| start + offset);
    let text: String = chars[start..end].iter().collect();
    text.parse()
        .map(|n| (n, end))
        .map_err(|_| format!("invalid number {text:?}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    SelfNode,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
}

impl Axis {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "child" => Self::Child,
            "descendant" => Self::Descendant,
            "descendant-or-self" => Self::DescendantOrSelf,
            "parent" => Self::Parent,
            "self" => Self::SelfNode,
            "ancestor" => Self::Ancestor,
            "ancestor-or-self" => Self::AncestorOrSelf,
            "following-sibling" => Self::FollowingSibling,
            "preceding-sibling" => Self::PrecedingSibling,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum NodeTest {
    Name(String),
    AnyElement,
    Text,
    AnyNode,
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
struct PathExpr {
    absolute: bool,
    steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Function {
    Contains,
    StartsWith,
    NormalizeSpace,
    Not,
    Last,
    Position,
    StringLength,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "contains" => Self::Contains,
            "starts-with" => Self::StartsWith,
            "normalize-space" => Self::NormalizeSpace,
            "not" => Self::Not,
            "last" => Self::Last,
            "position" => Self::Position,
            "string-length" => Self::StringLength,
            _ => return None,
        })
    }

    const fn arity(self) -> (usize, usize) {
        match self {
            Self::Contains | Self::StartsWith => (2, 2),
            Self::NormalizeSpace | Self::StringLength => (0, 1),
            Self::Not => (1, 1),
            Self::Last | Self::Position => (0, 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Equals(Box<Expr>, Box<Expr>),
    NotEquals(Box<Expr>, Box<Expr>),
    Literal(String),
    Number(f64),
    Attribute(String),
    Path(PathExpr),
    Call(Function, Vec<Expr>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<(), String> {
        match self.advance() {
            Some(ref token) if token == expected => Ok(()),
            Some(token) => Err(format!("expected {expected:?}, found {token:?}")),
            None => Err(format!("expected {expected:?}, found end of expression")),
        }
    }

    fn parse_union(&mut self) -> Result<Vec<PathExpr>, String> {
        let mut paths = vec![self.parse_path()?];
        while self.peek() == Some(&Token::Pipe) {
            self.advance();
            paths.push(self.parse_path()?);
        }
        Ok(paths)
    }

    fn parse_path(&mut self) -> Result<PathExpr, String> {
        let mut steps = Vec::new();
        let absolute = match self.peek() {
            Some(Token::Slash) => {
                self.advance();
                if !self.starts_step() {
                    return Ok(PathExpr {
                        absolute: true,
                        steps,
                    });
                }
                true
            }
            Some(Token::DoubleSlash) => {
                self.advance();
                steps.push(descendant_or_self());
                true
            }
            _ => false,
        };

        steps.push(self.parse_step()?);
        loop {
            match self.peek() {
                Some(Token::Slash) => {
                    self.advance();
                }
                Some(Token::DoubleSlash) => {
                    self.advance();
                    steps.push(descendant_or_self());
                }
                _ => break,
            }
            steps.push(self.parse_step()?);
        }
        Ok(PathExpr { absolute, steps })
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Name(_) | Token::Star | Token::Dot | Token::DotDot | Token::At)
        )
    }

    fn parse_step(&mut self) -> Result<Step, String> {
        match self.peek() {
            Some(Token::Dot) => {
                self.advance();
                return Ok(Step {
                    axis: Axis::SelfNode,
                    test: NodeTest::AnyNode,
                    predicates: Vec::new(),
                });
            }
            Some(Token::DotDot) => {
                self.advance();
                return Ok(Step {
                    axis: Axis::Parent,
                    test: NodeTest::AnyNode,
                    predicates: Vec::new(),
                });
            }
            Some(Token::At) => {
                return Err("attribute nodes cannot be located".to_string());
            }
            _ => {}
        }

        let mut axis = Axis::Child;
        if let (Some(Token::Name(name)), Some(Token::ColonColon)) = (self.peek(), self.peek_at(1)) {
            axis = Axis::from_name(name).ok_or_else(|| format!("unsupported axis '{name}'"))?;
            self.pos += 2;
        }

        let test = match self.advance() {
            Some(Token::Star) => NodeTest::AnyElement,
            Some(Token::Name(name)) if self.peek() == Some(&Token::LParen) => {
                self.advance();
                self.expect(&Token::RParen)?;
                match name.as_str() {
                    "text" => NodeTest::Text,
                    "node" => NodeTest::AnyNode,
                    other => return Err(format!("unsupported node test '{other}()'")),
                }
            }
            Some(Token::Name(name)) => NodeTest::Name(name),
            Some(token) => return Err(format!("expected a step, found {token:?}")),
            None => return Err("expected a step, found end of expression".to_string()),
        };

        let mut predicates = Vec::new();
        while self.peek() == Some(&Token::LBracket) {
            self.advance();
            predicates.push(self.parse_or()?);
            self.expect(&Token::RBracket)?;
        }
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Some(Token::Name(n)) if n == "or") {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_comparison()?;
        while matches!(self.peek(), Some(Token::Name(n)) if n == "and") {
            self.advance();
            let right = self.parse_comparison()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, String> {
        let left = self.parse_operand()?;
        match self.peek() {
            Some(Token::Eq) => {
                self.advance();
                let right = self.parse_operand()?;
                Ok(Expr::Equals(Box::new(left), Box::new(right)))
            }
            Some(Token::NotEq) => {
                self.advance();
                let right = self.parse_operand()?;
                Ok(Expr::NotEquals(Box::new(left), Box::new(right)))
            }
            _ => Ok(left),
        }
    }

    fn parse_operand(&mut self) -> Result<Expr, String> {
        match self.peek().cloned() {
            Some(Token::Literal(text)) => {
                self.advance();
                Ok(Expr::Literal(text))
            }
            Some(Token::Number(n)) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            Some(Token::At) => {
                self.advance();
                match self.advance() {
                    Some(Token::Name(name)) => Ok(Expr::Attribute(name)),
                    _ => Err("expected attribute name after '@'".to_string()),
                }
            }
            Some(Token::LParen) => {
                self.advance();
                let inner = self.parse_or()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Name(name))
                if self.peek_at(1) == Some(&Token::LParen) && name != "text" && name != "node" =>
            {
                let function =
                    Function::from_name(&name).ok_or_else(|| format!("unknown function '{name}'"))?;
                self.pos += 2;
                let mut args = Vec::new();
                if self.peek() != Some(&Token::RParen) {
                    args.push(self.parse_or()?);
                    while self.peek() == Some(&Token::Comma) {
                        self.advance();
                        args.push(self.parse_or()?);
                    }
                }
                self.expect(&Token::RParen)?;
                let (min, max) = function.arity();
                if args.len() < min || args.len() > max {
                    return Err(format!("{name}() takes {min}..={max} arguments"));
                }
                Ok(Expr::Call(function, args))
            }
            Some(_) => Ok(Expr::Path(self.parse_path()?)),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

fn descendant_or_self() -> Step {
    Step {
        axis: Axis::DescendantOrSelf,
        test: NodeTest::AnyNode,
        predicates: Vec::new(),
    }
}

/// Intermediate predicate value
#[derive(Debug, Clone)]
enum Value {
    Nodes(Vec<String>),
    Str(String),
    Num(f64),
    Bool(bool),
}

impl Value {
    fn truthy(&self) -> bool {
        match self {
            Self::Nodes(items) => !items.is_empty(),
            Self::Str(s) => !s.is_empty(),
            Self::Num(n) => *n != 0.0 && !n.is_nan(),
            Self::Bool(b) => *b,
        }
    }

    fn string(&self) -> String {
        match self {
            Self::Nodes(items) => items.first().cloned().unwrap_or_default(),
            Self::Str(s) => s.clone(),
            Self::Num(n) => format!("{n}"),
            Self::Bool(b) => b.to_string(),
        }
    }

    fn strings(&self) -> Vec<String> {
        match self {
            Self::Nodes(items) => items.clone(),
            other => vec![other.string()],
        }
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Bool(_), _) | (_, Value::Bool(_)) => left.truthy() == right.truthy(),
        (Value::Num(n), other) | (other, Value::Num(n)) => other
            .strings()
            .iter()
            .any(|s| s.trim().parse::<f64>().is_ok_and(|v| v == *n)),
        _ => {
            let rights = right.strings();
            left.strings().iter().any(|l| rights.contains(l))
        }
    }
}

struct Evaluator<'a> {
    doc: &'a SnapshotDocument,
    order: HashMap<NodeId, usize>,
}

struct Context {
    node: NodeId,
    position: usize,
    size: usize,
}

impl Evaluator<'_> {
    fn sort(&self, nodes: &mut Vec<NodeId>) {
        let mut seen = HashSet::new();
        nodes.retain(|id| seen.insert(*id));
        nodes.sort_by_key(|id| self.order.get(id).copied().unwrap_or(usize::MAX));
    }

    fn select(&self, path: &PathExpr, context: NodeId) -> Vec<NodeId> {
        let mut current = vec![if path.absolute { self.doc.root() } else { context }];
        for step in &path.steps {
            let mut next = Vec::new();
            for &node in &current {
                let candidates: Vec<NodeId> = self
                    .axis(step.axis, node)
                    .into_iter()
                    .filter(|&id| self.node_test(&step.test, id))
                    .collect();
                next.extend(self.filter(candidates, &step.predicates));
            }
            self.sort(&mut next);
            current = next;
        }
        current
    }

    fn filter(&self, mut nodes: Vec<NodeId>, predicates: &[Expr]) -> Vec<NodeId> {
        for predicate in predicates {
            let size = nodes.len();
            nodes = nodes
                .into_iter()
                .enumerate()
                .filter(|&(i, node)| {
                    let ctx = Context {
                        node,
                        position: i + 1,
                        size,
                    };
                    match self.eval(predicate, &ctx) {
                        #[allow(clippy::float_cmp)]
                        Value::Num(n) => n == ctx.position as f64,
                        other => other.truthy(),
                    }
                })
                .map(|(_, node)| node)
                .collect();
        }
        nodes
    }

    // reverse axes come back nearest first so positions count outward
    fn axis(&self, axis: Axis, node: NodeId) -> Vec<NodeId> {
        let doc = self.doc;
        match axis {
            Axis::Child => doc.children(node).to_vec(),
            Axis::Descendant => doc.descendants(node),
            Axis::DescendantOrSelf => std::iter::once(node).chain(doc.descendants(node)).collect(),
            Axis::Parent => doc.parent(node).into_iter().collect(),
            Axis::SelfNode => vec![node],
            Axis::Ancestor => self.ancestors(node),
            Axis::AncestorOrSelf => std::iter::once(node).chain(self.ancestors(node)).collect(),
            Axis::FollowingSibling | Axis::PrecedingSibling => {
                let Some(parent) = doc.parent(node) else {
                    return Vec::new();
                };
                let siblings = doc.children(parent);
                let pos = siblings.iter().position(|&s| s == node).unwrap_or(0);
                if axis == Axis::FollowingSibling {
                    siblings[pos + 1..].to_vec()
                } else {
                    siblings[..pos].iter().rev().copied().collect()
                }
            }
        }
    }

    fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.doc.parent(node);
        while let Some(parent) = cursor {
            out.push(parent);
            cursor = self.doc.parent(parent);
        }
        out
    }

    fn node_test(&self, test: &NodeTest, node: NodeId) -> bool {
        match test {
            NodeTest::AnyNode => true,
            NodeTest::Text => self.doc.is_text(node),
            NodeTest::AnyElement => self.doc.is_element(node),
            NodeTest::Name(name) => self
                .doc
                .tag(node)
                .is_some_and(|tag| tag.eq_ignore_ascii_case(name)),
        }
    }

    fn eval(&self, expr: &Expr, ctx: &Context) -> Value {
        match expr {
            Expr::Or(a, b) => Value::Bool(self.eval(a, ctx).truthy() || self.eval(b, ctx).truthy()),
            Expr::And(a, b) => {
                Value::Bool(self.eval(a, ctx).truthy() && self.eval(b, ctx).truthy())
            }
            Expr::Equals(a, b) => Value::Bool(values_equal(&self.eval(a, ctx), &self.eval(b, ctx))),
            Expr::NotEquals(a, b) => {
                let (a, b) = (self.eval(a, ctx), self.eval(b, ctx));
                match (&a, &b) {
                    (Value::Nodes(items), _) | (_, Value::Nodes(items)) if items.is_empty() => {
                        Value::Bool(false)
                    }
                    _ => Value::Bool(!values_equal(&a, &b)),
                }
            }
            Expr::Literal(s) => Value::Str(s.clone()),
            Expr::Number(n) => Value::Num(*n),
            Expr::Attribute(name) => Value::Nodes(
                self.doc
                    .attr(ctx.node, name)
                    .map(str::to_string)
                    .into_iter()
                    .collect(),
            ),
            Expr::Path(path) => Value::Nodes(
                self.select(path, ctx.node)
                    .into_iter()
                    .map(|id| self.doc.text_content_of(id))
                    .collect(),
            ),
            Expr::Call(function, args) => self.call(*function, args, ctx),
        }
    }

    fn call(&self, function: Function, args: &[Expr], ctx: &Context) -> Value {
        let arg = |i: usize| {
            args.get(i).map_or_else(
                || self.doc.text_content_of(ctx.node),
                |expr| self.eval(expr, ctx).string(),
            )
        };
        match function {
            Function::Contains => Value::Bool(arg(0).contains(&arg(1))),
            Function::StartsWith => Value::Bool(arg(0).starts_with(&arg(1))),
            Function::NormalizeSpace => {
                Value::Str(arg(0).split_whitespace().collect::<Vec<_>>().join(" "))
            }
            Function::StringLength => Value::Num(arg(0).chars().count() as f64),
            Function::Not => Value::Bool(!args.first().is_some_and(|e| self.eval(e, ctx).truthy())),
            Function::Last => Value::Num(ctx.size as f64),
            Function::Position => Value::Num(ctx.position as f64),
        }
    }
}

/// Evaluate an expression against the document, returning element and text
/// nodes in document order.
pub(crate) fn evaluate(doc: &SnapshotDocument, expression: &str) -> Result<Vec<NodeId>, String> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }
    let mut parser = Parser { tokens, pos: 0 };
    let paths = parser.parse_union()?;
    if let Some(token) = parser.peek() {
        return Err(format!("unexpected {token:?}"));
    }

    let evaluator = Evaluator {
        doc,
        order: doc.document_order(),
    };
    let mut nodes: Vec<NodeId> = paths
        .iter()
        .flat_map(|path| evaluator.select(path, doc.root()))
        .filter(|&id| doc.is_element(id) || doc.is_text(id))
        .collect();
    evaluator.sort(&mut nodes);
    Ok(nodes)
}
