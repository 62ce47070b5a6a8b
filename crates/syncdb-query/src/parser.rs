//! Hand-rolled precedence-climbing parser (spec §4.6.1, §4.6.2).
//!
//! Grounded on the precedence table and node shapes of realm-core's
//! `driver.hpp` / `query_bison.cpp`, but NOT a port of the Bison grammar:
//! that file is LALR-generated and not a fit for a direct translation, so
//! this is a plain recursive-descent driver over the same operator
//! precedence order (high to low): unary `!`, multiplicative, additive,
//! relational, equality/`IN`, string-compare, `BETWEEN`, `GEOWITHIN`,
//! `&&`, `||`.
//!
//! Arithmetic (`+ - * /`) has no dedicated AST node in spec §4.6.2's
//! `Value` grammar, so constant arithmetic is folded at parse time
//! instead of carried into the tree; a non-constant operand to `+ - * /`
//! is a `TypeMismatch`.

use syncdb_core::path::ListIndex;
use syncdb_core::{Path, PathElement};

use crate::ast::{
    Aggregate, AggrOp, CompareOp, ConstantLit, Descriptor, Geo, GeoArg, GeoPoint, ListLiteral,
    ParsedQuery, PostOp, PropertyRef, Quantifier, Query, Value,
};
use crate::error::QueryError;
use crate::lexer::{Lexer, Token};

pub struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

type Result<T> = std::result::Result<T, QueryError>;

/// Parses a full query string: one predicate plus trailing descriptors.
pub fn parse(src: &str) -> Result<ParsedQuery> {
    match parse_inner(src) {
        Ok(query) => Ok(query),
        Err(e) => {
            tracing::warn!("rejected query {src:?}: {e}");
            Err(e)
        }
    }
}

fn parse_inner(src: &str) -> Result<ParsedQuery> {
    let tokens = Lexer::new(src).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    let predicate = parser.parse_or()?;
    let descriptors = parser.parse_descriptors()?;
    parser.expect_eof()?;
    Ok(ParsedQuery {
        predicate,
        descriptors,
    })
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    fn peek_at(&self, n: usize) -> &Token {
        &self.tokens[(self.pos + n).min(self.tokens.len() - 1)].0
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos].1
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos].0.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn err(&self, message: impl Into<String>) -> QueryError {
        QueryError::SyntaxError {
            offset: self.offset(),
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<()> {
        if *self.peek() == expected {
            self.bump();
            Ok(())
        } else {
            Err(self.err(format!("expected {what}, found {:?}", self.peek())))
        }
    }

    fn expect_eof(&mut self) -> Result<()> {
        if *self.peek() == Token::Eof {
            Ok(())
        } else {
            Err(self.err(format!("unexpected trailing token {:?}", self.peek())))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String> {
        match self.bump() {
            Token::Ident(name) => Ok(name),
            other => Err(QueryError::SyntaxError {
                offset: self.offset(),
                message: format!("expected {what}, found {other:?}"),
            }),
        }
    }

    // --- logical levels: || and && ---------------------------------

    fn parse_or(&mut self) -> Result<Query> {
        let mut terms = vec![self.parse_and()?];
        while *self.peek() == Token::Or {
            self.bump();
            terms.push(self.parse_and()?);
        }
        Ok(if terms.len() == 1 {
            terms.pop().unwrap()
        } else {
            Query::Or(terms)
        })
    }

    fn parse_and(&mut self) -> Result<Query> {
        let mut terms = vec![self.parse_not()?];
        while *self.peek() == Token::And {
            self.bump();
            terms.push(self.parse_not()?);
        }
        Ok(if terms.len() == 1 {
            terms.pop().unwrap()
        } else {
            Query::And(terms)
        })
    }

    fn parse_not(&mut self) -> Result<Query> {
        if matches!(self.peek(), Token::Bang | Token::Not) {
            self.bump();
            let inner = self.parse_not()?;
            Ok(Query::Not(Box::new(inner)))
        } else {
            self.parse_atom_predicate()
        }
    }

    // --- comparison atom: relational / equality / string-compare /
    // between / geowithin, plus parenthesized and boolean-literal atoms --

    fn parse_atom_predicate(&mut self) -> Result<Query> {
        match self.peek() {
            Token::LParen => {
                self.bump();
                let inner = self.parse_or()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::TruePredicate => {
                self.bump();
                Ok(Query::BoolLit(true))
            }
            Token::FalsePredicate => {
                self.bump();
                Ok(Query::BoolLit(false))
            }
            _ => self.parse_comparison(),
        }
    }

    fn parse_comparison(&mut self) -> Result<Query> {
        let left = self.parse_value()?;

        let query = match self.peek().clone() {
            Token::Eq | Token::Ne | Token::Lt | Token::Le | Token::Gt | Token::Ge | Token::In => {
                let op = compare_op_for(&self.bump())?;
                let case_insensitive = self.take_case_insensitive();
                let right = self.parse_value()?;
                Query::Compare {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                    case_insensitive,
                }
            }
            Token::BeginsWith
            | Token::EndsWith
            | Token::Contains
            | Token::Like
            | Token::FullText => {
                let op = compare_op_for(&self.bump())?;
                let case_insensitive = self.take_case_insensitive();
                let right = self.parse_value()?;
                Query::Compare {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                    case_insensitive,
                }
            }
            Token::Between => {
                self.bump();
                self.expect(Token::LBrace, "'{'")?;
                let low = self.parse_constant_signed()?;
                self.expect(Token::Comma, "','")?;
                let high = self.parse_constant_signed()?;
                self.expect(Token::RBrace, "'}'")?;
                let bounds = Value::ListLiteral(ListLiteral {
                    comp_type: None,
                    items: vec![low, high],
                });
                Query::Between {
                    value: Box::new(left),
                    bounds: Box::new(bounds),
                }
            }
            Token::GeoWithin => {
                self.bump();
                let property = match left {
                    Value::Property(p) => p,
                    _ => {
                        return Err(self.err("GEOWITHIN's left operand must be a property"));
                    }
                };
                let area = self.parse_geo_arg()?;
                Query::GeoWithin { property, area }
            }
            _ => match left {
                Value::Constant(ConstantLit::True) => Query::BoolLit(true),
                Value::Constant(ConstantLit::False) => Query::BoolLit(false),
                _ => return Err(self.err("expected a comparison operator")),
            },
        };
        Ok(query)
    }

    fn take_case_insensitive(&mut self) -> bool {
        if *self.peek() == Token::CaseInsensitive {
            self.bump();
            true
        } else {
            false
        }
    }

    // --- value levels: additive / multiplicative / unary / primary -----

    fn parse_value(&mut self) -> Result<Value> {
        self.parse_additive_value()
    }

    fn parse_additive_value(&mut self) -> Result<Value> {
        let mut lhs = self.parse_multiplicative_value()?;
        loop {
            let op = match self.peek() {
                Token::Plus | Token::Minus => self.bump(),
                _ => break,
            };
            let rhs = self.parse_multiplicative_value()?;
            lhs = fold_arith(lhs, &op, rhs, self)?;
        }
        Ok(lhs)
    }

    fn parse_multiplicative_value(&mut self) -> Result<Value> {
        let mut lhs = self.parse_unary_value()?;
        loop {
            let op = match self.peek() {
                Token::Star | Token::Slash => self.bump(),
                _ => break,
            };
            let rhs = self.parse_unary_value()?;
            lhs = fold_arith(lhs, &op, rhs, self)?;
        }
        Ok(lhs)
    }

    fn parse_unary_value(&mut self) -> Result<Value> {
        if *self.peek() == Token::Minus {
            self.bump();
            let inner = self.parse_unary_value()?;
            return negate_value(inner, self);
        }
        self.parse_primary_value()
    }

    fn parse_primary_value(&mut self) -> Result<Value> {
        match self.peek().clone() {
            Token::LParen => {
                self.bump();
                let v = self.parse_value()?;
                self.expect(Token::RParen, "')'")?;
                Ok(v)
            }
            Token::LBrace => Ok(Value::ListLiteral(self.parse_list_literal()?)),
            Token::Subquery => self.parse_subquery(),
            Token::Any => {
                self.bump();
                self.parse_property_value(Some(Quantifier::Any))
            }
            Token::All => {
                self.bump();
                self.parse_property_value(Some(Quantifier::All))
            }
            Token::None_ => {
                self.bump();
                self.parse_property_value(Some(Quantifier::None))
            }
            Token::Argument(n) => {
                self.bump();
                Ok(Value::Constant(ConstantLit::Argument(n)))
            }
            Token::Ident(_) => self.parse_property_value(None),
            _ => Ok(Value::Constant(self.parse_constant()?)),
        }
    }

    fn parse_list_literal(&mut self) -> Result<ListLiteral> {
        self.expect(Token::LBrace, "'{'")?;
        let mut items = Vec::new();
        if *self.peek() != Token::RBrace {
            items.push(self.parse_constant_signed()?);
            while *self.peek() == Token::Comma {
                self.bump();
                items.push(self.parse_constant_signed()?);
            }
        }
        self.expect(Token::RBrace, "'}'")?;
        Ok(ListLiteral {
            comp_type: None,
            items,
        })
    }

    fn parse_subquery(&mut self) -> Result<Value> {
        self.expect(Token::Subquery, "SUBQUERY")?;
        self.expect(Token::LParen, "'('")?;
        let path = self.parse_bare_path()?;
        self.expect(Token::Comma, "','")?;
        let var = self.expect_ident("a subquery variable name")?;
        self.expect(Token::Comma, "','")?;
        let predicate = self.parse_or()?;
        self.expect(Token::RParen, "')'")?;
        self.expect(Token::Dot, "'.'")?;
        match self.bump() {
            Token::At(name) if name.eq_ignore_ascii_case("size") => {}
            other => {
                return Err(self.err(format!("expected '.@size' after SUBQUERY(...), found {other:?}")))
            }
        }
        Ok(Value::Subquery {
            path,
            var,
            predicate: Box::new(predicate),
        })
    }

    // --- paths, properties, aggregates ---------------------------------

    fn parse_property_value(&mut self, quantifier: Option<Quantifier>) -> Result<Value> {
        let path = self.parse_bare_path()?;
        if *self.peek() == Token::Dot {
            if let Token::At(name) = self.peek_at(1).clone() {
                self.bump(); // '.'
                self.bump(); // '@name'
                return self.parse_path_suffix(path, quantifier, &name);
            }
        }
        Ok(Value::Property(PropertyRef {
            path,
            quantifier,
            post_op: None,
        }))
    }

    fn parse_path_suffix(
        &mut self,
        path: Path,
        quantifier: Option<Quantifier>,
        name: &str,
    ) -> Result<Value> {
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "size" => Ok(self.property_with_post_op(path, quantifier, PostOp::Size)),
            "type" => Ok(self.property_with_post_op(path, quantifier, PostOp::Type)),
            "count" => Ok(self.property_with_post_op(path, quantifier, PostOp::Count)),
            "keys" | "values" => {
                let mut extended = path;
                extended
                    .push(PathElement::Column(format!("@{lower}")))
                    .map_err(QueryError::from)?;
                Ok(Value::Property(PropertyRef {
                    path: extended,
                    quantifier,
                    post_op: None,
                }))
            }
            "max" | "min" | "sum" | "avg" => {
                let op = match lower.as_str() {
                    "max" => AggrOp::Max,
                    "min" => AggrOp::Min,
                    "sum" => AggrOp::Sum,
                    _ => AggrOp::Avg,
                };
                if *self.peek() == Token::Dot && matches!(self.peek_at(1), Token::Ident(_)) {
                    self.bump();
                    let prop = self.expect_ident("an aggregate target property")?;
                    let link_name = last_column_name(&path)
                        .ok_or_else(|| self.err("LinkAggr requires a named path"))?;
                    Ok(Value::Aggregate(Aggregate::LinkAggr {
                        path,
                        link_name,
                        op,
                        prop,
                    }))
                } else {
                    Ok(Value::Aggregate(Aggregate::ListAggr { path, op }))
                }
            }
            other => Err(self.err(format!("unknown post-operator '@{other}'"))),
        }
    }

    fn property_with_post_op(
        &self,
        path: Path,
        quantifier: Option<Quantifier>,
        post_op: PostOp,
    ) -> Value {
        Value::Property(PropertyRef {
            path,
            quantifier,
            post_op: Some(post_op),
        })
    }

    /// Parses a path with no trailing post-operator/aggregate suffix
    /// (used for `SUBQUERY`'s first argument and `GEOWITHIN`'s property).
    fn parse_bare_path(&mut self) -> Result<Path> {
        let mut path = Path::new();
        self.push_path_segment(&mut path)?;
        loop {
            match self.peek().clone() {
                Token::Dot => {
                    if matches!(self.peek_at(1), Token::At(name) if !name.eq_ignore_ascii_case("links"))
                    {
                        break;
                    }
                    self.bump();
                    self.push_path_segment(&mut path)?;
                }
                Token::LBracket => {
                    self.bump();
                    self.push_index_segment(&mut path)?;
                }
                _ => break,
            }
        }
        Ok(path)
    }

    fn push_path_segment(&mut self, path: &mut Path) -> Result<()> {
        match self.bump() {
            Token::Ident(name) => path.push(PathElement::Column(name)).map_err(QueryError::from),
            Token::At(name) if name.eq_ignore_ascii_case("links") => path
                .push(PathElement::Column("@links".into()))
                .map_err(QueryError::from),
            other => Err(QueryError::SyntaxError {
                offset: self.offset(),
                message: format!("expected a path segment, found {other:?}"),
            }),
        }
    }

    fn push_index_segment(&mut self, path: &mut Path) -> Result<()> {
        let element = match self.bump() {
            Token::Star => PathElement::Wildcard,
            Token::First => PathElement::Index(ListIndex::First),
            Token::Last => PathElement::Index(ListIndex::Last),
            Token::Number(text) => {
                let i: i64 = text
                    .parse()
                    .map_err(|_| self.err(format!("invalid list index '{text}'")))?;
                PathElement::Index(ListIndex::At(i))
            }
            Token::Str(key) => PathElement::DictKey(key),
            other => {
                return Err(self.err(format!("expected an index inside '[...]', found {other:?}")))
            }
        };
        self.expect(Token::RBracket, "']'")?;
        path.push(element).map_err(QueryError::from)
    }

    // --- geo literals ----------------------------------------------------

    fn parse_geo_arg(&mut self) -> Result<GeoArg> {
        if let Token::Argument(n) = *self.peek() {
            self.bump();
            return Ok(GeoArg::Argument(n));
        }
        let geo = match self.bump() {
            Token::GeoBox => {
                self.expect(Token::LParen, "'('")?;
                let p1 = self.parse_geo_point()?;
                self.expect(Token::Comma, "','")?;
                let p2 = self.parse_geo_point()?;
                self.expect(Token::RParen, "')'")?;
                Geo::Box(p1, p2)
            }
            Token::GeoCircle => {
                self.expect(Token::LParen, "'('")?;
                let center = self.parse_geo_point()?;
                self.expect(Token::Comma, "','")?;
                let radius_radians = self.parse_signed_f64()?;
                self.expect(Token::RParen, "')'")?;
                Geo::Circle {
                    center,
                    radius_radians,
                }
            }
            Token::GeoPolygon => {
                self.expect(Token::LParen, "'('")?;
                let mut rings = vec![self.parse_geo_ring()?];
                while *self.peek() == Token::Comma {
                    self.bump();
                    rings.push(self.parse_geo_ring()?);
                }
                self.expect(Token::RParen, "')'")?;
                Geo::Polygon(rings)
            }
            other => {
                return Err(self.err(format!(
                    "expected geobox/geocircle/geopolygon after GEOWITHIN, found {other:?}"
                )))
            }
        };
        Ok(GeoArg::Literal(geo))
    }

    fn parse_geo_ring(&mut self) -> Result<Vec<GeoPoint>> {
        self.expect(Token::LBracket, "'['")?;
        let mut points = vec![self.parse_geo_point()?];
        while *self.peek() == Token::Comma {
            self.bump();
            points.push(self.parse_geo_point()?);
        }
        self.expect(Token::RBracket, "']'")?;
        Ok(points)
    }

    fn parse_geo_point(&mut self) -> Result<GeoPoint> {
        self.expect(Token::LBracket, "'['")?;
        let longitude = self.parse_signed_f64()?;
        self.expect(Token::Comma, "','")?;
        let latitude = self.parse_signed_f64()?;
        self.expect(Token::RBracket, "']'")?;
        Ok(GeoPoint { longitude, latitude })
    }

    fn parse_signed_f64(&mut self) -> Result<f64> {
        let negative = if *self.peek() == Token::Minus {
            self.bump();
            true
        } else {
            false
        };
        let text = match self.bump() {
            Token::Number(text) => text,
            other => return Err(self.err(format!("expected a number, found {other:?}"))),
        };
        let value: f64 = text
            .parse()
            .map_err(|_| self.err(format!("invalid numeric literal '{text}'")))?;
        Ok(if negative { -value } else { value })
    }

    // --- constants ---------------------------------------------------

    fn parse_constant_signed(&mut self) -> Result<ConstantLit> {
        if *self.peek() == Token::Minus {
            self.bump();
            let inner = self.parse_constant()?;
            return negate_constant(inner, self);
        }
        self.parse_constant()
    }

    fn parse_constant(&mut self) -> Result<ConstantLit> {
        match self.bump() {
            Token::Number(text) => Ok(parse_number_literal(&text)),
            Token::Nan => Ok(ConstantLit::Nan),
            Token::Infinity => Ok(ConstantLit::Infinity { negative: false }),
            Token::Str(s) => Ok(ConstantLit::Str(s)),
            Token::Binary(b64) => {
                let bytes = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &b64)
                    .map_err(|e| self.err(format!("invalid base64 in binary(...): {e}")))?;
                Ok(ConstantLit::Binary(bytes))
            }
            Token::DateLit(text) => Ok(ConstantLit::Timestamp(text)),
            Token::Uuid(text) => {
                let hex_only: String = text.chars().filter(|c| *c != '-').collect();
                let mut bytes = [0u8; 16];
                hex::decode_to_slice(&hex_only, &mut bytes)
                    .map_err(|e| self.err(format!("invalid UUID literal: {e}")))?;
                Ok(ConstantLit::Uuid(bytes))
            }
            Token::ObjectIdLit(text) => {
                let mut bytes = [0u8; 12];
                hex::decode_to_slice(&text, &mut bytes)
                    .map_err(|e| self.err(format!("invalid ObjectId literal: {e}")))?;
                Ok(ConstantLit::ObjectId(bytes))
            }
            Token::Null => Ok(ConstantLit::Null),
            Token::True => Ok(ConstantLit::True),
            Token::False => Ok(ConstantLit::False),
            Token::Argument(n) => Ok(ConstantLit::Argument(n)),
            other => Err(QueryError::SyntaxError {
                offset: self.offset(),
                message: format!("expected a constant literal, found {other:?}"),
            }),
        }
    }

    // --- descriptors ----------------------------------------------------

    fn parse_descriptors(&mut self) -> Result<Vec<Descriptor>> {
        let mut descriptors = Vec::new();
        loop {
            match self.peek() {
                Token::Sort => descriptors.push(self.parse_sort_descriptor()?),
                Token::Distinct => descriptors.push(self.parse_distinct_descriptor()?),
                Token::Limit => descriptors.push(self.parse_limit_descriptor()?),
                _ => break,
            }
        }
        Ok(descriptors)
    }

    fn parse_sort_descriptor(&mut self) -> Result<Descriptor> {
        self.expect(Token::Sort, "SORT")?;
        self.expect(Token::LParen, "'('")?;
        let mut terms = vec![self.parse_sort_term()?];
        while *self.peek() == Token::Comma {
            self.bump();
            terms.push(self.parse_sort_term()?);
        }
        self.expect(Token::RParen, "')'")?;
        Ok(Descriptor::Sort(terms))
    }

    fn parse_sort_term(&mut self) -> Result<(Path, bool)> {
        let path = self.parse_bare_path()?;
        let ascending = match self.peek() {
            Token::Asc => {
                self.bump();
                true
            }
            Token::Desc => {
                self.bump();
                false
            }
            _ => true,
        };
        Ok((path, ascending))
    }

    fn parse_distinct_descriptor(&mut self) -> Result<Descriptor> {
        self.expect(Token::Distinct, "DISTINCT")?;
        self.expect(Token::LParen, "'('")?;
        let mut paths = vec![self.parse_bare_path()?];
        while *self.peek() == Token::Comma {
            self.bump();
            paths.push(self.parse_bare_path()?);
        }
        self.expect(Token::RParen, "')'")?;
        Ok(Descriptor::Distinct(paths))
    }

    fn parse_limit_descriptor(&mut self) -> Result<Descriptor> {
        self.expect(Token::Limit, "LIMIT")?;
        self.expect(Token::LParen, "'('")?;
        let text = match self.bump() {
            Token::Number(text) => text,
            other => return Err(self.err(format!("expected a natural number, found {other:?}"))),
        };
        let n: u64 = text
            .parse()
            .map_err(|_| self.err(format!("invalid LIMIT value '{text}'")))?;
        self.expect(Token::RParen, "')'")?;
        Ok(Descriptor::Limit(n))
    }
}

fn last_column_name(path: &Path) -> Option<String> {
    path.elements().iter().rev().find_map(|e| match e {
        PathElement::Column(name) => Some(name.clone()),
        _ => None,
    })
}

fn compare_op_for(tok: &Token) -> Result<CompareOp> {
    Ok(match tok {
        Token::Eq => CompareOp::Equal,
        Token::Ne => CompareOp::NotEqual,
        Token::Gt => CompareOp::Greater,
        Token::Lt => CompareOp::Less,
        Token::Ge => CompareOp::GreaterEqual,
        Token::Le => CompareOp::LessEqual,
        Token::In => CompareOp::In,
        Token::BeginsWith => CompareOp::BeginsWith,
        Token::EndsWith => CompareOp::EndsWith,
        Token::Contains => CompareOp::Contains,
        Token::Like => CompareOp::Like,
        Token::FullText => CompareOp::FullText,
        other => {
            return Err(QueryError::SyntaxError {
                offset: 0,
                message: format!("not a comparison operator: {other:?}"),
            })
        }
    })
}

fn parse_number_literal(text: &str) -> ConstantLit {
    if text.contains('.') || text.contains('e') || text.contains('E') {
        ConstantLit::Float(text.parse().unwrap_or(f64::NAN))
    } else {
        match text.parse::<i64>() {
            Ok(i) => ConstantLit::Int(i),
            Err(_) => ConstantLit::Float(text.parse().unwrap_or(f64::NAN)),
        }
    }
}

fn negate_constant(c: ConstantLit, parser: &Parser) -> Result<ConstantLit> {
    match c {
        ConstantLit::Int(i) => Ok(ConstantLit::Int(-i)),
        ConstantLit::Float(f) => Ok(ConstantLit::Float(-f)),
        ConstantLit::Infinity { negative } => Ok(ConstantLit::Infinity { negative: !negative }),
        ConstantLit::Nan => Ok(ConstantLit::Nan),
        _ => Err(parser.err("cannot negate a non-numeric literal")),
    }
}

fn negate_value(v: Value, parser: &Parser) -> Result<Value> {
    match v {
        Value::Constant(c) => Ok(Value::Constant(negate_constant(c, parser)?)),
        _ => Err(parser.err("unary '-' requires a numeric constant")),
    }
}

fn fold_arith(lhs: Value, op: &Token, rhs: Value, parser: &Parser) -> Result<Value> {
    let (Value::Constant(l), Value::Constant(r)) = (&lhs, &rhs) else {
        return Err(parser.err("arithmetic operators require constant operands"));
    };
    let (a, b) = (numeric_of(l, parser)?, numeric_of(r, parser)?);
    let result = match op {
        Token::Plus => a + b,
        Token::Minus => a - b,
        Token::Star => a * b,
        Token::Slash => a / b,
        _ => unreachable!("fold_arith called with non-arithmetic token"),
    };
    let both_int = matches!(l, ConstantLit::Int(_)) && matches!(r, ConstantLit::Int(_));
    Ok(Value::Constant(if both_int && *op != Token::Slash {
        ConstantLit::Int(result as i64)
    } else {
        ConstantLit::Float(result)
    }))
}

fn numeric_of(c: &ConstantLit, parser: &Parser) -> Result<f64> {
    match c {
        ConstantLit::Int(i) => Ok(*i as f64),
        ConstantLit::Float(f) => Ok(*f),
        ConstantLit::Nan => Ok(f64::NAN),
        ConstantLit::Infinity { negative } => {
            Ok(if *negative { f64::NEG_INFINITY } else { f64::INFINITY })
        }
        _ => Err(parser.err("expected a numeric operand")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scenario_five_from_the_acceptance_suite() {
        let parsed =
            parse(r#"age > $0 && ANY dogs.breed == "poodle" SORT(name ASC) LIMIT(10)"#).unwrap();

        let Query::And(terms) = parsed.predicate else {
            panic!("expected AND");
        };
        assert_eq!(terms.len(), 2);

        let Query::Compare { left, .. } = &terms[1] else {
            panic!("expected Compare");
        };
        let Value::Property(p) = left.as_ref() else {
            panic!("expected Property");
        };
        assert_eq!(p.quantifier, Some(Quantifier::Any));
        assert_eq!(p.path.to_string(), "dogs.breed");

        assert_eq!(parsed.descriptors.len(), 2);
        assert!(matches!(parsed.descriptors[0], Descriptor::Sort(_)));
        assert!(matches!(parsed.descriptors[1], Descriptor::Limit(10)));
    }

    #[test]
    fn parses_between() {
        let parsed = parse("age BETWEEN {18, 65}").unwrap();
        assert!(matches!(parsed.predicate, Query::Between { .. }));
    }

    #[test]
    fn parses_not_and_parens() {
        let parsed = parse("!(a == 1 || b == 2)").unwrap();
        assert!(matches!(parsed.predicate, Query::Not(_)));
    }

    #[test]
    fn parses_case_insensitive_equality() {
        let parsed = parse(r#"name ==[c] "bob""#).unwrap();
        let Query::Compare { case_insensitive, .. } = parsed.predicate else {
            panic!("expected Compare");
        };
        assert!(case_insensitive);
    }

    #[test]
    fn folds_constant_arithmetic() {
        let parsed = parse("age > 2 + 3").unwrap();
        let Query::Compare { right, .. } = parsed.predicate else {
            panic!("expected Compare");
        };
        assert_eq!(*right, Value::Constant(ConstantLit::Int(5)));
    }

    #[test]
    fn rejects_missing_comparison_operator() {
        assert!(parse("age 5").is_err());
    }

    #[test]
    fn parses_geowithin_box() {
        let parsed = parse("location GEOWITHIN geobox([-1,-1],[1,1])").unwrap();
        assert!(matches!(parsed.predicate, Query::GeoWithin { .. }));
    }
}
