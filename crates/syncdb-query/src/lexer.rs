//! Tokenizer for the query surface syntax (spec §4.6.1).
//!
//! Grounded on the token set implied by realm-core's `query_bison.cpp`
//! grammar, but hand-written rather than generated: the original's
//! scanner is a Flex/Bison lexer; this is a plain character-at-a-time
//! scanner since no lexer-generator crate is used anywhere in the
//! example pack.

use crate::error::QueryError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    /// Raw numeric lexeme (sign is handled by the parser as unary minus).
    Number(String),
    Str(String),
    Binary(String),
    DateLit(String),
    Uuid(String),
    ObjectIdLit(String),
    Argument(usize),
    /// `.@size`, `.@type`, `.@count`, `.@max`, `.@min`, `.@sum`, `.@avg`,
    /// `.@keys`, `.@values`, `@links`.
    At(String),
    True,
    False,
    Null,
    Nan,
    Infinity,
    TruePredicate,
    FalsePredicate,
    And,
    Or,
    Not,
    In,
    Between,
    GeoWithin,
    GeoBox,
    GeoCircle,
    GeoPolygon,
    BeginsWith,
    EndsWith,
    Contains,
    Like,
    FullText,
    Any,
    All,
    None_,
    Subquery,
    Sort,
    Distinct,
    Limit,
    Asc,
    Desc,
    First,
    Last,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Bang,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Dot,
    Comma,
    CaseInsensitive,
    Eof,
}

pub struct Lexer<'a> {
    src: &'a str,
    chars: std::str::CharIndices<'a>,
    peeked: Option<(usize, char)>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        let mut chars = src.char_indices();
        let peeked = chars.next();
        Lexer { src, chars, peeked }
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let cur = self.peeked;
        self.peeked = self.chars.next();
        cur
    }

    fn peek_char(&self) -> Option<char> {
        self.peeked.map(|(_, c)| c)
    }

    fn pos(&self) -> usize {
        self.peeked.map(|(i, _)| i).unwrap_or(self.src.len())
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek_char(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn err(&self, offset: usize, message: impl Into<String>) -> QueryError {
        QueryError::SyntaxError {
            offset,
            message: message.into(),
        }
    }

    /// Tokenizes the whole input, always ending with [`Token::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<(Token, usize)>, QueryError> {
        let mut out = Vec::new();
        loop {
            self.skip_whitespace();
            let offset = self.pos();
            let Some((_, c)) = self.peeked else {
                out.push((Token::Eof, offset));
                return Ok(out);
            };
            let token = match c {
                '(' => self.single(Token::LParen),
                ')' => self.single(Token::RParen),
                '[' => self.lex_bracket()?,
                ']' => self.single(Token::RBracket),
                '{' => self.single(Token::LBrace),
                '}' => self.single(Token::RBrace),
                '.' => self.lex_dot()?,
                ',' => self.single(Token::Comma),
                '+' => self.single(Token::Plus),
                '-' => self.single(Token::Minus),
                '*' => self.single(Token::Star),
                '/' => self.single(Token::Slash),
                '!' => self.lex_bang(),
                '=' => self.lex_eq()?,
                '<' => self.lex_lt(),
                '>' => self.lex_gt(),
                '"' => self.lex_string()?,
                '$' => self.lex_argument()?,
                '@' => self.lex_at()?,
                _ if c.is_ascii_digit() => self.lex_number(),
                _ if c == '_' || c.is_alphabetic() => self.lex_ident_or_keyword(),
                _ => return Err(self.err(offset, format!("unexpected character '{c}'"))),
            };
            out.push((token, offset));
        }
    }

    fn single(&mut self, token: Token) -> Token {
        self.bump();
        token
    }

    fn lex_bracket(&mut self) -> Result<Token, QueryError> {
        self.bump();
        if self.peek_char() == Some('c') {
            let save = self.chars.clone();
            let saved_peek = self.peeked;
            self.bump();
            if self.peek_char() == Some(']') {
                self.bump();
                return Ok(Token::CaseInsensitive);
            }
            self.chars = save;
            self.peeked = saved_peek;
        }
        Ok(Token::LBracket)
    }

    fn lex_dot(&mut self) -> Result<Token, QueryError> {
        self.bump();
        if self.peek_char() == Some('@') {
            return self.lex_at();
        }
        Ok(Token::Dot)
    }

    fn lex_at(&mut self) -> Result<Token, QueryError> {
        let offset = self.pos();
        self.bump();
        let mut name = String::new();
        while matches!(self.peek_char(), Some(c) if c.is_alphanumeric()) {
            name.push(self.bump().unwrap().1);
        }
        if name.is_empty() {
            return Err(self.err(offset, "expected post-operator name after '@'"));
        }
        Ok(Token::At(name))
    }

    fn lex_bang(&mut self) -> Token {
        self.bump();
        Token::Bang
    }

    fn lex_eq(&mut self) -> Result<Token, QueryError> {
        let offset = self.pos();
        self.bump();
        if self.peek_char() == Some('=') {
            self.bump();
            Ok(Token::Eq)
        } else {
            Err(self.err(offset, "expected '==', found single '='"))
        }
    }

    fn lex_lt(&mut self) -> Token {
        self.bump();
        if self.peek_char() == Some('=') {
            self.bump();
            Token::Le
        } else {
            Token::Lt
        }
    }

    fn lex_gt(&mut self) -> Token {
        self.bump();
        if self.peek_char() == Some('=') {
            self.bump();
            Token::Ge
        } else {
            Token::Gt
        }
    }

    fn lex_argument(&mut self) -> Result<Token, QueryError> {
        let offset = self.pos();
        self.bump();
        let mut digits = String::new();
        while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
            digits.push(self.bump().unwrap().1);
        }
        if digits.is_empty() {
            return Err(self.err(offset, "expected digits after '$'"));
        }
        let n: usize = digits
            .parse()
            .map_err(|_| self.err(offset, "argument index out of range"))?;
        Ok(Token::Argument(n))
    }

    fn lex_string(&mut self) -> Result<Token, QueryError> {
        let offset = self.pos();
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.err(offset, "unterminated string literal")),
                Some((_, '"')) => break,
                Some((_, '\\')) => match self.bump() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, '\\')) => out.push('\\'),
                    Some((_, '"')) => out.push('"'),
                    Some((_, '\'')) => out.push('\''),
                    Some((_, 'u')) => out.push(self.lex_unicode_escape(offset)?),
                    Some((i, other)) => return Err(self.err(i, format!("unknown escape '\\{other}'"))),
                    None => return Err(self.err(offset, "unterminated escape sequence")),
                },
                Some((_, c)) => out.push(c),
            }
        }
        Ok(Token::Str(out))
    }

    fn lex_unicode_escape(&mut self, offset: usize) -> Result<char, QueryError> {
        let mut hex = String::new();
        for _ in 0..4 {
            match self.bump() {
                Some((_, c)) if c.is_ascii_hexdigit() => hex.push(c),
                _ => return Err(self.err(offset, "invalid \\u escape")),
            }
        }
        let code = u32::from_str_radix(&hex, 16).map_err(|_| self.err(offset, "invalid \\u escape"))?;
        char::from_u32(code).ok_or_else(|| self.err(offset, "invalid unicode scalar in \\u escape"))
    }

    fn lex_number(&mut self) -> Token {
        let mut text = String::new();
        while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
            text.push(self.bump().unwrap().1);
        }
        if self.peek_char() == Some('.') {
            text.push(self.bump().unwrap().1);
            while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                text.push(self.bump().unwrap().1);
            }
        }
        if matches!(self.peek_char(), Some('e') | Some('E')) {
            let save = self.chars.clone();
            let saved_peek = self.peeked;
            let mut exp = String::new();
            exp.push(self.bump().unwrap().1);
            if matches!(self.peek_char(), Some('+') | Some('-')) {
                exp.push(self.bump().unwrap().1);
            }
            if matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                    exp.push(self.bump().unwrap().1);
                }
                text.push_str(&exp);
            } else {
                self.chars = save;
                self.peeked = saved_peek;
            }
        }
        Token::Number(text)
    }

    fn lex_ident_or_keyword(&mut self) -> Token {
        let mut ident = String::new();
        while matches!(self.peek_char(), Some(c) if c.is_alphanumeric() || c == '_') {
            ident.push(self.bump().unwrap().1);
        }

        // `binary('...')`, `date('...')` take a quoted-argument payload.
        if (ident.eq_ignore_ascii_case("binary") || ident.eq_ignore_ascii_case("date"))
            && self.peek_char() == Some('(')
        {
            if let Some(payload) = self.lex_paren_quoted() {
                return if ident.eq_ignore_ascii_case("binary") {
                    Token::Binary(payload)
                } else {
                    Token::DateLit(payload)
                };
            }
        }

        match ident.to_ascii_uppercase().as_str() {
            "TRUE" => Token::True,
            "FALSE" => Token::False,
            "NULL" => Token::Null,
            "NAN" => Token::Nan,
            "INFINITY" => Token::Infinity,
            "TRUEPREDICATE" => Token::TruePredicate,
            "FALSEPREDICATE" => Token::FalsePredicate,
            "AND" => Token::And,
            "OR" => Token::Or,
            "NOT" => Token::Not,
            "IN" => Token::In,
            "BETWEEN" => Token::Between,
            "GEOWITHIN" => Token::GeoWithin,
            "GEOBOX" => Token::GeoBox,
            "GEOCIRCLE" => Token::GeoCircle,
            "GEOPOLYGON" => Token::GeoPolygon,
            "BEGINSWITH" => Token::BeginsWith,
            "ENDSWITH" => Token::EndsWith,
            "CONTAINS" => Token::Contains,
            "LIKE" => Token::Like,
            "FULLTEXT" => Token::FullText,
            "ANY" | "SOME" => Token::Any,
            "ALL" => Token::All,
            "NONE" => Token::None_,
            "SUBQUERY" => Token::Subquery,
            "SORT" => Token::Sort,
            "DISTINCT" => Token::Distinct,
            "LIMIT" => Token::Limit,
            "ASC" => Token::Asc,
            "DESC" => Token::Desc,
            "FIRST" => Token::First,
            "LAST" => Token::Last,
            _ => self.lex_identifier_like(ident),
        }
    }

    /// Looks like a UUID or ObjectId literal (bare hex with/without
    /// dashes); otherwise a plain identifier.
    fn lex_identifier_like(&self, ident: String) -> Token {
        let hex_only: String = ident.chars().filter(|c| *c != '-').collect();
        if hex_only.len() == 32 && hex_only.chars().all(|c| c.is_ascii_hexdigit()) {
            Token::Uuid(ident)
        } else if hex_only.len() == 24 && hex_only.chars().all(|c| c.is_ascii_hexdigit()) {
            Token::ObjectIdLit(ident)
        } else {
            Token::Ident(ident)
        }
    }

    fn lex_paren_quoted(&mut self) -> Option<String> {
        let save = self.chars.clone();
        let saved_peek = self.peeked;
        self.bump(); // '('
        self.skip_whitespace();
        if self.peek_char() != Some('\'') {
            self.chars = save;
            self.peeked = saved_peek;
            return None;
        }
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some((_, '\'')) => break,
                Some((_, c)) => out.push(c),
                None => {
                    self.chars = save;
                    self.peeked = saved_peek;
                    return None;
                }
            }
        }
        self.skip_whitespace();
        if self.peek_char() != Some(')') {
            self.chars = save;
            self.peeked = saved_peek;
            return None;
        }
        self.bump();
        Some(out)
    }
}
