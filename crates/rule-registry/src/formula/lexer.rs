//! 公式词法分析

use crate::error::{Result, RuleError};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // 字面量
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    True,
    False,
    Null,

    // 关键字
    And,
    Or,
    Not,
    In,
    Contains,
    StartsWith,
    EndsWith,
    Matches,

    // 符号
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,

    Eof,
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("标识符 '{}'", name),
            TokenKind::Int(n) => format!("整数 {}", n),
            TokenKind::Float(n) => format!("数字 {}", n),
            TokenKind::Str(s) => format!("字符串 \"{}\"", s),
            TokenKind::True => "'true'".to_string(),
            TokenKind::False => "'false'".to_string(),
            TokenKind::Null => "'null'".to_string(),
            TokenKind::And => "'&&'".to_string(),
            TokenKind::Or => "'||'".to_string(),
            TokenKind::Not => "'not'".to_string(),
            TokenKind::In => "'in'".to_string(),
            TokenKind::Contains => "'contains'".to_string(),
            TokenKind::StartsWith => "'starts_with'".to_string(),
            TokenKind::EndsWith => "'ends_with'".to_string(),
            TokenKind::Matches => "'matches'".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::LBracket => "'['".to_string(),
            TokenKind::RBracket => "']'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Dot => "'.'".to_string(),
            TokenKind::EqEq => "'=='".to_string(),
            TokenKind::NotEq => "'!='".to_string(),
            TokenKind::Lt => "'<'".to_string(),
            TokenKind::LtEq => "'<='".to_string(),
            TokenKind::Gt => "'>'".to_string(),
            TokenKind::GtEq => "'>='".to_string(),
            TokenKind::Plus => "'+'".to_string(),
            TokenKind::Minus => "'-'".to_string(),
            TokenKind::Star => "'*'".to_string(),
            TokenKind::Slash => "'/'".to_string(),
            TokenKind::Percent => "'%'".to_string(),
            TokenKind::Bang => "'!'".to_string(),
            TokenKind::Eof => "公式结尾".to_string(),
        }
    }
}

/// 带字节偏移的 token
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    len: usize,
    /// 上一个 token 是否为 '.'，用于把 `items.0.name` 中的 0 识别为索引而不是小数
    after_dot: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            len: input.len(),
            after_dot: false,
        }
    }

    /// 将输入全部切分为 token，末尾总是 Eof
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            self.after_dot = token.kind == TokenKind::Dot;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.chars.next();
        }

        let Some((start, c)) = self.chars.next() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                position: self.len,
            });
        };

        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '=' => {
                // `=` 与 `==` 等价
                self.eat('=');
                TokenKind::EqEq
            }
            '!' => {
                if self.eat('=') {
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                }
            }
            '<' => {
                if self.eat('=') {
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            '&' => {
                if self.eat('&') {
                    TokenKind::And
                } else {
                    return Err(RuleError::parse(start, "意外的字符 '&'，是否应为 '&&'"));
                }
            }
            '|' => {
                if self.eat('|') {
                    TokenKind::Or
                } else {
                    return Err(RuleError::parse(start, "意外的字符 '|'，是否应为 '||'"));
                }
            }
            '"' | '\'' => self.scan_string(c, start)?,
            '_' | 'a'..='z' | 'A'..='Z' => self.scan_ident_or_keyword(c),
            '0'..='9' => self.scan_number(c, start)?,
            other => {
                return Err(RuleError::parse(start, format!("意外的字符 '{}'", other)));
            }
        };

        Ok(Token {
            kind,
            position: start,
        })
    }

    fn scan_string(&mut self, quote: char, start: usize) -> Result<TokenKind> {
        let mut value = String::new();
        loop {
            match self.chars.next() {
                None => return Err(RuleError::parse(start, "未闭合的字符串")),
                Some((_, c)) if c == quote => break,
                Some((pos, '\\')) => match self.chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, c @ ('\\' | '"' | '\''))) => value.push(c),
                    Some((_, other)) => {
                        return Err(RuleError::parse(pos, format!("无效的转义序列 '\\{}'", other)));
                    }
                    None => return Err(RuleError::parse(start, "未闭合的字符串")),
                },
                Some((_, c)) => value.push(c),
            }
        }
        Ok(TokenKind::Str(value))
    }

    fn scan_ident_or_keyword(&mut self, first: char) -> TokenKind {
        let mut ident = String::from(first);
        while let Some(c) = self.peek_char() {
            if c == '_' || c.is_ascii_alphanumeric() {
                ident.push(c);
                self.chars.next();
            } else {
                break;
            }
        }

        match ident.as_str() {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "in" => TokenKind::In,
            "contains" => TokenKind::Contains,
            "starts_with" => TokenKind::StartsWith,
            "ends_with" => TokenKind::EndsWith,
            "matches" => TokenKind::Matches,
            _ => TokenKind::Ident(ident),
        }
    }

    fn scan_number(&mut self, first: char, start: usize) -> Result<TokenKind> {
        let mut text = String::from(first);
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }

        // 小数点后必须紧跟数字，否则留给 '.' 作为路径分隔符
        let mut is_float = false;
        if !self.after_dot && self.peek_char() == Some('.') {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if lookahead.peek().is_some_and(|(_, c)| c.is_ascii_digit()) {
                self.chars.next();
                text.push('.');
                is_float = true;
                while let Some(c) = self.peek_char() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        self.chars.next();
                    } else {
                        break;
                    }
                }
            }
        }

        if is_float {
            text.parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|e| RuleError::parse(start, format!("无效的数字 '{}': {}", text, e)))
        } else {
            text.parse::<i64>()
                .map(TokenKind::Int)
                .map_err(|e| RuleError::parse(start, format!("无效的整数 '{}': {}", text, e)))
        }
    }
}
