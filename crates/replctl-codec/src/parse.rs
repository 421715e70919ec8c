use crate::error::{DecodeError, Result};
use crate::value::Value;

/// Parse one literal expression, ignoring surrounding whitespace.
///
/// Accepts the literal subset only: numbers (decimal, hex/octal/binary,
/// floats, an optional sign), strings, bytes, `True`/`False`/`None`, and
/// containers of those. Identifiers and operators are rejected, so device
/// output can never smuggle evaluation into the host.
pub fn parse(text: &str) -> Result<Value> {
    let mut parser = Parser { text, pos: 0 };
    parser.skip_ws();
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos != text.len() {
        return Err(parser.fail("trailing characters after literal"));
    }
    Ok(value)
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn value(&mut self) -> Result<Value> {
        self.skip_ws();
        match self.peek() {
            None => Err(self.fail("unexpected end of input")),
            Some('(') => self.tuple(),
            Some('[') => self.list(),
            Some('{') => self.dict_or_set(),
            Some('\'') | Some('"') => Ok(Value::Str(self.string()?)),
            Some('b') if matches!(self.peek_at(1), Some('\'') | Some('"')) => {
                self.bump();
                Ok(Value::Bytes(self.bytes_string()?))
            }
            Some('T') | Some('F') | Some('N') | Some('s') => self.keyword(),
            Some(c) if c == '+' || c == '-' || c == '.' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => {
                Err(self.fail("identifiers are not evaluated here"))
            }
            Some(c) => Err(self.fail(format!("unexpected character {c:?}"))),
        }
    }

    fn keyword(&mut self) -> Result<Value> {
        if self.eat_str("True") {
            Ok(Value::Bool(true))
        } else if self.eat_str("False") {
            Ok(Value::Bool(false))
        } else if self.eat_str("None") {
            Ok(Value::None)
        } else if self.eat_str("set()") {
            // repr() spells the empty set as a call; special-cased as the
            // one non-bracket container spelling.
            Ok(Value::Set(Vec::new()))
        } else {
            Err(self.fail("identifiers are not evaluated here"))
        }
    }

    fn tuple(&mut self) -> Result<Value> {
        self.expect('(')?;
        self.skip_ws();
        if self.eat(')') {
            return Ok(Value::Tuple(Vec::new()));
        }
        let mut items = Vec::new();
        let mut saw_comma = false;
        loop {
            items.push(self.value()?);
            self.skip_ws();
            if self.eat(',') {
                saw_comma = true;
                self.skip_ws();
                if self.eat(')') {
                    break;
                }
                continue;
            }
            self.expect(')')?;
            break;
        }
        // A single parenthesized value without a comma is not a tuple.
        if !saw_comma && items.len() == 1 {
            return Ok(items.swap_remove(0));
        }
        Ok(Value::Tuple(items))
    }

    fn list(&mut self) -> Result<Value> {
        self.expect('[')?;
        self.skip_ws();
        if self.eat(']') {
            return Ok(Value::List(Vec::new()));
        }
        let mut items = Vec::new();
        loop {
            items.push(self.value()?);
            self.skip_ws();
            if self.eat(',') {
                self.skip_ws();
                if self.eat(']') {
                    break;
                }
                continue;
            }
            self.expect(']')?;
            break;
        }
        Ok(Value::List(items))
    }

    fn dict_or_set(&mut self) -> Result<Value> {
        self.expect('{')?;
        self.skip_ws();
        if self.eat('}') {
            return Ok(Value::Dict(Vec::new()));
        }
        let first = self.value()?;
        self.skip_ws();
        if self.eat(':') {
            let first_val = self.value()?;
            let mut pairs = vec![(first, first_val)];
            loop {
                self.skip_ws();
                if self.eat(',') {
                    self.skip_ws();
                    if self.eat('}') {
                        break;
                    }
                    let key = self.value()?;
                    self.skip_ws();
                    self.expect(':')?;
                    let val = self.value()?;
                    pairs.push((key, val));
                    continue;
                }
                self.expect('}')?;
                break;
            }
            Ok(Value::Dict(pairs))
        } else {
            let mut items = vec![first];
            loop {
                self.skip_ws();
                if self.eat(',') {
                    self.skip_ws();
                    if self.eat('}') {
                        break;
                    }
                    items.push(self.value()?);
                    continue;
                }
                self.expect('}')?;
                break;
            }
            Ok(Value::Set(items))
        }
    }

    fn number(&mut self) -> Result<Value> {
        let start = self.pos;
        let negative = match self.peek() {
            Some('-') => {
                self.bump();
                true
            }
            Some('+') => {
                self.bump();
                false
            }
            _ => false,
        };

        if self.eat_str("0x") || self.eat_str("0X") {
            return self.radix_int(negative, 16);
        }
        if self.eat_str("0o") || self.eat_str("0O") {
            return self.radix_int(negative, 8);
        }
        if self.eat_str("0b") || self.eat_str("0B") {
            return self.radix_int(negative, 2);
        }

        let mut digits = 0usize;
        let mut is_float = false;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            digits += 1;
        }
        if self.peek() == Some('.') {
            is_float = true;
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
                digits += 1;
            }
        }
        if digits == 0 {
            return Err(self.fail("expected a number"));
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            is_float = true;
            self.bump();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.bump();
            }
            let exp_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
            if self.pos == exp_start {
                return Err(self.fail("expected exponent digits"));
            }
        }

        let slice = &self.text[start..self.pos];
        if is_float {
            let parsed = slice
                .parse::<f64>()
                .map_err(|_| self.fail("invalid float literal"))?;
            return Ok(Value::Float(parsed));
        }
        match slice.parse::<i64>() {
            Ok(v) => Ok(Value::Int(v)),
            // The device's integers are unbounded; degrade to float rather
            // than refusing the response.
            Err(_) => slice
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| self.fail("integer literal out of range")),
        }
    }

    fn radix_int(&mut self, negative: bool, radix: u32) -> Result<Value> {
        let digits_start = self.pos;
        while self.peek().is_some_and(|c| c.is_digit(radix)) {
            self.bump();
        }
        if self.pos == digits_start {
            return Err(self.fail("expected digits after radix prefix"));
        }
        let digits = &self.text[digits_start..self.pos];
        let magnitude = i64::from_str_radix(digits, radix)
            .map_err(|_| self.fail("integer literal out of range"))?;
        Ok(Value::Int(if negative { -magnitude } else { magnitude }))
    }

    fn string(&mut self) -> Result<String> {
        let quote = match self.peek() {
            Some(q) => q,
            None => return Err(self.fail("expected a string")),
        };
        self.bump();
        let mut out = String::new();
        loop {
            let c = match self.peek() {
                Some(c) => c,
                None => return Err(self.fail("unterminated string")),
            };
            self.bump();
            if c == quote {
                return Ok(out);
            }
            if c == '\\' {
                out.push(self.escape()?);
            } else {
                out.push(c);
            }
        }
    }

    fn bytes_string(&mut self) -> Result<Vec<u8>> {
        let quote = match self.peek() {
            Some(q) => q,
            None => return Err(self.fail("expected a bytes literal")),
        };
        self.bump();
        let mut out = Vec::new();
        loop {
            let c = match self.peek() {
                Some(c) => c,
                None => return Err(self.fail("unterminated bytes literal")),
            };
            self.bump();
            if c == quote {
                return Ok(out);
            }
            if c == '\\' {
                out.push(self.byte_escape()?);
            } else if c.is_ascii() {
                out.push(c as u8);
            } else {
                return Err(self.fail("non-ASCII character in bytes literal"));
            }
        }
    }

    fn escape(&mut self) -> Result<char> {
        let c = match self.peek() {
            Some(c) => c,
            None => return Err(self.fail("unterminated escape")),
        };
        self.bump();
        let resolved = match c {
            '\\' => '\\',
            '\'' => '\'',
            '"' => '"',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            '0' => '\0',
            'a' => '\x07',
            'b' => '\x08',
            'f' => '\x0c',
            'v' => '\x0b',
            'x' => {
                let code = self.hex_digits(2)?;
                match char::from_u32(code) {
                    Some(c) => c,
                    None => return Err(self.fail("invalid \\x escape")),
                }
            }
            'u' => {
                let code = self.hex_digits(4)?;
                match char::from_u32(code) {
                    Some(c) => c,
                    None => return Err(self.fail("invalid \\u escape")),
                }
            }
            'U' => {
                let code = self.hex_digits(8)?;
                match char::from_u32(code) {
                    Some(c) => c,
                    None => return Err(self.fail("invalid \\U escape")),
                }
            }
            other => return Err(self.fail(format!("unsupported escape \\{other}"))),
        };
        Ok(resolved)
    }

    fn byte_escape(&mut self) -> Result<u8> {
        let c = match self.peek() {
            Some(c) => c,
            None => return Err(self.fail("unterminated escape")),
        };
        self.bump();
        let resolved = match c {
            '\\' => b'\\',
            '\'' => b'\'',
            '"' => b'"',
            'n' => b'\n',
            'r' => b'\r',
            't' => b'\t',
            '0' => 0,
            'a' => 0x07,
            'b' => 0x08,
            'f' => 0x0c,
            'v' => 0x0b,
            'x' => {
                let code = self.hex_digits(2)?;
                code as u8
            }
            other => return Err(self.fail(format!("unsupported escape \\{other} in bytes"))),
        };
        Ok(resolved)
    }

    fn hex_digits(&mut self, count: usize) -> Result<u32> {
        let mut code = 0u32;
        for _ in 0..count {
            let c = match self.peek() {
                Some(c) if c.is_ascii_hexdigit() => c,
                _ => return Err(self.fail("expected hex digits in escape")),
            };
            self.bump();
            code = code * 16 + c.to_digit(16).unwrap_or(0);
        }
        Ok(code)
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.text[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, expected: &str) -> bool {
        if self.text[self.pos..].starts_with(expected) {
            self.pos += expected.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.fail(format!("expected {expected:?}")))
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(' ') | Some('\t') | Some('\r') | Some('\n')) {
            self.bump();
        }
    }

    fn fail(&self, message: impl Into<String>) -> DecodeError {
        DecodeError {
            text: self.text.to_string(),
            offset: self.pos,
            message: message.into(),
        }
    }
}
