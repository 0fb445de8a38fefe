//! Restricted arithmetic evaluator for the `calculate` tool
//!
//! Supports:
//! - Numeric literals: `2`, `2.5`, `.5`, `1e3`, `1.5E-2`
//! - Operators: `+`, `-`, `*`, `/`, `//` (floor division), `%`, `**` / `^`
//! - Parentheses and unary `+` / `-`
//! - A fixed table of constants (`pi`, `e`, `tau`, `inf`, `nan`) and
//!   math functions (`sqrt`, `sin`, `log`, `min`, ...)
//!
//! Nothing else is accepted. There are no strings, attributes, subscripts or
//! variables, so an input can only ever name the entries in the tables below.

use crate::error::EvalError;

/// Maximum nesting of parentheses, calls and unary operators
const MAX_DEPTH: usize = 64;

/// Largest argument accepted by `factorial` before the result overflows f64
const MAX_FACTORIAL: f64 = 170.0;

/// Evaluate an arithmetic expression.
///
/// # Example
/// ```
/// use simple_mcp::tools::calc::evaluate;
/// assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
/// ```
pub fn evaluate(input: &str) -> Result<f64, EvalError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser::new(&tokens, input.len());
    let ast = parser.parse_expr()?;
    parser.expect_end()?;
    ast.eval()
}

/// Format an evaluation result for display.
///
/// Integral values drop the fractional part, very large or very small values
/// use exponent notation.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let magnitude = value.abs();
    if !(1e-4..1e16).contains(&magnitude) {
        format!("{:e}", value)
    } else {
        value.to_string()
    }
}

// ==================== Lexer ====================

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,
    Caret,
    LParen,
    RParen,
    Comma,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    pos: usize,
}

fn syntax(position: usize, message: impl Into<String>) -> EvalError {
    EvalError::Syntax {
        position,
        message: message.into(),
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        let starts_number = ch.is_ascii_digit()
            || (ch == '.' && input[pos + 1..].starts_with(|c: char| c.is_ascii_digit()));

        if starts_number {
            let end = scan_number(input, pos)?;
            let text = &input[pos..end];
            let value = text
                .parse::<f64>()
                .map_err(|_| syntax(pos, format!("malformed number '{}'", text)))?;
            tokens.push(Token {
                kind: TokenKind::Number(value),
                pos,
            });
            while chars.peek().is_some_and(|&(i, _)| i < end) {
                chars.next();
            }
            continue;
        }

        if ch.is_alphabetic() || ch == '_' {
            let mut end = pos;
            while let Some(&(i, c)) = chars.peek() {
                if c.is_alphanumeric() || c == '_' {
                    end = i + c.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token {
                kind: TokenKind::Ident(input[pos..end].to_string()),
                pos,
            });
            continue;
        }

        chars.next();
        let kind = match ch {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => {
                if chars.peek().is_some_and(|&(_, c)| c == '*') {
                    chars.next();
                    TokenKind::StarStar
                } else {
                    TokenKind::Star
                }
            }
            '/' => {
                if chars.peek().is_some_and(|&(_, c)| c == '/') {
                    chars.next();
                    TokenKind::SlashSlash
                } else {
                    TokenKind::Slash
                }
            }
            '%' => TokenKind::Percent,
            '^' => TokenKind::Caret,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            other => return Err(syntax(pos, format!("unexpected character {:?}", other))),
        };
        tokens.push(Token { kind, pos });
    }

    Ok(tokens)
}

/// Return the end offset of the numeric literal starting at `start`
fn scan_number(input: &str, start: usize) -> Result<usize, EvalError> {
    let bytes = input.as_bytes();
    let mut i = start;

    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        if j >= bytes.len() || !bytes[j].is_ascii_digit() {
            return Err(syntax(i, "malformed exponent"));
        }
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        i = j;
    }

    Ok(i)
}

// ==================== Parser ====================

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// Left-associative run `first op1 x1 op2 x2 ...`, kept flat so long
    /// chains do not nest
    Chain(Box<Expr>, Vec<(BinaryOp, Expr)>),
    Call(&'static Function, Vec<Expr>),
}

/// Recursive descent parser producing an [`Expr`] tree.
///
/// Precedence, lowest first: `+ -`, `* / // %`, unary `+ -`, `** ^`.
/// Power is right-associative and binds tighter than a unary minus on its
/// left, so `-2 ** 2` is `-4`.
struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    input_len: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token], input_len: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            input_len,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn current_pos(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|t| t.pos)
            .unwrap_or(self.input_len)
    }

    fn enter(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvalError::TooDeep);
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn expect_end(&self) -> Result<(), EvalError> {
        match self.tokens.get(self.pos) {
            None => Ok(()),
            Some(token) => Err(syntax(token.pos, "unexpected token after expression")),
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<(), EvalError> {
        match self.peek() {
            Some(k) if *k == kind => {
                self.advance();
                Ok(())
            }
            Some(_) => Err(syntax(self.current_pos(), format!("expected {}", what))),
            None => Err(EvalError::UnexpectedEnd),
        }
    }

    /// expr := term (('+' | '-') term)*
    fn parse_expr(&mut self) -> Result<Expr, EvalError> {
        self.enter()?;
        let first = self.parse_term()?;
        let mut rest = Vec::new();

        loop {
            let op = match self.peek() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            rest.push((op, self.parse_term()?));
        }

        self.leave();
        Ok(chain(first, rest))
    }

    /// term := unary (('*' | '/' | '//' | '%') unary)*
    fn parse_term(&mut self) -> Result<Expr, EvalError> {
        let first = self.parse_unary()?;
        let mut rest = Vec::new();

        loop {
            let op = match self.peek() {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                Some(TokenKind::SlashSlash) => BinaryOp::FloorDiv,
                Some(TokenKind::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            rest.push((op, self.parse_unary()?));
        }

        Ok(chain(first, rest))
    }

    /// unary := ('+' | '-') unary | power
    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        match self.peek() {
            Some(TokenKind::Plus) => {
                self.advance();
                self.enter()?;
                let operand = self.parse_unary()?;
                self.leave();
                Ok(operand)
            }
            Some(TokenKind::Minus) => {
                self.advance();
                self.enter()?;
                let operand = self.parse_unary()?;
                self.leave();
                Ok(Expr::Neg(Box::new(operand)))
            }
            _ => self.parse_power(),
        }
    }

    /// power := primary (('**' | '^') unary)?
    fn parse_power(&mut self) -> Result<Expr, EvalError> {
        let base = self.parse_primary()?;

        match self.peek() {
            Some(TokenKind::StarStar) | Some(TokenKind::Caret) => {
                self.advance();
                self.enter()?;
                let exponent = self.parse_unary()?;
                self.leave();
                Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)))
            }
            _ => Ok(base),
        }
    }

    /// primary := NUMBER | CONSTANT | FUNCTION '(' args ')' | '(' expr ')'
    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        let token = match self.advance() {
            Some(token) => token.clone(),
            None => return Err(EvalError::UnexpectedEnd),
        };

        match token.kind {
            TokenKind::Number(value) => Ok(Expr::Number(value)),
            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::Ident(name) => {
                if self.peek() == Some(&TokenKind::LParen) {
                    self.advance();
                    self.parse_call(&name)
                } else {
                    lookup_constant(&name)
                        .map(Expr::Number)
                        .ok_or(EvalError::UnknownIdentifier { name })
                }
            }
            _ => Err(syntax(token.pos, "expected a number, name or '('")),
        }
    }

    /// Parse a call's argument list; the opening parenthesis is consumed
    fn parse_call(&mut self, name: &str) -> Result<Expr, EvalError> {
        let function = lookup_function(name).ok_or_else(|| EvalError::UnknownFunction {
            name: name.to_string(),
        })?;

        let mut args = Vec::new();
        if self.peek() == Some(&TokenKind::RParen) {
            self.advance();
        } else {
            loop {
                args.push(self.parse_expr()?);
                match self.peek() {
                    Some(TokenKind::Comma) => {
                        self.advance();
                    }
                    Some(TokenKind::RParen) => {
                        self.advance();
                        break;
                    }
                    Some(_) => return Err(syntax(self.current_pos(), "expected ',' or ')'")),
                    None => return Err(EvalError::UnexpectedEnd),
                }
            }
        }

        function.arity.check(function.name, args.len())?;
        Ok(Expr::Call(function, args))
    }
}

fn chain(first: Expr, rest: Vec<(BinaryOp, Expr)>) -> Expr {
    if rest.is_empty() {
        first
    } else {
        Expr::Chain(Box::new(first), rest)
    }
}

// ==================== Evaluation ====================

impl Expr {
    fn eval(&self) -> Result<f64, EvalError> {
        match self {
            Expr::Number(value) => Ok(*value),
            Expr::Neg(operand) => Ok(-operand.eval()?),
            Expr::Binary(op, lhs, rhs) => {
                let a = lhs.eval()?;
                let b = rhs.eval()?;
                checked(apply_binary(*op, a, b)?, &[a, b])
            }
            Expr::Chain(first, rest) => {
                let mut acc = first.eval()?;
                for (op, operand) in rest {
                    let b = operand.eval()?;
                    acc = checked(apply_binary(*op, acc, b)?, &[acc, b])?;
                }
                Ok(acc)
            }
            Expr::Call(function, args) => {
                let values = args.iter().map(Expr::eval).collect::<Result<Vec<_>, _>>()?;
                checked(apply_function(function.name, &values)?, &values)
            }
        }
    }
}

/// Reject infinite results computed from finite inputs
fn checked(result: f64, inputs: &[f64]) -> Result<f64, EvalError> {
    if result.is_infinite() && inputs.iter().all(|v| v.is_finite()) {
        return Err(EvalError::Overflow);
    }
    Ok(result)
}

fn apply_binary(op: BinaryOp, a: f64, b: f64) -> Result<f64, EvalError> {
    match op {
        BinaryOp::Add => Ok(a + b),
        BinaryOp::Sub => Ok(a - b),
        BinaryOp::Mul => Ok(a * b),
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(a / b)
        }
        BinaryOp::FloorDiv => {
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok((a / b).floor())
        }
        BinaryOp::Mod => {
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            // Result takes the sign of the divisor
            let r = a % b;
            if r != 0.0 && (r < 0.0) != (b < 0.0) {
                Ok(r + b)
            } else {
                Ok(r)
            }
        }
        BinaryOp::Pow => power(a, b),
    }
}

fn power(base: f64, exponent: f64) -> Result<f64, EvalError> {
    if base == 0.0 && exponent < 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    if base < 0.0 && exponent.is_finite() && exponent.fract() != 0.0 {
        return Err(EvalError::Domain {
            function: "pow".to_string(),
        });
    }
    Ok(base.powf(exponent))
}

/// Round to `digits` decimal places, ties to even. Negative `digits` round
/// to tens, hundreds and so on. Precision beyond what `x` carries leaves it
/// unchanged.
fn round_to(x: f64, digits: f64) -> f64 {
    if !x.is_finite() || digits > 308.0 {
        return x;
    }
    if digits < -308.0 {
        return 0.0_f64.copysign(x);
    }

    let digits = digits as i32;
    if digits >= 0 {
        let scale = 10f64.powi(digits);
        let scaled = x * scale;
        if !scaled.is_finite() {
            return x;
        }
        scaled.round_ties_even() / scale
    } else {
        let scale = 10f64.powi(-digits);
        (x / scale).round_ties_even() * scale
    }
}

// ==================== Constant and function tables ====================

fn lookup_constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        "tau" => Some(std::f64::consts::TAU),
        "inf" => Some(f64::INFINITY),
        "nan" => Some(f64::NAN),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Arity {
    Exact(usize),
    Range(usize, usize),
    AtLeast(usize),
}

impl Arity {
    fn check(self, name: &str, found: usize) -> Result<(), EvalError> {
        let (ok, expected) = match self {
            Arity::Exact(n) => (found == n, n.to_string()),
            Arity::Range(min, max) => (
                (min..=max).contains(&found),
                format!("{} to {}", min, max),
            ),
            Arity::AtLeast(n) => (found >= n, format!("at least {}", n)),
        };

        if ok {
            Ok(())
        } else {
            Err(EvalError::WrongArity {
                name: name.to_string(),
                expected,
                found,
            })
        }
    }
}

#[derive(Debug, PartialEq)]
struct Function {
    name: &'static str,
    arity: Arity,
}

const FUNCTIONS: &[Function] = &[
    Function { name: "sqrt", arity: Arity::Exact(1) },
    Function { name: "exp", arity: Arity::Exact(1) },
    Function { name: "log", arity: Arity::Range(1, 2) },
    Function { name: "log10", arity: Arity::Exact(1) },
    Function { name: "log2", arity: Arity::Exact(1) },
    Function { name: "sin", arity: Arity::Exact(1) },
    Function { name: "cos", arity: Arity::Exact(1) },
    Function { name: "tan", arity: Arity::Exact(1) },
    Function { name: "asin", arity: Arity::Exact(1) },
    Function { name: "acos", arity: Arity::Exact(1) },
    Function { name: "atan", arity: Arity::Exact(1) },
    Function { name: "atan2", arity: Arity::Exact(2) },
    Function { name: "sinh", arity: Arity::Exact(1) },
    Function { name: "cosh", arity: Arity::Exact(1) },
    Function { name: "tanh", arity: Arity::Exact(1) },
    Function { name: "degrees", arity: Arity::Exact(1) },
    Function { name: "radians", arity: Arity::Exact(1) },
    Function { name: "abs", arity: Arity::Exact(1) },
    Function { name: "floor", arity: Arity::Exact(1) },
    Function { name: "ceil", arity: Arity::Exact(1) },
    Function { name: "trunc", arity: Arity::Exact(1) },
    Function { name: "round", arity: Arity::Range(1, 2) },
    Function { name: "pow", arity: Arity::Exact(2) },
    Function { name: "hypot", arity: Arity::Exact(2) },
    Function { name: "min", arity: Arity::AtLeast(1) },
    Function { name: "max", arity: Arity::AtLeast(1) },
    Function { name: "sum", arity: Arity::AtLeast(0) },
    Function { name: "factorial", arity: Arity::Exact(1) },
];

fn lookup_function(name: &str) -> Option<&'static Function> {
    FUNCTIONS.iter().find(|f| f.name == name)
}

fn domain(function: &str) -> EvalError {
    EvalError::Domain {
        function: function.to_string(),
    }
}

/// Apply a table function. Arity has already been checked by the parser.
fn apply_function(name: &str, args: &[f64]) -> Result<f64, EvalError> {
    let x = args.first().copied().unwrap_or(0.0);

    let value = match name {
        "sqrt" => {
            if x < 0.0 {
                return Err(domain(name));
            }
            x.sqrt()
        }
        "exp" => x.exp(),
        "log" => {
            if x <= 0.0 {
                return Err(domain(name));
            }
            match args.get(1) {
                Some(&base) => {
                    if base <= 0.0 {
                        return Err(domain(name));
                    }
                    if base == 1.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    x.ln() / base.ln()
                }
                None => x.ln(),
            }
        }
        "log10" | "log2" => {
            if x <= 0.0 {
                return Err(domain(name));
            }
            if name == "log10" {
                x.log10()
            } else {
                x.log2()
            }
        }
        "sin" => x.sin(),
        "cos" => x.cos(),
        "tan" => x.tan(),
        "asin" | "acos" => {
            if !(-1.0..=1.0).contains(&x) {
                return Err(domain(name));
            }
            if name == "asin" {
                x.asin()
            } else {
                x.acos()
            }
        }
        "atan" => x.atan(),
        "atan2" => x.atan2(args[1]),
        "sinh" => x.sinh(),
        "cosh" => x.cosh(),
        "tanh" => x.tanh(),
        "degrees" => x.to_degrees(),
        "radians" => x.to_radians(),
        "abs" => x.abs(),
        "floor" => x.floor(),
        "ceil" => x.ceil(),
        "trunc" => x.trunc(),
        "round" => match args.get(1) {
            Some(&digits) => {
                if digits.fract() != 0.0 {
                    return Err(domain(name));
                }
                round_to(x, digits)
            }
            None => x.round_ties_even(),
        },
        "pow" => power(x, args[1])?,
        "hypot" => x.hypot(args[1]),
        "min" => args.iter().copied().fold(f64::INFINITY, f64::min),
        "max" => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        "sum" => args.iter().sum(),
        "factorial" => {
            if x < 0.0 || x.fract() != 0.0 {
                return Err(domain(name));
            }
            if x > MAX_FACTORIAL {
                return Err(EvalError::Overflow);
            }
            (1..=x as u32).fold(1.0, |acc, n| acc * n as f64)
        }
        _ => {
            return Err(EvalError::UnknownFunction {
                name: name.to_string(),
            })
        }
    };

    Ok(value)
}
