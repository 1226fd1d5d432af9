use log::debug;
use serde::Serialize;
use std::fmt;
use std::rc::Rc;

/// The different kinds of tokens recognized by the pseudocode scanner.
///
/// Literal payloads live in [`Token::literal`], so every variant is a plain
/// tag and the type is `Copy`.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenType {
    /// '('
    LEFT_PAREN,

    /// ')'
    RIGHT_PAREN,

    /// '['
    LEFT_SQUARE,

    /// ']'
    RIGHT_SQUARE,

    /// '{'
    LEFT_BRACE,

    /// '}'
    RIGHT_BRACE,

    /// ','
    COMMA,

    /// '.'
    DOT,

    /// '-'
    MINUS,

    /// '+'
    PLUS,

    /// '/'
    SLASH,

    /// '*'
    STAR,

    /// '<>'
    NOT_EQUAL,

    /// '=' (equality, not assignment)
    EQUAL,

    /// '<-' (assignment)
    LEFT_ARROW,

    /// '>'
    GREATER,

    /// '>='
    GREATER_EQUAL,

    /// '<'
    LESS,

    /// '<='
    LESS_EQUAL,

    /// A user‑defined identifier
    IDENTIFIER,

    /// A string literal (contents without quotes in `literal`)
    STRING,

    /// A numeric literal
    NUMBER,

    AND,
    OR,
    NOT,

    IMPORT,
    CLASS,
    FUNCTION,
    SUPER,
    THIS,
    INHERITS,

    OUTPUT,
    RETURN,

    IF,
    THEN,
    ELSE,

    TRUE,
    FALSE,
    NULL,

    FOR,
    TO,
    WHILE,
    DO,

    VAR,

    ENDFUNCTION,
    ENDCLASS,
    ENDFOR,
    ENDWHILE,
    ENDIF,

    /// End‑of‑input marker
    EOF,
}

impl TokenType {
    /// Variant name, as printed by `--emit tokens` and `Display`.
    pub const fn name(self) -> &'static str {
        match self {
            TokenType::LEFT_PAREN => "LEFT_PAREN",
            TokenType::RIGHT_PAREN => "RIGHT_PAREN",
            TokenType::LEFT_SQUARE => "LEFT_SQUARE",
            TokenType::RIGHT_SQUARE => "RIGHT_SQUARE",
            TokenType::LEFT_BRACE => "LEFT_BRACE",
            TokenType::RIGHT_BRACE => "RIGHT_BRACE",
            TokenType::COMMA => "COMMA",
            TokenType::DOT => "DOT",
            TokenType::MINUS => "MINUS",
            TokenType::PLUS => "PLUS",
            TokenType::SLASH => "SLASH",
            TokenType::STAR => "STAR",
            TokenType::NOT_EQUAL => "NOT_EQUAL",
            TokenType::EQUAL => "EQUAL",
            TokenType::LEFT_ARROW => "LEFT_ARROW",
            TokenType::GREATER => "GREATER",
            TokenType::GREATER_EQUAL => "GREATER_EQUAL",
            TokenType::LESS => "LESS",
            TokenType::LESS_EQUAL => "LESS_EQUAL",
            TokenType::IDENTIFIER => "IDENTIFIER",
            TokenType::STRING => "STRING",
            TokenType::NUMBER => "NUMBER",
            TokenType::AND => "AND",
            TokenType::OR => "OR",
            TokenType::NOT => "NOT",
            TokenType::IMPORT => "IMPORT",
            TokenType::CLASS => "CLASS",
            TokenType::FUNCTION => "FUNCTION",
            TokenType::SUPER => "SUPER",
            TokenType::THIS => "THIS",
            TokenType::INHERITS => "INHERITS",
            TokenType::OUTPUT => "OUTPUT",
            TokenType::RETURN => "RETURN",
            TokenType::IF => "IF",
            TokenType::THEN => "THEN",
            TokenType::ELSE => "ELSE",
            TokenType::TRUE => "TRUE",
            TokenType::FALSE => "FALSE",
            TokenType::NULL => "NULL",
            TokenType::FOR => "FOR",
            TokenType::TO => "TO",
            TokenType::WHILE => "WHILE",
            TokenType::DO => "DO",
            TokenType::VAR => "VAR",
            TokenType::ENDFUNCTION => "ENDFUNCTION",
            TokenType::ENDCLASS => "ENDCLASS",
            TokenType::ENDFOR => "ENDFOR",
            TokenType::ENDWHILE => "ENDWHILE",
            TokenType::ENDIF => "ENDIF",
            TokenType::EOF => "EOF",
        }
    }
}

/// Literal value carried by `STRING` and `NUMBER` tokens.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    Number(f64),
    Str(String),
}

/// A scanned token, including its type, the source lexeme, its literal
/// value (if any), and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    /// The category of this token.
    pub token_type: TokenType,

    /// The exact substring from the source that produced this token.
    pub lexeme: String,

    /// Parsed value of string and number literals.
    pub literal: Option<Literal>,

    /// Path of the file the token was scanned from (shared by every token
    /// of that file).
    pub path: Rc<str>,

    /// 1‑based line number in the source.
    pub line: usize,
}

impl Token {
    /// Create a new Token with the given type, lexeme, literal and location.
    pub fn new(
        token_type: TokenType,
        lexeme: impl Into<String>,
        literal: Option<Literal>,
        path: Rc<str>,
        line: usize,
    ) -> Self {
        let lexeme: String = lexeme.into();

        debug!(
            "Creating new token: type={:?}, lexeme={}, line={}",
            token_type, lexeme, line
        );

        Self {
            token_type,
            lexeme,
            literal,
            path,
            line,
        }
    }

    /// Build a token that does not appear in the source but is attributed to
    /// the location of `origin` (used by parse-time desugaring).
    pub fn synthetic(token_type: TokenType, lexeme: &str, origin: &Token) -> Self {
        Self::new(token_type, lexeme, None, origin.path.clone(), origin.line)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 3 → "3.0", 3.14 → "3.14"
        let literal_str: String = match &self.literal {
            Some(Literal::Str(s)) => s.clone(),
            Some(Literal::Number(n)) if n.fract() == 0.0 && n.abs() < 1e15 => {
                let mut buf: itoa::Buffer = itoa::Buffer::new();
                format!("{}.0", buf.format(*n as i64))
            }
            Some(Literal::Number(n)) => n.to_string(),
            None => "null".to_string(),
        };

        write!(
            f,
            "{} {} {}",
            self.token_type.name(),
            self.lexeme,
            literal_str
        )
    }
}
