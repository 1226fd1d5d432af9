/*!
Recursive‑descent parser for the pseudocode language.

Definitions
-----------
* **n** = number of tokens (including the sole EOF, and any tokens spliced in
  by `IMPORT`).

Each token is consumed once via `advance()`, so parsing is **Θ(n)**; error
recovery (`synchronize()`) only discards tokens.

### Logging Policy

| Location                     | Level  | Purpose                                   |
|------------------------------|--------|-------------------------------------------|
| `Parser::new`, `parse`       | `info` | Lifecycle milestones.                     |
| `declaration`, `statement`   | `debug`| High‑level descent into grammar branches. |
| `import_module`              | `info` | Files spliced into the token stream.      |

--------------------------------------------------------------------------------
Grammar (EBNF)
--------------

```text
program        → declaration* EOF ;
declaration    → importDecl | classDecl | funDecl | varDecl | statement ;
importDecl     → "IMPORT" STRING ;
classDecl      → "CLASS" IDENT ( "INHERITS" IDENT )? ( "FUNCTION" function )* "ENDCLASS" ;
funDecl        → "FUNCTION" function ;
function       → IDENT "(" parameters? ")" declaration* "ENDFUNCTION" ;
varDecl        → "VAR" IDENT ( "<-" expression )? ;
statement      → forStmt | ifStmt | outputStmt | returnStmt | whileStmt | exprStmt ;
forStmt        → "FOR" "VAR" IDENT "<-" expression "TO" additive "DO" declaration* "ENDFOR" ;
ifStmt         → "IF" logic_or "THEN" declaration* ( "ELSE" declaration* )? "ENDIF" ;
outputStmt     → "OUTPUT" expression ;
returnStmt     → "RETURN" expression? ;
whileStmt      → "WHILE" expression "DO" declaration* "ENDWHILE" ;
exprStmt       → expression ;
expression     → assignment ;
assignment     → logic_or ( "<-" assignment )? ;
logic_or       → logic_and ( "OR" logic_and )* ;
logic_and      → equality ( "AND" equality )* ;
equality       → comparison ( ( "<>" | "=" ) comparison )* ;
comparison     → additive ( ( ">" | ">=" | "<" | "<=" ) additive )* ;
additive       → factor ( ( "-" | "+" ) factor )* ;
factor         → unary ( ( "/" | "*" ) unary )* ;
unary          → ( "NOT" | "-" ) unary | index ;
index          → call ( "[" expression ( "," expression )* "]" )* ;
call           → primary ( "(" arguments? ")" | "." IDENT )* ;
primary        → NUMBER | STRING | "TRUE" | "FALSE" | "NULL" | "THIS"
               | "SUPER" "." IDENT | IDENT | "(" expression ")"
               | "{" ( expression ( "," expression )* )? "}" ;
```

Statements have no terminator: `;` is discarded by the scanner and a
statement ends where the next one cannot continue it.
*/

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::{PseudoError, Result};
use crate::expr::{Expr, ExprId, LiteralValue};
use crate::scanner::Scanner;
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Literal, Token, TokenType};

use log::{debug, info};

/// Largest number of parameters a function may declare (and arguments a
/// call may pass).
pub const MAX_ARITY: usize = 8;

/// Top‑level parser over an owned token buffer.
///
/// The buffer is owned (rather than borrowed) because `IMPORT` splices the
/// tokens of another file into it while parsing.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    errors: Vec<PseudoError>,

    /// imported file → file whose `IMPORT` pulled it in
    imports: HashMap<PathBuf, PathBuf>,
}

impl Parser {
    /// Construct a new parser.  `tokens` must end with an `EOF` token.
    pub fn new(tokens: Vec<Token>) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        Self {
            tokens,
            current: 0,
            errors: Vec::new(),
            imports: HashMap::new(),
        }
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program, returning its statements together with every
    /// diagnostic collected on the way.
    pub fn parse(mut self) -> (Vec<Stmt>, Vec<PseudoError>) {
        info!("Beginning parse phase");

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        info!(
            "Parsed {} statement(s) with {} error(s)",
            statements.len(),
            self.errors.len()
        );

        (statements, self.errors)
    }

    // ──────────────────────── declaration rules ───────────────────

    /// Parse one declaration.  `None` means nothing was produced: either an
    /// `IMPORT` (its tokens are parsed by later calls) or a syntax error that
    /// was recorded and recovered from.
    fn declaration(&mut self) -> Option<Stmt> {
        debug!("Entering declaration at {:?}", self.peek().token_type);

        let result: Result<Option<Stmt>> = if self.matches(TokenType::IMPORT) {
            self.import_module().map(|()| None)
        } else if self.matches(TokenType::CLASS) {
            self.class_declaration().map(Some)
        } else if self.matches(TokenType::FUNCTION) {
            self.function()
                .map(|decl| Some(Stmt::Function(Rc::new(decl))))
        } else if self.matches(TokenType::VAR) {
            self.var_declaration().map(Some)
        } else {
            self.statement().map(Some)
        };

        match result {
            Ok(stmt) => stmt,

            Err(e) => {
                debug!("Parse debug: {}", e);

                self.errors.push(e);
                self.synchronize();

                None
            }
        }
    }

    /// `IMPORT "path"`: lex the file and splice its tokens in after the
    /// current position.
    fn import_module(&mut self) -> Result<()> {
        let path_token: Token = self.consume(TokenType::STRING, "Expect file path for module")?;

        let path: String = match &path_token.literal {
            Some(Literal::Str(s)) => s.clone(),
            _ => return Err(PseudoError::parse(&path_token, "Expect file path for module")),
        };

        let target: PathBuf = canonical(&path);
        let importer: PathBuf = canonical(&path_token.path);

        // Walk the chain of files that led to this import.
        let mut cursor: Option<PathBuf> = Some(importer.clone());
        while let Some(file) = cursor {
            if file == target {
                self.report(&path_token, format!("Circular import of '{}'", path));

                return Ok(());
            }

            cursor = self.imports.get(&file).cloned();
        }

        let source: String = match fs::read_to_string(&path) {
            Ok(source) => source,

            Err(e) => {
                self.report(
                    &path_token,
                    format!("Cannot read module '{}': {}", path, e),
                );

                return Ok(());
            }
        };

        let (mut module_tokens, scan_errors) = Scanner::new(&source, &path).scan_tokens();
        self.errors.extend(scan_errors);
        module_tokens.pop(); // the module's own EOF

        info!(
            "Importing {} token(s) from {:?} at position {}",
            module_tokens.len(),
            path,
            self.current
        );

        self.imports.insert(target, importer);

        let at: usize = self.current;
        self.tokens.splice(at..at, module_tokens);

        Ok(())
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self.consume(TokenType::IDENTIFIER, "Expect class identifier")?;

        let superclass: Option<Expr> = if self.matches(TokenType::INHERITS) {
            let super_name: Token =
                self.consume(TokenType::IDENTIFIER, "Expect superclass identifier")?;

            Some(Expr::variable(super_name))
        } else {
            None
        };

        let mut methods: Vec<Rc<FunctionDecl>> = Vec::new();

        while !self.check(TokenType::ENDCLASS) && !self.is_at_end() {
            self.consume(TokenType::FUNCTION, "Expect 'FUNCTION' in class body")?;
            methods.push(Rc::new(self.function()?));
        }

        self.consume(TokenType::ENDCLASS, "Expect 'ENDCLASS' after class body")?;

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    fn function(&mut self) -> Result<FunctionDecl> {
        let name: Token = self.consume(TokenType::IDENTIFIER, "Expect function identifier")?;

        self.consume(
            TokenType::LEFT_PAREN,
            "Expect '(' after function identifier",
        )?;

        let mut params: Vec<Token> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= MAX_ARITY {
                    let at: Token = self.peek().clone();
                    self.report(&at, "Cannot have more than 8 parameters");
                }

                params.push(self.consume(TokenType::IDENTIFIER, "Expect parameter identifier")?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after parameters")?;

        let body: Vec<Stmt> = self.body(&[TokenType::ENDFUNCTION]);

        self.consume(
            TokenType::ENDFUNCTION,
            "Expect 'ENDFUNCTION' at the end of the function",
        )?;

        Ok(FunctionDecl { name, params, body })
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self.consume(TokenType::IDENTIFIER, "Expect variable identifier")?;

        let initializer: Option<Expr> = if self.matches(TokenType::LEFT_ARROW) {
            Some(self.expression()?)
        } else {
            None
        };

        Ok(Stmt::Var { name, initializer })
    }

    /// Declarations up to (not including) one of `terminators`.
    fn body(&mut self, terminators: &[TokenType]) -> Vec<Stmt> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !terminators.iter().any(|t| self.check(*t)) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        statements
    }

    // ───────────────────────── statement rules ────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        debug!("Entering statement at {:?}", self.peek().token_type);

        if self.matches(TokenType::FOR) {
            self.for_statement()
        } else if self.matches(TokenType::IF) {
            self.if_statement()
        } else if self.matches(TokenType::OUTPUT) {
            Ok(Stmt::Output(self.expression()?))
        } else if self.matches(TokenType::RETURN) {
            self.return_statement()
        } else if self.matches(TokenType::WHILE) {
            self.while_statement()
        } else {
            Ok(Stmt::Expression(self.expression()?))
        }
    }

    /// Desugars `FOR VAR i <- a TO b DO ... ENDFOR` into an initializer, the
    /// condition `i <= b` and the increment `i <- i + 1`.
    fn for_statement(&mut self) -> Result<Stmt> {
        if !self.matches(TokenType::VAR) {
            return Err(PseudoError::parse(
                self.peek(),
                "Expect a variable declaration after 'FOR'",
            ));
        }

        let variable: Token = self.consume(TokenType::IDENTIFIER, "Expect variable identifier")?;

        self.consume(
            TokenType::LEFT_ARROW,
            "Expect '<-' after variable identifier",
        )?;

        let start: Expr = self.expression()?;

        self.consume(TokenType::TO, "Expect 'TO' after variable declaration")?;

        let upper: Expr = self.additive()?;

        self.consume(
            TokenType::DO,
            "Expect 'DO' at end of for loop initialization",
        )?;

        let body: Vec<Stmt> = self.body(&[TokenType::ENDFOR]);

        self.consume(TokenType::ENDFOR, "Expect 'ENDFOR' at end of the for loop")?;

        let condition: Expr = Expr::Binary {
            left: Box::new(Expr::variable(variable.clone())),
            operator: Token::synthetic(TokenType::LESS_EQUAL, "<=", &variable),
            right: Box::new(upper),
        };

        let increment: Expr = Expr::assign(
            variable.clone(),
            Expr::Binary {
                left: Box::new(Expr::variable(variable.clone())),
                operator: Token::synthetic(TokenType::PLUS, "+", &variable),
                right: Box::new(Expr::Literal(LiteralValue::Number(1.0))),
            },
        );

        Ok(Stmt::For {
            variable: variable.clone(),
            initializer: Box::new(Stmt::Var {
                name: variable,
                initializer: Some(start),
            }),
            condition,
            increment,
            body,
        })
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();
        let condition: Expr = self.logical_or()?;

        // Only AND/OR expressions are accepted as conditions.
        if !matches!(condition, Expr::Logical { .. }) {
            self.report(&keyword, "Expect logical expression as condition");
        }

        self.consume(
            TokenType::THEN,
            "Expect 'THEN' after if statement condition",
        )?;

        let then_branch: Vec<Stmt> = self.body(&[TokenType::ELSE, TokenType::ENDIF]);

        let else_branch: Option<Vec<Stmt>> = if self.matches(TokenType::ELSE) {
            Some(self.body(&[TokenType::ENDIF]))
        } else {
            None
        };

        self.consume(TokenType::ENDIF, "Expect 'ENDIF' at end of the if statement")?;

        Ok(Stmt::If {
            keyword,
            condition,
            then_branch,
            else_branch,
        })
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();

        let value: Option<Expr> = if self.ends_statement(&keyword) {
            None
        } else {
            Some(self.expression()?)
        };

        Ok(Stmt::Return { keyword, value })
    }

    /// A bare `RETURN` is followed by a block terminator or by a token on a
    /// later line.
    fn ends_statement(&self, keyword: &Token) -> bool {
        let next: &Token = self.peek();

        matches!(
            next.token_type,
            TokenType::ENDFUNCTION
                | TokenType::ENDIF
                | TokenType::ELSE
                | TokenType::ENDWHILE
                | TokenType::ENDFOR
                | TokenType::ENDCLASS
                | TokenType::EOF
        ) || next.line > keyword.line
            || next.path != keyword.path
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        let condition: Expr = self.expression()?;

        self.consume(TokenType::DO, "Expect 'DO' after condition")?;

        let body: Vec<Stmt> = self.body(&[TokenType::ENDWHILE]);

        self.consume(
            TokenType::ENDWHILE,
            "Expect 'ENDWHILE' at the end of the while statement",
        )?;

        Ok(Stmt::While { condition, body })
    }

    // ─────────────────────── expression rules ─────────────────────

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr: Expr = self.logical_or()?;

        if self.matches(TokenType::LEFT_ARROW) {
            let arrow: Token = self.previous().clone();
            let value: Expr = self.assignment()?;

            let target: Expr = match expr {
                Expr::Variable { name, .. } => Expr::assign(name, value),

                Expr::Get { object, name } => Expr::Set {
                    object,
                    name,
                    value: Box::new(value),
                },

                Expr::GetIndex {
                    object,
                    brackets,
                    indices,
                } => Expr::SetIndex {
                    object,
                    brackets,
                    indices,
                    value: Box::new(value),
                },

                other => {
                    self.report(&arrow, "Invalid assignment target");
                    other
                }
            };

            return Ok(target);
        }

        Ok(expr)
    }

    fn logical_or(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.logical_and()?;

        while self.matches(TokenType::OR) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.logical_and()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.equality()?;

        while self.matches(TokenType::AND) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.equality()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.comparison()?;

        while self.matches(TokenType::NOT_EQUAL) || self.matches(TokenType::EQUAL) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.comparison()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.additive()?;

        while self.matches(TokenType::GREATER)
            || self.matches(TokenType::GREATER_EQUAL)
            || self.matches(TokenType::LESS)
            || self.matches(TokenType::LESS_EQUAL)
        {
            let operator: Token = self.previous().clone();
            let right: Expr = self.additive()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.factor()?;

        while self.matches(TokenType::MINUS) || self.matches(TokenType::PLUS) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.factor()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.unary()?;

        while self.matches(TokenType::STAR) || self.matches(TokenType::SLASH) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.matches(TokenType::NOT) || self.matches(TokenType::MINUS) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;

            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }

        self.index()
    }

    fn index(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.call()?;

        while self.matches(TokenType::LEFT_SQUARE) {
            let mut indices: Vec<Expr> = Vec::new();

            loop {
                if !matches!(
                    self.peek().token_type,
                    TokenType::IDENTIFIER | TokenType::NUMBER
                ) {
                    let at: Token = self.peek().clone();
                    self.report(&at, "Expect identifier or number for index value");
                }

                indices.push(self.expression()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }

            let brackets: Token =
                self.consume(TokenType::RIGHT_SQUARE, "Expect ']' after index value")?;

            expr = Expr::GetIndex {
                object: Box::new(expr),
                brackets,
                indices,
            };
        }

        Ok(expr)
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.matches(TokenType::LEFT_PAREN) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenType::DOT) {
                let name: Token = self.consume(
                    TokenType::IDENTIFIER,
                    "Expect property identifier after '.'",
                )?;

                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= MAX_ARITY {
                    let at: Token = self.peek().clone();
                    self.report(&at, "Cannot have more than 8 arguments");
                }

                arguments.push(self.expression()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        let paren: Token = self.consume(TokenType::RIGHT_PAREN, "Expect ')' after arguments")?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.matches(TokenType::FALSE) {
            return Ok(Expr::Literal(LiteralValue::False));
        }
        if self.matches(TokenType::TRUE) {
            return Ok(Expr::Literal(LiteralValue::True));
        }
        if self.matches(TokenType::NULL) {
            return Ok(Expr::Literal(LiteralValue::Null));
        }

        if self.matches(TokenType::NUMBER) || self.matches(TokenType::STRING) {
            let literal: LiteralValue = match &self.previous().literal {
                Some(Literal::Number(n)) => LiteralValue::Number(*n),
                Some(Literal::Str(s)) => LiteralValue::Str(s.clone()),
                None => return Err(PseudoError::parse(self.previous(), "Expect literal value")),
            };

            return Ok(Expr::Literal(literal));
        }

        if self.matches(TokenType::SUPER) {
            let keyword: Token = self.previous().clone();

            self.consume(TokenType::DOT, "Expect '.' after 'SUPER'")?;

            let method: Token =
                self.consume(TokenType::IDENTIFIER, "Expect super class method name")?;

            return Ok(Expr::Super {
                id: ExprId::fresh(),
                keyword,
                method,
            });
        }

        if self.matches(TokenType::THIS) {
            return Ok(Expr::This {
                id: ExprId::fresh(),
                keyword: self.previous().clone(),
            });
        }

        if self.matches(TokenType::LEFT_BRACE) {
            let mut values: Vec<Expr> = Vec::new();

            if !self.check(TokenType::RIGHT_BRACE) {
                loop {
                    values.push(self.expression()?);

                    if !self.matches(TokenType::COMMA) {
                        break;
                    }
                }
            }

            self.consume(TokenType::RIGHT_BRACE, "Expect '}' after values")?;

            return Ok(Expr::List(values));
        }

        if self.matches(TokenType::IDENTIFIER) {
            return Ok(Expr::variable(self.previous().clone()));
        }

        if self.matches(TokenType::LEFT_PAREN) {
            let expr: Expr = self.expression()?;

            self.consume(TokenType::RIGHT_PAREN, "Expect ')' after expression")?;

            return Ok(Expr::Grouping(Box::new(expr)));
        }

        Err(PseudoError::parse(self.peek(), "Expect expression"))
    }

    // ────────────────────── utility helpers ───────────────────────

    /// Record an error without unwinding the current production.
    fn report<S: Into<String>>(&mut self, token: &Token, message: S) {
        let error: PseudoError = PseudoError::parse(token, message);

        debug!("Parse debug: {}", error);

        self.errors.push(error);
    }

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    #[inline(always)]
    fn consume(&mut self, ttype: TokenType, message: &str) -> Result<Token> {
        if self.check(ttype) {
            return Ok(self.advance().clone());
        }

        Err(PseudoError::parse(self.peek(), message))
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == ttype
    }

    #[inline(always)]
    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::EOF)
    }

    #[inline(always)]
    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    #[inline(always)]
    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    /// Discards tokens until it thinks it is at a statement boundary.
    ///
    /// The offending token is kept when it already starts a statement: every
    /// declaration consumes its leading keyword before it can fail, so this
    /// always makes progress.
    fn synchronize(&mut self) {
        while !self.is_at_end() {
            if starts_statement(self.peek().token_type) {
                return;
            }

            self.advance();
        }
    }
}

#[inline]
fn starts_statement(token_type: TokenType) -> bool {
    matches!(
        token_type,
        TokenType::CLASS
            | TokenType::FUNCTION
            | TokenType::VAR
            | TokenType::FOR
            | TokenType::IF
            | TokenType::WHILE
            | TokenType::OUTPUT
            | TokenType::RETURN
    )
}

/// Normalise a path for import-cycle comparison; falls back to the path as
/// written when it cannot be resolved on disk.
fn canonical(path: &str) -> PathBuf {
    Path::new(path)
        .canonicalize()
        .unwrap_or_else(|_| PathBuf::from(path))
}
