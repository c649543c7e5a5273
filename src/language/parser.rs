use crate::language::{
    ast::*,
    errors::{SyntaxError, SyntaxErrors},
    lexer::lex,
    span::Span,
    token::{Token, TokenKind},
};

pub fn parse_program(source: &str) -> Result<Program, SyntaxErrors> {
    let tokens = match lex(source) {
        Ok(tokens) => tokens,
        Err(errors) => {
            let errs = errors
                .into_iter()
                .map(|err| SyntaxError::new(err.message, err.span))
                .collect();
            return Err(SyntaxErrors::new(errs));
        }
    };
    Parser::new(tokens).parse()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<SyntaxError>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Program, SyntaxErrors> {
        let mut statements = Vec::new();

        while !self.is_eof() {
            if self.matches(TokenKind::Semi) {
                continue;
            }
            match self.parse_statement() {
                Ok(statement) => statements.push(statement),
                Err(err) => {
                    self.report(err);
                    self.synchronize();
                }
            }
        }

        if self.errors.is_empty() {
            Ok(Program { statements })
        } else {
            Err(SyntaxErrors::new(self.errors))
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, SyntaxError> {
        if self.matches(TokenKind::Print) {
            return self.parse_print().map(Statement::Print);
        }
        if self.matches(TokenKind::Return) {
            return self.parse_return().map(Statement::Return);
        }
        if self.matches(TokenKind::If) {
            return self.parse_if().map(Statement::If);
        }
        if self.matches(TokenKind::While) {
            return self.parse_while().map(Statement::While);
        }
        if self.matches(TokenKind::Func) {
            return self.parse_func_def().map(Statement::FuncDef);
        }
        if self.check(TokenKind::LBrace) {
            return self.parse_block().map(Statement::Block);
        }
        if matches!(self.peek_kind(), Some(TokenKind::Identifier(_)))
            && self.peek_kind_n(1) == Some(TokenKind::Eq)
        {
            return self.parse_assignment().map(Statement::Assign);
        }

        let expr = self.parse_expression()?;
        let span = expr_span(&expr);
        self.expect(TokenKind::Semi)?;
        Ok(Statement::Expr(ExprStmt { expr, span }))
    }

    fn parse_assignment(&mut self) -> Result<AssignStmt, SyntaxError> {
        let name = self.expect_identifier("Expected assignment target")?;
        self.expect(TokenKind::Eq)?;
        let value = self.parse_expression()?;
        let span = name.span.union(expr_span(&value));
        self.expect(TokenKind::Semi)?;
        Ok(AssignStmt {
            name: name.name,
            value,
            span,
        })
    }

    fn parse_print(&mut self) -> Result<PrintStmt, SyntaxError> {
        let start = self.previous_span_start();
        let value = self.parse_expression()?;
        let span = Span::new(start, expr_span(&value).end);
        self.expect(TokenKind::Semi)?;
        Ok(PrintStmt { value, span })
    }

    fn parse_return(&mut self) -> Result<ReturnStmt, SyntaxError> {
        let start = self.previous_span_start();
        if self.matches(TokenKind::Semi) {
            return Ok(ReturnStmt {
                value: None,
                span: Span::new(start, start),
            });
        }
        let value = self.parse_expression()?;
        let span = Span::new(start, expr_span(&value).end);
        self.expect(TokenKind::Semi)?;
        Ok(ReturnStmt {
            value: Some(value),
            span,
        })
    }

    fn parse_if(&mut self) -> Result<IfStmt, SyntaxError> {
        let start = self.previous_span_start();
        let condition = self.parse_expression()?;
        let then_block = self.parse_block()?;
        let else_block = if self.matches(TokenKind::Else) {
            Some(self.parse_block()?)
        } else {
            None
        };
        let end = else_block
            .as_ref()
            .map(|block| block.span.end)
            .unwrap_or(then_block.span.end);
        Ok(IfStmt {
            condition,
            then_block,
            else_block,
            span: Span::new(start, end),
        })
    }

    fn parse_while(&mut self) -> Result<WhileStmt, SyntaxError> {
        let start = self.previous_span_start();
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        let end = body.span.end;
        Ok(WhileStmt {
            condition,
            body,
            span: Span::new(start, end),
        })
    }

    fn parse_func_def(&mut self) -> Result<FuncDefStmt, SyntaxError> {
        let start = self.previous_span_start();
        let name = self.expect_identifier("Expected function name")?;
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let param = self.expect_identifier("Expected parameter name")?;
                params.push(param.name);
                if self.matches(TokenKind::Comma) {
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        let body = self.parse_block()?;
        let end = body.span.end;
        Ok(FuncDefStmt {
            name: name.name,
            params,
            body,
            span: Span::new(start, end),
        })
    }

    fn parse_block(&mut self) -> Result<Block, SyntaxError> {
        let start = self.expect(TokenKind::LBrace)?.span.start;
        let mut statements = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            if self.matches(TokenKind::Semi) {
                continue;
            }
            statements.push(self.parse_statement()?);
        }
        let end = self.expect(TokenKind::RBrace)?.span.end;
        Ok(Block {
            statements,
            span: Span::new(start, end),
        })
    }

    fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_unary()?;

        loop {
            let (op, prec) = match self.current_binary_op() {
                Some(info) => info,
                None => break,
            };
            if prec < min_prec {
                break;
            }
            self.advance();
            let right = self.parse_binary(prec + 1)?;
            let span = expr_span(&left).union(expr_span(&right));
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = match self.peek_kind() {
            Some(TokenKind::Minus) => Some(UnaryOp::Neg),
            Some(TokenKind::Plus) => Some(UnaryOp::Pos),
            Some(TokenKind::Bang) => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            let op_span = self.advance().span;
            let expr = self.parse_unary()?;
            let span = op_span.union(expr_span(&expr));
            return Ok(Expr::Unary {
                op,
                expr: Box::new(expr),
                span,
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::Integer(value)) => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::Number(value as f64, span)))
            }
            Some(TokenKind::Float(value)) => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::Number(value, span)))
            }
            Some(TokenKind::String(value)) => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::String(value, span)))
            }
            Some(TokenKind::True) => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::Bool(true, span)))
            }
            Some(TokenKind::False) => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::Bool(false, span)))
            }
            Some(TokenKind::Identifier(_)) => self.parse_identifier_expression(),
            Some(TokenKind::LParen) => {
                let start = self.advance().span.start;
                let inner = self.parse_expression()?;
                let end = self.expect(TokenKind::RParen)?.span.end;
                Ok(Expr::Paren(Box::new(inner), Span::new(start, end)))
            }
            Some(TokenKind::LBracket) => {
                let start = self.advance().span.start;
                let mut elements = Vec::new();
                if !self.check(TokenKind::RBracket) {
                    loop {
                        elements.push(self.parse_expression()?);
                        if self.matches(TokenKind::Comma) {
                            continue;
                        }
                        break;
                    }
                }
                let end = self.expect(TokenKind::RBracket)?.span.end;
                Ok(Expr::List(elements, Span::new(start, end)))
            }
            _ => Err(self.error_here("Unexpected token in expression")),
        }
    }

    fn parse_identifier_expression(&mut self) -> Result<Expr, SyntaxError> {
        let ident = self.expect_identifier("Expected identifier")?;
        if self.matches(TokenKind::LParen) {
            let mut args = Vec::new();
            if !self.check(TokenKind::RParen) {
                loop {
                    args.push(self.parse_expression()?);
                    if self.matches(TokenKind::Comma) {
                        continue;
                    }
                    break;
                }
            }
            let end = self.expect(TokenKind::RParen)?.span.end;
            let span = Span::new(ident.span.start, end);
            return Ok(Expr::Call {
                name: ident,
                args,
                span,
            });
        }
        Ok(Expr::Identifier(ident))
    }

    fn current_binary_op(&self) -> Option<(BinaryOp, u8)> {
        match self.peek_kind() {
            Some(TokenKind::PipePipe) => Some((BinaryOp::Or, 1)),
            Some(TokenKind::AmpersandAmpersand) => Some((BinaryOp::And, 2)),
            Some(TokenKind::EqEq) => Some((BinaryOp::Eq, 3)),
            Some(TokenKind::BangEq) => Some((BinaryOp::NotEq, 3)),
            Some(TokenKind::Lt) => Some((BinaryOp::Lt, 3)),
            Some(TokenKind::LtEq) => Some((BinaryOp::LtEq, 3)),
            Some(TokenKind::Gt) => Some((BinaryOp::Gt, 3)),
            Some(TokenKind::GtEq) => Some((BinaryOp::GtEq, 3)),
            Some(TokenKind::Plus) => Some((BinaryOp::Add, 4)),
            Some(TokenKind::Minus) => Some((BinaryOp::Sub, 4)),
            Some(TokenKind::Star) => Some((BinaryOp::Mul, 5)),
            Some(TokenKind::Slash) => Some((BinaryOp::Div, 5)),
            Some(TokenKind::Percent) => Some((BinaryOp::Rem, 5)),
            Some(TokenKind::Caret) => Some((BinaryOp::Pow, 6)),
            _ => None,
        }
    }

    fn expect_identifier(&mut self, msg: &str) -> Result<Identifier, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::Identifier(name)) => {
                let span = self.advance().span;
                Ok(Identifier { name, span })
            }
            _ => Err(self.error_here(msg)),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&Token, SyntaxError> {
        if self.check(kind.clone()) {
            Ok(self.advance())
        } else {
            Err(self.error_here(&format!("Expected {:?}", kind)))
        }
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        matches!(self.peek_kind(), Some(tk) if tk == kind)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|t| t.kind.clone())
    }

    fn peek_kind_n(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + n).map(|t| t.kind.clone())
    }

    fn advance(&mut self) -> &Token {
        let token = self
            .tokens
            .get(self.pos)
            .unwrap_or_else(|| self.tokens.last().expect("token stream has Eof"));
        self.pos = (self.pos + 1).min(self.tokens.len());
        token
    }

    fn is_eof(&self) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Eof) | None)
    }

    fn previous_span_start(&self) -> usize {
        if self.pos == 0 {
            0
        } else {
            self.tokens[self.pos - 1].span.start
        }
    }

    fn error_here(&self, message: &str) -> SyntaxError {
        let span = self
            .tokens
            .get(self.pos)
            .map(|t| t.span)
            .unwrap_or_else(|| Span::new(0, 0));
        SyntaxError::new(message.to_string(), span)
    }

    fn report(&mut self, err: SyntaxError) {
        self.errors.push(err);
    }

    fn synchronize(&mut self) {
        while !self.is_eof() {
            if self.matches(TokenKind::Semi) {
                return;
            }
            match self.peek_kind() {
                Some(
                    TokenKind::Print
                    | TokenKind::Return
                    | TokenKind::If
                    | TokenKind::While
                    | TokenKind::Func
                    | TokenKind::RBrace,
                ) => return,
                _ => {
                    self.advance();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_single_expr(source: &str) -> Expr {
        let program = parse_program(source).expect("parse failed");
        assert_eq!(program.statements.len(), 1);
        match program.statements.into_iter().next() {
            Some(Statement::Expr(stmt)) => stmt.expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn multiplicative_binds_tighter_than_additive() {
        let expr = parse_single_expr("3 + 4 * 2;");
        match expr {
            Expr::Binary {
                op: BinaryOp::Add,
                right,
                ..
            } => {
                assert!(matches!(
                    *right,
                    Expr::Binary {
                        op: BinaryOp::Mul,
                        ..
                    }
                ));
            }
            other => panic!("expected additive at the root, got {:?}", other),
        }
    }

    #[test]
    fn power_chain_is_left_associative() {
        let expr = parse_single_expr("2 ^ 3 ^ 2;");
        match expr {
            Expr::Binary {
                op: BinaryOp::Pow,
                left,
                right,
                ..
            } => {
                assert!(matches!(
                    *left,
                    Expr::Binary {
                        op: BinaryOp::Pow,
                        ..
                    }
                ));
                assert!(matches!(*right, Expr::Literal(Literal::Number(v, _)) if v == 2.0));
            }
            other => panic!("expected power at the root, got {:?}", other),
        }
    }

    #[test]
    fn unary_minus_binds_tighter_than_power() {
        let expr = parse_single_expr("-2 ^ 2;");
        match expr {
            Expr::Binary {
                op: BinaryOp::Pow,
                left,
                ..
            } => assert!(matches!(
                *left,
                Expr::Unary {
                    op: UnaryOp::Neg,
                    ..
                }
            )),
            other => panic!("expected power at the root, got {:?}", other),
        }
    }

    #[test]
    fn parses_list_literal() {
        let expr = parse_single_expr("[1, 2, 3];");
        match expr {
            Expr::List(elements, _) => assert_eq!(elements.len(), 3),
            other => panic!("expected list literal, got {:?}", other),
        }
    }

    #[test]
    fn parses_nested_list_literal() {
        let expr = parse_single_expr("[[1, 2], [3, 4]];");
        match expr {
            Expr::List(rows, _) => {
                assert_eq!(rows.len(), 2);
                assert!(matches!(rows[0], Expr::List(_, _)));
            }
            other => panic!("expected list literal, got {:?}", other),
        }
    }

    #[test]
    fn parses_call_with_arguments() {
        let expr = parse_single_expr("mat_mul(a, b);");
        match expr {
            Expr::Call { name, args, .. } => {
                assert_eq!(name.name, "mat_mul");
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn parses_function_definition() {
        let program = parse_program("func add(a, b) { return a + b; }").expect("parse failed");
        match &program.statements[0] {
            Statement::FuncDef(def) => {
                assert_eq!(def.name, "add");
                assert_eq!(def.params, vec!["a".to_string(), "b".to_string()]);
                assert_eq!(def.body.statements.len(), 1);
            }
            other => panic!("expected function definition, got {:?}", other),
        }
    }

    #[test]
    fn parses_if_else() {
        let program =
            parse_program("if x > 0 { print x; } else { print 0; }").expect("parse failed");
        match &program.statements[0] {
            Statement::If(stmt) => assert!(stmt.else_block.is_some()),
            other => panic!("expected if statement, got {:?}", other),
        }
    }

    #[test]
    fn assignment_requires_semicolon() {
        let errors = parse_program("x = 1").expect_err("expected syntax errors");
        assert_eq!(errors.errors.len(), 1);
    }

    #[test]
    fn recovers_and_reports_multiple_errors() {
        let errors = parse_program("x = ;\ny = ;").expect_err("expected syntax errors");
        assert_eq!(errors.errors.len(), 2);
    }

    #[test]
    fn paren_expression_keeps_node() {
        let expr = parse_single_expr("(1 + 2) * 3;");
        match expr {
            Expr::Binary {
                op: BinaryOp::Mul,
                left,
                ..
            } => assert!(matches!(*left, Expr::Paren(_, _))),
            other => panic!("expected multiplication at the root, got {:?}", other),
        }
    }
}
