//! Feature expression parser
//!
//! Parses feature strings into AST nodes.
//!
//! Supported syntax:
//! - Projections: `obs_dt`, `@entities.city`, `entities.team`, `@MaxTemp`
//! - Aggregates: `avg(MaxTemp) over last 7 days where RainToday == 'Yes' group by month as f`,
//!   `first(event_type) over past having max temp`, `nth(amount, 2) over past`
//! - Windows: `last N <unit>`, `previous N <unit>`, `next N <unit>`, `past`, `future`,
//!   `all time`, `ytd`, `mtd`
//! - Literals: `42`, `3.14`, `'text'`, `"text"`, `true`, `false`, `null`
//! - Binary operators: `==`/`=`, `!=`/`<>`, `<`, `<=`, `>`, `>=`, `+`, `-`, `*`, `/`,
//!   `and`/`&&`, `or`/`||`, `in (..)`, `not in (..)`, `contains`, `starts_with`,
//!   `ends_with`, `regex`
//! - Unary operators: `not`/`!`, `-`
//! - Scalar function calls: `lower(team)`, `coalesce(a, b)`
//! - Parentheses for grouping: `(a + b) * c`
//!
//! Precedence from loosest to tightest: `or`, `and`, `not`, comparison and
//! `in`, additive, multiplicative, unary.

use crate::error::{ParseError, Result};
use crate::lexer::{tokenize, Token, TokenKind};
use chronofeat_core::ast::{
    AggregateCall, EntityScope, EventField, Expression, FeatureDefinition, Having, HavingKind,
    Operator, TimeUnit, UnaryOperator, Window,
};
use chronofeat_core::Value;

/// Expression parser
pub struct ExpressionParser;

impl ExpressionParser {
    /// Parse one entry of a feature list, including an optional `as alias`
    pub fn parse_feature(input: &str) -> Result<FeatureDefinition> {
        let raw = input.trim();
        let mut cursor = Cursor::new(input)?;
        let expression = cursor.parse_expression()?;

        let alias = if cursor.eat_keyword("as") {
            Some(cursor.expect_ident("alias")?)
        } else {
            None
        };
        cursor.expect_end()?;

        Ok(FeatureDefinition {
            raw: raw.to_string(),
            expression,
            alias,
        })
    }

    /// Parse a bare expression (predicates, group keys)
    pub fn parse(input: &str) -> Result<Expression> {
        let mut cursor = Cursor::new(input)?;
        let expression = cursor.parse_expression()?;
        cursor.expect_end()?;
        Ok(expression)
    }
}

/// Reserved words that never start an attribute reference
const RESERVED: &[&str] = &[
    "and", "or", "not", "in", "over", "where", "group", "by", "having", "as",
];

/// Word operators at comparison precedence
const KEYWORD_OPERATORS: &[(&str, Operator)] = &[
    ("contains", Operator::Contains),
    ("starts_with", Operator::StartsWith),
    ("ends_with", Operator::EndsWith),
    ("regex", Operator::Regex),
];

struct Cursor<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Result<Self> {
        if input.trim().is_empty() {
            return Err(ParseError::EmptyExpression);
        }
        Ok(Self {
            input,
            tokens: tokenize(input)?,
            pos: 0,
        })
    }

    // ========== Token helpers ==========

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.peek().map_or(false, |t| t.is_keyword(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::UnexpectedToken {
                found: token.kind.to_string(),
                expected: expected.to_string(),
                position: token.start,
            },
            None => ParseError::UnexpectedEnd {
                expected: expected.to_string(),
                position: self.input.len(),
            },
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token> {
        if self.peek_kind() == Some(&kind) {
            self.advance().ok_or_else(|| self.unexpected(expected))
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", keyword)))
        }
    }

    fn expect_ident(&mut self, expected: &str) -> Result<String> {
        match self.peek_kind() {
            Some(TokenKind::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn expect_end(&self) -> Result<()> {
        if self.peek().is_some() {
            Err(self.unexpected("end of expression"))
        } else {
            Ok(())
        }
    }

    // ========== Precedence levels ==========

    fn parse_expression(&mut self) -> Result<Expression> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expression> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("or") || self.eat(&TokenKind::OrOr) {
            let right = self.parse_and()?;
            left = Expression::binary(left, Operator::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression> {
        let mut left = self.parse_not()?;
        while self.eat_keyword("and") || self.eat(&TokenKind::AndAnd) {
            let right = self.parse_not()?;
            left = Expression::binary(left, Operator::And, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expression> {
        if self.eat_keyword("not") {
            let operand = self.parse_not()?;
            return Ok(Expression::unary(UnaryOperator::Not, operand));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expression> {
        let left = self.parse_additive()?;

        if self.at_keyword("in") {
            self.pos += 1;
            let list = self.parse_list()?;
            return Ok(Expression::binary(left, Operator::In, list));
        }
        if self.at_keyword("not") && self.peek_at(1).map_or(false, |t| t.is_keyword("in")) {
            self.pos += 2;
            let list = self.parse_list()?;
            return Ok(Expression::unary(
                UnaryOperator::Not,
                Expression::binary(left, Operator::In, list),
            ));
        }

        if let Some((_, op)) = KEYWORD_OPERATORS.iter().find(|(word, _)| self.at_keyword(word)) {
            let op = *op;
            self.pos += 1;
            let right = self.parse_additive()?;
            return Ok(Expression::binary(left, op, right));
        }

        let op = match self.peek_kind() {
            Some(TokenKind::Eq) => Operator::Eq,
            Some(TokenKind::Ne) => Operator::Ne,
            Some(TokenKind::Lt) => Operator::Lt,
            Some(TokenKind::Le) => Operator::Le,
            Some(TokenKind::Gt) => Operator::Gt,
            Some(TokenKind::Ge) => Operator::Ge,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.parse_additive()?;
        Ok(Expression::binary(left, op, right))
    }

    fn parse_additive(&mut self) -> Result<Expression> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => Operator::Add,
                Some(TokenKind::Minus) => Operator::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_multiplicative()?;
            left = Expression::binary(left, op, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expression> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => Operator::Mul,
                Some(TokenKind::Slash) => Operator::Div,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expression::binary(left, op, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        if self.eat(&TokenKind::Minus) {
            let operand = self.parse_unary()?;
            return Ok(match operand {
                Expression::Literal(Value::Int(i)) => Expression::Literal(Value::Int(-i)),
                Expression::Literal(Value::Float(f)) => Expression::Literal(Value::Float(-f)),
                other => Expression::unary(UnaryOperator::Negate, other),
            });
        }
        if self.eat(&TokenKind::Bang) {
            let operand = self.parse_unary()?;
            return Ok(Expression::unary(UnaryOperator::Not, operand));
        }
        self.parse_primary()
    }

    // ========== Primary expressions ==========

    fn parse_primary(&mut self) -> Result<Expression> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.unexpected("expression"));
        };

        match token.kind {
            TokenKind::Int(i) => {
                self.pos += 1;
                Ok(Expression::Literal(Value::Int(i)))
            }
            TokenKind::Float(f) => {
                self.pos += 1;
                Ok(Expression::Literal(Value::Float(f)))
            }
            TokenKind::Str(s) => {
                self.pos += 1;
                Ok(Expression::Literal(Value::String(s)))
            }
            TokenKind::Star => {
                self.pos += 1;
                Ok(Expression::Wildcard)
            }
            TokenKind::LParen => self.parse_parenthesized(),
            TokenKind::At => {
                self.pos += 1;
                self.parse_observation_reference()
            }
            TokenKind::Ident(name) => self.parse_identifier(name, token.start),
            _ => Err(self.unexpected("expression")),
        }
    }

    /// `( expr )` or a literal list `( a, b, c )`
    fn parse_parenthesized(&mut self) -> Result<Expression> {
        self.expect(TokenKind::LParen, "'('")?;
        let first = self.parse_expression()?;
        if self.eat(&TokenKind::RParen) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            items.push(self.parse_expression()?);
        }
        self.expect(TokenKind::RParen, "')' or ','")?;
        Ok(Expression::List(items))
    }

    /// Right-hand side of `in`; a single parenthesised value is a one-element list
    fn parse_list(&mut self) -> Result<Expression> {
        if self.peek_kind() != Some(&TokenKind::LParen) {
            return Err(self.unexpected("'(' to start a list"));
        }
        Ok(match self.parse_parenthesized()? {
            list @ Expression::List(_) => list,
            single => Expression::List(vec![single]),
        })
    }

    /// After `@`: `entities.<type>` or a source-event attribute
    fn parse_observation_reference(&mut self) -> Result<Expression> {
        let name = self.expect_ident("'entities' or attribute name after '@'")?;
        if name.eq_ignore_ascii_case("entities") && self.peek_kind() == Some(&TokenKind::Dot) {
            self.pos += 1;
            let entity_type = self.expect_ident("entity type")?;
            return Ok(Expression::entity(EntityScope::Observation, entity_type));
        }
        let path = self.parse_dotted_tail(name)?;
        Ok(Expression::SourceAttribute(path))
    }

    fn parse_identifier(&mut self, name: String, start: usize) -> Result<Expression> {
        let lower = name.to_ascii_lowercase();
        if RESERVED.contains(&lower.as_str()) {
            return Err(ParseError::UnexpectedToken {
                found: name,
                expected: "expression".to_string(),
                position: start,
            });
        }
        self.pos += 1;

        match lower.as_str() {
            "true" => return Ok(Expression::Literal(Value::Bool(true))),
            "false" => return Ok(Expression::Literal(Value::Bool(false))),
            "null" => return Ok(Expression::Literal(Value::Null)),
            "obs_dt" => return Ok(Expression::ObservationDate),
            "event_type" => return Ok(Expression::EventField(EventField::Type)),
            "event_time" => return Ok(Expression::EventField(EventField::Time)),
            "event_id" => return Ok(Expression::EventField(EventField::Id)),
            "entities" if self.peek_kind() == Some(&TokenKind::Dot) => {
                self.pos += 1;
                let entity_type = self.expect_ident("entity type")?;
                return Ok(Expression::entity(EntityScope::Event, entity_type));
            }
            _ => {}
        }

        if self.peek_kind() == Some(&TokenKind::LParen) {
            return self.parse_call(name, start);
        }

        let path = self.parse_dotted_tail(name)?;
        Ok(Expression::Attribute(path))
    }

    /// Consume `.segment` repetitions after `head`
    fn parse_dotted_tail(&mut self, head: String) -> Result<String> {
        let mut path = head;
        while self.eat(&TokenKind::Dot) {
            let segment = self.expect_ident("attribute name after '.'")?;
            path.push('.');
            path.push_str(&segment);
        }
        Ok(path)
    }

    /// `name(args)` optionally followed by
    /// `over window [where ..] [group by .. | having min|max ..]`
    fn parse_call(&mut self, name: String, start: usize) -> Result<Expression> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if !self.eat(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if self.eat(&TokenKind::Comma) {
                    continue;
                }
                self.expect(TokenKind::RParen, "')' or ','")?;
                break;
            }
        }

        if !self.at_keyword("over") {
            return Ok(Expression::function_call(name, args));
        }
        let over_position = self.peek().map_or(start, |t| t.start);
        self.pos += 1;

        if args.is_empty() || args.len() > 2 {
            return Err(ParseError::UnexpectedToken {
                found: format!("{} argument(s)", args.len()),
                expected: format!("one or two arguments to aggregate '{}'", name),
                position: start,
            });
        }
        let argument = args.remove(0);
        let parameter = args.pop();
        let window = self.parse_window(over_position)?;

        let filter = if self.eat_keyword("where") {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let group_by = if self.eat_keyword("group") {
            self.expect_keyword("by")?;
            Some(self.parse_additive()?)
        } else {
            None
        };

        let having = if self.at_keyword("having") {
            let position = self.peek().map_or(start, |t| t.start);
            self.pos += 1;
            if group_by.is_some() {
                return Err(ParseError::UnexpectedToken {
                    found: "having".to_string(),
                    expected: "end of aggregate; group by and having cannot be combined".to_string(),
                    position,
                });
            }
            Some(self.parse_having()?)
        } else {
            None
        };

        Ok(Expression::aggregate(AggregateCall {
            function: name,
            argument,
            parameter,
            window,
            filter,
            group_by,
            having,
        }))
    }

    /// `min expr` or `max expr` after `having`
    fn parse_having(&mut self) -> Result<Having> {
        let kind = if self.eat_keyword("min") {
            HavingKind::Min
        } else if self.eat_keyword("max") {
            HavingKind::Max
        } else {
            return Err(self.unexpected("'min' or 'max' after 'having'"));
        };
        Ok(Having {
            kind,
            expr: self.parse_additive()?,
        })
    }

    fn parse_window(&mut self, over_position: usize) -> Result<Window> {
        let Some(token) = self.peek().cloned() else {
            return Err(ParseError::InvalidWindow {
                message: "missing window after 'over'".to_string(),
                position: over_position,
            });
        };
        let keyword = match &token.kind {
            TokenKind::Ident(word) => word.to_ascii_lowercase(),
            _ => {
                return Err(ParseError::InvalidWindow {
                    message: format!("unexpected '{}'", token.kind),
                    position: token.start,
                })
            }
        };
        self.pos += 1;

        let window = match keyword.as_str() {
            "last" | "previous" => {
                let (n, unit) = self.parse_window_length()?;
                Window::Last { n, unit }
            }
            "next" => {
                let (n, unit) = self.parse_window_length()?;
                Window::Next { n, unit }
            }
            "past" => Window::Past,
            "future" => Window::Future,
            "alltime" => Window::AllTime,
            "all" => {
                if !self.eat_keyword("time") {
                    return Err(ParseError::InvalidWindow {
                        message: "expected 'time' after 'all'".to_string(),
                        position: self.peek().map_or(self.input.len(), |t| t.start),
                    });
                }
                Window::AllTime
            }
            "ytd" => Window::YearToDate,
            "mtd" => Window::MonthToDate,
            other => {
                return Err(ParseError::InvalidWindow {
                    message: format!("unknown window '{}'", other),
                    position: token.start,
                })
            }
        };
        Ok(window)
    }

    /// `N unit` after `last` / `next`
    fn parse_window_length(&mut self) -> Result<(i64, TimeUnit)> {
        let position = self.peek().map_or(self.input.len(), |t| t.start);
        let n = match self.peek_kind() {
            Some(TokenKind::Int(n)) if *n > 0 => *n,
            Some(other) => {
                return Err(ParseError::InvalidWindow {
                    message: format!("window length must be a positive integer, got '{}'", other),
                    position,
                })
            }
            None => {
                return Err(ParseError::InvalidWindow {
                    message: "missing window length".to_string(),
                    position,
                })
            }
        };
        self.pos += 1;

        let unit_position = self.peek().map_or(self.input.len(), |t| t.start);
        let unit_name = self.expect_ident("time unit")?;
        let unit = unit_name
            .parse::<TimeUnit>()
            .map_err(|message| ParseError::InvalidWindow {
                message,
                position: unit_position,
            })?;
        Ok((n, unit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregate(expr: &Expression) -> &AggregateCall {
        match expr {
            Expression::Aggregate(call) => call,
            other => panic!("Expected aggregate, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_projections() {
        assert_eq!(ExpressionParser::parse("obs_dt").unwrap(), Expression::ObservationDate);
        assert_eq!(
            ExpressionParser::parse("@entities.city").unwrap(),
            Expression::entity(EntityScope::Observation, "city")
        );
        assert_eq!(
            ExpressionParser::parse("entities.team").unwrap(),
            Expression::entity(EntityScope::Event, "team")
        );
        assert_eq!(
            ExpressionParser::parse("@MaxTemp").unwrap(),
            Expression::SourceAttribute("MaxTemp".to_string())
        );
    }

    #[test]
    fn test_parse_simple_aggregate() {
        let expr = ExpressionParser::parse("avg(MaxTemp) over last 7 days").unwrap();
        let call = aggregate(&expr);
        assert_eq!(call.function, "avg");
        assert_eq!(call.argument, Expression::attribute("MaxTemp"));
        assert_eq!(
            call.window,
            Window::Last {
                n: 7,
                unit: TimeUnit::Day
            }
        );
        assert!(call.filter.is_none());
        assert!(call.group_by.is_none());
    }

    #[test]
    fn test_parse_full_aggregate_with_alias() {
        let feature = ExpressionParser::parse_feature(
            "avg(pressure) over past where pressure == 'static' group by pressure as f",
        )
        .unwrap();
        assert_eq!(feature.alias.as_deref(), Some("f"));
        assert_eq!(feature.name(), "f");
        let call = aggregate(&feature.expression);
        assert_eq!(call.window, Window::Past);
        assert_eq!(
            call.filter,
            Some(Expression::binary(
                Expression::attribute("pressure"),
                Operator::Eq,
                Expression::literal("static"),
            ))
        );
        assert_eq!(call.group_by, Some(Expression::attribute("pressure")));
    }

    #[test]
    fn test_parse_keywords_case_insensitive() {
        let expr = ExpressionParser::parse("SUM(value) OVER LAST 10 DAY WHERE event_type = 'transaction'")
            .unwrap();
        let call = aggregate(&expr);
        assert_eq!(
            call.filter,
            Some(Expression::binary(
                Expression::EventField(EventField::Type),
                Operator::Eq,
                Expression::literal("transaction"),
            ))
        );
    }

    #[test]
    fn test_parse_count_wildcard_all_time() {
        let expr = ExpressionParser::parse("count(*) over all time").unwrap();
        let call = aggregate(&expr);
        assert_eq!(call.argument, Expression::Wildcard);
        assert_eq!(call.window, Window::AllTime);
        assert_eq!(aggregate(&ExpressionParser::parse("count(*) over alltime").unwrap()).window, Window::AllTime);
    }

    #[test]
    fn test_parse_in_list() {
        let expr = ExpressionParser::parse("count(type) over past where type in ('a', 'b')").unwrap();
        let call = aggregate(&expr);
        assert_eq!(
            call.filter,
            Some(Expression::binary(
                Expression::attribute("type"),
                Operator::In,
                Expression::List(vec![Expression::literal("a"), Expression::literal("b")]),
            ))
        );
    }

    #[test]
    fn test_parse_not_in() {
        let expr = ExpressionParser::parse("team not in ('x')").unwrap();
        assert_eq!(
            expr,
            Expression::unary(
                UnaryOperator::Not,
                Expression::binary(
                    Expression::attribute("team"),
                    Operator::In,
                    Expression::List(vec![Expression::literal("x")]),
                )
            )
        );
    }

    #[test]
    fn test_parse_self_vs_event_entities() {
        let expr = ExpressionParser::parse(
            "sum(goals) over past where entities.home_team == @entities.team",
        )
        .unwrap();
        let call = aggregate(&expr);
        assert_eq!(
            call.filter,
            Some(Expression::binary(
                Expression::entity(EntityScope::Event, "home_team"),
                Operator::Eq,
                Expression::entity(EntityScope::Observation, "team"),
            ))
        );
    }

    #[test]
    fn test_parse_precedence() {
        let expr = ExpressionParser::parse("a + b * c > 10 and not d or e").unwrap();
        let expected = Expression::binary(
            Expression::binary(
                Expression::binary(
                    Expression::binary(
                        Expression::attribute("a"),
                        Operator::Add,
                        Expression::binary(
                            Expression::attribute("b"),
                            Operator::Mul,
                            Expression::attribute("c"),
                        ),
                    ),
                    Operator::Gt,
                    Expression::literal(10i64),
                ),
                Operator::And,
                Expression::unary(UnaryOperator::Not, Expression::attribute("d")),
            ),
            Operator::Or,
            Expression::attribute("e"),
        );
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_parse_aggregate_arithmetic() {
        let expr = ExpressionParser::parse("sum(x) over past / count(*) over past").unwrap();
        match expr {
            Expression::Binary { left, op, right } => {
                assert_eq!(op, Operator::Div);
                assert!(matches!(*left, Expression::Aggregate(_)));
                assert!(matches!(*right, Expression::Aggregate(_)));
            }
            other => panic!("Expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_negative_literal_folded() {
        assert_eq!(ExpressionParser::parse("-3").unwrap(), Expression::literal(-3i64));
        assert_eq!(ExpressionParser::parse("-2.5").unwrap(), Expression::literal(-2.5));
    }

    #[test]
    fn test_parse_dotted_attribute() {
        assert_eq!(
            ExpressionParser::parse("wind.speed").unwrap(),
            Expression::attribute("wind.speed")
        );
    }

    #[test]
    fn test_parse_scalar_function() {
        assert_eq!(
            ExpressionParser::parse("coalesce(a, 0)").unwrap(),
            Expression::function_call("coalesce", vec![Expression::attribute("a"), Expression::literal(0i64)])
        );
    }

    #[test]
    fn test_parse_error_positions() {
        let err = ExpressionParser::parse("avg(MaxTemp) over last seven days").unwrap_err();
        assert!(matches!(err, ParseError::InvalidWindow { position: 23, .. }));

        let err = ExpressionParser::parse("avg(MaxTemp) over").unwrap_err();
        assert!(matches!(err, ParseError::InvalidWindow { position: 13, .. }));

        let err = ExpressionParser::parse("a ==").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEnd { position: 4, .. }));

        let err = ExpressionParser::parse("avg(x) over past extra").unwrap_err();
        assert_eq!(err.position(), Some(17));
    }

    #[test]
    fn test_parse_error_bad_unit() {
        let err = ExpressionParser::parse("sum(x) over last 3 fortnights").unwrap_err();
        assert!(err.to_string().contains("unknown time unit"));
    }

    #[test]
    fn test_parse_error_zero_length_window() {
        let err = ExpressionParser::parse("sum(x) over last 0 days").unwrap_err();
        assert!(matches!(err, ParseError::InvalidWindow { .. }));
    }

    #[test]
    fn test_parse_error_aggregate_arity() {
        let err = ExpressionParser::parse("sum(a, b, c) over past").unwrap_err();
        assert!(err.to_string().contains("one or two arguments"));
    }

    #[test]
    fn test_parse_aggregate_parameter() {
        let expr = ExpressionParser::parse("nth(amount, -1) over last 3 days").unwrap();
        let call = aggregate(&expr);
        assert_eq!(call.function, "nth");
        assert_eq!(call.argument, Expression::attribute("amount"));
        assert_eq!(call.parameter, Some(Expression::literal(-1i64)));
    }

    #[test]
    fn test_parse_having() {
        let expr =
            ExpressionParser::parse("first(event_time) over past where temp > 0 having max temp")
                .unwrap();
        let call = aggregate(&expr);
        assert!(call.filter.is_some());
        assert_eq!(
            call.having,
            Some(Having {
                kind: HavingKind::Max,
                expr: Expression::attribute("temp"),
            })
        );

        let err = ExpressionParser::parse("count(*) over past having median temp").unwrap_err();
        assert!(err.to_string().contains("'min' or 'max'"));

        let err = ExpressionParser::parse("count(*) over past group by k having min temp").unwrap_err();
        assert!(err.to_string().contains("cannot be combined"));
    }

    #[test]
    fn test_parse_string_operators() {
        let expr = ExpressionParser::parse("name starts_with 'Syd' and name regex '^S.*y$'").unwrap();
        assert_eq!(
            expr,
            Expression::binary(
                Expression::binary(
                    Expression::attribute("name"),
                    Operator::StartsWith,
                    Expression::literal("Syd"),
                ),
                Operator::And,
                Expression::binary(
                    Expression::attribute("name"),
                    Operator::Regex,
                    Expression::literal("^S.*y$"),
                ),
            )
        );
        // the same word still works as a function name
        assert_eq!(
            ExpressionParser::parse("contains(name, 'x')").unwrap(),
            Expression::function_call("contains", vec![Expression::attribute("name"), Expression::literal("x")])
        );
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(ExpressionParser::parse("   ").unwrap_err(), ParseError::EmptyExpression);
    }

    #[test]
    fn test_parse_alias_requires_identifier() {
        let err = ExpressionParser::parse_feature("obs_dt as 'x'").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { position: 10, .. }));
    }
}
