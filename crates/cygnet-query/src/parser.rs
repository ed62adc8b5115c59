//! Cypher parser
//!
//! Recursive descent over the token stream produced by [`crate::lexer`].
//! The parser accepts more than the translator supports (OPTIONAL MATCH,
//! DELETE, SET, variable-length relationships, comprehensions); rejecting
//! those is the IR builder's job so that the error can name the construct.

use crate::ast::*;
use crate::lexer::{Spanned, Token, tokenize};
use cygnet_core::{Error, Result};

/// Parse a Cypher query string into an AST
pub fn parse(query: &str) -> Result<Query> {
    let tokens = tokenize(query)?;
    if tokens.is_empty() {
        return Err(Error::QueryParse("empty query".to_string()));
    }
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_query()
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    // ========== Token Helpers ==========

    fn peek(&self) -> Option<&Token> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, expected: &str) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &str) -> Error {
        match self.tokens.get(self.pos) {
            Some(found) => Error::QueryParse(format!(
                "expected {} but found `{}` at offset {}",
                expected, found.text, found.span.start
            )),
            None => Error::QueryParse(format!("expected {} but reached end of input", expected)),
        }
    }

    /// A name in label, key or alias position; keywords are allowed
    fn parse_name(&mut self) -> Result<String> {
        match self.peek() {
            Some(Token::Identifier(name)) | Some(Token::EscapedIdentifier(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            Some(token) if token.is_keyword() => {
                let text = self.tokens[self.pos].text.clone();
                self.pos += 1;
                Ok(text)
            }
            _ => Err(self.unexpected("a name")),
        }
    }

    /// A variable name; keywords are not variables
    fn parse_variable(&mut self) -> Result<String> {
        match self.peek() {
            Some(Token::Identifier(name)) | Some(Token::EscapedIdentifier(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected("a variable")),
        }
    }

    fn peek_variable(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Identifier(_)) | Some(Token::EscapedIdentifier(_))
        )
    }

    // ========== Clauses ==========

    fn parse_query(&mut self) -> Result<Query> {
        let clauses = self.parse_single_query()?;
        let mut union = Vec::new();
        while self.eat(&Token::Union) {
            let all = self.eat(&Token::All);
            let clauses = self.parse_single_query()?;
            union.push(UnionPart { all, clauses });
        }
        if self.peek().is_some() {
            return Err(self.unexpected("a clause or end of input"));
        }
        Ok(Query { clauses, union })
    }

    fn parse_single_query(&mut self) -> Result<Vec<Clause>> {
        let mut clauses = Vec::new();
        loop {
            let clause = match self.peek() {
                Some(Token::Match) => {
                    self.pos += 1;
                    Clause::Match(self.parse_match()?)
                }
                Some(Token::Optional) => {
                    self.pos += 1;
                    self.expect(&Token::Match, "MATCH")?;
                    Clause::OptionalMatch(self.parse_match()?)
                }
                Some(Token::With) => {
                    self.pos += 1;
                    Clause::With(self.parse_projection(true)?)
                }
                Some(Token::Return) => {
                    self.pos += 1;
                    Clause::Return(self.parse_projection(false)?)
                }
                Some(Token::Unwind) => {
                    self.pos += 1;
                    let expression = self.parse_expression()?;
                    self.expect(&Token::As, "AS")?;
                    let variable = self.parse_variable()?;
                    Clause::Unwind(UnwindClause {
                        expression,
                        variable,
                    })
                }
                Some(Token::Create) => {
                    self.pos += 1;
                    Clause::Create(CreateClause {
                        patterns: self.parse_pattern_list()?,
                    })
                }
                Some(Token::Detach) | Some(Token::Delete) => {
                    let detach = self.eat(&Token::Detach);
                    self.expect(&Token::Delete, "DELETE")?;
                    let mut expressions = vec![self.parse_expression()?];
                    while self.eat(&Token::Comma) {
                        expressions.push(self.parse_expression()?);
                    }
                    Clause::Delete(DeleteClause {
                        detach,
                        expressions,
                    })
                }
                Some(Token::Set) => {
                    self.pos += 1;
                    Clause::Set(self.parse_set()?)
                }
                _ => break,
            };
            clauses.push(clause);
        }

        if clauses.is_empty() {
            return Err(self.unexpected("a clause"));
        }
        Ok(clauses)
    }

    fn parse_match(&mut self) -> Result<MatchClause> {
        let patterns = self.parse_pattern_list()?;
        let where_clause = if self.eat(&Token::Where) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(MatchClause {
            patterns,
            where_clause,
        })
    }

    fn parse_projection(&mut self, is_with: bool) -> Result<ProjectionClause> {
        let distinct = self.eat(&Token::Distinct);

        let mut items = Vec::new();
        loop {
            if self.eat(&Token::Star) {
                items.push(ReturnItem {
                    expression: Expression::Star,
                    alias: None,
                });
            } else {
                let expression = self.parse_expression()?;
                let alias = if self.eat(&Token::As) {
                    Some(self.parse_name()?)
                } else {
                    None
                };
                items.push(ReturnItem { expression, alias });
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }

        let mut order_by = Vec::new();
        if self.eat(&Token::Order) {
            self.expect(&Token::By, "BY")?;
            loop {
                let expression = self.parse_expression()?;
                let ascending = if self.eat(&Token::Desc) {
                    false
                } else {
                    self.eat(&Token::Asc);
                    true
                };
                order_by.push(OrderItem {
                    expression,
                    ascending,
                });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }

        // SKIP and LIMIT are accepted in either order
        let mut skip = None;
        let mut limit = None;
        loop {
            if skip.is_none() && self.eat(&Token::Skip) {
                skip = Some(self.parse_expression()?);
            } else if limit.is_none() && self.eat(&Token::Limit) {
                limit = Some(self.parse_expression()?);
            } else {
                break;
            }
        }

        let where_clause = if is_with && self.eat(&Token::Where) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(ProjectionClause {
            distinct,
            items,
            order_by,
            skip,
            limit,
            where_clause,
        })
    }

    fn parse_set(&mut self) -> Result<SetClause> {
        let mut items = Vec::new();
        loop {
            let variable = self.parse_variable()?;
            let item = if self.eat(&Token::Dot) {
                let property = self.parse_name()?;
                self.expect(&Token::Equals, "=")?;
                SetItem::Property {
                    entity: variable,
                    property,
                    value: self.parse_expression()?,
                }
            } else if self.check(&Token::Colon) {
                let mut labels = Vec::new();
                while self.eat(&Token::Colon) {
                    labels.push(self.parse_name()?);
                }
                SetItem::Labels { variable, labels }
            } else {
                self.expect(&Token::Equals, "=")?;
                SetItem::AllProperties {
                    variable,
                    value: self.parse_expression()?,
                }
            };
            items.push(item);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(SetClause { items })
    }

    // ========== Patterns ==========

    fn parse_pattern_list(&mut self) -> Result<Vec<Pattern>> {
        let mut patterns = vec![self.parse_pattern()?];
        while self.eat(&Token::Comma) {
            patterns.push(self.parse_pattern()?);
        }
        Ok(patterns)
    }

    fn parse_pattern(&mut self) -> Result<Pattern> {
        let variable = if self.peek_variable() && self.peek_at(1) == Some(&Token::Equals) {
            let name = self.parse_variable()?;
            self.pos += 1;
            Some(name)
        } else {
            None
        };

        let mut elements = vec![PatternElement::Node(self.parse_node_pattern()?)];
        while let Some(relationship) = self.parse_relationship_pattern()? {
            elements.push(PatternElement::Relationship(relationship));
            elements.push(PatternElement::Node(self.parse_node_pattern()?));
        }
        Ok(Pattern { variable, elements })
    }

    fn parse_node_pattern(&mut self) -> Result<NodePattern> {
        self.expect(&Token::LParen, "`(`")?;
        let variable = if self.peek_variable() {
            Some(self.parse_variable()?)
        } else {
            None
        };
        let mut labels = Vec::new();
        while self.eat(&Token::Colon) {
            labels.push(self.parse_name()?);
        }
        let properties = if self.check(&Token::LBrace) {
            Some(self.parse_map()?)
        } else {
            None
        };
        self.expect(&Token::RParen, "`)`")?;
        Ok(NodePattern {
            variable,
            labels,
            properties,
        })
    }

    fn starts_relationship(&self) -> bool {
        match self.peek() {
            Some(Token::ArrowRight) | Some(Token::ArrowLeft) | Some(Token::DoubleDash) => true,
            Some(Token::Minus) | Some(Token::ArrowLeftDash) => {
                self.peek_at(1) == Some(&Token::LBracket)
            }
            _ => false,
        }
    }

    fn parse_relationship_pattern(&mut self) -> Result<Option<RelationshipPattern>> {
        if !self.starts_relationship() {
            return Ok(None);
        }

        let empty = |direction| RelationshipPattern {
            variable: None,
            rel_types: Vec::new(),
            direction,
            properties: None,
            length: None,
        };

        let relationship = match self.advance().map(|s| s.token) {
            Some(Token::ArrowRight) => empty(RelationshipDirection::Outgoing),
            Some(Token::DoubleDash) => empty(RelationshipDirection::Both),
            Some(Token::ArrowLeft) => {
                if self.eat(&Token::GreaterThan) {
                    empty(RelationshipDirection::Both)
                } else {
                    empty(RelationshipDirection::Incoming)
                }
            }
            Some(Token::Minus) => {
                let mut rel = self.parse_relationship_detail()?;
                rel.direction = if self.eat(&Token::DashArrowRight) {
                    RelationshipDirection::Outgoing
                } else {
                    self.expect(&Token::Minus, "`-` or `->`")?;
                    RelationshipDirection::Both
                };
                rel
            }
            Some(Token::ArrowLeftDash) => {
                let mut rel = self.parse_relationship_detail()?;
                rel.direction = if self.eat(&Token::DashArrowRight) {
                    RelationshipDirection::Both
                } else {
                    self.expect(&Token::Minus, "`-`")?;
                    RelationshipDirection::Incoming
                };
                rel
            }
            _ => return Err(self.unexpected("a relationship")),
        };
        Ok(Some(relationship))
    }

    fn parse_relationship_detail(&mut self) -> Result<RelationshipPattern> {
        self.expect(&Token::LBracket, "`[`")?;
        let variable = if self.peek_variable() {
            Some(self.parse_variable()?)
        } else {
            None
        };

        let mut rel_types = Vec::new();
        if self.eat(&Token::Colon) {
            rel_types.push(self.parse_name()?);
            while self.eat(&Token::Pipe) {
                self.eat(&Token::Colon);
                rel_types.push(self.parse_name()?);
            }
        }

        let length = if self.eat(&Token::Star) {
            let min = self.parse_length_bound()?;
            let max = if self.eat(&Token::DoubleDot) {
                self.parse_length_bound()?
            } else {
                min
            };
            Some(RelationshipLength { min, max })
        } else {
            None
        };

        let properties = if self.check(&Token::LBrace) {
            Some(self.parse_map()?)
        } else {
            None
        };
        self.expect(&Token::RBracket, "`]`")?;

        Ok(RelationshipPattern {
            variable,
            rel_types,
            direction: RelationshipDirection::Both,
            properties,
            length,
        })
    }

    fn parse_length_bound(&mut self) -> Result<Option<u32>> {
        match self.peek() {
            Some(Token::Integer(i)) => {
                let bound = u32::try_from(*i).map_err(|_| self.unexpected("a path length"))?;
                self.pos += 1;
                Ok(Some(bound))
            }
            _ => Ok(None),
        }
    }

    /// True when the parenthesis at the cursor opens a pattern rather than
    /// a parenthesized expression
    fn looks_like_pattern(&mut self) -> bool {
        let start = self.pos;
        let is_pattern = self.parse_node_pattern().is_ok() && self.starts_relationship();
        self.pos = start;
        is_pattern
    }

    // ========== Expressions ==========

    fn parse_expression(&mut self) -> Result<Expression> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expression> {
        let mut left = self.parse_xor()?;
        while self.eat(&Token::Or) {
            let right = self.parse_xor()?;
            left = Expression::binary(left, BinaryOp::Or, right);
        }
        Ok(left)
    }

    fn parse_xor(&mut self) -> Result<Expression> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Xor) {
            let right = self.parse_and()?;
            left = Expression::binary(left, BinaryOp::Xor, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression> {
        let mut left = self.parse_not()?;
        while self.eat(&Token::And) {
            let right = self.parse_not()?;
            left = Expression::binary(left, BinaryOp::And, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expression> {
        if self.eat(&Token::Not) {
            let operand = self.parse_not()?;
            return Ok(Expression::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn comparison_op(&self) -> Option<BinaryOp> {
        match self.peek()? {
            Token::Equals => Some(BinaryOp::Equals),
            Token::NotEquals => Some(BinaryOp::NotEquals),
            Token::LessThan => Some(BinaryOp::LessThan),
            Token::LessEquals => Some(BinaryOp::LessEquals),
            Token::GreaterThan => Some(BinaryOp::GreaterThan),
            Token::GreaterEquals => Some(BinaryOp::GreaterEquals),
            _ => None,
        }
    }

    /// Comparisons chain: `a < b <= c` means `a < b AND b <= c`
    fn parse_comparison(&mut self) -> Result<Expression> {
        let first = self.parse_predicate()?;
        let mut operands = vec![first];
        let mut ops = Vec::new();
        while let Some(op) = self.comparison_op() {
            self.pos += 1;
            ops.push(op);
            operands.push(self.parse_predicate()?);
        }

        if ops.is_empty() {
            return Ok(operands.remove(0));
        }

        let mut chain: Option<Expression> = None;
        for (i, op) in ops.into_iter().enumerate() {
            let link = Expression::binary(operands[i].clone(), op, operands[i + 1].clone());
            chain = Some(match chain {
                Some(previous) => Expression::binary(previous, BinaryOp::And, link),
                None => link,
            });
        }
        chain.ok_or_else(|| self.unexpected("a comparison"))
    }

    fn parse_predicate(&mut self) -> Result<Expression> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Starts) => {
                    self.pos += 1;
                    self.expect(&Token::With, "WITH")?;
                    BinaryOp::StartsWith
                }
                Some(Token::Ends) => {
                    self.pos += 1;
                    self.expect(&Token::With, "WITH")?;
                    BinaryOp::EndsWith
                }
                Some(Token::Contains) => {
                    self.pos += 1;
                    BinaryOp::Contains
                }
                Some(Token::In) => {
                    self.pos += 1;
                    BinaryOp::In
                }
                Some(Token::Is) => {
                    self.pos += 1;
                    let negated = self.eat(&Token::Not);
                    self.expect(&Token::Null, "NULL")?;
                    left = Expression::Unary {
                        op: if negated {
                            UnaryOp::IsNotNull
                        } else {
                            UnaryOp::IsNull
                        },
                        operand: Box::new(left),
                    };
                    continue;
                }
                _ => break,
            };
            let right = self.parse_additive()?;
            left = Expression::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Subtract,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_multiplicative()?;
            left = Expression::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression> {
        let mut left = self.parse_power()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Multiply,
                Some(Token::Slash) => BinaryOp::Divide,
                Some(Token::Percent) => BinaryOp::Modulo,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_power()?;
            left = Expression::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_power(&mut self) -> Result<Expression> {
        let mut left = self.parse_unary()?;
        while self.eat(&Token::Caret) {
            let right = self.parse_unary()?;
            left = Expression::binary(left, BinaryOp::Power, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        if self.eat(&Token::Minus) {
            return match self.peek() {
                Some(Token::Integer(i)) => {
                    let literal = Literal::Integer(-*i);
                    self.pos += 1;
                    Ok(Expression::Literal(literal))
                }
                Some(Token::Float(x)) => {
                    let literal = Literal::Float(-*x);
                    self.pos += 1;
                    Ok(Expression::Literal(literal))
                }
                _ => Ok(Expression::Unary {
                    op: UnaryOp::Negate,
                    operand: Box::new(self.parse_unary()?),
                }),
            };
        }
        self.eat(&Token::Plus);
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expression> {
        let mut expression = self.parse_atom()?;
        while self.eat(&Token::Dot) {
            let key = self.parse_name()?;
            expression = Expression::property(expression, key);
        }
        Ok(expression)
    }

    fn parse_atom(&mut self) -> Result<Expression> {
        let literal = match self.peek() {
            Some(Token::Integer(i)) => Some(Literal::Integer(*i)),
            Some(Token::Float(x)) => Some(Literal::Float(*x)),
            Some(Token::String(s)) => Some(Literal::String(s.clone())),
            Some(Token::True) => Some(Literal::Boolean(true)),
            Some(Token::False) => Some(Literal::Boolean(false)),
            Some(Token::Null) => Some(Literal::Null),
            _ => None,
        };
        if let Some(literal) = literal {
            self.pos += 1;
            return Ok(Expression::Literal(literal));
        }

        match self.peek() {
            Some(Token::Parameter(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(Expression::Parameter(name))
            }
            Some(Token::LBracket) => self.parse_list(),
            Some(Token::LBrace) => Ok(Expression::Map(self.parse_map()?)),
            Some(Token::Case) => self.parse_case(),
            Some(Token::LParen) => {
                if self.looks_like_pattern() {
                    return Ok(Expression::Pattern(self.parse_pattern()?));
                }
                self.pos += 1;
                let inner = self.parse_expression()?;
                self.expect(&Token::RParen, "`)`")?;
                Ok(inner)
            }
            Some(Token::Identifier(_)) | Some(Token::EscapedIdentifier(_)) => {
                let name = self.parse_variable()?;
                if self.eat(&Token::LParen) {
                    self.parse_function_call(name)
                } else {
                    Ok(Expression::Variable(name))
                }
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_function_call(&mut self, name: String) -> Result<Expression> {
        let mut args = Vec::new();
        let mut distinct = false;
        if self.eat(&Token::Star) {
            args.push(Expression::Star);
        } else if !self.check(&Token::RParen) {
            distinct = self.eat(&Token::Distinct);
            args.push(self.parse_expression()?);
            while self.eat(&Token::Comma) {
                args.push(self.parse_expression()?);
            }
        }
        self.expect(&Token::RParen, "`)`")?;
        Ok(Expression::Function {
            name,
            args,
            distinct,
        })
    }

    fn parse_list(&mut self) -> Result<Expression> {
        self.expect(&Token::LBracket, "`[`")?;

        if self.peek_variable() && self.peek_at(1) == Some(&Token::In) {
            let variable = self.parse_variable()?;
            self.pos += 1;
            let list = self.parse_expression()?;
            let filter = if self.eat(&Token::Where) {
                Some(Box::new(self.parse_expression()?))
            } else {
                None
            };
            let projection = if self.eat(&Token::Pipe) {
                Some(Box::new(self.parse_expression()?))
            } else {
                None
            };
            self.expect(&Token::RBracket, "`]`")?;
            return Ok(Expression::ListComprehension {
                variable,
                list: Box::new(list),
                filter,
                projection,
            });
        }

        let mut items = Vec::new();
        if !self.eat(&Token::RBracket) {
            items.push(self.parse_expression()?);
            while self.eat(&Token::Comma) {
                items.push(self.parse_expression()?);
            }
            self.expect(&Token::RBracket, "`]`")?;
        }
        Ok(Expression::List(items))
    }

    fn parse_map(&mut self) -> Result<MapExpression> {
        self.expect(&Token::LBrace, "`{`")?;
        let mut entries = Vec::new();
        if !self.eat(&Token::RBrace) {
            loop {
                let key = self.parse_name()?;
                self.expect(&Token::Colon, "`:`")?;
                entries.push((key, self.parse_expression()?));
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::RBrace, "`}`")?;
        }
        Ok(MapExpression { entries })
    }

    fn parse_case(&mut self) -> Result<Expression> {
        self.expect(&Token::Case, "CASE")?;
        let operand = if self.check(&Token::When) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };

        let mut when_clauses = Vec::new();
        while self.eat(&Token::When) {
            let when = self.parse_expression()?;
            self.expect(&Token::Then, "THEN")?;
            when_clauses.push((when, self.parse_expression()?));
        }
        if when_clauses.is_empty() {
            return Err(self.unexpected("WHEN"));
        }

        let else_clause = if self.eat(&Token::Else) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        self.expect(&Token::End, "END")?;

        Ok(Expression::Case {
            operand,
            when_clauses,
            else_clause,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projection(clause: &Clause) -> &ProjectionClause {
        match clause {
            Clause::With(p) | Clause::Return(p) => p,
            other => panic!("expected projection, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_match_return() {
        let query = parse("MATCH (n:person {name: 'marko'}) RETURN n.age AS age").unwrap();
        assert_eq!(query.clauses.len(), 2);

        match &query.clauses[0] {
            Clause::Match(m) => {
                let PatternElement::Node(node) = &m.patterns[0].elements[0] else {
                    panic!("expected node");
                };
                assert_eq!(node.variable.as_deref(), Some("n"));
                assert_eq!(node.labels, vec!["person".to_string()]);
                assert_eq!(node.properties.as_ref().unwrap().entries.len(), 1);
            }
            other => panic!("expected MATCH, got {:?}", other),
        }

        let ret = projection(&query.clauses[1]);
        assert_eq!(ret.items[0].output_name(), "age");
    }

    #[test]
    fn test_parse_relationship_directions() {
        let query = parse("MATCH (a)-[r:knows|created]->(b)<-[:x]-(c)-[]-(d)--(e) RETURN a").unwrap();
        let Clause::Match(m) = &query.clauses[0] else {
            panic!("expected MATCH");
        };
        let directions: Vec<_> = m.patterns[0]
            .elements
            .iter()
            .filter_map(|e| match e {
                PatternElement::Relationship(r) => Some(r.direction),
                _ => None,
            })
            .collect();
        assert_eq!(
            directions,
            vec![
                RelationshipDirection::Outgoing,
                RelationshipDirection::Incoming,
                RelationshipDirection::Both,
                RelationshipDirection::Both,
            ]
        );
    }

    #[test]
    fn test_chained_comparison_desugars_to_and() {
        let query = parse("MATCH (p) WHERE 27 <= p.age < 32 RETURN p").unwrap();
        let Clause::Match(m) = &query.clauses[0] else {
            panic!("expected MATCH");
        };
        let expected = Expression::binary(
            Expression::binary(
                Expression::literal(27),
                BinaryOp::LessEquals,
                Expression::property(Expression::variable("p"), "age"),
            ),
            BinaryOp::And,
            Expression::binary(
                Expression::property(Expression::variable("p"), "age"),
                BinaryOp::LessThan,
                Expression::literal(32),
            ),
        );
        assert_eq!(m.where_clause.as_ref(), Some(&expected));
    }

    #[test]
    fn test_skip_and_limit_in_either_order() {
        let a = parse("UNWIND [1,2,3] AS i RETURN i SKIP 1 LIMIT 2").unwrap();
        let b = parse("UNWIND [1,2,3] AS i RETURN i LIMIT 2 SKIP 1").unwrap();
        assert_eq!(projection(&a.clauses[1]), projection(&b.clauses[1]));
    }

    #[test]
    fn test_with_where_and_order() {
        let query = parse("MATCH (n) WITH n.name AS name ORDER BY name DESC LIMIT 3 WHERE name STARTS WITH 'm' RETURN name").unwrap();
        let with = projection(&query.clauses[1]);
        assert!(!with.order_by[0].ascending);
        assert!(with.limit.is_some());
        assert!(matches!(
            with.where_clause,
            Some(Expression::Binary {
                op: BinaryOp::StartsWith,
                ..
            })
        ));
    }

    #[test]
    fn test_union() {
        let query = parse("RETURN 1 AS x UNION ALL RETURN 2 AS x UNION RETURN 3 AS x").unwrap();
        assert_eq!(query.union.len(), 2);
        assert!(query.union[0].all);
        assert!(!query.union[1].all);
    }

    #[test]
    fn test_functions_and_case() {
        let query = parse(
            "MATCH (n) RETURN count(*), count(DISTINCT n.age), CASE WHEN n.age > 30 THEN 'old' ELSE 'young' END AS c",
        )
        .unwrap();
        let ret = projection(&query.clauses[1]);
        assert_eq!(ret.items[0].output_name(), "count(*)");
        assert!(matches!(
            &ret.items[1].expression,
            Expression::Function { distinct: true, .. }
        ));
        assert!(matches!(&ret.items[2].expression, Expression::Case { .. }));
    }

    #[test]
    fn test_pattern_expression_and_comprehension() {
        let query = parse("MATCH (a) WHERE (a)-->() RETURN [x IN [1,2] WHERE x > 1 | x]").unwrap();
        let Clause::Match(m) = &query.clauses[0] else {
            panic!("expected MATCH");
        };
        assert!(matches!(m.where_clause, Some(Expression::Pattern(_))));
        let ret = projection(&query.clauses[1]);
        assert!(matches!(
            ret.items[0].expression,
            Expression::ListComprehension { .. }
        ));
    }

    #[test]
    fn test_parenthesized_expression_is_not_a_pattern() {
        let query = parse("RETURN (1 + 2) * 3 AS x").unwrap();
        let ret = projection(&query.clauses[0]);
        assert!(matches!(
            ret.items[0].expression,
            Expression::Binary {
                op: BinaryOp::Multiply,
                ..
            }
        ));
    }

    #[test]
    fn test_create_and_unsupported_clauses_parse() {
        assert!(parse("CREATE (n:person {name: 'x'})-[:knows]->(m:person)").is_ok());
        assert!(parse("MATCH (n) DETACH DELETE n").is_ok());
        assert!(parse("MATCH (n) SET n.age = 1").is_ok());
        assert!(parse("OPTIONAL MATCH (n) RETURN n").is_ok());
        assert!(parse("MATCH (a)-[*1..3]->(b) RETURN b").is_ok());
    }

    #[test]
    fn test_syntax_errors() {
        for bad in ["", "MATCH (n RETURN n", "RETURN", "MATCH (n) RETURN n n", "INVALID"] {
            let err = parse(bad).unwrap_err();
            assert!(
                err.to_string().contains("Invalid input"),
                "{} gave {}",
                bad,
                err
            );
        }
    }

    #[test]
    fn test_keywords_as_property_keys() {
        let query = parse("WITH {end: 1} AS m RETURN m.end").unwrap();
        let ret = projection(&query.clauses[1]);
        assert_eq!(ret.items[0].output_name(), "m.end");
    }
}
