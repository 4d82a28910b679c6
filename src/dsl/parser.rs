//! Parser for the netlist DSL.

use std::collections::{HashMap, HashSet};

use super::ast::*;
use super::lexer::{parse_value, Lexer, Token, TokenKind};
use crate::circuit::Shape;
use crate::error::{KirchhoffError, Result};

/// Parser for netlist DSL.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    /// Every name declared by a directive
    declared: HashSet<String>,
}

impl<'a> Parser<'a> {
    /// Create a new parser with the given lexer.
    pub fn new(lexer: Lexer<'a>) -> Self {
        Self {
            lexer,
            // Consumed by the first `advance`
            current: Token {
                kind: TokenKind::Newline,
                text: String::new(),
                line: 0,
                column: 0,
            },
            declared: HashSet::new(),
        }
    }

    /// Parse the entire netlist.
    pub fn parse(&mut self) -> Result<CircuitAst> {
        let mut ast = CircuitAst::new();
        self.advance()?;

        while self.current.kind != TokenKind::Eof {
            match self.current.kind {
                TokenKind::Newline => {
                    self.advance()?;
                    continue;
                }
                TokenKind::Directive => self.parse_directive(&mut ast)?,
                TokenKind::Identifier => {
                    let component = self.parse_component()?;
                    if ast.components.iter().any(|c| c.name == component.name) {
                        return Err(KirchhoffError::DuplicateComponent { name: component.name });
                    }
                    ast.components.push(component);
                }
                _ => {
                    return Err(KirchhoffError::parse(
                        self.current.line,
                        format!("unexpected token: {:?}", self.current.text),
                    ));
                }
            }

            match self.current.kind {
                TokenKind::Newline => self.advance()?,
                TokenKind::Eof => {}
                _ => {
                    return Err(KirchhoffError::parse(
                        self.current.line,
                        format!("unexpected trailing token: {:?}", self.current.text),
                    ));
                }
            }
        }

        Ok(ast)
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn at_line_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Newline | TokenKind::Eof)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.current.kind == kind {
            let tok = self.current.clone();
            self.advance()?;
            Ok(tok)
        } else {
            Err(KirchhoffError::parse(
                self.current.line,
                format!("expected {:?}, got {:?}", kind, self.current.kind),
            ))
        }
    }

    fn number(&mut self, line: usize) -> Result<f64> {
        let tok = self.expect(TokenKind::Number)?;
        parse_value(&tok.text).ok_or_else(|| KirchhoffError::parse(line, format!("invalid number: {}", tok.text)))
    }

    /// A name introduced by a directive; names share one namespace.
    fn declare(&mut self, line: usize) -> Result<String> {
        let name = self.expect(TokenKind::Identifier)?.text;
        if !self.declared.insert(name.clone()) {
            return Err(KirchhoffError::parse(line, format!("'{}' is declared twice", name)));
        }
        Ok(name)
    }

    /// Optional `[n]` array length.
    fn array_len(&mut self, line: usize) -> Result<Option<usize>> {
        if self.current.kind != TokenKind::OpenBracket {
            return Ok(None);
        }
        self.advance()?;
        let len = self.number(line)?;
        self.expect(TokenKind::CloseBracket)?;
        if len < 1.0 || len.fract() != 0.0 {
            return Err(KirchhoffError::parse(line, format!("invalid array length: {}", len)));
        }
        Ok(Some(len as usize))
    }

    fn parse_directive(&mut self, ast: &mut CircuitAst) -> Result<()> {
        let directive = self.current.text.clone();
        let line = self.current.line;
        self.advance()?;

        match directive.to_lowercase().as_str() {
            ".node" => {
                let node = self.parse_node_decl(line)?;
                ast.nodes.push(node);
            }
            ".input" => {
                let port = self.parse_port_decl(line)?;
                ast.inputs.push(port);
            }
            ".heatport" => {
                let port = self.parse_port_decl(line)?;
                ast.heat_ports.push(port);
            }
            ".control" => {
                let control = self.parse_control_decl(line)?;
                ast.controls.push(control);
            }
            ".flange" => {
                let name = self.declare(line)?;
                ast.flanges.push(PortDecl {
                    name,
                    shape: Shape::Scalar,
                    line,
                });
            }
            ".model" => {
                let model = self.parse_model_def(line)?;
                if ast.models.contains_key(&model.name) {
                    return Err(KirchhoffError::DuplicateModel { name: model.name });
                }
                ast.models.insert(model.name.clone(), model);
            }
            _ => {
                return Err(KirchhoffError::parse(line, format!("unknown directive: {}", directive)));
            }
        }

        Ok(())
    }

    /// `.control NAME [init=0|1]`
    fn parse_control_decl(&mut self, line: usize) -> Result<ControlDecl> {
        let name = self.declare(line)?;
        let mut initial = false;

        while !self.at_line_end() {
            let word = self.expect(TokenKind::Identifier)?.text;
            if !word.eq_ignore_ascii_case("init") {
                return Err(KirchhoffError::parse(line, format!("unknown control option: {}", word)));
            }
            self.expect(TokenKind::Equals)?;
            let value = self.number(line)?;
            initial = match value {
                v if v == 0.0 => false,
                v if v == 1.0 => true,
                v => {
                    return Err(KirchhoffError::parse(line, format!("control init must be 0 or 1, got {}", v)));
                }
            };
        }

        Ok(ControlDecl { name, initial, line })
    }

    /// `.node NAME[n] [complex] [init=V]`
    fn parse_node_decl(&mut self, line: usize) -> Result<NodeDecl> {
        let name = self.declare(line)?;
        let len = self.array_len(line)?;
        let mut complex = false;
        let mut initial = None;

        while !self.at_line_end() {
            let word = self.expect(TokenKind::Identifier)?.text;
            match word.to_lowercase().as_str() {
                "complex" => complex = true,
                "init" => {
                    self.expect(TokenKind::Equals)?;
                    initial = Some(self.number(line)?);
                }
                _ => {
                    return Err(KirchhoffError::parse(line, format!("unknown node option: {}", word)));
                }
            }
        }

        let shape = match (complex, len) {
            (true, n) => Shape::Complex(n.unwrap_or(1)),
            (false, Some(n)) => Shape::Array(n),
            (false, None) => Shape::Scalar,
        };
        Ok(NodeDecl {
            name,
            shape,
            initial,
            line,
        })
    }

    /// `.input NAME[n]`, `.heatport NAME[n]`
    fn parse_port_decl(&mut self, line: usize) -> Result<PortDecl> {
        let name = self.declare(line)?;
        let shape = match self.array_len(line)? {
            Some(n) => Shape::Array(n),
            None => Shape::Scalar,
        };
        Ok(PortDecl { name, shape, line })
    }

    /// `.model NAME TYPE (key=value ...)`
    fn parse_model_def(&mut self, line: usize) -> Result<ModelDef> {
        let name = self.expect(TokenKind::Identifier)?.text;
        let type_str = self.expect(TokenKind::Identifier)?.text;

        let model_type = ModelType::parse(&type_str)
            .ok_or_else(|| KirchhoffError::parse(line, format!("unknown model type: {}", type_str)))?;

        let mut params = HashMap::new();

        if self.current.kind == TokenKind::OpenParen {
            self.advance()?;

            while self.current.kind != TokenKind::CloseParen && !self.at_line_end() {
                let param_name = self.expect(TokenKind::Identifier)?.text;
                self.expect(TokenKind::Equals)?;
                let value = self.number(line)?;
                params.insert(param_name.to_lowercase(), value);
            }

            self.expect(TokenKind::CloseParen)?;
        }

        Ok(ModelDef {
            name,
            model_type,
            params,
            line,
        })
    }

    fn parse_component(&mut self) -> Result<ComponentDef> {
        let first_token = self.current.text.clone();
        let line = self.current.line;
        self.advance()?;

        // `THY T1 ...` names the type on its own; `THY1 ...` prefixes the name
        let (component_type, name) = if let Some(ct) = ComponentType::from_keyword(&first_token) {
            let actual_name = self.expect(TokenKind::Identifier)?.text;
            (ct, actual_name)
        } else {
            let ct = ComponentType::from_name(&first_token).ok_or_else(|| KirchhoffError::UnknownComponentType {
                component_type: first_token.clone(),
                line,
            })?;
            (ct, first_token)
        };

        let (min_nodes, max_nodes) = component_type.node_count();
        let mut nodes = Vec::with_capacity(max_nodes);
        let mut value = None;
        let mut reference = None;
        let mut params = HashMap::new();

        while !self.at_line_end() {
            let tok = self.current.clone();
            self.advance()?;

            match tok.kind {
                TokenKind::Identifier | TokenKind::Number => {
                    if self.current.kind == TokenKind::Equals {
                        self.advance()?;
                        let param = self.parse_param_value(&name, &tok.text, line)?;
                        params.insert(tok.text.to_lowercase(), param);
                    } else if nodes.len() < max_nodes {
                        nodes.push(if is_ground(&tok.text) { "0".to_string() } else { tok.text });
                    } else if let Some(v) = parse_value(&tok.text) {
                        if value.replace(v).is_some() {
                            return Err(KirchhoffError::invalid_component(&name, line, "more than one value"));
                        }
                    } else if tok.kind == TokenKind::Identifier && reference.is_none() {
                        reference = Some(tok.text);
                    } else {
                        return Err(KirchhoffError::invalid_component(
                            &name,
                            line,
                            format!("unexpected '{}'", tok.text),
                        ));
                    }
                }
                _ => {
                    return Err(KirchhoffError::parse(line, format!("unexpected token: {:?}", tok.text)));
                }
            }
        }

        if nodes.len() < min_nodes {
            return Err(KirchhoffError::invalid_component(
                &name,
                line,
                format!("expected {} nodes, got {}", min_nodes, nodes.len()),
            ));
        }

        Ok(ComponentDef {
            component_type,
            name,
            nodes,
            value,
            reference,
            params,
            line,
        })
    }

    fn parse_param_value(&mut self, component: &str, key: &str, line: usize) -> Result<ParamValue> {
        let tok = self.current.clone();
        match tok.kind {
            TokenKind::Number => {
                self.advance()?;
                parse_value(&tok.text).map(ParamValue::Number).ok_or_else(|| KirchhoffError::InvalidParameter {
                    component: component.to_string(),
                    param: key.to_string(),
                    message: format!("invalid number: {}", tok.text),
                })
            }
            TokenKind::Identifier => {
                self.advance()?;
                Ok(ParamValue::Name(tok.text))
            }
            _ => Err(KirchhoffError::parse(line, format!("expected a value for '{}'", key))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::parse;

    #[test]
    fn test_parse_resistor() {
        let ast = parse("R1 in out 10k").unwrap();
        assert_eq!(ast.components.len(), 1);
        assert_eq!(ast.components[0].component_type, ComponentType::Resistor);
        assert_eq!(ast.components[0].name, "R1");
        assert_eq!(ast.components[0].nodes, vec!["in", "out"]);
        assert_eq!(ast.components[0].value, Some(10_000.0));
    }

    #[test]
    fn test_parse_declarations() {
        let input = ".node a[3]\n.node z complex\n.node n init=1.5\n.input vin\n.control fire\n.heatport hp[3]\n";
        let ast = parse(input).unwrap();
        assert_eq!(ast.nodes[0].shape, Shape::Array(3));
        assert_eq!(ast.nodes[1].shape, Shape::Complex(1));
        assert_eq!(ast.nodes[2].initial, Some(1.5));
        assert_eq!(ast.inputs[0].name, "vin");
        assert_eq!(ast.controls[0].name, "fire");
        assert!(!ast.controls[0].initial);
        assert_eq!(ast.heat_ports[0].shape, Shape::Array(3));
    }

    #[test]
    fn test_control_initial_value() {
        let ast = parse(".control sel init=1\n.control trip init=0\n").unwrap();
        assert!(ast.controls[0].initial);
        assert!(!ast.controls[1].initial);

        let err = parse(".control sel init=2\n").unwrap_err();
        assert!(matches!(err, KirchhoffError::ParseError { line: 1, .. }));
    }

    #[test]
    fn test_duplicate_declaration() {
        let err = parse(".node a\n.input a\n").unwrap_err();
        assert!(matches!(err, KirchhoffError::ParseError { line: 2, .. }));
    }

    #[test]
    fn test_parse_model() {
        let ast = parse(".model DCLIP D (ids=1e-14 vt=0.026)").unwrap();
        let model = &ast.models["DCLIP"];
        assert_eq!(model.model_type, ModelType::Diode);
        assert!((model.params["ids"] - 1e-14).abs() < 1e-20);
    }

    #[test]
    fn test_parse_keyword_forms() {
        let ast = parse("THY T1 a k fire=g vknee=0.7\nSWX1 p n1 n2 control=c\nOP1 ip in out\n").unwrap();
        let thy = &ast.components[0];
        assert_eq!(thy.component_type, ComponentType::Thyristor);
        assert_eq!(thy.name, "T1");
        assert_eq!(thy.params["fire"], ParamValue::Name("g".to_string()));
        assert_eq!(thy.params["vknee"], ParamValue::Number(0.7));
        assert_eq!(ast.components[1].nodes, vec!["p", "n1", "n2"]);
        assert_eq!(ast.components[2].nodes.len(), 3);
    }

    #[test]
    fn test_ground_and_references() {
        let ast = parse("V1 in GND SINE amp=1 freq=50\nR2 in 0 rin\n").unwrap();
        assert_eq!(ast.components[0].nodes, vec!["in", "0"]);
        assert_eq!(ast.components[0].reference.as_deref(), Some("SINE"));
        assert_eq!(ast.components[1].reference.as_deref(), Some("rin"));
        assert_eq!(ast.implicit_nodes(), vec!["in"]);
    }

    #[test]
    fn test_missing_nodes() {
        let err = parse("R1 a").unwrap_err();
        assert!(matches!(err, KirchhoffError::InvalidComponent { .. }));
    }

    #[test]
    fn test_unknown_component_type() {
        let err = parse("Q1 c b e").unwrap_err();
        assert!(matches!(err, KirchhoffError::UnknownComponentType { .. }));
    }

    #[test]
    fn test_parse_with_comments() {
        let input = "# comment\n* title\nR1 in out 1k ; inline comment\n";
        let ast = parse(input).unwrap();
        assert_eq!(ast.components.len(), 1);
    }
}
