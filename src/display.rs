//! Indented tree dump of a parsed program, one node per line.

use std::fmt::{Display, Formatter, Result};

use crate::parse::{BinaryOp, Child, Expression, Program};

const INDENT: usize = 2;

impl Display for BinaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_str(self.as_str())
    }
}

impl Display for Program<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "ProgramStart")?;
        for statement in &self.statements {
            write_expression(f, statement, 1)?;
        }
        Ok(())
    }
}

impl Display for Expression<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write_expression(f, self, 0)
    }
}

fn write_expression(f: &mut Formatter<'_>, expression: &Expression<'_>, level: usize) -> Result {
    let indent = level * INDENT;
    match expression.operator() {
        Some(op) => writeln!(f, "{:indent$}Expression {op}", "")?,
        None => writeln!(f, "{:indent$}Expression", "")?,
    }

    for child in expression.children() {
        match child {
            Child::Token(token) => writeln!(f, "{:width$}{token}", "", width = indent + INDENT)?,
            Child::Node(node) => write_expression(f, node, level + 1)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{build_ast, tokenize};

    #[test]
    fn tree_dump() {
        let tokens = tokenize("15 + 2 - 1");
        let program = build_ast(&tokens).unwrap();
        let expected = "\
ProgramStart
  Expression PLUS
    Expression
      INT 15
    Expression MINUS
      Expression
        INT 2
      Expression
        INT 1
";
        assert_eq!(program.to_string(), expected);
    }

    #[test]
    fn leaf_dump() {
        let tokens = tokenize("42");
        let program = build_ast(&tokens).unwrap();
        assert_eq!(program.statements[0].to_string(), "Expression\n  INT 42\n");
    }

    #[test]
    fn empty_program() {
        let tokens = tokenize("");
        let program = build_ast(&tokens).unwrap();
        assert_eq!(program.to_string(), "ProgramStart\n");
    }
}
