/*!
A parser for the [Graph Modelling Language (GML)](https://web.archive.org/web/20190303094704/http://www.fim.uni-passau.de:80/fileadmin/files/lehrstuhl/brandenburg/projekte/gml/gml-technical-report.pdf)
format, used as the declarative graph description consumed by the topology service.
*/

#![deny(unsafe_op_in_unsafe_fn)]

pub mod gml;
mod parser;

use nom::Finish;

/// Parse a graph description into a [`gml::Gml`] object. Returns a human-readable message on
/// syntax error.
pub fn parse(gml_str: &str) -> Result<gml::Gml<'_>, String> {
    match parser::gml::<nom_language::error::VerboseError<&str>>(gml_str).finish() {
        Ok((_remaining, graph)) => Ok(graph),
        Err(e) => Err(nom_language::error::convert_error(gml_str, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_graph() {
        let graph = r#"
graph [
  directed 1
  node [
    id 0
    label "Node 0"
  ]
  node [
    id 1
    label "Node 1"
  ]
  edge [
    source 0
    target 1
  ]
]"#;
        let parsed = parse(graph).unwrap();
        assert!(parsed.directed);
        assert_eq!(parsed.nodes.len(), 2);
        assert_eq!(parsed.edges.len(), 1);
    }

    #[test]
    fn rejects_duplicate_keys() {
        let graph = r#"
graph [
  node [
    id 0
    id 1
  ]
]"#;
        assert!(parse(graph).is_err());
    }

    #[test]
    fn reports_syntax_errors() {
        assert!(parse("not a graph").is_err());
    }
}
