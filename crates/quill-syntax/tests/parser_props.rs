//! Property tests for the docstring parser.
//!
//! The parser must be total: any byte soup terminates with a signature or
//! an error, never a panic. Constructed well-formed signatures must parse.

use proptest::prelude::*;
use quill_ast::ParamNode;
use quill_syntax::parse_docstring;

proptest! {
    #[test]
    fn parser_is_total_on_arbitrary_text(doc in "\\PC*") {
        let _ = parse_docstring(&doc);
    }

    #[test]
    fn parser_is_total_on_grammar_soup(
        doc in "[a-z \n\\.\\:\\(\\)\\[\\]=>/\\*\\?,-]{0,80}"
    ) {
        let _ = parse_docstring(&doc);
    }

    #[test]
    fn constructed_signatures_parse(
        name in "[a-z][a-z0-9_]{0,6}",
        param in "[a-z][a-z0-9_]{0,6}",
        ty in prop::sample::select(vec!["number", "string", "boolean", "table"]),
        equals in 1usize..4,
    ) {
        let arrow = format!("{}>", "=".repeat(equals));
        let doc = format!("{name}( {param} ) {arrow} {ty} {param} : {ty}");
        let sig = parse_docstring(&doc).expect("constructed signature parses");
        prop_assert_eq!(sig.designator.to_string(), name);
        prop_assert_eq!(sig.params.len(), 1);
        prop_assert_eq!(sig.returns.len(), 1);
    }

    #[test]
    fn constructed_vararg_signatures_parse(
        name in "[a-z][a-z0-9_]{0,6}",
        ty in prop::sample::select(vec!["number", "string", "table"]),
    ) {
        let doc = format!("{name}( ... ) ... : {ty}*");
        let sig = parse_docstring(&doc).expect("constructed signature parses");
        prop_assert!(matches!(sig.params.first(), Some(ParamNode::Vararg(_))));
    }
}
