//! Argument-list and return-pattern assembly.
//!
//! Walks a signature's parameter tree, builds one NFA fragment per item,
//! and concatenates them into the automaton for the full argument
//! language. Methods get a synthetic `self` parameter prepended, with the
//! registry-dependent default mapping injected when the signature has none.

use std::collections::{BTreeMap, BTreeSet};

use quill_ast::{ParamNode, Signature, TypeExpr};
use quill_diag::BuildError;
use quill_value::Registry;

use crate::nfa::{Nfa, from_type_expr};

/// Build the NFA for a signature's positional argument list.
pub fn assemble_arguments(signature: &Signature, registry: &Registry) -> Result<Nfa, BuildError> {
    let mut assembler = Assembler {
        registry,
        param_types: &signature.param_types,
        injected_self: if signature.is_method() && !signature.param_types.contains_key("self") {
            default_self_mapping(registry)
        } else {
            None
        },
        consumed: BTreeSet::new(),
    };

    let synthetic_self = ParamNode::Named("self".to_string());
    let mut items: Vec<&ParamNode> = Vec::with_capacity(signature.params.len() + 1);
    if signature.is_method() {
        items.push(&synthetic_self);
    }
    items.extend(signature.params.iter());

    assembler.sequence(&items)
}

/// Build the NFA for a signature's return patterns: the alternation of the
/// listed shapes. No patterns means the signature documents a procedure,
/// so the automaton accepts exactly the empty sequence.
pub fn assemble_returns(signature: &Signature, registry: &Registry) -> Result<Nfa, BuildError> {
    match signature.returns.len() {
        0 => Ok(Nfa::empty()),
        1 => from_type_expr(&signature.returns[0], registry),
        _ => {
            let built = signature
                .returns
                .iter()
                .map(|ret| from_type_expr(ret, registry))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Nfa::alternation(built))
        }
    }
}

/// The implicit receiver type for methods without a `self` mapping:
/// `object` when registered, else `userdata / table` when both are, else
/// nothing (the unmapped-name fallback applies).
fn default_self_mapping(registry: &Registry) -> Option<TypeExpr> {
    if registry.contains("object") {
        return Some(TypeExpr::name("object"));
    }
    if registry.contains("userdata") && registry.contains("table") {
        return Some(TypeExpr::alt(vec![
            TypeExpr::name("userdata"),
            TypeExpr::name("table"),
        ]));
    }
    None
}

struct Assembler<'a> {
    registry: &'a Registry,
    param_types: &'a BTreeMap<String, TypeExpr>,
    injected_self: Option<TypeExpr>,
    consumed: BTreeSet<String>,
}

impl Assembler<'_> {
    fn sequence(&mut self, items: &[&ParamNode]) -> Result<Nfa, BuildError> {
        let mut nfa: Option<Nfa> = None;
        for item in items {
            let fragment = self.fragment(item)?;
            match &mut nfa {
                Some(nfa) => nfa.concat(fragment),
                None => nfa = Some(fragment),
            }
        }
        Ok(nfa.unwrap_or_else(Nfa::empty))
    }

    fn fragment(&mut self, item: &ParamNode) -> Result<Nfa, BuildError> {
        match item {
            ParamNode::Named(name) => {
                if !self.consumed.insert(name.clone()) {
                    return Err(BuildError::DuplicateParamUse(name.clone()));
                }
                let expr = self
                    .param_types
                    .get(name)
                    .or(if name == "self" {
                        self.injected_self.as_ref()
                    } else {
                        None
                    })
                    .cloned()
                    // Unmapped names are their own type name.
                    .unwrap_or_else(|| TypeExpr::name(name.clone()));
                from_type_expr(&expr, self.registry)
            }
            ParamNode::Group(children) => {
                let items: Vec<&ParamNode> = children.iter().collect();
                let mut nfa = self.sequence(&items)?;
                nfa.optional();
                Ok(nfa)
            }
            ParamNode::Vararg(expr) => from_type_expr(expr, self.registry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_value::Value;
    use std::rc::Rc;

    fn parse(doc: &str) -> Signature {
        quill_syntax::parse_docstring(doc).expect("test signature parses")
    }

    #[test]
    fn simple_parameter_list() {
        let registry = Registry::new();
        let sig = parse("func( n ) ==> number n : number/boolean");
        let nfa = assemble_arguments(&sig, &registry).expect("assembles");
        assert!(nfa.simulate(&registry, &[Value::Number(12.0)]));
        assert!(nfa.simulate(&registry, &[Value::Boolean(false)]));
        assert!(!nfa.simulate(&registry, &[Value::string("x")]));
        assert!(!nfa.simulate(&registry, &[]));
        assert!(!nfa.simulate(&registry, &[Value::Number(12.0), Value::Number(13.0)]));
    }

    #[test]
    fn unmapped_name_is_its_own_type() {
        let registry = Registry::new();
        let sig = parse("func( string, number )");
        let nfa = assemble_arguments(&sig, &registry).expect("assembles");
        assert!(nfa.simulate(&registry, &[Value::string("a"), Value::Number(1.0)]));
        assert!(!nfa.simulate(&registry, &[Value::Number(1.0), Value::string("a")]));
    }

    #[test]
    fn unmapped_unregistered_name_is_undefined_type() {
        let registry = Registry::new();
        let sig = parse("func( a ) ==> number");
        let err = assemble_arguments(&sig, &registry).unwrap_err();
        assert_eq!(err, BuildError::UndefinedType("a".to_string()));
    }

    #[test]
    fn duplicate_parameter_use_is_rejected() {
        let registry = Registry::new();
        let sig = parse("func( a, a ) ==> number a : number");
        let err = assemble_arguments(&sig, &registry).unwrap_err();
        assert_eq!(err, BuildError::DuplicateParamUse("a".to_string()));
    }

    #[test]
    fn mapped_name_referencing_unregistered_type_is_undefined() {
        let registry = Registry::new();
        let sig = parse("func( a ) ==> number a : n");
        let err = assemble_arguments(&sig, &registry).unwrap_err();
        assert_eq!(err, BuildError::UndefinedType("n".to_string()));
    }

    #[test]
    fn optional_groups_nest() {
        let registry = Registry::new();
        let sig = parse(
            "func( [string [, userdata] [, boolean],] [number,] ... ) \
             ... : ((table, string/number) / boolean)*",
        );
        let nfa = assemble_arguments(&sig, &registry).expect("assembles");
        assert!(nfa.simulate(&registry, &[]));
        assert!(nfa.simulate(
            &registry,
            &[Value::string("a"), Value::userdata("h"), Value::Boolean(true)]
        ));
        assert!(nfa.simulate(
            &registry,
            &[
                Value::Number(12.0),
                Value::table(),
                Value::string("b"),
                Value::Boolean(false),
                Value::Boolean(true),
                Value::table(),
                Value::Number(13.0),
            ]
        ));
        // A lone userdata matches nothing: the group needs string first.
        assert!(!nfa.simulate(&registry, &[Value::userdata("h")]));
    }

    #[test]
    fn method_prepends_receiver_with_default_mapping() {
        let registry = Registry::new();
        let sig = parse("obj:method( n ) n : number");
        let nfa = assemble_arguments(&sig, &registry).expect("assembles");
        // No `object` registered: the default is userdata / table.
        assert!(nfa.simulate(&registry, &[Value::table(), Value::Number(12.0)]));
        assert!(nfa.simulate(&registry, &[Value::userdata("h"), Value::Number(12.0)]));
        assert!(!nfa.simulate(&registry, &[Value::Number(12.0)]));
    }

    #[test]
    fn method_self_uses_object_when_registered() {
        let mut registry = Registry::new();
        registry
            .register("object", Rc::new(|v: &Value| v.get("class").is_some()))
            .expect("valid name");
        let sig = parse("obj:method( n ) n : number");
        let nfa = assemble_arguments(&sig, &registry).expect("assembles");
        let instance = Value::table_from([("class", Value::string("Obj"))]);
        assert!(nfa.simulate(&registry, &[instance, Value::Number(1.0)]));
        assert!(!nfa.simulate(&registry, &[Value::table(), Value::Number(1.0)]));
    }

    #[test]
    fn explicit_self_mapping_wins() {
        let registry = Registry::new();
        let sig = parse("obj:method( n ) self : table n : number");
        let nfa = assemble_arguments(&sig, &registry).expect("assembles");
        assert!(nfa.simulate(&registry, &[Value::table(), Value::Number(1.0)]));
        assert!(!nfa.simulate(&registry, &[Value::userdata("h"), Value::Number(1.0)]));
    }

    #[test]
    fn empty_parameter_list_accepts_only_empty() {
        let registry = Registry::new();
        let sig = parse("func( )");
        let nfa = assemble_arguments(&sig, &registry).expect("assembles");
        assert!(nfa.simulate(&registry, &[]));
        assert!(!nfa.simulate(&registry, &[Value::Nil]));
    }

    #[test]
    fn return_patterns_alternate() {
        let mut registry = Registry::new();
        registry
            .register(
                "mytable",
                Rc::new(|v: &Value| matches!(v.get("is_mytable"), Some(Value::Boolean(true)))),
            )
            .expect("valid name");
        let sig = parse("func( n ) => (table, boolean) / (mytable, number) n : number");
        let nfa = assemble_returns(&sig, &registry).expect("assembles");
        assert!(nfa.simulate(&registry, &[Value::table(), Value::Boolean(true)]));
        let marked = Value::table_from([("is_mytable", Value::Boolean(true))]);
        assert!(nfa.simulate(&registry, &[marked, Value::Number(1.0)]));
        assert!(!nfa.simulate(&registry, &[Value::Number(1.0)]));
    }

    #[test]
    fn procedure_signature_returns_accept_only_empty() {
        let registry = Registry::new();
        let sig = parse("func( n ) n : number");
        let nfa = assemble_returns(&sig, &registry).expect("assembles");
        assert!(nfa.simulate(&registry, &[]));
        assert!(!nfa.simulate(&registry, &[Value::Nil]));
    }

    #[test]
    fn multiple_return_clauses_build_an_alternation() {
        let registry = Registry::new();
        let sig = parse("func( n ) => number, number => string n : number");
        let nfa = assemble_returns(&sig, &registry).expect("assembles");
        assert!(nfa.simulate(&registry, &[Value::Number(1.0), Value::Number(2.0)]));
        assert!(nfa.simulate(&registry, &[Value::string("s")]));
        assert!(!nfa.simulate(&registry, &[Value::Number(1.0)]));
    }
}
