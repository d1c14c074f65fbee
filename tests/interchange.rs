use std::path::PathBuf;
use std::rc::Rc;

use test_log::test;

use autologic::config::EvalConfig;
use autologic::driver::{Definition, Generator, Session};
use autologic::error::{Error, Result};
use autologic::ir::{add, call, eq, exists, int, lt, var};
use autologic::program::{NamedPredicate, Program};
use autologic::unify::TruthValue;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("autologic-{}-{}.hoa", std::process::id(), name))
}

fn even() -> Definition {
    Definition::Predicate(NamedPredicate::new(
        "Even",
        &["x"],
        exists("y", eq(var("x"), add(var("y"), var("y")))),
    ))
}

fn assert_prop(name: &str, expected: TruthValue) -> Definition {
    Definition::AssertProp {
        expected,
        name: name.into(),
    }
}

#[test]
fn test_save_and_load() {
    let path = temp_path("sum");
    let mut session = Session::new(EvalConfig::default()).unwrap();
    let sum = NamedPredicate::new("Sum", &["a", "b"], eq(add(var("a"), var("b")), int(5)));
    session
        .run(vec![
            Definition::Predicate(sum),
            Definition::Save {
                name: "Sum".into(),
                path: path.clone(),
            },
            Definition::Load {
                path: path.clone(),
                name: "Loaded".into(),
                args: vec!["p".into(), "q".into()],
            },
        ])
        .unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("HOA: v1"));
    assert!(text.contains("AP: 2 \"a\" \"b\""));

    let same = eq(call("Sum", vec![var("m"), var("n")]), call("Loaded", vec![var("m"), var("n")]));
    assert_eq!(session.truth_value(&same).unwrap(), TruthValue::True);
    let swapped = eq(call("Sum", vec![var("m"), var("n")]), call("Loaded", vec![var("n"), var("m")]));
    assert_eq!(session.truth_value(&swapped).unwrap(), TruthValue::True);
    let ordered = eq(call("Sum", vec![var("m"), var("n")]), lt(var("m"), var("n")));
    assert_eq!(session.truth_value(&ordered).unwrap(), TruthValue::Sometimes);

    let err = session
        .run(vec![Definition::Load {
            path: path.clone(),
            name: "Bad".into(),
            args: vec!["p".into()],
        }])
        .unwrap_err();
    assert!(matches!(err, Error::Arity { expected: 2, actual: 1, .. }));
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_save_through_alias() {
    let path = temp_path("adder");
    let mut session = Session::new(EvalConfig::default()).unwrap();
    session
        .run(vec![
            Definition::Save {
                name: "adder".into(),
                path: path.clone(),
            },
            Definition::Load {
                path: path.clone(),
                name: "Plus".into(),
                args: vec!["p".into(), "q".into(), "r".into()],
            },
        ])
        .unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("AP: 3 \"a\" \"b\" \"c\""));
    let same = eq(
        call("Plus", vec![var("m"), var("n"), var("k")]),
        eq(add(var("m"), var("n")), var("k")),
    );
    assert_eq!(session.truth_value(&same).unwrap(), TruthValue::True);
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_load_missing_file() {
    let mut session = Session::new(EvalConfig::default()).unwrap();
    let err = session
        .run(vec![Definition::Load {
            path: temp_path("missing"),
            name: "Nothing".into(),
            args: vec![],
        }])
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_import_keeps_definitions() {
    let mut session = Session::new(EvalConfig::default()).unwrap();
    let report = session
        .run(vec![
            Definition::Import(vec![even(), assert_prop("Even", TruthValue::Sometimes)]),
            Definition::Predicate(NamedPredicate::new(
                "Odd",
                &["x"],
                autologic::ir::not(call("Even", vec![var("x")])),
            )),
            assert_prop("Odd", TruthValue::Sometimes),
        ])
        .unwrap();
    assert_eq!(report.assertions.len(), 2);
    assert!(report.passed(), "{}", report);
    assert!(Rc::ptr_eq(
        session.program().alphabet(),
        session.program().predicate("Even").unwrap().memo().unwrap().aut.alphabet(),
    ));
}

#[test]
fn test_generated_predicates() {
    // One predicate per residue modulo 3.
    let generate: Generator = Rc::new(|_: &mut Program| -> Result<Vec<Definition>> {
        Ok((0..3)
            .map(|r| {
                let body = exists("k", eq(var("x"), add(add(var("k"), add(var("k"), var("k"))), int(r))));
                Definition::Predicate(NamedPredicate::new(format!("Mod3_{}", r), &["x"], body))
            })
            .collect())
    });
    let mut session = Session::new(EvalConfig::default()).unwrap();
    let report = session
        .run(vec![
            Definition::Generate(generate),
            assert_prop("Mod3_0", TruthValue::Sometimes),
            assert_prop("Mod3_2", TruthValue::Sometimes),
        ])
        .unwrap();
    assert!(report.passed(), "{}", report);

    let cover = autologic::ir::forall(
        "x",
        autologic::ir::or(
            call("Mod3_0", vec![var("x")]),
            autologic::ir::or(call("Mod3_1", vec![var("x")]), call("Mod3_2", vec![var("x")])),
        ),
    );
    assert_eq!(session.truth_value(&cover).unwrap(), TruthValue::True);
    let w = session
        .program_mut()
        .witness(&autologic::ir::and(call("Mod3_1", vec![var("x")]), lt(int(5), var("x"))))
        .unwrap()
        .unwrap();
    assert_eq!(w["x"].clone() % 3u32, num_bigint::BigUint::from(1u32));
}
