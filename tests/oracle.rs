//! Oracle synthesis against a real Python interpreter
//!
//! Every test skips itself when `python3` is not installed.

use goldpair::extract::extractor_for;
use goldpair::oracle::{
    Executor, OracleSynthesizer, SandboxConfig, SandboxedPythonExecutor, Synthesis,
};
use goldpair::{Error, Language};

fn python_available() -> bool {
    let available = SandboxedPythonExecutor::new().is_available();
    if !available {
        eprintln!("Python not available, skipping test");
    }
    available
}

fn synthesize(source: &str, name: &str, config: SandboxConfig) -> goldpair::Result<Synthesis> {
    let extraction = extractor_for(Language::Python)?.extract(source, name)?;
    let params = extraction.parameters.unwrap_or_default();
    OracleSynthesizer::new(config).synthesize(&extraction.fragment, &params)
}

#[test]
fn test_success_scenario() {
    if !python_available() {
        return;
    }
    let source = "def f_gold(a, b):\n    return a + b\n\nparam = [(2, 3), (0, 0)]\n";
    let synthesis = synthesize(source, "add_two", SandboxConfig::strict()).unwrap();
    assert_eq!(
        synthesis.statements(),
        vec!["assert add_two(2, 3) == 5", "assert add_two(0, 0) == 0"]
    );
}

#[test]
fn test_string_result_scenario() {
    if !python_available() {
        return;
    }
    let source = "def f_gold(r):\n    return 'area=' + str(r * r / 2)\n\nparam = [(5,)]\n";
    let synthesis = synthesize(source, "area", SandboxConfig::strict()).unwrap();
    assert_eq!(synthesis.statements(), vec!["assert area(5) == 'area=12.5'"]);
}

#[test]
fn test_exception_scenario() {
    if !python_available() {
        return;
    }
    let source = "def f_gold(a, b):\n    return a // b\n\nparam = [(5, 0)]\n";
    let synthesis = synthesize(source, "divide", SandboxConfig::strict()).unwrap();
    let statements = synthesis.statements();
    assert_eq!(statements.len(), 1);
    assert!(statements[0]
        .starts_with("try:\n    divide(5, 0)\nexcept Exception as err:\n    assert str(err) == '"));
    assert!(statements[0].ends_with("by zero'"));
    assert_eq!(synthesis.error_count(), 1);
}

#[test]
fn test_empty_parameter_list() {
    if !python_available() {
        return;
    }
    let source = "def f_gold():\n    return 1\n\nparam = []\n";
    let synthesis = synthesize(source, "one", SandboxConfig::strict()).unwrap();
    assert!(synthesis.assertions.is_empty());
}

#[test]
fn test_one_assertion_per_tuple_in_order() {
    if !python_available() {
        return;
    }
    let source = "import math\ndef f_gold(n):\n    return math.factorial(n)\n\nif __name__ == '__main__':\n    param = [(3,), (0,), (5,), (-1,)]\n";
    let synthesis = synthesize(source, "fact", SandboxConfig::strict()).unwrap();
    let calls: Vec<_> = synthesis.assertions.iter().map(|a| a.call.as_str()).collect();
    assert_eq!(calls, vec!["fact(3)", "fact(0)", "fact(5)", "fact(-1)"]);
    assert!(synthesis.assertions[3].expects_error());
}

#[test]
fn test_synthesis_is_deterministic() {
    if !python_available() {
        return;
    }
    let source = "def f_gold(xs):\n    return sorted(set(xs))\n\nparam = [([3, 1, 3, 2],), ('banana',)]\n";
    let first = synthesize(source, "uniq", SandboxConfig::strict()).unwrap();
    let second = synthesize(source, "uniq", SandboxConfig::strict()).unwrap();
    assert_eq!(first.statements(), second.statements());
    assert_eq!(
        first.statements()[0],
        "assert uniq([3, 1, 3, 2]) == [1, 2, 3]"
    );
}

#[test]
fn test_calls_do_not_share_state() {
    if !python_available() {
        return;
    }
    let source = "def f_gold(x, seen=[]):\n    seen.append(x)\n    return len(seen)\n\nparam = [(1,), (2,), (3,)]\n";
    let synthesis = synthesize(source, "count", SandboxConfig::strict()).unwrap();
    for statement in synthesis.statements() {
        assert!(statement.ends_with("== 1"), "{statement}");
    }
}

#[test]
fn test_call_timeout_drops_only_that_tuple() {
    if !python_available() {
        return;
    }
    let source = "def f_gold(n):\n    while n < 0:\n        pass\n    return n\n\nparam = [(1,), (-1,), (2,)]\n";
    let config = SandboxConfig::strict().with_call_timeout(200);
    let synthesis = synthesize(source, "spin", config).unwrap();
    assert_eq!(synthesis.timeouts, 1);
    assert_eq!(
        synthesis.statements(),
        vec!["assert spin(1) == 1", "assert spin(2) == 2"]
    );
}

#[test]
fn test_printing_function_keeps_report_intact() {
    if !python_available() {
        return;
    }
    let source = "def f_gold(a):\n    print('@@goldpair-report@@ not json')\n    print(a)\n    return a * 2\n\nparam = [(21,)]\n";
    let synthesis = synthesize(source, "noisy", SandboxConfig::strict()).unwrap();
    assert_eq!(synthesis.statements(), vec!["assert noisy(21) == 42"]);
}

#[test]
fn test_blocked_import_fails_the_task() {
    if !python_available() {
        return;
    }
    let source = "import socket\ndef f_gold(a):\n    return a\n\nparam = [(1,)]\n";
    let err = synthesize(source, "net", SandboxConfig::strict()).unwrap_err();
    assert!(matches!(err, Error::Oracle(_)));
    assert!(err.to_string().contains("not allowed in sandbox"));
}

#[test]
fn test_non_literal_parameter_list_fails_the_task() {
    if !python_available() {
        return;
    }
    let source = "def f_gold(a):\n    return a\n\nparam = [(len('ab'),)]\n";
    let err = synthesize(source, "ident", SandboxConfig::strict()).unwrap_err();
    assert!(err.to_string().contains("parameter list is not a literal"));
}

#[test]
fn test_generated_statements_execute_cleanly() {
    if !python_available() {
        return;
    }
    let source = r#"def f_gold(s, k):
    if k < 0:
        raise ValueError("bad 'k'\nvalue: " + repr(s))
    return s[:k] + "\\" + '"'

param = [("quote's", 3), ("x", -1), ("line\nbreak", 9)]
"#;
    let extraction = extractor_for(Language::Python)
        .unwrap()
        .extract(source, "cut")
        .unwrap();
    let params = extraction.parameters.clone().unwrap();
    let synthesis = OracleSynthesizer::new(SandboxConfig::strict())
        .synthesize(&extraction.fragment, &params)
        .unwrap();
    assert_eq!(synthesis.assertions.len(), 3);

    let mut program = extraction.fragment.code().to_string();
    for statement in synthesis.statements() {
        program.push('\n');
        program.push_str(&statement);
    }
    program.push_str("\nprint('ok')\n");

    let result = SandboxedPythonExecutor::new()
        .execute(&program, "", 10_000)
        .unwrap();
    assert_eq!(result.exit_code, 0, "{}", result.stderr);
    assert_eq!(result.stdout.trim(), "ok");
}

#[test]
fn test_withheld_builtin_inside_call_fails_the_task() {
    if !python_available() {
        return;
    }
    let source = "def f_gold(a):\n    return eval('a + 1', {'a': a})\n\nparam = [(1,)]\n";
    let err = synthesize(source, "inc", SandboxConfig::strict()).unwrap_err();
    assert!(matches!(err, Error::Oracle(_)));
    assert!(err
        .to_string()
        .contains("call blocked by sandbox: inc(1): builtin 'eval' is not allowed in sandbox"));
}

#[test]
fn test_blocked_import_inside_call_fails_the_task() {
    if !python_available() {
        return;
    }
    let source = "def f_gold(a):\n    import os\n    return a\n\nparam = [(1,)]\n";
    let err = synthesize(source, "read_env", SandboxConfig::strict()).unwrap_err();
    assert!(err.to_string().contains("Module 'os' is not allowed in sandbox"));
}

#[test]
fn test_swallowed_denial_still_fails_the_task() {
    if !python_available() {
        return;
    }
    let source = "def f_gold(a):\n    try:\n        import socket\n    except BaseException:\n        return -1\n    return a\n\nparam = [(1,)]\n";
    let err = synthesize(source, "net_or_not", SandboxConfig::strict()).unwrap_err();
    assert!(err.to_string().contains("call blocked by sandbox"));
}

#[test]
fn test_non_literal_results_are_dropped() {
    if !python_available() {
        return;
    }
    let source = "def f_gold(a):\n    if a == 0:\n        return float('inf')\n    if a < 0:\n        return float('nan')\n    if a > 10:\n        return object()\n    return 1.0 / a\n\nparam = [(0,), (-1,), (20,), (2,)]\n";
    let synthesis = synthesize(source, "recip", SandboxConfig::strict()).unwrap();
    assert_eq!(
        synthesis.statements(),
        vec![
            "assert recip(0) == float('inf')",
            "assert recip(2) == 0.5"
        ]
    );
    assert_eq!(synthesis.unrepresentable, 2);
}

#[test]
fn test_system_exit_becomes_an_assertion() {
    if !python_available() {
        return;
    }
    let source = "def f_gold(n):\n    if n < 0:\n        raise SystemExit(1)\n    return n\n\nparam = [(1,), (-1,)]\n";
    let extraction = extractor_for(Language::Python)
        .unwrap()
        .extract(source, "guard")
        .unwrap();
    let params = extraction.parameters.clone().unwrap();
    let synthesis = OracleSynthesizer::new(SandboxConfig::strict())
        .synthesize(&extraction.fragment, &params)
        .unwrap();
    assert_eq!(
        synthesis.statements(),
        vec![
            "assert guard(1) == 1",
            "try:\n    guard(-1)\nexcept BaseException as err:\n    assert str(err) == '1'"
        ]
    );

    let mut program = extraction.fragment.code().to_string();
    for statement in synthesis.statements() {
        program.push('\n');
        program.push_str(&statement);
    }
    program.push_str("\nprint('ok')\n");
    let result = SandboxedPythonExecutor::new()
        .execute(&program, "", 10_000)
        .unwrap();
    assert_eq!(result.exit_code, 0, "{}", result.stderr);
    assert_eq!(result.stdout.trim(), "ok");
}
