//! Python extraction query
//!
//! Captures module-level imports, the module-level (optionally decorated)
//! sentinel function and the top-level `param = [...]` assignment. In the
//! dataset the assignment sits under `if __name__ == '__main__':`, so
//! statements directly inside a module-level `if` count as top level too.
//! Assignments inside function or class bodies never match.

/// Capture labels holding dependency declarations
pub(super) const DEPENDENCY_CAPTURES: &[&str] = &["import", "from", "future"];

/// Build the Python query for a sentinel function and parameter variable
pub(super) fn query_pattern(sentinel: &str, param: &str) -> String {
    format!(
        r#"
        (module (import_statement) @import)
        (module (import_from_statement) @from)
        (module (future_import_statement) @future)
        (module
            (function_definition
                name: ((identifier) @func_name
                       (#eq? @func_name "{sentinel}"))) @func)
        (module
            (decorated_definition
                definition: (function_definition
                    name: ((identifier) @func_name
                           (#eq? @func_name "{sentinel}")))) @func)
        (module
            (expression_statement
                (assignment
                    left: (identifier) @var_name
                    (#eq? @var_name "{param}")
                    right: (list) @var_value)))
        (module
            (if_statement
                consequence: (block
                    (expression_statement
                        (assignment
                            left: (identifier) @var_name
                            (#eq? @var_name "{param}")
                            right: (list) @var_value)))))
        "#
    )
}
