//! C++ extraction query
//!
//! Captures top-level `#include` and `using` declarations and the function
//! definition whose declarator names the sentinel, including definitions with
//! pointer or reference return types.

/// Capture labels holding dependency declarations
pub(super) const DEPENDENCY_CAPTURES: &[&str] = &["include", "using"];

/// Build the C++ query for a sentinel function name
pub(super) fn query_pattern(sentinel: &str) -> String {
    format!(
        r#"
        (translation_unit (preproc_include) @include)
        (translation_unit (using_declaration) @using)
        (function_definition
            declarator: (function_declarator
                declarator: (identifier) @func_name
                (#eq? @func_name "{sentinel}"))) @func
        (function_definition
            declarator: (pointer_declarator
                declarator: (function_declarator
                    declarator: (identifier) @func_name
                    (#eq? @func_name "{sentinel}")))) @func
        (function_definition
            declarator: (reference_declarator
                (function_declarator
                    declarator: (identifier) @func_name
                    (#eq? @func_name "{sentinel}")))) @func
        "#
    )
}
