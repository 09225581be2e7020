//! Buffer patching and the already-patched guard.
//!
//! Declarations are applied textually last first, and each declaration's
//! edits from its highest offset down. Every insertion only grows the buffer
//! after its own offset, so working back to front keeps every pending offset
//! valid against the unedited text.

use crate::plan::EditPlan;
use crate::types::Markers;

/// True iff either marker literal already occurs in `text`.
pub fn is_already_patched(text: &str, markers: &Markers) -> bool {
    markers.all().iter().any(|literal| text.contains(literal))
}

/// Apply every declaration's plan to `buffer` and return the patched text.
pub fn apply(buffer: &str, plans: &[EditPlan]) -> String {
    let mut order: Vec<&EditPlan> = plans.iter().filter(|p| !p.is_empty()).collect();
    order.sort_by(|a, b| b.decl_start.cmp(&a.decl_start));

    let extra: usize = order.iter().flat_map(|p| &p.edits).map(|e| e.text.len()).sum();
    let mut out = String::with_capacity(buffer.len() + extra);
    out.push_str(buffer);

    let mut floor = usize::MAX;
    for plan in order {
        for edit in &plan.edits {
            debug_assert!(edit.offset <= floor, "edit at {} applied after {floor}", edit.offset);
            out.insert_str(edit.offset, &edit.text);
            floor = edit.offset;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::plan::tests::{function, lex_body};
    use crate::plan::{plan, Edit};
    use crate::types::{Declaration, StatementRef};

    const IN: &str = "TRACE_ME_IN;\t//<<==--TracePoint!";
    const OUT: &str = "TRACE_ME_OUT;\t//<<==--TracePoint!";

    fn patch_one(src: &str, return_type: Option<&str>) -> String {
        let decl = function(src, return_type);
        let p = plan(&decl, &classify(&decl), src, &Markers::default());
        apply(src, &[p])
    }

    /// Two functions in one buffer, each body lexed from its own slice.
    fn two_functions(src: &str, split: usize) -> Vec<Declaration> {
        let shift = |refs: Vec<StatementRef>, by: usize| -> Vec<StatementRef> {
            refs.into_iter()
                .map(|s| StatementRef { start: s.start + by, end: s.end + by, ..s })
                .collect()
        };
        let first = function(&src[..split], Some("void"));
        let mut second = function(&src[split..], Some("int"));
        second.body = Some(shift(lex_body(&src[split..]), split));
        second.start = split;
        vec![first, second]
    }

    /// Apply edits front to back, shifting offsets by what was already inserted.
    fn apply_forward(buffer: &str, plans: &[EditPlan]) -> String {
        let mut edits: Vec<&Edit> = plans.iter().flat_map(|p| &p.edits).collect();
        edits.sort_by_key(|e| e.offset);
        let mut out = buffer.to_string();
        let mut shift = 0;
        for edit in edits {
            out.insert_str(edit.offset + shift, &edit.text);
            shift += edit.text.len();
        }
        out
    }

    #[test]
    fn test_void_function_output() {
        let src = "void greet(const char* name)\n{\n    printf(name);\n    count++;\n}\n";
        let expected = format!(
            "void greet(const char* name)\n{{\n    {IN}\n    printf(name);\n    count++;\n    {OUT}\n}}\n"
        );
        assert_eq!(patch_one(src, Some("void")), expected);
    }

    #[test]
    fn test_value_function_output() {
        let src = "int pick(int c)\n{\n    if (c) {\n        return 1;\n    }\n    return 0;\n}\n";
        let expected = format!(
            "int pick(int c)\n{{\n    {IN}\n    if (c) {{\n        {OUT}\n        return 1;\n    }}\n    {OUT}\n    return 0;\n}}\n"
        );
        assert_eq!(patch_one(src, Some("int")), expected);
    }

    #[test]
    fn test_multi_declaration_offsets_are_stable() {
        let src = "void a()\n{\n    x();\n    y();\n}\n\nint b()\n{\n    if (z) {\n        return 1;\n    }\n    return 2;\n}\n";
        let split = src.find("int b").unwrap();
        let decls = two_functions(src, split);
        let plans: Vec<EditPlan> = decls
            .iter()
            .map(|d| plan(d, &classify(d), src, &Markers::default()))
            .collect();

        let reversed = apply(src, &plans);
        assert_eq!(reversed, apply_forward(src, &plans));

        let mut swapped = plans.clone();
        swapped.reverse();
        assert_eq!(apply(src, &swapped), reversed);

        assert_eq!(reversed.matches(IN).count(), 2);
        assert_eq!(reversed.matches(OUT).count(), 3);
        let second_fn = reversed.find("int b()").unwrap();
        assert!(reversed[..second_fn].ends_with(&format!("    y();\n    {OUT}\n}}\n\n")));
    }

    #[test]
    fn test_empty_plans_leave_buffer_alone() {
        let src = "int f() { go; }";
        assert_eq!(patch_one(src, Some("int")), src);
        assert_eq!(apply(src, &[]), src);
    }

    #[test]
    fn test_guard_detects_either_marker() {
        let markers = Markers::default();
        assert!(!is_already_patched("int main() { return 0; }", &markers));
        assert!(is_already_patched(&format!("void f() {{\n    {IN}\n}}"), &markers));
        assert!(is_already_patched(&format!("x;\n{OUT}\n"), &markers));
        assert!(!is_already_patched("TRACE_ME_IN; // hand written", &markers));
    }
}
