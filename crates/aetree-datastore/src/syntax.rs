use aetree_model::{Language, Location, Method};

/// One problem reported by a [`SyntaxValidator`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntaxIssue {
    pub line: u32,
    pub message: String,
}

impl SyntaxIssue {
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Checks script text. Implemented outside the datastore, by whatever
/// knows the script languages.
pub trait SyntaxValidator {
    /// Problems found in `text`; empty when it parses.
    fn validate(&self, language: Language, text: &str) -> Vec<SyntaxIssue>;
}

/// Run `validator` over an inline method's body. Methods without inline code
/// have nothing to check.
pub fn validate_method_syntax(
    validator: &dyn SyntaxValidator,
    method: &Method,
) -> Vec<SyntaxIssue> {
    match (method.location, method.data.as_deref()) {
        (Location::Inline, Some(text)) => validator.validate(method.language, text),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flags every line containing `syntax error`.
    struct Grep;

    impl SyntaxValidator for Grep {
        fn validate(&self, _language: Language, text: &str) -> Vec<SyntaxIssue> {
            text.lines()
                .zip(1..)
                .filter(|(line, _)| line.contains("syntax error"))
                .map(|(_, n)| SyntaxIssue::new(n, "unexpected token"))
                .collect()
        }
    }

    #[test]
    fn reports_lines_of_inline_code() {
        let method = Method::new("A/B/C", "m").with_data("ok\nsyntax error here\nok\n");
        assert_eq!(
            validate_method_syntax(&Grep, &method),
            [SyntaxIssue::new(2, "unexpected token")]
        );
    }

    #[test]
    fn non_inline_methods_are_skipped() {
        let mut method = Method::new("A/B/C", "m").with_data("syntax error");
        method.location = Location::Builtin;
        assert!(validate_method_syntax(&Grep, &method).is_empty());
        assert!(validate_method_syntax(&Grep, &Method::new("A/B/C", "m")).is_empty());
    }
}
