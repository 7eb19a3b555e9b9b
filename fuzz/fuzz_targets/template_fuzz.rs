//! Fuzz test for the template parser
//!
//! Feeds arbitrary UTF-8 to the parser looking for panics and checks that
//! every accepted template rebuilds its own source.
//!
//! Run with: cargo +nightly fuzz run template_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use numera_dsl::{parse_template, TemplateToken};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        match parse_template(input) {
            Ok(expr) => {
                assert!(!expr.tokens.is_empty(), "Accepted template has no tokens");
                for token in &expr.tokens {
                    let span = token.span();
                    assert!(span.start <= span.end && span.end <= input.len());
                    if let TemplateToken::Field { path, .. } = token {
                        assert!(!path.segments.is_empty());
                    }
                }
                assert_eq!(expr.to_string(), input, "Template does not rebuild its source");
            }
            Err(err) => {
                assert!(!err.to_string().is_empty(), "Error message should not be empty");
            }
        }
    }
});
