//! Context identifier allocation for duplicated build configurations.

/// Return the first non-negative decimal integer, as text, that does not
/// collide with an existing context.
pub fn generate_context(existing: &[String]) -> String {
    let mut candidate: u64 = 0;
    loop {
        let context = candidate.to_string();
        if !existing.iter().any(|taken| *taken == context) {
            return context;
        }
        candidate += 1;
    }
}

/// Check the given string is a valid context.
///
/// libmodulemd does not export its validation rule, so this mirrors it: one
/// to ten ASCII alphanumeric characters.
pub fn validate_context(context: &str) -> bool {
    (1..=10).contains(&context.len()) && context.bytes().all(|byte| byte.is_ascii_alphanumeric())
}
