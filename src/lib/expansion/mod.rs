//! Variable substitution, applied to a whole line before it is parsed.

use crate::{shell::Variables, types};
use regex::{Captures, Regex};
use std::sync::OnceLock;

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{(?P<braced>[^}]+)\}|\$(?P<plain>[A-Za-z_][A-Za-z0-9_]*)")
            .unwrap_or_else(|why| unreachable!("variable pattern: {}", why))
    })
}

/// Replaces `${NAME}` and `$NAME` with the value of `NAME` in `vars`.
///
/// The line is scanned once, left to right: values are inserted verbatim and never expanded
/// again. References to unset variables, `${}` and a lone `$` are kept as written.
///
/// ```
/// use pipesh::{expansion::expand_string, Variables};
///
/// let vars: Variables = vec![("USER", "ferris")].into_iter().collect();
/// assert_eq!(expand_string("hi ${USER}, $USER! $HOME", &vars), "hi ferris, ferris! $HOME");
/// ```
pub fn expand_string(input: &str, vars: &Variables) -> types::Str {
    if !input.contains('$') {
        return input.into();
    }
    variable_pattern()
        .replace_all(input, |caps: &Captures<'_>| {
            let name = caps.name("braced").or_else(|| caps.name("plain")).map(|m| m.as_str());
            match name.and_then(|name| vars.get(name)) {
                Some(value) => value.to_owned(),
                None => caps[0].to_owned(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> Variables {
        vec![("FOO", "bar"), ("EMPTY", ""), ("LOOP", "$FOO"), ("A_1", "x")].into_iter().collect()
    }

    #[test]
    fn plain_and_braced() {
        assert_eq!(expand_string("echo $FOO ${FOO}", &vars()), "echo bar bar");
    }

    #[test]
    fn plain_names_end_at_the_first_non_identifier_character() {
        assert_eq!(expand_string("$FOO.txt $A_1b ${A_1}b", &vars()), "bar.txt $A_1b xb");
    }

    #[test]
    fn unknown_references_stay() {
        assert_eq!(expand_string("$NOPE ${NOPE} $ ${} $1", &vars()), "$NOPE ${NOPE} $ ${} $1");
    }

    #[test]
    fn values_are_not_expanded_again() {
        assert_eq!(expand_string("$LOOP", &vars()), "$FOO");
    }

    #[test]
    fn empty_values_expand_to_nothing() {
        assert_eq!(expand_string("a${EMPTY}b", &vars()), "ab");
    }

    #[test]
    fn untouched_without_references() {
        assert_eq!(expand_string("cat file | wc -l", &vars()), "cat file | wc -l");
    }
}
