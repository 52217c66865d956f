/// Whether `name` can be assigned to: an ASCII letter or `_`, then letters, digits and `_`.
pub fn is_valid_key(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Splits a `NAME=VALUE` word at its first `=`. The value may be empty or hold more `=`.
pub fn split_assignment(word: &str) -> Option<(&str, &str)> {
    let eq = word.find('=')?;
    let (key, value) = (&word[..eq], &word[eq + 1..]);
    if is_valid_key(key) {
        Some((key, value))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments() {
        assert_eq!(split_assignment("FOO=bar"), Some(("FOO", "bar")));
        assert_eq!(split_assignment("_x1="), Some(("_x1", "")));
        assert_eq!(split_assignment("A=b=c"), Some(("A", "b=c")));
    }

    #[test]
    fn not_assignments() {
        assert_eq!(split_assignment("echo"), None);
        assert_eq!(split_assignment("1A=b"), None);
        assert_eq!(split_assignment("=b"), None);
        assert_eq!(split_assignment("A-B=c"), None);
        assert_eq!(split_assignment("Ä=c"), None);
    }
}
