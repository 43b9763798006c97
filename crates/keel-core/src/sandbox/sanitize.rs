//! Last-line scrubbing of command lines before they reach a shell.
//!
//! This is not a security boundary; the gate decides what runs. It only
//! neutralizes metacharacters that survived classification.

use std::sync::LazyLock;

use regex::Regex;

static INTERPRETER_CHAIN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i);\s*(?:sh|bash|cmd|powershell)\b").ok());

static PARENT_TRAVERSAL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\.\.[/\\]").ok());

const METACHARACTERS: &[char] = &[';', '&', '|', '`', '$', '(', ')', '{', '}', '[', ']', '\\'];

/// Strip `; sh`-style chains, turn `../` into `./` and backslash-escape
/// shell metacharacters.
///
/// ```rust
/// use keel_core::sandbox::sanitize;
///
/// assert_eq!(sanitize("echo hi; bash"), "echo hi");
/// assert_eq!(sanitize("echo $HOME"), "echo \\$HOME");
/// assert_eq!(sanitize("cat ../secret"), "cat ./secret");
/// assert_eq!(sanitize("ls -la"), "ls -la");
/// ```
pub fn sanitize(command: &str) -> String {
    let stripped = match INTERPRETER_CHAIN.as_ref() {
        Some(regex) => regex.replace_all(command, ""),
        None => command.into(),
    };
    let stripped = match PARENT_TRAVERSAL.as_ref() {
        Some(regex) => regex.replace_all(&stripped, "./").into_owned(),
        None => stripped.into_owned(),
    };

    let mut escaped = String::with_capacity(stripped.len());
    for c in stripped.chars() {
        if METACHARACTERS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_commands_pass_through() {
        assert_eq!(sanitize("git status --short"), "git status --short");
        assert_eq!(sanitize("sleep 1"), "sleep 1");
    }

    #[test]
    fn test_metacharacters_are_escaped() {
        assert_eq!(sanitize("a && b"), "a \\&\\& b");
        assert_eq!(sanitize("cat x | wc"), "cat x \\| wc");
        assert_eq!(sanitize("echo `id`"), "echo \\`id\\`");
        assert_eq!(sanitize("echo $(id)"), "echo \\$\\(id\\)");
    }

    #[test]
    fn test_parent_traversal_is_neutralized() {
        assert_eq!(sanitize("cat ../../etc/passwd"), "cat ././etc/passwd");
        assert_eq!(sanitize("type ..\\boot.ini"), "type ./boot.ini");
        assert_eq!(sanitize("ls .. ."), "ls .. .");
    }

    #[test]
    fn test_interpreter_chain_is_stripped() {
        assert_eq!(sanitize("curl x; sh"), "curl x");
        assert_eq!(sanitize("curl x ;   PowerShell -c y"), "curl x  -c y");
    }
}
