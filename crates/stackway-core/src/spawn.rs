//! Command line preparation for `Execute`.
//!
//! Commands never go through a shell. Variables and `~` are expanded here
//! and the result is split into an argument vector for the host to spawn.

use std::env;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgvError {
    #[error("empty command")]
    Empty,
    #[error("unterminated {0} quote")]
    UnterminatedQuote(char),
    #[error("trailing backslash")]
    TrailingBackslash,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Expand `$VAR`, `${VAR}` and a `~` starting a word from the
/// environment. Unset variables expand to nothing.
pub fn expand_shell_variables(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut word_start = true;

    while let Some(c) = chars.next() {
        match c {
            '~' if word_start && chars.peek().map_or(true, |&n| n == '/' || n.is_whitespace()) => {
                out.push_str(&env::var("HOME").unwrap_or_default());
            }
            '$' if chars.peek() == Some(&'{') => {
                chars.next();
                let name: String = chars.by_ref().take_while(|&n| n != '}').collect();
                out.push_str(&env::var(&name).unwrap_or_default());
            }
            '$' if chars.peek().copied().is_some_and(is_name_char) => {
                let mut name = String::new();
                while let Some(&n) = chars.peek() {
                    if !is_name_char(n) {
                        break;
                    }
                    name.push(n);
                    chars.next();
                }
                out.push_str(&env::var(&name).unwrap_or_default());
            }
            _ => out.push(c),
        }
        word_start = c.is_whitespace();
    }
    out
}

/// Split a command line into arguments, honouring single quotes, double
/// quotes and backslash escapes.
pub fn parse_argv(command: &str) -> Result<Vec<String>, ArgvError> {
    let mut argv = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(n) => current.push(n),
                        None => return Err(ArgvError::UnterminatedQuote('\'')),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(n @ ('"' | '\\' | '$' | '`')) => current.push(n),
                            Some(n) => {
                                current.push('\\');
                                current.push(n);
                            }
                            None => return Err(ArgvError::UnterminatedQuote('"')),
                        },
                        Some(n) => current.push(n),
                        None => return Err(ArgvError::UnterminatedQuote('"')),
                    }
                }
            }
            '\\' => {
                in_word = true;
                current.push(chars.next().ok_or(ArgvError::TrailingBackslash)?);
            }
            c if c.is_whitespace() => {
                if in_word {
                    argv.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        argv.push(current);
    }

    if argv.is_empty() {
        return Err(ArgvError::Empty);
    }
    Ok(argv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_expand_variables() {
        env::set_var("STACKWAY_TEST_TERM", "foot");
        env::remove_var("STACKWAY_TEST_UNSET");
        assert_eq!(expand_shell_variables("$STACKWAY_TEST_TERM -e top"), "foot -e top");
        assert_eq!(expand_shell_variables("${STACKWAY_TEST_TERM}rc"), "footrc");
        assert_eq!(expand_shell_variables("a $STACKWAY_TEST_UNSET b"), "a  b");
        assert_eq!(expand_shell_variables("cost: 5$"), "cost: 5$");
    }

    #[test]
    #[serial]
    fn test_expand_tilde_only_at_word_start() {
        let home = env::var_os("HOME");
        env::set_var("HOME", "/home/tester");
        assert_eq!(expand_shell_variables("~/bin/run"), "/home/tester/bin/run");
        assert_eq!(expand_shell_variables("ls ~"), "ls /home/tester");
        assert_eq!(expand_shell_variables("a~b"), "a~b");
        assert_eq!(expand_shell_variables("~user"), "~user");
        match home {
            Some(home) => env::set_var("HOME", home),
            None => env::remove_var("HOME"),
        }
    }

    #[test]
    fn test_parse_argv_quotes() {
        assert_eq!(
            parse_argv(r#"foot -e sh -c 'echo "hi there"'"#).unwrap(),
            vec!["foot", "-e", "sh", "-c", r#"echo "hi there""#]
        );
        assert_eq!(
            parse_argv(r#"notify-send "a \"b\" c" d\ e"#).unwrap(),
            vec!["notify-send", r#"a "b" c"#, "d e"]
        );
        assert_eq!(parse_argv("run ''").unwrap(), vec!["run", ""]);
    }

    #[test]
    fn test_parse_argv_errors() {
        assert_eq!(parse_argv("   "), Err(ArgvError::Empty));
        assert_eq!(parse_argv("echo 'oops"), Err(ArgvError::UnterminatedQuote('\'')));
        assert_eq!(parse_argv("echo \"oops"), Err(ArgvError::UnterminatedQuote('"')));
        assert_eq!(parse_argv("echo \\"), Err(ArgvError::TrailingBackslash));
    }
}
