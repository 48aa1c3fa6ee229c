//! Splitting a SQL script into statements.
//!
//! [`split_statements`] is a small state machine that only splits on a `;`
//! outside string literals, quoted identifiers, and comments. It understands
//! single, double, and backtick quotes with doubled-quote escaping, `--` and
//! `#` line comments, and `/* */` block comments. Comments are kept in the
//! statement text; statements consisting only of comments and whitespace are
//! dropped.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    Quoted(char),
    LineComment,
    BlockComment,
}

/// Splits `script` into trimmed, non-empty statements without their
/// trailing semicolons.
pub fn split_statements(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut state = State::Normal;
    let mut has_code = false;
    let mut chars = script.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Normal => match c {
                ';' => {
                    push_statement(&mut statements, &mut current, has_code);
                    has_code = false;
                    continue;
                }
                '\'' | '"' | '`' => {
                    state = State::Quoted(c);
                    has_code = true;
                }
                '-' if chars.peek() == Some(&'-') => state = State::LineComment,
                '#' => state = State::LineComment,
                '/' if chars.peek() == Some(&'*') => {
                    current.push(c);
                    if let Some(star) = chars.next() {
                        current.push(star);
                    }
                    state = State::BlockComment;
                    continue;
                }
                _ if !c.is_whitespace() => has_code = true,
                _ => {}
            },
            State::Quoted(quote) => {
                if c == quote {
                    if chars.peek() == Some(&quote) {
                        // Doubled quote: an escaped quote character.
                        current.push(c);
                        if let Some(next) = chars.next() {
                            current.push(next);
                        }
                        continue;
                    }
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if c == '\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    current.push(c);
                    if let Some(slash) = chars.next() {
                        current.push(slash);
                    }
                    state = State::Normal;
                    continue;
                }
            }
        }
        current.push(c);
    }
    push_statement(&mut statements, &mut current, has_code);
    statements
}

fn push_statement(statements: &mut Vec<String>, current: &mut String, has_code: bool) {
    let statement = std::mem::take(current);
    if has_code {
        statements.push(statement.trim().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_split() {
        assert_eq!(
            split_statements("CREATE TABLE a (x INT); DROP TABLE b;\n"),
            vec!["CREATE TABLE a (x INT)", "DROP TABLE b"]
        );
    }

    #[test]
    fn test_no_trailing_semicolon() {
        assert_eq!(split_statements("SELECT 1"), vec!["SELECT 1"]);
        assert!(split_statements("  ;; \n ").is_empty());
    }

    #[test]
    fn test_semicolon_in_string_literals() {
        let script = "INSERT INTO t VALUES ('a;b', \"c;d\"); SELECT `we;ird` FROM t";
        assert_eq!(
            split_statements(script),
            vec![
                "INSERT INTO t VALUES ('a;b', \"c;d\")",
                "SELECT `we;ird` FROM t"
            ]
        );
    }

    #[test]
    fn test_doubled_quote_escape() {
        let script = "INSERT INTO t VALUES ('it''s; fine'); SELECT 2";
        assert_eq!(
            split_statements(script),
            vec!["INSERT INTO t VALUES ('it''s; fine')", "SELECT 2"]
        );
    }

    #[test]
    fn test_line_comments() {
        let script = "-- drop; everything\nSELECT 1; # another; one\nSELECT 2";
        assert_eq!(
            split_statements(script),
            vec!["-- drop; everything\nSELECT 1", "# another; one\nSELECT 2"]
        );
    }

    #[test]
    fn test_block_comment() {
        let script = "/* a; b */ SELECT 1; /* only a comment; */";
        assert_eq!(split_statements(script), vec!["/* a; b */ SELECT 1"]);
    }

    #[test]
    fn test_minus_is_not_a_comment() {
        assert_eq!(
            split_statements("SELECT 3-1; SELECT 2"),
            vec!["SELECT 3-1", "SELECT 2"]
        );
    }
}
