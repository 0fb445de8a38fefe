//! Interactive command line parsing
//!
//! Splits a line into whitespace-separated tokens. Single or double quotes
//! group text containing whitespace; there are no escape sequences. Parsing
//! never fails: an unterminated quote runs to the end of the line.

use std::ops::Range;

/// A parsed line of interactive input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// First token, as typed
    pub verb: String,

    /// Remaining tokens with quotes removed
    pub args: Vec<String>,

    /// Raw text after the verb, trimmed
    pub rest: String,
}

impl ParsedCommand {
    /// Parse a line; blank input yields `None`
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = scan(line).into_iter();
        let (verb, span) = tokens.next()?;

        Some(Self {
            verb,
            args: tokens.map(|(token, _)| token).collect(),
            rest: line[span.end..].trim().to_string(),
        })
    }
}

/// Split a line into tokens
pub fn tokenize(line: &str) -> Vec<String> {
    scan(line).into_iter().map(|(token, _)| token).collect()
}

/// Tokens with the byte range each one covers in `line`
fn scan(line: &str) -> Vec<(String, Range<usize>)> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut start: Option<usize> = None;
    let mut quote: Option<char> = None;

    for (i, ch) in line.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                start.get_or_insert(i);
            }
            None if ch.is_whitespace() => {
                if let Some(s) = start.take() {
                    tokens.push((std::mem::take(&mut current), s..i));
                }
            }
            None => {
                current.push(ch);
                start.get_or_insert(i);
            }
        }
    }

    if let Some(s) = start {
        tokens.push((current, s..line.len()));
    }

    tokens
}

/// Quote a token so that [`tokenize`] reads it back unchanged
pub fn quote(token: &str) -> String {
    let plain = !token.is_empty()
        && !token
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '\'');
    if plain {
        return token.to_string();
    }
    if !token.contains('"') {
        return format!("\"{}\"", token);
    }
    if !token.contains('\'') {
        return format!("'{}'", token);
    }

    // Both quote characters: double-quote the runs between '"' characters
    // and single-quote each '"'. Adjacent quoted pieces join into one token.
    let mut out = String::new();
    for (i, run) in token.split('"').enumerate() {
        if i > 0 {
            out.push_str("'\"'");
        }
        if !run.is_empty() {
            out.push('"');
            out.push_str(run);
            out.push('"');
        }
    }
    out
}

/// Join tokens into a line that tokenizes back to the same tokens
pub fn join(tokens: &[String]) -> String {
    tokens.iter().map(|t| quote(t)).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_argument() {
        let cmd = ParsedCommand::parse(r#"write a.txt "hello world""#).unwrap();
        assert_eq!(cmd.verb, "write");
        assert_eq!(cmd.args, vec!["a.txt", "hello world"]);
        assert_eq!(cmd.rest, r#"a.txt "hello world""#);
    }

    #[test]
    fn test_whitespace_handling() {
        assert_eq!(tokenize("  ls   src\t docs  "), vec!["ls", "src", "docs"]);
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \t ").is_empty());
        assert!(ParsedCommand::parse("   ").is_none());
    }

    #[test]
    fn test_single_quotes_and_mixed() {
        assert_eq!(tokenize("echo 'it \"works\"'"), vec!["echo", "it \"works\""]);
        assert_eq!(tokenize("a\"b c\"d"), vec!["ab cd"]);
        assert_eq!(tokenize("x \"\" y"), vec!["x", "", "y"]);
    }

    #[test]
    fn test_unterminated_quote() {
        assert_eq!(tokenize("write f.txt \"hello  world"), vec!["write", "f.txt", "hello  world"]);
        assert_eq!(tokenize("say 'oops"), vec!["say", "oops"]);
    }

    #[test]
    fn test_rest_keeps_raw_text() {
        let cmd = ParsedCommand::parse("calc   max(1,  2) * 'x'  ").unwrap();
        assert_eq!(cmd.verb, "calc");
        assert_eq!(cmd.rest, "max(1,  2) * 'x'");

        let cmd = ParsedCommand::parse("tools").unwrap();
        assert!(cmd.args.is_empty());
        assert_eq!(cmd.rest, "");
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("plain"), "plain");
        assert_eq!(quote(""), "\"\"");
        assert_eq!(quote("two words"), "\"two words\"");
        assert_eq!(quote("say \"hi\""), "'say \"hi\"'");
    }

    #[test]
    fn test_join_then_tokenize_is_identity() {
        let cases: Vec<Vec<String>> = vec![
            vec!["write".into(), "a.txt".into(), "hello world".into()],
            vec!["x".into(), "".into(), "it's".into()],
            vec!["both \"kinds\" of 'quote'".into(), "a\"b'c".into()],
            vec!["\"".into(), "'".into(), "\t tab".into()],
        ];

        for tokens in cases {
            let line = join(&tokens);
            assert_eq!(tokenize(&line), tokens, "line: {}", line);
            assert_eq!(tokenize(&join(&tokenize(&line))), tokens);
        }
    }
}
