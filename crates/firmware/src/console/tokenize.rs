//! Command-line tokenizer
//!
//! Splits on space, tab, CR and LF. A token opening with `'` or `"` runs to
//! the matching quote, which is dropped. If the quote is never closed the
//! token is the rest of the line, opening quote included. Tokens past
//! [`CONSOLE_MAX_ARGS`] are ignored.

use platform::config::CONSOLE_MAX_ARGS;

/// Tokens of one command line.
pub type Args<'a> = heapless::Vec<&'a str, CONSOLE_MAX_ARGS>;

fn is_delimiter(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Split `line` into at most [`CONSOLE_MAX_ARGS`] tokens.
pub fn tokenize(line: &str) -> Args<'_> {
    let mut args = Args::new();
    let mut rest = line;

    while !args.is_full() {
        rest = rest.trim_start_matches(is_delimiter);
        let Some(first) = rest.chars().next() else {
            break;
        };

        let (token, next) = match rest.strip_prefix(['\'', '"']) {
            Some(body) => match body.find(first) {
                Some(end) => {
                    let (token, tail) = body.split_at(end);
                    (token, tail.get(first.len_utf8()..).unwrap_or(""))
                }
                None => (rest, ""),
            },
            None => match rest.find(is_delimiter) {
                Some(end) => rest.split_at(end),
                None => (rest, ""),
            },
        };

        // Capacity was checked by the loop condition.
        let _ = args.push(token);
        rest = next;
    }
    args
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    fn toks(line: &str) -> Vec<&str> {
        tokenize(line).iter().copied().collect()
    }

    #[test]
    fn test_splits_on_all_delimiters() {
        assert_eq!(toks("pdc  range\t1 2\r\n"), vec!["pdc", "range", "1", "2"]);
        assert!(toks(" \t\r\n").is_empty());
    }

    #[test]
    fn test_quotes_are_dropped() {
        assert_eq!(toks("args \"a b\" 'c'"), vec!["args", "a b", "c"]);
        assert_eq!(toks("args \"\""), vec!["args", ""]);
    }

    #[test]
    fn test_quote_inside_token_is_literal() {
        assert_eq!(toks("it's"), vec!["it's"]);
    }

    #[test]
    fn test_unclosed_quote_takes_rest_of_line() {
        assert_eq!(toks("args 'a b\r\n"), vec!["args", "'a b\r\n"]);
    }

    #[test]
    fn test_adjacent_quoted_token() {
        assert_eq!(toks("'a'b"), vec!["a", "b"]);
    }

    #[test]
    fn test_token_limit() {
        let line = "a ".repeat(CONSOLE_MAX_ARGS + 4);
        assert_eq!(tokenize(&line).len(), CONSOLE_MAX_ARGS);
    }
}
