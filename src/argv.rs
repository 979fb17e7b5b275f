//! Token surgery applied before clap sees the command line.
//!
//! `prog cmd Yo Ma` becomes `prog cmd --name Yo --surname Ma` for a schema
//! declaring `name, surname, age`: bare tokens after the subcommand are bound
//! to fields in declaration order until the first flag. Everything from the
//! first flag on is left alone, as are tokens beyond the last positional field
//! (clap then reports them).

/// Flags that ask clap for help. Their presence disables rewriting so clap
/// can render help for the untouched command line.
const HELP_FLAGS: [&str; 2] = ["-h", "--help"];

/// Final tokens that print the version instead of dispatching.
const VERSION_TOKENS: [&str; 2] = ["version", "--version"];

/// Index of the first token after the program name and subcommand.
const FIRST_ARG: usize = 2;

/// `true` for `-x`, `--long` and `--long=value`; `false` for negative numbers.
pub fn is_flag(token: &str) -> bool {
    token.starts_with('-') && token.len() > 1 && token.parse::<f64>().is_err()
}

pub fn is_help_request<S: AsRef<str>>(tokens: &[S]) -> bool {
    tokens.iter().any(|t| HELP_FLAGS.contains(&t.as_ref()))
}

pub fn is_version_request<S: AsRef<str>>(tokens: &[S]) -> bool {
    tokens
        .last()
        .is_some_and(|t| VERSION_TOKENS.contains(&t.as_ref()))
}

/// Rewrite leading positional tokens into `--field value` pairs.
pub fn preparse<S: AsRef<str>>(tokens: &[S], positional_fields: &[&str]) -> Vec<String> {
    let tokens: Vec<String> = tokens.iter().map(|t| t.as_ref().to_string()).collect();
    if tokens.len() <= FIRST_ARG || is_help_request(&tokens[..]) {
        return tokens;
    }

    let mut out = tokens[..FIRST_ARG].to_vec();
    let mut fields = positional_fields.iter();
    let mut rest = tokens[FIRST_ARG..].iter();

    for token in rest.by_ref() {
        if is_flag(token) {
            out.push(token.clone());
            break;
        }
        match fields.next() {
            Some(field) => {
                out.push(format!("--{field}"));
                out.push(token.clone());
            }
            None => out.push(token.clone()),
        }
    }
    out.extend(rest.cloned());
    out
}
