//! Command-line interface definition for mcpgate
//!
//! The bridge takes exactly one argument: the upstream SSE URL (spec §6).
//! There are no other flags in the core; debug logging is always on.

use clap::Parser;

/// mcpgate — resilient stdio-to-HTTP/SSE bridge for MCP servers
#[derive(Parser, Debug, Clone)]
#[command(name = "mcpgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Upstream MCP SSE URL. Surrounding single or double quotes are
    /// stripped before use.
    pub url: String,
}

impl Cli {
    /// Parse `std::env::args()`, stripping one layer of surrounding quotes
    /// from the URL argument per spec §6. Exits 1 (not clap's usual 2) if
    /// `<url>` is missing or otherwise fails to parse; `--help`/`--version`
    /// still exit through clap's own codes.
    pub fn parse_args() -> Self {
        match Self::try_parse() {
            Ok(mut cli) => {
                cli.url = strip_surrounding_quotes(&cli.url).to_string();
                cli
            }
            Err(e) => match e.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    e.exit()
                }
                _ => {
                    eprintln!("[mcpgate] {e}");
                    std::process::exit(1);
                }
            },
        }
    }
}

fn strip_surrounding_quotes(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'\'' && last == b'\'') || (first == b'"' && last == b'"') {
            return &s[1..s.len() - 1];
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_double_quotes() {
        assert_eq!(strip_surrounding_quotes("\"http://x\""), "http://x");
    }

    #[test]
    fn strips_single_quotes() {
        assert_eq!(strip_surrounding_quotes("'http://x'"), "http://x");
    }

    #[test]
    fn leaves_unquoted_unchanged() {
        assert_eq!(strip_surrounding_quotes("http://x"), "http://x");
    }

    #[test]
    fn leaves_mismatched_quotes_unchanged() {
        assert_eq!(strip_surrounding_quotes("'http://x\""), "'http://x\"");
    }
}
