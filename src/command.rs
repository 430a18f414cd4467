//! Renderer command construction.
//!
//! A [`RenderCommand`] is the argv handed to the renderer. The same value
//! renders as a POSIX shell line via [`RenderCommand::to_shell_line`] for
//! logs and `--print-command`; the executor spawns the argv directly, so
//! the two never drift apart.

use crate::options::Options;
use std::fmt;
use std::path::{Path, PathBuf};

/// Prefix for single-character options (`-B 50`).
pub const PREFIX_SHORT: &str = "-";

/// Prefix for long options (`--margin-top 10`).
pub const PREFIX_LONG: &str = "--";

/// Positional arguments telling the renderer to read stdin and write stdout.
pub const STDIO_PLACEHOLDERS: [&str; 2] = ["-", "-"];

/// Program plus arguments for one renderer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCommand {
    program: PathBuf,
    /// Prefixed option name and its value, if non-empty.
    flags: Vec<(String, Option<String>)>,
}

impl RenderCommand {
    /// Build the command for `binary` with `options` in insertion order.
    ///
    /// Names and values are trimmed; an empty value emits the flag alone.
    pub fn build(binary: impl Into<PathBuf>, options: &Options) -> Self {
        let flags = options
            .iter()
            .map(|(key, value)| {
                let value = value.trim();
                let value = (!value.is_empty()).then(|| value.to_string());
                (prefixed_key(key), value)
            })
            .collect();

        Self {
            program: binary.into(),
            flags,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments in spawn order, ending with the stdin/stdout placeholders.
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.flags.len() * 2 + STDIO_PLACEHOLDERS.len());
        for (flag, value) in &self.flags {
            args.push(flag.clone());
            if let Some(v) = value {
                args.push(v.clone());
            }
        }
        args.extend(STDIO_PLACEHOLDERS.iter().map(|s| s.to_string()));
        args
    }

    /// Render as a single escaped shell command line.
    ///
    /// Option names are escaped like PHP's `escapeshellcmd`, values are
    /// single-quoted like `escapeshellarg`.
    pub fn to_shell_line(&self) -> String {
        let mut line = escape_arg(&self.program.to_string_lossy());
        for (flag, value) in &self.flags {
            line.push(' ');
            line.push_str(&escape_cmd(flag));
            if let Some(v) = value {
                line.push(' ');
                line.push_str(&escape_arg(v));
            }
        }
        for placeholder in STDIO_PLACEHOLDERS {
            line.push(' ');
            line.push_str(placeholder);
        }
        line
    }
}

impl fmt::Display for RenderCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_shell_line())
    }
}

/// Apply `-` to one-character keys and `--` to longer ones.
pub fn prefixed_key(key: &str) -> String {
    let key = key.trim();
    if key.chars().count() == 1 {
        format!("{PREFIX_SHORT}{key}")
    } else {
        format!("{PREFIX_LONG}{key}")
    }
}

/// Backslash-escape shell metacharacters (`escapeshellcmd` semantics).
pub fn escape_cmd(s: &str) -> String {
    const META: &[char] = &[
        '#', '&', ';', '`', '|', '*', '?', '~', '<', '>', '^', '(', ')', '[', ']', '{', '}', '$',
        '\\', ',', '\n', '\u{FF}', '\'', '"',
    ];
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if META.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Single-quote an argument (`escapeshellarg` semantics).
pub fn escape_arg(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(entries: &[(&str, &str)]) -> Options {
        let mut o = Options::new();
        for (k, v) in entries {
            o.set(k, *v).unwrap();
        }
        o
    }

    #[test]
    fn short_and_long_prefixes() {
        assert_eq!(prefixed_key("B"), "-B");
        assert_eq!(prefixed_key("margin-top"), "--margin-top");
        assert_eq!(prefixed_key(" zoom "), "--zoom");
    }

    #[test]
    fn args_follow_insertion_order() {
        let cmd = RenderCommand::build(
            "/usr/bin/wkhtmltopdf",
            &opts(&[("B", "50"), ("grayscale", ""), ("margin-top", " 10 ")]),
        );
        assert_eq!(
            cmd.args(),
            vec!["-B", "50", "--grayscale", "--margin-top", "10", "-", "-"]
        );
        assert_eq!(cmd.program(), Path::new("/usr/bin/wkhtmltopdf"));
    }

    #[test]
    fn no_options_only_placeholders() {
        let cmd = RenderCommand::build("/bin/wk", &Options::new());
        assert_eq!(cmd.args(), vec!["-", "-"]);
        assert_eq!(cmd.to_shell_line(), "'/bin/wk' - -");
    }

    #[test]
    fn shell_line_quotes_values() {
        let cmd = RenderCommand::build(
            "/opt/wk",
            &opts(&[("title", "It's a test"), ("q", ""), ("zoom", "2")]),
        );
        assert_eq!(
            cmd.to_shell_line(),
            r"'/opt/wk' --title 'It'\''s a test' -q --zoom '2' - -"
        );
        assert_eq!(cmd.to_string(), cmd.to_shell_line());
    }

    #[test]
    fn shell_line_escapes_metacharacters_in_names() {
        let cmd = RenderCommand::build("/opt/wk", &opts(&[("foo;rm", "")]));
        assert_eq!(cmd.to_shell_line(), r"'/opt/wk' --foo\;rm - -");
        // argv is passed verbatim; no shell ever sees it.
        assert_eq!(cmd.args()[0], "--foo;rm");
    }

    #[test]
    fn dash_value_stays_a_value() {
        let cmd = RenderCommand::build("/opt/wk", &opts(&[("footer-left", "-[page]-")]));
        assert_eq!(cmd.args(), vec!["--footer-left", "-[page]-", "-", "-"]);
        assert_eq!(
            cmd.to_shell_line(),
            "'/opt/wk' --footer-left '-[page]-' - -"
        );
    }

    #[test]
    fn escape_helpers() {
        assert_eq!(escape_arg("plain"), "'plain'");
        assert_eq!(escape_arg("a'b"), r"'a'\''b'");
        assert_eq!(escape_cmd("a$b"), r"a\$b");
        assert_eq!(escape_cmd("safe-name"), "safe-name");
    }
}
