//! The HTML → PDF converter.
//!
//! A [`Converter`] owns one input, one output, the renderer options and a
//! [`ConverterConfig`]. [`Converter::convert`] consumes it: a conversion is
//! one-shot, and on success the output sink comes back holding the PDF.

use crate::command::RenderCommand;
use crate::config::ConverterConfig;
use crate::error::WkPdfError;
use crate::input::HtmlInput;
use crate::options::{OptionEntry, Options};
use crate::output::PdfOutput;
use crate::process::{self, ExecutionResult};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Exit code the renderer uses for "done, with warnings".
pub const EXIT_WARNINGS: i32 = 1;

/// Converts the HTML of `I` into PDF bytes delivered to `O`.
///
/// # Example
/// ```rust,no_run
/// use wkpdf::{Converter, StringInput, StringOutput};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let input = StringInput::from_html("<h1>Hello</h1>")?;
/// let mut converter = Converter::new(input, StringOutput::new())?;
/// converter.set_option("margin-top", "10")?.set_option("grayscale", "")?;
///
/// let output = converter.convert().await?;
/// std::fs::write("hello.pdf", output.get()?)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Converter<I, O> {
    input: I,
    output: O,
    options: Options,
    config: ConverterConfig,
}

impl<I: HtmlInput, O: PdfOutput> Converter<I, O> {
    /// Create a converter with default configuration.
    ///
    /// # Errors
    /// [`WkPdfError::UnsupportedPlatform`] if the host cannot run the renderer.
    pub fn new(input: I, output: O) -> Result<Self, WkPdfError> {
        Self::with_config(input, output, ConverterConfig::default())
    }

    /// Create a converter with an explicit configuration.
    pub fn with_config(input: I, output: O, config: ConverterConfig) -> Result<Self, WkPdfError> {
        process::check_requirements()?;
        Ok(Self {
            input,
            output,
            options: Options::new(),
            config,
        })
    }

    /// Create a converter and set several options at once.
    pub fn with_options<It, E>(input: I, output: O, options: It) -> Result<Self, WkPdfError>
    where
        It: IntoIterator<Item = E>,
        E: Into<OptionEntry>,
    {
        let mut converter = Self::new(input, output)?;
        converter.set_options(options)?;
        Ok(converter)
    }

    // ── Options ──────────────────────────────────────────────────────────

    /// Set a single renderer option, given without its `-`/`--` prefix.
    pub fn set_option(&mut self, key: &str, value: impl Into<String>) -> Result<&mut Self, WkPdfError> {
        self.options.set(key, value)?;
        Ok(self)
    }

    /// Set several options; bare names become flag-only options.
    pub fn set_options<It, E>(&mut self, options: It) -> Result<&mut Self, WkPdfError>
    where
        It: IntoIterator<Item = E>,
        E: Into<OptionEntry>,
    {
        self.options.extend(options)?;
        Ok(self)
    }

    /// Value of a single option.
    pub fn option(&self, key: &str) -> Result<&str, WkPdfError> {
        self.options.get(key)
    }

    /// All options in insertion order.
    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    // ── Conversion ───────────────────────────────────────────────────────

    /// The shell line the next conversion would run.
    ///
    /// Resolves the renderer, so this fails when it cannot be found.
    pub fn command_line(&self) -> Result<String, WkPdfError> {
        Ok(self.build_command()?.to_shell_line())
    }

    /// Run the renderer and hand its PDF bytes to the output sink.
    ///
    /// # Errors
    /// - [`WkPdfError::InputNotSet`] if the input has no HTML yet
    /// - [`WkPdfError::BinaryNotFound`] if the renderer cannot be located
    /// - [`WkPdfError::BinaryError`], [`WkPdfError::ShellError`],
    ///   [`WkPdfError::NoData`] as classified by [`interpret`]
    pub async fn convert(mut self) -> Result<O, WkPdfError> {
        let start = Instant::now();
        let html = self.input.html()?;
        let command = self.build_command()?;
        info!(
            "Starting conversion: {} bytes of HTML, {} options",
            html.len(),
            self.options.len()
        );

        let result = process::execute(&command, html.as_bytes(), self.config.timeout()).await?;
        let pdf = interpret(result)?;

        info!(
            "Conversion complete: {} bytes in {}ms",
            pdf.len(),
            start.elapsed().as_millis()
        );

        self.output.set_pdf_data(pdf)?;
        Ok(self.output)
    }

    /// Synchronous wrapper around [`Converter::convert`].
    ///
    /// Creates a temporary tokio runtime internally.
    pub fn convert_sync(self) -> Result<O, WkPdfError> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| WkPdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.convert())
    }

    fn build_command(&self) -> Result<RenderCommand, WkPdfError> {
        let binary = self.resolve_binary()?;
        let command = RenderCommand::build(binary, &self.options);
        debug!("Renderer command: {}", command);
        Ok(command)
    }

    fn resolve_binary(&self) -> Result<PathBuf, WkPdfError> {
        if let Some(ref path) = self.config.binary_path {
            return Ok(path.clone());
        }
        let path = if self.config.search_roots.is_empty() {
            wkhtmltopdf_locate::locate()?
        } else {
            wkhtmltopdf_locate::locate_in(&self.config.search_roots)?
        };
        Ok(path)
    }
}

/// Classify one renderer run.
///
/// Checks, in order:
/// 1. stderr mentions `error` (any case) → [`WkPdfError::BinaryError`]
/// 2. exit code above [`EXIT_WARNINGS`] → [`WkPdfError::ShellError`]
/// 3. stdout is empty → [`WkPdfError::NoData`]
///
/// The substring test is coarse: a warning that merely contains the word
/// "error" (say, a page titled "Error handling") fails the conversion even
/// though a PDF was produced.
pub fn interpret(result: ExecutionResult) -> Result<Vec<u8>, WkPdfError> {
    if result.stderr.to_lowercase().contains("error") {
        return Err(WkPdfError::BinaryError {
            stderr: result.stderr.trim().to_string(),
        });
    }

    if result.exit_code > EXIT_WARNINGS {
        return Err(WkPdfError::ShellError {
            code: result.exit_code,
        });
    }

    if result.stdout.is_empty() {
        return Err(WkPdfError::NoData);
    }

    if result.exit_code == EXIT_WARNINGS {
        warn!("Renderer finished with warnings: {}", result.stderr.trim());
    }

    Ok(result.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::StringInput;
    use crate::output::StringOutput;

    fn run(stdout: &[u8], stderr: &str, exit_code: i32) -> ExecutionResult {
        ExecutionResult {
            stdout: stdout.to_vec(),
            stderr: stderr.to_string(),
            exit_code,
        }
    }

    fn converter() -> Converter<StringInput, StringOutput> {
        let input = StringInput::from_html("<h1>Hello</h1>").unwrap();
        Converter::new(input, StringOutput::new()).unwrap()
    }

    #[test]
    fn clean_run_succeeds() {
        assert_eq!(interpret(run(b"%PDF", "", 0)).unwrap(), b"%PDF");
    }

    #[test]
    fn warnings_exit_code_still_succeeds() {
        let out = interpret(run(b"%PDF", "Warning: slow page", 1)).unwrap();
        assert_eq!(out, b"%PDF");
    }

    #[test]
    fn error_text_wins_over_everything() {
        for stderr in ["Error: Failed loading page", "network ERROR", "some error"] {
            let err = interpret(run(b"%PDF", stderr, 0)).unwrap_err();
            assert!(matches!(err, WkPdfError::BinaryError { .. }), "{stderr}");
        }
        let err = interpret(run(b"", "Error", 2)).unwrap_err();
        assert!(matches!(err, WkPdfError::BinaryError { .. }));
    }

    #[test]
    fn failure_exit_code_regardless_of_stdout() {
        let err = interpret(run(b"%PDF", "", 2)).unwrap_err();
        assert!(matches!(err, WkPdfError::ShellError { code: 2 }));
        let err = interpret(run(b"", "", 139)).unwrap_err();
        assert!(matches!(err, WkPdfError::ShellError { code: 139 }));
    }

    #[test]
    fn empty_stdout_is_no_data() {
        assert!(matches!(interpret(run(b"", "", 0)), Err(WkPdfError::NoData)));
        assert!(matches!(interpret(run(b"", "warn", 1)), Err(WkPdfError::NoData)));
    }

    #[test]
    fn converter_options_round_trip() {
        let mut c = converter();
        c.set_option("R", "500").unwrap();
        c.set_option("margin-top", "100").unwrap();
        c.set_options([("B", "50"), ("margin-left", "10")]).unwrap();

        assert_eq!(c.option("R").unwrap(), "500");
        assert_eq!(c.option("margin-top").unwrap(), "100");

        let all: Vec<_> = c.options().iter().collect();
        assert_eq!(
            all,
            vec![
                ("R", "500"),
                ("margin-top", "100"),
                ("B", "50"),
                ("margin-left", "10"),
            ]
        );
    }

    #[test]
    fn with_options_rejects_prefixed_keys() {
        let input = StringInput::from_html("<p>x</p>").unwrap();
        let err = Converter::with_options(input, StringOutput::new(), [("--zoom", "2")]).unwrap_err();
        assert!(matches!(err, WkPdfError::PrefixedOptionKey { .. }));
    }

    #[test]
    fn command_line_uses_configured_binary() {
        let input = StringInput::from_html("<p>x</p>").unwrap();
        let config = ConverterConfig::builder()
            .binary_path("/opt/wk/wkhtmltopdf")
            .build()
            .unwrap();
        let mut c = Converter::with_config(input, StringOutput::new(), config).unwrap();
        c.set_options(["grayscale"]).unwrap();
        c.set_option("zoom", "2").unwrap();
        assert_eq!(
            c.command_line().unwrap(),
            "'/opt/wk/wkhtmltopdf' --grayscale --zoom '2' - -"
        );
    }

    #[tokio::test]
    async fn unset_input_fails_before_spawn() {
        let config = ConverterConfig::builder()
            .binary_path("/definitely/not/here")
            .build()
            .unwrap();
        let c = Converter::with_config(StringInput::new(), StringOutput::new(), config).unwrap();
        assert!(matches!(c.convert().await, Err(WkPdfError::InputNotSet)));
    }
}
