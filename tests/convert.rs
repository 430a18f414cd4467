//! Converter integration tests against a scripted stand-in renderer.
//!
//! `/bin/sh` plays the renderer: the option `c` becomes `-c <script>`, and the
//! trailing `- -` placeholders land in `$0`/`$1`. The script reads the HTML on
//! stdin exactly like wkhtmltopdf would.

use tracing_subscriber::EnvFilter;
use wkpdf::{
    Converter, ConverterConfig, DownloadOutput, EmbedOutput, FileOutput, HttpResponse, PdfOutput,
    StringInput, StringOutput, WkPdfError,
};

const HTML: &str = "<html><body><h1>Invoice #42</h1><p>Total: 10 EUR</p></body></html>";

// ── Test helpers ─────────────────────────────────────────────────────────────

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn sh_config() -> ConverterConfig {
    ConverterConfig::builder()
        .binary_path("/bin/sh")
        .timeout_secs(30)
        .build()
        .unwrap()
}

fn scripted<O: PdfOutput>(script: &str, output: O) -> Converter<StringInput, O> {
    init_logging();
    let input = StringInput::from_html(HTML).unwrap();
    let mut converter = Converter::with_config(input, output, sh_config()).unwrap();
    converter.set_option("c", script).unwrap();
    converter
}

// ── Verdicts ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn success_returns_exact_stdout_bytes() {
    let output = scripted("cat", StringOutput::new()).convert().await.unwrap();
    assert_eq!(output.get().unwrap(), HTML.as_bytes());
}

#[tokio::test]
async fn warnings_exit_code_is_success() {
    let script = "cat >/dev/null; echo 'Warning: slow network' >&2; printf '%%PDF-1.4'; exit 1";
    let output = scripted(script, StringOutput::new()).convert().await.unwrap();
    assert_eq!(output.get().unwrap(), b"%PDF-1.4");
}

#[tokio::test]
async fn failure_exit_code_is_shell_error_even_with_output() {
    let script = "cat >/dev/null; printf '%%PDF-1.4'; exit 2";
    let err = scripted(script, StringOutput::new()).convert().await.unwrap_err();
    assert!(matches!(err, WkPdfError::ShellError { code: 2 }), "got: {err}");
}

#[tokio::test]
async fn empty_stdout_is_no_data() {
    let err = scripted("cat >/dev/null", StringOutput::new())
        .convert()
        .await
        .unwrap_err();
    assert!(matches!(err, WkPdfError::NoData), "got: {err}");
}

#[tokio::test]
async fn error_on_stderr_is_binary_error() {
    let script = "cat >/dev/null; echo 'Error: Failed loading page' >&2; printf '%%PDF'";
    let err = scripted(script, StringOutput::new()).convert().await.unwrap_err();
    match err {
        WkPdfError::BinaryError { stderr } => assert_eq!(stderr, "Error: Failed loading page"),
        other => panic!("expected BinaryError, got {other}"),
    }
}

#[tokio::test]
async fn hung_renderer_is_killed() {
    let input = StringInput::from_html(HTML).unwrap();
    let config = ConverterConfig::builder()
        .binary_path("/bin/sh")
        .timeout_secs(1)
        .build()
        .unwrap();
    let mut converter = Converter::with_config(input, StringOutput::new(), config).unwrap();
    converter.set_option("c", "sleep 30").unwrap();

    let err = converter.convert().await.unwrap_err();
    assert!(matches!(err, WkPdfError::RendererTimeout { secs: 1 }), "got: {err}");
}

#[tokio::test]
async fn missing_renderer_fails_to_spawn() {
    let input = StringInput::from_html(HTML).unwrap();
    let config = ConverterConfig::builder()
        .binary_path("/nonexistent/wkhtmltopdf")
        .build()
        .unwrap();
    let converter = Converter::with_config(input, StringOutput::new(), config).unwrap();
    let err = converter.convert().await.unwrap_err();
    assert!(matches!(err, WkPdfError::SpawnFailed { .. }), "got: {err}");
}

#[test]
fn sync_conversion() {
    let output = scripted("cat", StringOutput::new()).convert_sync().unwrap();
    assert_eq!(output.into_bytes().unwrap(), HTML.as_bytes());
}

// ── Options & command line ───────────────────────────────────────────────────

#[test]
fn options_reach_the_command_line_in_insertion_order() {
    let input = StringInput::from_html(HTML).unwrap();
    let config = ConverterConfig::builder()
        .binary_path("/usr/local/bin/wkhtmltopdf")
        .build()
        .unwrap();
    let mut converter = Converter::with_config(input, StringOutput::new(), config).unwrap();
    converter.set_option("R", "500").unwrap();
    converter.set_option("margin-top", "100").unwrap();
    converter
        .set_options([("B", "50"), ("margin-left", "10")])
        .unwrap();
    converter.set_options(["grayscale"]).unwrap();

    assert_eq!(
        converter.command_line().unwrap(),
        "'/usr/local/bin/wkhtmltopdf' -R '500' --margin-top '100' -B '50' \
         --margin-left '10' --grayscale - -"
    );
    assert_eq!(converter.option("B").unwrap(), "50");
    assert_eq!(converter.option("grayscale").unwrap(), "");
}

#[test]
fn stdio_placeholders_follow_options() {
    // $0 and $1 are the two placeholders.
    let output = scripted("cat >/dev/null; printf '%s|%s' \"$0\" \"$1\"", StringOutput::new())
        .convert_sync()
        .unwrap();
    assert_eq!(output.get().unwrap(), b"-|-");
}

// ── Sinks ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn file_sink_round_trips_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.pdf");

    let output = scripted("cat", FileOutput::new()).convert().await.unwrap();
    output.store(&path).unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), HTML.as_bytes());
}

#[tokio::test]
async fn file_sink_rejects_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("sample.pdf");

    let output = scripted("cat", FileOutput::new()).convert().await.unwrap();
    let err = output.store(&path).unwrap_err();
    assert!(matches!(err, WkPdfError::DirectoryNotWritable { .. }), "got: {err}");
}

#[tokio::test]
async fn download_sends_attachment_once() {
    let output = scripted("cat", DownloadOutput::new()).convert().await.unwrap();

    let mut response = HttpResponse::new(Vec::new());
    output.download(&mut response, "sample.pdf").unwrap();
    assert!(response.is_finished());

    let err = output.download(&mut response, "sample.pdf").unwrap_err();
    assert!(matches!(err, WkPdfError::HeadersAlreadySent));

    let raw = String::from_utf8(response.into_inner()).unwrap();
    assert!(raw.contains("Content-Type: application/pdf\r\n"));
    assert!(raw.contains("Content-Disposition: attachment; filename=\"sample.pdf\"\r\n"));
    assert!(raw.ends_with(&format!("\r\n\r\n{HTML}")));
}

#[tokio::test]
async fn embed_sends_inline_once() {
    let output = scripted("cat", EmbedOutput::new()).convert().await.unwrap();

    let mut response = HttpResponse::with_status_line(Vec::new());
    output.embed(&mut response, "sample.pdf").unwrap();
    let err = output.embed(&mut response, "sample.pdf").unwrap_err();
    assert!(matches!(err, WkPdfError::HeadersAlreadySent));

    let raw = String::from_utf8(response.into_inner()).unwrap();
    assert!(raw.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(raw.contains("Content-Disposition: inline; filename=\"sample.pdf\"\r\n"));
    assert!(raw.contains(&format!("Content-Length: {}\r\n", HTML.len())));
}

#[tokio::test]
async fn converted_sink_rejects_second_payload() {
    let mut output = scripted("cat", StringOutput::new()).convert().await.unwrap();
    let err = output.set_pdf_data(b"%PDF".to_vec()).unwrap_err();
    assert!(matches!(err, WkPdfError::PdfDataAlreadySet));
}

// ── Renderer discovery ───────────────────────────────────────────────────────

#[cfg(unix)]
#[tokio::test]
async fn search_root_supplies_the_renderer() {
    if std::env::var_os(wkhtmltopdf_locate::ENV_BINARY_PATH).is_some() {
        println!("SKIP — WKHTMLTOPDF_PATH takes precedence over search roots");
        return;
    }

    let root = tempfile::tempdir().unwrap();
    let variant = wkhtmltopdf_locate::detect_variant();
    let binary = root.path().join(variant.vendor_relative_path());
    std::fs::create_dir_all(binary.parent().unwrap()).unwrap();
    std::os::unix::fs::symlink("/bin/cat", &binary).unwrap();

    let config = ConverterConfig::builder()
        .search_root(root.path())
        .timeout_secs(30)
        .build()
        .unwrap();
    let input = StringInput::from_html(HTML).unwrap();
    let converter = Converter::with_config(input, StringOutput::new(), config).unwrap();

    assert_eq!(converter.config().search_roots, [root.path().to_path_buf()]);
    assert!(converter.config().binary_path.is_none());
    assert_eq!(
        converter.command_line().unwrap(),
        format!("'{}' - -", binary.display())
    );
    let output = converter.convert().await.unwrap();
    assert_eq!(output.get().unwrap(), HTML.as_bytes());
}

#[tokio::test]
async fn empty_search_root_lists_searched_paths() {
    if std::env::var_os(wkhtmltopdf_locate::ENV_BINARY_PATH).is_some() {
        println!("SKIP — WKHTMLTOPDF_PATH takes precedence over search roots");
        return;
    }
    if wkhtmltopdf_locate::locate_in(&[]).is_ok() {
        println!("SKIP — a renderer is installed on this host");
        return;
    }

    let root = tempfile::tempdir().unwrap();
    let config = ConverterConfig::builder()
        .search_root(root.path())
        .build()
        .unwrap();
    let input = StringInput::from_html(HTML).unwrap();
    let converter = Converter::with_config(input, StringOutput::new(), config).unwrap();

    let err = converter.convert().await.unwrap_err();
    assert!(matches!(err, WkPdfError::BinaryNotFound(_)), "got: {err}");
    assert!(err.to_string().contains(&root.path().display().to_string()));
}
