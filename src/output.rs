//! Output sinks for finished PDF data.
//!
//! A conversion hands its bytes to exactly one sink through
//! [`PdfOutput::set_pdf_data`] and returns the sink to the caller, who then
//! picks the delivery: keep the bytes ([`StringOutput`]), write a file
//! ([`FileOutput`]), or answer an HTTP request as a download
//! ([`DownloadOutput`]) or inline view ([`EmbedOutput`]).

use crate::error::WkPdfError;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// MIME type of every PDF response.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Accepts the finished PDF bytes of one conversion.
pub trait PdfOutput {
    /// Store the PDF bytes.
    ///
    /// # Errors
    /// [`WkPdfError::PdfDataAlreadySet`] if data was stored before.
    fn set_pdf_data(&mut self, data: Vec<u8>) -> Result<(), WkPdfError>;

    /// The stored PDF bytes.
    ///
    /// # Errors
    /// [`WkPdfError::PdfDataNotSet`] before a conversion succeeded.
    fn pdf_data(&self) -> Result<&[u8], WkPdfError>;
}

/// Write-once holder shared by every sink.
#[derive(Debug, Clone, Default)]
struct PdfSlot(Option<Vec<u8>>);

impl PdfSlot {
    fn set(&mut self, data: Vec<u8>) -> Result<(), WkPdfError> {
        if self.0.is_some() {
            return Err(WkPdfError::PdfDataAlreadySet);
        }
        self.0 = Some(data);
        Ok(())
    }

    fn get(&self) -> Result<&[u8], WkPdfError> {
        self.0.as_deref().ok_or(WkPdfError::PdfDataNotSet)
    }
}

macro_rules! impl_pdf_output {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl PdfOutput for $ty {
                fn set_pdf_data(&mut self, data: Vec<u8>) -> Result<(), WkPdfError> {
                    self.data.set(data)
                }

                fn pdf_data(&self) -> Result<&[u8], WkPdfError> {
                    self.data.get()
                }
            }
        )+
    };
}

impl_pdf_output!(StringOutput, FileOutput, DownloadOutput, EmbedOutput);

// ── String ───────────────────────────────────────────────────────────────

/// Returns the PDF bytes to the caller as-is.
#[derive(Debug, Clone, Default)]
pub struct StringOutput {
    data: PdfSlot,
}

impl StringOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// The PDF contents.
    pub fn get(&self) -> Result<&[u8], WkPdfError> {
        self.data.get()
    }

    /// Take ownership of the PDF contents.
    pub fn into_bytes(self) -> Result<Vec<u8>, WkPdfError> {
        self.data.0.ok_or(WkPdfError::PdfDataNotSet)
    }
}

// ── File ─────────────────────────────────────────────────────────────────

/// Writes the PDF bytes to a path on disk.
#[derive(Debug, Clone, Default)]
pub struct FileOutput {
    data: PdfSlot,
}

impl FileOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the PDF to `path`.
    ///
    /// Atomic write: the bytes go to `<path>.pdf.tmp` next to the target and
    /// are renamed into place, so a failed write never leaves a truncated
    /// PDF behind. The file is created with the process umask applied.
    ///
    /// # Errors
    /// - [`WkPdfError::DirectoryNotWritable`] if the parent directory is
    ///   missing or read-only
    /// - [`WkPdfError::OutputWriteFailed`] if writing or renaming fails
    pub fn store(&self, path: impl AsRef<Path>) -> Result<(), WkPdfError> {
        let data = self.data.get()?;
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let not_writable = || WkPdfError::DirectoryNotWritable {
            path: dir.to_path_buf(),
        };
        let meta = std::fs::metadata(dir).map_err(|_| not_writable())?;
        if !meta.is_dir() || meta.permissions().readonly() {
            return Err(not_writable());
        }

        let write_failed = |source: std::io::Error| WkPdfError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        let tmp_path = path.with_extension("pdf.tmp");
        let written = std::fs::File::create(&tmp_path)
            .and_then(|mut file| {
                file.write_all(data)?;
                file.sync_all()
            })
            .and_then(|()| std::fs::rename(&tmp_path, path));

        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(if e.kind() == std::io::ErrorKind::PermissionDenied {
                not_writable()
            } else {
                write_failed(e)
            });
        }

        info!("Wrote {} bytes to {}", data.len(), path.display());
        Ok(())
    }
}

// ── HTTP response context ────────────────────────────────────────────────

/// One HTTP response written to `W`.
///
/// Headers can be sent once; after that only body bytes may follow. By
/// default the response is CGI-style (header block, blank line, body). Use
/// [`HttpResponse::with_status_line`] to prefix `HTTP/1.1 200 OK` when
/// writing straight to a socket.
#[derive(Debug)]
pub struct HttpResponse<W: Write> {
    writer: W,
    status_line: bool,
    headers_sent: bool,
    finished: bool,
}

impl<W: Write> HttpResponse<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            status_line: false,
            headers_sent: false,
            finished: false,
        }
    }

    pub fn with_status_line(writer: W) -> Self {
        Self {
            status_line: true,
            ..Self::new(writer)
        }
    }

    /// `true` once any header block or body byte went out.
    pub fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    /// `true` once [`HttpResponse::finish`] ran.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Emit the header block.
    ///
    /// # Errors
    /// [`WkPdfError::HeadersAlreadySent`] on any call after the first.
    pub fn send_headers(&mut self, headers: &[(&str, String)]) -> Result<(), WkPdfError> {
        if self.headers_sent {
            return Err(WkPdfError::HeadersAlreadySent);
        }
        self.headers_sent = true;

        let mut block = String::new();
        if self.status_line {
            block.push_str("HTTP/1.1 200 OK\r\n");
        }
        for (name, value) in headers {
            block.push_str(name);
            block.push_str(": ");
            block.push_str(value);
            block.push_str("\r\n");
        }
        block.push_str("\r\n");

        self.writer
            .write_all(block.as_bytes())
            .map_err(WkPdfError::ResponseWriteFailed)
    }

    /// Emit body bytes, sending an empty header block first if needed.
    pub fn write_body(&mut self, bytes: &[u8]) -> Result<(), WkPdfError> {
        if self.finished {
            return Err(WkPdfError::HeadersAlreadySent);
        }
        if !self.headers_sent {
            self.send_headers(&[])?;
        }
        self.writer
            .write_all(bytes)
            .map_err(WkPdfError::ResponseWriteFailed)
    }

    /// Flush and close the response; later writes fail.
    pub fn finish(&mut self) -> Result<(), WkPdfError> {
        self.finished = true;
        self.writer.flush().map_err(WkPdfError::ResponseWriteFailed)
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// How the browser should treat the PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Attachment,
    Inline,
}

impl Disposition {
    fn as_str(self) -> &'static str {
        match self {
            Disposition::Attachment => "attachment",
            Disposition::Inline => "inline",
        }
    }
}

/// Strip characters that would break out of a quoted header parameter.
fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if c == '"' || c == '\\' { '_' } else { c })
        .collect()
}

fn pdf_headers(filename: &str, len: usize, disposition: Disposition) -> Vec<(&'static str, String)> {
    let mut headers = vec![
        ("Content-Type", PDF_CONTENT_TYPE.to_string()),
        (
            "Content-Disposition",
            format!(
                "{}; filename=\"{}\"",
                disposition.as_str(),
                sanitize_filename(filename)
            ),
        ),
        ("Content-Length", len.to_string()),
        ("Cache-Control", "private, max-age=0, must-revalidate".to_string()),
        ("Pragma", "public".to_string()),
    ];
    if disposition == Disposition::Attachment {
        headers.insert(0, ("Content-Description", "File Transfer".to_string()));
        headers.push(("Content-Transfer-Encoding", "binary".to_string()));
    }
    headers
}

fn respond<W: Write>(
    data: &[u8],
    response: &mut HttpResponse<W>,
    filename: &str,
    disposition: Disposition,
) -> Result<(), WkPdfError> {
    if filename.trim().is_empty() {
        return Err(WkPdfError::MissingFilename);
    }
    if response.headers_sent() {
        return Err(WkPdfError::HeadersAlreadySent);
    }

    let headers = pdf_headers(filename, data.len(), disposition);
    response.send_headers(&headers)?;
    response.write_body(data)?;
    response.finish()?;

    debug!(
        "Sent {} bytes as {} '{}'",
        data.len(),
        disposition.as_str(),
        filename
    );
    Ok(())
}

// ── Download ─────────────────────────────────────────────────────────────

/// Sends the PDF as a file download.
#[derive(Debug, Clone, Default)]
pub struct DownloadOutput {
    data: PdfSlot,
}

impl DownloadOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit download headers for `filename`, the PDF bytes, and finish
    /// the response.
    ///
    /// # Errors
    /// - [`WkPdfError::MissingFilename`] if `filename` is empty
    /// - [`WkPdfError::HeadersAlreadySent`] if `response` already sent headers
    pub fn download<W: Write>(
        &self,
        response: &mut HttpResponse<W>,
        filename: &str,
    ) -> Result<(), WkPdfError> {
        respond(self.data.get()?, response, filename, Disposition::Attachment)
    }
}

// ── Embed ────────────────────────────────────────────────────────────────

/// Sends the PDF for inline display in the browser.
#[derive(Debug, Clone, Default)]
pub struct EmbedOutput {
    data: PdfSlot,
}

impl EmbedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit inline headers for `filename`, the PDF bytes, and finish the
    /// response. Same failure conditions as [`DownloadOutput::download`].
    pub fn embed<W: Write>(
        &self,
        response: &mut HttpResponse<W>,
        filename: &str,
    ) -> Result<(), WkPdfError> {
        respond(self.data.get()?, response, filename, Disposition::Inline)
    }
}
