use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;

/// Fixed prefix of every generated boundary token.
pub const BOUNDARY_PREFIX: &str = "copyleaks.boundary.";

/// Generate a multipart boundary: the fixed prefix plus two random 32-bit
/// hex groups. Collisions with body content are treated as negligible;
/// this is not a cryptographic token.
pub fn generate_boundary() -> String {
    format!(
        "{}{:08x}{:08x}",
        BOUNDARY_PREFIX,
        rand::random::<u32>(),
        rand::random::<u32>()
    )
}

/// MIME type for a file extension, `application/octet-stream` when unknown.
pub fn mime_for_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "rtf" => "application/rtf",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "odt" => "application/vnd.oasis.opendocument.text",
        "xml" => "application/xml",
        "json" => "application/json",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// MIME type for a file name, looked up by its extension.
pub fn mime_for_file_name(file_name: &str) -> &'static str {
    file_name
        .rsplit_once('.')
        .map(|(_, extension)| mime_for_extension(extension))
        .unwrap_or("application/octet-stream")
}

/// Encode a single-file `multipart/form-data` body.
///
/// The service expects exactly one `file` field whose payload is the
/// base64-encoded file content with `Content-Transfer-Encoding: binary`.
pub fn encode_file_part(file_name: &str, contents: &[u8], boundary: &str) -> Bytes {
    let mime = mime_for_file_name(file_name);
    let encoded = BASE64.encode(contents);

    let mut body = String::with_capacity(encoded.len() + file_name.len() + 256);
    body.push_str(&format!("--{boundary}\r\n"));
    body.push_str(&format!(
        "Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n"
    ));
    body.push_str(&format!("Content-Type: {mime}\r\n"));
    body.push_str("Content-Transfer-Encoding: binary\r\n\r\n");
    body.push_str(&encoded);
    body.push_str("\r\n");
    body.push_str(&format!("--{boundary}--\r\n\r\n"));

    Bytes::from(body)
}

/// `Content-Type` header value announcing the boundary.
pub fn multipart_content_type(boundary: &str) -> String {
    format!("multipart/form-data;boundary={boundary}")
}
