//! Pure transformations: response decoding and body encoding.
//!
//! Nothing in this module performs I/O or touches shared state.

mod multipart;
mod serializer;

pub use multipart::{
    BOUNDARY_PREFIX, encode_file_part, generate_boundary, mime_for_extension, mime_for_file_name,
    multipart_content_type,
};
pub use serializer::{ERROR_CODE_HEADER, JsonSerializer, ResponseSerializer, serialize_json};
