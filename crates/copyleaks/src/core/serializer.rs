use serde_json::Value;

use crate::data::{Payload, RequestParts, ResponseHead};
use crate::error::{ApiError, TransportError};

/// Response header carrying the service's out-of-band error code.
///
/// Its presence reclassifies the response as a logical failure regardless
/// of HTTP status or transport outcome.
pub const ERROR_CODE_HEADER: &str = "copyleaks-error-code";

/// Turns a finished exchange into a typed result.
///
/// Serializers are pure: they see the request, the response head, the fully
/// buffered body and the terminal transport error, and must not perform I/O.
pub trait ResponseSerializer {
    type Output;

    fn serialize(
        &self,
        request: &RequestParts,
        response: Option<&ResponseHead>,
        data: Option<&[u8]>,
        transport_error: Option<TransportError>,
    ) -> Result<Self::Output, ApiError>;
}

/// The standard JSON serializer used by every service route.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl ResponseSerializer for JsonSerializer {
    type Output = Payload;

    fn serialize(
        &self,
        _request: &RequestParts,
        response: Option<&ResponseHead>,
        data: Option<&[u8]>,
        transport_error: Option<TransportError>,
    ) -> Result<Self::Output, ApiError> {
        serialize_json(response, data, transport_error)
    }
}

/// Decode a terminal `(response, data, transport_error)` triple.
///
/// Check order matters: the service error header wins over everything,
/// because the transport may report success (HTTP 200) while the service
/// signals a logical error out-of-band.
pub fn serialize_json(
    response: Option<&ResponseHead>,
    data: Option<&[u8]>,
    transport_error: Option<TransportError>,
) -> Result<Payload, ApiError> {
    if let Some(code) = response.and_then(|head| head.header(ERROR_CODE_HEADER)) {
        // An unparseable code is reported as 0, the service's catch-all.
        let code = code.trim().parse::<i64>().unwrap_or(0);
        return Err(ApiError::Service {
            code,
            reason: service_reason(data),
        });
    }

    if let Some(error) = transport_error {
        return Err(error.into());
    }

    if response.map(|head| head.status) == Some(204) {
        return Ok(Payload::NoContent);
    }

    let data = match data {
        Some(data) if !data.is_empty() => data,
        _ => return Err(ApiError::Decode("empty body".to_string())),
    };

    serde_json::from_slice::<Value>(data)
        .map(Payload::Json)
        .map_err(|e| ApiError::Decode(e.to_string()))
}

/// Human-readable reason attached to a service error: the body's `Message`
/// field when the body decodes, `"unknown"` otherwise.
fn service_reason(data: Option<&[u8]>) -> String {
    data.and_then(|data| serde_json::from_slice::<Value>(data).ok())
        .as_ref()
        .and_then(|value| value.get("Message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}
