//! Spring `HttpStatus` names used in envelope and error DTO bodies.

use http::StatusCode;

const SPRING_STATUSES: &[(u16, &str)] = &[
    (100, "CONTINUE"),
    (101, "SWITCHING_PROTOCOLS"),
    (102, "PROCESSING"),
    (103, "CHECKPOINT"),
    (200, "OK"),
    (201, "CREATED"),
    (202, "ACCEPTED"),
    (203, "NON_AUTHORITATIVE_INFORMATION"),
    (204, "NO_CONTENT"),
    (205, "RESET_CONTENT"),
    (206, "PARTIAL_CONTENT"),
    (207, "MULTI_STATUS"),
    (208, "ALREADY_REPORTED"),
    (226, "IM_USED"),
    (300, "MULTIPLE_CHOICES"),
    (301, "MOVED_PERMANENTLY"),
    (302, "FOUND"),
    (303, "SEE_OTHER"),
    (304, "NOT_MODIFIED"),
    (305, "USE_PROXY"),
    (307, "TEMPORARY_REDIRECT"),
    (308, "PERMANENT_REDIRECT"),
    (400, "BAD_REQUEST"),
    (401, "UNAUTHORIZED"),
    (402, "PAYMENT_REQUIRED"),
    (403, "FORBIDDEN"),
    (404, "NOT_FOUND"),
    (405, "METHOD_NOT_ALLOWED"),
    (406, "NOT_ACCEPTABLE"),
    (407, "PROXY_AUTHENTICATION_REQUIRED"),
    (408, "REQUEST_TIMEOUT"),
    (409, "CONFLICT"),
    (410, "GONE"),
    (411, "LENGTH_REQUIRED"),
    (412, "PRECONDITION_FAILED"),
    (413, "PAYLOAD_TOO_LARGE"),
    (414, "URI_TOO_LONG"),
    (415, "UNSUPPORTED_MEDIA_TYPE"),
    (416, "REQUESTED_RANGE_NOT_SATISFIABLE"),
    (417, "EXPECTATION_FAILED"),
    (418, "I_AM_A_TEAPOT"),
    (422, "UNPROCESSABLE_ENTITY"),
    (423, "LOCKED"),
    (424, "FAILED_DEPENDENCY"),
    (426, "UPGRADE_REQUIRED"),
    (428, "PRECONDITION_REQUIRED"),
    (429, "TOO_MANY_REQUESTS"),
    (431, "REQUEST_HEADER_FIELDS_TOO_LARGE"),
    (451, "UNAVAILABLE_FOR_LEGAL_REASONS"),
    (500, "INTERNAL_SERVER_ERROR"),
    (501, "NOT_IMPLEMENTED"),
    (502, "BAD_GATEWAY"),
    (503, "SERVICE_UNAVAILABLE"),
    (504, "GATEWAY_TIMEOUT"),
    (505, "HTTP_VERSION_NOT_SUPPORTED"),
    (506, "VARIANT_ALSO_NEGOTIATES"),
    (507, "INSUFFICIENT_STORAGE"),
    (508, "LOOP_DETECTED"),
    (509, "BANDWIDTH_LIMIT_EXCEEDED"),
    (510, "NOT_EXTENDED"),
    (511, "NETWORK_AUTHENTICATION_REQUIRED"),
];

/// Returns the Spring name for `code`, or `""` when it has none.
#[must_use]
pub fn spring_status_name(code: StatusCode) -> &'static str {
    let code = code.as_u16();
    SPRING_STATUSES
        .iter()
        .find(|(candidate, _)| *candidate == code)
        .map_or("", |(_, name)| name)
}

/// Returns the status code for a Spring name.
#[must_use]
pub fn spring_status_code(name: &str) -> Option<StatusCode> {
    SPRING_STATUSES
        .iter()
        .find(|(_, candidate)| *candidate == name)
        .and_then(|(code, _)| StatusCode::from_u16(*code).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_for_codes() {
        assert_eq!(spring_status_name(StatusCode::OK), "OK");
        assert_eq!(spring_status_name(StatusCode::NOT_FOUND), "NOT_FOUND");
        assert_eq!(spring_status_name(StatusCode::IM_A_TEAPOT), "I_AM_A_TEAPOT");
        assert_eq!(
            spring_status_name(StatusCode::from_u16(103).unwrap()),
            "CHECKPOINT"
        );
        assert_eq!(
            spring_status_name(StatusCode::from_u16(509).unwrap()),
            "BANDWIDTH_LIMIT_EXCEEDED"
        );
        assert_eq!(spring_status_name(StatusCode::from_u16(599).unwrap()), "");
    }

    #[test]
    fn test_codes_for_names() {
        assert_eq!(spring_status_code("CONFLICT"), Some(StatusCode::CONFLICT));
        assert_eq!(
            spring_status_code("PAYLOAD_TOO_LARGE"),
            Some(StatusCode::PAYLOAD_TOO_LARGE)
        );
        assert_eq!(spring_status_code("SOMETHING_ELSE"), None);
    }

    #[test]
    fn test_table_round_trips() {
        for (code, name) in SPRING_STATUSES {
            let status = StatusCode::from_u16(*code).unwrap();
            assert_eq!(spring_status_name(status), *name);
            assert_eq!(spring_status_code(name), Some(status));
        }
    }
}
