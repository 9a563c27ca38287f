//! Request identifiers as [ulid]s.

use http::Request;
use tower_http::request_id::{MakeRequestId, RequestId};
use ulid::Ulid;

/// Make a [Ulid] request id.
#[derive(Clone, Copy, Debug, Default)]
pub struct MakeRequestUlid;

impl MakeRequestId for MakeRequestUlid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let req_id = Ulid::new().to_string().parse().ok()?;
        Some(RequestId::new(req_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_ulids() {
        let request = Request::new(());
        let id = MakeRequestUlid.make_request_id(&request).unwrap();
        let id = id.header_value().to_str().unwrap();

        assert!(Ulid::from_string(id).is_ok());
    }
}
