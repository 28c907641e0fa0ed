//! HTTP-safety policy.

use crate::{EndpointFlow, FlowError, FlowResult};
use keel_ast::EndpointDef;

/// Endpoints on GET, HEAD or OPTIONS must not write. Duplex endpoints have
/// no verb and are not checked.
pub fn check_http_safety(endpoint: &EndpointDef, flow: &EndpointFlow) -> FlowResult<()> {
    let Some(method) = flow.method else {
        return Ok(());
    };
    if method.is_safe() && !flow.write_targets.is_empty() {
        return Err(FlowError::unsafe_write(
            &flow.endpoint,
            method.as_str(),
            flow.write_targets.clone(),
            endpoint.span,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlowKind;
    use keel_ast::{HttpMethod, ModelBuilder, Schema};

    fn flow(method: Option<HttpMethod>, writes: &[&str]) -> EndpointFlow {
        EndpointFlow {
            endpoint: "e".into(),
            kind: if writes.is_empty() {
                FlowKind::Read
            } else {
                FlowKind::ReadWrite
            },
            read_sources: vec!["r".into()],
            write_targets: writes.iter().map(|s| s.to_string()).collect(),
            computed_entities: vec![],
            terminal: None,
            method,
        }
    }

    fn endpoint() -> EndpointDef {
        let mut builder = ModelBuilder::new();
        builder.entity("X").done();
        builder
            .endpoint("e", HttpMethod::Get, "/e")
            .response(200, Schema::entity("X"))
            .done();
        builder.build().endpoints.remove(0)
    }

    #[test]
    fn test_safe_verbs_reject_writes() {
        for method in [HttpMethod::Get, HttpMethod::Head, HttpMethod::Options] {
            let result = check_http_safety(&endpoint(), &flow(Some(method), &["save"]));

            assert!(
                matches!(result, Err(FlowError::UnsafeWrite { ref sources, .. }) if sources == &vec!["save".to_string()]),
                "{} accepted a write",
                method
            );
        }
    }

    #[test]
    fn test_unsafe_verbs_and_duplex_pass() {
        assert!(check_http_safety(&endpoint(), &flow(Some(HttpMethod::Post), &["save"])).is_ok());
        assert!(check_http_safety(&endpoint(), &flow(None, &["publish"])).is_ok());
        assert!(check_http_safety(&endpoint(), &flow(Some(HttpMethod::Get), &[])).is_ok());
    }
}
