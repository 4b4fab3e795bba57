//! Command results and their rendering.

use std::fmt::Write as _;

use mdreg_common::ManagedDomain;
use mdreg_store::{ErrorKind, StoreError};
use serde::Serialize;

/// Result of one command, as printed with `--json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub status: u8,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub output: Vec<ManagedDomain>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Response {
    pub fn ok(output: Vec<ManagedDomain>) -> Self {
        Self {
            status: 0,
            output,
            description: None,
        }
    }

    pub fn empty() -> Self {
        Self::ok(Vec::new())
    }

    pub fn error(err: &anyhow::Error) -> Self {
        Self {
            status: exit_status(err),
            output: Vec::new(),
            description: Some(format!("{:#}", err)),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human readable rendering, one managed domain per line
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for md in &self.output {
            let _ = writeln!(text, "{}", render_md(md));
        }
        if let Some(ref description) = self.description {
            let _ = writeln!(text, "mdreg: {}", description);
        }
        text
    }
}

fn render_md(md: &ManagedDomain) -> String {
    let domains: Vec<&str> = md.domains.iter().map(|d| d.as_str()).collect();
    let ca = match md.ca.url() {
        Some(url) => format!("{} {}", md.ca.proto(), url),
        None => md.ca.proto().to_string(),
    };
    format!(
        "{} [{}] domains: {} ca: {}",
        md.name,
        md.state.label(),
        domains.join(", "),
        ca
    )
}

/// Process exit status for an error kind
pub fn status_for(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Validation => 2,
        ErrorKind::Conflict => 3,
        ErrorKind::NotFound => 4,
        ErrorKind::LockTimeout => 5,
        ErrorKind::Corruption => 6,
    }
}

/// Exit status for an error, `1` unless a store error is in the chain
pub fn exit_status(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<StoreError>())
        .map_or(1, |e| status_for(e.kind()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use mdreg_common::{names, CaReference, MdState};

    fn md(hosts: &[&str]) -> ManagedDomain {
        let domains = names::validate_list(hosts).unwrap();
        ManagedDomain::new(domains[0].clone(), domains, CaReference::default())
    }

    #[test]
    fn test_ok_json_shape() {
        let response = Response::ok(vec![md(&["a.example", "b.example"])]);
        let value: serde_json::Value =
            serde_json::from_str(&response.to_json().unwrap()).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "status": 0,
                "output": [{
                    "name": "a.example",
                    "domains": ["a.example", "b.example"],
                    "ca": { "proto": "ACME" },
                    "state": 0
                }]
            })
        );
    }

    #[test]
    fn test_empty_output_omitted() {
        let value = serde_json::to_value(Response::empty()).unwrap();
        assert_eq!(value, serde_json::json!({ "status": 0 }));
    }

    #[test]
    fn test_error_response() {
        let err = anyhow::Error::new(StoreError::NotFound("a.example".into()))
            .context("remove failed");
        let response = Response::error(&err);

        assert_eq!(response.status, 4);
        assert!(response.output.is_empty());
        assert_eq!(
            response.description.as_deref(),
            Some("remove failed: managed domain 'a.example' not found")
        );
    }

    #[test]
    fn test_exit_status_mapping() {
        let conflict = anyhow::Error::new(StoreError::Conflict {
            domain: "b.example".into(),
            owner: "a.example".into(),
        });
        assert_eq!(exit_status(&conflict), 3);

        let validation = anyhow::Error::new(StoreError::from(
            mdreg_common::ValidationError::EmptyDomainList,
        ));
        assert_eq!(exit_status(&validation), 2);

        let wiring: anyhow::Result<()> =
            Err(std::io::Error::other("boom")).context("reading config");
        assert_eq!(exit_status(&wiring.unwrap_err()), 1);
    }

    #[test]
    fn test_text_rendering() {
        let mut pending = md(&["a.example", "www.a.example"]);
        pending.state = MdState::Pending;
        pending.ca = CaReference::parse(Some("https://acme.example/dir"), None).unwrap();

        let text = Response::ok(vec![pending]).to_text();
        let expected = concat!(
            "a.example [incomplete] domains: a.example, www.a.example ",
            "ca: ACME https://acme.example/dir\n"
        );
        assert_eq!(text, expected);
    }
}
