//! Target and limit validation
//!
//! Cheap local checks run before a test is submitted. A target is accepted
//! when it is one of:
//! - an IPv4 literal: "8.8.8.8"
//! - an IPv6 literal: "2001:4860:4860::8888"
//! - a name with a top-level label: "example.com"

use perfops_common::{PerfOpsError, PerfOpsResult, TestParams, TestRequest};
use std::net::IpAddr;

/// The maximum number of nodes allowed for requests without an API key.
pub const FREE_MAX_NODE_CAP: u32 = 20;

/// Whether `target` is an IP literal or looks like a public domain name.
pub fn is_valid_target(target: &str) -> bool {
    if target.is_empty() {
        return false;
    }
    if target.parse::<IpAddr>().is_ok() {
        return true;
    }

    // Assume a domain name; it needs a label after the last dot
    let tld = match target.rfind('.') {
        Some(i) => &target[i + 1..],
        None => return false,
    };
    // TLD may not start with a number
    match tld.chars().next() {
        Some(c) => !c.is_ascii_digit(),
        None => false,
    }
}

/// Unauthenticated callers are capped at [`FREE_MAX_NODE_CAP`] nodes.
#[inline]
pub fn is_valid_limit(has_auth: bool, limit: u32) -> bool {
    has_auth || limit <= FREE_MAX_NODE_CAP
}

/// Check a request before submission, naming the first argument that fails.
pub fn validate_request(request: &TestRequest, has_auth: bool) -> PerfOpsResult<()> {
    if !is_valid_target(&request.target) {
        return Err(PerfOpsError::invalid_argument("target"));
    }
    match &request.params {
        TestParams::DnsPerf { dns_server } => {
            if !dns_server.is_empty() && !is_valid_target(dns_server) {
                return Err(PerfOpsError::invalid_argument("dns server"));
            }
        }
        TestParams::DnsResolve { query_type, dns_server } => {
            if query_type.is_empty() {
                return Err(PerfOpsError::invalid_argument("param"));
            }
            if !is_valid_target(dns_server) {
                return Err(PerfOpsError::invalid_argument("dns server"));
            }
        }
        TestParams::Basic | TestParams::Curl { .. } => {}
    }
    if !is_valid_limit(has_auth, request.limit) {
        return Err(PerfOpsError::invalid_argument("limit"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_valid_targets() {
        for target in ["example.com", "sub.example.co.uk", "8.8.8.8", "::1", "2001:db8::1", "a.b"] {
            assert!(is_valid_target(target), "{}", target);
        }
    }

    #[test]
    fn test_invalid_targets() {
        for target in ["", "localhost", "example.", "example.1com", "256.1.1.1", "10.0.0"] {
            assert!(!is_valid_target(target), "{}", target);
        }
    }

    #[test]
    fn test_limit_cap() {
        assert!(is_valid_limit(false, 1));
        assert!(is_valid_limit(false, FREE_MAX_NODE_CAP));
        assert!(!is_valid_limit(false, FREE_MAX_NODE_CAP + 1));
        assert!(is_valid_limit(true, 500));
    }

    #[test]
    fn test_validate_request_names_argument() {
        let name = |req: TestRequest, auth: bool| {
            validate_request(&req, auth)
                .err()
                .and_then(|e| e.arg_name().map(str::to_string))
        };

        assert_eq!(name(TestRequest::new("nope"), false), Some("target".into()));
        assert_eq!(name(TestRequest::new("example.com").with_limit(21), false), Some("limit".into()));
        assert_eq!(name(TestRequest::new("example.com").with_limit(21), true), None);

        let resolve = |query_type: &str, dns_server: &str| {
            TestRequest::new("example.com").with_params(TestParams::DnsResolve {
                query_type: query_type.into(),
                dns_server: dns_server.into(),
            })
        };
        assert_eq!(name(resolve("", "8.8.8.8"), false), Some("param".into()));
        assert_eq!(name(resolve("A", ""), false), Some("dns server".into()));
        assert_eq!(name(resolve("A", "8.8.8.8"), false), None);

        let perf = |dns_server: &str| {
            TestRequest::new("example.com").with_params(TestParams::DnsPerf {
                dns_server: dns_server.into(),
            })
        };
        assert_eq!(name(perf(""), false), None);
        assert_eq!(name(perf("resolver"), false), Some("dns server".into()));
    }

    proptest! {
        #[test]
        fn prop_limit_rule(has_auth in any::<bool>(), limit in any::<u32>()) {
            prop_assert_eq!(is_valid_limit(has_auth, limit), has_auth || limit <= 20);
        }

        #[test]
        fn prop_ipv4_literals_are_valid(a in any::<u32>()) {
            let ip = Ipv4Addr::from(a).to_string();
            prop_assert!(is_valid_target(&ip));
        }

        #[test]
        fn prop_ipv6_literals_are_valid(a in any::<u128>()) {
            let ip = Ipv6Addr::from(a).to_string();
            prop_assert!(is_valid_target(&ip));
        }

        #[test]
        fn prop_domain_rule(host in "[a-z0-9-]{1,12}", tld in "[a-z0-9]{0,6}") {
            let target = format!("{}.{}", host, tld);
            let expected = tld.chars().next().map(|c| !c.is_ascii_digit()).unwrap_or(false);
            prop_assert_eq!(is_valid_target(&target), expected);
        }
    }
}
