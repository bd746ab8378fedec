//! Property-based tests for policy document rendering.

use proptest::prelude::*;
use flashpolicyd::policy::document::build;
use flashpolicyd::PolicyDocument;

fn arb_domain() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("*".to_string()),
        "[a-z0-9-]{1,20}(\\.[a-z]{2,6}){1,2}",
        "\\*\\.[a-z0-9-]{1,20}\\.[a-z]{2,6}",
    ]
}

proptest! {
    #[test]
    fn one_element_per_domain_in_order(domains in prop::collection::vec(arb_domain(), 0..20)) {
        let xml = build(&domains);

        prop_assert_eq!(xml.matches("<allow-access-from ").count(), domains.len());
        prop_assert_eq!(xml.matches("to-ports=\"*\"").count(), domains.len());

        let mut cursor = 0;
        for domain in &domains {
            let element = format!("<allow-access-from domain=\"{}\" to-ports=\"*\" />", domain);
            let found = xml[cursor..].find(&element);
            prop_assert!(found.is_some(), "missing or out of order: {}", domain);
            cursor += found.unwrap() + element.len();
        }
    }

    #[test]
    fn envelope_is_fixed(domains in prop::collection::vec(arb_domain(), 0..10)) {
        let xml = build(&domains);
        let starts_with_decl = xml.starts_with("<?xml version=\"1.0\"?>\n");
        prop_assert!(starts_with_decl);
        prop_assert!(xml.contains("<!DOCTYPE cross-domain-policy SYSTEM \"/xml/dtds/cross-domain-policy.dtd\">"));
        prop_assert!(xml.contains("<site-control permitted-cross-domain-policies=\"master-only\"/>"));
        prop_assert!(xml.ends_with("</cross-domain-policy>\n"));
        prop_assert_eq!(xml.matches("<cross-domain-policy>").count(), 1);
    }

    #[test]
    fn document_is_deterministic(domains in prop::collection::vec(arb_domain(), 0..10)) {
        let a = PolicyDocument::new(domains.clone());
        let b = PolicyDocument::new(domains.clone());
        prop_assert_eq!(a.as_str(), b.as_str());
        prop_assert_eq!(a.allowed_domains(), domains.as_slice());
    }
}
