//! The cross-domain policy XML served to every matching client.

use std::fmt;

const ENVELOPE_HEAD: &str = concat!(
    "<?xml version=\"1.0\"?>\n",
    "<!DOCTYPE cross-domain-policy SYSTEM \"/xml/dtds/cross-domain-policy.dtd\">\n",
    "<cross-domain-policy>\n",
    "<site-control permitted-cross-domain-policies=\"master-only\"/>\n",
);

const ENVELOPE_TAIL: &str = "\n</cross-domain-policy>\n";

/// Rendered policy document.
///
/// Built once at startup and shared read-only by every worker; the XML is
/// derived from `allowed_domains` and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDocument {
    allowed_domains: Vec<String>,
    rendered_xml: String,
}

impl PolicyDocument {
    /// Render the document with domains used verbatim.
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_escaping(domains, false)
    }

    /// Render the document, optionally XML-escaping each domain.
    pub fn with_escaping<I, S>(domains: I, escape: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed_domains: Vec<String> = domains.into_iter().map(Into::into).collect();
        let rendered_xml = if escape {
            let escaped: Vec<String> = allowed_domains.iter().map(|d| escape_attribute(d)).collect();
            build(&escaped)
        } else {
            build(&allowed_domains)
        };

        Self {
            allowed_domains,
            rendered_xml,
        }
    }

    pub fn allowed_domains(&self) -> &[String] {
        &self.allowed_domains
    }

    pub fn as_str(&self) -> &str {
        &self.rendered_xml
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.rendered_xml.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.rendered_xml.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rendered_xml.is_empty()
    }
}

impl fmt::Display for PolicyDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered_xml)
    }
}

/// Render the policy envelope with one `allow-access-from` element per
/// domain, in input order. Domain strings are inserted as given.
pub fn build<S: AsRef<str>>(domains: &[S]) -> String {
    let mut xml = String::with_capacity(ENVELOPE_HEAD.len() + ENVELOPE_TAIL.len() + domains.len() * 56);
    xml.push_str(ENVELOPE_HEAD);
    for domain in domains {
        xml.push_str("<allow-access-from domain=\"");
        xml.push_str(domain.as_ref());
        xml.push_str("\" to-ports=\"*\" />");
    }
    xml.push_str(ENVELOPE_TAIL);
    xml
}

/// Escape the characters that are not allowed inside a double-quoted XML
/// attribute value.
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_policy_layout() {
        let doc = PolicyDocument::new(["example.com", "*.example.org"]);
        let expected = concat!(
            "<?xml version=\"1.0\"?>\n",
            "<!DOCTYPE cross-domain-policy SYSTEM \"/xml/dtds/cross-domain-policy.dtd\">\n",
            "<cross-domain-policy>\n",
            "<site-control permitted-cross-domain-policies=\"master-only\"/>\n",
            "<allow-access-from domain=\"example.com\" to-ports=\"*\" />",
            "<allow-access-from domain=\"*.example.org\" to-ports=\"*\" />\n",
            "</cross-domain-policy>\n",
        );
        assert_eq!(doc.as_str(), expected);
    }

    #[test]
    fn empty_domain_list_keeps_envelope() {
        let doc = PolicyDocument::new(Vec::<String>::new());
        assert!(doc.as_str().contains("<site-control"));
        assert!(!doc.as_str().contains("allow-access-from"));
        assert!(doc.as_str().ends_with("</cross-domain-policy>\n"));
    }

    #[test]
    fn duplicates_are_kept() {
        let doc = PolicyDocument::new(["*", "*"]);
        assert_eq!(doc.as_str().matches("domain=\"*\"").count(), 2);
        assert_eq!(doc.allowed_domains().len(), 2);
    }

    #[test]
    fn verbatim_unless_escaping_requested() {
        let raw = PolicyDocument::new(["a\"b&c"]);
        assert!(raw.as_str().contains("domain=\"a\"b&c\""));

        let escaped = PolicyDocument::with_escaping(["a\"b&c"], true);
        assert!(escaped.as_str().contains("domain=\"a&quot;b&amp;c\""));
        assert_eq!(escaped.allowed_domains(), &["a\"b&c".to_string()]);
    }

    #[test]
    fn escape_attribute_handles_all_specials() {
        assert_eq!(escape_attribute("<'&'>"), "&lt;&apos;&amp;&apos;&gt;");
        assert_eq!(escape_attribute("plain.example.com"), "plain.example.com");
    }
}
