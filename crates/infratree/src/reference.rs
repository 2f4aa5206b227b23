//! cross-reference grammar
//!
//! A reference is text of the form `infra.ref <namespace>.<part>.<part>...`. Template strings (`infra.sub '...'`) may
//! embed references inside `${...}` spans.
//!
//! Parsing never fails: malformed text still yields a [Reference] (and a warning), [Reference::check] tells callers
//! whether it is usable.
use crate::error::{Error, Result};
use crate::resolve::Resolved;
use regex::Regex;
use std::sync::LazyLock;

/// Marker that starts every reference
pub const SENTINEL: &str = "infra.ref";

/// Marker that starts a template string
pub const SUB_SENTINEL: &str = "infra.sub";

/// Regions a `netenv` reference may name in its region slot
pub const REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "ca-central-1",
    "eu-central-1",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-north-1",
    "ap-east-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-south-1",
    "me-south-1",
    "sa-east-1",
];

/// Index of the region slot in the parts of a `netenv` reference
const REGION_INDEX: usize = 3;

static PART: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\w-]+$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Namespace {
    Resource,
    Netenv,
    Accounts,
    Function,
    Service,
    /// anything else, only produced by malformed text
    Other(String),
}

impl Namespace {
    pub fn parse(text: &str) -> Self {
        match text {
            "resource" => Namespace::Resource,
            "netenv" => Namespace::Netenv,
            "accounts" => Namespace::Accounts,
            "function" => Namespace::Function,
            "service" => Namespace::Service,
            other => Namespace::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Namespace::Resource => "resource",
            Namespace::Netenv => "netenv",
            Namespace::Accounts => "accounts",
            Namespace::Function => "function",
            Namespace::Service => "service",
            Namespace::Other(other) => other,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Namespace::Other(_))
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `true` iff `text` is the sentinel followed by a known namespace and a `.`
pub fn is_reference(text: &str) -> bool {
    let Some(body) = text
        .strip_prefix(SENTINEL)
        .and_then(|rest| rest.strip_prefix(' '))
    else {
        return false;
    };

    body.split_once('.')
        .is_some_and(|(namespace, _)| Namespace::parse(namespace).is_known())
}

/// `true` if `text` starts with the sentinel, regardless of what follows
pub fn looks_like_reference(text: &str) -> bool {
    text.starts_with(SENTINEL)
}

/// Parsed cross-reference
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    /// text as written, sentinel included
    pub raw: String,
    /// text after the sentinel
    pub body: String,
    pub namespace: Namespace,
    /// every `.` separated segment of [Reference::body], the namespace included
    pub parts: Vec<String>,
    /// region slot of a `netenv` reference
    pub region: Option<String>,
    /// parts left over once a target node was found
    pub tail: Vec<String>,
    pub target: Option<Resolved>,
}

impl Reference {
    pub fn parse(text: &str) -> Self {
        let body = text
            .strip_prefix(SENTINEL)
            .unwrap_or(text)
            .trim()
            .to_string();
        let parts: Vec<String> = body.split('.').map(str::to_string).collect();
        let namespace = Namespace::parse(parts.first().map(String::as_str).unwrap_or_default());

        let region = match namespace {
            Namespace::Netenv => parts
                .get(REGION_INDEX)
                .filter(|part| REGIONS.contains(&part.as_str()))
                .cloned(),
            _ => None,
        };

        let reference = Reference {
            raw: text.to_string(),
            body,
            namespace,
            parts,
            region,
            tail: vec![],
            target: None,
        };

        if let Some(problem) = reference.problem() {
            tracing::warn!(reference = %reference.raw, problem, "malformed reference");
        }

        reference
    }

    fn problem(&self) -> Option<String> {
        if !looks_like_reference(&self.raw) {
            return Some(format!("does not start with '{SENTINEL}'"));
        }
        if !self.namespace.is_known() {
            return Some(format!("unknown namespace '{}'", self.namespace));
        }
        if self.parts.len() < 2 {
            return Some("needs at least one part after the namespace".to_string());
        }
        if let Some(part) = self.parts.iter().find(|part| !PART.is_match(part)) {
            return Some(format!("invalid part '{part}'"));
        }
        None
    }

    /// Reports malformed text as [Error::InvalidReference]
    pub fn check(&self) -> Result<()> {
        match self.problem() {
            None => Ok(()),
            Some(message) => Err(Error::invalid_reference(&self.raw, message)),
        }
    }

    pub fn part(&self, index: usize) -> Option<&str> {
        self.parts.get(index).map(String::as_str)
    }

    /// Tail joined back with `.`
    pub fn tail_text(&self) -> String {
        self.tail.join(".")
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Insert environment and region after the network environment name of a `netenv` reference
///
/// Left unchanged: anything that is not a `netenv` reference, references already carrying a region slot, and
/// references that already name `env` and `region` in those positions.
pub fn specialize_netenv_reference(text: &str, env: &str, region: &str) -> String {
    if !is_reference(text) {
        return text.to_string();
    }

    let reference = Reference::parse(text);
    if reference.namespace != Namespace::Netenv || reference.region.is_some() {
        return text.to_string();
    }
    if reference.part(2) == Some(env) && reference.part(3) == Some(region) {
        return text.to_string();
    }

    let mut parts = reference.parts;
    let at = parts.len().min(2);
    parts.insert(at, region.to_string());
    parts.insert(at, env.to_string());
    format!("{SENTINEL} {}", parts.join("."))
}

/// Specialize every `netenv` reference inside the `${...}` spans of a template string
pub fn substitute_template_slots(text: &str, env: &str, region: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let end = start + len;

        let span = &rest[start + 2..end];
        result.push_str(&rest[..start + 2]);
        if span.trim_start().starts_with(&format!("{SENTINEL} netenv.")) {
            result.push_str(&specialize_netenv_reference(span.trim(), env, region));
        } else {
            result.push_str(span);
        }
        result.push('}');

        rest = &rest[end + 1..];
    }

    result.push_str(rest);
    result
}

/// Specialize a field value: template strings span by span, plain references as a whole
pub fn specialize_environment_refs(text: &str, env: &str, region: &str) -> String {
    if text.starts_with(SUB_SENTINEL) {
        substitute_template_slots(text, env, region)
    } else {
        specialize_netenv_reference(text, env, region)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_resource_reference() {
        let reference = Reference::parse("infra.ref resource.s3.buckets.logs.name");
        assert_eq!(reference.namespace, Namespace::Resource);
        assert_eq!(
            reference.parts,
            vec!["resource", "s3", "buckets", "logs", "name"]
        );
        assert_eq!(reference.body, "resource.s3.buckets.logs.name");
        assert_eq!(reference.parts.join("."), reference.body);
        assert!(reference.check().is_ok());
        assert!(is_reference(&reference.raw));
    }

    #[test]
    fn detection() {
        assert!(is_reference("infra.ref netenv.mynet.network"));
        assert!(is_reference("infra.ref function.aws.ec2.ami.latest"));
        assert!(!is_reference("infra.ref bogus.thing"));
        assert!(!is_reference("infra.ref netenv"));
        assert!(!is_reference("infra.refnetenv.mynet"));
        assert!(!is_reference("just text"));
        assert!(looks_like_reference("infra.ref bogus.thing"));
    }

    #[test]
    fn malformed_text_still_parses() {
        let reference = Reference::parse("infra.ref bogus.a.b");
        assert_eq!(reference.namespace, Namespace::Other("bogus".into()));
        assert!(matches!(
            reference.check(),
            Err(Error::InvalidReference { .. })
        ));

        let reference = Reference::parse("infra.ref netenv.a b.c");
        assert!(reference.check().is_err());
    }

    #[test]
    fn region_slot() {
        let reference = Reference::parse("infra.ref netenv.mynet.prod.us-west-2.network");
        assert_eq!(reference.region.as_deref(), Some("us-west-2"));

        let reference = Reference::parse("infra.ref netenv.mynet.network.vpc");
        assert_eq!(reference.region, None);
    }

    #[test]
    fn specialize_inserts_env_and_region() {
        assert_eq!(
            specialize_netenv_reference("infra.ref netenv.mynet.network.vpc", "prod", "us-west-2"),
            "infra.ref netenv.mynet.prod.us-west-2.network.vpc"
        );
    }

    #[test]
    fn specialize_leaves_specific_references_alone() {
        let specific = "infra.ref netenv.mynet.prod.us-west-2.network.vpc";
        assert_eq!(
            specialize_netenv_reference(specific, "dev", "us-west-2"),
            specific
        );
        assert_eq!(
            specialize_netenv_reference("infra.ref resource.s3.buckets.logs", "prod", "us-west-2"),
            "infra.ref resource.s3.buckets.logs"
        );
        assert_eq!(
            specialize_netenv_reference("plain text", "prod", "us-west-2"),
            "plain text"
        );
    }

    #[test]
    fn template_spans() {
        let template = "infra.sub 'arn:${infra.ref netenv.mynet.network.vpc.id}/${other}/x'";
        assert_eq!(
            specialize_environment_refs(template, "prod", "eu-west-1"),
            "infra.sub 'arn:${infra.ref netenv.mynet.prod.eu-west-1.network.vpc.id}/${other}/x'"
        );
    }

    #[test]
    fn unterminated_span_is_kept() {
        let template = "infra.sub 'a ${infra.ref netenv.mynet.x'";
        assert_eq!(substitute_template_slots(template, "prod", "eu-west-1"), template);
    }
}
