//! field validators and type invariants of the built-in catalogue
use crate::error::ValidationError;
use crate::reference::REGIONS;
use crate::tree::{NodeId, Tree};
use crate::value::Value;
use regex::Regex;
use std::sync::LazyLock;

type Outcome = Result<(), ValidationError>;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"));

static CIDR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})/(\d{1,2})$").expect("valid regex")
});

pub const LOG_RETENTION_DAYS: &[i64] = &[
    1, 3, 5, 7, 14, 30, 60, 90, 120, 150, 180, 365, 400, 545, 731, 1827, 3653,
];

pub const ASG_METRICS: &[&str] = &[
    "GroupMinSize",
    "GroupMaxSize",
    "GroupDesiredCapacity",
    "GroupInServiceInstances",
    "GroupPendingInstances",
    "GroupStandbyInstances",
    "GroupTerminatingInstances",
    "GroupTotalInstances",
];

fn text(value: &Value) -> &str {
    value.as_str().unwrap_or_default()
}

fn one_of(value: &Value, allowed: &[&str], what: &str) -> Outcome {
    if allowed.contains(&text(value)) {
        Ok(())
    } else {
        Err(ValidationError::new(format!(
            "'{value}' is not a valid {what}, expected one of: {}",
            allowed.join(", ")
        )))
    }
}

pub fn region(value: &Value) -> Outcome {
    one_of(value, REGIONS, "region")
}

pub fn regions(value: &Value) -> Outcome {
    value
        .as_array()
        .into_iter()
        .flatten()
        .try_for_each(region)
}

pub fn email(value: &Value) -> Outcome {
    if EMAIL.is_match(text(value)) {
        Ok(())
    } else {
        Err(ValidationError::new(format!("'{value}' is not a valid email address")))
    }
}

pub fn digits(value: &Value) -> Outcome {
    let text = text(value);
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new(format!("'{value}' must only contain digits")))
    }
}

pub fn cidr(value: &Value) -> Outcome {
    let invalid = || ValidationError::new(format!("'{value}' is not a valid IPv4 CIDR block"));
    let captures = CIDR.captures(text(value)).ok_or_else(invalid)?;

    let octets_ok = (1..=4).all(|i| captures[i].parse::<u8>().is_ok());
    let prefix_ok = captures[5].parse::<u8>().is_ok_and(|prefix| prefix <= 32);
    if octets_ok && prefix_ok {
        Ok(())
    } else {
        Err(invalid())
    }
}

pub fn cidr_or_blank(value: &Value) -> Outcome {
    if text(value).is_empty() {
        return Ok(());
    }
    cidr(value)
}

pub fn alarm_severity(value: &Value) -> Outcome {
    one_of(value, &["low", "critical"], "alarm severity")
}

pub fn alarm_classification(value: &Value) -> Outcome {
    one_of(value, &["health", "performance", "security"], "alarm classification")
}

pub fn comparison_operator(value: &Value) -> Outcome {
    one_of(
        value,
        &[
            "GreaterThanThreshold",
            "GreaterThanOrEqualToThreshold",
            "LessThanThreshold",
            "LessThanOrEqualToThreshold",
            "LessThanLowerOrGreaterThanUpperThreshold",
            "LessThanLowerThreshold",
            "GreaterThanUpperThreshold",
        ],
        "comparison operator",
    )
}

/// 10, 30 or any multiple of 60 seconds
pub fn alarm_period(value: &Value) -> Outcome {
    match value.as_i64() {
        Some(10 | 30) => Ok(()),
        Some(period) if period > 0 && period % 60 == 0 => Ok(()),
        _ => Err(ValidationError::new(format!(
            "alarm period '{value}' must be 10, 30 or a multiple of 60"
        ))),
    }
}

pub fn health_check_type(value: &Value) -> Outcome {
    one_of(value, &["EC2", "ELB"], "health check type")
}

pub fn log_retention(value: &Value) -> Outcome {
    let text = text(value);
    if text.is_empty() || text.parse::<i64>().is_ok_and(|days| LOG_RETENTION_DAYS.contains(&days)) {
        Ok(())
    } else {
        Err(ValidationError::new(format!(
            "'{value}' is not a valid log retention period in days"
        )))
    }
}

pub fn agent_timezone(value: &Value) -> Outcome {
    one_of(value, &["Local", "UTC"], "CloudWatch agent time zone")
}

pub fn asg_metrics(value: &Value) -> Outcome {
    value
        .as_array()
        .into_iter()
        .flatten()
        .try_for_each(|metric| one_of(metric, ASG_METRICS, "ASG metric"))
}

pub fn subscription_protocol(value: &Value) -> Outcome {
    one_of(
        value,
        &["http", "https", "email", "email-json", "sms", "sqs", "application", "lambda"],
        "SNS subscription protocol",
    )
}

pub fn codecommit_permission(value: &Value) -> Outcome {
    one_of(value, &["ReadWrite", "ReadOnly"], "CodeCommit permission")
}

/// `port` excludes `from_port`/`to_port`, which must be set together
pub fn security_group_ports(tree: &Tree, id: NodeId) -> Outcome {
    let node = tree.node(id);
    let port = |name: &str| node.value(name).and_then(Value::as_i64).unwrap_or(-1);
    let (single, from, to) = (port("port"), port("from_port"), port("to_port"));

    if single != -1 && (from != -1 || to != -1) {
        Err(ValidationError::new(
            "Both 'port' and 'to_port/from_port' must not have values.",
        ))
    } else if to == -1 && from != -1 {
        Err(ValidationError::new(
            "The 'to_port' field must not be blank when 'from_port' has a value.",
        ))
    } else if from == -1 && to != -1 {
        Err(ValidationError::new(
            "The 'from_port' field must not be blank when 'to_port' has a value.",
        ))
    } else {
        Ok(())
    }
}

pub const MAX_INLINE_CODE: usize = 4096;

/// Inline code or an S3 location, never both
pub fn lambda_code_source(tree: &Tree, id: NodeId) -> Outcome {
    let node = tree.node(id);
    let set = |name: &str| {
        node.str_value(name).is_some_and(|text| !text.is_empty()) || node.deferred.contains_key(name)
    };

    if !set("zipfile") && !(set("s3_bucket") && set("s3_key")) {
        return Err(ValidationError::new(
            "Either zipfile or s3_bucket and s3_key must be set. Or zipfile file is an empty file.",
        ));
    }
    if set("zipfile") && set("s3_bucket") {
        return Err(ValidationError::new("Can not set both zipfile and s3_bucket"));
    }
    if let Some(code) = node.str_value("zipfile") {
        let len = code.chars().count();
        if len > MAX_INLINE_CODE {
            return Err(ValidationError::new(format!(
                "Limit of inline code of {MAX_INLINE_CODE} characters exceeded. File is {len} chars long."
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tree::{FieldValue, Slot};
    use pretty_assertions::assert_eq;

    #[test]
    fn cidrs() {
        assert!(cidr(&"10.0.0.0/16".into()).is_ok());
        assert!(cidr(&"10.0.0.0/33".into()).is_err());
        assert!(cidr(&"300.0.0.0/8".into()).is_err());
        assert!(cidr(&"".into()).is_err());
        assert!(cidr_or_blank(&"".into()).is_ok());
    }

    #[test]
    fn scalars() {
        assert!(digits(&"123456789012".into()).is_ok());
        assert!(digits(&"12a".into()).is_err());
        assert!(email(&"ops@example.com".into()).is_ok());
        assert!(email(&"ops".into()).is_err());
        assert!(region(&"eu-west-1".into()).is_ok());
        assert!(region(&"mars-1".into()).is_err());
        assert!(alarm_period(&Value::Integer(300)).is_ok());
        assert!(alarm_period(&Value::Integer(45)).is_err());
        assert!(log_retention(&"30".into()).is_ok());
        assert!(log_retention(&"31".into()).is_err());
        assert!(asg_metrics(&vec!["GroupMinSize"].into()).is_ok());
        assert!(asg_metrics(&vec!["CpuUsage"].into()).is_err());
    }

    fn rule(ports: &[(&str, i64)]) -> (Tree, NodeId) {
        let mut tree = Tree::new("Project", "test");
        let root = tree.root();
        let id = tree.add_node(root, Slot::Child, "IngressRule", "rule", false);
        for (name, port) in ports {
            tree.node_mut(id)
                .fields
                .insert(name.to_string(), FieldValue::Value(Value::Integer(*port)));
        }
        (tree, id)
    }

    #[test]
    fn port_and_range_conflict() {
        let (tree, id) = rule(&[("port", 80), ("from_port", 80), ("to_port", 81)]);
        assert_eq!(
            security_group_ports(&tree, id),
            Err(ValidationError::new(
                "Both 'port' and 'to_port/from_port' must not have values."
            ))
        );
    }

    #[test]
    fn port_ranges_need_both_ends() {
        let (tree, id) = rule(&[("from_port", 80)]);
        assert!(security_group_ports(&tree, id).is_err());

        let (tree, id) = rule(&[("from_port", 80), ("to_port", 90)]);
        assert!(security_group_ports(&tree, id).is_ok());

        let (tree, id) = rule(&[("port", 443), ("from_port", -1), ("to_port", -1)]);
        assert!(security_group_ports(&tree, id).is_ok());
    }
}
