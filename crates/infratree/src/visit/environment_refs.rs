use crate::reference;
use crate::visit;

/// Pins `netenv` references to one environment and region
#[derive(derive_new::new)]
pub(crate) struct EnvironmentRefRewriter<'a> {
    env: &'a str,
    region: &'a str,
}

impl<'a> visit::VisitMut<String> for EnvironmentRefRewriter<'a> {
    #[tracing::instrument(level = "trace", skip_all)]
    fn visit_mut(&mut self, text: &mut String) {
        // neither plain nor template reference
        if !text.starts_with(reference::SENTINEL) && !text.starts_with(reference::SUB_SENTINEL) {
            return;
        }

        let specialized = reference::specialize_environment_refs(text, self.env, self.region);
        if specialized != *text {
            tracing::trace!(from = %text, to = %specialized, "specialized reference");
            *text = specialized;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::visit::{VisitMut, VisitTextMut};
    use crate::value::yaml;
    use pretty_assertions::assert_eq;

    #[test]
    fn rewrites_references_in_place() {
        let mut value = yaml(
            r#"
segment: infra.ref netenv.mynet.network.vpc.segments.public
groups:
  - infra.ref netenv.mynet.network.vpc.security_groups.app.lb
  - infra.ref resource.s3.buckets.logs
plain: text
"#,
        );
        let mut rewriter = EnvironmentRefRewriter::new("prod", "us-west-2");
        value.visit_text_mut(&mut rewriter);
        assert_eq!(
            value,
            yaml(
                r#"
segment: infra.ref netenv.mynet.prod.us-west-2.network.vpc.segments.public
groups:
  - infra.ref netenv.mynet.prod.us-west-2.network.vpc.security_groups.app.lb
  - infra.ref resource.s3.buckets.logs
plain: text
"#
            )
        );

        let mut template = "infra.sub '${infra.ref netenv.mynet.network.vpc.id}'".to_string();
        rewriter.visit_mut(&mut template);
        assert_eq!(
            template,
            "infra.sub '${infra.ref netenv.mynet.prod.us-west-2.network.vpc.id}'"
        );
    }
}
