use super::VisitMut;
use crate::tree::{FieldValue, Node};
use crate::value::Value;

/// Recursively visit all text mutably
pub trait VisitTextMut {
    fn visit_text_mut(&mut self, visitor: &mut dyn VisitMut<String>);
}

impl VisitTextMut for Value {
    fn visit_text_mut(&mut self, visitor: &mut dyn VisitMut<String>) {
        match self {
            Value::String(text) => visitor.visit_mut(text),
            Value::Array(array) => {
                for value in array {
                    value.visit_text_mut(visitor);
                }
            }
            Value::Object(object) => {
                for value in object.values_mut() {
                    value.visit_text_mut(visitor);
                }
            }
            Value::Null | Value::Boolean(_) | Value::Integer(_) | Value::Decimal(_) => {}
        }
    }
}

/// Plain data fields and deferred reference text of one node, owned children are not entered
impl VisitTextMut for Node {
    fn visit_text_mut(&mut self, visitor: &mut dyn VisitMut<String>) {
        for field in self.fields.values_mut() {
            if let FieldValue::Value(value) = field {
                value.visit_text_mut(visitor);
            }
        }

        for raw in self.deferred.values_mut() {
            visitor.visit_mut(raw);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::value::yaml;
    use pretty_assertions::assert_eq;

    #[test]
    fn visits_nested_strings() {
        let mut value = yaml("a: x\nb: [y, 1, {c: z}]\nd: true");
        let mut seen = vec![];
        value.visit_text_mut(&mut |text: &mut String| {
            seen.push(text.clone());
            text.make_ascii_uppercase();
        });
        assert_eq!(seen, vec!["x", "y", "z"]);
        assert_eq!(value, yaml("a: X\nb: [Y, 1, {c: Z}]\nd: true"));
    }
}
