use ring::digest::{Context, SHA256};

use crate::{Label, LabelValue};

/// Identifies a label set inside a cache bucket. Derived from the first 8
/// bytes of a SHA-256 digest over the label content.
pub type LabelHash = u64;

const STRING_VALUE_TAG: u8 = 0;
const NUMBER_VALUE_TAG: u8 = 1;

fn update_with_bytes(context: &mut Context, bytes: &[u8]) {
    context.update(&(bytes.len() as u64).to_le_bytes());
    context.update(bytes);
}

/// Hashes labels in the order they are given. Callers that want
/// order-insensitive identity must sort first.
pub(crate) fn hash_labels<'a>(labels: impl Iterator<Item = &'a Label>) -> LabelHash {
    let mut context = Context::new(&SHA256);

    for label in labels {
        update_with_bytes(&mut context, label.key.as_bytes());
        match &label.value {
            LabelValue::String(value) => {
                context.update(&[STRING_VALUE_TAG]);
                update_with_bytes(&mut context, value.as_bytes());
            }
            LabelValue::Number(value, unit) => {
                context.update(&[NUMBER_VALUE_TAG]);
                context.update(&value.to_le_bytes());
                update_with_bytes(&mut context, unit.as_bytes());
            }
        }
    }

    let digest = context.finish();
    let mut id = [0; 8];
    id.copy_from_slice(&digest.as_ref()[..8]);
    u64::from_le_bytes(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_prefix_separates_fields() {
        let a = Label::from_string_value("a", "bc");
        let b = Label::from_string_value("ab", "c");
        assert_ne!(hash_labels([&a].into_iter()), hash_labels([&b].into_iter()));
    }

    #[test]
    fn test_value_kind_is_part_of_the_hash() {
        let string = Label::from_string_value("port", "");
        let number = Label::from_number_value("port", 0, "");
        assert_ne!(
            hash_labels([&string].into_iter()),
            hash_labels([&number].into_iter())
        );
    }

    #[test]
    fn test_empty_input_is_stable() {
        assert_eq!(
            hash_labels(std::iter::empty()),
            hash_labels(std::iter::empty())
        );
    }
}
