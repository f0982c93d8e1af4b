use std::fmt;

use flamecache_labels::LabelSet;

use crate::cache::SampleType;

/// One observation handed over by a decoder.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Sample {
    pub sample_type: SampleType,
    pub labels: LabelSet,
    /// Frame names from the outermost caller to the innermost one.
    pub stack: Vec<Vec<u8>>,
    pub weight: u64,
}

impl Sample {
    pub fn new<I, F>(sample_type: SampleType, labels: LabelSet, stack: I, weight: u64) -> Self
    where
        I: IntoIterator<Item = F>,
        F: AsRef<[u8]>,
    {
        Sample {
            sample_type,
            labels,
            stack: stack
                .into_iter()
                .map(|frame| frame.as_ref().to_vec())
                .collect(),
            weight,
        }
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let format_stack = |stack: &Vec<Vec<u8>>| -> String {
            let mut res = Vec::new();
            for (i, frame) in stack.iter().enumerate() {
                res.push(format!("{i:3}: {}", String::from_utf8_lossy(frame)));
            }
            format!("[{}]", res.join(","))
        };

        fmt.debug_struct("Sample")
            .field("sample_type", &self.sample_type)
            .field("labels", &format!("{}", self.labels))
            .field("stack", &format_stack(&self.stack))
            .field("weight", &self.weight)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use flamecache_labels::Label;

    #[test]
    fn test_display() {
        let labels = LabelSet::from(vec![Label::from_string_value("service", "kafka")]);
        let sample = Sample::new(1, labels, ["main", "poll"], 10);

        insta::assert_snapshot!(sample.to_string(), @r#"Sample { sample_type: 1, labels: "{service=\"kafka\"}", stack: "[  0: main,  1: poll]", weight: 10 }"#);
    }

    #[test]
    fn test_new_copies_frames() {
        let frames = vec![b"main".to_vec(), b"poll".to_vec()];
        let sample = Sample::new(2, LabelSet::new(), &frames, 3);
        assert_eq!(sample.stack, frames);
    }
}
