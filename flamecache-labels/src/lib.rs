mod hash;
mod label;
mod label_set;

pub use hash::LabelHash;
pub use label::Label;
pub use label::LabelValue;
pub use label_set::LabelError;
pub use label_set::LabelSet;
