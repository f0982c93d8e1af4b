use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
pub(crate) enum FoldedError {
    #[error("missing weight")]
    MissingWeight,
    #[error("invalid weight `{0}'")]
    InvalidWeight(String),
}

/// Splits a collapsed stack line such as `main;parse;read 5` into its frames,
/// outermost first, and its weight. A line holding only a weight is a stack
/// with no frames.
pub(crate) fn parse_folded_line(line: &str) -> Result<(Vec<&str>, u64), FoldedError> {
    let line = line.trim_end();
    let (stack, weight) = line.rsplit_once(' ').ok_or(FoldedError::MissingWeight)?;
    let weight = weight
        .parse()
        .map_err(|_| FoldedError::InvalidWeight(weight.to_string()))?;

    let stack = stack.trim();
    if stack.is_empty() {
        return Ok((Vec::new(), weight));
    }
    Ok((stack.split(';').collect(), weight))
}
