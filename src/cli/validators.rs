use flamecache::labels::Label;

/// Largest region the CLI accepts, 1GiB.
const MAX_REGION_CAPACITY_BYTES: usize = 1024 * 1024 * 1024;

pub(crate) fn parse_label(arg: &str) -> Result<Label, String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("`{arg}' isn't a KEY=VALUE pair"))?;
    if key.is_empty() {
        return Err(format!("`{arg}' has an empty key"));
    }

    match value.parse::<i64>() {
        Ok(number) => Ok(Label::from_number_value(key, number, "")),
        Err(_) => Ok(Label::from_string_value(key, value)),
    }
}

pub(crate) fn parse_region_capacity(arg: &str) -> Result<usize, String> {
    let bytes: usize = arg
        .parse()
        .map_err(|_| format!("`{arg}' isn't a valid usize"))?;
    if bytes > MAX_REGION_CAPACITY_BYTES {
        return Err(format!(
            "region capacity {} exceeds the maximum of {} bytes",
            bytes, MAX_REGION_CAPACITY_BYTES
        ));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::string("service=kafka", Label::from_string_value("service", "kafka"))]
    #[case::number("cpu=3", Label::from_number_value("cpu", 3, ""))]
    #[case::negative("offset=-12", Label::from_number_value("offset", -12, ""))]
    #[case::empty_value("env=", Label::from_string_value("env", ""))]
    #[case::equals_in_value("query=a=b", Label::from_string_value("query", "a=b"))]
    fn test_parse_label(#[case] arg: &str, #[case] expected: Label) {
        assert_eq!(parse_label(arg), Ok(expected));
    }

    #[rstest]
    #[case::no_separator("service")]
    #[case::empty_key("=kafka")]
    fn test_parse_label_rejects(#[case] arg: &str) {
        assert!(parse_label(arg).is_err());
    }

    #[rstest]
    #[case::zero("0", Ok(0))]
    #[case::mebibyte("1048576", Ok(1048576))]
    #[case::negative("-1", Err("`-1' isn't a valid usize".to_string()))]
    #[case::garbage("lots", Err("`lots' isn't a valid usize".to_string()))]
    fn test_parse_region_capacity(#[case] arg: &str, #[case] expected: Result<usize, String>) {
        assert_eq!(parse_region_capacity(arg), expected);
    }

    #[test]
    fn test_parse_region_capacity_too_large() {
        let arg = (MAX_REGION_CAPACITY_BYTES + 1).to_string();
        assert!(parse_region_capacity(&arg)
            .unwrap_err()
            .contains("exceeds the maximum"));
    }
}
