use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeedError {
    #[error("invalid seed '{0}': expected a decimal or 0x-prefixed hex number")]
    Invalid(String),
    #[error("no seeds given")]
    Empty,
}

/// Resolve CLI seed tokens into run seeds.
///
/// Accepts decimal numbers (negative values use their magnitude) and
/// `0x`-prefixed hex. Duplicates keep their first position.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>, SeedError> {
    let mut seeds: Vec<u64> = Vec::new();
    for token in tokens.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        let seed = parse_seed(token).ok_or_else(|| SeedError::Invalid(token.to_string()))?;
        if !seeds.contains(&seed) {
            seeds.push(seed);
        }
    }
    if seeds.is_empty() {
        return Err(SeedError::Empty);
    }
    Ok(seeds)
}

fn parse_seed(token: &str) -> Option<u64> {
    if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        return u64::from_str_radix(&hex.replace('_', ""), 16).ok();
    }
    if let Ok(value) = token.parse::<u64>() {
        return Some(value);
    }
    token.parse::<i64>().ok().map(i64::unsigned_abs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn parses_decimal_hex_and_negative() {
        let seeds = resolve_seed_inputs(&tokens(&["1337", "0xFF", "-5", "0x00C0_FFEE"])).unwrap();
        assert_eq!(seeds, vec![1337, 255, 5, 0x00C0_FFEE]);
    }

    #[test]
    fn duplicates_collapse() {
        let seeds = resolve_seed_inputs(&tokens(&["7", "0x7", "7"])).unwrap();
        assert_eq!(seeds, vec![7]);
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(
            resolve_seed_inputs(&tokens(&["1", "banana"])),
            Err(SeedError::Invalid("banana".to_string()))
        );
        assert_eq!(resolve_seed_inputs(&tokens(&[" "])), Err(SeedError::Empty));
    }
}
