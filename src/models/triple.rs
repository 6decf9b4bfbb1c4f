use serde::{Deserialize, Serialize};

/// A materialized cause-risk-effect association.
///
/// Rank is computed over triples: each risk's probability is multiplied by
/// the summed impact of the effects it reaches through its triples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Triple {
    pub id: i64,
    pub project: i64,
    pub cause: i64,
    pub risk: i64,
    pub effect: i64,
}

/// A raw directed association between two chunk identifiers,
/// e.g. `C12` → `R3` or `E7` → `P9`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub id: i64,
    pub project: i64,
    pub a: String,
    pub b: String,
}

/// Builds a chunk identifier like `C12` from its kind marker and id.
pub fn chunk(kind: char, id: i64) -> String {
    format!("{}{}", kind, id)
}

/// Splits a chunk identifier like `C12` into its kind marker and id.
/// Returns `None` for anything that is not a `C`/`R`/`E`/`P` followed
/// by a positive integer.
pub fn parse_chunk(chunk: &str) -> Option<(char, i64)> {
    let mut chars = chunk.chars();
    let kind = chars.next()?;
    if !matches!(kind, 'C' | 'R' | 'E' | 'P') {
        return None;
    }
    let id: i64 = chars.as_str().parse().ok()?;
    if id < 1 {
        return None;
    }
    Some((kind, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_round_trips_through_parse() {
        assert_eq!(parse_chunk(&chunk('C', 12)), Some(('C', 12)));
        assert_eq!(parse_chunk(&chunk('P', 9)), Some(('P', 9)));
    }

    #[test]
    fn parses_valid_chunks() {
        assert_eq!(parse_chunk("C12"), Some(('C', 12)));
        assert_eq!(parse_chunk("R3"), Some(('R', 3)));
        assert_eq!(parse_chunk("E7"), Some(('E', 7)));
        assert_eq!(parse_chunk("P9"), Some(('P', 9)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_chunk(""), None);
        assert_eq!(parse_chunk("X5"), None);
        assert_eq!(parse_chunk("C"), None);
        assert_eq!(parse_chunk("C-1"), None);
        assert_eq!(parse_chunk("12"), None);
        assert_eq!(parse_chunk("Cabc"), None);
    }
}
