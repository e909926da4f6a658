/// 20 standard amino acids.
pub const AMINO_ACIDS: &[u8; 20] = b"ACDEFGHIKLMNPQRSTVWY";

pub const GAP: u8 = b'-';
/// Gap aligned to an insertion in another record (A2M/A3M).
pub const INSERT_GAP: u8 = b'.';

/// Match-state column: uppercase residue or deletion.
#[inline]
pub fn is_match_state(b: u8) -> bool {
    b.is_ascii_uppercase() || b == GAP
}

/// Insertion column: lowercase residue or `.`; not counted toward alignment length.
#[inline]
pub fn is_insertion(b: u8) -> bool {
    b.is_ascii_lowercase() || b == INSERT_GAP
}

#[inline]
pub fn is_alignment_char(b: u8) -> bool {
    is_match_state(b) || is_insertion(b)
}

/// Match-state projection of an aligned row.
pub fn match_states(row: &[u8]) -> Vec<u8> {
    row.iter().copied().filter(|&b| is_match_state(b)).collect()
}

pub fn match_state_len(row: &[u8]) -> usize {
    row.iter().filter(|&&b| is_match_state(b)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_columns() {
        assert!(is_match_state(b'M'));
        assert!(is_match_state(b'-'));
        assert!(!is_match_state(b'm'));
        assert!(is_insertion(b'm'));
        assert!(is_insertion(b'.'));
        assert!(!is_alignment_char(b'*'));
    }

    #[test]
    fn projection_drops_insertions() {
        assert_eq!(match_states(b"MKtaT-VRq"), b"MKT-VR");
        assert_eq!(match_state_len(b"..MK.a-"), 3);
    }
}
