//! DNA sequence utilities.
//!
//! All simulated sequences use the 5-symbol alphabet `{A, C, G, T, N}`.

use rand::Rng;

/// The no-call base.
pub const NO_CALL_BASE: u8 = b'N';

/// The four called bases, in lexicographic order.
pub const BASES: &[u8; 4] = b"ACGT";

/// Complements a single DNA base, normalizing to uppercase.
///
/// Returns the Watson-Crick complement: A<->T, C<->G. Anything outside the
/// called alphabet complements to N.
#[inline]
#[must_use]
pub const fn complement_base(base: u8) -> u8 {
    match base {
        b'A' | b'a' => b'T',
        b'T' | b't' => b'A',
        b'C' | b'c' => b'G',
        b'G' | b'g' => b'C',
        _ => NO_CALL_BASE,
    }
}

/// Reverse complements a DNA sequence.
#[must_use]
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&base| complement_base(base)).collect()
}

/// Reverse complements a DNA sequence into an existing buffer.
pub fn reverse_complement_into(seq: &[u8], output: &mut Vec<u8>) {
    output.reserve(seq.len());
    for &b in seq.iter().rev() {
        output.push(complement_base(b));
    }
}

/// Normalizes a raw FASTA byte to the 5-symbol alphabet.
///
/// Lowercase bases are uppercased; IUPAC ambiguity codes and anything else
/// become N.
#[inline]
#[must_use]
pub const fn normalize_base(base: u8) -> u8 {
    match base {
        b'A' | b'a' => b'A',
        b'C' | b'c' => b'C',
        b'G' | b'g' => b'G',
        b'T' | b't' => b'T',
        _ => NO_CALL_BASE,
    }
}

/// Draws a uniformly random called base.
pub fn random_base(rng: &mut impl Rng) -> u8 {
    BASES[rng.random_range(0..4)]
}

/// Substitutes a base with one of its three alternatives, uniformly.
///
/// N substitutes to a uniformly random called base.
pub fn substitute_base(base: u8, rng: &mut impl Rng) -> u8 {
    // Lookup table: for each called base, the three alternatives.
    const ALTERNATIVES: [&[u8; 3]; 256] = {
        let mut table: [&[u8; 3]; 256] = [b"ACG"; 256];
        table[b'A' as usize] = b"CGT";
        table[b'C' as usize] = b"AGT";
        table[b'G' as usize] = b"ACT";
        table[b'T' as usize] = b"ACG";
        table
    };

    if base == NO_CALL_BASE {
        random_base(rng)
    } else {
        ALTERNATIVES[base as usize][rng.random_range(0..3)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_complement_base() {
        for (base, expected) in [(b'A', b'T'), (b'T', b'A'), (b'C', b'G'), (b'G', b'C')] {
            assert_eq!(complement_base(base), expected);
        }
        assert_eq!(complement_base(b'N'), b'N');
        assert_eq!(complement_base(b'X'), b'N');
    }

    #[test]
    fn test_reverse_complement() {
        // ACGT -> complement TGCA -> reverse ACGT (palindrome)
        assert_eq!(reverse_complement(b"ACGT"), b"ACGT");
        assert_eq!(reverse_complement(b"AAAT"), b"ATTT");
        assert_eq!(reverse_complement(b"ANT"), b"ANT");
        assert_eq!(reverse_complement(b""), Vec::<u8>::new());
    }

    #[test]
    fn test_reverse_complement_double() {
        let seq = b"ACGGTTANCG";
        assert_eq!(reverse_complement(&reverse_complement(seq)), seq.to_vec());
    }

    #[test]
    fn test_normalize_base() {
        assert_eq!(normalize_base(b'a'), b'A');
        assert_eq!(normalize_base(b't'), b'T');
        assert_eq!(normalize_base(b'R'), b'N');
        assert_eq!(normalize_base(b'-'), b'N');
    }

    #[test]
    fn test_substitute_base_never_identity() {
        let mut rng = StdRng::seed_from_u64(42);
        for &base in BASES {
            for _ in 0..100 {
                let sub = substitute_base(base, &mut rng);
                assert_ne!(sub, base);
                assert!(BASES.contains(&sub));
            }
        }
    }

    #[test]
    fn test_substitute_no_call() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            assert!(BASES.contains(&substitute_base(b'N', &mut rng)));
        }
    }
}
