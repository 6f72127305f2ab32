//! Residue Encoding
//!
//! Class ids follow the `ARNDCEQGHILKMFPSTWYV` ordering. `X` is accepted by
//! [`encode1`] and shares id 19 with valine; [`decode`] maps the out-of-alphabet
//! id 20 back to `X`.
use crate::error::{Result, SeqOrderError};
use candle_core::{Device, Tensor};
use strum::EnumIter;

/// Number of residue classes.
pub const ALPHABET_SIZE: usize = 20;

/// Id assigned to `X` by [`encode1`].
pub const UNKNOWN_ID: u32 = 19;

const UNKNOWN_LETTER: char = 'X';

macro_rules! define_residues {
    ($($name:ident: $code3:literal, $code1:literal, $idx:literal),* $(,)?) => {
        #[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter)]
        pub enum Residue {
            $($name),*
        }

        impl Residue {
            pub const fn code3(&self) -> &'static str {
                match self {
                    $(Self::$name => $code3),*
                }
            }
            pub const fn code1(&self) -> char {
                match self {
                    $(Self::$name => $code1),*
                }
            }
            pub const fn id(&self) -> u32 {
                match self {
                    $(Self::$name => $idx),*
                }
            }
            pub fn from_code3(code: &str) -> Option<Self> {
                match code {
                    $($code3 => Some(Self::$name),)*
                    _ => None,
                }
            }
            pub fn from_code1(code: char) -> Option<Self> {
                match code {
                    $($code1 => Some(Self::$name),)*
                    _ => None,
                }
            }
            pub fn from_id(id: u32) -> Option<Self> {
                match id {
                    $($idx => Some(Self::$name),)*
                    _ => None,
                }
            }
        }
    }
}

define_residues! {
    ALA: "ALA", 'A', 0,  ARG: "ARG", 'R', 1,  ASN: "ASN", 'N', 2,  ASP: "ASP", 'D', 3,
    CYS: "CYS", 'C', 4,  GLU: "GLU", 'E', 5,  GLN: "GLN", 'Q', 6,  GLY: "GLY", 'G', 7,
    HIS: "HIS", 'H', 8,  ILE: "ILE", 'I', 9,  LEU: "LEU", 'L', 10, LYS: "LYS", 'K', 11,
    MET: "MET", 'M', 12, PHE: "PHE", 'F', 13, PRO: "PRO", 'P', 14, SER: "SER", 'S', 15,
    THR: "THR", 'T', 16, TRP: "TRP", 'W', 17, TYR: "TYR", 'Y', 18, VAL: "VAL", 'V', 19,
}

/// Three-letter code to class id. Case-insensitive, no fallback for unknown codes.
pub fn encode3(code: &str) -> Result<u32> {
    Residue::from_code3(&code.to_ascii_uppercase())
        .map(|res| res.id())
        .ok_or_else(|| SeqOrderError::UnknownResidue(code.to_string()))
}

/// One-letter code to class id. Case-insensitive; `X` maps to [`UNKNOWN_ID`].
pub fn encode1(code: char) -> Result<u32> {
    let upper = code.to_ascii_uppercase();
    if upper == UNKNOWN_LETTER {
        return Ok(UNKNOWN_ID);
    }
    Residue::from_code1(upper)
        .map(|res| res.id())
        .ok_or_else(|| SeqOrderError::UnknownResidue(code.to_string()))
}

/// Class id to one-letter code, defined over `0..=20`.
pub fn decode(id: u32) -> Result<char> {
    match Residue::from_id(id) {
        Some(res) => Ok(res.code1()),
        None if id as usize == ALPHABET_SIZE => Ok(UNKNOWN_LETTER),
        None => Err(SeqOrderError::ResidueId(id)),
    }
}

pub fn encode_sequence(seq: &str) -> Result<Vec<u32>> {
    seq.chars().map(encode1).collect()
}

pub fn decode_sequence(ids: &[u32]) -> Result<String> {
    ids.iter().map(|&id| decode(id)).collect()
}

/// One-hot rows of shape `[ids.len(), ALPHABET_SIZE]` as `f32`.
pub fn onehot(ids: &[u32], device: &Device) -> Result<Tensor> {
    let mut data = vec![0f32; ids.len() * ALPHABET_SIZE];
    for (row, &id) in ids.iter().enumerate() {
        if id as usize >= ALPHABET_SIZE {
            return Err(SeqOrderError::ResidueId(id));
        }
        data[row * ALPHABET_SIZE + id as usize] = 1.0;
    }
    Ok(Tensor::from_vec(data, (ids.len(), ALPHABET_SIZE), device)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_residue_codes() {
        let ala = Residue::ALA;
        assert_eq!(ala.code3(), "ALA");
        assert_eq!(ala.code1(), 'A');
        assert_eq!(ala.id(), 0);
        assert_eq!(Residue::VAL.id(), 19);
    }

    #[test]
    fn test_one_and_three_letter_codes_agree() {
        for res in Residue::iter() {
            assert_eq!(encode3(res.code3()).unwrap(), encode1(res.code1()).unwrap());
        }
        assert_eq!(Residue::iter().count(), ALPHABET_SIZE);
    }

    #[test]
    fn test_decode_roundtrip() {
        for letter in "ARNDCEQGHILKMFPSTWYVarndceqghilkmfpstwyv".chars() {
            let id = encode1(letter).unwrap();
            assert_eq!(decode(id).unwrap(), letter.to_ascii_uppercase());
        }
        // X collapses onto the last class and does not round-trip
        assert_eq!(encode1('X').unwrap(), UNKNOWN_ID);
        assert_eq!(encode1('x').unwrap(), UNKNOWN_ID);
        assert_eq!(decode(20).unwrap(), 'X');
    }

    #[test]
    fn test_unknown_codes_fail() {
        assert!(matches!(encode1('B'), Err(SeqOrderError::UnknownResidue(_))));
        assert!(matches!(encode1('*'), Err(SeqOrderError::UnknownResidue(_))));
        assert!(matches!(encode3("UNK"), Err(SeqOrderError::UnknownResidue(_))));
        assert!(matches!(encode3("XYZ"), Err(SeqOrderError::UnknownResidue(_))));
        assert!(matches!(decode(21), Err(SeqOrderError::ResidueId(21))));
    }

    #[test]
    fn test_encode3_case_insensitive() {
        assert_eq!(encode3("trp").unwrap(), 17);
        assert_eq!(encode3("Gly").unwrap(), 7);
    }

    #[test]
    fn test_sequence_helpers() {
        let ids = encode_sequence("mKv").unwrap();
        assert_eq!(ids, vec![12, 11, 19]);
        assert_eq!(decode_sequence(&ids).unwrap(), "MKV");
        assert!(encode_sequence("MKZ").is_err());
    }

    #[test]
    fn test_onehot() {
        let ids = vec![0u32, 19, 5, 5];
        let rows = onehot(&ids, &Device::Cpu).unwrap().to_vec2::<f32>().unwrap();
        assert_eq!(rows.len(), 4);
        for (row, &id) in rows.iter().zip(ids.iter()) {
            assert_eq!(row.len(), ALPHABET_SIZE);
            assert_eq!(row.iter().sum::<f32>(), 1.0);
            assert_eq!(row[id as usize], 1.0);
        }
        assert!(onehot(&[20], &Device::Cpu).is_err());
    }
}
