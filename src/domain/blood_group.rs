use crate::utils::error::CalcError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// ABO 血型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AboType {
    O,
    A,
    B,
    AB,
}

/// Rh 因子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RhFactor {
    Negative,
    Positive,
}

/// The eight ABO/Rh groups. Declaration order is the table order and drives
/// `Ord`, so maps keyed by `BloodGroup` iterate O-, O+, A-, A+, B-, B+, AB-, AB+.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BloodGroup {
    ONeg,
    OPos,
    ANeg,
    APos,
    BNeg,
    BPos,
    AbNeg,
    AbPos,
}

// 列：受血者，欄：捐血者，順序與 BloodGroup::ALL 相同
const Y: bool = true;
const N: bool = false;
const COMPATIBILITY_MATRIX: [[bool; 8]; 8] = [
    //  O-  O+  A-  A+  B-  B+  AB- AB+
    [Y, N, N, N, N, N, N, N], // O-
    [Y, Y, N, N, N, N, N, N], // O+
    [Y, N, Y, N, N, N, N, N], // A-
    [Y, Y, Y, Y, N, N, N, N], // A+
    [Y, N, N, N, Y, N, N, N], // B-
    [Y, Y, N, N, Y, Y, N, N], // B+
    [Y, N, Y, N, Y, N, Y, N], // AB-
    [Y, Y, Y, Y, Y, Y, Y, Y], // AB+
];

impl BloodGroup {
    pub const ALL: [BloodGroup; 8] = [
        BloodGroup::ONeg,
        BloodGroup::OPos,
        BloodGroup::ANeg,
        BloodGroup::APos,
        BloodGroup::BNeg,
        BloodGroup::BPos,
        BloodGroup::AbNeg,
        BloodGroup::AbPos,
    ];

    pub const UNIVERSAL_DONOR: BloodGroup = BloodGroup::ONeg;
    pub const UNIVERSAL_RECIPIENT: BloodGroup = BloodGroup::AbPos;

    pub fn as_str(&self) -> &'static str {
        match self {
            BloodGroup::ONeg => "O-",
            BloodGroup::OPos => "O+",
            BloodGroup::ANeg => "A-",
            BloodGroup::APos => "A+",
            BloodGroup::BNeg => "B-",
            BloodGroup::BPos => "B+",
            BloodGroup::AbNeg => "AB-",
            BloodGroup::AbPos => "AB+",
        }
    }

    pub fn abo(&self) -> AboType {
        match self {
            BloodGroup::ONeg | BloodGroup::OPos => AboType::O,
            BloodGroup::ANeg | BloodGroup::APos => AboType::A,
            BloodGroup::BNeg | BloodGroup::BPos => AboType::B,
            BloodGroup::AbNeg | BloodGroup::AbPos => AboType::AB,
        }
    }

    pub fn rh(&self) -> RhFactor {
        match self {
            BloodGroup::ONeg | BloodGroup::ANeg | BloodGroup::BNeg | BloodGroup::AbNeg => {
                RhFactor::Negative
            }
            _ => RhFactor::Positive,
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    pub fn is_universal_donor(&self) -> bool {
        *self == Self::UNIVERSAL_DONOR
    }

    pub fn is_universal_recipient(&self) -> bool {
        *self == Self::UNIVERSAL_RECIPIENT
    }

    /// Groups this recipient can receive from, in table order.
    pub fn compatible_donors(&self) -> Vec<BloodGroup> {
        Self::ALL
            .into_iter()
            .filter(|donor| compatible(*donor, *self))
            .collect()
    }

    /// Groups this donor can give to, in table order.
    pub fn compatible_recipients(&self) -> Vec<BloodGroup> {
        Self::ALL
            .into_iter()
            .filter(|recipient| compatible(*self, *recipient))
            .collect()
    }
}

/// 查表判斷捐血者血液是否可輸給受血者
pub fn compatible(donor: BloodGroup, recipient: BloodGroup) -> bool {
    COMPATIBILITY_MATRIX[recipient.index()][donor.index()]
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BloodGroup {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        BloodGroup::ALL
            .into_iter()
            .find(|group| group.as_str() == trimmed)
            .ok_or_else(|| CalcError::InvalidBloodGroup {
                value: s.to_string(),
            })
    }
}

impl Serialize for BloodGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BloodGroup {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(donor: BloodGroup, recipient: BloodGroup) -> bool {
        let abo_ok = donor.abo() == AboType::O
            || donor.abo() == recipient.abo()
            || recipient.abo() == AboType::AB;
        let rh_ok = donor.rh() == RhFactor::Negative || recipient.rh() == RhFactor::Positive;
        abo_ok && rh_ok
    }

    #[test]
    fn test_matrix_agrees_with_abo_rh_rule() {
        for donor in BloodGroup::ALL {
            for recipient in BloodGroup::ALL {
                assert_eq!(
                    compatible(donor, recipient),
                    rule(donor, recipient),
                    "{} -> {}",
                    donor,
                    recipient
                );
            }
        }
    }

    #[test]
    fn test_parse_every_group() {
        for group in BloodGroup::ALL {
            assert_eq!(group.as_str().parse::<BloodGroup>().unwrap(), group);
        }
        assert_eq!(" AB- ".parse::<BloodGroup>().unwrap(), BloodGroup::AbNeg);
    }

    #[test]
    fn test_parse_rejects_unknown_text() {
        for bad in ["", "a+", "C+", "AB", "O", "0-", "A +"] {
            let err = bad.parse::<BloodGroup>().unwrap_err();
            assert!(matches!(err, CalcError::InvalidBloodGroup { ref value } if value == bad));
        }
    }

    #[test]
    fn test_compatible_donors_lists() {
        assert_eq!(BloodGroup::ONeg.compatible_donors(), vec![BloodGroup::ONeg]);
        assert_eq!(BloodGroup::AbPos.compatible_donors(), BloodGroup::ALL.to_vec());
        assert_eq!(
            BloodGroup::APos.compatible_donors(),
            vec![
                BloodGroup::ONeg,
                BloodGroup::OPos,
                BloodGroup::ANeg,
                BloodGroup::APos
            ]
        );
        assert_eq!(BloodGroup::AbPos.compatible_recipients(), vec![BloodGroup::AbPos]);
        assert_eq!(BloodGroup::ONeg.compatible_recipients(), BloodGroup::ALL.to_vec());
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&BloodGroup::AbNeg).unwrap();
        assert_eq!(json, "\"AB-\"");
        let back: BloodGroup = serde_json::from_str("\"O+\"").unwrap();
        assert_eq!(back, BloodGroup::OPos);
        assert!(serde_json::from_str::<BloodGroup>("\"Q+\"").is_err());
    }
}
