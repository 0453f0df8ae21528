use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Armor class notation carried by an equipment item.
///
/// Accepted forms: `"16"` (flat body armor), `"11 + DEX"`,
/// `"14 + DEX (MAX 2)"` and `"+2"` (a shield-style bonus).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ArmorClass {
    Flat(i32),
    DexBased { base: i32, max_dex: Option<i32> },
    Bonus(i32),
}

impl ArmorClass {
    pub fn is_bonus(&self) -> bool {
        matches!(self, ArmorClass::Bonus(_))
    }

    /// The armor class this item sets for a wearer with the given dexterity modifier
    pub fn value_with(&self, dex_mod: i32) -> i32 {
        match *self {
            ArmorClass::Flat(value) => value,
            ArmorClass::DexBased { base, max_dex } => match max_dex {
                Some(cap) => base + dex_mod.min(cap),
                None => base + dex_mod,
            },
            ArmorClass::Bonus(bonus) => bonus,
        }
    }

    /// Armor class granted before dexterity, used to rate the item
    pub fn nominal(&self) -> i32 {
        match *self {
            ArmorClass::Flat(value) => value,
            ArmorClass::DexBased { base, .. } => base,
            ArmorClass::Bonus(bonus) => 10 + bonus,
        }
    }
}

impl FromStr for ArmorClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '(' && *c != ')')
            .collect::<String>()
            .to_uppercase();

        if let Some(bonus) = compact.strip_prefix('+') {
            return bonus
                .parse()
                .map(ArmorClass::Bonus)
                .map_err(|_| format!("Invalid armor bonus '{}'", s));
        }

        let digits: String = compact.chars().take_while(|c| c.is_ascii_digit()).collect();
        let base: i32 = digits
            .parse()
            .map_err(|_| format!("Armor class '{}' has no base value", s))?;
        let rest = &compact[digits.len()..];

        if rest.is_empty() {
            return Ok(ArmorClass::Flat(base));
        }
        if !rest.starts_with("+DEX") {
            return Err(format!("Unrecognised armor notation '{}'", s));
        }

        let max_dex = match rest.find("MAX") {
            Some(pos) => Some(
                rest[pos + 3..]
                    .parse()
                    .map_err(|_| format!("Invalid dexterity cap in '{}'", s))?,
            ),
            None => None,
        };

        Ok(ArmorClass::DexBased { base, max_dex })
    }
}

impl TryFrom<String> for ArmorClass {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ArmorClass> for String {
    fn from(value: ArmorClass) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ArmorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArmorClass::Flat(value) => write!(f, "{}", value),
            ArmorClass::DexBased { base, max_dex: None } => write!(f, "{} + DEX", base),
            ArmorClass::DexBased {
                base,
                max_dex: Some(cap),
            } => write!(f, "{} + DEX (MAX {})", base, cap),
            ArmorClass::Bonus(bonus) => write!(f, "+{}", bonus),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_notations() {
        assert_eq!("16".parse::<ArmorClass>().unwrap(), ArmorClass::Flat(16));
        assert_eq!("+2".parse::<ArmorClass>().unwrap(), ArmorClass::Bonus(2));
        assert_eq!(
            "11 + DEX".parse::<ArmorClass>().unwrap(),
            ArmorClass::DexBased { base: 11, max_dex: None }
        );
        assert_eq!(
            "14 + Dex (max 2)".parse::<ArmorClass>().unwrap(),
            ArmorClass::DexBased { base: 14, max_dex: Some(2) }
        );
        assert!("DEX".parse::<ArmorClass>().is_err());
        assert!("12 + STR".parse::<ArmorClass>().is_err());
    }

    #[test]
    fn test_dex_cap_applies() {
        let scale = ArmorClass::DexBased { base: 14, max_dex: Some(2) };
        assert_eq!(scale.value_with(4), 16);
        assert_eq!(scale.value_with(1), 15);
        assert_eq!(scale.value_with(-1), 13);
    }

    #[test]
    fn test_display_round_trips_through_serde() {
        let json = serde_json::to_string(&ArmorClass::DexBased { base: 14, max_dex: Some(2) }).unwrap();
        assert_eq!(json, "\"14 + DEX (MAX 2)\"");
    }
}
