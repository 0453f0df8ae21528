use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A damage formula such as `2d6`, `d8` or `1d10 fire`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DiceFormula {
    pub count: u32,
    pub sides: u32,
}

impl DiceFormula {
    pub fn new(count: u32, sides: u32) -> Self {
        Self { count, sides }
    }

    /// Average worth of the dice: the maximum roll plus one per extra die, in sixths
    pub fn power(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let total = self.count * self.sides + (self.count - 1);
        total as f64 / 6.0
    }

    pub fn scaled(&self, factor: u32) -> DiceFormula {
        DiceFormula::new(self.count * factor.max(1), self.sides)
    }
}

/// Cantrip damage dice multiply at character levels 5, 11 and 17
pub fn cantrip_dice_multiplier(level: u32) -> u32 {
    match level {
        0..=4 => 1,
        5..=10 => 2,
        11..=16 => 3,
        _ => 4,
    }
}

impl FromStr for DiceFormula {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Anything after the dice (a damage type) is ignored
        let notation = s.split_whitespace().next().unwrap_or("");
        let (count, sides) = notation
            .split_once(['d', 'D'])
            .ok_or_else(|| format!("Dice formula '{}' has no 'd'", s))?;

        let count = if count.is_empty() {
            1
        } else {
            count
                .parse::<u32>()
                .map_err(|_| format!("Invalid dice count in '{}'", s))?
        };
        let sides = sides
            .parse::<u32>()
            .map_err(|_| format!("Invalid dice sides in '{}'", s))?;

        Ok(DiceFormula { count, sides })
    }
}

impl TryFrom<String> for DiceFormula {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DiceFormula> for String {
    fn from(value: DiceFormula) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DiceFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variants() {
        assert_eq!("2d6".parse::<DiceFormula>().unwrap(), DiceFormula::new(2, 6));
        assert_eq!("d8".parse::<DiceFormula>().unwrap(), DiceFormula::new(1, 8));
        assert_eq!("1d10 fire".parse::<DiceFormula>().unwrap(), DiceFormula::new(1, 10));
        assert!("ten".parse::<DiceFormula>().is_err());
        assert!("2dx".parse::<DiceFormula>().is_err());
    }

    #[test]
    fn test_power_rewards_extra_dice() {
        // (1*12 + 0) / 6
        assert_eq!(DiceFormula::new(1, 12).power(), 2.0);
        // (2*6 + 1) / 6
        assert!((DiceFormula::new(2, 6).power() - 13.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_cantrip_scaling() {
        assert_eq!(cantrip_dice_multiplier(1), 1);
        assert_eq!(cantrip_dice_multiplier(5), 2);
        assert_eq!(cantrip_dice_multiplier(11), 3);
        assert_eq!(cantrip_dice_multiplier(20), 4);
        assert_eq!(DiceFormula::new(1, 10).scaled(2), DiceFormula::new(2, 10));
    }
}
