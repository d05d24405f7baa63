use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Parsed B/S-notation rule, e.g. `B3/S23` or the Generations form
/// `B3/S23/4`. Stored alongside the canonical string so equal rules
/// compare equal regardless of how the user typed them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    birth: [bool; 9],
    survival: [bool; 9],
    states: u8,
    canonical: String,
}

impl Default for Rule {
    fn default() -> Self {
        // Conway's Life
        Rule::parse("B3/S23").unwrap_or_else(|_| unreachable!())
    }
}

impl Rule {
    /// Parse a rule string.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRule`] when the string is not valid
    /// B/S notation or declares fewer than 2 states.
    pub fn parse(text: &str) -> Result<Rule, EngineError> {
        let bad = |message: &str| EngineError::InvalidRule {
            rule: text.to_string(),
            message: message.to_string(),
        };

        let mut parts = text.trim().split('/');
        let birth_part = parts.next().ok_or_else(|| bad("empty rule"))?;
        let survival_part = parts.next().ok_or_else(|| bad("missing survival part"))?;
        let states_part = parts.next();
        if parts.next().is_some() {
            return Err(bad("too many '/' separators"));
        }

        let birth_digits = birth_part
            .strip_prefix(['B', 'b'])
            .ok_or_else(|| bad("birth part must start with 'B'"))?;
        let survival_digits = survival_part
            .strip_prefix(['S', 's'])
            .ok_or_else(|| bad("survival part must start with 'S'"))?;

        let mut birth = [false; 9];
        for ch in birth_digits.chars() {
            let d = ch.to_digit(10).filter(|d| *d <= 8).ok_or_else(|| bad("birth counts must be digits 0-8"))?;
            birth[d as usize] = true;
        }
        if birth[0] {
            return Err(bad("B0 rules are not supported"));
        }
        let mut survival = [false; 9];
        for ch in survival_digits.chars() {
            let d = ch.to_digit(10).filter(|d| *d <= 8).ok_or_else(|| bad("survival counts must be digits 0-8"))?;
            survival[d as usize] = true;
        }

        let states = match states_part {
            None => 2,
            Some(s) => {
                let n: u32 = s.parse().map_err(|_| bad("state count must be a number"))?;
                if !(2..=255).contains(&n) {
                    return Err(bad("state count must be between 2 and 255"));
                }
                n as u8
            }
        };

        let mut canonical = String::from("B");
        for (i, on) in birth.iter().enumerate() {
            if *on {
                canonical.push(char::from(b'0' + i as u8));
            }
        }
        canonical.push_str("/S");
        for (i, on) in survival.iter().enumerate() {
            if *on {
                canonical.push(char::from(b'0' + i as u8));
            }
        }
        if states > 2 {
            canonical.push('/');
            canonical.push_str(&states.to_string());
        }

        Ok(Rule {
            birth,
            survival,
            states,
            canonical,
        })
    }

    pub fn states(&self) -> u8 {
        self.states
    }

    pub fn is_birth(&self, neighbors: usize) -> bool {
        neighbors <= 8 && self.birth[neighbors]
    }

    pub fn is_survival(&self, neighbors: usize) -> bool {
        neighbors <= 8 && self.survival[neighbors]
    }

    pub fn as_str(&self) -> &str {
        &self.canonical
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical)
    }
}
