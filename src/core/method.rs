// method.rs - Automated column trimming methods

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fully automatic column trimming method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrimMethod {
    /// Picks gappyout or strict from the identity profile
    Automated1,
    NoGaps,
    NoAllGaps,
    Gappyout,
    Strict,
    StrictPlus,
}

impl FromStr for TrimMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "automated1" | "auto" => Ok(TrimMethod::Automated1),
            "nogaps" => Ok(TrimMethod::NoGaps),
            "noallgaps" => Ok(TrimMethod::NoAllGaps),
            "gappyout" => Ok(TrimMethod::Gappyout),
            "strict" => Ok(TrimMethod::Strict),
            "strictplus" | "strict+" => Ok(TrimMethod::StrictPlus),
            _ => Err(format!(
                "Invalid method: {}. Use: automated1, nogaps, noallgaps, gappyout, strict, strictplus",
                s
            )),
        }
    }
}

impl TrimMethod {
    pub fn name(&self) -> &'static str {
        match self {
            TrimMethod::Automated1 => "automated1",
            TrimMethod::NoGaps => "nogaps",
            TrimMethod::NoAllGaps => "noallgaps",
            TrimMethod::Gappyout => "gappyout",
            TrimMethod::Strict => "strict",
            TrimMethod::StrictPlus => "strictplus",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TrimMethod::Automated1 => "heuristic choice between gappyout and strict",
            TrimMethod::NoGaps => "remove every column containing a gap",
            TrimMethod::NoAllGaps => "remove columns made only of gaps",
            TrimMethod::Gappyout => "gap cut at the elbow of the gap distribution",
            TrimMethod::Strict => "gap and similarity cuts, fixed block size",
            TrimMethod::StrictPlus => "gap and similarity cuts, block size scaled to the length",
        }
    }

    /// Every method, in the order they are documented
    pub fn all() -> [TrimMethod; 6] {
        [
            TrimMethod::Automated1,
            TrimMethod::NoGaps,
            TrimMethod::NoAllGaps,
            TrimMethod::Gappyout,
            TrimMethod::Strict,
            TrimMethod::StrictPlus,
        ]
    }
}

impl fmt::Display for TrimMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_parse_back() {
        for method in TrimMethod::all() {
            assert_eq!(method.name().parse::<TrimMethod>().unwrap(), method);
        }
        assert_eq!("STRICT+".parse::<TrimMethod>().unwrap(), TrimMethod::StrictPlus);
        assert!("gappy".parse::<TrimMethod>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&TrimMethod::NoAllGaps).unwrap();
        assert_eq!(json, "\"noallgaps\"");
        let method: TrimMethod = serde_json::from_str("\"strictplus\"").unwrap();
        assert_eq!(method, TrimMethod::StrictPlus);
    }
}
