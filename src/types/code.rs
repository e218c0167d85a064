use std::borrow::Borrow;
use std::fmt;

/// A tariff classification code at chapter (2), heading (4), or subheading
/// (6) digit granularity.
///
/// Codes are stored dotless (`"2903.10"` becomes `"290310"`) and are always
/// compared as strings: leading zeros are significant, so chapter `04` must
/// never collapse into `4`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Code(String);

impl Code {
    /// Normalize a raw token into a code by dropping the dots legal texts
    /// punctuate codes with (`29.01`, `2903.10`).
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().chars().filter(|c| *c != '.').collect())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of digits, which doubles as the granularity (2, 4, or 6).
    #[must_use]
    pub fn digits(&self) -> usize {
        self.0.len()
    }

    /// The leading `digits` characters; the whole code when it is shorter.
    #[must_use]
    pub fn prefix(&self, digits: usize) -> &str {
        &self.0[..digits.min(self.0.len())]
    }

    /// The two-digit chapter prefix.
    #[must_use]
    pub fn chapter(&self) -> &str {
        self.prefix(2)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Code {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Code {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Code {
    fn from(raw: &str) -> Self {
        Code::new(raw)
    }
}

impl From<String> for Code {
    fn from(raw: String) -> Self {
        Code::new(raw)
    }
}

/// Hierarchy tier a clause can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Tier {
    Chapter,
    Heading,
    Subheading,
    /// Finer than subheading in the nomenclature, but resolved at the
    /// six-digit leaf level like [`Tier::Subheading`].
    TariffItem,
}

impl Tier {
    /// Digit granularity of the tier.
    #[must_use]
    pub fn digits(self) -> usize {
        match self {
            Tier::Chapter => 2,
            Tier::Heading => 4,
            Tier::Subheading | Tier::TariffItem => 6,
        }
    }

    /// Parse a tier keyword as captured from a clause. The sentence-initial
    /// `Chapter` spelling is folded; anything outside the fixed enumeration
    /// is `None` (an [`UnclassifiedTier`](crate::ClassifyError) defect
    /// upstream).
    pub(crate) fn from_keyword(keyword: &str) -> Option<Tier> {
        match keyword.to_ascii_lowercase().as_str() {
            "chapter" => Some(Tier::Chapter),
            "heading" => Some(Tier::Heading),
            "subheading" => Some(Tier::Subheading),
            "tariff item" => Some(Tier::TariffItem),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Chapter => write!(f, "chapter"),
            Tier::Heading => write!(f, "heading"),
            Tier::Subheading => write!(f, "subheading"),
            Tier::TariffItem => write!(f, "tariff item"),
        }
    }
}

/// A single code or an inclusive low–high pair, expanded to leaf codes
/// through a [`CodeIndex`](crate::CodeIndex).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CodeRange {
    low: Code,
    high: Option<Code>,
}

impl CodeRange {
    #[must_use]
    pub fn single(code: Code) -> Self {
        Self { low: code, high: None }
    }

    #[must_use]
    pub fn span(low: Code, high: Code) -> Self {
        Self { low, high: Some(high) }
    }

    /// Parse a hyphen-normalized range string (`"0101"`, `"2903-2905"`,
    /// `"8501.10-8501.53"`). Returns `None` for anything that is not one or
    /// two dot-and-digit code tokens.
    pub fn parse(text: &str) -> Option<Self> {
        fn token(part: &str) -> Option<Code> {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit() || c == '.') {
                return None;
            }
            let code = Code::new(part);
            (!code.as_str().is_empty()).then_some(code)
        }

        let mut parts = text.splitn(2, '-');
        let low = token(parts.next()?)?;
        match parts.next() {
            None => Some(CodeRange::single(low)),
            Some(rest) => Some(CodeRange::span(low, token(rest)?)),
        }
    }

    #[must_use]
    pub fn low(&self) -> &Code {
        &self.low
    }

    #[must_use]
    pub fn high(&self) -> Option<&Code> {
        self.high.as_ref()
    }

    /// Low and high endpoints; a single code is its own high end.
    #[must_use]
    pub fn endpoints(&self) -> (&Code, &Code) {
        (&self.low, self.high.as_ref().unwrap_or(&self.low))
    }
}

impl fmt::Display for CodeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.high {
            Some(high) => write!(f, "{}-{}", self.low, high),
            None => write!(f, "{}", self.low),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_normalizes_dots() {
        assert_eq!(Code::new("2903.10").as_str(), "290310");
        assert_eq!(Code::new("29.01").as_str(), "2901");
        assert_eq!(Code::new("8501").as_str(), "8501");
    }

    #[test]
    fn code_keeps_leading_zeros() {
        let code = Code::new("0101.21");
        assert_eq!(code.as_str(), "010121");
        assert_eq!(code.chapter(), "01");
    }

    #[test]
    fn code_prefix_clamps_to_length() {
        let code = Code::new("8501");
        assert_eq!(code.prefix(6), "8501");
        assert_eq!(code.prefix(2), "85");
    }

    #[test]
    fn codes_order_as_strings() {
        assert!(Code::new("010121") < Code::new("020110"));
        assert!(Code::new("090110") < Code::new("100110"));
    }

    #[test]
    fn tier_keywords() {
        assert_eq!(Tier::from_keyword("chapter"), Some(Tier::Chapter));
        assert_eq!(Tier::from_keyword("Chapter"), Some(Tier::Chapter));
        assert_eq!(Tier::from_keyword("heading"), Some(Tier::Heading));
        assert_eq!(Tier::from_keyword("subheading"), Some(Tier::Subheading));
        assert_eq!(Tier::from_keyword("tariff item"), Some(Tier::TariffItem));
        assert_eq!(Tier::from_keyword("section"), None);
    }

    #[test]
    fn tier_digits() {
        assert_eq!(Tier::Chapter.digits(), 2);
        assert_eq!(Tier::Heading.digits(), 4);
        assert_eq!(Tier::Subheading.digits(), 6);
        assert_eq!(Tier::TariffItem.digits(), 6);
    }

    #[test]
    fn range_parse_single_and_span() {
        assert_eq!(
            CodeRange::parse("0101"),
            Some(CodeRange::single(Code::new("0101")))
        );
        assert_eq!(
            CodeRange::parse("2903.10-2903.69"),
            Some(CodeRange::span(Code::new("290310"), Code::new("290369")))
        );
        assert_eq!(CodeRange::parse(""), None);
        assert_eq!(CodeRange::parse("29a1"), None);
        assert_eq!(CodeRange::parse("2903-"), None);
    }

    #[test]
    fn range_endpoints_fold_single() {
        let range = CodeRange::single(Code::new("8501"));
        let (low, high) = range.endpoints();
        assert_eq!(low, high);
    }

    #[test]
    fn range_display_roundtrip() {
        let range = CodeRange::parse("2903.10-2903.69").unwrap();
        assert_eq!(range.to_string(), "290310-290369");
    }
}
