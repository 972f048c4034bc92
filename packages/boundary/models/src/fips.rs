//! US state FIPS lookups used to address `TIGERweb` county queries.
//!
//! `TIGERweb` filters counties by two-digit state FIPS, while run files
//! name states the way people write them, so every lookup here goes from
//! a full name or abbreviation to the FIPS code.

/// `(fips, abbreviation, name)` for the 50 states + DC.
pub const STATES: &[(&str, &str, &str)] = &[
    ("01", "AL", "Alabama"),
    ("02", "AK", "Alaska"),
    ("04", "AZ", "Arizona"),
    ("05", "AR", "Arkansas"),
    ("06", "CA", "California"),
    ("08", "CO", "Colorado"),
    ("09", "CT", "Connecticut"),
    ("10", "DE", "Delaware"),
    ("11", "DC", "District of Columbia"),
    ("12", "FL", "Florida"),
    ("13", "GA", "Georgia"),
    ("15", "HI", "Hawaii"),
    ("16", "ID", "Idaho"),
    ("17", "IL", "Illinois"),
    ("18", "IN", "Indiana"),
    ("19", "IA", "Iowa"),
    ("20", "KS", "Kansas"),
    ("21", "KY", "Kentucky"),
    ("22", "LA", "Louisiana"),
    ("23", "ME", "Maine"),
    ("24", "MD", "Maryland"),
    ("25", "MA", "Massachusetts"),
    ("26", "MI", "Michigan"),
    ("27", "MN", "Minnesota"),
    ("28", "MS", "Mississippi"),
    ("29", "MO", "Missouri"),
    ("30", "MT", "Montana"),
    ("31", "NE", "Nebraska"),
    ("32", "NV", "Nevada"),
    ("33", "NH", "New Hampshire"),
    ("34", "NJ", "New Jersey"),
    ("35", "NM", "New Mexico"),
    ("36", "NY", "New York"),
    ("37", "NC", "North Carolina"),
    ("38", "ND", "North Dakota"),
    ("39", "OH", "Ohio"),
    ("40", "OK", "Oklahoma"),
    ("41", "OR", "Oregon"),
    ("42", "PA", "Pennsylvania"),
    ("44", "RI", "Rhode Island"),
    ("45", "SC", "South Carolina"),
    ("46", "SD", "South Dakota"),
    ("47", "TN", "Tennessee"),
    ("48", "TX", "Texas"),
    ("49", "UT", "Utah"),
    ("50", "VT", "Vermont"),
    ("51", "VA", "Virginia"),
    ("53", "WA", "Washington"),
    ("54", "WV", "West Virginia"),
    ("55", "WI", "Wisconsin"),
    ("56", "WY", "Wyoming"),
];

/// Resolves a state given by full name or two-letter abbreviation
/// (case-insensitive) to its FIPS code.
#[must_use]
pub fn state_fips(name_or_abbr: &str) -> Option<&'static str> {
    let needle = name_or_abbr.trim();
    STATES
        .iter()
        .find(|(_, abbr, name)| abbr.eq_ignore_ascii_case(needle) || name.eq_ignore_ascii_case(needle))
        .map(|(fips, _, _)| *fips)
}

/// Returns the canonical full name for a FIPS code.
#[must_use]
pub fn state_name(fips: &str) -> Option<&'static str> {
    STATES
        .iter()
        .find(|(code, _, _)| *code == fips)
        .map(|(_, _, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_count() {
        assert_eq!(STATES.len(), 51);
    }

    #[test]
    fn resolves_names_and_abbreviations() {
        assert_eq!(state_fips("Pennsylvania"), Some("42"));
        assert_eq!(state_fips("pennsylvania"), Some("42"));
        assert_eq!(state_fips("PA"), Some("42"));
        assert_eq!(state_fips(" nj "), Some("34"));
        assert_eq!(state_fips("Puerto Rico"), None);
    }

    #[test]
    fn name_roundtrip() {
        for (fips, _, name) in STATES {
            assert_eq!(state_fips(name), Some(*fips));
            assert_eq!(state_name(fips), Some(*name));
        }
        assert_eq!(state_name("99"), None);
    }
}
