/// Bed, bath and square-footage counts read from a detail block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetailCounts {
    pub beds: u32,
    pub baths: u32,
    pub sqft: u32,
}

const BEDS_LABEL: &str = "Beds";
const BATHS_LABEL: &str = "Baths";
const SQFT_LABEL: &str = "ft²";

/// Parses the counts out of a detail block such as `"3 Beds 2 Baths 1,850 ft²"`
///
/// Each count is the whitespace-delimited token immediately before the first
/// occurrence of its unit label, with `,` separators removed. A missing label
/// or a token that is not a whole number yields 0; this never fails.
pub fn parse_detail_counts(details: &str) -> DetailCounts {
    DetailCounts {
        beds: count_before(details, BEDS_LABEL),
        baths: count_before(details, BATHS_LABEL),
        sqft: count_before(details, SQFT_LABEL),
    }
}

fn count_before(text: &str, label: &str) -> u32 {
    let Some(position) = text.find(label) else {
        return 0;
    };

    text[..position]
        .split_whitespace()
        .last()
        .map(|token| token.replace(',', ""))
        .and_then(|token| token.parse::<u32>().ok())
        .unwrap_or(0)
}
