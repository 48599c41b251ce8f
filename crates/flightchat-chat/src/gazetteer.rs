//! City and airport lookup for slot extraction.
//!
//! Each alias maps to exactly one [`Location`]. A city served by several
//! airports maps to its metropolitan code or busiest airport; the other
//! airports are reachable only by naming them.

use std::collections::HashMap;
use std::sync::LazyLock;

use flightchat_core::Location;

struct Place {
    code: &'static str,
    city: &'static str,
    /// Normalized (see [`normalize`]) names, possibly multi-word.
    aliases: &'static [&'static str],
}

#[rustfmt::skip]
static PLACES: &[Place] = &[
    // Türkiye
    Place { code: "IST", city: "Istanbul", aliases: &["istanbul"] },
    Place { code: "SAW", city: "Istanbul", aliases: &["sabiha gökçen", "sabiha gokcen", "sabiha"] },
    Place { code: "ESB", city: "Ankara", aliases: &["ankara"] },
    Place { code: "ADB", city: "Izmir", aliases: &["izmir"] },
    Place { code: "AYT", city: "Antalya", aliases: &["antalya"] },
    Place { code: "DLM", city: "Dalaman", aliases: &["dalaman"] },
    Place { code: "BJV", city: "Bodrum", aliases: &["bodrum"] },
    Place { code: "TZX", city: "Trabzon", aliases: &["trabzon"] },
    // Europe
    Place { code: "LON", city: "London", aliases: &["london", "londra"] },
    Place { code: "LHR", city: "London", aliases: &["heathrow"] },
    Place { code: "LGW", city: "London", aliases: &["gatwick"] },
    Place { code: "PAR", city: "Paris", aliases: &["paris"] },
    Place { code: "CDG", city: "Paris", aliases: &["charles de gaulle"] },
    Place { code: "ORY", city: "Paris", aliases: &["orly"] },
    Place { code: "BER", city: "Berlin", aliases: &["berlin"] },
    Place { code: "FRA", city: "Frankfurt", aliases: &["frankfurt"] },
    Place { code: "MUC", city: "Munich", aliases: &["munich", "münchen", "münih", "munih"] },
    Place { code: "AMS", city: "Amsterdam", aliases: &["amsterdam"] },
    Place { code: "BRU", city: "Brussels", aliases: &["brussels", "brüksel", "bruksel"] },
    Place { code: "ROM", city: "Rome", aliases: &["rome", "roma"] },
    Place { code: "MIL", city: "Milan", aliases: &["milan", "milano"] },
    Place { code: "MAD", city: "Madrid", aliases: &["madrid"] },
    Place { code: "BCN", city: "Barcelona", aliases: &["barcelona"] },
    Place { code: "LIS", city: "Lisbon", aliases: &["lisbon", "lizbon", "lisboa"] },
    Place { code: "VIE", city: "Vienna", aliases: &["vienna", "viyana", "wien"] },
    Place { code: "ZRH", city: "Zurich", aliases: &["zurich", "zürich", "zürih"] },
    Place { code: "CPH", city: "Copenhagen", aliases: &["copenhagen", "kopenhag"] },
    Place { code: "PRG", city: "Prague", aliases: &["prague", "prag"] },
    Place { code: "BUD", city: "Budapest", aliases: &["budapest", "budapeşte"] },
    Place { code: "WAW", city: "Warsaw", aliases: &["warsaw", "varşova", "varsova"] },
    Place { code: "ATH", city: "Athens", aliases: &["athens", "atina"] },
    Place { code: "DUB", city: "Dublin", aliases: &["dublin"] },
    // Elsewhere
    Place { code: "NYC", city: "New York", aliases: &["new york", "newyork"] },
    Place { code: "JFK", city: "New York", aliases: &["jfk", "kennedy"] },
    Place { code: "DXB", city: "Dubai", aliases: &["dubai"] },
    Place { code: "DOH", city: "Doha", aliases: &["doha"] },
    Place { code: "TYO", city: "Tokyo", aliases: &["tokyo"] },
];

/// Alias word sequences, longest first so "sabiha gökçen" beats "sabiha".
static ALIASES: LazyLock<Vec<(Vec<&'static str>, &'static Place)>> = LazyLock::new(|| {
    let mut aliases: Vec<(Vec<&'static str>, &'static Place)> = PLACES
        .iter()
        .flat_map(|p| {
            p.aliases
                .iter()
                .map(move |a| (a.split_whitespace().collect::<Vec<_>>(), p))
        })
        .collect();
    aliases.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    aliases
});

static BY_CODE: LazyLock<HashMap<&'static str, &'static Place>> =
    LazyLock::new(|| PLACES.iter().map(|p| (p.code, p)).collect());

impl Place {
    fn location(&self) -> Location {
        Location::new(self.code, self.city)
    }
}

/// Lowercase for matching, folding the Turkish dotted/dotless i to `i`.
pub(crate) fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| *c != '\u{307}')
        .map(|c| if c == 'ı' { 'i' } else { c })
        .collect()
}

/// One word of the input, with its normalized form.
#[derive(Debug, Clone)]
pub(crate) struct Token<'a> {
    pub raw: &'a str,
    pub norm: String,
}

/// Split on anything that is not a letter or digit.
///
/// Apostrophes split too, so Turkish case suffixes ("Londra'ya") become
/// their own tokens.
pub(crate) fn tokenize(text: &str) -> Vec<Token<'_>> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|raw| Token {
            raw,
            norm: normalize(raw),
        })
        .collect()
}

/// A place named in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Mention {
    pub location: Location,
    /// Index of the first token of the mention.
    pub start: usize,
    /// Number of tokens covered.
    pub len: usize,
}

/// Find every place mentioned in `tokens`, in order.
///
/// Names match case-insensitively. Bare IATA codes match only when typed in
/// upper case, so words like "par" or "ist" are not read as airports.
pub(crate) fn find_mentions(tokens: &[Token<'_>]) -> Vec<Mention> {
    let mut mentions = Vec::new();
    let mut i = 0;
    'outer: while i < tokens.len() {
        for (words, place) in ALIASES.iter() {
            let end = i + words.len();
            if end <= tokens.len() && tokens[i..end].iter().zip(words).all(|(t, w)| t.norm == *w) {
                mentions.push(Mention {
                    location: place.location(),
                    start: i,
                    len: words.len(),
                });
                i = end;
                continue 'outer;
            }
        }

        let raw = tokens[i].raw;
        if raw.len() == 3 && raw.chars().all(|c| c.is_ascii_uppercase()) {
            if let Some(place) = BY_CODE.get(raw) {
                mentions.push(Mention {
                    location: place.location(),
                    start: i,
                    len: 1,
                });
            }
        }
        i += 1;
    }
    mentions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mentions(text: &str) -> Vec<String> {
        find_mentions(&tokenize(text))
            .into_iter()
            .map(|m| m.location.code)
            .collect()
    }

    #[test]
    fn test_normalize_turkish_i() {
        assert_eq!(normalize("İstanbul"), "istanbul");
        assert_eq!(normalize("ISTANBUL"), "istanbul");
        assert_eq!(normalize("ıstanbul"), "istanbul");
    }

    #[test]
    fn test_tokenize_splits_suffixes() {
        let tokens = tokenize("İstanbul'dan Londra'ya!");
        let norms: Vec<&str> = tokens.iter().map(|t| t.norm.as_str()).collect();
        assert_eq!(norms, vec!["istanbul", "dan", "londra", "ya"]);
    }

    #[test]
    fn test_city_resolves_to_primary_airport() {
        assert_eq!(mentions("fly from Istanbul"), vec!["IST"]);
        assert_eq!(mentions("fly from Sabiha Gökçen"), vec!["SAW"]);
        assert_eq!(mentions("fly from sabiha"), vec!["SAW"]);
    }

    #[test]
    fn test_multi_word_and_aliases() {
        assert_eq!(mentions("New York to Londra"), vec!["NYC", "LON"]);
        assert_eq!(mentions("to Charles de Gaulle"), vec!["CDG"]);
    }

    #[test]
    fn test_codes_require_upper_case() {
        assert_eq!(mentions("IST to LHR"), vec!["IST", "LHR"]);
        assert!(mentions("ist par").is_empty());
        assert!(mentions("prices in USD").is_empty());
    }

    #[test]
    fn test_mention_positions() {
        let found = find_mentions(&tokenize("from New York to Paris"));
        assert_eq!(found[0].start, 1);
        assert_eq!(found[0].len, 2);
        assert_eq!(found[1].start, 4);
    }
}
