//! Intent and slot resolver.
//!
//! Classifies an utterance as a flight request or chit-chat, extracts
//! origin, destination, dates, passenger count and currency, and merges them
//! over the session's [`SlotMemory`] to produce a [`Resolution`].

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use regex::Regex;
use std::sync::LazyLock;

use flightchat_core::{FlightQuery, Location, SlotMemory};

use crate::gazetteer::{find_mentions, normalize, tokenize, Mention, Token};
use crate::types::{MissingSlot, Resolution};

// =============================================================================
// Vocabulary
// =============================================================================

static MONTHS: &[(&str, u32)] = &[
    ("january", 1), ("jan", 1), ("ocak", 1),
    ("february", 2), ("feb", 2), ("şubat", 2), ("subat", 2),
    ("march", 3), ("mar", 3), ("mart", 3),
    ("april", 4), ("apr", 4), ("nisan", 4),
    ("may", 5), ("mayis", 5),
    ("june", 6), ("jun", 6), ("haziran", 6),
    ("july", 7), ("jul", 7), ("temmuz", 7),
    ("august", 8), ("aug", 8), ("ağustos", 8), ("agustos", 8),
    ("september", 9), ("sept", 9), ("sep", 9), ("eylül", 9), ("eylul", 9),
    ("october", 10), ("oct", 10), ("ekim", 10),
    ("november", 11), ("nov", 11), ("kasim", 11),
    ("december", 12), ("dec", 12), ("aralik", 12),
];

static WEEKDAYS: &[(&str, Weekday)] = &[
    ("monday", Weekday::Mon), ("pazartesi", Weekday::Mon),
    ("tuesday", Weekday::Tue), ("sali", Weekday::Tue),
    ("wednesday", Weekday::Wed), ("çarşamba", Weekday::Wed), ("carsamba", Weekday::Wed),
    ("thursday", Weekday::Thu), ("perşembe", Weekday::Thu), ("persembe", Weekday::Thu),
    ("friday", Weekday::Fri), ("cuma", Weekday::Fri),
    ("saturday", Weekday::Sat), ("cumartesi", Weekday::Sat),
    ("sunday", Weekday::Sun), ("pazar", Weekday::Sun),
];

static NUMBER_WORDS: &[(&str, u32)] = &[
    ("one", 1), ("two", 2), ("three", 3), ("four", 4), ("five", 5),
    ("six", 6), ("seven", 7), ("eight", 8), ("nine", 9), ("ten", 10),
    ("bir", 1), ("iki", 2), ("üç", 3), ("dört", 4), ("beş", 5),
    ("alti", 6), ("yedi", 7), ("sekiz", 8), ("dokuz", 9), ("on", 10),
];

/// Words before a place that mark it as the origin.
const ORIGIN_BEFORE: &[&str] = &["from", "leaving", "departing"];
/// Words before a place that mark it as the destination.
const DESTINATION_BEFORE: &[&str] = &["to", "into", "towards", "toward"];
/// Turkish ablative suffixes ("İstanbul'dan").
const ORIGIN_AFTER: &[&str] = &["dan", "den", "tan", "ten"];
/// Turkish dative suffixes ("Londra'ya").
const DESTINATION_AFTER: &[&str] = &["a", "e", "ya", "ye"];

/// Words right before a date that make it the return date.
const RETURN_MARKERS: &[&str] = &["return", "returning", "back", "dönüş", "donus"];

/// ISO currency codes recognized when typed in upper case.
const CURRENCY_CODES: &[&str] = &["EUR", "USD", "GBP", "TRY", "CHF", "JPY"];

const CURRENCY_WORDS: &[(&str, &str)] = &[
    ("euro", "EUR"), ("euros", "EUR"),
    ("dollar", "USD"), ("dollars", "USD"),
    ("pound", "GBP"), ("pounds", "GBP"), ("sterling", "GBP"),
    ("lira", "TRY"), ("liras", "TRY"), ("tl", "TRY"),
    ("franc", "CHF"), ("francs", "CHF"),
    ("yen", "JPY"),
];

fn alternation<T>(words: &[(&str, T)]) -> String {
    let mut names: Vec<&str> = words.iter().map(|(w, _)| *w).collect();
    // Longest first so "sept" is tried before "sep".
    names.sort_by(|a, b| b.len().cmp(&a.len()));
    names
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|")
}

fn lookup_word<T: Copy>(words: &[(&str, T)], word: &str) -> Option<T> {
    words.iter().find(|(w, _)| *w == word).map(|(_, v)| *v)
}

// =============================================================================
// Compiled patterns (compiled once, reused across calls)
// =============================================================================

static FLIGHT_KEYWORDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:flights?|fly|flying|plane|planes|tickets?|airfares?|airlines?|uçuş\w*|ucus\w*|uçak\w*|ucak\w*|uçmak|bilet\w*)\b",
    )
    .expect("Invalid flight keyword regex")
});

struct DatePatterns {
    iso: Regex,
    dotted: Regex,
    day_month: Regex,
    month_day: Regex,
    week_of_month: Regex,
    day_after_tomorrow: Regex,
    tomorrow: Regex,
    today: Regex,
    in_n: Regex,
    next_week: Regex,
    weekend: Regex,
    weekday: Regex,
}

static DATE_PATTERNS: LazyLock<DatePatterns> = LazyLock::new(|| {
    let months = alternation(MONTHS);
    let weekdays = alternation(WEEKDAYS);
    let numbers = alternation(NUMBER_WORDS);
    let mk = |p: &str| Regex::new(p).expect("Invalid date regex");

    DatePatterns {
        iso: mk(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b"),
        dotted: mk(r"\b(\d{1,2})[./](\d{1,2})[./](\d{4})\b"),
        day_month: mk(&format!(
            r"\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?({})\b(?:,?\s+(\d{{4}})\b)?",
            months
        )),
        month_day: mk(&format!(
            r"\b({})\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s+(\d{{4}})\b)?",
            months
        )),
        week_of_month: mk(&format!(
            r"\b(first|1st|second|2nd|third|3rd|fourth|4th|last)\s+week\s+of\s+({})\b",
            months
        )),
        day_after_tomorrow: mk(r"\b(?:the\s+)?day\s+after\s+tomorrow\b|\böbür\s+gün\b"),
        tomorrow: mk(r"\btomorrow\b|\byarin\b"),
        today: mk(r"\btoday\b|\btonight\b|\bbugün\b"),
        in_n: mk(&format!(r"\bin\s+(\d{{1,3}}|{})\s+(days?|weeks?)\b", numbers)),
        next_week: mk(r"\bnext\s+week\b|\bgelecek\s+hafta\b|\bhaftaya\b"),
        weekend: mk(r"\b(?:(this|next)\s+)?weekend\b"),
        weekday: mk(&format!(r"\b(?:(this|next|on|coming)\s+)?({})\b", weekdays)),
    }
});

static PASSENGERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b(\d{{1,2}}|{})\s+(?:adults?|passengers?|people|persons?|travell?ers?|tickets?|seats?|kişi|kisi|yolcu)\b",
        alternation(NUMBER_WORDS)
    ))
    .expect("Invalid passenger regex")
});

// =============================================================================
// Date arithmetic
// =============================================================================

/// First `weekday` on or after `from`.
fn on_or_after(from: NaiveDate, weekday: Weekday) -> NaiveDate {
    let target = weekday.num_days_from_monday() as i64;
    let current = from.weekday().num_days_from_monday() as i64;
    let ahead = (target - current + 7) % 7;
    from + Duration::days(ahead)
}

/// First `weekday` strictly after `from`.
fn strictly_after(from: NaiveDate, weekday: Weekday) -> NaiveDate {
    on_or_after(from + Duration::days(1), weekday)
}

/// Monday of the week after `today`.
fn next_monday(today: NaiveDate) -> NaiveDate {
    strictly_after(today, Weekday::Mon)
}

/// A day and month with an optional year. Without a year, a date already
/// past this year rolls forward to next year.
fn day_month(today: NaiveDate, day: u32, month: u32, year: Option<i32>) -> Option<NaiveDate> {
    match year {
        Some(y) => NaiveDate::from_ymd_opt(y, month, day),
        None => {
            let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
            if this_year < today {
                NaiveDate::from_ymd_opt(today.year() + 1, month, day)
            } else {
                Some(this_year)
            }
        }
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (y, m) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(y, m, 1).map(|d| d - Duration::days(1))
}

/// Start of the given week of a month, rolled to next year once the whole
/// week is past. A week already under way starts today.
fn week_of_month(today: NaiveDate, ordinal: &str, month: u32) -> Option<NaiveDate> {
    let start_in = |year: i32| -> Option<NaiveDate> {
        match ordinal {
            "first" | "1st" => NaiveDate::from_ymd_opt(year, month, 1),
            "second" | "2nd" => NaiveDate::from_ymd_opt(year, month, 8),
            "third" | "3rd" => NaiveDate::from_ymd_opt(year, month, 15),
            "fourth" | "4th" => NaiveDate::from_ymd_opt(year, month, 22),
            _ => last_day_of_month(year, month).map(|d| d - Duration::days(6)),
        }
    };
    let start = start_in(today.year())?;
    if start + Duration::days(6) < today {
        start_in(today.year() + 1)
    } else {
        Some(start.max(today))
    }
}

fn parse_count(word: &str) -> Option<u32> {
    word.parse::<u32>()
        .ok()
        .or_else(|| lookup_word(NUMBER_WORDS, word))
}

// =============================================================================
// Extraction results
// =============================================================================

/// A date found in the text, with its byte span in the normalized text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DateMention {
    date: NaiveDate,
    start: usize,
    end: usize,
    is_return: bool,
}

/// Departure and return dates stated in one utterance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedDates {
    pub departure: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
}

/// Everything stated in one utterance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedSlots {
    pub origin: Option<Location>,
    pub destination: Option<Location>,
    pub dates: ExtractedDates,
    pub passengers: Option<u32>,
    pub currency: Option<String>,
}

impl ExtractedSlots {
    fn is_empty(&self) -> bool {
        self.origin.is_none()
            && self.destination.is_none()
            && self.dates.departure.is_none()
            && self.dates.return_date.is_none()
            && self.passengers.is_none()
            && self.currency.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Origin,
    Destination,
}

// =============================================================================
// SlotResolver
// =============================================================================

/// Rule-based resolver for flight-booking utterances.
pub struct SlotResolver {
    /// Currency used when neither the utterance nor memory names one.
    pub default_currency: String,
}

impl SlotResolver {
    pub fn new(default_currency: impl Into<String>) -> Self {
        Self {
            default_currency: default_currency.into(),
        }
    }

    // -----------------------------------------------------------------
    // Intent
    // -----------------------------------------------------------------

    /// Whether the text contains explicit flight vocabulary.
    pub fn has_flight_keyword(&self, text: &str) -> bool {
        FLIGHT_KEYWORDS_RE.is_match(&normalize(text))
    }

    // -----------------------------------------------------------------
    // Locations
    // -----------------------------------------------------------------

    fn role_of(tokens: &[Token<'_>], mention: &Mention) -> Option<Role> {
        let before = mention
            .start
            .checked_sub(1)
            .map(|i| tokens[i].norm.as_str());
        let after = tokens
            .get(mention.start + mention.len)
            .map(|t| t.norm.as_str());

        if before.is_some_and(|w| ORIGIN_BEFORE.contains(&w))
            || after.is_some_and(|w| ORIGIN_AFTER.contains(&w))
        {
            Some(Role::Origin)
        } else if before.is_some_and(|w| DESTINATION_BEFORE.contains(&w))
            || after.is_some_and(|w| DESTINATION_AFTER.contains(&w))
        {
            Some(Role::Destination)
        } else {
            None
        }
    }

    /// Extract origin and destination.
    ///
    /// "from"/"to" (or Turkish case suffixes) assign roles directly. Unmarked
    /// places fill the remaining roles in order: with nothing marked, the
    /// first is the origin and the second the destination; a lone place is
    /// the destination.
    pub fn extract_locations(&self, text: &str) -> (Option<Location>, Option<Location>) {
        let tokens = tokenize(text);
        let mut mentions = find_mentions(&tokens);
        // "Istanbul (IST)" names one place; separated repeats are two slots.
        mentions.dedup_by(|a, b| a.location == b.location && b.start + b.len == a.start);

        let mut origin: Option<Location> = None;
        let mut destination: Option<Location> = None;
        let mut unmarked: Vec<Location> = Vec::new();

        for mention in &mentions {
            match Self::role_of(&tokens, mention) {
                Some(Role::Origin) if origin.is_none() => origin = Some(mention.location.clone()),
                Some(Role::Destination) if destination.is_none() => {
                    destination = Some(mention.location.clone())
                }
                _ => unmarked.push(mention.location.clone()),
            }
        }

        let mut unmarked = unmarked.into_iter();
        match (origin.is_some(), destination.is_some()) {
            (false, false) => {
                let first = unmarked.next();
                match unmarked.next() {
                    Some(second) => {
                        origin = first;
                        destination = Some(second);
                    }
                    None => destination = first,
                }
            }
            (true, false) => destination = unmarked.next(),
            (false, true) => origin = unmarked.next(),
            (true, true) => {}
        }

        (origin, destination)
    }

    // -----------------------------------------------------------------
    // Dates
    // -----------------------------------------------------------------

    fn find_dates(&self, text: &str, today: NaiveDate) -> Vec<DateMention> {
        let dp = &*DATE_PATTERNS;
        let mut found: Vec<DateMention> = Vec::new();

        // Earlier patterns win over later ones that overlap them.
        let mut push = |start: usize, end: usize, date: Option<NaiveDate>| {
            if let Some(date) = date {
                if !found.iter().any(|m| start < m.end && m.start < end) {
                    found.push(DateMention {
                        date,
                        start,
                        end,
                        is_return: false,
                    });
                }
            }
        };

        for caps in dp.iso.captures_iter(text) {
            let (Some(m), Some(y), Some(mo), Some(d)) =
                (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
            else {
                continue;
            };
            let date = match (y.as_str().parse(), mo.as_str().parse(), d.as_str().parse()) {
                (Ok(y), Ok(mo), Ok(d)) => NaiveDate::from_ymd_opt(y, mo, d),
                _ => None,
            };
            push(m.start(), m.end(), date);
        }

        for caps in dp.dotted.captures_iter(text) {
            let (Some(m), Some(d), Some(mo), Some(y)) =
                (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
            else {
                continue;
            };
            let date = match (y.as_str().parse(), mo.as_str().parse(), d.as_str().parse()) {
                (Ok(y), Ok(mo), Ok(d)) => NaiveDate::from_ymd_opt(y, mo, d),
                _ => None,
            };
            push(m.start(), m.end(), date);
        }

        for caps in dp.week_of_month.captures_iter(text) {
            let (Some(m), Some(ordinal), Some(month)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            let date = lookup_word(MONTHS, month.as_str())
                .and_then(|mo| week_of_month(today, ordinal.as_str(), mo));
            push(m.start(), m.end(), date);
        }

        for caps in dp.day_month.captures_iter(text) {
            let (Some(m), Some(d), Some(month)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                continue;
            };
            let year = caps.get(3).and_then(|y| y.as_str().parse().ok());
            let date = match (d.as_str().parse(), lookup_word(MONTHS, month.as_str())) {
                (Ok(d), Some(mo)) => day_month(today, d, mo, year),
                _ => None,
            };
            push(m.start(), m.end(), date);
        }

        for caps in dp.month_day.captures_iter(text) {
            let (Some(m), Some(month), Some(d)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                continue;
            };
            let year = caps.get(3).and_then(|y| y.as_str().parse().ok());
            let date = match (d.as_str().parse(), lookup_word(MONTHS, month.as_str())) {
                (Ok(d), Some(mo)) => day_month(today, d, mo, year),
                _ => None,
            };
            push(m.start(), m.end(), date);
        }

        for m in dp.day_after_tomorrow.find_iter(text) {
            push(m.start(), m.end(), Some(today + Duration::days(2)));
        }
        for m in dp.tomorrow.find_iter(text) {
            push(m.start(), m.end(), Some(today + Duration::days(1)));
        }
        for m in dp.today.find_iter(text) {
            push(m.start(), m.end(), Some(today));
        }

        for caps in dp.in_n.captures_iter(text) {
            let (Some(m), Some(n), Some(unit)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                continue;
            };
            let days = parse_count(n.as_str()).map(|n| {
                if unit.as_str().starts_with("week") {
                    i64::from(n) * 7
                } else {
                    i64::from(n)
                }
            });
            push(m.start(), m.end(), days.map(|d| today + Duration::days(d)));
        }

        for m in dp.next_week.find_iter(text) {
            push(m.start(), m.end(), Some(next_monday(today)));
        }

        for caps in dp.weekend.captures_iter(text) {
            let Some(m) = caps.get(0) else { continue };
            let date = match caps.get(1).map(|q| q.as_str()) {
                Some("next") => next_monday(today) + Duration::days(5),
                _ => on_or_after(today, Weekday::Sat),
            };
            push(m.start(), m.end(), Some(date));
        }

        for caps in dp.weekday.captures_iter(text) {
            let (Some(m), Some(day)) = (caps.get(0), caps.get(2)) else {
                continue;
            };
            let Some(weekday) = lookup_word(WEEKDAYS, day.as_str()) else {
                continue;
            };
            let date = match caps.get(1).map(|q| q.as_str()) {
                Some("next") => strictly_after(today, weekday),
                _ => on_or_after(today, weekday),
            };
            push(m.start(), m.end(), Some(date));
        }

        for mention in found.iter_mut() {
            let before = text[..mention.start].trim_end();
            let before = before.strip_suffix(" on").unwrap_or(before);
            mention.is_return = before
                .rsplit(|c: char| !c.is_alphanumeric())
                .next()
                .is_some_and(|w| RETURN_MARKERS.contains(&w));
        }

        found.sort_by_key(|m| m.start);
        found
    }

    /// Extract departure and return dates, normalized against `today`.
    ///
    /// The first unmarked date is the departure. The return is the first
    /// date introduced by "return"/"back", or else a second unmarked date.
    pub fn extract_dates(&self, text: &str, today: NaiveDate) -> ExtractedDates {
        let mentions = self.find_dates(&normalize(text), today);
        let mut outbound = mentions.iter().filter(|m| !m.is_return).map(|m| m.date);
        let departure = outbound.next();
        let return_date = mentions
            .iter()
            .find(|m| m.is_return)
            .map(|m| m.date)
            .or_else(|| outbound.next());
        ExtractedDates {
            departure,
            return_date,
        }
    }

    // -----------------------------------------------------------------
    // Passengers and currency
    // -----------------------------------------------------------------

    /// Extract a passenger count such as "2 adults" or "three people".
    pub fn extract_passengers(&self, text: &str) -> Option<u32> {
        let normalized = normalize(text);
        PASSENGERS_RE
            .captures(&normalized)
            .and_then(|caps| caps.get(1))
            .and_then(|n| parse_count(n.as_str()))
    }

    /// Extract a requested currency from an upper-case ISO code, a currency
    /// word, or a symbol.
    pub fn extract_currency(&self, text: &str) -> Option<String> {
        for token in tokenize(text) {
            if CURRENCY_CODES.contains(&token.raw) {
                return Some(token.raw.to_string());
            }
            if let Some(code) = lookup_word(CURRENCY_WORDS, token.norm.as_str()) {
                return Some(code.to_string());
            }
        }
        [('€', "EUR"), ('$', "USD"), ('£', "GBP"), ('₺', "TRY")]
            .iter()
            .find(|(symbol, _)| text.contains(*symbol))
            .map(|(_, code)| code.to_string())
    }

    // -----------------------------------------------------------------
    // Full resolution
    // -----------------------------------------------------------------

    /// Extract every slot stated in `text`.
    pub fn extract(&self, text: &str, today: NaiveDate) -> ExtractedSlots {
        let (origin, destination) = self.extract_locations(text);
        ExtractedSlots {
            origin,
            destination,
            dates: self.extract_dates(text, today),
            passengers: self.extract_passengers(text),
            currency: self.extract_currency(text),
        }
    }

    /// Resolve `text` against `memory`, updating `memory` with every slot the
    /// text states.
    ///
    /// Flight intent needs either flight vocabulary, a place together with a
    /// date, or any slot at all once the conversation already has flight
    /// context ("what about Paris?").
    pub fn resolve(&self, text: &str, memory: &mut SlotMemory, today: NaiveDate) -> Resolution {
        let slots = self.extract(text, today);
        let names_place = slots.origin.is_some() || slots.destination.is_some();

        let is_flight = self.has_flight_keyword(text)
            || (names_place && slots.dates.departure.is_some())
            || (memory.has_flight_context() && !slots.is_empty());
        if !is_flight {
            return Resolution::ChitChat;
        }

        merge(memory, slots);

        let Some(destination) = memory.destination.clone() else {
            return Resolution::Incomplete {
                missing: MissingSlot::Destination,
            };
        };
        let Some(origin) = memory.origin.clone() else {
            return Resolution::Incomplete {
                missing: MissingSlot::Origin,
            };
        };
        let Some(departure_date) = memory.departure_date else {
            return Resolution::Incomplete {
                missing: MissingSlot::DepartureDate,
            };
        };

        Resolution::Flight(FlightQuery {
            origin,
            destination,
            departure_date,
            return_date: memory.return_date,
            passengers: memory.passengers.unwrap_or(1),
            currency: memory
                .currency
                .clone()
                .unwrap_or_else(|| self.default_currency.clone()),
        })
    }
}

/// Overlay newly stated slots on memory. A new departure without a new
/// return starts a fresh one-way trip.
fn merge(memory: &mut SlotMemory, slots: ExtractedSlots) {
    if let Some(origin) = slots.origin {
        memory.origin = Some(origin);
    }
    if let Some(destination) = slots.destination {
        memory.destination = Some(destination);
    }
    if let Some(departure) = slots.dates.departure {
        memory.departure_date = Some(departure);
        memory.return_date = slots.dates.return_date;
    } else if let Some(return_date) = slots.dates.return_date {
        memory.return_date = Some(return_date);
    }
    if let Some(passengers) = slots.passengers {
        memory.passengers = Some(passengers);
    }
    if let Some(currency) = slots.currency {
        memory.currency = Some(currency);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flightchat_core::ValidationError;

    fn resolver() -> SlotResolver {
        SlotResolver::new("EUR")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Monday, 19 October 2026.
    fn today() -> NaiveDate {
        date(2026, 10, 19)
    }

    fn departure(text: &str) -> Option<NaiveDate> {
        resolver().extract_dates(text, today()).departure
    }

    // ---- intent ----

    #[test]
    fn test_flight_keywords() {
        let r = resolver();
        assert!(r.has_flight_keyword("Find me a cheap flight"));
        assert!(r.has_flight_keyword("I want to FLY somewhere"));
        assert!(r.has_flight_keyword("Londra'ya uçak bileti"));
        assert!(!r.has_flight_keyword("What's the weather like?"));
    }

    #[test]
    fn test_greeting_is_chitchat() {
        let mut memory = SlotMemory::default();
        let res = resolver().resolve("hello, how are you?", &mut memory, today());
        assert_eq!(res, Resolution::ChitChat);
        assert_eq!(memory, SlotMemory::default());
    }

    #[test]
    fn test_place_without_context_is_chitchat() {
        let mut memory = SlotMemory::default();
        let res = resolver().resolve("Berlin is lovely", &mut memory, today());
        assert_eq!(res, Resolution::ChitChat);
    }

    #[test]
    fn test_place_and_date_is_flight_intent() {
        let mut memory = SlotMemory::default();
        let res = resolver().resolve("Istanbul to Paris tomorrow", &mut memory, today());
        assert!(matches!(res, Resolution::Flight(_)));
    }

    // ---- locations ----

    #[test]
    fn test_from_to_markers() {
        let (o, d) = resolver().extract_locations("from London to Istanbul");
        assert_eq!(o.unwrap().code, "LON");
        assert_eq!(d.unwrap().code, "IST");

        let (o, d) = resolver().extract_locations("to Istanbul from London");
        assert_eq!(o.unwrap().code, "LON");
        assert_eq!(d.unwrap().code, "IST");
    }

    #[test]
    fn test_unmarked_order() {
        let (o, d) = resolver().extract_locations("Istanbul London flights");
        assert_eq!(o.unwrap().code, "IST");
        assert_eq!(d.unwrap().code, "LON");

        let (o, d) = resolver().extract_locations("flights Berlin");
        assert!(o.is_none());
        assert_eq!(d.unwrap().code, "BER");
    }

    #[test]
    fn test_one_marker_one_unmarked() {
        let (o, d) = resolver().extract_locations("Istanbul to London");
        assert_eq!(o.unwrap().code, "IST");
        assert_eq!(d.unwrap().code, "LON");

        let (o, d) = resolver().extract_locations("from Paris");
        assert_eq!(o.unwrap().code, "PAR");
        assert!(d.is_none());
    }

    #[test]
    fn test_turkish_suffixes() {
        let (o, d) = resolver().extract_locations("Londra'dan İstanbul'a uçak");
        assert_eq!(o.unwrap().code, "LON");
        assert_eq!(d.unwrap().code, "IST");
    }

    #[test]
    fn test_adjacent_repeat_is_one_place() {
        let (o, d) = resolver().extract_locations("Istanbul (IST) to London");
        assert_eq!(o.unwrap().code, "IST");
        assert_eq!(d.unwrap().code, "LON");
    }

    #[test]
    fn test_same_place_twice_fills_both_roles() {
        let (o, d) = resolver().extract_locations("from London to London");
        assert_eq!(o.unwrap().code, "LON");
        assert_eq!(d.unwrap().code, "LON");
    }

    // ---- dates ----

    #[test]
    fn test_relative_days() {
        assert_eq!(departure("flight today"), Some(date(2026, 10, 19)));
        assert_eq!(departure("flight tomorrow"), Some(date(2026, 10, 20)));
        assert_eq!(departure("the day after tomorrow"), Some(date(2026, 10, 21)));
        assert_eq!(departure("in 3 days"), Some(date(2026, 10, 22)));
        assert_eq!(departure("in two weeks"), Some(date(2026, 11, 2)));
    }

    #[test]
    fn test_weekdays() {
        // Today is a Monday.
        assert_eq!(departure("next Friday"), Some(date(2026, 10, 23)));
        assert_eq!(departure("on Friday"), Some(date(2026, 10, 23)));
        assert_eq!(departure("this Monday"), Some(date(2026, 10, 19)));
        assert_eq!(departure("next Monday"), Some(date(2026, 10, 26)));
        assert_eq!(departure("cuma"), Some(date(2026, 10, 23)));
    }

    #[test]
    fn test_next_week_and_weekend() {
        assert_eq!(departure("next week"), Some(date(2026, 10, 26)));
        assert_eq!(departure("this weekend"), Some(date(2026, 10, 24)));
        assert_eq!(departure("next weekend"), Some(date(2026, 10, 31)));
    }

    #[test]
    fn test_explicit_dates() {
        assert_eq!(departure("on 15 November"), Some(date(2026, 11, 15)));
        assert_eq!(departure("November 15th"), Some(date(2026, 11, 15)));
        assert_eq!(departure("15 Kasım"), Some(date(2026, 11, 15)));
        assert_eq!(departure("15.11.2026"), Some(date(2026, 11, 15)));
        assert_eq!(departure("2026-11-15"), Some(date(2026, 11, 15)));
        assert_eq!(departure("15 November 2027"), Some(date(2027, 11, 15)));
    }

    #[test]
    fn test_past_day_month_rolls_to_next_year() {
        assert_eq!(departure("on 3 March"), Some(date(2027, 3, 3)));
        assert_eq!(departure("September 15"), Some(date(2027, 9, 15)));
    }

    #[test]
    fn test_invalid_calendar_date_ignored() {
        assert_eq!(departure("31 November"), None);
    }

    #[test]
    fn test_week_of_month() {
        assert_eq!(departure("first week of December"), Some(date(2026, 12, 1)));
        assert_eq!(departure("last week of December"), Some(date(2026, 12, 25)));
        assert_eq!(departure("first week of October"), Some(date(2027, 10, 1)));
        // The third week of October (15th-21st) is under way.
        assert_eq!(departure("third week of October"), Some(date(2026, 10, 19)));
    }

    #[test]
    fn test_date_range_and_return_marker() {
        let dates = resolver().extract_dates("from 5 November to 12 November", today());
        assert_eq!(dates.departure, Some(date(2026, 11, 5)));
        assert_eq!(dates.return_date, Some(date(2026, 11, 12)));

        let dates =
            resolver().extract_dates("returning on 20 November, leaving 10 November", today());
        assert_eq!(dates.departure, Some(date(2026, 11, 10)));
        assert_eq!(dates.return_date, Some(date(2026, 11, 20)));

        let dates = resolver().extract_dates("next Friday and back Sunday", today());
        assert_eq!(dates.departure, Some(date(2026, 10, 23)));
        assert_eq!(dates.return_date, Some(date(2026, 10, 25)));
    }

    #[test]
    fn test_no_date() {
        assert_eq!(departure("cheap flights to Rome"), None);
    }

    // ---- passengers / currency ----

    #[test]
    fn test_passengers() {
        let r = resolver();
        assert_eq!(r.extract_passengers("for 2 adults"), Some(2));
        assert_eq!(r.extract_passengers("three people"), Some(3));
        assert_eq!(r.extract_passengers("iki kişi"), Some(2));
        assert_eq!(r.extract_passengers("flight to Rome"), None);
    }

    #[test]
    fn test_currency() {
        let r = resolver();
        assert_eq!(r.extract_currency("prices in USD please").as_deref(), Some("USD"));
        assert_eq!(r.extract_currency("in pounds").as_deref(), Some("GBP"));
        assert_eq!(r.extract_currency("under 200€").as_deref(), Some("EUR"));
        assert_eq!(r.extract_currency("I'll try again"), None);
    }

    // ---- resolution and memory ----

    #[test]
    fn test_full_query() {
        let mut memory = SlotMemory::default();
        let res = resolver().resolve(
            "Find me the cheapest flight from Istanbul to London next Friday",
            &mut memory,
            today(),
        );
        let Resolution::Flight(query) = res else {
            panic!("expected a flight query, got {:?}", res);
        };
        assert_eq!(query.origin.code, "IST");
        assert_eq!(query.destination.code, "LON");
        assert_eq!(query.departure_date, date(2026, 10, 23));
        assert_eq!(query.return_date, None);
        assert_eq!(query.passengers, 1);
        assert_eq!(query.currency, "EUR");
        assert_eq!(memory.origin.as_ref().unwrap().city, "Istanbul");
    }

    #[test]
    fn test_follow_up_keeps_origin() {
        let r = resolver();
        let mut memory = SlotMemory::default();
        r.resolve("flight from Istanbul to London next Friday", &mut memory, today());

        let res = r.resolve("Show me cheap flights to Berlin next week", &mut memory, today());
        let Resolution::Flight(query) = res else {
            panic!("expected a flight query, got {:?}", res);
        };
        assert_eq!(query.origin.city, "Istanbul");
        assert_eq!(query.destination.code, "BER");
        assert_eq!(query.departure_date, date(2026, 10, 26));
    }

    #[test]
    fn test_stated_destination_overrides_memory_even_if_same_as_origin() {
        let r = resolver();
        let mut memory = SlotMemory::default();
        r.resolve("flight from Istanbul to Paris tomorrow", &mut memory, today());

        let res = r.resolve("flight from London to London tomorrow", &mut memory, today());
        let Resolution::Flight(query) = res else {
            panic!("expected a flight query, got {:?}", res);
        };
        assert_eq!(query.origin.code, "LON");
        assert_eq!(query.destination.code, "LON");
        assert!(matches!(
            query.validate(today()),
            Err(ValidationError::SameOriginAndDestination(_))
        ));
    }

    #[test]
    fn test_follow_up_without_keyword() {
        let r = resolver();
        let mut memory = SlotMemory::default();
        r.resolve("flight from Istanbul to London next Friday", &mut memory, today());

        let res = r.resolve("what about Paris?", &mut memory, today());
        let Resolution::Flight(query) = res else {
            panic!("expected a flight query, got {:?}", res);
        };
        assert_eq!(query.destination.code, "PAR");
        assert_eq!(query.departure_date, date(2026, 10, 23));
    }

    #[test]
    fn test_incomplete_reports_missing_slot_and_remembers() {
        let r = resolver();
        let mut memory = SlotMemory::default();

        let res = r.resolve("I need a flight", &mut memory, today());
        assert_eq!(
            res,
            Resolution::Incomplete {
                missing: MissingSlot::Destination
            }
        );

        let res = r.resolve("flight to Berlin", &mut memory, today());
        assert_eq!(
            res,
            Resolution::Incomplete {
                missing: MissingSlot::Origin
            }
        );
        assert_eq!(memory.destination.as_ref().unwrap().code, "BER");

        let res = r.resolve("from Ankara", &mut memory, today());
        assert_eq!(
            res,
            Resolution::Incomplete {
                missing: MissingSlot::DepartureDate
            }
        );

        let res = r.resolve("tomorrow", &mut memory, today());
        assert!(matches!(res, Resolution::Flight(_)));
    }

    #[test]
    fn test_new_departure_clears_old_return() {
        let r = resolver();
        let mut memory = SlotMemory::default();
        r.resolve(
            "flight from Istanbul to Rome on 5 November returning 12 November",
            &mut memory,
            today(),
        );
        assert_eq!(memory.return_date, Some(date(2026, 11, 12)));

        r.resolve("make it 20 November", &mut memory, today());
        assert_eq!(memory.departure_date, Some(date(2026, 11, 20)));
        assert_eq!(memory.return_date, None);
    }

    #[test]
    fn test_passengers_and_currency_carry() {
        let r = resolver();
        let mut memory = SlotMemory::default();
        r.resolve(
            "flight for 2 adults from Istanbul to Paris tomorrow in USD",
            &mut memory,
            today(),
        );
        let res = r.resolve("what about Berlin", &mut memory, today());
        let Resolution::Flight(query) = res else {
            panic!("expected a flight query, got {:?}", res);
        };
        assert_eq!(query.passengers, 2);
        assert_eq!(query.currency, "USD");
    }
}
