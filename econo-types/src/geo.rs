//! Geography reference data: country groups, name -> ISO3 lookup, and
//! ISO3 -> UN M.49 numeric codes.
//!
//! Kept as plain static tables so the intent post-processor and the trade
//! adapter stay deterministic and offline.

use serde::{Deserialize, Serialize};

/// Closed set of symbolic multi-country aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CountryGroup {
    /// Group of Seven.
    G7,
    /// Group of Twenty (member states only; the EU seat is expanded).
    G20,
    /// Brazil, Russia, India, China, South Africa.
    Brics,
    /// Association of Southeast Asian Nations.
    Asean,
    /// The 27 EU member states.
    Eu27,
    /// The euro-area member states.
    EuroArea,
    /// Denmark, Finland, Iceland, Norway, Sweden.
    Nordic,
    /// OECD member states.
    Oecd,
    /// Latin America (major economies).
    Latam,
    /// Middle East and North Africa (major economies).
    Mena,
}

impl CountryGroup {
    /// Canonical tag string.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::G7 => "G7",
            Self::G20 => "G20",
            Self::Brics => "BRICS",
            Self::Asean => "ASEAN",
            Self::Eu27 => "EU27",
            Self::EuroArea => "EURO_AREA",
            Self::Nordic => "NORDIC",
            Self::Oecd => "OECD",
            Self::Latam => "LATAM",
            Self::Mena => "MENA",
        }
    }

    /// Parse a tag string (case-insensitive, tolerant of spaces/hyphens).
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        let norm = tag.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        Some(match norm.as_str() {
            "G7" => Self::G7,
            "G20" => Self::G20,
            "BRICS" => Self::Brics,
            "ASEAN" => Self::Asean,
            "EU27" | "EU" => Self::Eu27,
            "EURO_AREA" | "EUROZONE" => Self::EuroArea,
            "NORDIC" | "NORDICS" => Self::Nordic,
            "OECD" => Self::Oecd,
            "LATAM" | "LATIN_AMERICA" => Self::Latam,
            "MENA" => Self::Mena,
            _ => return None,
        })
    }

    /// ISO3 membership list.
    #[must_use]
    pub const fn members(self) -> &'static [&'static str] {
        match self {
            Self::G7 => &["CAN", "FRA", "DEU", "ITA", "JPN", "GBR", "USA"],
            Self::G20 => &[
                "ARG", "AUS", "BRA", "CAN", "CHN", "FRA", "DEU", "IND", "IDN", "ITA", "JPN",
                "KOR", "MEX", "RUS", "SAU", "ZAF", "TUR", "GBR", "USA",
            ],
            Self::Brics => &["BRA", "RUS", "IND", "CHN", "ZAF"],
            Self::Asean => &[
                "BRN", "KHM", "IDN", "LAO", "MYS", "MMR", "PHL", "SGP", "THA", "VNM",
            ],
            Self::Eu27 => &[
                "AUT", "BEL", "BGR", "HRV", "CYP", "CZE", "DNK", "EST", "FIN", "FRA", "DEU",
                "GRC", "HUN", "IRL", "ITA", "LVA", "LTU", "LUX", "MLT", "NLD", "POL", "PRT",
                "ROU", "SVK", "SVN", "ESP", "SWE",
            ],
            Self::EuroArea => &[
                "AUT", "BEL", "HRV", "CYP", "EST", "FIN", "FRA", "DEU", "GRC", "IRL", "ITA",
                "LVA", "LTU", "LUX", "MLT", "NLD", "PRT", "SVK", "SVN", "ESP",
            ],
            Self::Nordic => &["DNK", "FIN", "ISL", "NOR", "SWE"],
            Self::Oecd => &[
                "AUS", "AUT", "BEL", "CAN", "CHL", "COL", "CRI", "CZE", "DNK", "EST", "FIN",
                "FRA", "DEU", "GRC", "HUN", "ISL", "IRL", "ISR", "ITA", "JPN", "KOR", "LVA",
                "LTU", "LUX", "MEX", "NLD", "NZL", "NOR", "POL", "PRT", "SVK", "SVN", "ESP",
                "SWE", "CHE", "TUR", "GBR", "USA",
            ],
            Self::Latam => &[
                "ARG", "BOL", "BRA", "CHL", "COL", "CRI", "ECU", "MEX", "PAN", "PER", "PRY",
                "URY", "VEN",
            ],
            Self::Mena => &[
                "DZA", "BHR", "EGY", "IRN", "IRQ", "ISR", "JOR", "KWT", "LBN", "LBY", "MAR",
                "OMN", "QAT", "SAU", "TUN", "ARE", "YEM",
            ],
        }
    }
}

impl std::fmt::Display for CountryGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// `(common name, ISO3, UN M.49 numeric)` for the economies the engine is
/// routinely asked about. Lookups are case-insensitive on the name and also
/// accept the ISO3 itself.
const COUNTRIES: &[(&str, &str, u32)] = &[
    ("argentina", "ARG", 32),
    ("australia", "AUS", 36),
    ("austria", "AUT", 40),
    ("bangladesh", "BGD", 50),
    ("belgium", "BEL", 56),
    ("brazil", "BRA", 76),
    ("bulgaria", "BGR", 100),
    ("canada", "CAN", 124),
    ("chile", "CHL", 152),
    ("china", "CHN", 156),
    ("colombia", "COL", 170),
    ("costa rica", "CRI", 188),
    ("croatia", "HRV", 191),
    ("cyprus", "CYP", 196),
    ("czechia", "CZE", 203),
    ("czech republic", "CZE", 203),
    ("denmark", "DNK", 208),
    ("egypt", "EGY", 818),
    ("estonia", "EST", 233),
    ("finland", "FIN", 246),
    ("france", "FRA", 250),
    ("germany", "DEU", 276),
    ("greece", "GRC", 300),
    ("hungary", "HUN", 348),
    ("iceland", "ISL", 352),
    ("india", "IND", 356),
    ("indonesia", "IDN", 360),
    ("iran", "IRN", 364),
    ("ireland", "IRL", 372),
    ("israel", "ISR", 376),
    ("italy", "ITA", 380),
    ("japan", "JPN", 392),
    ("jordan", "JOR", 400),
    ("kenya", "KEN", 404),
    ("south korea", "KOR", 410),
    ("korea", "KOR", 410),
    ("kuwait", "KWT", 414),
    ("latvia", "LVA", 428),
    ("lithuania", "LTU", 440),
    ("luxembourg", "LUX", 442),
    ("malaysia", "MYS", 458),
    ("malta", "MLT", 470),
    ("mexico", "MEX", 484),
    ("morocco", "MAR", 504),
    ("netherlands", "NLD", 528),
    ("new zealand", "NZL", 554),
    ("nigeria", "NGA", 566),
    ("norway", "NOR", 578),
    ("pakistan", "PAK", 586),
    ("peru", "PER", 604),
    ("philippines", "PHL", 608),
    ("poland", "POL", 616),
    ("portugal", "PRT", 620),
    ("qatar", "QAT", 634),
    ("romania", "ROU", 642),
    ("russia", "RUS", 643),
    ("russian federation", "RUS", 643),
    ("saudi arabia", "SAU", 682),
    ("singapore", "SGP", 702),
    ("slovakia", "SVK", 703),
    ("slovenia", "SVN", 705),
    ("south africa", "ZAF", 710),
    ("spain", "ESP", 724),
    ("sweden", "SWE", 752),
    ("switzerland", "CHE", 756),
    ("thailand", "THA", 764),
    ("turkey", "TUR", 792),
    ("ukraine", "UKR", 804),
    ("united arab emirates", "ARE", 784),
    ("uae", "ARE", 784),
    ("united kingdom", "GBR", 826),
    ("uk", "GBR", 826),
    ("britain", "GBR", 826),
    ("united states", "USA", 840),
    ("united states of america", "USA", 840),
    ("us", "USA", 840),
    ("usa", "USA", 840),
    ("america", "USA", 840),
    ("uruguay", "URY", 858),
    ("venezuela", "VEN", 862),
    ("vietnam", "VNM", 704),
    ("taiwan", "TWN", 158),
    ("hong kong", "HKG", 344),
    ("brunei", "BRN", 96),
    ("cambodia", "KHM", 116),
    ("laos", "LAO", 418),
    ("myanmar", "MMR", 104),
    ("algeria", "DZA", 12),
    ("bahrain", "BHR", 48),
    ("bolivia", "BOL", 68),
    ("ecuador", "ECU", 218),
    ("iraq", "IRQ", 368),
    ("lebanon", "LBN", 422),
    ("libya", "LBY", 434),
    ("oman", "OMN", 512),
    ("panama", "PAN", 591),
    ("paraguay", "PRY", 600),
    ("tunisia", "TUN", 788),
    ("yemen", "YEM", 887),
];

/// Resolve a free-text country name (or an ISO3 code) to its ISO3 code.
#[must_use]
pub fn iso3_for_name(name: &str) -> Option<&'static str> {
    let norm = name.trim().to_lowercase();
    if norm.len() == 3 {
        let upper = norm.to_ascii_uppercase();
        if let Some((_, iso3, _)) = COUNTRIES.iter().find(|(_, c, _)| *c == upper) {
            return Some(iso3);
        }
    }
    COUNTRIES
        .iter()
        .find(|(n, _, _)| *n == norm)
        .map(|(_, iso3, _)| *iso3)
}

/// UN M.49 numeric code for an ISO3 country code.
#[must_use]
pub fn m49_for_iso3(iso3: &str) -> Option<u32> {
    let upper = iso3.trim().to_ascii_uppercase();
    COUNTRIES
        .iter()
        .find(|(_, c, _)| *c == upper)
        .map(|(_, _, m49)| *m49)
}

/// `(ISO3, ISO2)` for providers that key geography by two-letter codes
/// (Eurostat). Covers the European economies plus major partners.
const ISO2: &[(&str, &str)] = &[
    ("AUT", "AT"), ("BEL", "BE"), ("BGR", "BG"), ("HRV", "HR"), ("CYP", "CY"),
    ("CZE", "CZ"), ("DNK", "DK"), ("EST", "EE"), ("FIN", "FI"), ("FRA", "FR"),
    ("DEU", "DE"), ("GRC", "EL"), ("HUN", "HU"), ("IRL", "IE"), ("ITA", "IT"),
    ("LVA", "LV"), ("LTU", "LT"), ("LUX", "LU"), ("MLT", "MT"), ("NLD", "NL"),
    ("POL", "PL"), ("PRT", "PT"), ("ROU", "RO"), ("SVK", "SK"), ("SVN", "SI"),
    ("ESP", "ES"), ("SWE", "SE"), ("ISL", "IS"), ("NOR", "NO"), ("CHE", "CH"),
    ("GBR", "UK"), ("USA", "US"), ("JPN", "JP"), ("TUR", "TR"),
];

/// Two-letter code for an ISO3 country, using the Eurostat convention
/// (`EL` for Greece, `UK` for the United Kingdom).
#[must_use]
pub fn iso2_for_iso3(iso3: &str) -> Option<&'static str> {
    let upper = iso3.trim().to_ascii_uppercase();
    ISO2.iter().find(|(c3, _)| *c3 == upper).map(|(_, c2)| *c2)
}

/// Human display name for an ISO3 code (title-cased table entry).
#[must_use]
pub fn display_name_for_iso3(iso3: &str) -> Option<String> {
    let upper = iso3.trim().to_ascii_uppercase();
    COUNTRIES.iter().find(|(_, c, _)| *c == upper).map(|(n, _, _)| {
        n.split_whitespace()
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(f) => f.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    })
}
