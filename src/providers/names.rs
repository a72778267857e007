// Locale name tables
//
// First names are grouped by gender so a drawn gender always selects from its
// own list. Surnames carry their prefix ("van den", "O'") separately, which the
// sort-name rule and the escaper both need to see.

use crate::config::Locale;
use crate::providers::Gender;

/// A surname split into its lowercase prefix and the core name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surname {
    pub prefix: &'static str,
    pub core: &'static str,
}

const fn s(prefix: &'static str, core: &'static str) -> Surname {
    Surname { prefix, core }
}

const DUTCH_FEMALE: &[&str] = &[
    "Anna", "Emma", "Sophie", "Julia", "Lotte", "Sanne", "Anouk", "Femke", "Lisa", "Eva",
    "Marieke", "Ingrid", "Annelies", "Wilhelmina", "Johanna", "Petra", "Ilse", "Noor",
    "Thirza", "IJke", "Christina", "Maaike", "Anne-Marie", "Mirjam", "Esther",
    "Fleur", "Roos", "Saskia", "Yvonne", "Greetje",
];

const DUTCH_MALE: &[&str] = &[
    "Jan", "Pieter", "Kees", "Daan", "Sem", "Lucas", "Bram", "Thijs", "Ruben", "Sander",
    "Willem", "Gerrit", "Hendrik", "Johannes", "Cornelis", "Theo", "Christiaan",
    "Philippus", "IJsbrand", "Jan-Willem", "Maarten", "Joost", "Wouter", "Bas", "Niels",
    "Arjen", "Stijn", "Teun", "Floris", "Dirk",
];

const DUTCH_SURNAMES: &[Surname] = &[
    s("", "Jansen"),
    s("de", "Vries"),
    s("van den", "Berg"),
    s("van", "Dijk"),
    s("", "Bakker"),
    s("", "Janssen"),
    s("", "Visser"),
    s("", "Smit"),
    s("", "Meijer"),
    s("de", "Boer"),
    s("", "Mulder"),
    s("de", "Groot"),
    s("", "Bos"),
    s("", "Vos"),
    s("", "Peters"),
    s("", "Hendriks"),
    s("van", "Leeuwen"),
    s("", "Dekker"),
    s("", "Brouwer"),
    s("de", "Wit"),
    s("", "Dijkstra"),
    s("", "Smits"),
    s("de", "Graaf"),
    s("van der", "Meer"),
    s("van der", "Linden"),
    s("", "Kok"),
    s("", "Jacobs"),
    s("de", "Haan"),
    s("", "Vermeulen"),
    s("van den", "Heuvel"),
    s("van der", "Veen"),
    s("'t", "Hart"),
    s("in 't", "Veld"),
    s("ter", "Horst"),
    s("ten", "Brink"),
];

const ENGLISH_FEMALE: &[&str] = &[
    "Mary", "Patricia", "Jennifer", "Linda", "Elizabeth", "Barbara", "Susan", "Jessica",
    "Sarah", "Karen", "Nancy", "Lisa", "Margaret", "Emily", "Michelle", "Dorothy",
    "Amanda", "Rebecca", "Laura", "Sharon",
];

const ENGLISH_MALE: &[&str] = &[
    "James", "John", "Robert", "Michael", "William", "David", "Richard", "Joseph",
    "Thomas", "Charles", "Christopher", "Daniel", "Matthew", "Anthony", "Mark", "Steven",
    "Paul", "Andrew", "Joshua", "Kenneth",
];

const ENGLISH_SURNAMES: &[Surname] = &[
    s("", "Smith"),
    s("", "Johnson"),
    s("", "Williams"),
    s("", "Brown"),
    s("", "Jones"),
    s("", "Miller"),
    s("", "Davis"),
    s("", "Wilson"),
    s("", "Anderson"),
    s("", "Taylor"),
    s("", "Thomas"),
    s("", "Moore"),
    s("", "Martin"),
    s("", "Jackson"),
    s("", "Thompson"),
    s("", "White"),
    s("O'", "Brien"),
    s("O'", "Connor"),
    s("Mc", "Donald"),
    s("", "Harris"),
];

pub fn first_names(locale: Locale, gender: Gender) -> &'static [&'static str] {
    match (locale, gender) {
        (Locale::Dutch, Gender::Female) => DUTCH_FEMALE,
        (Locale::Dutch, Gender::Male) => DUTCH_MALE,
        (Locale::English, Gender::Female) => ENGLISH_FEMALE,
        (Locale::English, Gender::Male) => ENGLISH_MALE,
    }
}

pub fn surnames(locale: Locale) -> &'static [Surname] {
    match locale {
        Locale::Dutch => DUTCH_SURNAMES,
        Locale::English => ENGLISH_SURNAMES,
    }
}

/// Which gender table a first name belongs to, if any
pub fn gender_of(locale: Locale, first_name: &str) -> Option<Gender> {
    [Gender::Female, Gender::Male]
        .into_iter()
        .find(|g| first_names(locale, *g).contains(&first_name))
}

impl Surname {
    /// Full surname as written after the first name
    pub fn full(&self) -> String {
        match self.prefix {
            "" => self.core.to_string(),
            // "O'" and "Mc" attach directly
            p if p.ends_with('\'') || p == "Mc" => format!("{}{}", p, self.core),
            p => format!("{} {}", p, self.core),
        }
    }

    /// Dutch prefixes are written in lowercase and detach for sorting;
    /// attached prefixes such as "O'" are part of the name itself.
    pub fn is_detachable(&self) -> bool {
        !self.prefix.is_empty() && self.prefix.starts_with(|c: char| c.is_lowercase() || c == '\'')
    }
}
