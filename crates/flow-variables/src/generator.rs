//! Synthetic test data
//!
//! Values are addressed by `<category>.<field>` or `<category>.<method>(args)`,
//! e.g. `person.firstName`, `internet.email`, `number.int(1, 100)`,
//! `lorem.words(3)`. A seeded generator yields the same sequence every run.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rand::{distributions::Alphanumeric, rngs::StdRng, Rng, SeedableRng};
use regex::Regex;

static PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\.([A-Za-z_][A-Za-z0-9_]*)(?:\((.*)\))?$")
        .expect("generator path regex")
});

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Barbara", "Claude", "Edsger", "Frances", "Grace", "Hedy", "John", "Katherine",
    "Linus", "Margaret", "Niklaus", "Radia", "Tim",
];
const LAST_NAMES: &[&str] = &[
    "Lovelace", "Turing", "Liskov", "Shannon", "Dijkstra", "Allen", "Hopper", "Lamarr", "Backus",
    "Johnson", "Torvalds", "Hamilton", "Wirth", "Perlman", "Berners-Lee",
];
const DOMAINS: &[&str] = &["example.com", "example.org", "example.net", "test.dev"];
const STREETS: &[&str] = &[
    "Main Street",
    "Oak Avenue",
    "Maple Road",
    "Harbor Lane",
    "Station Way",
];
const CITIES: &[&str] = &[
    "Springfield",
    "Riverton",
    "Lakeside",
    "Fairview",
    "Greenville",
];
const COUNTRIES: &[&str] = &["Canada", "Germany", "Japan", "Brazil", "Kenya", "Norway"];
const COMPANY_SUFFIXES: &[&str] = &["Labs", "Systems", "Works", "Group", "Industries"];
const WORDS: &[&str] = &[
    "lorem",
    "ipsum",
    "dolor",
    "sit",
    "amet",
    "consectetur",
    "adipiscing",
    "elit",
    "sed",
    "do",
    "eiusmod",
    "tempor",
    "incididunt",
    "labore",
    "magna",
];

/// Seedable synthetic data source
pub struct DataGenerator {
    rng: Mutex<StdRng>,
}

impl DataGenerator {
    /// Entropy-seeded generator
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible generator
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Random lowercase alphanumeric token
    pub fn token(&self, len: usize) -> String {
        let mut rng = self.rng.lock();
        (0..len)
            .map(|_| char::from(rng.sample(Alphanumeric)).to_ascii_lowercase())
            .collect()
    }

    /// Random integer in `[min, max]`
    pub fn int(&self, min: i64, max: i64) -> i64 {
        let (low, high) = if min <= max { (min, max) } else { (max, min) };
        self.rng.lock().gen_range(low..=high)
    }

    /// UUID built from generator bytes
    pub fn uuid(&self) -> uuid::Uuid {
        let bytes: [u8; 16] = self.rng.lock().gen();
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }

    fn pick(&self, values: &[&str]) -> String {
        let index = self.rng.lock().gen_range(0..values.len());
        values[index].to_string()
    }

    fn digits(&self, len: usize) -> String {
        let mut rng = self.rng.lock();
        (0..len)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }

    fn letters(&self, len: usize) -> String {
        let mut rng = self.rng.lock();
        (0..len)
            .map(|_| char::from(b'a' + rng.gen_range(0..26u8)))
            .collect()
    }

    fn words(&self, count: usize) -> String {
        (0..count)
            .map(|_| self.pick(WORDS))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn sentence(&self) -> String {
        let count = self.int(5, 10) as usize;
        let mut sentence = self.words(count);
        if let Some(first) = sentence.get(0..1) {
            let upper = first.to_uppercase();
            sentence.replace_range(0..1, &upper);
        }
        sentence.push('.');
        sentence
    }

    /// Produce a value for `path` (the part after `generator.`), or `None`
    /// when the category, field or arguments are not recognised
    pub fn generate(&self, path: &str) -> Option<String> {
        let captures = PATH_PATTERN.captures(path.trim())?;
        let category = captures.get(1)?.as_str();
        let field = captures.get(2)?.as_str();
        let args = parse_args(captures.get(3).map(|m| m.as_str()));

        let value = match (category, field) {
            ("person", "firstName") => self.pick(FIRST_NAMES),
            ("person", "lastName") => self.pick(LAST_NAMES),
            ("person", "fullName") => {
                format!("{} {}", self.pick(FIRST_NAMES), self.pick(LAST_NAMES))
            }
            ("internet", "username") => format!(
                "{}{}",
                self.pick(FIRST_NAMES).to_lowercase(),
                self.digits(3)
            ),
            ("internet", "email") => format!(
                "{}.{}{}@{}",
                self.pick(FIRST_NAMES).to_lowercase(),
                self.pick(LAST_NAMES).to_lowercase().replace('-', ""),
                self.digits(2),
                self.pick(DOMAINS)
            ),
            ("internet", "domain") => self.pick(DOMAINS),
            ("internet", "url") => format!("https://{}/{}", self.pick(DOMAINS), self.token(6)),
            ("internet", "password") => {
                let len = arg_usize(&args, 0).unwrap_or(12).max(4);
                format!("{}A1!", self.token(len - 3))
            }
            ("phone", "number") => {
                format!("555-{}-{}", self.digits(3), self.digits(4))
            }
            ("address", "street") => format!("{} {}", self.int(1, 9999), self.pick(STREETS)),
            ("address", "city") => self.pick(CITIES),
            ("address", "zipCode") => self.digits(5),
            ("address", "country") => self.pick(COUNTRIES),
            ("company", "name") => format!(
                "{} {}",
                self.pick(LAST_NAMES),
                self.pick(COMPANY_SUFFIXES)
            ),
            ("lorem", "word") => self.pick(WORDS),
            ("lorem", "words") => self.words(arg_usize(&args, 0).unwrap_or(3)),
            ("lorem", "sentence") => self.sentence(),
            ("lorem", "paragraph") => {
                let count = arg_usize(&args, 0).unwrap_or(3);
                (0..count)
                    .map(|_| self.sentence())
                    .collect::<Vec<_>>()
                    .join(" ")
            }
            ("number", "int") => {
                let min = arg_i64(&args, 0).unwrap_or(0);
                let max = arg_i64(&args, 1).unwrap_or(1000);
                self.int(min, max).to_string()
            }
            ("string", "alpha") => self.letters(arg_usize(&args, 0).unwrap_or(8)),
            ("string", "numeric") => self.digits(arg_usize(&args, 0).unwrap_or(8)),
            ("string", "alphanumeric") => self.token(arg_usize(&args, 0).unwrap_or(8)),
            ("string", "uuid") => self.uuid().to_string(),
            ("datatype", "boolean") => self.rng.lock().gen_bool(0.5).to_string(),
            ("date", "past") => {
                let days = arg_i64(&args, 0).unwrap_or(365).max(1);
                let offset = self.int(1, days);
                (chrono::Utc::now() - chrono::Duration::days(offset))
                    .format("%Y-%m-%d")
                    .to_string()
            }
            ("date", "future") => {
                let days = arg_i64(&args, 0).unwrap_or(365).max(1);
                let offset = self.int(1, days);
                (chrono::Utc::now() + chrono::Duration::days(offset))
                    .format("%Y-%m-%d")
                    .to_string()
            }
            _ => return None,
        };
        Some(value)
    }
}

impl Default for DataGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_args(raw: Option<&str>) -> Vec<String> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => raw
            .split(',')
            .map(|arg| arg.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
            .collect(),
        _ => Vec::new(),
    }
}

fn arg_usize(args: &[String], index: usize) -> Option<usize> {
    args.get(index).and_then(|arg| arg.parse().ok())
}

fn arg_i64(args: &[String], index: usize) -> Option<i64> {
    args.get(index).and_then(|arg| arg.parse().ok())
}
