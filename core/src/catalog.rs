use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::collections::{BTreeSet, HashMap};
use time::macros::format_description;
use time::Date;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrewMember {
    pub name: String,
    pub job: String,
}

/// One cleaned row as handed over by the loader. Anything the source could not
/// supply is `None` / empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub title: Option<String>,
    /// ISO `YYYY-MM-DD`, possibly followed by a time part
    pub release_date: Option<String>,
    pub release_year: Option<i32>,
    pub popularity: Option<f64>,
    pub revenue: Option<f64>,
    pub budget: Option<f64>,
    pub vote_count: Option<u64>,
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub cast: Vec<String>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

impl MovieRecord {
    /// revenue / budget when budget > 0, otherwise 0.
    pub fn return_ratio(&self) -> f64 {
        match (self.revenue, self.budget) {
            (Some(r), Some(b)) if b > 0.0 && r.is_finite() => r / b,
            _ => 0.0,
        }
    }

    pub fn directors(&self) -> impl Iterator<Item = &str> {
        self.crew
            .iter()
            .filter(|c| c.job.eq_ignore_ascii_case("director"))
            .map(|c| c.name.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Release {
    pub date: Date,
    pub year: i32,
    /// 1 = January
    pub month: u8,
    /// 0 = Monday
    pub weekday: u8,
}

impl Release {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let day_part = raw.get(..10).unwrap_or(raw);
        let date = Date::parse(day_part, format_description!("[year]-[month]-[day]")).ok()?;
        Some(Self {
            date,
            year: date.year(),
            month: u8::from(date.month()),
            weekday: date.weekday().number_days_from_monday(),
        })
    }
}

/// A record plus the fields derived from it at build time.
#[derive(Debug, Clone)]
pub struct Movie {
    pub record: MovieRecord,
    pub release: Option<Release>,
    pub return_ratio: f64,
}

impl Movie {
    pub fn title(&self) -> &str { self.record.title.as_deref().unwrap_or_default() }

    pub fn release_year(&self) -> Option<i32> {
        self.release.map(|r| r.year).or(self.record.release_year)
    }
}

/// How a person query is matched against cast / director names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// Case-insensitive containment: "hanks" matches "Tom Hanks".
    #[default]
    Substring,
    /// Case-insensitive equality with a full listed name.
    Exact,
}

impl std::str::FromStr for MatchPolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "substring" => Ok(MatchPolicy::Substring),
            "exact" => Ok(MatchPolicy::Exact),
            other => Err(format!("unknown match policy: {other}")),
        }
    }
}

/// Lower-cased distinct names, each with the rows that list it.
#[derive(Debug, Clone, Default)]
struct NameIndex {
    names: Vec<(String, Vec<usize>)>,
    exact: HashMap<String, usize>,
}

impl NameIndex {
    fn insert(&mut self, name: &str, row: usize) {
        let key = name.trim().to_lowercase();
        if key.is_empty() {
            return;
        }
        let slot = match self.exact.get(&key) {
            Some(&slot) => slot,
            None => {
                self.names.push((key.clone(), Vec::new()));
                self.exact.insert(key, self.names.len() - 1);
                self.names.len() - 1
            }
        };
        let rows = &mut self.names[slot].1;
        if rows.last() != Some(&row) {
            rows.push(row);
        }
    }

    fn matching(&self, query: &str, policy: MatchPolicy) -> Vec<usize> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return Vec::new();
        }
        match policy {
            MatchPolicy::Exact => self
                .exact
                .get(&q)
                .map(|&slot| self.names[slot].1.clone())
                .unwrap_or_default(),
            MatchPolicy::Substring => {
                let rows: BTreeSet<usize> = self
                    .names
                    .iter()
                    .filter(|(name, _)| name.contains(&q))
                    .flat_map(|(_, rows)| rows.iter().copied())
                    .collect();
                rows.into_iter().collect()
            }
        }
    }
}

pub fn normalize_title(title: &str) -> String { title.trim().to_lowercase() }

/// Immutable record set with its lookup indices. Built in one pass; never
/// mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    movies: Vec<Movie>,
    titles: HashMap<String, Vec<usize>>,
    by_month: [Vec<usize>; 12],
    by_weekday: [Vec<usize>; 7],
    cast: NameIndex,
    directors: NameIndex,
    checksum: String,
}

impl Catalog {
    pub fn build(records: Vec<MovieRecord>) -> Self {
        let mut catalog = Catalog::default();
        let mut unparseable = 0usize;
        for (row, record) in records.into_iter().enumerate() {
            let release = record.release_date.as_deref().and_then(Release::parse);
            match release {
                Some(r) => {
                    catalog.by_month[(r.month - 1) as usize].push(row);
                    catalog.by_weekday[r.weekday as usize].push(row);
                }
                None => unparseable += 1,
            }
            if let Some(title) = record.title.as_deref() {
                catalog.titles.entry(normalize_title(title)).or_default().push(row);
            }
            for name in &record.cast {
                catalog.cast.insert(name, row);
            }
            for name in record.directors() {
                catalog.directors.insert(name, row);
            }
            let return_ratio = record.return_ratio();
            catalog.movies.push(Movie { record, release, return_ratio });
        }
        catalog.checksum = row_order_checksum(catalog.movies.iter().map(|m| m.record.title.as_deref()));
        tracing::info!(
            records = catalog.movies.len(),
            distinct_titles = catalog.titles.len(),
            unparseable_dates = unparseable,
            "catalog built"
        );
        catalog
    }

    pub fn len(&self) -> usize { self.movies.len() }

    pub fn is_empty(&self) -> bool { self.movies.is_empty() }

    pub fn movies(&self) -> &[Movie] { &self.movies }

    pub fn get(&self, row: usize) -> Option<&Movie> { self.movies.get(row) }

    pub fn records(&self) -> impl Iterator<Item = &MovieRecord> { self.movies.iter().map(|m| &m.record) }

    /// Every row whose title equals `title` case-insensitively, in row order.
    pub fn title_rows(&self, title: &str) -> &[usize] {
        self.titles.get(&normalize_title(title)).map(Vec::as_slice).unwrap_or_default()
    }

    /// First row with this title.
    pub fn find_title(&self, title: &str) -> Option<usize> { self.title_rows(title).first().copied() }

    /// `month` in 1..=12
    pub fn rows_in_month(&self, month: u8) -> &[usize] {
        match month {
            1..=12 => &self.by_month[(month - 1) as usize],
            _ => &[],
        }
    }

    /// `weekday` in 0..=6, Monday first
    pub fn rows_on_weekday(&self, weekday: u8) -> &[usize] {
        self.by_weekday.get(weekday as usize).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn dated_count(&self) -> usize { self.movies.iter().filter(|m| m.release.is_some()).count() }

    pub fn cast_rows(&self, name: &str, policy: MatchPolicy) -> Vec<usize> { self.cast.matching(name, policy) }

    pub fn director_rows(&self, name: &str, policy: MatchPolicy) -> Vec<usize> { self.directors.matching(name, policy) }

    /// Fingerprint of the title column in row order; ties a persisted model
    /// to the catalog it was built from.
    pub fn checksum(&self) -> &str { &self.checksum }
}

pub fn row_order_checksum<'a, I>(titles: I) -> String
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut hasher = Sha1::new();
    let mut rows = 0u64;
    for title in titles {
        match title {
            Some(t) => {
                hasher.update(b"+");
                hasher.update(t.as_bytes());
            }
            None => hasher.update(b"-"),
        }
        hasher.update([0u8]);
        rows += 1;
    }
    hasher.update(rows.to_le_bytes());
    format!("{:x}", hasher.finalize())
}
