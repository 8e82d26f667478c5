use crate::catalog::{Catalog, MatchPolicy, MovieRecord};
use crate::error::{LoadError, QueryError, Result};
use crate::model::TfIdfModel;
use crate::similarity::CancelToken;
use crate::tokenizer::TokenizerConfig;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const MONTHS: &[(&str, u8)] = &[
    ("enero", 1), ("febrero", 2), ("marzo", 3), ("abril", 4), ("mayo", 5), ("junio", 6),
    ("julio", 7), ("agosto", 8), ("septiembre", 9), ("setiembre", 9), ("octubre", 10),
    ("noviembre", 11), ("diciembre", 12),
    ("january", 1), ("february", 2), ("march", 3), ("april", 4), ("may", 5), ("june", 6),
    ("july", 7), ("august", 8), ("september", 9), ("october", 10), ("november", 11), ("december", 12),
];

const WEEKDAYS: &[(&str, u8)] = &[
    ("lunes", 0), ("martes", 1), ("miércoles", 2), ("miercoles", 2), ("jueves", 3),
    ("viernes", 4), ("sábado", 5), ("sabado", 5), ("domingo", 6),
    ("monday", 0), ("tuesday", 1), ("wednesday", 2), ("thursday", 3),
    ("friday", 4), ("saturday", 5), ("sunday", 6),
];

pub fn month_number(name: &str) -> Option<u8> {
    let key = name.trim().to_lowercase();
    MONTHS.iter().find(|(n, _)| *n == key).map(|(_, m)| *m)
}

pub fn weekday_number(name: &str) -> Option<u8> {
    let key = name.trim().to_lowercase();
    WEEKDAYS.iter().find(|(n, _)| *n == key).map(|(_, d)| *d)
}

/// Which row a repeated title resolves to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleResolution {
    #[default]
    First,
    Last,
}

impl std::str::FromStr for TitleResolution {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(TitleResolution::First),
            "last" => Ok(TitleResolution::Last),
            other => Err(format!("unknown title resolution: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    pub match_policy: MatchPolicy,
    pub duplicate_titles: TitleResolution,
    pub vote_threshold: u64,
    pub recommend_k: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            match_policy: MatchPolicy::Substring,
            duplicate_titles: TitleResolution::First,
            vote_threshold: 2000,
            recommend_k: 5,
        }
    }
}

/// A catalog and the model built from its title column. Always published and
/// retired as a unit.
#[derive(Debug)]
pub struct Snapshot {
    pub catalog: Catalog,
    pub model: TfIdfModel,
}

impl Snapshot {
    pub fn build(records: Vec<MovieRecord>, tokenizer: TokenizerConfig) -> Self {
        let catalog = Catalog::build(records);
        let model = TfIdfModel::build(catalog.records().map(|r| r.title.as_deref()), tokenizer);
        Self { catalog, model }
    }

    pub fn from_parts(catalog: Catalog, model: TfIdfModel) -> std::result::Result<Self, LoadError> {
        if catalog.len() != model.num_docs() {
            return Err(LoadError::Shape { vectors: model.num_docs(), records: catalog.len() });
        }
        Ok(Self { catalog, model })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthCount {
    pub month: String,
    pub month_number: u8,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayCount {
    pub weekday: String,
    pub weekday_number: u8,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleScore {
    pub title: String,
    pub release_year: Option<i32>,
    pub popularity: Option<f64>,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleVotes {
    pub title: String,
    pub vote_count: u64,
    pub vote_average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActorStats {
    pub actor: String,
    pub film_count: usize,
    pub total_return: f64,
    pub mean_return: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectorFilm {
    pub title: String,
    pub release_date: Option<String>,
    #[serde(rename = "return")]
    pub return_ratio: f64,
    pub budget: Option<f64>,
    pub revenue: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectorStats {
    pub director: String,
    pub films: Vec<DirectorFilm>,
    pub total_return: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub title: String,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendations {
    pub title: String,
    pub results: Vec<Recommendation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordPage {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub records: Vec<MovieRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Revenue,
    Popularity,
    VoteAverage,
    Return,
}

impl std::str::FromStr for Metric {
    type Err = QueryError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "revenue" => Ok(Metric::Revenue),
            "popularity" => Ok(Metric::Popularity),
            "vote_average" | "score" => Ok(Metric::VoteAverage),
            "return" => Ok(Metric::Return),
            other => Err(QueryError::InvalidParameter { param: "metric", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedTitle {
    pub title: String,
    pub value: f64,
}

pub const MAX_PAGE_SIZE: usize = 1000;

/// Answers read queries against the current snapshot.
///
/// Each call grabs the snapshot `Arc` once and works on it without holding the
/// lock, so a concurrent [`QueryService::reload`] never exposes half of one
/// snapshot and half of another.
pub struct QueryService {
    current: RwLock<Arc<Snapshot>>,
    config: QueryConfig,
}

impl QueryService {
    pub fn new(snapshot: Snapshot, config: QueryConfig) -> Self {
        Self { current: RwLock::new(Arc::new(snapshot)), config }
    }

    pub fn config(&self) -> &QueryConfig { &self.config }

    pub fn snapshot(&self) -> Arc<Snapshot> { self.current.read().clone() }

    /// Publish a fully built replacement; returns the retired snapshot.
    pub fn reload(&self, next: Snapshot) -> Arc<Snapshot> {
        let next = Arc::new(next);
        let records = next.catalog.len();
        let prev = std::mem::replace(&mut *self.current.write(), next);
        tracing::info!(records, "snapshot swapped");
        prev
    }

    fn resolve_title(&self, snap: &Snapshot, title: &str) -> Result<usize> {
        let rows = snap.catalog.title_rows(title);
        let row = match self.config.duplicate_titles {
            TitleResolution::First => rows.first(),
            TitleResolution::Last => rows.last(),
        };
        row.copied().ok_or_else(|| QueryError::NotFound { what: "title", key: title.to_string() })
    }

    pub fn count_by_month(&self, month: &str) -> Result<MonthCount> {
        let n = month_number(month)
            .ok_or_else(|| QueryError::InvalidParameter { param: "month", value: month.to_string() })?;
        let count = self.snapshot().catalog.rows_in_month(n).len();
        Ok(MonthCount { month: month.to_string(), month_number: n, count })
    }

    pub fn count_by_weekday(&self, weekday: &str) -> Result<WeekdayCount> {
        let n = weekday_number(weekday)
            .ok_or_else(|| QueryError::InvalidParameter { param: "weekday", value: weekday.to_string() })?;
        let count = self.snapshot().catalog.rows_on_weekday(n).len();
        Ok(WeekdayCount { weekday: weekday.to_string(), weekday_number: n, count })
    }

    /// Counts for months 1..=12.
    pub fn month_histogram(&self) -> [usize; 12] {
        let snap = self.snapshot();
        std::array::from_fn(|i| snap.catalog.rows_in_month(i as u8 + 1).len())
    }

    /// Counts for Monday..=Sunday.
    pub fn weekday_histogram(&self) -> [usize; 7] {
        let snap = self.snapshot();
        std::array::from_fn(|i| snap.catalog.rows_on_weekday(i as u8).len())
    }

    pub fn title_lookup(&self, title: &str) -> Result<TitleScore> {
        let snap = self.snapshot();
        let movie = &snap.catalog.movies()[self.resolve_title(&snap, title)?];
        Ok(TitleScore {
            title: movie.title().to_string(),
            release_year: movie.release_year(),
            popularity: movie.record.popularity,
            score: movie.record.vote_average,
        })
    }

    pub fn title_votes(&self, title: &str) -> Result<TitleVotes> {
        let snap = self.snapshot();
        let movie = &snap.catalog.movies()[self.resolve_title(&snap, title)?];
        let vote_count = movie.record.vote_count.unwrap_or(0);
        if vote_count < self.config.vote_threshold {
            return Err(QueryError::PolicyNotMet(format!(
                "{} has {} votes, at least {} required",
                movie.title(),
                vote_count,
                self.config.vote_threshold
            )));
        }
        Ok(TitleVotes {
            title: movie.title().to_string(),
            vote_count,
            vote_average: movie.record.vote_average,
        })
    }

    pub fn actor_stats(&self, actor: &str) -> Result<ActorStats> {
        let snap = self.snapshot();
        let rows = snap.catalog.cast_rows(actor, self.config.match_policy);
        if rows.is_empty() {
            return Err(QueryError::NotFound { what: "actor", key: actor.to_string() });
        }
        let total_return: f64 = rows.iter().map(|&r| snap.catalog.movies()[r].return_ratio).sum();
        let film_count = rows.len();
        Ok(ActorStats {
            actor: actor.to_string(),
            film_count,
            total_return,
            mean_return: total_return / film_count as f64,
        })
    }

    pub fn director_stats(&self, director: &str) -> Result<DirectorStats> {
        let snap = self.snapshot();
        let rows = snap.catalog.director_rows(director, self.config.match_policy);
        if rows.is_empty() {
            return Err(QueryError::NotFound { what: "director", key: director.to_string() });
        }
        let films: Vec<DirectorFilm> = rows
            .iter()
            .map(|&r| {
                let m = &snap.catalog.movies()[r];
                DirectorFilm {
                    title: m.title().to_string(),
                    release_date: m.record.release_date.clone(),
                    return_ratio: m.return_ratio,
                    budget: m.record.budget,
                    revenue: m.record.revenue,
                }
            })
            .collect();
        let total_return = films.iter().map(|f| f.return_ratio).sum();
        Ok(DirectorStats { director: director.to_string(), films, total_return })
    }

    pub fn recommend(&self, title: &str) -> Result<Recommendations> {
        self.recommend_with_cancel(title, None)
    }

    pub fn recommend_with_cancel(&self, title: &str, cancel: Option<&CancelToken>) -> Result<Recommendations> {
        let snap = self.snapshot();
        let row = self.resolve_title(&snap, title)?;
        let hits = snap.model.index.top_k(row, self.config.recommend_k, cancel)?;
        tracing::debug!(title, row, hits = hits.len(), "recommend");
        let results = hits
            .into_iter()
            .map(|n| Recommendation {
                title: snap.catalog.movies()[n.doc_id as usize].title().to_string(),
                score: n.score,
            })
            .collect();
        Ok(Recommendations { title: snap.catalog.movies()[row].title().to_string(), results })
    }

    /// One page of the raw record sequence, `page` counting from 0.
    pub fn records(&self, page: usize, page_size: usize) -> RecordPage {
        let snap = self.snapshot();
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let records = snap
            .catalog
            .records()
            .skip(page.saturating_mul(page_size))
            .take(page_size)
            .cloned()
            .collect();
        RecordPage { page, page_size, total: snap.catalog.len(), records }
    }

    /// Highest `n` titles by `metric`; rows lacking the metric are skipped and
    /// ties keep row order.
    pub fn top_by(&self, metric: Metric, n: usize) -> Vec<RankedTitle> {
        let snap = self.snapshot();
        let mut ranked: Vec<RankedTitle> = snap
            .catalog
            .movies()
            .iter()
            .filter_map(|m| {
                let value = match metric {
                    Metric::Revenue => m.record.revenue,
                    Metric::Popularity => m.record.popularity,
                    Metric::VoteAverage => m.record.vote_average,
                    Metric::Return => Some(m.return_ratio),
                }?;
                value.is_finite().then(|| RankedTitle { title: m.title().to_string(), value })
            })
            .collect();
        ranked.sort_by(|a, b| b.value.total_cmp(&a.value));
        ranked.truncate(n);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_tables() {
        assert_eq!(month_number("Enero"), Some(1));
        assert_eq!(month_number("december"), Some(12));
        assert_eq!(month_number("brumaire"), None);
        assert_eq!(weekday_number("Miércoles"), Some(2));
        assert_eq!(weekday_number("sabado"), Some(5));
        assert_eq!(weekday_number("sunday"), Some(6));
    }

    #[test]
    fn reload_swaps_whole_snapshot() {
        let rec = |t: &str| MovieRecord { title: Some(t.into()), ..Default::default() };
        let svc = QueryService::new(
            Snapshot::build(vec![rec("Alpha")], TokenizerConfig::default()),
            QueryConfig::default(),
        );
        let held = svc.snapshot();
        svc.reload(Snapshot::build(vec![rec("Beta"), rec("Gamma")], TokenizerConfig::default()));
        assert_eq!(held.catalog.len(), 1);
        assert_eq!(svc.snapshot().catalog.len(), 2);
        assert!(svc.title_lookup("alpha").is_err());
        assert!(svc.title_lookup("beta").is_ok());
    }
}
