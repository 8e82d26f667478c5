use filmquery_core::catalog::{CrewMember, MatchPolicy, MovieRecord};
use filmquery_core::query::{Metric, QueryConfig, QueryService, Snapshot, TitleResolution};
use filmquery_core::{QueryError, TokenizerConfig};

fn rec(title: &str, date: &str) -> MovieRecord {
    MovieRecord {
        title: Some(title.into()),
        release_date: (!date.is_empty()).then(|| date.to_string()),
        ..Default::default()
    }
}

fn service(records: Vec<MovieRecord>) -> QueryService {
    QueryService::new(Snapshot::build(records, TokenizerConfig::default()), QueryConfig::default())
}

fn ten_movies() -> Vec<MovieRecord> {
    vec![
        rec("A", "2000-01-03"),
        rec("B", "2001-01-15"),
        rec("C", "2002-01-31"),
        rec("D", "2000-02-01"),
        rec("E", "2000-03-01"),
        rec("F", "2000-07-04"),
        rec("G", "2000-12-25"),
        rec("H", "unknown"),
        rec("I", ""),
        rec("J", "1999-11-11"),
    ]
}

#[test]
fn counts_january_releases() {
    let svc = service(ten_movies());
    assert_eq!(svc.count_by_month("enero").unwrap().count, 3);
    assert_eq!(svc.count_by_month("JANUARY").unwrap().count, 3);
}

#[test]
fn unknown_month_and_weekday_are_invalid() {
    let svc = service(ten_movies());
    assert!(matches!(svc.count_by_month("smarch"), Err(QueryError::InvalidParameter { .. })));
    assert!(matches!(svc.count_by_weekday("caturday"), Err(QueryError::InvalidParameter { .. })));
}

#[test]
fn month_counts_sum_to_dated_records() {
    let svc = service(ten_movies());
    let months = ["enero", "febrero", "marzo", "abril", "mayo", "junio", "julio", "agosto",
        "septiembre", "octubre", "noviembre", "diciembre"];
    let total: usize = months.iter().map(|m| svc.count_by_month(m).unwrap().count).sum();
    assert_eq!(total, 8);
    assert_eq!(svc.month_histogram().iter().sum::<usize>(), 8);
    assert_eq!(svc.weekday_histogram().iter().sum::<usize>(), 8);
}

#[test]
fn weekday_counts() {
    let svc = service(ten_movies());
    assert_eq!(svc.count_by_weekday("lunes").unwrap().count, 3);
    assert_eq!(svc.count_by_weekday("Tuesday").unwrap().count, 2);
    assert_eq!(svc.count_by_weekday("sábado").unwrap().count, 0);
}

#[test]
fn title_lookup_is_case_insensitive() {
    let mut m = rec("Toy Story", "1995-10-30");
    m.popularity = Some(21.9);
    m.vote_average = Some(7.7);
    let svc = service(vec![m]);
    let hit = svc.title_lookup("toy STORY").unwrap();
    assert_eq!(hit.title, "Toy Story");
    assert_eq!(hit.release_year, Some(1995));
    assert_eq!(hit.score, Some(7.7));
    assert!(matches!(svc.title_lookup("Toy"), Err(QueryError::NotFound { .. })));
}

#[test]
fn release_year_falls_back_to_explicit_column() {
    let mut m = rec("Old", "");
    m.release_year = Some(1931);
    let svc = service(vec![m]);
    assert_eq!(svc.title_lookup("old").unwrap().release_year, Some(1931));
}

#[test]
fn title_votes_threshold() {
    let mut low = rec("Low", "");
    low.vote_count = Some(1500);
    let mut high = rec("High", "");
    high.vote_count = Some(2000);
    high.vote_average = Some(8.1);
    let svc = service(vec![low, high]);
    assert!(matches!(svc.title_votes("low"), Err(QueryError::PolicyNotMet(_))));
    let ok = svc.title_votes("high").unwrap();
    assert_eq!((ok.vote_count, ok.vote_average), (2000, Some(8.1)));
    assert!(matches!(svc.title_votes("missing"), Err(QueryError::NotFound { .. })));
}

fn financed(title: &str, budget: f64, revenue: f64, cast: &[&str], director: &str) -> MovieRecord {
    MovieRecord {
        title: Some(title.into()),
        release_date: Some("2000-01-01".into()),
        budget: Some(budget),
        revenue: Some(revenue),
        cast: cast.iter().map(|c| c.to_string()).collect(),
        crew: vec![CrewMember { name: director.into(), job: "Director".into() }],
        ..Default::default()
    }
}

#[test]
fn actor_stats_sums_returns() {
    let svc = service(vec![
        financed("One", 10.0, 30.0, &["Tom Hanks"], "X"),
        financed("Two", 0.0, 50.0, &["Tom Hanks", "Meg Ryan"], "Y"),
        financed("Three", 20.0, 10.0, &["Meg Ryan"], "X"),
    ]);
    let s = svc.actor_stats("tom hanks").unwrap();
    assert_eq!(s.film_count, 2);
    assert_eq!(s.total_return, 3.0);
    assert_eq!(s.mean_return, s.total_return / s.film_count as f64);
    assert!(matches!(svc.actor_stats("nobody"), Err(QueryError::NotFound { .. })));
}

#[test]
fn exact_policy_is_configurable() {
    let records = vec![financed("One", 10.0, 30.0, &["Tom Hanks"], "Ron Howard")];
    let exact = QueryService::new(
        Snapshot::build(records.clone(), TokenizerConfig::default()),
        QueryConfig { match_policy: MatchPolicy::Exact, ..Default::default() },
    );
    assert!(exact.actor_stats("hanks").is_err());
    assert!(exact.actor_stats("TOM HANKS").is_ok());
    assert!(service(records).actor_stats("hanks").is_ok());
}

#[test]
fn director_stats_lists_films() {
    let svc = service(vec![
        financed("One", 10.0, 30.0, &[], "Ron Howard"),
        financed("Two", 10.0, 5.0, &[], "Someone Else"),
        financed("Three", 4.0, 8.0, &[], "Ron Howard"),
    ]);
    let d = svc.director_stats("howard").unwrap();
    let titles: Vec<_> = d.films.iter().map(|f| f.title.as_str()).collect();
    assert_eq!(titles, vec!["One", "Three"]);
    assert_eq!(d.total_return, 5.0);
    assert_eq!(d.films[0].budget, Some(10.0));
    assert!(matches!(svc.director_stats("kubrick"), Err(QueryError::NotFound { .. })));
}

#[test]
fn recommend_ranks_shared_terms_first() {
    let svc = service(vec![
        rec("The Great War", ""),
        rec("Great Escape", ""),
        rec("Love Story", ""),
        rec("War Stories", ""),
    ]);
    let r = svc.recommend("the great war").unwrap();
    assert_eq!(r.results.len(), 3);
    let pos = |t: &str| r.results.iter().position(|x| x.title == t).unwrap();
    assert!(pos("Great Escape") < pos("Love Story"));
    assert!(pos("War Stories") < pos("Love Story"));
    assert_eq!(r.results[pos("Love Story")].score, 0.0);
    assert!(r.results.iter().all(|x| x.title != "The Great War"));
    assert!(r.results.iter().all(|x| (0.0..=1.0).contains(&x.score)));
}

#[test]
fn recommend_small_corpus_and_missing_title() {
    let svc = service(vec![rec("Solo", ""), rec("Solo", "")]);
    assert!(svc.recommend("solo").unwrap().results.is_empty());
    assert!(matches!(svc.recommend("duo"), Err(QueryError::NotFound { .. })));
}

#[test]
fn duplicate_title_resolution() {
    let mut first = rec("Heat", "1986-03-14");
    first.vote_average = Some(5.0);
    let mut last = rec("Heat", "1995-12-15");
    last.vote_average = Some(8.0);
    let records = vec![first, last];
    assert_eq!(service(records.clone()).title_lookup("heat").unwrap().release_year, Some(1986));
    let svc = QueryService::new(
        Snapshot::build(records, TokenizerConfig::default()),
        QueryConfig { duplicate_titles: TitleResolution::Last, ..Default::default() },
    );
    assert_eq!(svc.title_lookup("heat").unwrap().release_year, Some(1995));
}

#[test]
fn top_by_and_paging() {
    let svc = service(vec![
        financed("One", 10.0, 30.0, &[], "X"),
        financed("Two", 10.0, 90.0, &[], "X"),
        rec("Three", ""),
    ]);
    let top = svc.top_by(Metric::Revenue, 10);
    let titles: Vec<_> = top.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Two", "One"]);
    let page = svc.records(1, 2);
    assert_eq!(page.total, 3);
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].title.as_deref(), Some("Three"));
    assert_eq!(svc.records(0, 0).page_size, 1);
}

#[test]
fn recommend_skips_untitled_rows() {
    let svc = service(vec![rec("Heat", ""), MovieRecord::default(), rec("Alien", "")]);
    let r = svc.recommend("heat").unwrap();
    let titles: Vec<_> = r.results.iter().map(|x| x.title.as_str()).collect();
    assert_eq!(titles, vec!["Alien"]);
}
