//! SQLite-backed well registry
//!
//! Scoring is expressed in the query itself: every strategy selects a
//! `CASE WHEN` `match_score` and orders by it. Text comparisons upper-case
//! both sides; LIKE wildcards in user input are escaped.

use super::{CandidateWell, SearchParams, Strategy, WellRegistry};
use async_trait::async_trait;
use mrp_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

/// Name and number as one string, matching [`super::full_name`]
const FULL_NAME: &str = "TRIM(well_name || ' ' || COALESCE(well_number, ''))";

const SELECT_COLUMNS: &str = "api_number, well_name, well_number, operator, sec, twp, rng, \
     meridian, county, well_status, \
     CASE WHEN UPPER(COALESCE(well_status, '')) IN ('AC', 'ACTIVE') THEN 1 ELSE 0 END AS is_active";

/// Registry over the `wells` table
#[derive(Clone)]
pub struct SqliteRegistry {
    db: SqlitePool,
}

impl SqliteRegistry {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

/// Value bound to a `?` placeholder
#[derive(Debug, Clone, PartialEq)]
enum Bind {
    Text(String),
    Int(i64),
}

/// SQL text plus its binds, kept in placeholder order
#[derive(Debug, Default)]
struct StrategyQuery {
    score: String,
    filters: Vec<String>,
    score_binds: Vec<Bind>,
    filter_binds: Vec<Bind>,
}

impl StrategyQuery {
    fn filter(&mut self, clause: &str, binds: impl IntoIterator<Item = Bind>) {
        self.filters.push(clause.to_string());
        self.filter_binds.extend(binds);
    }

    /// `sec = ? AND twp = ? AND rng = ? AND meridian = ?` (section optional)
    fn location(&mut self, params: &SearchParams, with_section: bool) {
        if with_section {
            if let Some(section) = params.section {
                self.filter("sec = ?", [Bind::Int(i64::from(section))]);
            }
        }
        self.filter("twp = ?", [Bind::Text(params.township.clone().unwrap_or_default())]);
        self.filter("rng = ?", [Bind::Text(params.range.clone().unwrap_or_default())]);
        self.filter("meridian = ?", [Bind::Text(params.meridian.code().to_string())]);
    }

    /// `CASE WHEN <cond> THEN <score> ... ELSE <fallback> END`
    fn case(&mut self, arms: Vec<(String, Vec<Bind>, u8)>, fallback: u8) {
        if arms.is_empty() {
            self.score = fallback.to_string();
            return;
        }
        let mut sql = String::from("CASE");
        for (condition, binds, score) in arms {
            sql.push_str(&format!(" WHEN {} THEN {}", condition, score));
            self.score_binds.extend(binds);
        }
        sql.push_str(&format!(" ELSE {} END", fallback));
        self.score = sql;
    }

    fn where_clause(&self) -> String {
        if self.filters.is_empty() {
            "1 = 1".to_string()
        } else {
            self.filters.join(" AND ")
        }
    }

    fn build(self, limit: usize) -> (String, Vec<Bind>) {
        let sql = format!(
            "SELECT {}, {} AS match_score FROM wells WHERE {} \
             ORDER BY match_score DESC, is_active DESC, api_number ASC LIMIT ?",
            SELECT_COLUMNS,
            self.score,
            self.where_clause()
        );
        let mut binds = self.score_binds;
        binds.extend(self.filter_binds);
        binds.push(Bind::Int(limit as i64));
        (sql, binds)
    }

    /// Same filters, no scoring and no limit
    fn build_count(self) -> (String, Vec<Bind>) {
        let sql = format!("SELECT COUNT(*) FROM wells WHERE {}", self.where_clause());
        (sql, self.filter_binds)
    }
}

/// Escape `%`, `_` and the escape character itself for `LIKE ... ESCAPE '\'`
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `UPPER(<expr>) LIKE '%' || UPPER(?) || '%' ESCAPE '\'`
fn like(expr: &str) -> String {
    format!("UPPER({}) LIKE '%' || UPPER(?) || '%' ESCAPE '\\'", expr)
}

fn operator_arm(params: &SearchParams) -> Option<(String, Vec<Bind>)> {
    params.has_operator().then(|| {
        (
            like("COALESCE(operator, '')"),
            vec![Bind::Text(escape_like(&params.operator))],
        )
    })
}

/// SQL and binds for one strategy
fn strategy_sql(strategy: Strategy, params: &SearchParams) -> (String, Vec<Bind>) {
    strategy_query(strategy, params).build(params.limit)
}

/// `COUNT(*)` over every row the strategy matches
fn count_sql(strategy: Strategy, params: &SearchParams) -> (String, Vec<Bind>) {
    strategy_query(strategy, params).build_count()
}

fn strategy_query(strategy: Strategy, params: &SearchParams) -> StrategyQuery {
    let mut q = StrategyQuery::default();
    let operator = operator_arm(params);
    let name_bind = || Bind::Text(escape_like(&params.name));

    match strategy {
        Strategy::LocationName => {
            q.case(operator.into_iter().map(|(c, b)| (c, b, 100)).collect(), 90);
            q.location(params, true);
            q.filter(&like(FULL_NAME), [name_bind()]);
        }
        Strategy::ExactNameStatewide => {
            let mut arms: Vec<_> = operator.into_iter().map(|(c, b)| (c, b, 95)).collect();
            if params.has_township_range() {
                arms.push((
                    "(twp = ? AND rng = ?)".to_string(),
                    vec![
                        Bind::Text(params.township.clone().unwrap_or_default()),
                        Bind::Text(params.range.clone().unwrap_or_default()),
                    ],
                    85,
                ));
            }
            q.case(arms, 80);

            let placeholders = vec!["?"; params.exact_names.len().max(1)].join(", ");
            let mut binds: Vec<Bind> = params
                .exact_names
                .iter()
                .map(|v| Bind::Text(v.to_ascii_uppercase()))
                .collect();
            if binds.is_empty() {
                binds.push(Bind::Text(params.name.to_ascii_uppercase()));
            }
            q.filter(&format!("UPPER({}) IN ({})", FULL_NAME, placeholders), binds);
        }
        Strategy::TownshipRangeName => {
            let section = params.section.map(|s| Bind::Int(i64::from(s)));
            let mut arms = Vec::new();
            if let Some((cond, binds)) = &operator {
                if let Some(section) = &section {
                    let mut both = binds.clone();
                    both.push(section.clone());
                    arms.push((format!("({} AND sec = ?)", cond), both, 90));
                }
                arms.push((cond.clone(), binds.clone(), 85));
            }
            if let Some(section) = section {
                arms.push(("sec = ?".to_string(), vec![section], 80));
            }
            q.case(arms, 70);

            q.location(params, false);
            if params.base_name.is_empty() {
                q.filter(&like(FULL_NAME), [name_bind()]);
            } else {
                q.filter(
                    &format!("({} OR {})", like(FULL_NAME), like(FULL_NAME)),
                    [name_bind(), Bind::Text(escape_like(&params.base_name))],
                );
            }
        }
        Strategy::SectionLocation => {
            q.case(operator.into_iter().map(|(c, b)| (c, b, 75)).collect(), 65);
            q.location(params, true);
        }
        Strategy::NameStatewide => {
            q.case(operator.into_iter().map(|(c, b)| (c, b, 60)).collect(), 50);
            q.filter(&like(FULL_NAME), [name_bind()]);
        }
        Strategy::TownshipRangeOnly => {
            q.case(Vec::new(), 30);
            q.location(params, false);
        }
    }

    q
}

fn row_to_candidate(row: &SqliteRow) -> std::result::Result<CandidateWell, sqlx::Error> {
    let score: i64 = row.try_get("match_score")?;
    Ok(CandidateWell {
        api_number: row.try_get("api_number")?,
        well_name: row.try_get("well_name")?,
        well_number: row.try_get("well_number")?,
        operator: row.try_get("operator")?,
        section: row.try_get("sec")?,
        township: row.try_get("twp")?,
        range: row.try_get("rng")?,
        meridian: row.try_get("meridian")?,
        county: row.try_get("county")?,
        well_status: row.try_get("well_status")?,
        match_score: score.clamp(0, 100) as u8,
    })
}

#[async_trait]
impl WellRegistry for SqliteRegistry {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn search(&self, strategy: Strategy, params: &SearchParams) -> Result<Vec<CandidateWell>> {
        let (sql, binds) = strategy_sql(strategy, params);
        debug!(strategy = %strategy, binds = binds.len(), "Registry query");

        let mut query = sqlx::query(&sql);
        for bind in binds {
            query = match bind {
                Bind::Text(text) => query.bind(text),
                Bind::Int(n) => query.bind(n),
            };
        }

        let rows = query.fetch_all(&self.db).await?;
        let candidates = rows
            .iter()
            .map(row_to_candidate)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(candidates)
    }

    async fn count(&self, strategy: Strategy, params: &SearchParams) -> Result<usize> {
        let (sql, binds) = count_sql(strategy, params);
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for bind in binds {
            query = match bind {
                Bind::Text(text) => query.bind(text),
                Bind::Int(n) => query.bind(n),
            };
        }

        let total = query.fetch_one(&self.db).await?;
        usize::try_from(total)
            .map_err(|_| mrp_common::Error::Registry(format!("COUNT returned {}", total)))
    }
}
