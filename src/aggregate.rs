//! Group-by-and-rank summaries over the (date-filtered) order lines.
//!
//! Every function is pure: it reads the frame, returns a small summary table and
//! never mutates its input. A missing column fails with `MissingColumn`; an empty
//! input yields an empty table. Null grouping keys are dropped before grouping.
//! Ties are always broken on an explicit secondary key so results do not depend
//! on input order.

use polars::prelude::*;

use crate::columns::*;
use crate::error::{require_columns, DashboardResult};

/// Default number of products ranked by [`top_products`].
pub const DEFAULT_TOP_N: usize = 10;

/// Default number of bins for [`review_score_distribution`].
pub const DEFAULT_HISTOGRAM_BINS: usize = 5;

fn without_null_keys(mut lf: LazyFrame, keys: &[&str]) -> LazyFrame {
    for key in keys {
        lf = lf.filter(col(*key).is_not_null());
    }
    lf
}

/// Count of non-null order-item ids per group, as `total_sales`.
fn sales_count() -> Expr {
    col(ORDER_ITEM_ID)
        .count()
        .cast(DataType::Int64)
        .alias(TOTAL_SALES)
}

fn sorted(lf: LazyFrame, by: &[&str], descending: &[bool]) -> LazyFrame {
    let options = SortMultipleOptions {
        descending: descending.to_vec(),
        maintain_order: true,
        ..Default::default()
    };
    lf.sort_by_exprs(by.iter().map(|name| col(*name)).collect::<Vec<_>>(), options)
}

/// The `n` products with the most order-item rows.
///
/// Columns: `product_id`, `product_category_name` (when present in the input),
/// `total_sales`. Sorted by `total_sales` descending, then `product_id` ascending.
pub fn top_products(df: &DataFrame, n: usize) -> DashboardResult<DataFrame> {
    require_columns(df, &[PRODUCT_ID, ORDER_ITEM_ID])?;

    let mut aggs = vec![sales_count()];
    if df.get_column_index(PRODUCT_CATEGORY).is_some() {
        aggs.push(col(PRODUCT_CATEGORY).first());
    }

    let lf = without_null_keys(df.clone().lazy(), &[PRODUCT_ID])
        .group_by([col(PRODUCT_ID)])
        .agg(aggs);
    // n beyond the index range keeps every product
    let limit = IdxSize::try_from(n).unwrap_or(IdxSize::MAX);
    let lf = sorted(lf, &[TOTAL_SALES, PRODUCT_ID], &[true, false]).limit(limit);

    let mut select = vec![col(PRODUCT_ID)];
    if df.get_column_index(PRODUCT_CATEGORY).is_some() {
        select.push(col(PRODUCT_CATEGORY));
    }
    select.push(col(TOTAL_SALES));
    Ok(lf.select(select).collect()?)
}

/// Product ids of [`top_products`], in rank order.
pub fn top_product_ids(df: &DataFrame, n: usize) -> DashboardResult<Vec<String>> {
    let top = top_products(df, n)?;
    string_values(&top, PRODUCT_ID)
}

/// Monthly sales of the top-`n` products: one row per (month, product) present.
///
/// Columns: `purchase_month`, `product_id`, `total_sales`. Sorted by month, then
/// `total_sales` descending, then `product_id`.
pub fn monthly_sales_top_products(df: &DataFrame, n: usize) -> DashboardResult<DataFrame> {
    require_columns(df, &[PRODUCT_ID, ORDER_ITEM_ID, PURCHASE_MONTH])?;

    let top = top_products(df, n)?.select([PRODUCT_ID])?;
    let lf = df.clone().lazy().join(
        top.lazy(),
        [col(PRODUCT_ID)],
        [col(PRODUCT_ID)],
        JoinArgs::new(JoinType::Inner),
    );
    let lf = without_null_keys(lf, &[PURCHASE_MONTH, PRODUCT_ID])
        .group_by([col(PURCHASE_MONTH), col(PRODUCT_ID)])
        .agg([sales_count()]);
    Ok(sorted(
        lf,
        &[PURCHASE_MONTH, TOTAL_SALES, PRODUCT_ID],
        &[false, true, false],
    )
    .collect()?)
}

/// For each seller state, the (month, category) combination with the most rows.
///
/// Columns: `seller_state`, `purchase_month`, `product_category_name`,
/// `order_count`. Ties within a state go to the earliest month, then the
/// alphabetically first category. Rows are ordered by `order_count` descending,
/// then state.
pub fn best_selling_state(df: &DataFrame) -> DashboardResult<DataFrame> {
    let keys = [SELLER_STATE, PURCHASE_MONTH, PRODUCT_CATEGORY];
    require_columns(df, &keys)?;

    let counts = without_null_keys(df.clone().lazy(), &keys)
        .group_by(keys.iter().map(|key| col(*key)).collect::<Vec<_>>())
        .agg([len().cast(DataType::Int64).alias(ORDER_COUNT)]);
    let ranked = sorted(
        counts,
        &[SELLER_STATE, ORDER_COUNT, PURCHASE_MONTH, PRODUCT_CATEGORY],
        &[false, true, false, false],
    );
    let best = ranked.group_by_stable([col(SELLER_STATE)]).agg([
        col(PURCHASE_MONTH).first(),
        col(PRODUCT_CATEGORY).first(),
        col(ORDER_COUNT).first(),
    ]);
    Ok(sorted(best, &[ORDER_COUNT, SELLER_STATE], &[true, false]).collect()?)
}

/// Equal-width bin edges over `[min, max]`; a degenerate range is widened by 0.5 each side.
pub fn histogram_edges(min: f64, max: f64, bins: usize) -> Vec<f64> {
    let (lo, hi) = if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    };
    let width = (hi - lo) / bins as f64;
    (0..=bins)
        .map(|i| if i == bins { hi } else { lo + width * i as f64 })
        .collect()
}

/// Bin index of `value` for `edges`; the last bin is closed on the right.
fn bin_index(value: f64, edges: &[f64]) -> Option<usize> {
    let bins = edges.len().checked_sub(1)?;
    let (lo, hi) = (edges[0], edges[bins]);
    if bins == 0 || value < lo || value > hi {
        return None;
    }
    let idx = ((value - lo) / (hi - lo) * bins as f64).floor() as usize;
    let mut idx = idx.min(bins - 1);
    // Correct for float rounding at interior edges
    if value < edges[idx] && idx > 0 {
        idx -= 1;
    } else if idx + 1 < bins && value >= edges[idx + 1] {
        idx += 1;
    }
    Some(idx)
}

/// Histogram of `review_score` in `bins` equal-width bins over the observed range.
///
/// Columns: `bin_start`, `bin_end`, `frequency`; bins ascending, empty bins kept.
/// An input without scores yields an empty table.
pub fn review_score_distribution(df: &DataFrame, bins: usize) -> DashboardResult<DataFrame> {
    require_columns(df, &[REVIEW_SCORE])?;

    let scores = df.column(REVIEW_SCORE)?.cast(&DataType::Float64)?;
    let values: Vec<f64> = scores
        .f64()?
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .collect();

    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let edges = if values.is_empty() || bins == 0 {
        Vec::new()
    } else {
        histogram_edges(min, max, bins)
    };

    let mut frequency = vec![0i64; edges.len().saturating_sub(1)];
    for v in &values {
        if let Some(idx) = bin_index(*v, &edges) {
            frequency[idx] += 1;
        }
    }

    let starts: Vec<f64> = edges.iter().take(frequency.len()).copied().collect();
    let ends: Vec<f64> = edges.iter().skip(1).copied().collect();
    Ok(df!(
        BIN_START => starts,
        BIN_END => ends,
        FREQUENCY => frequency
    )?)
}

fn monthly_sales_where(df: &DataFrame, key: &str, value: &str) -> DashboardResult<LazyFrame> {
    require_columns(df, &[key, PURCHASE_MONTH, ORDER_ITEM_ID])?;
    let lf = df.clone().lazy().filter(col(key).eq(lit(value)));
    Ok(without_null_keys(lf, &[PURCHASE_MONTH])
        .group_by([col(PURCHASE_MONTH)])
        .agg([sales_count()]))
}

/// Monthly sales for one seller state.
///
/// Columns: `purchase_month`, `total_sales`. Sorted by `total_sales` descending
/// (then month), so a chart of it is not in calendar order.
pub fn monthly_sales_for_state(df: &DataFrame, state: &str) -> DashboardResult<DataFrame> {
    let lf = monthly_sales_where(df, SELLER_STATE, state)?;
    Ok(sorted(lf, &[TOTAL_SALES, PURCHASE_MONTH], &[true, false]).collect()?)
}

/// Sales per seller state. Columns: `seller_state`, `total_sales`, largest first.
pub fn total_sales_per_state(df: &DataFrame) -> DashboardResult<DataFrame> {
    require_columns(df, &[SELLER_STATE, ORDER_ITEM_ID])?;
    let lf = without_null_keys(df.clone().lazy(), &[SELLER_STATE])
        .group_by([col(SELLER_STATE)])
        .agg([sales_count()]);
    Ok(sorted(lf, &[TOTAL_SALES, SELLER_STATE], &[true, false]).collect()?)
}

/// Monthly sales of one product in calendar order.
///
/// Columns: `purchase_month`, `total_sales`; only months with sales appear.
pub fn sales_trend_for_product(df: &DataFrame, product_id: &str) -> DashboardResult<DataFrame> {
    let lf = monthly_sales_where(df, PRODUCT_ID, product_id)?;
    Ok(sorted(lf, &[PURCHASE_MONTH], &[false]).collect()?)
}

/// Distinct non-null values of a string column in first-appearance order.
pub fn distinct_in_order(df: &DataFrame, column: &str) -> DashboardResult<Vec<String>> {
    require_columns(df, &[column])?;
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    let values = df.column(column)?.cast(&DataType::String)?;
    for value in values.str()?.into_iter().flatten() {
        if seen.insert(value) {
            out.push(value.to_string());
        }
    }
    Ok(out)
}

fn string_values(df: &DataFrame, column: &str) -> DashboardResult<Vec<String>> {
    Ok(df
        .column(column)?
        .str()?
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(df: &DataFrame, name: &str) -> Vec<String> {
        string_values(df, name).unwrap()
    }

    fn ints(df: &DataFrame, name: &str) -> Vec<i64> {
        df.column(name)
            .unwrap()
            .cast(&DataType::Int64)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect()
    }

    /// Three order lines: (A, Jan, SP, 5), (A, Feb, SP, 3), (B, Jan, RJ, 1).
    fn three_rows() -> DataFrame {
        df!(
            ORDER_ITEM_ID => &[1i64, 1, 1],
            PRODUCT_ID => &["A", "A", "B"],
            PRODUCT_CATEGORY => &["toys", "toys", "garden"],
            SELLER_STATE => &["SP", "SP", "RJ"],
            PURCHASE_MONTH => &[1i32, 2, 1],
            REVIEW_SCORE => &[5i64, 3, 1]
        )
        .unwrap()
    }

    #[test]
    fn top_one_product() {
        let top = top_products(&three_rows(), 1).unwrap();
        assert_eq!(strs(&top, PRODUCT_ID), vec!["A"]);
        assert_eq!(ints(&top, TOTAL_SALES), vec![2]);
        assert_eq!(strs(&top, PRODUCT_CATEGORY), vec!["toys"]);
    }

    #[test]
    fn top_products_ties_break_on_id() {
        let df = df!(
            ORDER_ITEM_ID => &[1i64, 1, 1, 1],
            PRODUCT_ID => &["z", "b", "a", "b"]
        )
        .unwrap();
        let top = top_products(&df, 3).unwrap();
        assert_eq!(strs(&top, PRODUCT_ID), vec!["b", "a", "z"]);
        let top = top_products(&df, 2).unwrap();
        assert_eq!(strs(&top, PRODUCT_ID), vec!["b", "a"]);
    }

    #[test]
    fn top_ten_of_ten_covers_all_rows() {
        let ids: Vec<String> = (0..30).map(|i| format!("p{}", i % 10)).collect();
        let df = df!(
            ORDER_ITEM_ID => vec![1i64; 30],
            PRODUCT_ID => ids
        )
        .unwrap();
        let top = top_products(&df, DEFAULT_TOP_N).unwrap();
        assert_eq!(top.height(), 10);
        assert_eq!(ints(&top, TOTAL_SALES).iter().sum::<i64>(), 30);
    }

    #[test]
    fn huge_n_keeps_every_product() {
        let top = top_products(&three_rows(), 1usize << 32).unwrap();
        assert_eq!(strs(&top, PRODUCT_ID), vec!["A", "B"]);
        let top = top_products(&three_rows(), usize::MAX).unwrap();
        assert_eq!(top.height(), 2);
    }

    #[test]
    fn total_per_state_sums_to_rows() {
        let totals = total_sales_per_state(&three_rows()).unwrap();
        assert_eq!(strs(&totals, SELLER_STATE), vec!["SP", "RJ"]);
        assert_eq!(ints(&totals, TOTAL_SALES), vec![2, 1]);
        assert_eq!(ints(&totals, TOTAL_SALES).iter().sum::<i64>(), 3);
    }

    #[test]
    fn review_distribution_separates_scores() {
        let hist = review_score_distribution(&three_rows(), DEFAULT_HISTOGRAM_BINS).unwrap();
        assert_eq!(hist.height(), 5);
        // edges 1.0, 1.8, 2.6, 3.4, 4.2, 5.0
        assert_eq!(ints(&hist, FREQUENCY), vec![1, 0, 1, 0, 1]);
    }

    #[test]
    fn review_distribution_single_value() {
        let df = df!(REVIEW_SCORE => &[4i64, 4, 4]).unwrap();
        let hist = review_score_distribution(&df, 5).unwrap();
        assert_eq!(ints(&hist, FREQUENCY), vec![0, 0, 3, 0, 0]);
    }

    #[test]
    fn review_distribution_of_nothing_is_empty() {
        let hist = review_score_distribution(&three_rows().clear(), 5).unwrap();
        assert_eq!(hist.height(), 0);
    }

    #[test]
    fn histogram_edges_and_indices() {
        let edges = histogram_edges(1.0, 5.0, 4);
        assert_eq!(edges, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(bin_index(1.0, &edges), Some(0));
        assert_eq!(bin_index(2.0, &edges), Some(1));
        assert_eq!(bin_index(5.0, &edges), Some(3));
        assert_eq!(bin_index(5.5, &edges), None);
    }

    #[test]
    fn best_selling_breaks_ties_on_month() {
        let df = df!(
            SELLER_STATE => &["SP", "SP", "SP", "RJ"],
            PURCHASE_MONTH => &[3i32, 1, 3, 2],
            PRODUCT_CATEGORY => &["toys", "garden", "toys", "toys"]
        )
        .unwrap();
        let best = best_selling_state(&df).unwrap();
        assert_eq!(strs(&best, SELLER_STATE), vec!["SP", "RJ"]);
        assert_eq!(ints(&best, ORDER_COUNT), vec![2, 1]);

        let tied = df!(
            SELLER_STATE => &["MG", "MG"],
            PURCHASE_MONTH => &[5i32, 2],
            PRODUCT_CATEGORY => &["toys", "garden"]
        )
        .unwrap();
        let best = best_selling_state(&tied).unwrap();
        assert_eq!(ints(&best, PURCHASE_MONTH), vec![2]);
        assert_eq!(strs(&best, PRODUCT_CATEGORY), vec!["garden"]);
    }

    #[test]
    fn monthly_state_sales_sorted_by_count() {
        let df = df!(
            ORDER_ITEM_ID => &[1i64, 1, 1, 1],
            SELLER_STATE => &["SP", "SP", "SP", "RJ"],
            PURCHASE_MONTH => &[1i32, 2, 2, 1]
        )
        .unwrap();
        let out = monthly_sales_for_state(&df, "SP").unwrap();
        assert_eq!(ints(&out, PURCHASE_MONTH), vec![2, 1]);
        assert_eq!(ints(&out, TOTAL_SALES), vec![2, 1]);
        assert_eq!(monthly_sales_for_state(&df, "BA").unwrap().height(), 0);
    }

    #[test]
    fn product_trend_is_chronological() {
        let df = df!(
            ORDER_ITEM_ID => &[1i64, 1, 1, 1],
            PRODUCT_ID => &["A", "A", "A", "B"],
            PURCHASE_MONTH => &[11i32, 2, 2, 5]
        )
        .unwrap();
        let out = sales_trend_for_product(&df, "A").unwrap();
        assert_eq!(ints(&out, PURCHASE_MONTH), vec![2, 11]);
        assert_eq!(ints(&out, TOTAL_SALES), vec![2, 1]);
    }

    #[test]
    fn monthly_top_products_restricted_to_top() {
        let df = df!(
            ORDER_ITEM_ID => &[1i64, 1, 1, 1],
            PRODUCT_ID => &["A", "A", "B", "C"],
            PURCHASE_MONTH => &[1i32, 2, 1, 3]
        )
        .unwrap();
        let out = monthly_sales_top_products(&df, 2).unwrap();
        assert_eq!(ints(&out, PURCHASE_MONTH), vec![1, 1, 2]);
        assert_eq!(strs(&out, PRODUCT_ID), vec!["A", "B", "A"]);
    }

    #[test]
    fn missing_columns_fail_and_empty_frames_do_not() {
        let df = df!(PRODUCT_ID => &["A"]).unwrap();
        assert!(matches!(
            total_sales_per_state(&df),
            Err(crate::error::DashboardError::MissingColumn(_))
        ));
        let empty = three_rows().clear();
        assert_eq!(total_sales_per_state(&empty).unwrap().height(), 0);
        assert_eq!(best_selling_state(&empty).unwrap().height(), 0);
        assert_eq!(top_products(&empty, 10).unwrap().height(), 0);
        assert_eq!(monthly_sales_top_products(&empty, 10).unwrap().height(), 0);
    }

    #[test]
    fn distinct_values_keep_first_appearance() {
        let df = df!(SELLER_STATE => &[Some("SP"), None, Some("RJ"), Some("SP")]).unwrap();
        assert_eq!(distinct_in_order(&df, SELLER_STATE).unwrap(), vec!["SP", "RJ"]);
    }
}
