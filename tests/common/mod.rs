use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Write a small order-line dataset covering two states, three products and three months.
///
/// Per product: p1 has 4 sales, p2 has 2, p3 has 1.
/// Per state: SP has 4 sales (all in January/February), RJ has 3.
pub fn write_sales_csv(dir: &Path) -> PathBuf {
    let path = dir.join("main_data.csv");
    let mut df = df!(
        "order_item_id" => [1i64, 1, 2, 1, 1, 1, 1],
        "product_id" => ["p1", "p1", "p2", "p1", "p3", "p2", "p1"],
        "product_category_name" => ["toys", "toys", "books", "toys", "garden", "books", "toys"],
        "seller_state" => ["SP", "SP", "SP", "RJ", "RJ", "SP", "RJ"],
        "order_purchase_timestamp" => [
            "2017-01-05 10:00:00",
            "2017-01-20 12:30:00",
            "2017-01-21 08:00:00",
            "2017-02-03 09:15:00",
            "2017-02-10 16:45:00",
            "2017-02-11 11:00:00",
            "2017-03-01 14:00:00",
        ],
        "review_score" => [5i64, 4, 1, 5, 3, 2, 5]
    )
    .unwrap();
    let mut file = File::create(&path).unwrap();
    CsvWriter::new(&mut file).finish(&mut df).unwrap();
    path
}

/// Write a CSV without the purchase timestamp column.
pub fn write_csv_without_timestamps(dir: &Path) -> PathBuf {
    let path = dir.join("no_timestamps.csv");
    let mut df = df!(
        "order_item_id" => [1i64, 1],
        "product_id" => ["p1", "p2"],
        "seller_state" => ["SP", "RJ"],
        "review_score" => [5i64, 4]
    )
    .unwrap();
    let mut file = File::create(&path).unwrap();
    CsvWriter::new(&mut file).finish(&mut df).unwrap();
    path
}
