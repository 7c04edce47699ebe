//! Column names of the order-line dataset and of the summary tables.

pub const ORDER_ITEM_ID: &str = "order_item_id";
pub const PRODUCT_ID: &str = "product_id";
pub const PRODUCT_CATEGORY: &str = "product_category_name";
pub const SELLER_STATE: &str = "seller_state";
pub const PURCHASE_TIMESTAMP: &str = "order_purchase_timestamp";
pub const REVIEW_SCORE: &str = "review_score";

/// Derived from [`PURCHASE_TIMESTAMP`] by the preparer.
pub const PURCHASE_MONTH: &str = "purchase_month";

pub const TOTAL_SALES: &str = "total_sales";
pub const ORDER_COUNT: &str = "order_count";
pub const BIN_START: &str = "bin_start";
pub const BIN_END: &str = "bin_end";
pub const FREQUENCY: &str = "frequency";

/// Identifier-like columns kept as strings regardless of CSV type inference.
pub const KEY_COLUMNS: [&str; 3] = [PRODUCT_ID, PRODUCT_CATEGORY, SELLER_STATE];
