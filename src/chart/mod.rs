//! Daily spending charts: grouping records by day, labelling the days and
//! building the ECharts configuration.

mod aggregation;
mod charts;
mod endpoint;
mod format;

pub use aggregation::{DailyBucket, RawRecord, aggregate_by_date, parse_raw_records};
pub use charts::{DashboardChart, charts_script, charts_view, daily_spending_chart};
pub use endpoint::{daily_spending_dashboard_chart, get_daily_chart};
pub use format::{ChartPoint, LabelWidth, chart_points, format_date_label, round_to_cents};
