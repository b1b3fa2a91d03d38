//! ECharts configuration for the daily spending chart.
//!
//! The page embeds two configurations of the same chart, one with compact
//! labels and one with the year included, and the client script picks
//! whichever suits the viewport.

use charming::{
    Chart,
    component::{Axis, Grid, Title},
    element::{AxisLabel, AxisPointer, AxisPointerType, AxisType, JsFunction, Tooltip, Trigger},
    series::bar::Bar,
};
use maud::{Markup, PreEscaped, html};

use crate::{chart::ChartPoint, html::HeadElement};

/// Viewports narrower than this, in pixels, get the compact chart.
const COMPACT_BREAKPOINT_PX: u32 = 640;

/// A chart with its HTML container ID and one ECharts configuration per label width.
pub struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration with "Jan 15" style labels, as JSON.
    pub compact_options: String,
    /// The ECharts configuration with "Jan 15, 2024" style labels, as JSON.
    pub wide_options: String,
}

pub fn charts_view(charts: &[DashboardChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            @for chart in charts {
                div
                    id=(chart.id)
                    class="min-h-[320px] rounded dark:bg-gray-100"
                {}
            }
        }
    )
}

/// Initialise each chart, switching configuration when the viewport crosses the breakpoint.
pub fn charts_script(charts: &[DashboardChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{id}");
                    const chart = echarts.init(chartDom);
                    const compactOption = {compact};
                    const wideOption = {wide};
                    const narrowQuery = window.matchMedia('(max-width: {max_width}px)');

                    const updateOption = () => {{
                        chart.setOption(narrowQuery.matches ? compactOption : wideOption, true);
                    }};
                    narrowQuery.addEventListener('change', updateOption);
                    updateOption();

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        chart.setTheme(darkModeMediaQuery.matches ? 'dark' : 'default');
                    }};
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                id = chart.id,
                compact = chart.compact_options,
                wide = chart.wide_options,
                max_width = COMPACT_BREAKPOINT_PX - 1,
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{}\n}});",
        script_content
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}

pub fn daily_spending_chart(points: &[ChartPoint]) -> Chart {
    let labels: Vec<String> = points.iter().map(|point| point.label.clone()).collect();
    let totals: Vec<f64> = points.iter().map(|point| point.total).collect();

    Chart::new()
        .title(Title::new().text("Daily Spending"))
        .tooltip(currency_tooltip())
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(Bar::new().name("Spent").data(totals))
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('en-US', {
              style: 'currency',
              currency: 'USD'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}

fn currency_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter())
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}
