//! Tabular rendering of forecasts.

use std::io;
use std::io::Write;

use stanza::style::{HAlign, Header, MinWidth, Styles};
use stanza::table::{Col, Row, Table};

use crate::csv::CsvWriter;
use crate::forecast::{FitDiagnostics, ForecastResult, Prediction};
use crate::metric::MetricBound;
use crate::service::ErrorDescriptor;

/// History rows (actual and fitted) followed by the forecast rows, formatted to the metric's
/// precision.
pub fn tabulate(result: &ForecastResult, bound: &MetricBound) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Centred)),
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Centred)),
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec![
                "Season".into(),
                "Kind".into(),
                "Actual".into(),
                "Center".into(),
                "Lower".into(),
                "Upper".into(),
            ],
        ));

    for fitted in &result.fitted {
        let actual = result
            .history
            .iter()
            .find(|point| point.season == fitted.season)
            .map(|point| bound.format(point.value))
            .unwrap_or_default();
        table.push_row(prediction_row(fitted, "history", actual, bound));
    }
    for future in &result.future {
        table.push_row(prediction_row(future, "forecast", String::new(), bound));
    }
    table
}

fn prediction_row(prediction: &Prediction, kind: &str, actual: String, bound: &MetricBound) -> Row {
    Row::new(
        Styles::default(),
        vec![
            prediction.season.to_string().into(),
            kind.to_string().into(),
            actual.into(),
            bound.format(prediction.center).into(),
            bound.format(prediction.lower).into(),
            bound.format(prediction.upper).into(),
        ],
    )
}

pub fn tabulate_diagnostics(diagnostics: &FitDiagnostics) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(12))),
            Col::new(Styles::default().with(MinWidth(12)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(11)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec!["Regressor".into(), "Coefficient".into(), "Std. error".into()],
        ));
    for (index, regressor) in diagnostics.regressors.iter().enumerate() {
        let std_error = diagnostics
            .std_errors
            .as_ref()
            .map(|std_errors| format!("{:.6}", std_errors[index]))
            .unwrap_or_else(|| "-".into());
        table.push_row(Row::new(
            Styles::default(),
            vec![
                format!("{regressor:?}").into(),
                format!("{:.6}", diagnostics.coefficients[index]).into(),
                std_error.into(),
            ],
        ));
    }
    table
}

pub fn tabulate_unavailable<'a>(descriptors: impl IntoIterator<Item = &'a ErrorDescriptor>) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(18))),
            Col::new(Styles::default().with(MinWidth(30))),
            Col::new(Styles::default()),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec!["Metric".into(), "Status".into(), "Detail".into()],
        ));
    for descriptor in descriptors {
        table.push_row(Row::new(
            Styles::default(),
            vec![
                descriptor.metric.to_string().into(),
                descriptor.to_string().into(),
                descriptor.detail.clone().into(),
            ],
        ));
    }
    table
}

pub const CSV_HEADER: [&str; 6] = ["PlayerID", "Metric", "Season", "Center", "Lower", "Upper"];

/// Appends the future rows of `result` to `writer`.
pub fn write_future<W: Write>(
    writer: &mut CsvWriter<W>,
    result: &ForecastResult,
    bound: &MetricBound,
) -> Result<(), io::Error> {
    for prediction in &result.future {
        writer.append([
            result.player_key.id.clone(),
            result.metric.to_string(),
            prediction.season.to_string(),
            bound.format(prediction.center),
            bound.format(prediction.lower),
            bound.format(prediction.upper),
        ])?;
    }
    Ok(())
}
